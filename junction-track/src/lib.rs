// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! This crate provides the _track_ capabilities for the Junction fabric.
//!
//! _Track_ means the combination of _log_ and _trace_ where:
//!
//!   - _log_ are text-based human-readable messages emitted at various levels
//!     of verbosity (from `Trace` through to `Error`).
//!   - _trace_ provides a standard set of modelling events that can be emitted.
//!     For example, entity creation/destruction or packets entering/exiting
//!     a queue.
//!
//! All events are emitted against an [`Entity`](crate::entity::Entity) so
//! that the level of each part of a model can be controlled independently
//! (see [`EntityManager`](crate::tracker::EntityManager)).
//!
//! ```rust
//! use junction_track::entity::{Entity, toplevel};
//! use junction_track::tracker::dev_null_tracker;
//! use junction_track::info;
//!
//! let tracker = dev_null_tracker();
//! let top = toplevel(&tracker, "top");
//! let node = Entity::new(&top, "node");
//! info!(node ; "{} is ready", node);
//! assert_eq!(node.full_name(), "top::node");
//! ```

// Enable warnings for missing documentation
#![warn(missing_docs)]

pub use log;

pub mod builder;
pub mod entity;
pub mod id;
pub mod test_helpers;

/// Include the trackers.
pub mod tracker;

pub use id::{Id, Unique};
pub use tracker::{Track, Tracker};

/// A type alias for objects that receive _log_ / _trace_ events.
pub type Writer = Box<dyn std::io::Write>;

/// Id value which indicates where there is no valid ID
pub const NO_ID: Id = Id(0);

/// The root ID from which all other IDs are derived
pub const ROOT: Id = Id(1);

/// Track an object entering an entity.
#[macro_export]
macro_rules! enter {
    ($entity:expr ; $enter_id:expr) => {
        if $entity
            .tracker
            .is_entity_enabled($entity.id, $crate::log::Level::Trace)
        {
            $entity.tracker.enter($entity.id, $enter_id);
        }
    };
}

/// Track an object leaving an entity.
#[macro_export]
macro_rules! exit {
    ($entity:expr ; $exit_id:expr) => {
        if $entity
            .tracker
            .is_entity_enabled($entity.id, $crate::log::Level::Trace)
        {
            $entity.tracker.exit($entity.id, $exit_id);
        }
    };
}

/// Create a unique ID for an object that will be tracked.
///
/// The user must specify an entity with a [`Tracker`] to create the ID.
#[macro_export]
macro_rules! create_id {
    ($entity:expr) => {{ $entity.tracker.unique_id() }};
}

/// Add an entity creation event
#[macro_export]
macro_rules! create {
    ($entity:expr) => {{
        if $entity
            .tracker
            .is_entity_enabled($entity.id, $crate::log::Level::Trace)
        {
            let parent_id = match &$entity.parent {
                Some(parent) => parent.id,
                None => $crate::NO_ID,
            };
            $entity
                .tracker
                .create(parent_id, $entity.id, $entity.full_name().as_str());
        }
    }};
    ($entity:expr ; $created:expr) => {{
        if $entity
            .tracker
            .is_entity_enabled($entity.id, $crate::log::Level::Trace)
        {
            $entity.tracker.create(
                $entity.id,
                $crate::Unique::id(&$created),
                format!("{}", $created).as_str(),
            );
        }
    }};
}

/// Add an entity destroy event
#[macro_export]
macro_rules! destroy {
    ($entity:expr) => {{
        if $entity
            .tracker
            .is_entity_enabled($entity.id, $crate::log::Level::Trace)
        {
            match &$entity.parent {
                Some(parent) => $entity.tracker.destroy(parent.id, $entity.id),
                None => $entity.tracker.destroy($crate::NO_ID, $entity.id),
            };
        }
    }};
}

/// Base macro for log messages of all levels.
///
/// Messages are only formatted if the entity is enabled at the given level.
#[macro_export]
macro_rules! log_base {
    ($entity:expr ; $lvl:expr, $($arg:tt)+) => (
        if $entity.tracker.is_entity_enabled($entity.id, $lvl) {
            $entity.tracker.log($entity.id, $lvl, format_args!($($arg)+));
        }
    );
}

/// Log at level `log::Level::Trace`
#[macro_export]
macro_rules! trace {
    ($entity:expr ; $($arg:tt)+) => (
        $crate::log_base!($entity ; $crate::log::Level::Trace, $($arg)+);
    );
}

/// Log at level `log::Level::Debug`
#[macro_export]
macro_rules! debug {
    ($entity:expr ; $($arg:tt)+) => (
        $crate::log_base!($entity ; $crate::log::Level::Debug, $($arg)+);
    );
}

/// Log at level `log::Level::Info`
#[macro_export]
macro_rules! info {
    ($entity:expr ; $($arg:tt)+) => (
        $crate::log_base!($entity ; $crate::log::Level::Info, $($arg)+);
    );
}

/// Log at level `log::Level::Warn`
#[macro_export]
macro_rules! warn {
    ($entity:expr ; $($arg:tt)+) => (
        $crate::log_base!($entity ; $crate::log::Level::Warn, $($arg)+);
    );
}

/// Log at level `log::Level::Error`
#[macro_export]
macro_rules! error {
    ($entity:expr ; $($arg:tt)+) => (
        $crate::log_base!($entity ; $crate::log::Level::Error, $($arg)+);
    );
}
