// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Trackers receive the log and trace events of every entity.
//!
//! The level of each entity is resolved once, when it registers its name, so
//! the check made by every logging macro is a single lookup by [`Id`].

/// Tracker that discards everything.
pub mod dev_null;
/// Tracker that writes one line of text per event.
pub mod text;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::io::{self, BufWriter};
use std::rc::Rc;

pub use dev_null::DevNullTracker;
use regex::Regex;
pub use text::TextTracker;

use crate::{Id, ROOT};

/// Returned when a tracker cannot be built from its configuration
#[derive(Debug)]
pub struct TrackConfigError(pub String);

impl fmt::Display for TrackConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Error: {}", self.0)
    }
}

impl std::error::Error for TrackConfigError {}

/// Receiver of all track events.
///
/// Every event names the [`Id`] of the entity it belongs to.
pub trait Track {
    /// Hand out an [`Id`] that no other entity or packet has.
    fn unique_id(&self) -> Id;

    /// Whether events at `level` from entity `id` are emitted.
    fn is_entity_enabled(&self, id: Id, level: log::Level) -> bool;

    /// Register the full name of a new entity.
    fn add_entity(&self, id: Id, entity_name: &str);

    /// An object arrived in an entity, such as a packet entering a queue.
    fn enter(&self, enter_into: Id, enter_obj: Id);

    /// An object left an entity.
    fn exit(&self, exit_from: Id, exit_obj: Id);

    /// `created_by` made a new object called `name`.
    fn create(&self, created_by: Id, created_obj: Id, name: &str);

    /// `destroyed_by` released an object.
    fn destroy(&self, destroyed_by: Id, destroyed_obj: Id);

    /// A formatted message.
    fn log(&self, msg_by: Id, level: log::Level, msg: fmt::Arguments);

    /// Flush anything still buffered.
    fn shutdown(&self);
}

/// Shared handle to the tracker used by a whole model.
pub type Tracker = Rc<dyn Track>;

/// Create a [`Tracker`] that writes events at or above `level` to `stdout`.
#[must_use]
pub fn stdout_tracker(level: log::Level) -> Tracker {
    let writer = Box::new(BufWriter::new(io::stdout()));
    Rc::new(TextTracker::new(EntityManager::new(level), writer))
}

/// Create a [`Tracker`] that discards all events.
#[must_use]
pub fn dev_null_tracker() -> Tracker {
    Rc::new(DevNullTracker)
}

/// Resolves the level of each entity from its name and hands out unique
/// [`Id`]s.
///
/// Names that match none of the filters get the default level. Only
/// entities whose level differs from the default are stored.
pub struct EntityManager {
    default_level: log::Level,
    filters: Vec<(Regex, log::Level)>,
    next_id: Cell<u64>,
    overrides: RefCell<HashMap<Id, log::Level>>,
}

impl EntityManager {
    /// Create a manager where every entity uses `default_level`.
    #[must_use]
    pub fn new(default_level: log::Level) -> Self {
        Self {
            default_level,
            filters: Vec::new(),
            next_id: Cell::new(ROOT.0 + 1),
            overrides: RefCell::default(),
        }
    }

    /// Set the level of entities whose full name matches `regex_str`.
    ///
    /// Filters are tried in the order they were added and the first match
    /// wins.
    ///
    /// ```rust
    /// use junction_track::tracker::EntityManager;
    ///
    /// let mut manager = EntityManager::new(log::Level::Error);
    /// manager.add_entity_level_filter(r"node_1_.*::rx_\d+", log::Level::Debug).unwrap();
    /// assert!(manager.add_entity_level_filter("rx_[", log::Level::Debug).is_err());
    /// ```
    pub fn add_entity_level_filter(
        &mut self,
        regex_str: &str,
        level: log::Level,
    ) -> Result<(), TrackConfigError> {
        let regex = Regex::new(regex_str).map_err(|e| {
            TrackConfigError(format!("invalid entity filter {regex_str:?}: {e}"))
        })?;
        self.filters.push((regex, level));
        Ok(())
    }

    fn level_for(&self, entity_name: &str) -> log::Level {
        self.filters
            .iter()
            .find(|(regex, _)| regex.is_match(entity_name))
            .map_or(self.default_level, |(_, level)| *level)
    }

    fn unique_id(&self) -> Id {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Id(id)
    }

    fn is_enabled(&self, id: Id, level: log::Level) -> bool {
        let entity_level = self
            .overrides
            .borrow()
            .get(&id)
            .copied()
            .unwrap_or(self.default_level);
        level <= entity_level
    }

    fn register(&self, id: Id, entity_name: &str) {
        let level = self.level_for(entity_name);
        if level == self.default_level {
            return;
        }
        match self.overrides.borrow_mut().entry(id) {
            Entry::Occupied(_) => panic!("{entity_name}: entity {id} registered twice"),
            Entry::Vacant(slot) => {
                slot.insert(level);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use log::Level;

    use super::*;

    const NODE: &str = "top::torus::node_1_0_2";
    const QUEUE: &str = "top::torus::node_1_0_2::queue_6_1";
    const RX: &str = "top::torus::node_1_0_2::rx_6";

    #[test]
    fn default_level() {
        let manager = EntityManager::new(Level::Warn);
        for name in ["top", NODE, QUEUE, RX] {
            assert_eq!(manager.level_for(name), Level::Warn);
        }
    }

    #[test]
    fn filter_matches_children() {
        let mut manager = EntityManager::new(Level::Error);
        manager
            .add_entity_level_filter(r"node_1_0_2", Level::Debug)
            .unwrap();
        assert_eq!(manager.level_for("top"), Level::Error);
        assert_eq!(manager.level_for(NODE), Level::Debug);
        assert_eq!(manager.level_for(QUEUE), Level::Debug);
        assert_eq!(manager.level_for(RX), Level::Debug);
    }

    #[test]
    fn earlier_filter_wins() {
        let mut manager = EntityManager::new(Level::Error);
        manager
            .add_entity_level_filter(r"::queue_\d+_\d+$", Level::Trace)
            .unwrap();
        manager
            .add_entity_level_filter(r"node_", Level::Info)
            .unwrap();
        assert_eq!(manager.level_for(QUEUE), Level::Trace);
        assert_eq!(manager.level_for(RX), Level::Info);
    }

    #[test]
    fn levels_looked_up_by_id() {
        let mut manager = EntityManager::new(Level::Warn);
        manager.add_entity_level_filter(r"rx_", Level::Trace).unwrap();
        let rx = manager.unique_id();
        let queue = manager.unique_id();
        manager.register(rx, RX);
        manager.register(queue, QUEUE);

        assert!(manager.is_enabled(rx, Level::Trace));
        assert!(!manager.is_enabled(queue, Level::Info));
        assert!(manager.is_enabled(queue, Level::Warn));
    }

    #[test]
    fn ids_follow_root() {
        let manager = EntityManager::new(Level::Error);
        let ids: Vec<Id> = (0..4).map(|_| manager.unique_id()).collect();
        assert_eq!(ids, [2, 3, 4, 5].map(Id));
        assert!(ids.iter().all(|id| *id != ROOT));
    }
}
