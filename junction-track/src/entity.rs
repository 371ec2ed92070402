// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Named parts of a model.
//!
//! Every component that logs owns an [`Entity`]. Entities form a tree with a
//! single [`toplevel`] root and are named by their path from it, for example
//! `top::torus::node_1_2_0::rx_3`. The path is what tracker filters match.

use std::fmt;
use std::rc::Rc;

use crate::{Id, Tracker, create, destroy};

const SEPARATOR: &str = "::";

/// A node in the model hierarchy.
///
/// Creating an entity registers its path with the [`Tracker`] and emits a
/// create event; dropping it emits a destroy event.
pub struct Entity {
    /// Name of this entity within its parent.
    pub name: String,

    /// The entity this one belongs to. Only the root has none.
    pub parent: Option<Rc<Entity>>,

    /// Identifies this entity in every event it emits.
    pub id: Id,

    /// Where the events of this entity go.
    pub tracker: Tracker,

    path: String,
}

impl Entity {
    /// Create a child of `parent` that shares its tracker.
    #[must_use]
    pub fn new(parent: &Rc<Entity>, name: &str) -> Self {
        let path = [parent.path.as_str(), name].join(SEPARATOR);
        Self::register(Some(parent.clone()), &parent.tracker, name, path)
    }

    fn register(parent: Option<Rc<Entity>>, tracker: &Tracker, name: &str, path: String) -> Self {
        let id = tracker.unique_id();
        tracker.add_entity(id, &path);
        let entity = Self {
            name: name.to_owned(),
            parent,
            id,
            tracker: tracker.clone(),
            path,
        };
        create!(entity);
        entity
    }

    /// The path from the root to this entity
    #[must_use]
    pub fn full_name(&self) -> String {
        self.path.clone()
    }

    /// The path from the root to this entity, without copying it
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Drop for Entity {
    fn drop(&mut self) {
        destroy!(self);
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("path", &self.path)
            .finish()
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Access to the [`Entity`] of a model part.
pub trait GetEntity {
    /// Return the entity of this part.
    fn entity(&self) -> &Rc<Entity>;
}

/// Create the root of a model hierarchy.
pub fn toplevel(tracker: &Tracker, name: &str) -> Rc<Entity> {
    Rc::new(Entity::register(None, tracker, name, name.to_owned()))
}
