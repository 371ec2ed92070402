// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Unique identifiers

/// Identifier that is unique across the simulation
///
/// Every [`Entity`](crate::entity::Entity) and every tracked object is given an
/// `Id`. There are two reserved values: [NO_ID](crate::NO_ID) and
/// [ROOT](crate::ROOT).
#[derive(Copy, Clone, Default, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Id(pub u64);

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Debug for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The `Unique` trait provides a unique ID for logging
pub trait Unique {
    /// Return a unique ID for an object.
    fn id(&self) -> Id;
}

impl Unique for Id {
    fn id(&self) -> Id {
        *self
    }
}
