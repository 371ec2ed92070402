// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::fmt;
use std::rc::Rc;

use junction_track::entity::{Entity, toplevel};
use junction_track::test_helpers::create_tracker;
use junction_track::{Id, Unique, create_id};

use crate::address::NetworkAddress;
use crate::traits::{FabricObject, Routable};

/// Create the top-level entity for a test, logging to
/// `traces/<test file>.log`.
#[must_use]
pub fn start_test(full_filepath: &str) -> Rc<Entity> {
    toplevel(&create_tracker(full_filepath), "top")
}

/// A packet that only carries a destination.
#[derive(Clone, Debug, PartialEq)]
pub struct TestPacket {
    id: Id,
    destination: NetworkAddress,
}

impl TestPacket {
    #[must_use]
    pub fn new(created_by: &Rc<Entity>, destination: NetworkAddress) -> Self {
        Self {
            id: create_id!(created_by),
            destination,
        }
    }
}

impl fmt::Display for TestPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "packet{}->{}", self.id, self.destination)
    }
}

impl Routable for TestPacket {
    fn destination(&self) -> NetworkAddress {
        self.destination
    }
}

impl Unique for TestPacket {
    fn id(&self) -> Id {
        self.id
    }
}

impl FabricObject for TestPacket {}
