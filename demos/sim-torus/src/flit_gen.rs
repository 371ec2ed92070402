// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Flits and the generator that creates them for each node.

use std::fmt;
use std::rc::Rc;

use junction_fabric::address::NetworkAddress;
use junction_fabric::topology::TopologyConfig;
use junction_fabric::traits::{FabricObject, Routable};
use junction_track::entity::Entity;
use junction_track::{Id, Unique, create, create_id};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Clone, Debug)]
pub struct Flit {
    id: Id,
    source: NetworkAddress,
    destination: NetworkAddress,
    hops: usize,
}

impl Flit {
    #[must_use]
    pub fn new(created_by: &Rc<Entity>, source: NetworkAddress, destination: NetworkAddress) -> Self {
        let flit = Self {
            id: create_id!(created_by),
            source,
            destination,
            hops: 0,
        };
        create!(created_by ; flit);
        flit
    }

    #[must_use]
    pub fn source(&self) -> NetworkAddress {
        self.source
    }

    /// Number of links this flit has crossed
    #[must_use]
    pub fn hops(&self) -> usize {
        self.hops
    }
}

/// Objects that count the links they cross.
pub trait CountHops {
    fn add_hop(&mut self);
}

impl CountHops for Flit {
    fn add_hop(&mut self) {
        self.hops += 1;
    }
}

impl fmt::Display for Flit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "flit{} {}->{}", self.id, self.source, self.destination)
    }
}

impl Routable for Flit {
    fn destination(&self) -> NetworkAddress {
        self.destination
    }
}

impl Unique for Flit {
    fn id(&self) -> Id {
        self.id
    }
}

impl FabricObject for Flit {}

/// Creates a fixed number of flits from one node to random destinations.
pub struct FlitGen {
    entity: Rc<Entity>,
    source: NetworkAddress,
    destinations: Vec<NetworkAddress>,
    remaining: usize,
    rng: StdRng,
}

impl FlitGen {
    /// Create a generator of `num_flits` flits. Destinations are drawn from
    /// every other node of the topology, or the source itself when it is the
    /// only node.
    #[must_use]
    pub fn new(
        parent: &Rc<Entity>,
        source: NetworkAddress,
        topology: &TopologyConfig,
        num_flits: usize,
        seed: u64,
    ) -> Self {
        let mut destinations: Vec<_> = topology.addresses().filter(|a| *a != source).collect();
        if destinations.is_empty() {
            destinations.push(source);
        }
        Self {
            entity: Rc::new(Entity::new(parent, "gen")),
            source,
            destinations,
            remaining: num_flits,
            rng: StdRng::seed_from_u64(seed ^ u64::from(source.raw())),
        }
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl Iterator for FlitGen {
    type Item = Flit;

    fn next(&mut self) -> Option<Flit> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let destination = self.destinations[self.rng.gen_range(0..self.destinations.len())];
        Some(Flit::new(&self.entity, self.source, destination))
    }
}
