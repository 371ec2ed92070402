// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Dimension-order routing.
//!
//! Dimensions are resolved strictly in the order `x`, `y`, `z`. The first
//! dimension whose coordinate differs from the local node decides the output
//! channel:
//!
//!  - without wraparound the packet moves towards the destination.
//!  - with wraparound the packet takes the shorter way around the ring. When
//!    both ways are the same length the topology's [TieBreak] decides.
//!
//! A packet for the local node is routed to the local port.

use crate::address::{Dimension, NetworkAddress};
use crate::fabric_error;
use crate::topology::{Direction, TieBreak, TopologyConfig, channel_for};
use crate::types::FabricError;

/// Decide which output port a destination should leave by.
pub trait Route {
    fn route(&self, destination: NetworkAddress) -> usize;
}

pub struct DimensionOrderRouter {
    local: NetworkAddress,
    topology: TopologyConfig,
    local_port: usize,
}

impl DimensionOrderRouter {
    /// Create a router for the node at `local`.
    ///
    /// `local_port` must be beyond the channels the topology uses.
    pub fn new(
        local: NetworkAddress,
        topology: &TopologyConfig,
        local_port: usize,
    ) -> Result<Self, FabricError> {
        topology.validate()?;
        topology.validate_address(local)?;
        let required = topology.num_channels_required();
        if local_port < required {
            return fabric_error!(format!(
                "local port {local_port} overlaps the {required} channels of the {topology} topology"
            ));
        }
        Ok(Self {
            local,
            topology: topology.clone(),
            local_port,
        })
    }

    #[must_use]
    pub fn local(&self) -> NetworkAddress {
        self.local
    }

    #[must_use]
    pub fn local_port(&self) -> usize {
        self.local_port
    }

    fn direction(&self, dimension: Dimension, destination: NetworkAddress) -> Direction {
        let local = self.local.coordinate_in(dimension);
        let dest = destination.coordinate_in(dimension);
        let config = self.topology.dimension(dimension);
        if !config.wrap {
            return if dest > local {
                Direction::Positive
            } else {
                Direction::Negative
            };
        }

        // Both are always Some on a ring.
        let forward = config.hops(local, dest, Direction::Positive).unwrap_or(0);
        let backward = config.hops(local, dest, Direction::Negative).unwrap_or(0);
        if forward < backward {
            Direction::Positive
        } else if backward < forward {
            Direction::Negative
        } else {
            match self.topology.tie_break {
                TieBreak::Positive => Direction::Positive,
                TieBreak::Negative => Direction::Negative,
            }
        }
    }
}

impl Route for DimensionOrderRouter {
    fn route(&self, destination: NetworkAddress) -> usize {
        for dimension in Dimension::ALL {
            if self.local.coordinate_in(dimension) != destination.coordinate_in(dimension) {
                return channel_for(dimension, self.direction(dimension, destination));
            }
        }
        self.local_port
    }
}
