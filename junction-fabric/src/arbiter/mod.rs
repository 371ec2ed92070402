// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Choose one of a number of requesting inputs.
//!
//! Each [Transmitter](crate::transmitter::Transmitter) owns an arbiter that
//! picks which of its virtual output queues to drain next. The request
//! vector has one entry per input and an input is requesting when its
//! queue holds a packet.

use std::rc::Rc;

use junction_track::entity::Entity;
use serde::{Deserialize, Serialize};

use crate::arbiter::policy::round_robin::RoundRobin;
use crate::arbiter::policy::weighted_round_robin::WeightedRoundRobin;
use crate::types::FabricError;

pub mod policy;

pub trait Arbitrate {
    /// Return the index of the granted input, if any input is requesting.
    fn arbitrate(&mut self, entity: &Rc<Entity>, requests: &[bool]) -> Option<usize>;
}

/// Arbitration policy used by every transmitter of a device
#[derive(clap::ValueEnum, Clone, Copy, Default, Debug, Serialize, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArbitrationPolicy {
    #[default]
    /// Grant inputs in turn
    RoundRobin,

    /// Grant channel inputs `transit_weight` times for every grant of the
    /// local input
    WeightedRoundRobin,
}

/// Build the arbiter for a transmitter with `num_inputs` inputs where the
/// last input is the local port.
pub fn build_policy(
    policy: ArbitrationPolicy,
    num_inputs: usize,
    transit_weight: usize,
) -> Result<Box<dyn Arbitrate>, FabricError> {
    match policy {
        ArbitrationPolicy::RoundRobin => Ok(Box::new(RoundRobin::new())),
        ArbitrationPolicy::WeightedRoundRobin => {
            let mut weights = vec![transit_weight; num_inputs];
            if let Some(local) = weights.last_mut() {
                *local = 1;
            }
            Ok(Box::new(WeightedRoundRobin::new(weights, num_inputs)?))
        }
    }
}
