// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Weighted Round Robin policy

use std::rc::Rc;

use junction_track::entity::Entity;
use junction_track::trace;

use crate::arbiter::Arbitrate;
use crate::fabric_error;
use crate::types::FabricError;

pub struct WeightedRoundRobin {
    candidate: usize,
    grants: Vec<usize>,
    weights: Vec<usize>,
}

impl WeightedRoundRobin {
    pub fn new(weights: Vec<usize>, num_inputs: usize) -> Result<Self, FabricError> {
        if weights.len() != num_inputs {
            return fabric_error!("The number of weights must be equal to the number of inputs");
        }
        if weights.contains(&0) {
            return fabric_error!("All weights must be at least 1");
        }

        Ok(Self {
            candidate: 0,
            grants: vec![0; weights.len()],
            weights,
        })
    }

    pub fn state_str(&self, requests: &[bool]) -> String {
        let mut s = format!("{}: ", self.candidate);
        for (i, grant) in self.grants.iter().enumerate() {
            let req = if requests[i] { "r" } else { "-" };
            s.push_str(format!("{}/{}/{}, ", req, grant, self.weights[i]).as_str());
        }
        s
    }
}

impl Arbitrate for WeightedRoundRobin {
    fn arbitrate(&mut self, entity: &Rc<Entity>, requests: &[bool]) -> Option<usize> {
        trace!(entity ; "wrr: arbitrate {}", self.state_str(requests));

        let num_inputs = requests.len();
        let mut selected = None;
        for i in 0..num_inputs {
            let index = (i + self.candidate) % num_inputs;
            if !requests[index] {
                continue;
            }
            if self.weights[index] > self.grants[index] {
                selected = Some(index);
                break;
            } else if selected.is_none() {
                selected = Some(index);
            }
        }

        let index = selected?;
        if self.weights[index] == self.grants[index] {
            self.grants[index] = 0;
        }
        self.grants[index] += 1;

        // Stay on an input until it has used up its weight.
        self.candidate = if self.grants[index] < self.weights[index] {
            index
        } else {
            (index + 1) % num_inputs
        };
        Some(index)
    }
}
