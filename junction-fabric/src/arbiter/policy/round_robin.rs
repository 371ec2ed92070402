// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Round Robin arbitration policy

use std::rc::Rc;

use junction_track::entity::Entity;
use junction_track::trace;

use crate::arbiter::Arbitrate;

pub struct RoundRobin {
    candidate: usize,
}

impl RoundRobin {
    #[must_use]
    pub fn new() -> Self {
        Self { candidate: 0 }
    }
}

impl Default for RoundRobin {
    fn default() -> Self {
        Self::new()
    }
}

impl Arbitrate for RoundRobin {
    fn arbitrate(&mut self, entity: &Rc<Entity>, requests: &[bool]) -> Option<usize> {
        let num_inputs = requests.len();
        let granted = (0..num_inputs)
            .map(|i| (i + self.candidate) % num_inputs)
            .find(|index| requests[*index])?;
        trace!(entity ; "rr: grant {} from {}", granted, self.candidate);
        self.candidate = (granted + 1) % num_inputs;
        Some(granted)
    }
}

#[cfg(test)]
mod tests {
    use junction_track::entity::toplevel;
    use junction_track::tracker::dev_null_tracker;

    use super::*;

    #[test]
    fn rotates_over_requests() {
        let top = toplevel(&dev_null_tracker(), "top");
        let mut rr = RoundRobin::new();
        let requests = [true, false, true, true];
        let grants: Vec<_> = (0..4).filter_map(|_| rr.arbitrate(&top, &requests)).collect();
        assert_eq!(grants, vec![0, 2, 3, 0]);
        assert_eq!(rr.arbitrate(&top, &[false; 4]), None);
    }
}
