// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The ingress side of a port.
//!
//! A receiver owns one row of the virtual output queue matrix: the queues
//! holding packets that arrived on its port, one per output port. Every
//! packet is routed once on arrival and placed in the queue for its output
//! port.
//!
//! The receiver is _blocked_ while any queue in its row is blocked. The
//! device uses this to stop accepting injected packets on the local port.

use std::rc::Rc;

use junction_track::entity::{Entity, GetEntity};
use junction_track::{debug, trace};

use crate::queue::FlowControlledQueue;
use crate::router::Route;
use crate::traits::FabricObject;

pub struct Receiver {
    pub entity: Rc<Entity>,
    port: usize,
    row: Vec<usize>,
    blocked: bool,
}

impl Receiver {
    /// Create the receiver for `port` that owns the queues at the `row`
    /// indices of the device's queue matrix.
    #[must_use]
    pub fn new(parent: &Rc<Entity>, port: usize, row: Vec<usize>) -> Self {
        Self {
            entity: Rc::new(Entity::new(parent, &format!("rx_{port}"))),
            port,
            row,
            blocked: false,
        }
    }

    #[must_use]
    pub fn port(&self) -> usize {
        self.port
    }

    /// Indices into the device's queue matrix, ordered by output port.
    #[must_use]
    pub fn row(&self) -> &[usize] {
        &self.row
    }

    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// Route a packet and place it in the queue for its output port.
    ///
    /// A packet whose queue is full is returned and the receiver blocks.
    pub fn receive<T>(
        &mut self,
        value: T,
        router: &dyn Route,
        queues: &mut [FlowControlledQueue<T>],
    ) -> Result<(), T>
    where
        T: FabricObject,
    {
        let output = router.route(value.destination());
        trace!(self.entity ; "{} for {} routed to port {}", value, value.destination(), output);

        let queue = &mut queues[self.row[output]];
        let result = queue.enqueue(value);
        if queue.is_blocked() || result.is_err() {
            if !self.blocked {
                debug!(self.entity ; "blocked by queue to port {}", output);
            }
            self.blocked = true;
        }
        result
    }

    /// Unblock once none of the queues in this row are blocked.
    pub fn check_for_unblock<T>(&mut self, queues: &[FlowControlledQueue<T>])
    where
        T: FabricObject,
    {
        if self.blocked && self.row.iter().all(|i| !queues[*i].is_blocked()) {
            debug!(self.entity ; "unblocked");
            self.blocked = false;
        }
    }
}

impl GetEntity for Receiver {
    fn entity(&self) -> &Rc<Entity> {
        &self.entity
    }
}
