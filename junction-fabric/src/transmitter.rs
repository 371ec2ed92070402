// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The egress side of a port.
//!
//! A transmitter owns one column of the virtual output queue matrix: the
//! queues holding packets for its port, one per input port. Its arbiter
//! picks which of those queues to drain and the packet is sent on the
//! connected [Channel].

use std::rc::Rc;

use junction_track::entity::{Entity, GetEntity};
use junction_track::trace;

use crate::arbiter::Arbitrate;
use crate::channel::Channel;
use crate::queue::FlowControlledQueue;
use crate::traits::FabricObject;

pub struct Transmitter<T>
where
    T: FabricObject,
{
    pub entity: Rc<Entity>,
    port: usize,
    column: Vec<usize>,
    policy: Box<dyn Arbitrate>,
    channel: Option<Box<dyn Channel<T>>>,
}

impl<T> Transmitter<T>
where
    T: FabricObject,
{
    /// Create the transmitter for `port` that drains the queues at the
    /// `column` indices of the device's queue matrix.
    #[must_use]
    pub fn new(
        parent: &Rc<Entity>,
        port: usize,
        column: Vec<usize>,
        policy: Box<dyn Arbitrate>,
    ) -> Self {
        Self {
            entity: Rc::new(Entity::new(parent, &format!("tx_{port}"))),
            port,
            column,
            policy,
            channel: None,
        }
    }

    #[must_use]
    pub fn port(&self) -> usize {
        self.port
    }

    /// Indices into the device's queue matrix, ordered by input port.
    #[must_use]
    pub fn column(&self) -> &[usize] {
        &self.column
    }

    pub fn connect(&mut self, channel: Box<dyn Channel<T>>) {
        trace!(self.entity ; "connected");
        self.channel = Some(channel);
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Whether a channel is connected and can take a packet.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.channel.as_ref().is_some_and(|c| c.is_ready())
    }

    /// Arbitrate between the queues of this column and remove the packet at
    /// the head of the granted one.
    ///
    /// Returns the input port the packet arrived on along with the packet.
    pub fn dequeue_next(&mut self, queues: &mut [FlowControlledQueue<T>]) -> Option<(usize, T)> {
        let requests: Vec<bool> = self.column.iter().map(|i| !queues[*i].is_empty()).collect();
        let input = self.policy.arbitrate(&self.entity, &requests)?;
        let value = queues[self.column[input]].dequeue()?;
        trace!(self.entity ; "{} from port {}", value, input);
        Some((input, value))
    }

    /// Move one packet from this column onto the connected channel.
    ///
    /// Nothing moves unless the channel is ready and a queue in the column
    /// holds a packet. Returns the input port the packet arrived on.
    pub fn transmit(&mut self, queues: &mut [FlowControlledQueue<T>]) -> Option<usize> {
        if !self.is_ready() {
            return None;
        }
        let (input, value) = self.dequeue_next(queues)?;
        if let Some(channel) = self.channel.as_mut() {
            channel.send(value);
        }
        Some(input)
    }
}

impl<T> GetEntity for Transmitter<T>
where
    T: FabricObject,
{
    fn entity(&self) -> &Rc<Entity> {
        &self.entity
    }
}
