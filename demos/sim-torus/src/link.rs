// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! A bounded point-to-point link between two nodes.
//!
//! The sending half is connected to a transmitter of one device as its
//! [Channel]. The receiving half is drained into a receiver of the
//! neighbouring device.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use junction_fabric::channel::Channel;

use crate::flit_gen::CountHops;

/// Create a link that holds at most `capacity` values in flight.
#[must_use]
pub fn link<T>(capacity: usize) -> (LinkTx<T>, LinkRx<T>) {
    let buffer = Rc::new(RefCell::new(VecDeque::with_capacity(capacity)));
    (
        LinkTx {
            buffer: buffer.clone(),
            capacity,
        },
        LinkRx { buffer },
    )
}

pub struct LinkTx<T> {
    buffer: Rc<RefCell<VecDeque<T>>>,
    capacity: usize,
}

impl<T> Channel<T> for LinkTx<T>
where
    T: CountHops,
{
    fn is_ready(&self) -> bool {
        self.buffer.borrow().len() < self.capacity
    }

    fn send(&mut self, mut value: T) {
        value.add_hop();
        self.buffer.borrow_mut().push_back(value);
    }
}

pub struct LinkRx<T> {
    buffer: Rc<RefCell<VecDeque<T>>>,
}

impl<T> LinkRx<T> {
    pub fn pop(&self) -> Option<T> {
        self.buffer.borrow_mut().pop_front()
    }

    /// Return a value that could not be delivered to the head of the link.
    pub fn push_front(&self, value: T) {
        self.buffer.borrow_mut().push_front(value);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.borrow().is_empty()
    }
}
