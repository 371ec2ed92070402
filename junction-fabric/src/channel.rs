// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The outgoing side of a link.
//!
//! A [Transmitter](crate::transmitter::Transmitter) only sends when its
//! channel reports that it is ready. What happens to the packet afterwards
//! is up to the channel.

pub trait Channel<T> {
    /// Whether the channel can accept a packet now.
    fn is_ready(&self) -> bool;

    /// Hand a packet to the channel. Only called when
    /// [is_ready](Channel::is_ready) returns true.
    fn send(&mut self, value: T);
}
