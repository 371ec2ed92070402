// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The switching fabric of a single node in a torus or mesh network.
//!
//! A [NetDevice](crate::device::NetDevice) combines:
//!
//!  - a [NetworkAddress](crate::address::NetworkAddress) identifying the node
//!    by its `(x, y, z)` coordinates.
//!  - a [DimensionOrderRouter](crate::router::DimensionOrderRouter) which
//!    resolves `x` then `y` then `z`, taking the short way round wrapping
//!    dimensions.
//!  - an `N x N` matrix of
//!    [FlowControlledQueue](crate::queue::FlowControlledQueue)s, one per
//!    (input port, output port) pair, written by per-port
//!    [Receiver](crate::receiver::Receiver)s and drained by per-port
//!    [Transmitter](crate::transmitter::Transmitter)s.
//!
//! Everything is synchronous. Nothing blocks: a full queue hands the packet
//! back to the caller to hold and offer again later.
//!
//! ```rust
//! use junction_fabric::address::NetworkAddress;
//! use junction_fabric::device::{DeviceConfig, NetDevice};
//! use junction_fabric::test_helpers::TestPacket;
//! use junction_fabric::traits::Routable;
//! use junction_track::entity::toplevel;
//! use junction_track::tracker::dev_null_tracker;
//!
//! let top = toplevel(&dev_null_tracker(), "top");
//! let address = NetworkAddress::new(1, 1, 1);
//! let mut device = NetDevice::new(&top, "node", address, &DeviceConfig::default()).unwrap();
//!
//! // A packet for this node goes straight to the local port
//! assert!(device.inject_packet(TestPacket::new(&top, address)).is_ok());
//! let packet = device.eject_packet().unwrap();
//! assert_eq!(packet.destination(), address);
//! ```

pub mod address;
pub mod arbiter;
pub mod channel;
pub mod device;
pub mod queue;
pub mod receiver;
pub mod router;
pub mod test_helpers;
pub mod topology;
pub mod traits;
pub mod transmitter;
pub mod types;
