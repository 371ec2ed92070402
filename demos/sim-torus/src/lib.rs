// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Simulate a torus (or mesh) of switching nodes.
//!
//! One [NetDevice](junction_fabric::device::NetDevice) is built for every
//! address in the topology and each channel with a neighbour is connected to
//! it by a bounded [link](crate::link). Every node sends a number of flits
//! to random destinations.
//!
//! Each step:
//!  - every node tries to inject its next flit.
//!  - every node takes at most one flit off each incoming link, as long as
//!    the receiver for that link is not blocked.
//!  - every transmitter gets one chance to send.
//!  - every node ejects all flits that have arrived.
//!
//! The run ends when all flits have been delivered. A step in which nothing
//! moves is reported as a deadlock.
//!
//! # Examples
//!
//! ```txt
//! cargo run --bin sim-torus --release -- --x 4 --y 4 --z 1 --flits-per-node 64 --stdout
//! ```
//!
//! Settings can also come from `sim-torus.toml` or from environment variables
//! such as `JUNCTION_FLITS_PER_NODE=8`.

pub mod flit_gen;
pub mod link;
pub mod torus_builder;
