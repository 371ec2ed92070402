// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! A set of common traits used across the fabric.

use std::fmt::{Debug, Display};

use junction_track::Unique;

use crate::address::NetworkAddress;

/// The `Routable` trait provides an interface to an object to enable it to be
/// routed
pub trait Routable {
    fn destination(&self) -> NetworkAddress;
}

/// A super-trait that packets passed through the fabric have to implement
///
///  - Debug/Display: for log messages.
///  - Routable:      provides the destination used by the router.
///  - Unique:        provides the ID used to track the packet through queues.
///  - 'static:       packets are handed to boxed channels.
///
/// The fabric never looks at anything else in a packet.
pub trait FabricObject: Debug + Display + Routable + Unique + 'static {}
