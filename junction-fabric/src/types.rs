// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Shared types.

use std::error::Error;
use std::fmt;

#[macro_export]
/// Build a [FabricError] from a message that supports `to_string`
macro_rules! fabric_error {
    ($msg:expr) => {
        Err($crate::types::FabricError($msg.to_string()))
    };
}

/// The `FabricError` is returned when a fabric is configured incorrectly.
///
/// Admission rejections are not errors: they hand the packet back to the
/// caller instead.
#[derive(Debug, PartialEq)]
pub struct FabricError(pub String);

impl fmt::Display for FabricError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Error: {}", self.0)
    }
}

impl Error for FabricError {}

/// The FabricResult is the return type for configuration steps
pub type FabricResult = Result<(), FabricError>;
