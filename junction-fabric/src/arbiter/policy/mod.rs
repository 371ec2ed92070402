// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Arbitration policies.

pub mod round_robin;
pub mod weighted_round_robin;
