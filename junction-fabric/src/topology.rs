// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Description of the fabric a node sits in.
//!
//! Each of the [DIM] dimensions is either a line (mesh) or a ring (torus) of
//! `extent` nodes. A dimension with an extent of 1 is unused.
//!
//! Each node has two channels per dimension. The channel index is
//! `2 * dimension + direction` so that a node with all three dimensions in
//! use has channels:
//!
//! ```txt
//! channel | 0  | 1  | 2  | 3  | 4  | 5
//! --------|----|----|----|----|----|----
//! link    | x- | x+ | y- | y+ | z- | z+
//! ```

use std::fmt;

use itertools::iproduct;
use serde::{Deserialize, Serialize};

use crate::address::{Coordinate, DIM, Dimension, NetworkAddress};
use crate::fabric_error;
use crate::types::{FabricError, FabricResult};

/// Largest number of nodes in a single dimension
pub const MAX_EXTENT: usize = Coordinate::MAX as usize + 1;

/// Direction of travel along a dimension
#[repr(usize)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Negative = 0,
    Positive = 1,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::Negative => write!(f, "-"),
            Direction::Positive => write!(f, "+"),
        }
    }
}

/// Return the channel used to leave a node along `dimension` in `direction`.
#[must_use]
pub fn channel_for(dimension: Dimension, direction: Direction) -> usize {
    2 * dimension.index() + direction as usize
}

/// Return the dimension and direction of a channel, if it is one the
/// topology can use.
#[must_use]
pub fn channel_dimension_direction(channel: usize) -> Option<(Dimension, Direction)> {
    let dimension = Dimension::try_from(channel / 2).ok()?;
    let direction = if channel % 2 == 0 {
        Direction::Negative
    } else {
        Direction::Positive
    };
    Some((dimension, direction))
}

/// What to do when both directions around a ring are equally short.
#[derive(clap::ValueEnum, Clone, Copy, Default, Debug, Serialize, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    #[default]
    /// Route in the positive direction
    Positive,

    /// Route in the negative direction
    Negative,
}

/// Configuration of a single dimension
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DimensionConfig {
    /// Number of nodes along this dimension
    pub extent: usize,

    /// Whether the last node connects back to the first
    pub wrap: bool,
}

impl DimensionConfig {
    /// A dimension that is not used
    #[must_use]
    pub fn unused() -> Self {
        Self {
            extent: 1,
            wrap: false,
        }
    }

    /// A line of nodes
    #[must_use]
    pub fn line(extent: usize) -> Self {
        Self {
            extent,
            wrap: false,
        }
    }

    /// A ring of nodes
    #[must_use]
    pub fn ring(extent: usize) -> Self {
        Self { extent, wrap: true }
    }

    #[must_use]
    pub fn is_used(&self) -> bool {
        self.extent > 1
    }

    /// Number of hops from `from` to `to` travelling in `direction`, if that
    /// direction reaches the destination at all.
    #[must_use]
    pub fn hops(&self, from: Coordinate, to: Coordinate, direction: Direction) -> Option<usize> {
        let from = usize::from(from);
        let to = usize::from(to);
        if self.wrap {
            let extent = self.extent;
            Some(match direction {
                Direction::Positive => (to + extent - from % extent) % extent,
                Direction::Negative => (from + extent - to % extent) % extent,
            })
        } else {
            match direction {
                Direction::Positive if to >= from => Some(to - from),
                Direction::Negative if from >= to => Some(from - to),
                _ => None,
            }
        }
    }

    /// Shortest number of hops between two coordinates
    #[must_use]
    pub fn min_hops(&self, from: Coordinate, to: Coordinate) -> usize {
        [Direction::Positive, Direction::Negative]
            .iter()
            .filter_map(|d| self.hops(from, to, *d))
            .min()
            .unwrap_or(0)
    }

    fn step(&self, from: Coordinate, direction: Direction) -> Option<Coordinate> {
        let from = usize::from(from);
        let next = match direction {
            Direction::Positive if from + 1 < self.extent => from + 1,
            Direction::Positive if self.wrap && self.extent > 1 => 0,
            Direction::Negative if from > 0 => from - 1,
            Direction::Negative if self.wrap && self.extent > 1 => self.extent - 1,
            _ => return None,
        };
        Coordinate::try_from(next).ok()
    }
}

impl Default for DimensionConfig {
    fn default() -> Self {
        Self::unused()
    }
}

/// Configuration of the whole fabric topology
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    pub dimensions: [DimensionConfig; DIM],

    #[serde(default)]
    pub tie_break: TieBreak,
}

impl TopologyConfig {
    pub fn new(dimensions: [DimensionConfig; DIM]) -> Result<Self, FabricError> {
        let config = Self {
            dimensions,
            tie_break: TieBreak::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// A mesh of `x * y * z` nodes without wraparound
    pub fn mesh(x: usize, y: usize, z: usize) -> Result<Self, FabricError> {
        Self::new([
            DimensionConfig::line(x),
            DimensionConfig::line(y),
            DimensionConfig::line(z),
        ])
    }

    /// A torus of `x * y * z` nodes, every used dimension wraps around
    pub fn torus(x: usize, y: usize, z: usize) -> Result<Self, FabricError> {
        Self::new([x, y, z].map(|extent| {
            if extent > 1 {
                DimensionConfig::ring(extent)
            } else {
                DimensionConfig::unused()
            }
        }))
    }

    /// A single ring of `n` nodes along `x`
    pub fn ring(n: usize) -> Result<Self, FabricError> {
        Self::torus(n, 1, 1)
    }

    /// Change the extent of some dimensions.
    ///
    /// Every used dimension wraps if `wrap` is given. Otherwise used
    /// dimensions keep their wrap, and dimensions that were unused take the
    /// wrap of the existing ones (a torus stays a torus, a mesh a mesh).
    pub fn resize(
        &self,
        extents: [Option<usize>; DIM],
        wrap: Option<bool>,
    ) -> Result<Self, FabricError> {
        let torus = self.dimensions.iter().any(|d| d.is_used() && d.wrap);
        let mut dimensions = self.dimensions;
        for (d, extent) in dimensions.iter_mut().zip(extents) {
            let was_used = d.is_used();
            let extent = extent.unwrap_or(d.extent);
            let wrap = wrap.unwrap_or(if was_used { d.wrap } else { torus });
            *d = if extent == 1 {
                DimensionConfig::unused()
            } else if wrap {
                DimensionConfig::ring(extent)
            } else {
                DimensionConfig::line(extent)
            };
        }
        Ok(Self::new(dimensions)?.with_tie_break(self.tie_break))
    }

    #[must_use]
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    #[must_use]
    pub fn dimension(&self, dimension: Dimension) -> &DimensionConfig {
        &self.dimensions[dimension.index()]
    }

    /// Check that every dimension has a usable extent
    pub fn validate(&self) -> FabricResult {
        for dimension in Dimension::ALL {
            let config = self.dimension(dimension);
            if config.extent == 0 || config.extent > MAX_EXTENT {
                return fabric_error!(format!(
                    "extent {} of dimension {dimension} must be in [1, {MAX_EXTENT}]",
                    config.extent
                ));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, address: NetworkAddress) -> bool {
        Dimension::ALL
            .iter()
            .all(|d| usize::from(address.coordinate_in(*d)) < self.dimension(*d).extent)
    }

    /// Check that an address lies within the topology
    pub fn validate_address(&self, address: NetworkAddress) -> FabricResult {
        if self.contains(address) {
            Ok(())
        } else {
            fabric_error!(format!(
                "address {address} is outside the {self} topology"
            ))
        }
    }

    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.dimensions.iter().map(|d| d.extent).product()
    }

    /// Iterate over every address in the topology, `x` changing fastest
    pub fn addresses(&self) -> impl Iterator<Item = NetworkAddress> + use<> {
        let [x, y, z] = self.dimensions.map(|d| d.extent);
        iproduct!(0..z, 0..y, 0..x).map(|(z, y, x)| {
            NetworkAddress::new(x as Coordinate, y as Coordinate, z as Coordinate)
        })
    }

    /// The number of channels a node needs so that every used dimension has
    /// both of its channels.
    #[must_use]
    pub fn num_channels_required(&self) -> usize {
        Dimension::ALL
            .iter()
            .filter(|d| self.dimension(**d).is_used())
            .map(|d| channel_for(*d, Direction::Positive) + 1)
            .max()
            .unwrap_or(0)
    }

    /// Return the address of the node reached by leaving `address` on
    /// `channel`, if there is one.
    #[must_use]
    pub fn neighbour(&self, address: NetworkAddress, channel: usize) -> Option<NetworkAddress> {
        let (dimension, direction) = channel_dimension_direction(channel)?;
        let next = self
            .dimension(dimension)
            .step(address.coordinate_in(dimension), direction)?;
        Some(address.with_coordinate(dimension, next))
    }

    /// Shortest number of hops between two addresses
    #[must_use]
    pub fn min_hops(&self, from: NetworkAddress, to: NetworkAddress) -> usize {
        Dimension::ALL
            .iter()
            .map(|d| {
                self.dimension(*d)
                    .min_hops(from.coordinate_in(*d), to.coordinate_in(*d))
            })
            .sum()
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            dimensions: [DimensionConfig::ring(3); DIM],
            tie_break: TieBreak::default(),
        }
    }
}

impl fmt::Display for TopologyConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, d) in self.dimensions.iter().enumerate() {
            if i > 0 {
                write!(f, "x")?;
            }
            write!(f, "{}", d.extent)?;
            if d.wrap {
                write!(f, "w")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_numbering() {
        assert_eq!(channel_for(Dimension::X, Direction::Negative), 0);
        assert_eq!(channel_for(Dimension::X, Direction::Positive), 1);
        assert_eq!(channel_for(Dimension::Z, Direction::Positive), 5);
        for channel in 0..6 {
            let (d, dir) = channel_dimension_direction(channel).unwrap();
            assert_eq!(channel_for(d, dir), channel);
        }
        assert!(channel_dimension_direction(6).is_none());
    }

    #[test]
    fn ring_hops() {
        let ring = DimensionConfig::ring(5);
        assert_eq!(ring.hops(0, 4, Direction::Positive), Some(4));
        assert_eq!(ring.hops(0, 4, Direction::Negative), Some(1));
        assert_eq!(ring.min_hops(0, 4), 1);
        assert_eq!(ring.min_hops(2, 2), 0);
    }

    #[test]
    fn line_hops() {
        let line = DimensionConfig::line(5);
        assert_eq!(line.hops(1, 3, Direction::Positive), Some(2));
        assert_eq!(line.hops(1, 3, Direction::Negative), None);
        assert_eq!(line.min_hops(4, 0), 4);
    }

    #[test]
    fn mesh_edges_have_no_neighbour() {
        let mesh = TopologyConfig::mesh(2, 2, 2).unwrap();
        let origin = NetworkAddress::new(0, 0, 0);
        assert_eq!(mesh.neighbour(origin, 0), None);
        assert_eq!(mesh.neighbour(origin, 1), Some(NetworkAddress::new(1, 0, 0)));
        assert_eq!(mesh.neighbour(origin, 5), Some(NetworkAddress::new(0, 0, 1)));
    }

    #[test]
    fn resize_keeps_mesh_a_mesh() {
        let mesh = TopologyConfig::mesh(4, 3, 1).unwrap();
        let resized = mesh.resize([None, None, Some(3)], None).unwrap();
        assert_eq!(resized, TopologyConfig::mesh(4, 3, 3).unwrap());
    }

    #[test]
    fn resize_keeps_torus_a_torus() {
        let torus = TopologyConfig::ring(4)
            .unwrap()
            .with_tie_break(TieBreak::Negative);
        let resized = torus.resize([None, Some(2), None], None).unwrap();
        assert_eq!(
            resized,
            TopologyConfig::torus(4, 2, 1)
                .unwrap()
                .with_tie_break(TieBreak::Negative)
        );
    }

    #[test]
    fn resize_with_wrap() {
        let mesh = TopologyConfig::mesh(4, 3, 1).unwrap();
        let resized = mesh.resize([None, Some(1), None], Some(true)).unwrap();
        assert_eq!(resized, TopologyConfig::ring(4).unwrap());
        assert!(mesh.resize([Some(0), None, None], None).is_err());
    }

    #[test]
    fn torus_wraps() {
        let torus = TopologyConfig::torus(3, 3, 1).unwrap();
        let origin = NetworkAddress::new(0, 0, 0);
        assert_eq!(torus.neighbour(origin, 0), Some(NetworkAddress::new(2, 0, 0)));
        assert_eq!(torus.neighbour(origin, 2), Some(NetworkAddress::new(0, 2, 0)));
        assert_eq!(torus.neighbour(origin, 4), None);
        assert_eq!(torus.num_channels_required(), 4);
    }

    #[test]
    fn addresses_cover_topology() {
        let torus = TopologyConfig::torus(3, 2, 2).unwrap();
        let addresses: Vec<_> = torus.addresses().collect();
        assert_eq!(addresses.len(), torus.num_nodes());
        assert_eq!(addresses[1], NetworkAddress::new(1, 0, 0));
        assert!(addresses.iter().all(|a| torus.contains(*a)));
    }

    #[test]
    fn bad_extent() {
        assert!(TopologyConfig::mesh(0, 1, 1).is_err());
        assert!(TopologyConfig::mesh(MAX_EXTENT + 1, 1, 1).is_err());
    }

    #[test]
    fn outside_address() {
        let mesh = TopologyConfig::mesh(2, 2, 1).unwrap();
        assert!(mesh.validate_address(NetworkAddress::new(1, 1, 0)).is_ok());
        assert!(mesh.validate_address(NetworkAddress::new(2, 0, 0)).is_err());
        assert!(mesh.validate_address(NetworkAddress::new(0, 0, 1)).is_err());
    }
}
