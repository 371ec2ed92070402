// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Node addresses.
//!
//! A [NetworkAddress] packs three coordinates, a reserved field and a
//! multicast flag into a single `u32`:
//!
//! ```txt
//!  31 30      24 23      16 15       8 7        0
//! +--+----------+----------+----------+----------+
//! |mc| reserved |    z     |    y     |    x     |
//! +--+----------+----------+----------+----------+
//! ```
//!
//! The packing is the only bit-exact contract of the fabric. It is what
//! travels inside a [GenericAddress] when the address is handed to the
//! surrounding network layer.

use std::fmt;

use crate::fabric_error;
use crate::types::FabricError;

/// Number of dimensions in an address
pub const DIM: usize = 3;

/// A single coordinate of an address
pub type Coordinate = u8;

const COORD_BITS: u32 = 8;
const COORD_MASK: u32 = 0xff;
const RESERVED_SHIFT: u32 = 24;
const RESERVED_MASK: u32 = 0x7f;
const MULTICAST_BIT: u32 = 1 << 31;

/// The dimensions of the fabric in the order they are routed
#[repr(usize)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Dimension {
    X = 0,
    Y,
    Z,
}

impl Dimension {
    /// All dimensions in routing order
    pub const ALL: [Dimension; DIM] = [Dimension::X, Dimension::Y, Dimension::Z];

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<usize> for Dimension {
    type Error = FabricError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        match Dimension::ALL.get(index) {
            Some(dimension) => Ok(*dimension),
            None => fabric_error!(format!(
                "dimension {index} out of range (must be less than {DIM})"
            )),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Dimension::X => "x",
            Dimension::Y => "y",
            Dimension::Z => "z",
        };
        write!(f, "{name}")
    }
}

/// The address of a node in the fabric
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct NetworkAddress {
    raw: u32,
}

impl NetworkAddress {
    /// Create an address with a zero reserved field.
    ///
    /// Coordinates are not checked against any topology here, see
    /// [TopologyConfig::validate_address](crate::topology::TopologyConfig::validate_address).
    #[must_use]
    pub fn new(x: Coordinate, y: Coordinate, z: Coordinate) -> Self {
        Self::with_reserved(x, y, z, 0)
    }

    /// Create an address with a value in the reserved field.
    ///
    /// Only the low 7 bits of `reserved` are kept.
    #[must_use]
    pub fn with_reserved(x: Coordinate, y: Coordinate, z: Coordinate, reserved: u8) -> Self {
        let raw = u32::from(x)
            | (u32::from(y) << COORD_BITS)
            | (u32::from(z) << (2 * COORD_BITS))
            | ((u32::from(reserved) & RESERVED_MASK) << RESERVED_SHIFT);
        Self { raw }
    }

    /// Create an address from its packed form, bit-for-bit.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self { raw }
    }

    /// Create an address from a slice of coordinates ordered x, y, z.
    #[must_use]
    pub fn from_coordinates(coordinates: [Coordinate; DIM]) -> Self {
        Self::new(coordinates[0], coordinates[1], coordinates[2])
    }

    /// Return the packed form of the address.
    #[must_use]
    pub fn raw(&self) -> u32 {
        self.raw
    }

    #[must_use]
    pub fn x(&self) -> Coordinate {
        self.coordinate_in(Dimension::X)
    }

    #[must_use]
    pub fn y(&self) -> Coordinate {
        self.coordinate_in(Dimension::Y)
    }

    #[must_use]
    pub fn z(&self) -> Coordinate {
        self.coordinate_in(Dimension::Z)
    }

    /// Return the coordinate in dimension `d`, which must be less than
    /// [DIM].
    pub fn coordinate(&self, d: usize) -> Result<Coordinate, FabricError> {
        Ok(self.coordinate_in(Dimension::try_from(d)?))
    }

    #[must_use]
    pub fn coordinate_in(&self, dimension: Dimension) -> Coordinate {
        let shift = COORD_BITS * dimension.index() as u32;
        ((self.raw >> shift) & COORD_MASK) as Coordinate
    }

    #[must_use]
    pub fn coordinates(&self) -> [Coordinate; DIM] {
        Dimension::ALL.map(|d| self.coordinate_in(d))
    }

    /// Return a copy of this address with one coordinate replaced.
    #[must_use]
    pub fn with_coordinate(&self, dimension: Dimension, value: Coordinate) -> Self {
        let shift = COORD_BITS * dimension.index() as u32;
        let raw = (self.raw & !(COORD_MASK << shift)) | (u32::from(value) << shift);
        Self { raw }
    }

    #[must_use]
    pub fn reserved(&self) -> u8 {
        ((self.raw >> RESERVED_SHIFT) & RESERVED_MASK) as u8
    }

    #[must_use]
    pub fn is_multicast(&self) -> bool {
        self.raw & MULTICAST_BIT != 0
    }

    pub fn set_multicast(&mut self) {
        self.raw |= MULTICAST_BIT;
    }

    /// Embed the coordinates in a MAC-48 address.
    ///
    /// Bytes are little-endian: `z, y, x` occupy bytes 0 to 2 and the
    /// [MAC48_OUI] is stored reversed in bytes 3 to 5.
    #[must_use]
    pub fn as_mac48(&self) -> [u8; 6] {
        [
            self.z(),
            self.y(),
            self.x(),
            MAC48_OUI[2],
            MAC48_OUI[1],
            MAC48_OUI[0],
        ]
    }
}

/// OUI used by [NetworkAddress::as_mac48]
pub const MAC48_OUI: [u8; 3] = [0xdc, 0xb4, 0xc4];

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{},{})", self.x(), self.y(), self.z())?;
        if self.is_multicast() {
            write!(f, "*")?;
        }
        Ok(())
    }
}

impl fmt::Debug for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}#{:08x}", self.raw)
    }
}

/// Maximum number of bytes a [GenericAddress] can hold
pub const MAX_ADDRESS_BYTES: usize = 20;

/// The kind tag given to fabric addresses inside a [GenericAddress]
pub const FABRIC_ADDRESS_KIND: u8 = 0x4a;

/// A type-tagged container of address bytes.
///
/// This is the form in which the surrounding network layer stores addresses
/// of all kinds. Converting back checks the kind and the length.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GenericAddress {
    kind: u8,
    len: usize,
    bytes: [u8; MAX_ADDRESS_BYTES],
}

impl GenericAddress {
    pub fn new(kind: u8, bytes: &[u8]) -> Result<Self, FabricError> {
        if bytes.len() > MAX_ADDRESS_BYTES {
            return fabric_error!(format!(
                "address of {} bytes exceeds the {MAX_ADDRESS_BYTES} byte limit",
                bytes.len()
            ));
        }
        let mut buffer = [0; MAX_ADDRESS_BYTES];
        buffer[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            kind,
            len: bytes.len(),
            bytes: buffer,
        })
    }

    #[must_use]
    pub fn kind(&self) -> u8 {
        self.kind
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    #[must_use]
    pub fn is_compatible(&self, kind: u8, len: usize) -> bool {
        self.kind == kind && self.len == len
    }
}

impl From<NetworkAddress> for GenericAddress {
    fn from(address: NetworkAddress) -> Self {
        let mut bytes = [0; MAX_ADDRESS_BYTES];
        bytes[..4].copy_from_slice(&address.raw.to_le_bytes());
        Self {
            kind: FABRIC_ADDRESS_KIND,
            len: 4,
            bytes,
        }
    }
}

impl TryFrom<&GenericAddress> for NetworkAddress {
    type Error = FabricError;

    fn try_from(address: &GenericAddress) -> Result<Self, Self::Error> {
        if !address.is_compatible(FABRIC_ADDRESS_KIND, 4) {
            return fabric_error!(format!(
                "generic address of kind {:#x} and {} bytes is not a fabric address",
                address.kind, address.len
            ));
        }
        let mut raw = [0; 4];
        raw.copy_from_slice(address.as_bytes());
        Ok(Self::from_raw(u32::from_le_bytes(raw)))
    }
}
