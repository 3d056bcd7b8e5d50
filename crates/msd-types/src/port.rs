//! Port numbering.
//!
//! A switch device exposes two numbering spaces: the logical ports an
//! application addresses, and the hardware ports the register map uses.
//! The translation between them belongs to the register layer; this module
//! only provides the typed values.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Application-facing port number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalPort(pub u8);

/// Physical port number as seen by the register map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HwPort(pub u8);

impl HwPort {
    /// Pseudo-port addressing every port at once in egress TCAM operations.
    pub const ALL: HwPort = HwPort(0x1F);

    pub const fn as_u8(self) -> u8 {
        self.0
    }
}

impl fmt::Display for LogicalPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for HwPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hw{}", self.0)
    }
}

impl FromStr for LogicalPort {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .map(LogicalPort)
            .map_err(|_| ParseError::InvalidPort(s.to_string()))
    }
}

impl From<u8> for LogicalPort {
    fn from(port: u8) -> Self {
        LogicalPort(port)
    }
}

/// Bitmask of hardware ports, bit `n` standing for [`HwPort`] `n`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortVector(pub u32);

impl PortVector {
    pub const EMPTY: PortVector = PortVector(0);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, port: HwPort) -> bool {
        self.0 & bit(port) != 0
    }

    #[must_use]
    pub fn with(self, port: HwPort) -> Self {
        PortVector(self.0 | bit(port))
    }

    #[must_use]
    pub fn without(self, port: HwPort) -> Self {
        PortVector(self.0 & !bit(port))
    }

    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Iterates the hardware ports present in the vector, lowest first.
    pub fn iter(self) -> impl Iterator<Item = HwPort> {
        (0u8..32).map(HwPort).filter(move |port| self.contains(*port))
    }
}

fn bit(port: HwPort) -> u32 {
    1u32.checked_shl(u32::from(port.0)).unwrap_or(0)
}

impl From<u32> for PortVector {
    fn from(bits: u32) -> Self {
        PortVector(bits)
    }
}
