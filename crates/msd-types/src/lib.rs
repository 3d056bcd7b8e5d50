//! Primitive value types shared by the switch register layer and the TCAM engine.
//!
//! - [`MacAddress`]: 48-bit Ethernet address, used both as a match pattern and as a byte mask
//! - [`LogicalPort`] / [`HwPort`]: the two port numbering spaces of a switch device
//! - [`PortVector`]: a bitmask of hardware ports (DPV/SPV fields)

mod mac;
mod port;

pub use mac::MacAddress;
pub use port::{HwPort, LogicalPort, PortVector};

/// Maximum number of switch ports on a single device.
pub const MAX_SWITCH_PORTS: u8 = 12;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid port number: {0}")]
    InvalidPort(String),
}
