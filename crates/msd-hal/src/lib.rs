//! Register access layer for Marvell switch devices.
//!
//! The TCAM engine never talks to a bus directly. It is written against the
//! small contract in this crate:
//!
//! - [`error`]: driver status codes and the [`MsdError`] type every operation returns
//! - [`transport`]: the blocking [`RegisterTransport`] read/write primitive, with
//!   bit-field helpers for 16-bit and 32-bit extended registers
//! - [`device`]: logical/hardware port translation and per-port SMI addressing
//!
//! # Example
//!
//! ```ignore
//! use msd_hal::{MsdResult, RegisterTransport};
//!
//! fn tcam_busy<T: RegisterTransport>(bus: &mut T) -> MsdResult<bool> {
//!     Ok(bus.read_field(0x1F, 0x00, 15, 1)? == 1)
//! }
//! ```

pub mod device;
pub mod error;
pub mod transport;

pub use device::{PortMap, SwitchDevice};
pub use error::{MsdError, MsdResult, MsdStatus};
pub use transport::{field_mask, field_mask_32, RegisterTransport};
