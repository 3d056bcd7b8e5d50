//! TCAM rule programming engine for Marvell Fir switches.
//!
//! The engine owns the ingress TCAM (512 entries of key, frame window and
//! action) and the per-port egress TCAM (63 rewrite entries per port), and
//! programs them through the indirect register window of the TCAM block:
//!
//! ```text
//!     AdvancedRule ──compile──► TcamEntry ──TcamPageCodec──► page images
//!                                                                │
//!     TcamTable (lock) ──► CommitProtocol ──► RegisterTransport ◄┘
//! ```
//!
//! - [`types`]: entries, actions, modes and the scan cursor
//! - [`codec`]: encoding of entries into the hardware page layout
//! - [`commit`]: register sequences for load, read, flush and get-next
//! - [`table`]: the locked table and its entry operations
//! - [`compiler`]: structured packet filters to one or two cascaded entries
//! - [`config`]: TOML configuration
//! - `simulator`: register-level model of the TCAM block (`simulator` feature)
//!
//! Entry pages are always written action first and key last: the hardware
//! matches an entry as soon as its key page is valid.

pub mod codec;
pub mod commit;
pub mod compiler;
pub mod config;
mod iter;
mod membership;
mod mode;
#[cfg(feature = "simulator")]
pub mod simulator;
pub mod table;
pub mod types;

pub use codec::{FirCodec, TcamPageCodec};
pub use compiler::{compile, AdvancedRule, CompiledRule, PacketHeaders, PktHeaderPattern, PktType};
pub use config::{ConfigError, TcamConfig};
pub use membership::DPV_WIDTH;
pub use mode::PORT_PRIORITY_OVERRIDE;
pub use table::TcamTable;
pub use types::{
    ColorMode, DpvMode, ScanCursor, TcamAction, TcamEgressData, TcamEntry, TcamKeyMask, TcamMode,
};
