//! Test infrastructure for the TCAM engine
//!
//! Provides:
//! - Re-exports of the register-level switch simulator
//! - Fault injection (stuck busy bit, failing writes)
//! - Entry and rule fixtures
//! - Write-log verification helpers

pub mod fixtures;
mod verification;

pub use fixtures::*;
pub use msd_tcam::simulator::{RegisterWrite, SimulatedSwitch};
pub use verification::*;
