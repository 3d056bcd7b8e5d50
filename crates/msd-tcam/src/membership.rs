//! Destination-port membership of an existing entry.

use crate::codec::TcamPageCodec;
use crate::table::{check_ingress_index, TcamTable};
use msd_hal::{MsdError, MsdResult, RegisterTransport};
use msd_types::{HwPort, LogicalPort, PortVector};
use tracing::{debug, error, warn};

/// Width of the action's destination port vector.
pub const DPV_WIDTH: u8 = 10;

impl<T: RegisterTransport, C: TcamPageCodec> TcamTable<T, C> {
    /// Adds `port` to the destination port vector of entry `index`.
    pub fn add_entry_port(&self, index: u16, port: LogicalPort) -> MsdResult<()> {
        self.update_entry_port(index, port, true)
    }

    /// Removes `port` from the destination port vector of entry `index`.
    pub fn remove_entry_port(&self, index: u16, port: LogicalPort) -> MsdResult<()> {
        self.update_entry_port(index, port, false)
    }

    /// Read-modify-write of one DPV bit, followed by a full reload of the
    /// entry. Read and reload run under the same lock acquisition.
    fn update_entry_port(&self, index: u16, port: LogicalPort, member: bool) -> MsdResult<()> {
        check_ingress_index(index)?;
        let hw_port = self.dpv_port(port)?;

        let mut bus = self.lock();
        let image = self
            .find_locked(&mut bus, index)?
            .ok_or_else(|| {
                warn!("Cannot update port {} on TCAM entry {}: entry not valid", port, index);
                MsdError::no_such(format!("TCAM entry {}", index))
            })?;

        let mut entry = self.codec().decode_entry(&image);
        let dpv = PortVector(entry.action.dpv_data);
        entry.action.dpv_data = if member {
            dpv.with(hw_port)
        } else {
            dpv.without(hw_port)
        }
        .bits();

        self.load_locked(&mut bus, index, &entry).inspect_err(|e| {
            error!("Failed to update port {} on TCAM entry {}: {}", port, index, e)
        })?;
        debug!(
            "{} port {} on TCAM entry {}, dpv now 0x{:03x}",
            if member { "Added" } else { "Removed" },
            port,
            index,
            entry.action.dpv_data
        );
        Ok(())
    }

    fn dpv_port(&self, port: LogicalPort) -> MsdResult<HwPort> {
        let hw_port = self.device().port_map.to_hw(port)?;
        if hw_port.as_u8() >= DPV_WIDTH {
            return Err(MsdError::bad_param(format!(
                "port {} ({}) is outside the {}-bit destination port vector",
                port, hw_port, DPV_WIDTH
            )));
        }
        Ok(hw_port)
    }
}
