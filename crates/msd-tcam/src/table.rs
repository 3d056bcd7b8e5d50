//! The TCAM table: a transport, the device layout and a page codec behind one
//! lock.
//!
//! Every public operation takes the lock for its whole register sequence, so
//! two callers can never interleave their writes into the shared data window.

use crate::codec::{FirCodec, TcamPageCodec};
use crate::commit::CommitProtocol;
use crate::config::TcamConfig;
use crate::types::{TcamEgressData, TcamEntry, EGRESS_ENTRY_MAX, INGRESS_ENTRY_COUNT};
use msd_hal::{MsdError, MsdResult, RegisterTransport, SwitchDevice};
use msd_types::{HwPort, LogicalPort};
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, error, info};

pub struct TcamTable<T, C = FirCodec> {
    bus: Mutex<T>,
    codec: C,
    device: SwitchDevice,
    poll_limit: u32,
}

impl<T: RegisterTransport> TcamTable<T, FirCodec> {
    pub fn new(transport: T, config: &TcamConfig) -> Self {
        Self::with_codec(transport, FirCodec, config)
    }
}

impl<T: RegisterTransport, C: TcamPageCodec> TcamTable<T, C> {
    pub fn with_codec(transport: T, codec: C, config: &TcamConfig) -> Self {
        Self {
            bus: Mutex::new(transport),
            codec,
            device: config.switch_device(),
            poll_limit: config.timing.busy_poll_limit,
        }
    }

    pub fn device(&self) -> &SwitchDevice {
        &self.device
    }

    pub(crate) fn codec(&self) -> &C {
        &self.codec
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, T> {
        self.bus.lock()
    }

    pub(crate) fn protocol<'a>(&self, bus: &'a mut T) -> CommitProtocol<'a, T> {
        CommitProtocol::new(bus, self.device.tcam_dev_addr, self.poll_limit)
    }

    /// Consumes the table and hands back the transport.
    pub fn into_transport(self) -> T {
        self.bus.into_inner()
    }

    /// Invalidates every ingress entry.
    pub fn flush_all(&self) -> MsdResult<()> {
        let mut bus = self.lock();
        self.protocol(&mut bus)
            .flush_all()
            .inspect_err(|e| error!("Failed to flush TCAM: {}", e))?;
        info!("Flushed all TCAM entries");
        Ok(())
    }

    pub fn flush_entry(&self, index: u16) -> MsdResult<()> {
        check_ingress_index(index)?;
        let mut bus = self.lock();
        self.protocol(&mut bus)
            .flush_entry(index)
            .inspect_err(|e| error!("Failed to flush TCAM entry {}: {}", index, e))?;
        debug!("Flushed TCAM entry {}", index);
        Ok(())
    }

    /// Writes `entry` at `index`, replacing whatever was there.
    ///
    /// A valid entry is flushed first so the hardware never matches a mix of
    /// old and new pages.
    pub fn load_entry(&self, index: u16, entry: &TcamEntry) -> MsdResult<()> {
        check_ingress_index(index)?;
        let mut bus = self.lock();
        self.load_locked(&mut bus, index, entry)
            .inspect_err(|e| error!("Failed to load TCAM entry {}: {}", index, e))?;
        info!("Loaded TCAM entry {}", index);
        Ok(())
    }

    /// Flush-then-load for callers already holding the lock.
    pub(crate) fn load_locked(&self, bus: &mut T, index: u16, entry: &TcamEntry) -> MsdResult<()> {
        let image = self.codec.encode_entry(entry);
        let mut protocol = self.protocol(bus);
        if protocol.entry_valid(index)? {
            protocol.flush_entry(index)?;
        }
        protocol.load(index, &image)
    }

    /// Reads back entry `index`. A flushed entry decodes to whatever the
    /// hardware holds, use [`find_entry`](Self::find_entry) to test validity.
    pub fn read_entry(&self, index: u16) -> MsdResult<TcamEntry> {
        check_ingress_index(index)?;
        let mut bus = self.lock();
        let image = self.protocol(&mut bus).read(index)?;
        Ok(self.codec.decode_entry(&image))
    }

    pub fn egress_flush_entry(&self, port: LogicalPort, index: u8) -> MsdResult<()> {
        check_egress_index(index)?;
        let hw_port = self.device.port_map.to_hw(port)?;
        self.egress_flush(hw_port, index)
    }

    /// Invalidates egress entry `index` on every port at once.
    pub fn egress_flush_entry_all_ports(&self, index: u8) -> MsdResult<()> {
        check_egress_index(index)?;
        self.egress_flush(HwPort::ALL, index)
    }

    fn egress_flush(&self, hw_port: HwPort, index: u8) -> MsdResult<()> {
        let mut bus = self.lock();
        self.protocol(&mut bus)
            .egress_flush(hw_port.as_u8(), index)
            .inspect_err(|e| {
                error!("Failed to flush egress entry {} on {}: {}", index, hw_port, e)
            })?;
        debug!("Flushed egress entry {} on {}", index, hw_port);
        Ok(())
    }

    pub fn egress_load_entry(
        &self,
        port: LogicalPort,
        index: u8,
        data: &TcamEgressData,
    ) -> MsdResult<()> {
        check_egress_index(index)?;
        let hw_port = self.device.port_map.to_hw(port)?;
        let image = self.codec.encode_egress(data);
        let mut bus = self.lock();
        self.protocol(&mut bus)
            .egress_load(hw_port.as_u8(), index, &image)
            .inspect_err(|e| {
                error!("Failed to load egress entry {} on port {}: {}", index, port, e)
            })?;
        debug!("Loaded egress entry {} on port {}", index, port);
        Ok(())
    }

    pub fn egress_read_entry(&self, port: LogicalPort, index: u8) -> MsdResult<TcamEgressData> {
        check_egress_index(index)?;
        let hw_port = self.device.port_map.to_hw(port)?;
        let mut bus = self.lock();
        let image = self.protocol(&mut bus).egress_read(hw_port.as_u8(), index)?;
        Ok(self.codec.decode_egress(&image))
    }
}

pub(crate) fn check_ingress_index(index: u16) -> MsdResult<()> {
    if index >= INGRESS_ENTRY_COUNT {
        return Err(MsdError::bad_param(format!(
            "TCAM entry {} out of range 0..{}",
            index, INGRESS_ENTRY_COUNT
        )));
    }
    Ok(())
}

pub(crate) fn check_egress_index(index: u8) -> MsdResult<()> {
    if index == 0 || index > EGRESS_ENTRY_MAX {
        return Err(MsdError::bad_param(format!(
            "egress entry {} out of range 1..={}",
            index, EGRESS_ENTRY_MAX
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use msd_hal::MsdStatus;

    #[test]
    fn test_index_bounds() {
        assert!(check_ingress_index(0).is_ok());
        assert!(check_ingress_index(511).is_ok());
        assert_eq!(
            check_ingress_index(512).unwrap_err().status(),
            MsdStatus::BadParam
        );

        assert!(check_egress_index(0).is_err());
        assert!(check_egress_index(1).is_ok());
        assert!(check_egress_index(63).is_ok());
        assert!(check_egress_index(64).is_err());
    }
}
