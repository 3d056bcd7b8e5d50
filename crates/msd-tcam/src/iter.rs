//! Valid-entry discovery: hardware get-next scans and lookups by index.

use crate::codec::{IngressImage, TcamPageCodec};
use crate::table::{check_ingress_index, TcamTable};
use crate::types::{ScanCursor, TcamEgressData, TcamEntry, EGRESS_ENTRY_MAX, INGRESS_ENTRY_COUNT};
use msd_hal::{MsdError, MsdResult, RegisterTransport};
use msd_types::LogicalPort;
use tracing::debug;

/// Get-next pointer value that restarts an ingress scan.
const INGRESS_SCAN_START: u16 = INGRESS_ENTRY_COUNT - 1;

/// Get-next pointer value that restarts an egress scan.
const EGRESS_SCAN_START: u8 = EGRESS_ENTRY_MAX;

impl<T: RegisterTransport, C: TcamPageCodec> TcamTable<T, C> {
    /// Returns the lowest valid ingress entry selected by `cursor`.
    ///
    /// Fails with `NoSuch` once the scan has passed the last valid entry.
    pub fn get_next(&self, cursor: ScanCursor) -> MsdResult<(u16, TcamEntry)> {
        let from = match cursor {
            ScanCursor::Start => INGRESS_SCAN_START,
            ScanCursor::After(index) => {
                check_ingress_index(index)?;
                if index == INGRESS_ENTRY_COUNT - 1 {
                    return Err(MsdError::no_such("TCAM entry after 511"));
                }
                index
            }
        };

        let mut bus = self.lock();
        let mut protocol = self.protocol(&mut bus);
        let index = protocol
            .get_next(from)?
            .ok_or_else(|| MsdError::no_such(format!("TCAM entry after {:?}", cursor)))?;
        debug!("get-next {:?} found entry {}", cursor, index);
        let image = protocol.read(index)?;
        Ok((index, self.codec().decode_entry(&image)))
    }

    /// Looks up entry `index`, returning `None` if it is not valid.
    pub fn find_entry(&self, index: u16) -> MsdResult<Option<TcamEntry>> {
        check_ingress_index(index)?;
        let mut bus = self.lock();
        Ok(self
            .find_locked(&mut bus, index)?
            .map(|image| self.codec().decode_entry(&image)))
    }

    /// Validity probe for callers already holding the lock.
    ///
    /// Asks the hardware for the next entry after `index - 1`; `index` is
    /// valid exactly when that is `index` itself.
    pub(crate) fn find_locked(&self, bus: &mut T, index: u16) -> MsdResult<Option<IngressImage>> {
        let from = index.checked_sub(1).unwrap_or(INGRESS_SCAN_START);
        let mut protocol = self.protocol(bus);
        match protocol.get_next(from)? {
            Some(found) if found == index => Ok(Some(protocol.read(index)?)),
            _ => {
                debug!("TCAM entry {} is not valid", index);
                Ok(None)
            }
        }
    }

    /// Snapshot of every valid ingress entry, in index order.
    ///
    /// The whole scan runs under one lock acquisition.
    pub fn entries(&self) -> MsdResult<Vec<(u16, TcamEntry)>> {
        let mut bus = self.lock();
        let mut protocol = self.protocol(&mut bus);
        let mut entries = Vec::new();
        let mut from = INGRESS_SCAN_START;

        while let Some(index) = protocol.get_next(from)? {
            let image = protocol.read(index)?;
            entries.push((index, self.codec().decode_entry(&image)));
            if index == INGRESS_ENTRY_COUNT - 1 {
                break;
            }
            from = index;
        }
        Ok(entries)
    }

    /// Returns the lowest valid egress entry of `port` selected by `cursor`.
    pub fn egress_get_next(
        &self,
        port: LogicalPort,
        cursor: ScanCursor,
    ) -> MsdResult<(u8, TcamEgressData)> {
        let hw_port = self.device().port_map.to_hw(port)?;
        let from = match cursor {
            ScanCursor::Start => EGRESS_SCAN_START,
            ScanCursor::After(index) => {
                let index = u8::try_from(index)
                    .ok()
                    .filter(|index| *index <= EGRESS_ENTRY_MAX)
                    .ok_or_else(|| {
                        MsdError::bad_param(format!("egress entry {} out of range", index))
                    })?;
                if index == EGRESS_ENTRY_MAX {
                    return Err(MsdError::no_such(format!(
                        "egress entry after 63 on port {}",
                        port
                    )));
                }
                index
            }
        };

        let mut bus = self.lock();
        let mut protocol = self.protocol(&mut bus);
        let index = protocol
            .egress_get_next(hw_port.as_u8(), from)?
            .ok_or_else(|| {
                MsdError::no_such(format!("egress entry after {:?} on port {}", cursor, port))
            })?;
        let image = protocol.egress_read(hw_port.as_u8(), index)?;
        Ok((index, self.codec().decode_egress(&image)))
    }
}
