//! Device addressing: logical to hardware port translation and SMI addresses.

use crate::error::{MsdError, MsdResult};
use msd_types::{HwPort, LogicalPort, PortVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Translates logical ports through the device's valid-port vector.
///
/// Logical port `n` is the `n`-th set bit of the vector, so a device with
/// hardware ports 1..=4 populated (`0b1_1110`) exposes logical ports 0..=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMap {
    valid_ports: PortVector,
}

impl PortMap {
    pub fn new(valid_ports: impl Into<PortVector>) -> Self {
        PortMap {
            valid_ports: valid_ports.into(),
        }
    }

    /// Identity mapping for the first `count` hardware ports.
    pub fn contiguous(count: u8) -> Self {
        let bits = 1u32.checked_shl(u32::from(count)).map_or(u32::MAX, |b| b - 1);
        PortMap::new(bits)
    }

    pub fn valid_ports(&self) -> PortVector {
        self.valid_ports
    }

    pub fn port_count(&self) -> u32 {
        self.valid_ports.count()
    }

    /// Returns the hardware port behind `port`, or `BadParam` if unmapped.
    pub fn to_hw(&self, port: LogicalPort) -> MsdResult<HwPort> {
        self.valid_ports
            .iter()
            .nth(usize::from(port.0))
            .ok_or_else(|| {
                debug!(
                    "logical port {} not in valid port vector 0x{:03x}",
                    port,
                    self.valid_ports.bits()
                );
                MsdError::bad_param(format!("logical port {} is not mapped", port))
            })
    }

    pub fn to_logical(&self, port: HwPort) -> Option<LogicalPort> {
        if !self.valid_ports.contains(port) {
            debug!("hardware port {} is not populated", port);
            return None;
        }
        let position = self.valid_ports.iter().take_while(|p| *p != port).count();
        u8::try_from(position).ok().map(LogicalPort)
    }

    /// Iterates (logical, hardware) pairs in ascending order.
    pub fn ports(&self) -> impl Iterator<Item = (LogicalPort, HwPort)> + '_ {
        self.valid_ports
            .iter()
            .zip(0u8..)
            .map(|(hw, logical)| (LogicalPort(logical), hw))
    }
}

/// Register addressing for one switch device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchDevice {
    /// SMI device address of the TCAM register block.
    pub tcam_dev_addr: u8,
    /// SMI device address of hardware port 0's register block.
    pub base_reg_addr: u8,
    pub port_map: PortMap,
}

impl SwitchDevice {
    /// SMI device address of the per-port register block for `port`.
    pub fn port_dev_addr(&self, port: HwPort) -> u8 {
        self.base_reg_addr.wrapping_add(port.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_contiguous_map_is_identity() {
        let map = PortMap::contiguous(12);
        assert_eq!(map.port_count(), 12);
        assert_eq!(map.to_hw(LogicalPort(0)).unwrap(), HwPort(0));
        assert_eq!(map.to_hw(LogicalPort(11)).unwrap(), HwPort(11));
        assert!(map.to_hw(LogicalPort(12)).is_err());
    }

    #[test]
    fn test_sparse_map_skips_holes() {
        let map = PortMap::new(0b1011_0010u32);
        assert_eq!(map.to_hw(LogicalPort(0)).unwrap(), HwPort(1));
        assert_eq!(map.to_hw(LogicalPort(1)).unwrap(), HwPort(4));
        assert_eq!(map.to_hw(LogicalPort(3)).unwrap(), HwPort(7));
        assert_eq!(map.to_logical(HwPort(5)), Some(LogicalPort(2)));
        assert_eq!(map.to_logical(HwPort(0)), None);
    }

    #[test]
    fn test_ports_pairs() {
        let map = PortMap::new(0b0110u32);
        let pairs: Vec<_> = map.ports().collect();
        assert_eq!(
            pairs,
            vec![(LogicalPort(0), HwPort(1)), (LogicalPort(1), HwPort(2))]
        );
    }

    #[test]
    fn test_unmapped_port_is_logged() {
        use std::io;
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Capture(Arc<Mutex<Vec<u8>>>);

        impl io::Write for Capture {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let map = PortMap::new(0b0110u32);

        let result = tracing::subscriber::with_default(subscriber, || map.to_hw(LogicalPort(5)));

        assert!(result.is_err());
        if tracing::level_filters::STATIC_MAX_LEVEL >= tracing::level_filters::LevelFilter::DEBUG {
            let output = String::from_utf8_lossy(&capture.0.lock().unwrap()).into_owned();
            assert!(output.contains("logical port 5 not in valid port vector 0x006"), "{}", output);
        }
    }

    #[test]
    fn test_port_dev_addr() {
        let device = SwitchDevice {
            tcam_dev_addr: 0x1F,
            base_reg_addr: 0x10,
            port_map: PortMap::contiguous(12),
        };
        assert_eq!(device.port_dev_addr(HwPort(3)), 0x13);
    }
}
