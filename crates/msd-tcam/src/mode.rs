//! Per-port TCAM search mode.
//!
//! The mode lives in the port's own register block, not in the TCAM block.
//! Changing it while the port forwards traffic is unsafe: callers should
//! disable the port first and re-enable it afterwards.

use crate::codec::TcamPageCodec;
use crate::table::TcamTable;
use crate::types::TcamMode;
use msd_hal::{MsdError, MsdResult, RegisterTransport};
use msd_types::LogicalPort;
use tracing::{info, warn};

/// Port register holding the TCAM mode field.
pub const PORT_PRIORITY_OVERRIDE: u8 = 0x0D;

const MODE_OFFSET: u8 = 0;
const MODE_LEN: u8 = 3;

impl<T: RegisterTransport, C: TcamPageCodec> TcamTable<T, C> {
    pub fn set_mode(&self, port: LogicalPort, mode: TcamMode) -> MsdResult<()> {
        let hw_port = self.device().port_map.to_hw(port)?;
        let dev_addr = self.device().port_dev_addr(hw_port);

        let mut bus = self.lock();
        bus.write_field(
            dev_addr,
            PORT_PRIORITY_OVERRIDE,
            MODE_OFFSET,
            MODE_LEN,
            mode.bits(),
        )?;
        info!("Set TCAM mode of port {} to {}", port, mode);
        Ok(())
    }

    pub fn get_mode(&self, port: LogicalPort) -> MsdResult<TcamMode> {
        let hw_port = self.device().port_map.to_hw(port)?;
        let dev_addr = self.device().port_dev_addr(hw_port);

        let mut bus = self.lock();
        let bits = bus.read_field(dev_addr, PORT_PRIORITY_OVERRIDE, MODE_OFFSET, MODE_LEN)?;
        TcamMode::from_bits(bits).ok_or_else(|| {
            warn!("Port {} reports undefined TCAM mode {}", port, bits);
            MsdError::not_supported(format!("TCAM mode encoding {}", bits))
        })
    }
}
