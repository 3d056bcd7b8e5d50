//! Blocking register access contract.
//!
//! Implementations own the physical channel (SMI, RMU, a simulator) and are
//! used by exactly one caller at a time; the TCAM table wraps its transport in
//! a mutex, so implementations need no interior locking of their own.
//!
//! Ordinary switch registers are 16 bits wide. Some devices also expose
//! 32-bit extended registers; transports without them keep the default
//! `read_extended`/`write_extended`, which report `NotSupported`.

use crate::error::{MsdError, MsdResult};
use tracing::debug;

/// A 16-bit register read/write primitive addressed by (device, register).
pub trait RegisterTransport: Send {
    /// Reads one 16-bit register.
    fn read(&mut self, dev_addr: u8, reg_addr: u8) -> MsdResult<u16>;

    /// Writes one 16-bit register.
    fn write(&mut self, dev_addr: u8, reg_addr: u8, data: u16) -> MsdResult<()>;

    /// Reads `len` bits starting at bit `offset`.
    fn read_field(&mut self, dev_addr: u8, reg_addr: u8, offset: u8, len: u8) -> MsdResult<u16> {
        let mask = field_mask(offset, len)?;
        let value = self.read(dev_addr, reg_addr)?;
        Ok((value & mask) >> offset)
    }

    /// Read-modify-writes `len` bits starting at bit `offset`; bits of `data`
    /// beyond `len` are ignored.
    fn write_field(
        &mut self,
        dev_addr: u8,
        reg_addr: u8,
        offset: u8,
        len: u8,
        data: u16,
    ) -> MsdResult<()> {
        let mask = field_mask(offset, len)?;
        let current = self.read(dev_addr, reg_addr)?;
        let value = (current & !mask) | ((data << offset) & mask);
        self.write(dev_addr, reg_addr, value)
    }

    /// Reads one 32-bit extended register.
    fn read_extended(&mut self, _dev_addr: u8, _reg_addr: u8) -> MsdResult<u32> {
        Err(MsdError::not_supported("32-bit extended register access"))
    }

    /// Writes one 32-bit extended register.
    fn write_extended(&mut self, _dev_addr: u8, _reg_addr: u8, _data: u32) -> MsdResult<()> {
        Err(MsdError::not_supported("32-bit extended register access"))
    }

    /// Reads `len` bits starting at bit `offset` (0..=31) of an extended register.
    fn read_extended_field(
        &mut self,
        dev_addr: u8,
        reg_addr: u8,
        offset: u8,
        len: u8,
    ) -> MsdResult<u32> {
        let mask = field_mask_32(offset, len)?;
        let value = self.read_extended(dev_addr, reg_addr)?;
        Ok((value & mask) >> offset)
    }

    /// Read-modify-writes `len` bits starting at bit `offset` of an extended
    /// register.
    fn write_extended_field(
        &mut self,
        dev_addr: u8,
        reg_addr: u8,
        offset: u8,
        len: u8,
        data: u32,
    ) -> MsdResult<()> {
        let mask = field_mask_32(offset, len)?;
        let current = self.read_extended(dev_addr, reg_addr)?;
        let value = (current & !mask) | ((data << offset) & mask);
        self.write_extended(dev_addr, reg_addr, value)
    }
}

impl<T: RegisterTransport + ?Sized> RegisterTransport for Box<T> {
    fn read(&mut self, dev_addr: u8, reg_addr: u8) -> MsdResult<u16> {
        (**self).read(dev_addr, reg_addr)
    }

    fn write(&mut self, dev_addr: u8, reg_addr: u8, data: u16) -> MsdResult<()> {
        (**self).write(dev_addr, reg_addr, data)
    }

    fn read_extended(&mut self, dev_addr: u8, reg_addr: u8) -> MsdResult<u32> {
        (**self).read_extended(dev_addr, reg_addr)
    }

    fn write_extended(&mut self, dev_addr: u8, reg_addr: u8, data: u32) -> MsdResult<()> {
        (**self).write_extended(dev_addr, reg_addr, data)
    }
}

/// Mask covering bits `offset..offset + len` of a 16-bit register.
pub fn field_mask(offset: u8, len: u8) -> MsdResult<u16> {
    checked_mask(offset, len, 16).map(|mask| mask as u16)
}

/// Mask covering bits `offset..offset + len` of a 32-bit extended register.
pub fn field_mask_32(offset: u8, len: u8) -> MsdResult<u32> {
    checked_mask(offset, len, 32)
}

fn checked_mask(offset: u8, len: u8, width: u32) -> MsdResult<u32> {
    if len == 0 || u32::from(offset) + u32::from(len) > width {
        debug!(offset, len, width, "rejected register bit field");
        return Err(MsdError::bad_param(format!(
            "bit field offset {} len {} does not fit a {}-bit register",
            offset, len, width
        )));
    }
    Ok((((1u64 << len) - 1) << offset) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Regs(HashMap<(u8, u8), u16>);

    impl RegisterTransport for Regs {
        fn read(&mut self, dev_addr: u8, reg_addr: u8) -> MsdResult<u16> {
            Ok(self.0.get(&(dev_addr, reg_addr)).copied().unwrap_or(0))
        }

        fn write(&mut self, dev_addr: u8, reg_addr: u8, data: u16) -> MsdResult<()> {
            self.0.insert((dev_addr, reg_addr), data);
            Ok(())
        }
    }

    #[derive(Default)]
    struct ExtendedRegs(HashMap<(u8, u8), u32>);

    impl RegisterTransport for ExtendedRegs {
        fn read(&mut self, dev_addr: u8, reg_addr: u8) -> MsdResult<u16> {
            Err(MsdError::transport(dev_addr, reg_addr, "16-bit access"))
        }

        fn write(&mut self, dev_addr: u8, reg_addr: u8, _data: u16) -> MsdResult<()> {
            Err(MsdError::transport(dev_addr, reg_addr, "16-bit access"))
        }

        fn read_extended(&mut self, dev_addr: u8, reg_addr: u8) -> MsdResult<u32> {
            Ok(self.0.get(&(dev_addr, reg_addr)).copied().unwrap_or(0))
        }

        fn write_extended(&mut self, dev_addr: u8, reg_addr: u8, data: u32) -> MsdResult<()> {
            self.0.insert((dev_addr, reg_addr), data);
            Ok(())
        }
    }

    #[test]
    fn test_field_mask() {
        assert_eq!(field_mask(0, 3).unwrap(), 0x0007);
        assert_eq!(field_mask(15, 1).unwrap(), 0x8000);
        assert_eq!(field_mask(0, 16).unwrap(), 0xFFFF);
        assert!(field_mask(14, 3).is_err());
        assert!(field_mask(0, 0).is_err());
    }

    #[test]
    fn test_write_field_preserves_neighbours() {
        let mut regs = Regs::default();
        regs.write(0x10, 0x0D, 0xABC8).unwrap();
        regs.write_field(0x10, 0x0D, 0, 3, 0x2).unwrap();
        assert_eq!(regs.read(0x10, 0x0D).unwrap(), 0xABCA);
        assert_eq!(regs.read_field(0x10, 0x0D, 0, 3).unwrap(), 0x2);
        assert_eq!(regs.read_field(0x10, 0x0D, 12, 4).unwrap(), 0xA);
    }

    #[test]
    fn test_boxed_transport_forwards() {
        let mut boxed: Box<dyn RegisterTransport> = Box::new(Regs::default());
        boxed.write_field(0x1F, 0x01, 12, 4, 0x3).unwrap();
        assert_eq!(boxed.read(0x1F, 0x01).unwrap(), 0x3000);
    }

    #[test]
    fn test_field_mask_32() {
        assert_eq!(field_mask_32(16, 4).unwrap(), 0x000F_0000);
        assert_eq!(field_mask_32(31, 1).unwrap(), 0x8000_0000);
        assert_eq!(field_mask_32(0, 32).unwrap(), 0xFFFF_FFFF);
        assert_eq!(field_mask_32(20, 12).unwrap(), 0xFFF0_0000);
        assert!(field_mask_32(30, 3).is_err());
        assert!(field_mask_32(31, 2).is_err());
        assert!(field_mask_32(8, 0).is_err());
        assert!(field_mask(16, 1).is_err());
    }

    #[test]
    fn test_extended_field_upper_half() {
        let mut regs = ExtendedRegs::default();
        regs.write_extended(0x1C, 0x04, 0x1234_5678).unwrap();

        regs.write_extended_field(0x1C, 0x04, 16, 8, 0xAB).unwrap();
        assert_eq!(regs.read_extended(0x1C, 0x04).unwrap(), 0x12AB_5678);

        regs.write_extended_field(0x1C, 0x04, 31, 1, 0).unwrap();
        assert_eq!(regs.read_extended(0x1C, 0x04).unwrap(), 0x12AB_5678);
        regs.write_extended_field(0x1C, 0x04, 28, 4, 0xF).unwrap();
        assert_eq!(regs.read_extended_field(0x1C, 0x04, 28, 4).unwrap(), 0xF);
        assert_eq!(regs.read_extended_field(0x1C, 0x04, 16, 8).unwrap(), 0xAB);
        assert_eq!(regs.read_extended_field(0x1C, 0x04, 0, 16).unwrap(), 0x5678);
    }

    #[test]
    fn test_extended_field_out_of_range() {
        let mut regs = ExtendedRegs::default();
        let err = regs.write_extended_field(0x1C, 0x04, 24, 9, 1).unwrap_err();
        assert_eq!(err.status(), crate::MsdStatus::BadParam);
        let err = regs.read_extended_field(0x1C, 0x04, 32, 1).unwrap_err();
        assert_eq!(err.status(), crate::MsdStatus::BadParam);
        assert!(regs.0.is_empty());
    }

    #[test]
    fn test_extended_access_not_supported_by_default() {
        let mut regs = Regs::default();
        let err = regs.read_extended_field(0x1C, 0x04, 16, 4).unwrap_err();
        assert_eq!(err.status(), crate::MsdStatus::NotSupported);

        let mut boxed: Box<dyn RegisterTransport> = Box::new(ExtendedRegs::default());
        boxed.write_extended_field(0x1C, 0x05, 20, 4, 0x9).unwrap();
        assert_eq!(boxed.read_extended(0x1C, 0x05).unwrap(), 0x0090_0000);
    }
}
