//! Register-level TCAM operation sequencing.
//!
//! Every TCAM operation is driven through the operation register:
//!
//! ```text
//!  15   14..12   11..10   9    8..0
//! busy    op      page    -    entry
//! ```
//!
//! Software sets `busy` to start an operation and polls until the hardware
//! clears it. Page contents move through the shared data window at registers
//! 0x02..=0x1B. The extension register selects the ingress action block
//! (`0,0`) or an egress port before page 2/3 access.
//!
//! Ingress loads always write page 2, then page 1, then page 0. The chip
//! starts matching an entry as soon as page 0 holds a valid key, so the key
//! must land last.

use crate::codec::{EgressImage, IngressImage, TcamPage, EGRESS_PAGE_WORDS, INVALID_KEY_WORD};
use msd_hal::{MsdError, MsdResult, RegisterTransport};
use tracing::debug;

/// Operation register.
pub const TCAM_OPERATION: u8 = 0x00;

/// Extension register: block in bits 15:12, port in bits 4:0.
pub const TCAM_EXTENSION: u8 = 0x01;

/// First register of the data window.
pub const TCAM_DATA_BASE: u8 = 0x02;

/// Busy bit of the operation register.
pub const TCAM_BUSY: u16 = 1 << 15;

const INGRESS_ENTRY_FIELD: u16 = 0x1FF;
const EGRESS_ENTRY_FIELD: u16 = 0x3F;

/// Operation codes for bits 14:12 of the operation register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcamOp {
    FlushAll = 1,
    FlushEntry = 2,
    Load = 3,
    GetNext = 4,
    Read = 5,
}

impl TcamOp {
    /// Operation register value for this op on (page, entry), busy bit clear.
    pub fn word(self, page: TcamPage, entry: u16) -> u16 {
        (self as u16) << 12 | page.number() << 10 | (entry & INGRESS_ENTRY_FIELD)
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Self::FlushAll),
            2 => Some(Self::FlushEntry),
            3 => Some(Self::Load),
            4 => Some(Self::GetNext),
            5 => Some(Self::Read),
            _ => None,
        }
    }
}

/// Drives TCAM operations over a borrowed transport.
///
/// The caller holds the table lock for the lifetime of this value, so a
/// sequence of operations issued through one `CommitProtocol` is never
/// interleaved with another caller's.
pub struct CommitProtocol<'a, T: RegisterTransport + ?Sized> {
    bus: &'a mut T,
    dev_addr: u8,
    poll_limit: u32,
}

impl<'a, T: RegisterTransport + ?Sized> CommitProtocol<'a, T> {
    pub fn new(bus: &'a mut T, dev_addr: u8, poll_limit: u32) -> Self {
        Self {
            bus,
            dev_addr,
            poll_limit,
        }
    }

    /// Polls the busy bit until it clears or the poll budget runs out.
    pub fn wait_ready(&mut self) -> MsdResult<()> {
        for _ in 0..self.poll_limit {
            if self.bus.read_field(self.dev_addr, TCAM_OPERATION, 15, 1)? == 0 {
                return Ok(());
            }
        }
        Err(MsdError::timeout("TCAM busy bit", self.poll_limit))
    }

    fn start(&mut self, op: TcamOp, page: TcamPage, entry: u16) -> MsdResult<()> {
        debug!(?op, ?page, entry, "starting TCAM operation");
        self.bus
            .write(self.dev_addr, TCAM_OPERATION, TCAM_BUSY | op.word(page, entry))
    }

    fn run(&mut self, op: TcamOp, page: TcamPage, entry: u16) -> MsdResult<()> {
        self.start(op, page, entry)?;
        self.wait_ready()
    }

    fn set_extension(&mut self, block: u8, port: u8) -> MsdResult<()> {
        let value = u16::from(block & 0xF) << 12 | u16::from(port & 0x1F);
        self.bus.write(self.dev_addr, TCAM_EXTENSION, value)
    }

    fn write_window(&mut self, page: TcamPage, image: &[u16]) -> MsdResult<()> {
        for &word in page.live_words() {
            self.bus
                .write(self.dev_addr, window_reg(word), image[word])?;
        }
        Ok(())
    }

    fn read_window(&mut self, page: TcamPage, image: &mut [u16]) -> MsdResult<()> {
        for &word in page.live_words() {
            image[word] = self.bus.read(self.dev_addr, window_reg(word))?;
        }
        Ok(())
    }

    pub fn flush_all(&mut self) -> MsdResult<()> {
        self.wait_ready()?;
        self.run(TcamOp::FlushAll, TcamPage::Key, 0)
    }

    pub fn flush_entry(&mut self, index: u16) -> MsdResult<()> {
        self.wait_ready()?;
        self.run(TcamOp::FlushEntry, TcamPage::Key, index)
    }

    /// Returns true if page 0 of `index` holds a valid key.
    pub fn entry_valid(&mut self, index: u16) -> MsdResult<bool> {
        self.wait_ready()?;
        self.run(TcamOp::Read, TcamPage::Key, index)?;
        let key_word = self.bus.read(self.dev_addr, TCAM_DATA_BASE)?;
        Ok(key_word != INVALID_KEY_WORD)
    }

    /// Writes the three pages of `image` into entry `index`, page 2 first.
    pub fn load(&mut self, index: u16, image: &IngressImage) -> MsdResult<()> {
        self.wait_ready()?;
        self.set_extension(0, 0)?;
        for page in [TcamPage::Action, TcamPage::Window, TcamPage::Key] {
            debug!(index, page = page.number(), "loading TCAM page");
            self.write_window(page, image.page(page))?;
            self.start(TcamOp::Load, page, index)?;
            self.wait_ready()?;
        }
        Ok(())
    }

    /// Reads the three pages of entry `index`.
    pub fn read(&mut self, index: u16) -> MsdResult<IngressImage> {
        let mut image = IngressImage::default();
        self.wait_ready()?;
        for page in [TcamPage::Key, TcamPage::Window, TcamPage::Action] {
            if page == TcamPage::Action {
                self.set_extension(0, 0)?;
            }
            self.run(TcamOp::Read, page, index)?;
            self.read_window(page, image.page_mut(page))?;
        }
        Ok(image)
    }

    /// Asks the hardware for the next valid entry after `from`.
    ///
    /// `from` equal to the entry field's all-ones value wraps to the start of
    /// the table. Returns `None` once no higher valid entry exists.
    pub fn get_next(&mut self, from: u16) -> MsdResult<Option<u16>> {
        self.wait_ready()?;
        self.run(TcamOp::GetNext, TcamPage::Key, from)?;
        let found = self.bus.read(self.dev_addr, TCAM_OPERATION)? & INGRESS_ENTRY_FIELD;
        if found == INGRESS_ENTRY_FIELD {
            // the last entry is reported both when it is valid and when nothing matched
            let key_word = self.bus.read(self.dev_addr, TCAM_DATA_BASE)?;
            if key_word == INVALID_KEY_WORD {
                return Ok(None);
            }
        }
        Ok(Some(found))
    }

    pub fn egress_flush(&mut self, hw_port: u8, index: u8) -> MsdResult<()> {
        self.wait_ready()?;
        self.set_extension(0, hw_port)?;
        self.start(TcamOp::FlushEntry, TcamPage::Egress, index.into())?;
        self.bus.write(self.dev_addr, TCAM_EXTENSION, 0)?;
        self.wait_ready()
    }

    pub fn egress_load(&mut self, hw_port: u8, index: u8, image: &EgressImage) -> MsdResult<()> {
        self.wait_ready()?;
        self.set_extension(0, hw_port)?;
        self.write_window(TcamPage::Egress, image)?;
        self.run(TcamOp::Load, TcamPage::Egress, index.into())
    }

    pub fn egress_read(&mut self, hw_port: u8, index: u8) -> MsdResult<EgressImage> {
        let mut image = [0u16; EGRESS_PAGE_WORDS];
        self.wait_ready()?;
        self.set_extension(0, hw_port)?;
        self.run(TcamOp::Read, TcamPage::Egress, index.into())?;
        self.read_window(TcamPage::Egress, &mut image)?;
        Ok(image)
    }

    /// Egress counterpart of [`get_next`](Self::get_next), scoped to one port.
    pub fn egress_get_next(&mut self, hw_port: u8, from: u8) -> MsdResult<Option<u8>> {
        self.wait_ready()?;
        self.set_extension(0, hw_port)?;
        let word = TcamOp::GetNext.word(TcamPage::Egress, from.into());
        self.bus.write(self.dev_addr, TCAM_OPERATION, word)?;
        self.bus.write(self.dev_addr, TCAM_OPERATION, TCAM_BUSY | word)?;
        self.wait_ready()?;

        let found = self.bus.read(self.dev_addr, TCAM_OPERATION)? & EGRESS_ENTRY_FIELD;
        if found == EGRESS_ENTRY_FIELD {
            let mut empty = true;
            for word in 0..3 {
                if self.bus.read(self.dev_addr, window_reg(word))? != 0 {
                    empty = false;
                }
            }
            if empty {
                return Ok(None);
            }
        }
        // masked to six bits above
        Ok(Some(found as u8))
    }
}

/// Register address of data-window word `word`.
pub fn window_reg(word: usize) -> u8 {
    TCAM_DATA_BASE + word as u8
}
