//! Register-level model of the Fir TCAM block.
//!
//! The model executes operations the moment the busy bit is written and then
//! reports busy for a configurable number of polls. Registers outside the
//! TCAM block behave as plain storage, which is enough for the per-port mode
//! field.
//!
//! Built only with the `simulator` feature, for offline rule checks and
//! tests.

use msd_hal::{MsdError, MsdResult, RegisterTransport};
use crate::codec::{EgressImage, IngressImage, TcamPage, EGRESS_PAGE_WORDS, INVALID_KEY_WORD, PAGE_WORDS};
use crate::commit::{TcamOp, TCAM_BUSY, TCAM_DATA_BASE, TCAM_EXTENSION, TCAM_OPERATION};
use crate::types::{EGRESS_ENTRY_MAX, INGRESS_ENTRY_COUNT};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

const DEFAULT_TCAM_DEV_ADDR: u8 = 0x1F;
const INGRESS_ENTRY_FIELD: u16 = 0x1FF;
const EGRESS_ENTRY_FIELD: u16 = 0x3F;
const ALL_PORTS: u8 = 0x1F;

/// One register write, as seen on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWrite {
    pub dev_addr: u8,
    pub reg_addr: u8,
    pub data: u16,
}

struct SwitchState {
    tcam_dev_addr: u8,
    operation: u16,
    extension: u16,
    window: [u16; PAGE_WORDS],
    ingress: Vec<IngressImage>,
    egress: HashMap<(u8, u8), EgressImage>,
    registers: HashMap<(u8, u8), u16>,
    extended: HashMap<(u8, u8), u32>,
    busy_polls: u32,
    busy_remaining: u32,
    writes_until_failure: Option<usize>,
    writes: Vec<RegisterWrite>,
}

/// Simulated switch. Clones share the same state, so a test can keep a
/// handle for inspection after moving one into a `TcamTable`.
#[derive(Clone)]
pub struct SimulatedSwitch {
    state: Arc<Mutex<SwitchState>>,
}

impl SimulatedSwitch {
    pub fn new() -> Self {
        Self::with_tcam_dev_addr(DEFAULT_TCAM_DEV_ADDR)
    }

    pub fn with_tcam_dev_addr(tcam_dev_addr: u8) -> Self {
        Self {
            state: Arc::new(Mutex::new(SwitchState {
                tcam_dev_addr,
                operation: 0,
                extension: 0,
                window: [0; PAGE_WORDS],
                ingress: vec![IngressImage::invalid(); usize::from(INGRESS_ENTRY_COUNT)],
                egress: HashMap::new(),
                registers: HashMap::new(),
                extended: HashMap::new(),
                busy_polls: 0,
                busy_remaining: 0,
                writes_until_failure: None,
                writes: Vec::new(),
            })),
        }
    }

    /// Keep the busy bit set for `polls` reads after every operation.
    pub fn set_busy_polls(&self, polls: u32) {
        self.state.lock().busy_polls = polls;
    }

    /// Never clear the busy bit again.
    pub fn stick_busy(&self) {
        let mut state = self.state.lock();
        state.busy_polls = u32::MAX;
        state.busy_remaining = u32::MAX;
    }

    /// Let `count` more writes through, then fail every write.
    pub fn fail_after_writes(&self, count: usize) {
        self.state.lock().writes_until_failure = Some(count);
    }

    pub fn clear_faults(&self) {
        let mut state = self.state.lock();
        state.busy_polls = 0;
        state.busy_remaining = 0;
        state.writes_until_failure = None;
    }

    /// Every successful write since creation or the last [`clear_writes`](Self::clear_writes).
    pub fn writes(&self) -> Vec<RegisterWrite> {
        self.state.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.lock().writes.clear();
    }

    pub fn ingress_image(&self, index: u16) -> IngressImage {
        self.state.lock().ingress[usize::from(index)]
    }

    /// Writes an entry image directly, bypassing the operation register.
    pub fn set_ingress_image(&self, index: u16, image: IngressImage) {
        self.state.lock().ingress[usize::from(index)] = image;
    }

    pub fn egress_image(&self, hw_port: u8, index: u8) -> EgressImage {
        self.state
            .lock()
            .egress
            .get(&(hw_port, index))
            .copied()
            .unwrap_or_default()
    }

    pub fn register(&self, dev_addr: u8, reg_addr: u8) -> u16 {
        self.state
            .lock()
            .registers
            .get(&(dev_addr, reg_addr))
            .copied()
            .unwrap_or(0)
    }

    pub fn set_register(&self, dev_addr: u8, reg_addr: u8, data: u16) {
        self.state.lock().registers.insert((dev_addr, reg_addr), data);
    }
}

impl Default for SimulatedSwitch {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterTransport for SimulatedSwitch {
    fn read(&mut self, dev_addr: u8, reg_addr: u8) -> MsdResult<u16> {
        let mut state = self.state.lock();
        if dev_addr != state.tcam_dev_addr {
            return Ok(state.registers.get(&(dev_addr, reg_addr)).copied().unwrap_or(0));
        }
        Ok(match reg_addr {
            TCAM_OPERATION => {
                if state.busy_remaining > 0 {
                    state.busy_remaining -= 1;
                    state.operation | TCAM_BUSY
                } else {
                    state.operation
                }
            }
            TCAM_EXTENSION => state.extension,
            reg if is_window_reg(reg) => state.window[usize::from(reg - TCAM_DATA_BASE)],
            reg => state.registers.get(&(dev_addr, reg)).copied().unwrap_or(0),
        })
    }

    fn write(&mut self, dev_addr: u8, reg_addr: u8, data: u16) -> MsdResult<()> {
        let mut state = self.state.lock();
        match state.writes_until_failure {
            Some(0) => {
                return Err(MsdError::transport(dev_addr, reg_addr, "injected write failure"));
            }
            Some(remaining) => state.writes_until_failure = Some(remaining - 1),
            None => {}
        }
        state.writes.push(RegisterWrite {
            dev_addr,
            reg_addr,
            data,
        });

        if dev_addr != state.tcam_dev_addr {
            state.registers.insert((dev_addr, reg_addr), data);
            return Ok(());
        }
        match reg_addr {
            TCAM_OPERATION => {
                state.operation = data & !TCAM_BUSY;
                if data & TCAM_BUSY != 0 {
                    state.execute(data);
                    state.busy_remaining = state.busy_polls;
                }
            }
            TCAM_EXTENSION => state.extension = data,
            reg if is_window_reg(reg) => state.window[usize::from(reg - TCAM_DATA_BASE)] = data,
            reg => {
                state.registers.insert((dev_addr, reg), data);
            }
        }
        Ok(())
    }

    fn read_extended(&mut self, dev_addr: u8, reg_addr: u8) -> MsdResult<u32> {
        Ok(self
            .state
            .lock()
            .extended
            .get(&(dev_addr, reg_addr))
            .copied()
            .unwrap_or(0))
    }

    fn write_extended(&mut self, dev_addr: u8, reg_addr: u8, data: u32) -> MsdResult<()> {
        self.state.lock().extended.insert((dev_addr, reg_addr), data);
        Ok(())
    }
}

fn is_window_reg(reg: u8) -> bool {
    (TCAM_DATA_BASE..TCAM_DATA_BASE + PAGE_WORDS as u8).contains(&reg)
}

impl SwitchState {
    fn execute(&mut self, word: u16) {
        let Some(op) = TcamOp::from_code((word >> 12) & 0x7) else {
            return;
        };
        let page = TcamPage::from_number(word >> 10);
        let entry = word & INGRESS_ENTRY_FIELD;
        debug!(?op, ?page, entry, "simulated TCAM operation");

        if page == TcamPage::Egress {
            // six-bit entry field
            self.execute_egress(op, (entry & EGRESS_ENTRY_FIELD) as u8);
        } else {
            self.execute_ingress(op, page, entry);
        }
    }

    fn execute_ingress(&mut self, op: TcamOp, page: TcamPage, entry: u16) {
        let index = usize::from(entry);
        match op {
            TcamOp::FlushAll => self.ingress.fill(IngressImage::invalid()),
            TcamOp::FlushEntry => self.ingress[index] = IngressImage::invalid(),
            TcamOp::Load => {
                let window = self.window;
                let target = self.ingress[index].page_mut(page);
                for &word in page.live_words() {
                    target[word] = window[word];
                }
            }
            TcamOp::Read => self.window = *self.ingress[index].page(page),
            TcamOp::GetNext => {
                let start = if entry == INGRESS_ENTRY_FIELD { 0 } else { index + 1 };
                let found = (start..usize::from(INGRESS_ENTRY_COUNT))
                    .find(|i| self.ingress[*i].is_valid());
                self.operation &= !INGRESS_ENTRY_FIELD;
                match found {
                    Some(i) => {
                        self.operation |= i as u16;
                        self.window = self.ingress[i].key;
                    }
                    None => {
                        self.operation |= INGRESS_ENTRY_FIELD;
                        self.window[0] = INVALID_KEY_WORD;
                    }
                }
            }
        }
    }

    fn execute_egress(&mut self, op: TcamOp, index: u8) {
        // port field of the extension register
        let port = (self.extension & 0x1F) as u8;
        match op {
            TcamOp::FlushEntry if port == ALL_PORTS => {
                self.egress.retain(|(_, entry), _| *entry != index);
            }
            TcamOp::FlushEntry => {
                self.egress.remove(&(port, index));
            }
            TcamOp::Load => {
                let mut image = [0u16; EGRESS_PAGE_WORDS];
                image.copy_from_slice(&self.window[..EGRESS_PAGE_WORDS]);
                self.egress.insert((port, index), image);
            }
            TcamOp::Read => {
                let image = self.egress.get(&(port, index)).copied().unwrap_or_default();
                self.window[..EGRESS_PAGE_WORDS].copy_from_slice(&image);
            }
            TcamOp::GetNext => {
                let start = if u16::from(index) == EGRESS_ENTRY_FIELD { 1 } else { index + 1 };
                let found = (start..=EGRESS_ENTRY_MAX).find_map(|i| {
                    self.egress
                        .get(&(port, i))
                        .filter(|image| image.iter().any(|word| *word != 0))
                        .map(|image| (i, *image))
                });
                self.operation &= !INGRESS_ENTRY_FIELD;
                match found {
                    Some((i, image)) => {
                        self.operation |= u16::from(i);
                        self.window[..EGRESS_PAGE_WORDS].copy_from_slice(&image);
                    }
                    None => {
                        self.operation |= EGRESS_ENTRY_FIELD;
                        self.window[..EGRESS_PAGE_WORDS].fill(0);
                    }
                }
            }
            TcamOp::FlushAll => self.egress.retain(|(p, _), _| *p != port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_busy_bit_clears_after_polls() {
        let mut sim = SimulatedSwitch::new();
        sim.set_busy_polls(2);
        sim.write(0x1F, TCAM_OPERATION, TCAM_BUSY | 0x1000).unwrap();

        assert_eq!(sim.read(0x1F, TCAM_OPERATION).unwrap(), TCAM_BUSY | 0x1000);
        assert_eq!(sim.read(0x1F, TCAM_OPERATION).unwrap(), TCAM_BUSY | 0x1000);
        assert_eq!(sim.read(0x1F, TCAM_OPERATION).unwrap(), 0x1000);
    }

    #[test]
    fn test_get_next_on_empty_table() {
        let mut sim = SimulatedSwitch::new();
        sim.write(0x1F, TCAM_OPERATION, TCAM_BUSY | 0x41FF).unwrap();

        assert_eq!(sim.read(0x1F, TCAM_OPERATION).unwrap() & 0x1FF, 0x1FF);
        assert_eq!(sim.read(0x1F, TCAM_DATA_BASE).unwrap(), INVALID_KEY_WORD);
    }

    #[test]
    fn test_injected_write_failure() {
        let mut sim = SimulatedSwitch::new();
        sim.fail_after_writes(1);
        assert!(sim.write(0x1F, 0x02, 1).is_ok());
        assert!(sim.write(0x1F, 0x03, 1).is_err());
        assert_eq!(sim.writes().len(), 1);
    }

    #[test]
    fn test_port_registers_are_storage() {
        let mut sim = SimulatedSwitch::new();
        sim.write(0x03, 0x0D, 0x0002).unwrap();
        assert_eq!(sim.register(0x03, 0x0D), 0x0002);
        assert_eq!(sim.read(0x03, 0x0D).unwrap(), 0x0002);
    }

    #[test]
    fn test_extended_registers_are_storage() {
        let mut sim = SimulatedSwitch::new();
        sim.write_extended_field(0x1C, 0x10, 24, 8, 0x5A).unwrap();
        assert_eq!(sim.read_extended(0x1C, 0x10).unwrap(), 0x5A00_0000);
        assert_eq!(sim.read_extended_field(0x1C, 0x10, 28, 4).unwrap(), 0x5);
        assert!(sim.writes().is_empty());
    }
}
