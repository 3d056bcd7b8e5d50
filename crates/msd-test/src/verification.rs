//! Verification helpers for register write traces

use crate::RegisterWrite;
use msd_tcam::codec::TcamPage;
use msd_tcam::commit::{TcamOp, TCAM_BUSY, TCAM_OPERATION};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Expected {expected:?} page loads for entry {entry}, found {actual:?}")]
    PageOrder {
        entry: u16,
        expected: Vec<TcamPage>,
        actual: Vec<TcamPage>,
    },
}

pub type VerifyResult<T> = Result<T, VerificationError>;

/// Operations started (busy bit set) in `writes`, in order.
pub fn started_ops(writes: &[RegisterWrite], tcam_dev_addr: u8) -> Vec<(TcamOp, TcamPage, u16)> {
    writes
        .iter()
        .filter(|w| w.dev_addr == tcam_dev_addr && w.reg_addr == TCAM_OPERATION)
        .filter(|w| w.data & TCAM_BUSY != 0)
        .filter_map(|w| {
            let op = TcamOp::from_code((w.data >> 12) & 0x7)?;
            Some((op, TcamPage::from_number(w.data >> 10), w.data & 0x1FF))
        })
        .collect()
}

/// Pages loaded into `entry`, in the order they were written.
pub fn loaded_pages(writes: &[RegisterWrite], tcam_dev_addr: u8, entry: u16) -> Vec<TcamPage> {
    started_ops(writes, tcam_dev_addr)
        .into_iter()
        .filter(|(op, page, index)| {
            *op == TcamOp::Load && *index == entry && *page != TcamPage::Egress
        })
        .map(|(_, page, _)| page)
        .collect()
}

/// Checks that `entry` was loaded exactly once, action page first and key
/// page last.
pub fn assert_commit_order(
    writes: &[RegisterWrite],
    tcam_dev_addr: u8,
    entry: u16,
) -> VerifyResult<()> {
    let expected = vec![TcamPage::Action, TcamPage::Window, TcamPage::Key];
    let actual = loaded_pages(writes, tcam_dev_addr, entry);
    if actual != expected {
        return Err(VerificationError::PageOrder {
            entry,
            expected,
            actual,
        });
    }
    Ok(())
}
