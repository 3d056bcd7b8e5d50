//! Advanced rule compiler.
//!
//! Turns an [`AdvancedRule`] into one or two raw TCAM entries. The frame
//! pattern is serialized into a contiguous content window; headers that end
//! within the first [`WINDOW_BYTES`] fit one entry, longer ones spill into a
//! secondary entry chained from the primary:
//!
//! ```text
//!  primary (p1)                           secondary (p2)
//!  key:  5 fields from the rule           key:  pvid == p2, all else don't care
//!        frame bytes 0..48                      frame bytes 48..96
//!  action: rule action                    action: neutral, terminal
//!          continue = 1, next_id = p2
//! ```
//!
//! Only the primary's action takes effect. A rule is applied as two
//! independent loads: if the second load fails, the first stays in place.

mod pattern;

pub use pattern::{
    AdvancedRule, EthernetKeyMask, Ipv4Header, Ipv6Header, PacketHeaders, PktHeaderPattern,
    PktType, TcpHeader, UdpHeader, ETHERNET_PREFIX_LEN,
};

use crate::codec::TcamPageCodec;
use crate::table::{check_ingress_index, TcamTable};
use crate::types::{TcamAction, TcamEntry, TcamKeyMask, WINDOW_BYTES};
use msd_hal::{MsdError, MsdResult, RegisterTransport};
use tracing::{debug, error, info};

/// Continue code chaining a lookup into `next_id`.
pub const CONTINUE_NEXT: u8 = 1;

/// The entries a rule compiles to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRule {
    pub primary: (u16, TcamEntry),
    pub secondary: Option<(u16, TcamEntry)>,
}

impl CompiledRule {
    pub fn cascaded(&self) -> bool {
        self.secondary.is_some()
    }
}

/// Compiles `rule` without touching hardware.
pub fn compile(rule: &AdvancedRule) -> MsdResult<CompiledRule> {
    check_ingress_index(rule.primary)?;
    let pkt_type = rule.pkt_type();
    if rule.mask.headers.pkt_type() != pkt_type {
        return Err(MsdError::bad_param(format!(
            "pattern is {:?} but mask is {:?}",
            pkt_type,
            rule.mask.headers.pkt_type()
        )));
    }

    let cascaded = pkt_type.header_len() > WINDOW_BYTES;
    if cascaded {
        check_ingress_index(rule.secondary)?;
        if rule.secondary == rule.primary {
            return Err(MsdError::bad_param(format!(
                "{:?} needs two entries but primary and secondary are both {}",
                pkt_type, rule.primary
            )));
        }
    }

    let content = rule.pattern.to_bytes();
    let content_mask = rule.mask.to_bytes();

    let mut key = primary_key(&rule.key);
    fill_window(&mut key, &content, &content_mask, 0);

    let mut action = rule.action.clone();
    if !cascaded {
        action.continue_code = 0;
        action.next_id = 0;
        return Ok(CompiledRule {
            primary: (rule.primary, TcamEntry { key, action }),
            secondary: None,
        });
    }

    action.continue_code = CONTINUE_NEXT;
    action.next_id = rule.secondary;

    let mut secondary_key = TcamKeyMask {
        pvid: rule.secondary,
        pvid_mask: 0x0FFF,
        ..Default::default()
    };
    fill_window(&mut secondary_key, &content, &content_mask, WINDOW_BYTES);

    Ok(CompiledRule {
        primary: (rule.primary, TcamEntry { key, action }),
        secondary: Some((
            rule.secondary,
            TcamEntry {
                key: secondary_key,
                action: TcamAction::default(),
            },
        )),
    })
}

fn primary_key(fields: &EthernetKeyMask) -> TcamKeyMask {
    TcamKeyMask {
        frame_type: fields.frame_type,
        frame_type_mask: fields.frame_type_mask,
        time_key: fields.time_key,
        time_key_mask: fields.time_key_mask,
        spv: fields.spv,
        spv_mask: fields.spv_mask,
        ppri: fields.ppri,
        ppri_mask: fields.ppri_mask,
        pvid: fields.pvid,
        pvid_mask: fields.pvid_mask,
        ..Default::default()
    }
}

/// Copies `content[start..start + WINDOW_BYTES]` into the key's frame window.
fn fill_window(key: &mut TcamKeyMask, content: &[u8], mask: &[u8], start: usize) {
    for (i, (octet, octet_mask)) in content
        .iter()
        .zip(mask)
        .skip(start)
        .take(WINDOW_BYTES)
        .enumerate()
    {
        key.frame_octet[i] = *octet;
        key.frame_octet_mask[i] = *octet_mask;
    }
}

impl<T: RegisterTransport, C: TcamPageCodec> TcamTable<T, C> {
    /// Compiles and loads `rule`. Returns true if the secondary entry was used.
    ///
    /// The secondary entry is loaded before the primary so the primary never
    /// chains into a stale entry.
    ///
    /// Nothing is rolled back. If the primary load fails, the secondary stays
    /// loaded and unreachable; the caller owns the cleanup, typically a
    /// [`flush_entry`](Self::flush_entry) of `rule.secondary`.
    pub fn apply_rule(&self, rule: &AdvancedRule) -> MsdResult<bool> {
        let compiled = compile(rule)?;
        debug!(
            "Compiled {:?} rule into entry {}{}",
            rule.pkt_type(),
            rule.primary,
            if compiled.cascaded() { " (cascaded)" } else { "" }
        );

        if let Some((index, entry)) = &compiled.secondary {
            self.load_entry(*index, entry)
                .inspect_err(|e| error!("Failed to load secondary entry {}: {}", index, e))?;
        }
        let (index, entry) = &compiled.primary;
        self.load_entry(*index, entry)
            .inspect_err(|e| error!("Failed to load primary entry {}: {}", index, e))?;

        info!(
            "Applied {:?} rule at entry {}{}",
            rule.pkt_type(),
            rule.primary,
            match &compiled.secondary {
                Some((index, _)) => format!(" chained to {}", index),
                None => String::new(),
            }
        );
        Ok(compiled.cascaded())
    }
}
