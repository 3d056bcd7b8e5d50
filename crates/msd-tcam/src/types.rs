//! TCAM data model.
//!
//! One ingress entry is a [`TcamKeyMask`] (what to match) plus a
//! [`TcamAction`] (what to do on a hit). Egress entries are a flat set of
//! per-port rewrite instructions, [`TcamEgressData`].
//!
//! Mask convention: a set mask bit means "compare this bit", a clear mask bit
//! means "don't care". An all-zero mask matches every frame.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of ingress entries.
pub const INGRESS_ENTRY_COUNT: u16 = 512;

/// Highest egress entry index. Valid egress indices are `1..=EGRESS_ENTRY_MAX`.
pub const EGRESS_ENTRY_MAX: u8 = 63;

/// Bytes of frame content one ingress entry can match.
pub const WINDOW_BYTES: usize = 48;

/// Destination port vector handling on a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DpvMode {
    /// Leave the frame's destination ports alone.
    #[default]
    DoNothing,
    /// Intersect with `dpv_data`.
    And,
    /// Union with `dpv_data`.
    Or,
    /// Replace with `dpv_data`.
    Override,
}

impl DpvMode {
    pub const fn bits(self) -> u16 {
        match self {
            Self::DoNothing => 0,
            Self::And => 1,
            Self::Or => 2,
            Self::Override => 3,
        }
    }

    pub const fn from_bits(bits: u16) -> Self {
        match bits & 0x3 {
            0 => Self::DoNothing,
            1 => Self::And,
            2 => Self::Or,
            _ => Self::Override,
        }
    }
}

/// Frame color assignment on a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    #[default]
    PassThrough,
    ForceRed,
    ForceYellow,
    ForceGreen,
}

impl ColorMode {
    pub const fn bits(self) -> u16 {
        match self {
            Self::PassThrough => 0,
            Self::ForceRed => 1,
            Self::ForceYellow => 2,
            Self::ForceGreen => 3,
        }
    }

    pub const fn from_bits(bits: u16) -> Self {
        match bits & 0x3 {
            0 => Self::PassThrough,
            1 => Self::ForceRed,
            2 => Self::ForceYellow,
            _ => Self::ForceGreen,
        }
    }
}

/// Per-port TCAM search width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TcamMode {
    #[default]
    Disable,
    /// Match the first 48 bytes of the frame.
    #[serde(rename = "enable_48", alias = "48")]
    Enable48,
    /// Match 96 bytes using cascaded entries.
    #[serde(rename = "enable_96", alias = "96")]
    Enable96,
    WithoutFifoDelay,
    /// Match 144 bytes using cascaded entries.
    #[serde(rename = "enable_144", alias = "144")]
    Enable144,
}

impl TcamMode {
    pub const fn bits(self) -> u16 {
        match self {
            Self::Disable => 0,
            Self::Enable48 => 1,
            Self::Enable96 => 2,
            Self::WithoutFifoDelay => 3,
            Self::Enable144 => 4,
        }
    }

    /// Returns `None` for encodings the hardware does not define.
    pub const fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            0 => Some(Self::Disable),
            1 => Some(Self::Enable48),
            2 => Some(Self::Enable96),
            3 => Some(Self::WithoutFifoDelay),
            4 => Some(Self::Enable144),
            _ => None,
        }
    }
}

impl fmt::Display for TcamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disable => write!(f, "disable"),
            Self::Enable48 => write!(f, "enable_48"),
            Self::Enable96 => write!(f, "enable_96"),
            Self::WithoutFifoDelay => write!(f, "without_fifo_delay"),
            Self::Enable144 => write!(f, "enable_144"),
        }
    }
}

impl FromStr for TcamMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "disable" => Ok(Self::Disable),
            "enable_48" | "48" => Ok(Self::Enable48),
            "enable_96" | "96" => Ok(Self::Enable96),
            "without_fifo_delay" => Ok(Self::WithoutFifoDelay),
            "enable_144" | "144" => Ok(Self::Enable144),
            _ => Err(format!("Unknown TCAM mode: {}", s)),
        }
    }
}

/// Where a get-next scan resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanCursor {
    /// Return the lowest valid entry.
    Start,
    /// Return the lowest valid entry strictly above this index.
    After(u16),
}

/// Match key of an ingress entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcamKeyMask {
    pub frame_type: u8,
    pub frame_type_mask: u8,
    pub time_key: u8,
    pub time_key_mask: u8,
    /// Source port vector (10 bits).
    pub spv: u16,
    pub spv_mask: u16,
    /// Provider priority (3 bits).
    pub ppri: u8,
    pub ppri_mask: u8,
    /// Provider VID (12 bits). Cascaded entries match the previous entry's
    /// `next_id` here.
    pub pvid: u16,
    pub pvid_mask: u16,
    /// Raw frame content, byte 0 being the first byte of the destination MAC.
    pub frame_octet: [u8; WINDOW_BYTES],
    pub frame_octet_mask: [u8; WINDOW_BYTES],
}

impl Default for TcamKeyMask {
    fn default() -> Self {
        Self {
            frame_type: 0,
            frame_type_mask: 0,
            time_key: 0,
            time_key_mask: 0,
            spv: 0,
            spv_mask: 0,
            ppri: 0,
            ppri_mask: 0,
            pvid: 0,
            pvid_mask: 0,
            frame_octet: [0; WINDOW_BYTES],
            frame_octet_mask: [0; WINDOW_BYTES],
        }
    }
}

/// TSN action fields: FRER, flow metering, timestamping and stream filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TsnAction {
    pub frer_sctr_inc: bool,
    pub frer_sctr_index: u8,
    pub frer_stream_split_en: bool,
    pub frer_seq_gen_en: bool,
    pub frer_seq_enc_type: u8,
    pub frer_seq_rcvy_en: bool,
    pub frer_seq_rcvy_index: u8,
    pub frer_indv_rcvy_en: bool,
    pub frer_indv_rcvy_id: u8,
    pub flow_meter_en: bool,
    pub flow_meter_id: u8,
    pub ts_domain: u8,
    pub ts_format: u8,
    pub dep_ts_en: bool,
    pub arr_ts_en: bool,
    pub stream_filter_en: bool,
    pub stream_filter_id: u8,
}

/// Action of an ingress entry.
///
/// The default value is the neutral action: no overrides, no chaining, DPV
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcamAction {
    /// Non-zero chains the lookup to entry `next_id` (3 bits).
    pub continue_code: u8,
    pub next_id: u16,
    pub interrupt: bool,
    pub inc_tcam_ctr: bool,
    pub tcam_ctr: u8,
    pub vid_override: bool,
    pub vid_data: u16,
    pub qpri_override: bool,
    pub qpri_data: u8,
    pub fpri_override: bool,
    pub fpri_data: u8,
    /// Source port filter.
    pub dpv_sf: bool,
    /// Destination port vector, one bit per hardware port.
    pub dpv_data: u32,
    pub dpv_mode: DpvMode,
    pub color_mode: ColorMode,
    pub vtu_page_override: bool,
    pub vtu_page: u8,
    pub unknown_filter: u8,
    /// Egress action pointer (egress entry index, 0 for none).
    pub eg_act_point: u8,
    pub ld_balance_override: bool,
    pub ld_balance_data: u8,
    pub tcam_tunnel: bool,
    pub ip_multicast: bool,
    pub ip2me: bool,
    pub route_entry: bool,
    pub dscp_override: bool,
    pub dscp: u8,
    pub faction_override: bool,
    pub faction_data: u16,
    pub tsn: TsnAction,
}

/// A complete ingress entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TcamEntry {
    pub key: TcamKeyMask,
    pub action: TcamAction,
}

/// Per-port egress rewrite entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcamEgressData {
    pub frame_mode_override: bool,
    pub frame_mode: u8,
    /// Do not decrement the IP TTL.
    pub no_ttl_dec: bool,
    pub tag_mode_override: bool,
    pub tag_mode: u8,
    pub da_mode: u8,
    pub sa_mode: u8,
    pub eg_vid_mode_override: bool,
    pub eg_vid_mode: u8,
    pub eg_vid_data: u16,
    pub eg_dscp_mode: u8,
    pub eg_dscp: u8,
    pub eg_fpri_mode_override: bool,
    pub eg_fpri_mode: u8,
    pub eg_ec: u8,
    pub eg_fpri: u8,
    pub eg_frer_seq_enc_type_override: bool,
    pub eg_frer_seq_enc_type: u8,
    /// Spanning tree instance override.
    pub eg_sid_override: bool,
    pub eg_sid: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mode_bits_round_trip() {
        for mode in [
            TcamMode::Disable,
            TcamMode::Enable48,
            TcamMode::Enable96,
            TcamMode::WithoutFifoDelay,
            TcamMode::Enable144,
        ] {
            assert_eq!(TcamMode::from_bits(mode.bits()), Some(mode));
        }
        assert_eq!(TcamMode::from_bits(7), None);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("enable-96".parse::<TcamMode>().unwrap(), TcamMode::Enable96);
        assert_eq!("144".parse::<TcamMode>().unwrap(), TcamMode::Enable144);
        assert!("fast".parse::<TcamMode>().is_err());
    }

    #[test]
    fn test_mode_serde_names() {
        #[derive(Deserialize)]
        struct Port {
            mode: TcamMode,
        }

        let port: Port = toml::from_str(r#"mode = "enable_96""#).unwrap();
        assert_eq!(port.mode, TcamMode::Enable96);
        let port: Port = toml::from_str(r#"mode = "144""#).unwrap();
        assert_eq!(port.mode, TcamMode::Enable144);
        let port: Port = toml::from_str(r#"mode = "without_fifo_delay""#).unwrap();
        assert_eq!(port.mode, TcamMode::WithoutFifoDelay);
    }

    #[test]
    fn test_dpv_and_color_decoding_masks_width() {
        assert_eq!(DpvMode::from_bits(0b111), DpvMode::Override);
        assert_eq!(ColorMode::from_bits(0b101), ColorMode::ForceRed);
        assert_eq!(DpvMode::Or.bits(), 2);
    }

    #[test]
    fn test_default_action_is_neutral() {
        let action = TcamAction::default();
        assert_eq!(action.continue_code, 0);
        assert_eq!(action.dpv_mode, DpvMode::DoNothing);
        assert_eq!(action.color_mode, ColorMode::PassThrough);
    }
}
