//! Encoding between [`TcamEntry`]/[`TcamEgressData`] and page register images.
//!
//! An ingress entry occupies three pages of the TCAM data window:
//!
//! | Page | Content |
//! |------|---------|
//! | 0 | key fields (4 words) and frame bytes 0..=21 |
//! | 1 | frame bytes 22..=47 |
//! | 2 | action |
//!
//! Egress entries use page 3, which only populates the first four window words.
//! Frame bytes are stored one per word, mask in the high byte and data in the
//! low byte.
//!
//! The codec is a strategy: the commit protocol only moves page images, so a
//! chip family with a different bit layout only needs another
//! [`TcamPageCodec`] implementation.

use crate::types::{
    ColorMode, DpvMode, TcamAction, TcamEgressData, TcamEntry, TcamKeyMask, TsnAction,
    WINDOW_BYTES,
};

/// Words in the TCAM data window (registers 0x02..=0x1B).
pub const PAGE_WORDS: usize = 26;

/// Words used by an egress page.
pub const EGRESS_PAGE_WORDS: usize = 4;

/// Page 0 word 0 of an invalid (flushed) ingress entry.
pub const INVALID_KEY_WORD: u16 = 0x00FF;

/// Frame bytes carried by page 0 after the four key words.
const PAGE0_FRAME_BYTES: usize = PAGE_WORDS - 4;

/// Action page word holding the counter/interrupt controls.
const ACTION_COUNTER_WORD: usize = 25;

/// Register image of one data-window page.
pub type PageImage = [u16; PAGE_WORDS];

/// TCAM pages addressable through the operation register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TcamPage {
    Key,
    Window,
    Action,
    Egress,
}

impl TcamPage {
    /// Page number as encoded in bits 11:10 of the operation register.
    pub const fn number(self) -> u16 {
        match self {
            Self::Key => 0,
            Self::Window => 1,
            Self::Action => 2,
            Self::Egress => 3,
        }
    }

    /// Decodes bits 11:10 of the operation register.
    pub const fn from_number(number: u16) -> Self {
        match number & 0x3 {
            0 => Self::Key,
            1 => Self::Window,
            2 => Self::Action,
            _ => Self::Egress,
        }
    }

    /// Data-window words the hardware defines for this page.
    pub fn live_words(self) -> &'static [usize] {
        static ALL: [usize; PAGE_WORDS] = [
            0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23,
            24, 25,
        ];
        static ACTION: [usize; 13] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, ACTION_COUNTER_WORD];
        match self {
            Self::Key | Self::Window => &ALL,
            Self::Action => &ACTION,
            Self::Egress => &ALL[..EGRESS_PAGE_WORDS],
        }
    }
}

/// Register images of the three pages of an ingress entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngressImage {
    pub key: PageImage,
    pub window: PageImage,
    pub action: PageImage,
}

impl IngressImage {
    /// The image of a flushed entry.
    pub fn invalid() -> Self {
        let mut key = [0; PAGE_WORDS];
        key[0] = INVALID_KEY_WORD;
        IngressImage {
            key,
            window: [0; PAGE_WORDS],
            action: [0; PAGE_WORDS],
        }
    }

    pub fn page(&self, page: TcamPage) -> &PageImage {
        match page {
            TcamPage::Key => &self.key,
            TcamPage::Window => &self.window,
            TcamPage::Action | TcamPage::Egress => &self.action,
        }
    }

    pub fn page_mut(&mut self, page: TcamPage) -> &mut PageImage {
        match page {
            TcamPage::Key => &mut self.key,
            TcamPage::Window => &mut self.window,
            TcamPage::Action | TcamPage::Egress => &mut self.action,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.key[0] != INVALID_KEY_WORD
    }
}

impl Default for IngressImage {
    fn default() -> Self {
        IngressImage {
            key: [0; PAGE_WORDS],
            window: [0; PAGE_WORDS],
            action: [0; PAGE_WORDS],
        }
    }
}

/// Register image of an egress page.
pub type EgressImage = [u16; EGRESS_PAGE_WORDS];

/// Encode/decode contract between the canonical entry types and page images.
pub trait TcamPageCodec: Send + Sync {
    fn encode_entry(&self, entry: &TcamEntry) -> IngressImage;

    fn decode_entry(&self, image: &IngressImage) -> TcamEntry;

    fn encode_egress(&self, data: &TcamEgressData) -> EgressImage;

    fn decode_egress(&self, image: &EgressImage) -> TcamEgressData;
}

/// Bit layout of the Fir (88Q5152 family) TCAM.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirCodec;

fn put(word: &mut u16, value: u16, offset: u8, len: u8) {
    let mask = ((1u32 << len) - 1) as u16;
    *word = (*word & !(mask << offset)) | ((value & mask) << offset);
}

fn get(word: u16, offset: u8, len: u8) -> u16 {
    (word >> offset) & ((1u32 << len) - 1) as u16
}

fn flag(word: u16, offset: u8) -> bool {
    get(word, offset, 1) != 0
}

fn byte(word: u16, offset: u8, len: u8) -> u8 {
    // len <= 8 at every call site
    get(word, offset, len) as u8
}

fn octet_word(data: u8, mask: u8) -> u16 {
    u16::from(mask) << 8 | u16::from(data)
}

impl FirCodec {
    fn encode_key(key: &TcamKeyMask, page0: &mut PageImage, page1: &mut PageImage) {
        let w = page0;
        put(&mut w[0], key.frame_type_mask.into(), 14, 2);
        put(&mut w[0], key.time_key_mask.into(), 13, 1);
        put(&mut w[0], key.spv_mask >> 8, 8, 2);
        put(&mut w[0], key.frame_type.into(), 6, 2);
        put(&mut w[0], key.time_key.into(), 5, 1);
        put(&mut w[0], key.spv >> 8, 0, 2);
        put(&mut w[1], key.spv_mask, 8, 8);
        put(&mut w[1], key.spv, 0, 8);
        put(&mut w[2], key.ppri_mask.into(), 12, 4);
        put(&mut w[2], key.pvid_mask >> 8, 8, 4);
        put(&mut w[2], key.ppri.into(), 4, 4);
        put(&mut w[2], key.pvid >> 8, 0, 4);
        put(&mut w[3], key.pvid_mask, 8, 8);
        put(&mut w[3], key.pvid, 0, 8);

        let pairs = key.frame_octet.iter().zip(key.frame_octet_mask.iter());
        for (i, (data, mask)) in pairs.enumerate() {
            if i < PAGE0_FRAME_BYTES {
                w[4 + i] = octet_word(*data, *mask);
            } else {
                page1[i - PAGE0_FRAME_BYTES] = octet_word(*data, *mask);
            }
        }
    }

    fn decode_key(page0: &PageImage, page1: &PageImage) -> TcamKeyMask {
        let w = page0;
        let mut key = TcamKeyMask {
            frame_type_mask: byte(w[0], 14, 2),
            time_key_mask: byte(w[0], 13, 1),
            spv_mask: get(w[0], 8, 2) << 8 | get(w[1], 8, 8),
            frame_type: byte(w[0], 6, 2),
            time_key: byte(w[0], 5, 1),
            spv: get(w[0], 0, 2) << 8 | get(w[1], 0, 8),
            ppri_mask: byte(w[2], 12, 4),
            ppri: byte(w[2], 4, 4),
            pvid_mask: get(w[2], 8, 4) << 8 | get(w[3], 8, 8),
            pvid: get(w[2], 0, 4) << 8 | get(w[3], 0, 8),
            ..TcamKeyMask::default()
        };

        for i in 0..WINDOW_BYTES {
            let word = if i < PAGE0_FRAME_BYTES {
                w[4 + i]
            } else {
                page1[i - PAGE0_FRAME_BYTES]
            };
            key.frame_octet_mask[i] = byte(word, 8, 8);
            key.frame_octet[i] = byte(word, 0, 8);
        }
        key
    }

    fn encode_action(a: &TcamAction, w: &mut PageImage) {
        put(&mut w[0], a.continue_code.into(), 13, 3);
        put(&mut w[0], a.vid_override.into(), 12, 1);
        put(&mut w[0], a.vid_data, 0, 12);
        put(&mut w[1], a.qpri_override.into(), 7, 1);
        put(&mut w[1], a.qpri_data.into(), 4, 3);
        put(&mut w[1], a.fpri_override.into(), 3, 1);
        put(&mut w[1], a.fpri_data.into(), 0, 3);
        put(&mut w[2], a.dpv_sf.into(), 11, 1);
        put(&mut w[2], (a.dpv_data & 0x3FF) as u16, 0, 10);
        put(&mut w[4], a.dpv_mode.bits(), 14, 2);
        put(&mut w[4], a.color_mode.bits(), 12, 2);
        put(&mut w[4], a.vtu_page_override.into(), 11, 1);
        put(&mut w[4], a.vtu_page.into(), 10, 1);
        put(&mut w[4], a.unknown_filter.into(), 8, 2);
        put(&mut w[4], a.eg_act_point.into(), 0, 6);
        put(&mut w[5], a.ld_balance_override.into(), 15, 1);
        put(&mut w[5], a.ld_balance_data.into(), 12, 3);
        put(&mut w[5], a.tcam_tunnel.into(), 10, 1);
        put(&mut w[5], a.ip_multicast.into(), 9, 1);
        put(&mut w[5], a.ip2me.into(), 8, 1);
        put(&mut w[5], a.route_entry.into(), 7, 1);
        put(&mut w[5], a.dscp_override.into(), 6, 1);
        put(&mut w[5], a.dscp.into(), 0, 6);
        put(&mut w[6], a.faction_override.into(), 15, 1);
        put(&mut w[6], a.faction_data, 0, 15);
        put(&mut w[7], a.next_id, 0, 9);

        let t = &a.tsn;
        put(&mut w[8], t.frer_sctr_inc.into(), 15, 1);
        put(&mut w[8], t.frer_sctr_index.into(), 8, 5);
        put(&mut w[8], t.frer_stream_split_en.into(), 3, 1);
        put(&mut w[8], t.frer_seq_gen_en.into(), 2, 1);
        put(&mut w[8], t.frer_seq_enc_type.into(), 0, 1);
        put(&mut w[9], t.frer_seq_rcvy_en.into(), 15, 1);
        put(&mut w[9], t.frer_seq_rcvy_index.into(), 8, 7);
        put(&mut w[9], t.frer_indv_rcvy_en.into(), 7, 1);
        put(&mut w[9], t.frer_indv_rcvy_id.into(), 0, 7);
        put(&mut w[10], t.flow_meter_en.into(), 7, 1);
        put(&mut w[10], t.flow_meter_id.into(), 0, 7);
        put(&mut w[11], t.ts_domain.into(), 15, 1);
        put(&mut w[11], t.ts_format.into(), 13, 2);
        put(&mut w[11], t.dep_ts_en.into(), 12, 1);
        put(&mut w[11], t.arr_ts_en.into(), 11, 1);
        put(&mut w[11], t.stream_filter_en.into(), 7, 1);
        put(&mut w[11], t.stream_filter_id.into(), 0, 4);

        let c = &mut w[ACTION_COUNTER_WORD];
        put(c, a.interrupt.into(), 15, 1);
        put(c, a.inc_tcam_ctr.into(), 14, 1);
        put(c, a.tcam_ctr.into(), 12, 2);
    }

    fn decode_action(w: &PageImage) -> TcamAction {
        let c = w[ACTION_COUNTER_WORD];
        TcamAction {
            continue_code: byte(w[0], 13, 3),
            vid_override: flag(w[0], 12),
            vid_data: get(w[0], 0, 12),
            qpri_override: flag(w[1], 7),
            qpri_data: byte(w[1], 4, 3),
            fpri_override: flag(w[1], 3),
            fpri_data: byte(w[1], 0, 3),
            dpv_sf: flag(w[2], 11),
            dpv_data: u32::from(get(w[2], 0, 10)),
            dpv_mode: DpvMode::from_bits(get(w[4], 14, 2)),
            color_mode: ColorMode::from_bits(get(w[4], 12, 2)),
            vtu_page_override: flag(w[4], 11),
            vtu_page: byte(w[4], 10, 1),
            unknown_filter: byte(w[4], 8, 2),
            eg_act_point: byte(w[4], 0, 6),
            ld_balance_override: flag(w[5], 15),
            ld_balance_data: byte(w[5], 12, 3),
            tcam_tunnel: flag(w[5], 10),
            ip_multicast: flag(w[5], 9),
            ip2me: flag(w[5], 8),
            route_entry: flag(w[5], 7),
            dscp_override: flag(w[5], 6),
            dscp: byte(w[5], 0, 6),
            faction_override: flag(w[6], 15),
            faction_data: get(w[6], 0, 15),
            next_id: get(w[7], 0, 9),
            tsn: TsnAction {
                frer_sctr_inc: flag(w[8], 15),
                frer_sctr_index: byte(w[8], 8, 5),
                frer_stream_split_en: flag(w[8], 3),
                frer_seq_gen_en: flag(w[8], 2),
                frer_seq_enc_type: byte(w[8], 0, 1),
                frer_seq_rcvy_en: flag(w[9], 15),
                frer_seq_rcvy_index: byte(w[9], 8, 7),
                frer_indv_rcvy_en: flag(w[9], 7),
                frer_indv_rcvy_id: byte(w[9], 0, 7),
                flow_meter_en: flag(w[10], 7),
                flow_meter_id: byte(w[10], 0, 7),
                ts_domain: byte(w[11], 15, 1),
                ts_format: byte(w[11], 13, 2),
                dep_ts_en: flag(w[11], 12),
                arr_ts_en: flag(w[11], 11),
                stream_filter_en: flag(w[11], 7),
                stream_filter_id: byte(w[11], 0, 4),
            },
            interrupt: flag(c, 15),
            inc_tcam_ctr: flag(c, 14),
            tcam_ctr: byte(c, 12, 2),
        }
    }
}

impl TcamPageCodec for FirCodec {
    fn encode_entry(&self, entry: &TcamEntry) -> IngressImage {
        let mut image = IngressImage::default();
        Self::encode_key(&entry.key, &mut image.key, &mut image.window);
        Self::encode_action(&entry.action, &mut image.action);
        image
    }

    fn decode_entry(&self, image: &IngressImage) -> TcamEntry {
        TcamEntry {
            key: Self::decode_key(&image.key, &image.window),
            action: Self::decode_action(&image.action),
        }
    }

    fn encode_egress(&self, d: &TcamEgressData) -> EgressImage {
        let mut w = [0u16; EGRESS_PAGE_WORDS];
        put(&mut w[0], d.frame_mode_override.into(), 14, 1);
        put(&mut w[0], d.frame_mode.into(), 12, 2);
        put(&mut w[0], d.no_ttl_dec.into(), 11, 1);
        put(&mut w[0], d.tag_mode_override.into(), 10, 1);
        put(&mut w[0], d.tag_mode.into(), 8, 2);
        put(&mut w[0], d.da_mode.into(), 4, 2);
        put(&mut w[0], d.sa_mode.into(), 0, 3);
        put(&mut w[1], d.eg_vid_mode_override.into(), 14, 1);
        put(&mut w[1], d.eg_vid_mode.into(), 12, 2);
        put(&mut w[1], d.eg_vid_data, 0, 12);
        put(&mut w[2], d.eg_dscp_mode.into(), 14, 2);
        put(&mut w[2], d.eg_dscp.into(), 8, 6);
        put(&mut w[2], d.eg_fpri_mode_override.into(), 6, 1);
        put(&mut w[2], d.eg_fpri_mode.into(), 4, 2);
        put(&mut w[2], d.eg_ec.into(), 3, 1);
        put(&mut w[2], d.eg_fpri.into(), 0, 3);
        put(&mut w[3], d.eg_frer_seq_enc_type_override.into(), 10, 1);
        put(&mut w[3], d.eg_frer_seq_enc_type.into(), 8, 1);
        put(&mut w[3], d.eg_sid_override.into(), 6, 1);
        put(&mut w[3], d.eg_sid.into(), 0, 6);
        w
    }

    fn decode_egress(&self, w: &EgressImage) -> TcamEgressData {
        TcamEgressData {
            frame_mode_override: flag(w[0], 14),
            frame_mode: byte(w[0], 12, 2),
            no_ttl_dec: flag(w[0], 11),
            tag_mode_override: flag(w[0], 10),
            tag_mode: byte(w[0], 8, 2),
            da_mode: byte(w[0], 4, 2),
            sa_mode: byte(w[0], 0, 3),
            eg_vid_mode_override: flag(w[1], 14),
            eg_vid_mode: byte(w[1], 12, 2),
            eg_vid_data: get(w[1], 0, 12),
            eg_dscp_mode: byte(w[2], 14, 2),
            eg_dscp: byte(w[2], 8, 6),
            eg_fpri_mode_override: flag(w[2], 6),
            eg_fpri_mode: byte(w[2], 4, 2),
            eg_ec: byte(w[2], 3, 1),
            eg_fpri: byte(w[2], 0, 3),
            eg_frer_seq_enc_type_override: flag(w[3], 10),
            eg_frer_seq_enc_type: byte(w[3], 8, 1),
            eg_sid_override: flag(w[3], 6),
            eg_sid: byte(w[3], 0, 6),
        }
    }
}
