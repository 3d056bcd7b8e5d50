//! Test fixtures for common TCAM scenarios
//!
//! Entries built here only use values that fit their hardware fields, so a
//! load followed by a read returns them unchanged.

use crate::SimulatedSwitch;
use msd_tcam::compiler::{Ipv4Header, UdpHeader};
use msd_tcam::{
    AdvancedRule, ColorMode, DpvMode, PacketHeaders, PktHeaderPattern, TcamAction, TcamConfig,
    TcamEgressData, TcamEntry, TcamTable,
};
use msd_types::MacAddress;

/// Default configuration with a short busy poll budget.
pub fn test_config() -> TcamConfig {
    let mut config = TcamConfig::default();
    config.timing.busy_poll_limit = 16;
    config
}

/// A table over a fresh simulator, plus a handle on the same simulator.
pub fn new_table() -> (TcamTable<SimulatedSwitch>, SimulatedSwitch) {
    let sim = SimulatedSwitch::new();
    let table = TcamTable::new(sim.clone(), &test_config());
    (table, sim)
}

/// An entry matching an IPv4 destination MAC on a VLAN, with a few action
/// fields set. `seed` varies the matched content.
pub fn sample_entry(seed: u8) -> TcamEntry {
    let mut entry = TcamEntry::default();
    entry.key.frame_type = 0;
    entry.key.frame_type_mask = 3;
    entry.key.spv = 0x001;
    entry.key.spv_mask = 0x3FF;
    entry.key.pvid = 100;
    entry.key.pvid_mask = 0xFFF;
    let da = [0x00, 0x11, 0x22, 0x33, 0x44, seed];
    entry.key.frame_octet[..6].copy_from_slice(&da);
    entry.key.frame_octet_mask[..6].copy_from_slice(&[0xFF; 6]);
    entry.key.frame_octet[16] = 0x08;
    entry.key.frame_octet_mask[16] = 0xFF;
    entry.key.frame_octet[40] = seed;
    entry.key.frame_octet_mask[40] = 0xFF;

    entry.action = TcamAction {
        qpri_override: true,
        qpri_data: 5,
        dpv_data: 0x005,
        dpv_mode: DpvMode::Override,
        color_mode: ColorMode::ForceGreen,
        inc_tcam_ctr: true,
        tcam_ctr: 1,
        ..Default::default()
    };
    entry
}

/// An egress entry rewriting VID and DSCP.
pub fn sample_egress(vid: u16) -> TcamEgressData {
    TcamEgressData {
        eg_vid_mode_override: true,
        eg_vid_mode: 1,
        eg_vid_data: vid,
        eg_dscp_mode: 1,
        eg_dscp: 34,
        no_ttl_dec: true,
        ..Default::default()
    }
}

/// Broadcast DHCP (IPv4/UDP to port 67) flooded to every port.
pub fn dhcp_rule(primary: u16, secondary: u16) -> AdvancedRule {
    let pattern = PktHeaderPattern {
        da: MacAddress::BROADCAST,
        sa: MacAddress::ZERO,
        vlan_tag: 0,
        ether_type: 0x0800,
        headers: PacketHeaders::Ipv4Udp {
            ipv4: Ipv4Header {
                protocol: 17,
                ..Default::default()
            },
            udp: UdpHeader {
                dst_port: 67,
                ..Default::default()
            },
        },
    };
    let mask = PktHeaderPattern {
        da: MacAddress::BROADCAST,
        sa: MacAddress::ZERO,
        vlan_tag: 0,
        ether_type: 0xFFFF,
        headers: PacketHeaders::Ipv4Udp {
            ipv4: Ipv4Header {
                protocol: 0xFF,
                ..Default::default()
            },
            udp: UdpHeader {
                dst_port: 0xFFFF,
                ..Default::default()
            },
        },
    };
    AdvancedRule {
        primary,
        secondary,
        key: Default::default(),
        pattern,
        mask,
        action: TcamAction {
            dpv_data: 0x3FF,
            dpv_mode: DpvMode::Override,
            ..Default::default()
        },
    }
}
