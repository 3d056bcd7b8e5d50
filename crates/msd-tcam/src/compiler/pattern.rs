//! Structured filter intent accepted by the rule compiler.
//!
//! Every header knows its on-wire byte image; the same structs serve as match
//! pattern and as mask, so a mask is written with the same field names
//! (`sip = "255.255.255.0"`, `dst_port = 65535`).

use crate::types::TcamAction;
use msd_types::MacAddress;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Length of the Ethernet prefix: DA, SA, VLAN tag and EtherType.
pub const ETHERNET_PREFIX_LEN: usize = 18;

pub const IPV4_HEADER_LEN: usize = 20;
pub const IPV6_HEADER_LEN: usize = 40;
pub const TCP_HEADER_LEN: usize = 20;
pub const UDP_HEADER_LEN: usize = 8;
/// URG, ACK, PSH, RST, SYN and FIN. The ECN bits above them are never matched.
pub const TCP_FLAGS_MASK: u8 = 0x3F;

/// The five non-content key fields of the primary entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EthernetKeyMask {
    pub frame_type: u8,
    pub frame_type_mask: u8,
    pub time_key: u8,
    pub time_key_mask: u8,
    pub spv: u16,
    pub spv_mask: u16,
    pub ppri: u8,
    pub ppri_mask: u8,
    pub pvid: u16,
    pub pvid_mask: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ipv4Header {
    pub version: u8,
    pub ihl: u8,
    pub tos: u8,
    pub total_length: u16,
    pub identification: u16,
    pub flags: u8,
    pub fragment_offset: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub sip: Ipv4Addr,
    pub dip: Ipv4Addr,
}

impl Default for Ipv4Header {
    fn default() -> Self {
        Self {
            version: 0,
            ihl: 0,
            tos: 0,
            total_length: 0,
            identification: 0,
            flags: 0,
            fragment_offset: 0,
            ttl: 0,
            protocol: 0,
            checksum: 0,
            sip: Ipv4Addr::UNSPECIFIED,
            dip: Ipv4Addr::UNSPECIFIED,
        }
    }
}

impl Ipv4Header {
    pub fn to_bytes(&self) -> [u8; IPV4_HEADER_LEN] {
        let mut bytes = [0u8; IPV4_HEADER_LEN];
        bytes[0] = (self.version << 4) | (self.ihl & 0x0F);
        bytes[1] = self.tos;
        bytes[2..4].copy_from_slice(&self.total_length.to_be_bytes());
        bytes[4..6].copy_from_slice(&self.identification.to_be_bytes());
        let flags_frag = (u16::from(self.flags & 0x07) << 13) | (self.fragment_offset & 0x1FFF);
        bytes[6..8].copy_from_slice(&flags_frag.to_be_bytes());
        bytes[8] = self.ttl;
        bytes[9] = self.protocol;
        bytes[10..12].copy_from_slice(&self.checksum.to_be_bytes());
        bytes[12..16].copy_from_slice(&self.sip.octets());
        bytes[16..20].copy_from_slice(&self.dip.octets());
        bytes
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ipv6Header {
    pub version: u8,
    pub traffic_class: u8,
    /// 20-bit flow label.
    pub flow_label: u32,
    pub payload_length: u16,
    pub next_header: u8,
    pub hop_limit: u8,
    pub sip: Ipv6Addr,
    pub dip: Ipv6Addr,
}

impl Default for Ipv6Header {
    fn default() -> Self {
        Self {
            version: 0,
            traffic_class: 0,
            flow_label: 0,
            payload_length: 0,
            next_header: 0,
            hop_limit: 0,
            sip: Ipv6Addr::UNSPECIFIED,
            dip: Ipv6Addr::UNSPECIFIED,
        }
    }
}

impl Ipv6Header {
    pub fn to_bytes(&self) -> [u8; IPV6_HEADER_LEN] {
        let mut bytes = [0u8; IPV6_HEADER_LEN];
        let first = (u32::from(self.version & 0x0F) << 28)
            | (u32::from(self.traffic_class) << 20)
            | (self.flow_label & 0x000F_FFFF);
        bytes[0..4].copy_from_slice(&first.to_be_bytes());
        bytes[4..6].copy_from_slice(&self.payload_length.to_be_bytes());
        bytes[6] = self.next_header;
        bytes[7] = self.hop_limit;
        bytes[8..24].copy_from_slice(&self.sip.octets());
        bytes[24..40].copy_from_slice(&self.dip.octets());
        bytes
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq_num: u32,
    pub ack_num: u32,
    /// Header length in 32-bit words (4 bits).
    pub data_offset: u8,
    /// Control flags; only the bits in [`TCP_FLAGS_MASK`] are emitted.
    pub flags: u8,
    pub window: u16,
    pub checksum: u16,
    pub urgent_ptr: u16,
}

impl TcpHeader {
    pub fn to_bytes(&self) -> [u8; TCP_HEADER_LEN] {
        let mut bytes = [0u8; TCP_HEADER_LEN];
        bytes[0..2].copy_from_slice(&self.src_port.to_be_bytes());
        bytes[2..4].copy_from_slice(&self.dst_port.to_be_bytes());
        bytes[4..8].copy_from_slice(&self.seq_num.to_be_bytes());
        bytes[8..12].copy_from_slice(&self.ack_num.to_be_bytes());
        bytes[12] = self.data_offset << 4;
        bytes[13] = self.flags & TCP_FLAGS_MASK;
        bytes[14..16].copy_from_slice(&self.window.to_be_bytes());
        bytes[16..18].copy_from_slice(&self.checksum.to_be_bytes());
        bytes[18..20].copy_from_slice(&self.urgent_ptr.to_be_bytes());
        bytes
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u16,
    pub checksum: u16,
}

impl UdpHeader {
    pub fn to_bytes(&self) -> [u8; UDP_HEADER_LEN] {
        let mut bytes = [0u8; UDP_HEADER_LEN];
        bytes[0..2].copy_from_slice(&self.src_port.to_be_bytes());
        bytes[2..4].copy_from_slice(&self.dst_port.to_be_bytes());
        bytes[4..6].copy_from_slice(&self.length.to_be_bytes());
        bytes[6..8].copy_from_slice(&self.checksum.to_be_bytes());
        bytes
    }
}

/// Packet shapes the compiler understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PktType {
    Ipv4Only,
    Ipv6Only,
    Ipv4Tcp,
    Ipv4Udp,
    Ipv6Tcp,
    Ipv6Udp,
}

impl PktType {
    /// Bytes from the start of the frame to the end of the last matched header.
    pub const fn header_len(self) -> usize {
        ETHERNET_PREFIX_LEN
            + match self {
                Self::Ipv4Only => IPV4_HEADER_LEN,
                Self::Ipv6Only => IPV6_HEADER_LEN,
                Self::Ipv4Tcp => IPV4_HEADER_LEN + TCP_HEADER_LEN,
                Self::Ipv4Udp => IPV4_HEADER_LEN + UDP_HEADER_LEN,
                Self::Ipv6Tcp => IPV6_HEADER_LEN + TCP_HEADER_LEN,
                Self::Ipv6Udp => IPV6_HEADER_LEN + UDP_HEADER_LEN,
            }
    }
}

/// Layer 3/4 headers following the Ethernet prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PacketHeaders {
    Ipv4Only {
        #[serde(default)]
        ipv4: Ipv4Header,
    },
    Ipv6Only {
        #[serde(default)]
        ipv6: Ipv6Header,
    },
    Ipv4Tcp {
        #[serde(default)]
        ipv4: Ipv4Header,
        #[serde(default)]
        tcp: TcpHeader,
    },
    Ipv4Udp {
        #[serde(default)]
        ipv4: Ipv4Header,
        #[serde(default)]
        udp: UdpHeader,
    },
    Ipv6Tcp {
        #[serde(default)]
        ipv6: Ipv6Header,
        #[serde(default)]
        tcp: TcpHeader,
    },
    Ipv6Udp {
        #[serde(default)]
        ipv6: Ipv6Header,
        #[serde(default)]
        udp: UdpHeader,
    },
}

impl PacketHeaders {
    pub fn pkt_type(&self) -> PktType {
        match self {
            Self::Ipv4Only { .. } => PktType::Ipv4Only,
            Self::Ipv6Only { .. } => PktType::Ipv6Only,
            Self::Ipv4Tcp { .. } => PktType::Ipv4Tcp,
            Self::Ipv4Udp { .. } => PktType::Ipv4Udp,
            Self::Ipv6Tcp { .. } => PktType::Ipv6Tcp,
            Self::Ipv6Udp { .. } => PktType::Ipv6Udp,
        }
    }

    /// On-wire bytes of the headers, in frame order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pkt_type().header_len() - ETHERNET_PREFIX_LEN);
        match self {
            Self::Ipv4Only { ipv4 } => bytes.extend_from_slice(&ipv4.to_bytes()),
            Self::Ipv6Only { ipv6 } => bytes.extend_from_slice(&ipv6.to_bytes()),
            Self::Ipv4Tcp { ipv4, tcp } => {
                bytes.extend_from_slice(&ipv4.to_bytes());
                bytes.extend_from_slice(&tcp.to_bytes());
            }
            Self::Ipv4Udp { ipv4, udp } => {
                bytes.extend_from_slice(&ipv4.to_bytes());
                bytes.extend_from_slice(&udp.to_bytes());
            }
            Self::Ipv6Tcp { ipv6, tcp } => {
                bytes.extend_from_slice(&ipv6.to_bytes());
                bytes.extend_from_slice(&tcp.to_bytes());
            }
            Self::Ipv6Udp { ipv6, udp } => {
                bytes.extend_from_slice(&ipv6.to_bytes());
                bytes.extend_from_slice(&udp.to_bytes());
            }
        }
        bytes
    }
}

/// Frame pattern (or mask) from the destination MAC to the end of L4.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PktHeaderPattern {
    #[serde(default)]
    pub da: MacAddress,
    #[serde(default)]
    pub sa: MacAddress,
    /// TPID, PCP, DEI and VID as they appear on the wire.
    #[serde(default)]
    pub vlan_tag: u32,
    #[serde(default)]
    pub ether_type: u16,
    pub headers: PacketHeaders,
}

impl PktHeaderPattern {
    /// Ethernet prefix followed by the L3/L4 headers, in frame order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.headers.pkt_type().header_len());
        bytes.extend_from_slice(&self.da.octets());
        bytes.extend_from_slice(&self.sa.octets());
        bytes.extend_from_slice(&self.vlan_tag.to_be_bytes());
        bytes.extend_from_slice(&self.ether_type.to_be_bytes());
        bytes.extend_from_slice(&self.headers.to_bytes());
        bytes
    }
}

/// One filter rule: where to put it, what to match, what to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancedRule {
    /// Entry holding the first 48 bytes and the action.
    pub primary: u16,
    /// Entry holding the continuation when the headers exceed one entry.
    pub secondary: u16,
    #[serde(default)]
    pub key: EthernetKeyMask,
    pub pattern: PktHeaderPattern,
    pub mask: PktHeaderPattern,
    #[serde(default)]
    pub action: TcamAction,
}

impl AdvancedRule {
    pub fn pkt_type(&self) -> PktType {
        self.pattern.headers.pkt_type()
    }
}
