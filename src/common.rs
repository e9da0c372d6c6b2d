use std::fmt;
use std::net::Ipv4Addr;

use pnet::util::MacAddr;
use serde::Serialize;

pub const ETHERNET_HEADER_LEN: usize = 14;
pub const IPV4_HEADER_LEN: usize = 20;
pub const ICMP_ECHO_HEADER_LEN: usize = 8;
/// Largest echo payload that keeps the IPv4 total length within 16 bits.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize - IPV4_HEADER_LEN - ICMP_ECHO_HEADER_LEN;

pub const DEFAULT_IFACE: &str = "tun0";
pub const DEFAULT_SRC: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
pub const DEFAULT_DST: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);
pub const DEFAULT_TTL: u8 = 64;
pub const DEFAULT_IP_IDENT: u16 = 1;
pub const ICMP_ECHO_REQUEST: u8 = 8;

/// Field values for one Ethernet/IPv4/ICMP echo frame.
///
/// `src_mac` left as `None` is filled from the outgoing interface at send
/// time, or zeroed when the interface has no hardware address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EchoProbe {
    pub dst_mac: MacAddr,
    pub src_mac: Option<MacAddr>,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub ttl: u8,
    pub ip_ident: u16,
    pub icmp_type: u8,
    pub icmp_code: u8,
    pub icmp_identifier: u16,
    pub icmp_seq_number: u16,
    pub payload: Vec<u8>,
}

impl Default for EchoProbe {
    fn default() -> Self {
        Self {
            dst_mac: MacAddr::broadcast(),
            src_mac: None,
            src: DEFAULT_SRC,
            dst: DEFAULT_DST,
            ttl: DEFAULT_TTL,
            ip_ident: DEFAULT_IP_IDENT,
            icmp_type: ICMP_ECHO_REQUEST,
            icmp_code: 0,
            icmp_identifier: 0,
            icmp_seq_number: 0,
            payload: Vec::new(),
        }
    }
}

impl EchoProbe {
    pub fn icmp_len(&self) -> usize {
        ICMP_ECHO_HEADER_LEN + self.payload.len()
    }

    pub fn datagram_len(&self) -> usize {
        IPV4_HEADER_LEN + self.icmp_len()
    }

    pub fn frame_len(&self) -> usize {
        ETHERNET_HEADER_LEN + self.datagram_len()
    }
}

/// Decoded view of a crafted frame or datagram.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FrameSummary {
    pub eth_dst: Option<String>,
    pub eth_src: Option<String>,
    pub ethertype: Option<u16>,
    pub ip_src: Ipv4Addr,
    pub ip_dst: Ipv4Addr,
    pub ip_ttl: u8,
    pub ip_ident: u16,
    pub ip_total_len: u16,
    pub ip_chksum_ok: bool,
    pub icmp_type: u8,
    pub icmp_code: u8,
    pub icmp_chksum: u16,
    pub icmp_chksum_ok: bool,
    pub icmp_identifier: u16,
    pub icmp_seq_number: u16,
    pub payload_len: usize,
    pub wire_len: usize,
}

impl fmt::Display for FrameSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(src), Some(dst)) = (&self.eth_src, &self.eth_dst) {
            write!(f, "Ether {src} > {dst} / ")?;
        }
        write!(
            f,
            "IP {} > {} ttl={} id={} len={} / ICMP type={} code={} id={} seq={} payload={}",
            self.ip_src,
            self.ip_dst,
            self.ip_ttl,
            self.ip_ident,
            self.ip_total_len,
            self.icmp_type,
            self.icmp_code,
            self.icmp_identifier,
            self.icmp_seq_number,
            self.payload_len
        )?;
        if !self.ip_chksum_ok || !self.icmp_chksum_ok {
            write!(f, " [bad checksum]")?;
        }
        Ok(())
    }
}

/// Outcome of a completed run.
#[derive(Serialize, Debug)]
pub struct SendReport {
    pub iface: String,
    pub sent: u64,
    pub frame: FrameSummary,
}
