use std::fmt::Write;

use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::icmp::echo_request::EchoRequestPacket;
use pnet::packet::icmp::{self, IcmpPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::{self, Ipv4Packet};
use pnet::packet::Packet;

use crate::common::{FrameSummary, ICMP_ECHO_HEADER_LEN};
use crate::error::{ProbeError, Result};

pub fn summarize_frame(frame: &[u8]) -> Result<FrameSummary> {
    let eth = EthernetPacket::new(frame).ok_or(ProbeError::Truncated("ethernet header"))?;
    if eth.get_ethertype() != EtherTypes::Ipv4 {
        return Err(ProbeError::UnexpectedProtocol(format!(
            "ethertype {}",
            eth.get_ethertype()
        )));
    }
    let mut summary = summarize_datagram(eth.payload())?;
    summary.eth_dst = Some(eth.get_destination().to_string());
    summary.eth_src = Some(eth.get_source().to_string());
    summary.ethertype = Some(eth.get_ethertype().0);
    summary.wire_len = frame.len();
    Ok(summary)
}

pub fn summarize_datagram(datagram: &[u8]) -> Result<FrameSummary> {
    let ip = Ipv4Packet::new(datagram).ok_or(ProbeError::Truncated("ipv4 header"))?;
    if ip.get_version() != 4 {
        return Err(ProbeError::UnexpectedProtocol(format!(
            "ip version {}",
            ip.get_version()
        )));
    }
    if (ip.get_total_length() as usize) > datagram.len() {
        return Err(ProbeError::Truncated("ipv4 payload"));
    }
    if ip.get_next_level_protocol() != IpNextHeaderProtocols::Icmp {
        return Err(ProbeError::UnexpectedProtocol(format!(
            "ip protocol {}",
            ip.get_next_level_protocol()
        )));
    }

    let icmp_bytes = ip.payload();
    let icmp = IcmpPacket::new(icmp_bytes).ok_or(ProbeError::Truncated("icmp header"))?;
    let echo = EchoRequestPacket::new(icmp_bytes).ok_or(ProbeError::Truncated("icmp echo"))?;

    Ok(FrameSummary {
        eth_dst: None,
        eth_src: None,
        ethertype: None,
        ip_src: ip.get_source(),
        ip_dst: ip.get_destination(),
        ip_ttl: ip.get_ttl(),
        ip_ident: ip.get_identification(),
        ip_total_len: ip.get_total_length(),
        ip_chksum_ok: ipv4::checksum(&ip) == ip.get_checksum(),
        icmp_type: icmp.get_icmp_type().0,
        icmp_code: icmp.get_icmp_code().0,
        icmp_chksum: icmp.get_checksum(),
        icmp_chksum_ok: icmp::checksum(&icmp) == icmp.get_checksum(),
        icmp_identifier: echo.get_identifier(),
        icmp_seq_number: echo.get_sequence_number(),
        payload_len: icmp_bytes.len().saturating_sub(ICMP_ECHO_HEADER_LEN),
        wire_len: datagram.len(),
    })
}

/// Offset, hex and printable-ASCII columns, 16 bytes per row.
pub fn hexdump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let _ = write!(out, "{:04x} ", row * 16);
        for i in 0..16 {
            match chunk.get(i) {
                Some(b) => {
                    let _ = write!(out, " {b:02x}");
                }
                None => out.push_str("   "),
            }
        }
        out.push_str("  ");
        out.extend(chunk.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
        out.push('\n');
    }
    out
}
