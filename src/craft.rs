use pnet::packet::ethernet::{EtherTypes, MutableEthernetPacket};
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::{self, IcmpCode, IcmpPacket, IcmpType};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::{self, MutableIpv4Packet};
use pnet::packet::{MutablePacket, Packet};
use pnet::util::MacAddr;

use crate::common::{EchoProbe, ETHERNET_HEADER_LEN, MAX_PAYLOAD_LEN};
use crate::error::{ProbeError, Result};

/// Builds the full Ethernet II frame for `probe`.
///
/// `src_mac` is used when the probe does not pin its own source address.
pub fn build_frame(probe: &EchoProbe, src_mac: MacAddr) -> Result<Vec<u8>> {
    check_len(probe)?;
    let mut buf = vec![0u8; probe.frame_len()];

    let mut eth = MutableEthernetPacket::new(&mut buf)
        .ok_or(ProbeError::BuildFailed("ethernet buffer too short"))?;
    eth.set_destination(probe.dst_mac);
    eth.set_source(probe.src_mac.unwrap_or(src_mac));
    eth.set_ethertype(EtherTypes::Ipv4);
    write_datagram(probe, eth.payload_mut())?;

    debug_assert_eq!(buf.len(), ETHERNET_HEADER_LEN + probe.datagram_len());
    Ok(buf)
}

/// Builds only the IPv4 datagram (no link header), for layer-3 sends.
pub fn build_datagram(probe: &EchoProbe) -> Result<Vec<u8>> {
    check_len(probe)?;
    let mut buf = vec![0u8; probe.datagram_len()];
    write_datagram(probe, &mut buf)?;
    Ok(buf)
}

fn check_len(probe: &EchoProbe) -> Result<()> {
    if probe.payload.len() > MAX_PAYLOAD_LEN {
        return Err(ProbeError::PayloadTooLarge(probe.payload.len()));
    }
    Ok(())
}

fn write_datagram(probe: &EchoProbe, buf: &mut [u8]) -> Result<()> {
    let mut ip =
        MutableIpv4Packet::new(buf).ok_or(ProbeError::BuildFailed("ipv4 buffer too short"))?;
    ip.set_version(4);
    ip.set_header_length(5);
    ip.set_dscp(0);
    ip.set_ecn(0);
    // total length must be in place before payload_mut() can size the slice
    ip.set_total_length(probe.datagram_len() as u16);
    ip.set_identification(probe.ip_ident);
    ip.set_flags(0);
    ip.set_fragment_offset(0);
    ip.set_ttl(probe.ttl);
    ip.set_next_level_protocol(IpNextHeaderProtocols::Icmp);
    ip.set_source(probe.src);
    ip.set_destination(probe.dst);

    write_echo(probe, ip.payload_mut())?;

    ip.set_checksum(0);
    let checksum = ipv4::checksum(&ip.to_immutable());
    ip.set_checksum(checksum);
    Ok(())
}

fn write_echo(probe: &EchoProbe, buf: &mut [u8]) -> Result<()> {
    let mut echo = MutableEchoRequestPacket::new(buf)
        .ok_or(ProbeError::BuildFailed("icmp buffer too short"))?;
    echo.set_icmp_type(IcmpType(probe.icmp_type));
    echo.set_icmp_code(IcmpCode(probe.icmp_code));
    echo.set_identifier(probe.icmp_identifier);
    echo.set_sequence_number(probe.icmp_seq_number);
    echo.set_payload(&probe.payload);
    echo.set_checksum(0);

    let checksum = icmp::checksum(
        &IcmpPacket::new(echo.packet()).ok_or(ProbeError::BuildFailed("icmp view"))?,
    );
    echo.set_checksum(checksum);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ICMP_ECHO_HEADER_LEN, IPV4_HEADER_LEN};
    use pnet::packet::ethernet::EthernetPacket;
    use pnet::packet::icmp::IcmpTypes;
    use pnet::packet::ipv4::Ipv4Packet;
    use pretty_assertions::assert_eq;
    use std::net::Ipv4Addr;

    #[test]
    fn default_frame_carries_fixed_fields() {
        let frame = build_frame(&EchoProbe::default(), MacAddr::zero()).unwrap();
        assert_eq!(frame.len(), 42);

        let eth = EthernetPacket::new(&frame).unwrap();
        assert_eq!(eth.get_destination(), MacAddr::broadcast());
        assert_eq!(eth.get_source(), MacAddr::zero());
        assert_eq!(eth.get_ethertype(), EtherTypes::Ipv4);

        let ip = Ipv4Packet::new(eth.payload()).unwrap();
        assert_eq!(ip.get_version(), 4);
        assert_eq!(ip.get_header_length(), 5);
        assert_eq!(ip.get_source(), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(ip.get_destination(), Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(ip.get_ttl(), 64);
        assert_eq!(ip.get_identification(), 1);
        assert_eq!(ip.get_next_level_protocol(), IpNextHeaderProtocols::Icmp);
        assert_eq!(ip.get_total_length() as usize, IPV4_HEADER_LEN + ICMP_ECHO_HEADER_LEN);

        let icmp = IcmpPacket::new(ip.payload()).unwrap();
        assert_eq!(icmp.get_icmp_type(), IcmpTypes::EchoRequest);
        assert_eq!(icmp.get_icmp_code(), IcmpCode(0));
    }

    #[test]
    fn checksums_verify() {
        let probe = EchoProbe {
            payload: b"hello".to_vec(),
            icmp_identifier: 0x22b,
            icmp_seq_number: 7,
            ..EchoProbe::default()
        };
        let frame = build_frame(&probe, MacAddr::zero()).unwrap();
        let eth = EthernetPacket::new(&frame).unwrap();
        let ip = Ipv4Packet::new(eth.payload()).unwrap();
        assert_eq!(ipv4::checksum(&ip), ip.get_checksum());
        assert_ne!(ip.get_checksum(), 0);

        let icmp = IcmpPacket::new(ip.payload()).unwrap();
        assert_eq!(icmp::checksum(&icmp), icmp.get_checksum());
        assert_ne!(icmp.get_checksum(), 0);
    }

    #[test]
    fn payload_is_carried_verbatim() {
        let probe = EchoProbe {
            payload: vec![0xde, 0xad, 0xbe, 0xef],
            ..EchoProbe::default()
        };
        let frame = build_frame(&probe, MacAddr::zero()).unwrap();
        assert_eq!(frame.len(), 46);
        assert_eq!(&frame[42..], &[0xde, 0xad, 0xbe, 0xef]);

        let ip = Ipv4Packet::new(&frame[ETHERNET_HEADER_LEN..]).unwrap();
        assert_eq!(
            ip.get_total_length() as usize,
            IPV4_HEADER_LEN + ICMP_ECHO_HEADER_LEN + 4
        );
    }

    #[test]
    fn pinned_source_mac_wins_over_interface_mac() {
        let pinned = MacAddr::new(0x02, 0, 0, 0, 0, 0x01);
        let probe = EchoProbe {
            src_mac: Some(pinned),
            ..EchoProbe::default()
        };
        let frame = build_frame(&probe, MacAddr::new(0x06, 0x11, 0x22, 0x33, 0x44, 0x55)).unwrap();
        assert_eq!(EthernetPacket::new(&frame).unwrap().get_source(), pinned);
    }

    #[test]
    fn datagram_is_frame_without_link_header() {
        let probe = EchoProbe {
            payload: b"abc".to_vec(),
            ..EchoProbe::default()
        };
        let frame = build_frame(&probe, MacAddr::zero()).unwrap();
        let datagram = build_datagram(&probe).unwrap();
        assert_eq!(&frame[ETHERNET_HEADER_LEN..], &datagram[..]);
    }

    #[test]
    fn largest_payload_fills_the_total_length() {
        let probe = EchoProbe {
            payload: vec![0x5a; MAX_PAYLOAD_LEN],
            ..EchoProbe::default()
        };
        let datagram = build_datagram(&probe).unwrap();
        let ip = Ipv4Packet::new(&datagram).unwrap();
        assert_eq!(ip.get_total_length(), u16::MAX);
        assert_eq!(ipv4::checksum(&ip), ip.get_checksum());

        let frame = build_frame(&probe, MacAddr::zero()).unwrap();
        assert_eq!(frame.len(), ETHERNET_HEADER_LEN + u16::MAX as usize);
    }

    #[test]
    fn one_byte_past_the_limit_is_rejected() {
        let probe = EchoProbe {
            payload: vec![0; MAX_PAYLOAD_LEN + 1],
            ..EchoProbe::default()
        };
        assert!(matches!(
            build_frame(&probe, MacAddr::zero()),
            Err(ProbeError::PayloadTooLarge(len)) if len == MAX_PAYLOAD_LEN + 1
        ));
        assert!(matches!(build_datagram(&probe), Err(ProbeError::PayloadTooLarge(_))));
    }
}
