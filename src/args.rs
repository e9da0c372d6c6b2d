use std::net::Ipv4Addr;
use std::time::Duration;

use clap::{ArgAction, Parser};
use log::LevelFilter;
use pnet::util::MacAddr;

use crate::common::{EchoProbe, DEFAULT_IFACE, MAX_PAYLOAD_LEN};

/// echo-probe: craft one Ethernet/IPv4/ICMP echo request and push it out an interface
#[derive(Parser, Debug)]
#[command(name = "echo-probe", version, about = "Inject an ICMP echo request frame on an interface")]
pub struct Args {
    /// Interface to send on
    #[arg(short = 'i', long = "iface", env = "ECHO_PROBE_IFACE", default_value = DEFAULT_IFACE)]
    pub iface: String,

    /// Ethernet destination address
    #[arg(long = "dst-mac", env = "ECHO_PROBE_DST_MAC", default_value = "ff:ff:ff:ff:ff:ff", value_parser = parse_mac)]
    pub dst_mac: MacAddr,

    /// Ethernet source address (default: the interface's own address, or zero)
    #[arg(long = "src-mac", env = "ECHO_PROBE_SRC_MAC", value_parser = parse_mac)]
    pub src_mac: Option<MacAddr>,

    /// IPv4 source address
    #[arg(short = 's', long = "src", env = "ECHO_PROBE_SRC", default_value = "10.0.0.1")]
    pub src: Ipv4Addr,

    /// IPv4 destination address
    #[arg(short = 'd', long = "dst", env = "ECHO_PROBE_DST", default_value = "10.0.0.2")]
    pub dst: Ipv4Addr,

    /// IPv4 time to live
    #[arg(long = "ttl", env = "ECHO_PROBE_TTL", default_value = "64")]
    pub ttl: u8,

    /// IPv4 identification field
    #[arg(long = "ip-id", env = "ECHO_PROBE_IP_ID", default_value = "1")]
    pub ip_ident: u16,

    /// ICMP type (8 = echo request)
    #[arg(long = "icmp-type", env = "ECHO_PROBE_ICMP_TYPE", default_value = "8")]
    pub icmp_type: u8,

    /// ICMP code
    #[arg(long = "icmp-code", env = "ECHO_PROBE_ICMP_CODE", default_value = "0")]
    pub icmp_code: u8,

    /// ICMP echo identifier
    #[arg(long = "ident", env = "ECHO_PROBE_IDENT", default_value = "0")]
    pub ident: u16,

    /// ICMP echo sequence number
    #[arg(long = "seq", env = "ECHO_PROBE_SEQ", default_value = "0")]
    pub seq: u16,

    /// Echo payload as UTF-8 text
    #[arg(long = "payload", env = "ECHO_PROBE_PAYLOAD", conflicts_with = "payload_len")]
    pub payload: Option<String>,

    /// Echo payload as N zero bytes (at most 65507)
    #[arg(
        long = "payload-len",
        env = "ECHO_PROBE_PAYLOAD_LEN",
        value_name = "N",
        value_parser = clap::value_parser!(u16).range(..=MAX_PAYLOAD_LEN as i64)
    )]
    pub payload_len: Option<u16>,

    /// Number of times to send the frame (0 = until interrupted)
    #[arg(short = 'c', long = "count", env = "ECHO_PROBE_COUNT", default_value = "1")]
    pub count: u64,

    /// Pause between repeated sends, in milliseconds
    #[arg(long = "interval", env = "ECHO_PROBE_INTERVAL", default_value = "1000", value_name = "MS")]
    pub interval_ms: u64,

    /// Send the bare IPv4 datagram through a raw IP socket instead of a link-layer frame
    #[arg(long = "layer3")]
    pub layer3: bool,

    /// Build and print the frame without sending it
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// Print the result as JSON
    #[arg(long = "json")]
    pub json: bool,

    /// Increase verbosity level (use -v or -vv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,
}

fn parse_mac(s: &str) -> Result<MacAddr, String> {
    s.parse::<MacAddr>()
        .map_err(|_| format!("invalid MAC address: {s}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Layer2,
    Layer3,
}

/// Resolved run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub iface: String,
    pub probe: EchoProbe,
    pub mode: Mode,
    pub count: u64,
    pub interval: Duration,
    pub dry_run: bool,
    pub json: bool,
}

impl Args {
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Warn;
        }
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let payload = match (args.payload, args.payload_len) {
            (Some(text), _) => text.into_bytes(),
            (None, Some(len)) => vec![0u8; len as usize],
            (None, None) => Vec::new(),
        };
        Config {
            iface: args.iface,
            probe: EchoProbe {
                dst_mac: args.dst_mac,
                src_mac: args.src_mac,
                src: args.src,
                dst: args.dst,
                ttl: args.ttl,
                ip_ident: args.ip_ident,
                icmp_type: args.icmp_type,
                icmp_code: args.icmp_code,
                icmp_identifier: args.ident,
                icmp_seq_number: args.seq,
                payload,
            },
            mode: if args.layer3 { Mode::Layer3 } else { Mode::Layer2 },
            count: args.count,
            interval: Duration::from_millis(args.interval_ms),
            dry_run: args.dry_run,
            json: args.json,
        }
    }
}
