use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use pnet::packet::ip::IpNextHeaderProtocols::Icmp;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::util::MacAddr;
use pnet_datalink::Channel::Ethernet;
use pnet_datalink::{self, Channel, DataLinkSender, NetworkInterface};
use pnet_transport::{transport_channel, TransportChannelType, TransportSender};
use signal_hook::flag;

use crate::args::{Config, Mode};
use crate::common::{FrameSummary, SendReport};
use crate::craft::{build_datagram, build_frame};
use crate::decode::{summarize_datagram, summarize_frame};
use crate::error::{ProbeError, Result};
use crate::iface::{self, PrivilegeLevel};

const TRANSPORT_BUFFER_SIZE: usize = 4096;
const STOP_POLL: Duration = Duration::from_millis(50);

/// An open send path: a datalink sender bound to one interface, or a raw
/// IPv4 socket that lets the kernel route.
pub enum Link {
    Ethernet {
        iface: String,
        tx: Box<dyn DataLinkSender>,
    },
    Ipv4 {
        dst: Ipv4Addr,
        tx: TransportSender,
    },
}

impl Link {
    pub fn from_channel(iface: &str, channel: Channel) -> Result<Self> {
        match channel {
            Ethernet(tx, _rx) => {
                debug!("datalink channel open on {}", iface);
                Ok(Link::Ethernet {
                    iface: iface.to_owned(),
                    tx,
                })
            }
            #[allow(unreachable_patterns)]
            _ => Err(ProbeError::UnsupportedChannel(iface.to_owned())),
        }
    }

    pub fn open_ethernet(iface: &NetworkInterface) -> Result<Self> {
        if !iface.is_up() {
            return Err(ProbeError::InterfaceDown(iface.name.clone()));
        }
        let channel = pnet_datalink::channel(iface, Default::default()).map_err(|source| {
            ProbeError::ChannelOpen {
                name: iface.name.clone(),
                source,
            }
        })?;
        Self::from_channel(&iface.name, channel)
    }

    pub fn open_ipv4(dst: Ipv4Addr) -> Result<Self> {
        let (tx, _rx) = transport_channel(
            TRANSPORT_BUFFER_SIZE,
            TransportChannelType::Layer3(Icmp),
        )
        .map_err(|source| ProbeError::ChannelOpen {
            name: "raw ipv4".into(),
            source,
        })?;
        debug!("raw ipv4 channel open towards {}", dst);
        Ok(Link::Ipv4 { dst, tx })
    }

    /// Writes `bytes` once. Returns the number of bytes handed to the OS.
    pub fn transmit(&mut self, bytes: &[u8]) -> Result<usize> {
        match self {
            Link::Ethernet { tx, .. } => match tx.send_to(bytes, None) {
                Some(Ok(())) => Ok(bytes.len()),
                Some(Err(e)) => Err(ProbeError::SendFailed(e)),
                None => Err(ProbeError::SendRefused),
            },
            Link::Ipv4 { dst, tx } => {
                let packet = Ipv4Packet::new(bytes).ok_or(ProbeError::Truncated("ipv4 header"))?;
                tx.send_to(packet, IpAddr::V4(*dst))
                    .map_err(ProbeError::SendFailed)
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            Link::Ethernet { iface, .. } => iface.clone(),
            Link::Ipv4 { dst, .. } => format!("raw ipv4 to {dst}"),
        }
    }
}

/// Sends `bytes` `count` times (`0` means until `stop` is raised), pausing
/// `interval` between sends. Returns how many were sent.
pub fn send_frames(
    link: &mut Link,
    bytes: &[u8],
    count: u64,
    interval: Duration,
    stop: &AtomicBool,
) -> Result<u64> {
    let mut sent = 0u64;
    while count == 0 || sent < count {
        if stop.load(Ordering::Relaxed) {
            info!("interrupted after {} packet(s)", sent);
            break;
        }
        let n = link.transmit(bytes)?;
        sent += 1;
        info!("sent {} bytes on {} ({})", n, link.describe(), sent);

        if count != 0 && sent == count {
            break;
        }
        pause(interval, stop);
    }
    Ok(sent)
}

/// Sleeps for `interval`, waking early once `stop` is raised.
fn pause(interval: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + interval;
    while !stop.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(STOP_POLL.min(deadline - now));
    }
}

/// Crafts the wire bytes for `config` without touching any interface.
pub fn craft(config: &Config, src_mac: MacAddr) -> Result<(Vec<u8>, FrameSummary)> {
    match config.mode {
        Mode::Layer2 => {
            let frame = build_frame(&config.probe, src_mac)?;
            let summary = summarize_frame(&frame)?;
            Ok((frame, summary))
        }
        Mode::Layer3 => {
            let datagram = build_datagram(&config.probe)?;
            let summary = summarize_datagram(&datagram)?;
            Ok((datagram, summary))
        }
    }
}

fn register_stop_flag() -> Result<Arc<AtomicBool>> {
    let term = Arc::new(AtomicBool::new(false));
    flag::register(signal_hook::consts::SIGTERM, Arc::clone(&term)).map_err(ProbeError::Signal)?;
    flag::register(signal_hook::consts::SIGINT, Arc::clone(&term)).map_err(ProbeError::Signal)?;
    Ok(term)
}

pub fn run(config: &Config) -> Result<SendReport> {
    let privilege = iface::check_privileges();
    if privilege == PrivilegeLevel::Unprivileged {
        warn!("running {}; raw sends need root or CAP_NET_RAW", privilege);
    }

    let (mut link, wire, summary) = match config.mode {
        Mode::Layer2 => {
            let iface = iface::find_interface(&config.iface)?;
            let (wire, summary) = craft(config, iface::source_mac(&iface))?;
            (Link::open_ethernet(&iface)?, wire, summary)
        }
        Mode::Layer3 => {
            let (wire, summary) = craft(config, MacAddr::zero())?;
            (Link::open_ipv4(config.probe.dst)?, wire, summary)
        }
    };
    debug!("crafted {} bytes: {}", wire.len(), summary);

    let stop = register_stop_flag()?;
    let sent = send_frames(&mut link, &wire, config.count, config.interval, &stop)?;

    Ok(SendReport {
        iface: config.iface.clone(),
        sent,
        frame: summary,
    })
}
