use std::fmt;

use log::debug;
use pnet::util::MacAddr;
use pnet_datalink::NetworkInterface;

use crate::error::{ProbeError, Result};

/// Picks `name` out of `interfaces`.
pub fn select_interface(name: &str, interfaces: Vec<NetworkInterface>) -> Result<NetworkInterface> {
    let available: Vec<String> = interfaces.iter().map(|i| i.name.clone()).collect();
    match interfaces.into_iter().find(|i| i.name == name) {
        Some(iface) => {
            debug!(
                "found interface {} (index {}, mac {:?}, up {})",
                iface.name,
                iface.index,
                iface.mac,
                iface.is_up()
            );
            Ok(iface)
        }
        None => Err(ProbeError::InterfaceNotFound {
            name: name.to_owned(),
            available,
        }),
    }
}

/// Looks `name` up among the host's interfaces.
pub fn find_interface(name: &str) -> Result<NetworkInterface> {
    select_interface(name, pnet_datalink::interfaces())
}

/// Hardware address to stamp as the frame source. TUN devices carry none.
pub fn source_mac(iface: &NetworkInterface) -> MacAddr {
    iface.mac.unwrap_or_else(MacAddr::zero)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeLevel {
    /// Effective uid 0; raw sockets will open.
    Root,
    /// Anything else. Sends may still succeed with CAP_NET_RAW.
    Unprivileged,
}

impl fmt::Display for PrivilegeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrivilegeLevel::Root => write!(f, "root"),
            PrivilegeLevel::Unprivileged => write!(f, "unprivileged"),
        }
    }
}

pub fn check_privileges() -> PrivilegeLevel {
    if unsafe { libc::geteuid() } == 0 {
        PrivilegeLevel::Root
    } else {
        PrivilegeLevel::Unprivileged
    }
}
