use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("interface {name} not found (available: {})", .available.join(", "))]
    InterfaceNotFound { name: String, available: Vec<String> },
    #[error("interface {0} is down")]
    InterfaceDown(String),
    #[error("interface {0} does not offer an ethernet channel")]
    UnsupportedChannel(String),
    #[error("failed to open channel on {name}: {source}")]
    ChannelOpen {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("packet send failed: {0}")]
    SendFailed(#[source] io::Error),
    #[error("send buffer refused the frame")]
    SendRefused,
    #[error("payload of {0} bytes does not fit in one IPv4 packet")]
    PayloadTooLarge(usize),
    #[error("packet construction failed: {0}")]
    BuildFailed(&'static str),
    #[error("truncated {0}")]
    Truncated(&'static str),
    #[error("unexpected protocol: {0}")]
    UnexpectedProtocol(String),
    #[error("failed to install signal handler: {0}")]
    Signal(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, ProbeError>;
