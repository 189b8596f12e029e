//! Failures that stop the listener.

use std::io;
use std::net::SocketAddr;

/// Result type for serving.
pub type ServerResult<T> = std::result::Result<T, ServerError>;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid server configuration: {0}")]
    Config(String),

    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("server stopped unexpectedly: {0}")]
    Runtime(#[source] io::Error),

    #[cfg_attr(not(feature = "tls"), allow(dead_code))]
    #[error("unusable TLS material: {0}")]
    Tls(String),
}

impl ServerError {
    /// What an operator can try next, if anything obvious.
    pub fn hint(&self) -> Option<&'static str> {
        let io_kind = match self {
            Self::Config(_) => return Some("see --help for accepted values"),
            Self::Tls(_) => return Some("both files must exist and hold PEM data"),
            Self::Bind { source, .. } | Self::Runtime(source) => source.kind(),
        };

        match io_kind {
            io::ErrorKind::AddrInUse => Some("another process holds the port"),
            io::ErrorKind::AddrNotAvailable => Some("the host is not an address of this machine"),
            io::ErrorKind::PermissionDenied => Some("the process lacks permission for this socket"),
            _ => None,
        }
    }
}
