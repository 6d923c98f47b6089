use std::io;

use http::StatusCode;
use thiserror::Error;

use crate::protocol::{ParseError, SendError};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("tls error: {reason}")]
    Tls { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("invalid response: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error("failed to send request: {source}")]
    Send {
        #[from]
        source: SendError,
    },

    #[error("proxy authentication required")]
    ProxyAuthenticationRequired,

    #[error("proxy does not offer basic authentication")]
    NotAcceptable,

    #[error("connection closed by the server")]
    ConnectionClosed,

    #[error("invalid url: {reason}")]
    InvalidUrl { reason: String },

    #[error("connection was not switched, response status {status}")]
    NotUpgraded { status: StatusCode },

    #[error("streamed request body can't be sent again")]
    BodyNotReplayable,
}

impl ClientError {
    pub fn tls<S: ToString>(reason: S) -> Self {
        Self::Tls { reason: reason.to_string() }
    }

    pub fn invalid_url<S: ToString>(reason: S) -> Self {
        Self::InvalidUrl { reason: reason.to_string() }
    }

    /// Whether the error means the server went away before answering, which
    /// happens when it closes an idle persistent connection while a request is
    /// already underway.
    pub(crate) fn is_dead_connection(&self) -> bool {
        let source = match self {
            Self::ConnectionClosed => return true,
            Self::Io { source } => source,
            Self::Send { source: SendError::Io { source } } => source,
            Self::Parse { source: ParseError::Io { source } } => source,
            _ => return false,
        };
        matches!(
            source.kind(),
            io::ErrorKind::BrokenPipe
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::UnexpectedEof
        )
    }
}
