use std::io;

use http::StatusCode;
use thiserror::Error;

use crate::client::ClientError;

#[derive(Debug, Error)]
pub enum WebSocketError {
    #[error("websocket protocol violation: {reason}")]
    Protocol { reason: String },

    #[error("frame of {size} bytes exceeds the limit of {max}")]
    FrameTooLarge { size: u64, max: usize },

    #[error("text payload is not valid UTF-8: {source}")]
    InvalidUtf8 {
        #[from]
        source: std::str::Utf8Error,
    },

    #[error("handshake failed: {reason}")]
    Handshake { reason: String },

    #[error("server refused the upgrade with status {status}")]
    Refused { status: StatusCode },

    #[error("connection already closed")]
    Closed,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error(transparent)]
    Client {
        #[from]
        source: ClientError,
    },
}

impl WebSocketError {
    pub fn protocol<S: ToString>(reason: S) -> Self {
        Self::Protocol { reason: reason.to_string() }
    }

    pub fn handshake<S: ToString>(reason: S) -> Self {
        Self::Handshake { reason: reason.to_string() }
    }
}
