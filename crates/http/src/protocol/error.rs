use std::error::Error;
use std::io;

use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http uri: {reason}")]
    InvalidUri { reason: String },

    #[error("invalid status line: {reason}")]
    InvalidStatus { reason: String },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("body size exceed the limit {max_size}")]
    TooLargeBody { max_size: u64 },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_uri<S: ToString>(str: S) -> Self {
        Self::InvalidUri { reason: str.to_string() }
    }

    pub fn invalid_status<S: ToString>(str: S) -> Self {
        Self::InvalidStatus { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn too_large_body(max_size: u64) -> Self {
        Self::TooLargeBody { max_size }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    /// Whether the underlying transport timed out while reading.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Io { source } if source.kind() == io::ErrorKind::TimedOut)
    }

    /// The status a server answers with when it fails to read a request.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::TooLargeHeader { .. } | Self::TooLargeBody { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InvalidMethod => StatusCode::NOT_IMPLEMENTED,
            Self::InvalidVersion(_) => StatusCode::HTTP_VERSION_NOT_SUPPORTED,
            Self::Io { source } if source.kind() == io::ErrorKind::TimedOut => StatusCode::REQUEST_TIMEOUT,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// An error carrying the HTTP status the peer should see.
///
/// Request handlers return it (boxed) to make the connection answer with an
/// error page instead of a generic `500 Internal Server Error`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{status}: {message}")]
pub struct HttpStatusError {
    status: StatusCode,
    message: String,
}

impl HttpStatusError {
    pub fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self { status, message: message.into() }
    }

    /// Builds the error with the default reason phrase as message.
    pub fn from_status(status: StatusCode) -> Self {
        Self::new(status, crate::protocol::reason_phrase(status))
    }

    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found() -> Self {
        Self::from_status(StatusCode::NOT_FOUND)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Statuses after which the connection must not be reused.
    pub fn justifies_connection_close(&self) -> bool {
        justifies_connection_close(self.status)
    }

    /// Tries to find a status error inside a boxed handler error.
    pub fn find<'a>(error: &'a (dyn Error + 'static)) -> Option<&'a HttpStatusError> {
        let mut current = Some(error);
        while let Some(e) = current {
            if let Some(status_error) = e.downcast_ref::<HttpStatusError>() {
                return Some(status_error);
            }
            current = e.source();
        }
        None
    }
}

impl From<ParseError> for HttpStatusError {
    fn from(e: ParseError) -> Self {
        Self::new(e.status(), e.to_string())
    }
}

pub fn justifies_connection_close(status: StatusCode) -> bool {
    matches!(status, StatusCode::PAYLOAD_TOO_LARGE | StatusCode::URI_TOO_LONG | StatusCode::REQUEST_TIMEOUT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_status() {
        assert_eq!(ParseError::too_large_header(9000, 8192).status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ParseError::too_large_body(10).status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ParseError::InvalidMethod.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(ParseError::invalid_header("bad").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ParseError::io(io::Error::from(io::ErrorKind::TimedOut)).status(), StatusCode::REQUEST_TIMEOUT);
        assert!(ParseError::io(io::Error::from(io::ErrorKind::TimedOut)).is_timeout());
    }

    #[test]
    fn close_justification() {
        assert!(HttpStatusError::from_status(StatusCode::PAYLOAD_TOO_LARGE).justifies_connection_close());
        assert!(HttpStatusError::from_status(StatusCode::URI_TOO_LONG).justifies_connection_close());
        assert!(HttpStatusError::from_status(StatusCode::REQUEST_TIMEOUT).justifies_connection_close());
        assert!(!HttpStatusError::from_status(StatusCode::NOT_FOUND).justifies_connection_close());
    }

    #[test]
    fn find_in_boxed_error() {
        let boxed: Box<dyn Error + Send + Sync> = Box::new(HttpStatusError::bad_request("nope"));
        let found = HttpStatusError::find(boxed.as_ref()).unwrap();
        assert_eq!(found.status(), StatusCode::BAD_REQUEST);
        assert_eq!(found.message(), "nope");

        let other: Box<dyn Error + Send + Sync> = "plain".into();
        assert!(HttpStatusError::find(other.as_ref()).is_none());
    }
}
