//! Client side parsing of the status line and header fields.

use bytes::BytesMut;
use http::{Response, StatusCode, Version};
use httparse::Status;
use tokio_util::codec::Decoder;
use tracing::trace;

use super::{DEFAULT_MAX_HEADER_BYTES, EMPTY_HEADER_INDEX, HeaderIndex, MAX_HEADER_NUM, declared_payload, fill_headers};
use crate::ensure;
use crate::protocol::{ParseError, PayloadSize, ReasonPhrase, ResponseHead, reason_phrase};

/// Parses a response head.
///
/// The framing of a response depends on the request it answers, so the
/// decoder has to be told whether that request was `HEAD` or `CONNECT`.
/// A response without framing headers runs until the server closes the
/// connection.
#[derive(Debug, Clone, Copy)]
pub struct ResponseHeadDecoder {
    max_header_bytes: usize,
    head_request: bool,
    connect_request: bool,
}

impl ResponseHeadDecoder {
    pub fn new(max_header_bytes: usize) -> Self {
        Self { max_header_bytes, head_request: false, connect_request: false }
    }

    /// Records the method of the request the next response answers.
    pub fn set_request_method(&mut self, method: &http::Method) {
        self.head_request = method == http::Method::HEAD;
        self.connect_request = method == http::Method::CONNECT;
    }

    fn payload_size(&self, status: StatusCode, head: &ResponseHead) -> Result<PayloadSize, ParseError> {
        if self.head_request
            || status.is_informational()
            || status == StatusCode::NO_CONTENT
            || status == StatusCode::NOT_MODIFIED
            || (self.connect_request && status.is_success())
        {
            return Ok(PayloadSize::Empty);
        }
        Ok(declared_payload(head.headers())?.unwrap_or(PayloadSize::UntilClose))
    }
}

impl Default for ResponseHeadDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HEADER_BYTES)
    }
}

impl Decoder for ResponseHeadDecoder {
    type Item = (ResponseHead, PayloadSize);
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut res = httparse::Response::new(&mut headers);
        let status = res.parse(src).map_err(|e| match e {
            httparse::Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            httparse::Error::Version => ParseError::InvalidVersion(None),
            httparse::Error::Status => ParseError::invalid_status("invalid status code"),
            e => ParseError::invalid_header(e),
        })?;

        let head_len = match status {
            Status::Complete(head_len) => head_len,
            Status::Partial => {
                ensure!(src.len() <= self.max_header_bytes, ParseError::too_large_header(src.len(), self.max_header_bytes));
                return Ok(None);
            }
        };
        ensure!(head_len <= self.max_header_bytes, ParseError::too_large_header(head_len, self.max_header_bytes));

        let version = match res.version {
            Some(0) => Version::HTTP_10,
            Some(1) => Version::HTTP_11,
            other => return Err(ParseError::InvalidVersion(other)),
        };
        let code = res.code.ok_or_else(|| ParseError::invalid_status("missing status code"))?;
        let status = StatusCode::from_u16(code).map_err(ParseError::invalid_status)?;
        let reason = res.reason.filter(|reason| !reason.is_empty() && *reason != reason_phrase(status)).map(str::to_owned);

        let header_count = res.headers.len();
        let mut indices = [EMPTY_HEADER_INDEX; MAX_HEADER_NUM];
        HeaderIndex::record(src, res.headers, &mut indices);

        let head_bytes = src.split_to(head_len).freeze();
        let mut head = Response::new(());
        *head.status_mut() = status;
        *head.version_mut() = version;
        fill_headers(&head_bytes, &indices[..header_count], head.headers_mut())?;
        if let Some(reason) = reason {
            head.extensions_mut().insert(ReasonPhrase(reason.into()));
        }

        let payload_size = self.payload_size(status, &head)?;
        trace!(status = status.as_u16(), ?payload_size, "parsed response head");
        Ok(Some((head, payload_size)))
    }
}
