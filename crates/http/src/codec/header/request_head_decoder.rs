//! Server side parsing of the request line and header fields.

use std::mem::MaybeUninit;

use bytes::BytesMut;
use http::{Request, Version};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use super::{DEFAULT_MAX_HEADER_BYTES, EMPTY_HEADER_INDEX, HeaderIndex, MAX_HEADER_NUM, declared_payload, fill_headers};
use crate::ensure;
use crate::protocol::{HttpMethod, ParseError, PayloadSize, RequestHeader};

/// Parses a request head and determines how its body is framed.
///
/// A request without `Content-Length` or `Transfer-Encoding` has an empty body.
#[derive(Debug, Clone, Copy)]
pub struct RequestHeadDecoder {
    max_header_bytes: usize,
}

impl RequestHeadDecoder {
    pub fn new(max_header_bytes: usize) -> Self {
        Self { max_header_bytes }
    }
}

impl Default for RequestHeadDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HEADER_BYTES)
    }
}

impl Decoder for RequestHeadDecoder {
    type Item = (RequestHeader, PayloadSize);
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // tolerate empty lines between pipelined requests
        let leading = src.iter().take_while(|b| matches!(b, b'\r' | b'\n')).count();
        if leading > 0 {
            let _ = src.split_to(leading);
        }

        if src.is_empty() {
            return Ok(None);
        }

        let mut req = httparse::Request::new(&mut []);
        let mut headers: [MaybeUninit<httparse::Header<'_>>; MAX_HEADER_NUM] = [const { MaybeUninit::uninit() }; MAX_HEADER_NUM];

        let status = req.parse_with_uninit_headers(src, &mut headers).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            Error::Version => ParseError::InvalidVersion(None),
            e => ParseError::invalid_header(e),
        })?;

        let head_len = match status {
            Status::Complete(head_len) => head_len,
            Status::Partial => {
                ensure!(src.len() <= self.max_header_bytes, ParseError::too_large_header(src.len(), self.max_header_bytes));
                return Ok(None);
            }
        };
        trace!(head_len, "parsed request head");
        ensure!(head_len <= self.max_header_bytes, ParseError::too_large_header(head_len, self.max_header_bytes));

        let version = match req.version {
            Some(0) => Version::HTTP_10,
            Some(1) => Version::HTTP_11,
            other => return Err(ParseError::InvalidVersion(other)),
        };

        let method = req.method.ok_or(ParseError::InvalidMethod)?;
        let method = HttpMethod::from_bytes(method.as_bytes()).ok_or(ParseError::InvalidMethod)?;
        let target = req.path.ok_or_else(|| ParseError::invalid_uri("missing request target"))?;

        let mut builder = Request::builder().method(method.to_method()).uri(target).version(version);

        let header_count = req.headers.len();
        let mut indices = [EMPTY_HEADER_INDEX; MAX_HEADER_NUM];
        HeaderIndex::record(src, req.headers, &mut indices);

        let head = src.split_to(head_len).freeze();
        if let Some(headers) = builder.headers_mut() {
            fill_headers(&head, &indices[..header_count], headers)?;
        }

        let request = builder.body(()).map_err(ParseError::invalid_uri)?;
        let header = RequestHeader::from(request);
        let payload_size = match declared_payload(header.headers())? {
            None => PayloadSize::Empty,
            Some(PayloadSize::UntilClose) => {
                return Err(ParseError::invalid_header("request transfer-encoding must end with chunked"));
            }
            Some(size) => size,
        };

        Ok(Some((header, payload_size)))
    }
}
