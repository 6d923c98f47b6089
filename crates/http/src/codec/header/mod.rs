//! Message head codecs.
//!
//! - [`RequestHeadDecoder`] / [`ResponseHeadEncoder`]: the server side
//! - [`RequestHeadEncoder`] / [`ResponseHeadDecoder`]: the client side
//!
//! Decoders parse with `httparse` and record the byte ranges of header names and
//! values, so the final `HeaderMap` shares the input buffer instead of copying it.

mod request_head_decoder;
mod request_head_encoder;
mod response_head_decoder;
mod response_head_encoder;

pub use request_head_decoder::RequestHeadDecoder;
pub use request_head_encoder::RequestHeadEncoder;
pub use response_head_decoder::ResponseHeadDecoder;
pub use response_head_encoder::ResponseHeadEncoder;
pub(crate) use response_head_encoder::encode_interim;

use std::io;

use bytes::{BufMut, Bytes, BytesMut};
use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderName, HeaderValue};

use crate::protocol::{ParseError, PayloadSize};

/// Maximum number of header fields in a message head.
pub const MAX_HEADER_NUM: usize = 64;

/// Default limit for the size of a message head.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 8 * 1024;

/// Byte ranges of one header field inside the parsed buffer.
#[derive(Debug, Clone, Copy)]
struct HeaderIndex {
    name: (usize, usize),
    value: (usize, usize),
}

const EMPTY_HEADER_INDEX: HeaderIndex = HeaderIndex { name: (0, 0), value: (0, 0) };

impl HeaderIndex {
    fn record(bytes: &[u8], headers: &[httparse::Header<'_>], indices: &mut [HeaderIndex]) {
        let base = bytes.as_ptr() as usize;
        for (header, index) in headers.iter().zip(indices.iter_mut()) {
            let name_start = header.name.as_ptr() as usize - base;
            let value_start = header.value.as_ptr() as usize - base;
            index.name = (name_start, name_start + header.name.len());
            index.value = (value_start, value_start + header.value.len());
        }
    }
}

/// Builds the header map out of the frozen head bytes.
fn fill_headers(head: &Bytes, indices: &[HeaderIndex], headers: &mut HeaderMap) -> Result<(), ParseError> {
    headers.reserve(indices.len());
    for index in indices {
        let name = HeaderName::from_bytes(&head[index.name.0..index.name.1]).map_err(ParseError::invalid_header)?;
        let value =
            HeaderValue::from_maybe_shared(head.slice(index.value.0..index.value.1)).map_err(ParseError::invalid_header)?;
        headers.append(name, value);
    }
    Ok(())
}

/// Whether `chunked` is the final transfer coding.
fn is_chunked(header_value: Option<&HeaderValue>) -> bool {
    header_value
        .and_then(|value| value.as_bytes().rsplit(|b| *b == b',').next())
        .is_some_and(|last| last.trim_ascii().eq_ignore_ascii_case(b"chunked"))
}

fn parse_content_length(value: &HeaderValue) -> Result<u64, ParseError> {
    let text = value.to_str().map_err(ParseError::invalid_content_length)?;
    text.trim().parse::<u64>().map_err(|e| ParseError::invalid_content_length(format!("value {text}: {e}")))
}

/// Framing declared by `Content-Length` or `Transfer-Encoding`, `None` when neither is set.
fn declared_payload(headers: &HeaderMap) -> Result<Option<PayloadSize>, ParseError> {
    let te = headers.get(TRANSFER_ENCODING);
    let mut lengths = headers.get_all(CONTENT_LENGTH).iter();

    match (te, lengths.next()) {
        (None, None) => Ok(None),
        (Some(_), Some(_)) => {
            Err(ParseError::invalid_content_length("transfer-encoding and content-length both present in headers"))
        }
        (Some(te), None) if is_chunked(Some(te)) => Ok(Some(PayloadSize::new_chunked())),
        (Some(_), None) => Ok(Some(PayloadSize::UntilClose)),
        (None, Some(first)) => {
            let length = parse_content_length(first)?;
            for other in lengths {
                if parse_content_length(other)? != length {
                    return Err(ParseError::invalid_content_length("conflicting content-length values"));
                }
            }
            Ok(Some(PayloadSize::new_length(length)))
        }
    }
}

/// Sets the framing headers for the payload, `Content-Length` for
/// fixed sizes and `Transfer-Encoding: chunked` for streams.
fn set_framing_headers(headers: &mut HeaderMap, payload_size: PayloadSize) {
    match payload_size {
        PayloadSize::Length(n) => {
            headers.remove(TRANSFER_ENCODING);
            headers.insert(CONTENT_LENGTH, n.into());
        }
        PayloadSize::Chunked => {
            headers.remove(CONTENT_LENGTH);
            headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        }
        PayloadSize::Empty => {
            headers.remove(TRANSFER_ENCODING);
            headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        }
        PayloadSize::UntilClose => {
            headers.remove(TRANSFER_ENCODING);
            headers.remove(CONTENT_LENGTH);
        }
    }
}

fn write_headers(headers: &HeaderMap, dst: &mut BytesMut) {
    for (name, value) in headers {
        dst.put_slice(name.as_ref());
        dst.put_slice(b": ");
        dst.put_slice(value.as_bytes());
        dst.put_slice(b"\r\n");
    }
    dst.put_slice(b"\r\n");
}

/// `io::Write` over a `BytesMut`, for `write!` with formatted status lines.
struct FastWrite<'a>(&'a mut BytesMut);

impl io::Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
