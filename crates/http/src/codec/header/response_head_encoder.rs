//! Serializes a response head: the status line, framing headers and header fields.

use std::io::Write;

use bytes::{BufMut, BytesMut};
use http::{StatusCode, Version};
use tokio_util::codec::Encoder;

use super::{FastWrite, set_framing_headers, write_headers};
use crate::protocol::{PayloadSize, ReasonPhrase, ResponseHead, SendError, reason_phrase};

/// Initial buffer size reserved for a response head
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Encoder for response heads.
///
/// The status line carries the response version (`HTTP/1.0` or `HTTP/1.1`) and
/// the [`ReasonPhrase`] extension, or the default phrase of the status.
/// `Content-Length` / `Transfer-Encoding` are set from the [`PayloadSize`],
/// except for `1xx`, `204` and `304` responses which keep the headers they have.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseHeadEncoder;

impl Encoder<(ResponseHead, PayloadSize)> for ResponseHeadEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (ResponseHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, payload_size) = item;
        dst.reserve(INIT_HEADER_SIZE);

        let version = match head.version() {
            Version::HTTP_10 => "HTTP/1.0",
            _ => "HTTP/1.1",
        };
        let status = head.status();
        let reason = match head.extensions().get::<ReasonPhrase>() {
            Some(ReasonPhrase(reason)) => reason.as_ref(),
            None => reason_phrase(status),
        };
        if reason.contains(['\r', '\n']) {
            return Err(SendError::invalid_body("reason phrase contains a line break"));
        }
        write!(FastWrite(dst), "{version} {} {reason}\r\n", status.as_str())?;

        if !status.is_informational() && status != StatusCode::NO_CONTENT && status != StatusCode::NOT_MODIFIED {
            set_framing_headers(head.headers_mut(), payload_size);
        }

        write_headers(head.headers(), dst);
        Ok(())
    }
}

/// Writes a bare interim status line, like `100 Continue`.
pub(crate) fn encode_interim(version: Version, status: StatusCode, dst: &mut BytesMut) {
    let version = if version == Version::HTTP_10 { "HTTP/1.0" } else { "HTTP/1.1" };
    dst.put_slice(version.as_bytes());
    dst.put_u8(b' ');
    dst.put_slice(status.as_str().as_bytes());
    dst.put_u8(b' ');
    dst.put_slice(reason_phrase(status).as_bytes());
    dst.put_slice(b"\r\n\r\n");
}
