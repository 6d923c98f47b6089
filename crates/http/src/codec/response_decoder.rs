use bytes::BytesMut;
use http::Method;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::body::PayloadDecoder;
use crate::codec::header::{DEFAULT_MAX_HEADER_BYTES, ResponseHeadDecoder};
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, ResponseHead};

/// Client side response decoding.
///
/// Interim `1xx` responses other than `101 Switching Protocols` are skipped.
#[derive(Debug)]
pub struct ResponseDecoder {
    header_decoder: ResponseHeadDecoder,
    payload_decoder: Option<PayloadDecoder>,
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Self::with_max_header_bytes(DEFAULT_MAX_HEADER_BYTES)
    }

    pub fn with_max_header_bytes(max_header_bytes: usize) -> Self {
        Self { header_decoder: ResponseHeadDecoder::new(max_header_bytes), payload_decoder: None }
    }

    /// Must be called before reading the response to a request with this method.
    pub fn set_request_method(&mut self, method: &Method) {
        self.header_decoder.set_request_method(method);
    }

    pub fn is_reading_body(&self) -> bool {
        self.payload_decoder.is_some()
    }

    fn finish_item(&mut self, item: Option<PayloadItem>) -> Option<Message<(ResponseHead, PayloadSize)>> {
        if matches!(item, Some(PayloadItem::Eof)) {
            self.payload_decoder = None;
        }
        item.map(Message::Payload)
    }
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ResponseDecoder {
    type Item = Message<(ResponseHead, PayloadSize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let item = payload_decoder.decode(src)?;
            return Ok(self.finish_item(item));
        }

        loop {
            let Some((head, payload_size)) = self.header_decoder.decode(src)? else {
                return Ok(None);
            };

            if head.status().is_informational() && head.status() != http::StatusCode::SWITCHING_PROTOCOLS {
                trace!(status = head.status().as_u16(), "skipped interim response");
                continue;
            }

            if !payload_size.is_empty() {
                self.payload_decoder = Some(PayloadDecoder::from(payload_size));
            }
            return Ok(Some(Message::Header((head, payload_size))));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let item = payload_decoder.decode_eof(src)?;
            return Ok(self.finish_item(item));
        }

        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None if src.is_empty() => Ok(None),
            None => Err(ParseError::invalid_status("connection closed inside a response head")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_continue() {
        let mut buf = BytesMut::from("HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 201 Created\r\nContent-Length: 2\r\n\r\nok");
        let mut decoder = ResponseDecoder::new();

        let Some(Message::Header((head, size))) = decoder.decode(&mut buf).unwrap() else { panic!("expect header") };
        assert_eq!(head.status(), http::StatusCode::CREATED);
        assert_eq!(size, PayloadSize::Length(2));

        assert!(matches!(decoder.decode(&mut buf).unwrap(), Some(Message::Payload(PayloadItem::Chunk(_)))));
        assert!(matches!(decoder.decode(&mut buf).unwrap(), Some(Message::Payload(PayloadItem::Eof))));
        assert!(!decoder.is_reading_body());
    }

    #[test]
    fn close_delimited_body() {
        let mut buf = BytesMut::from("HTTP/1.0 200 OK\r\n\r\nall of it");
        let mut decoder = ResponseDecoder::new();
        assert!(matches!(decoder.decode(&mut buf).unwrap(), Some(Message::Header(_))));
        assert!(matches!(decoder.decode(&mut buf).unwrap(), Some(Message::Payload(PayloadItem::Chunk(_)))));
        assert!(decoder.decode(&mut buf).unwrap().is_none());
        assert!(matches!(decoder.decode_eof(&mut buf).unwrap(), Some(Message::Payload(PayloadItem::Eof))));
    }

    #[test]
    fn switching_protocols_is_kept() {
        let mut buf = BytesMut::from(&b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\n\r\n\x81\x00"[..]);
        let mut decoder = ResponseDecoder::new();
        let Some(Message::Header((head, size))) = decoder.decode(&mut buf).unwrap() else { panic!("expect header") };
        assert_eq!(head.status(), http::StatusCode::SWITCHING_PROTOCOLS);
        assert!(size.is_empty());
        assert_eq!(&buf[..], b"\x81\x00");
    }
}
