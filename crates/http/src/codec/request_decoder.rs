//! Server side request decoding.
//!
//! [`RequestDecoder`] alternates between the head and the payload of each
//! request on a connection:
//!
//! ```text
//! Header((head, size)) -> Payload(Chunk)* -> Payload(Eof) -> Header(...) -> ...
//! ```

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::body::PayloadDecoder;
use crate::codec::header::RequestHeadDecoder;
use crate::ensure;
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHeader};

#[derive(Debug)]
pub struct RequestDecoder {
    header_decoder: RequestHeadDecoder,
    payload_decoder: Option<PayloadDecoder>,
    max_body_size: Option<u64>,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Limits for the head size in bytes and the body size (`None` for no limit).
    pub fn with_limits(max_header_bytes: usize, max_body_size: Option<u64>) -> Self {
        Self { header_decoder: RequestHeadDecoder::new(max_header_bytes), payload_decoder: None, max_body_size }
    }

    /// Applies `max_body_size` to the body of the request whose head was just
    /// decoded, in place of the limit it was started with.
    pub fn limit_current_body(&mut self, max_body_size: Option<u64>) -> Result<(), ParseError> {
        match &mut self.payload_decoder {
            Some(payload_decoder) => payload_decoder.set_max_size(max_body_size),
            None => Ok(()),
        }
    }

    /// Whether the decoder is in the middle of a request body.
    pub fn is_reading_body(&self) -> bool {
        self.payload_decoder.is_some()
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self { header_decoder: RequestHeadDecoder::default(), payload_decoder: None, max_body_size: None }
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<(RequestHeader, PayloadSize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let item = payload_decoder.decode(src)?;
            if matches!(item, Some(PayloadItem::Eof)) {
                self.payload_decoder = None;
            }
            return Ok(item.map(Message::Payload));
        }

        let Some((header, payload_size)) = self.header_decoder.decode(src)? else {
            return Ok(None);
        };

        if let (PayloadSize::Length(length), Some(max_size)) = (payload_size, self.max_body_size) {
            ensure!(length <= max_size, ParseError::too_large_body(max_size));
        }

        if !payload_size.is_empty() {
            self.payload_decoder = Some(PayloadDecoder::from(payload_size).with_max_size(self.max_body_size));
        }
        Ok(Some(Message::Header((header, payload_size))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn pipelined_requests() {
        let text = indoc! {r##"
        POST /a HTTP/1.1
        Transfer-Encoding: chunked

        3
        abc
        0

        GET /b HTTP/1.1

        "##};
        // indoc leaves bare LFs, the chunked framing needs CRLF
        let wire = text.replace('\n', "\r\n");
        let mut buf = BytesMut::from(wire.as_str());
        let mut decoder = RequestDecoder::new();

        let Some(Message::Header((header, size))) = decoder.decode(&mut buf).unwrap() else { panic!("expect header") };
        assert_eq!(header.uri().path(), "/a");
        assert!(size.is_chunked());
        assert!(decoder.is_reading_body());

        let Some(Message::Payload(PayloadItem::Chunk(bytes))) = decoder.decode(&mut buf).unwrap() else { panic!("expect chunk") };
        assert_eq!(&bytes[..], b"abc");
        assert!(matches!(decoder.decode(&mut buf).unwrap(), Some(Message::Payload(PayloadItem::Eof))));
        assert!(!decoder.is_reading_body());

        let Some(Message::Header((header, size))) = decoder.decode(&mut buf).unwrap() else { panic!("expect header") };
        assert_eq!(header.uri().path(), "/b");
        assert!(size.is_empty());
        assert!(decoder.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn body_limit_after_the_head() {
        let mut decoder = RequestDecoder::with_limits(1024, None);
        let mut buf = BytesMut::from("PUT /f HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello");
        assert!(matches!(decoder.decode(&mut buf).unwrap(), Some(Message::Header(_))));
        let Err(err) = decoder.limit_current_body(Some(4)) else { panic!("expect too large body") };
        assert_eq!(err.status(), http::StatusCode::PAYLOAD_TOO_LARGE);

        let mut decoder = RequestDecoder::with_limits(1024, None);
        let mut buf = BytesMut::from("PUT /f HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello");
        assert!(matches!(decoder.decode(&mut buf).unwrap(), Some(Message::Header(_))));
        decoder.limit_current_body(Some(5)).unwrap();
        assert!(matches!(decoder.decode(&mut buf).unwrap(), Some(Message::Payload(PayloadItem::Chunk(_)))));
    }

    #[test]
    fn declared_length_over_limit() {
        let mut decoder = RequestDecoder::with_limits(1024, Some(4));
        let mut buf = BytesMut::from("PUT /f HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello");
        let Err(err) = decoder.decode(&mut buf) else { panic!("expect too large body") };
        assert_eq!(err.status(), http::StatusCode::PAYLOAD_TOO_LARGE);
    }
}
