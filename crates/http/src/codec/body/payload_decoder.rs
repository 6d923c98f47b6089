//! Payload decoding for every framing a message may use.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::body::chunked_decoder::ChunkedDecoder;
use crate::codec::body::length_decoder::LengthDecoder;
use crate::ensure;
use crate::protocol::{ParseError, PayloadItem, PayloadSize};

/// Decodes a payload according to its [`PayloadSize`].
///
/// An optional size limit is enforced on the decoded bytes; exceeding it
/// fails with [`ParseError::TooLargeBody`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDecoder {
    kind: Kind,
    max_size: Option<u64>,
    received: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Length(LengthDecoder),
    Chunked(ChunkedDecoder),
    UntilClose { eof: bool },
    NoBody,
}

impl PayloadDecoder {
    pub fn empty() -> Self {
        Self::from_kind(Kind::NoBody)
    }

    pub fn chunked() -> Self {
        Self::from_kind(Kind::Chunked(ChunkedDecoder::new()))
    }

    pub fn fix_length(size: u64) -> Self {
        Self::from_kind(Kind::Length(LengthDecoder::new(size)))
    }

    /// The payload runs until the peer closes the connection.
    pub fn until_close() -> Self {
        Self::from_kind(Kind::UntilClose { eof: false })
    }

    fn from_kind(kind: Kind) -> Self {
        Self { kind, max_size: None, received: 0 }
    }

    pub fn with_max_size(mut self, max_size: Option<u64>) -> Self {
        self.max_size = max_size;
        self
    }

    /// Changes the limit of a payload already being decoded, failing when the
    /// bytes received plus those still declared by `Content-Length` exceed it.
    pub fn set_max_size(&mut self, max_size: Option<u64>) -> Result<(), ParseError> {
        self.max_size = max_size;
        let Some(max_size) = max_size else {
            return Ok(());
        };
        let declared = match &self.kind {
            Kind::Length(decoder) => decoder.remaining(),
            _ => 0,
        };
        ensure!(self.received.saturating_add(declared) <= max_size, ParseError::too_large_body(max_size));
        Ok(())
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self.kind, Kind::Chunked(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, Kind::NoBody)
    }

    pub fn is_fix_length(&self) -> bool {
        matches!(self.kind, Kind::Length(_))
    }

    pub fn is_until_close(&self) -> bool {
        matches!(self.kind, Kind::UntilClose { .. })
    }

    fn account(&mut self, item: Option<PayloadItem>) -> Result<Option<PayloadItem>, ParseError> {
        if let (Some(PayloadItem::Chunk(bytes)), Some(max_size)) = (&item, self.max_size) {
            self.received += bytes.len() as u64;
            ensure!(self.received <= max_size, ParseError::too_large_body(max_size));
        }
        Ok(item)
    }
}

impl From<PayloadSize> for PayloadDecoder {
    fn from(payload_size: PayloadSize) -> Self {
        match payload_size {
            PayloadSize::Length(n) => PayloadDecoder::fix_length(n),
            PayloadSize::Chunked => PayloadDecoder::chunked(),
            PayloadSize::Empty => PayloadDecoder::empty(),
            PayloadSize::UntilClose => PayloadDecoder::until_close(),
        }
    }
}

impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let item = match &mut self.kind {
            Kind::Length(decoder) => decoder.decode(src)?,
            Kind::Chunked(decoder) => decoder.decode(src)?,
            Kind::UntilClose { eof: true } | Kind::NoBody => Some(PayloadItem::Eof),
            Kind::UntilClose { eof: false } if src.is_empty() => None,
            Kind::UntilClose { eof: false } => Some(PayloadItem::Chunk(src.split().freeze())),
        };
        self.account(item)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let item = match &mut self.kind {
            Kind::Length(decoder) => decoder.decode_eof(src)?,
            Kind::UntilClose { eof } => {
                if src.is_empty() {
                    *eof = true;
                    Some(PayloadItem::Eof)
                } else {
                    Some(PayloadItem::Chunk(src.split().freeze()))
                }
            }
            Kind::Chunked(decoder) => match decoder.decode(src)? {
                Some(item) => Some(item),
                None => return Err(ParseError::invalid_body("connection closed inside a chunked body")),
            },
            Kind::NoBody => Some(PayloadItem::Eof),
        };
        self.account(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_on_chunked_body() {
        let mut decoder = PayloadDecoder::chunked().with_max_size(Some(8));
        let mut buf = BytesMut::from(&b"5\r\nhello\r\n5\r\nworld\r\n0\r\n\r\n"[..]);
        assert!(decoder.decode(&mut buf).unwrap().unwrap().is_chunk());
        let err = decoder.decode(&mut buf).unwrap_err();
        assert!(matches!(err, ParseError::TooLargeBody { max_size: 8 }));
    }

    #[test]
    fn limit_changed_before_reading() {
        let mut decoder = PayloadDecoder::fix_length(10);
        assert!(matches!(decoder.set_max_size(Some(4)), Err(ParseError::TooLargeBody { max_size: 4 })));

        let mut decoder = PayloadDecoder::chunked();
        decoder.set_max_size(Some(4)).unwrap();
        let mut buf = BytesMut::from(&b"5\r\nhello\r\n0\r\n\r\n"[..]);
        assert!(matches!(decoder.decode(&mut buf), Err(_)));

        let mut decoder = PayloadDecoder::fix_length(10).with_max_size(Some(4));
        decoder.set_max_size(None).unwrap();
        let mut buf = BytesMut::from(&b"0123456789"[..]);
        assert!(decoder.decode(&mut buf).unwrap().unwrap().is_chunk());
    }

    #[test]
    fn until_close_ends_with_the_stream() {
        let mut decoder = PayloadDecoder::until_close();
        let mut buf = BytesMut::from(&b"partial"[..]);
        assert_eq!(&decoder.decode(&mut buf).unwrap().unwrap().into_bytes().unwrap()[..], b"partial");
        assert!(decoder.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"tail");
        assert!(decoder.decode_eof(&mut buf).unwrap().unwrap().is_chunk());
        assert!(decoder.decode_eof(&mut buf).unwrap().unwrap().is_eof());
        assert!(decoder.decode(&mut buf).unwrap().unwrap().is_eof());
    }

    #[test]
    fn truncated_chunked_body() {
        let mut decoder = PayloadDecoder::chunked();
        let mut buf = BytesMut::from(&b"5\r\nhel"[..]);
        assert!(decoder.decode_eof(&mut buf).unwrap().unwrap().is_chunk());
        assert!(matches!(decoder.decode_eof(&mut buf), Err(_)));
    }

    #[test]
    fn empty_body() {
        let mut decoder = PayloadDecoder::from(PayloadSize::Empty);
        assert!(decoder.is_empty());
        assert!(decoder.decode(&mut BytesMut::new()).unwrap().unwrap().is_eof());
    }
}
