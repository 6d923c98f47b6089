//! Decoder for `Transfer-Encoding: chunked` payloads.
//!
//! Wire format: `<hex-size>[;ext...] CRLF <data> CRLF`, repeated, closed by a
//! zero size chunk, optional trailer fields and a final CRLF. Extensions and
//! trailers are read and dropped.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::protocol::{ParseError, PayloadItem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: State,
    remaining: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SizeStart,
    Size,
    SizeWhitespace,
    Extension,
    SizeLf,
    Data,
    DataCr,
    DataLf,
    TrailerStart,
    Trailer,
    TrailerLf,
    EndLf,
    Done,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: State::SizeStart, remaining: 0 }
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    fn push_size_digit(&mut self, digit: u8) -> Result<(), ParseError> {
        let value = match digit {
            b'0'..=b'9' => digit - b'0',
            b'a'..=b'f' => digit - b'a' + 10,
            b'A'..=b'F' => digit - b'A' + 10,
            _ => return Err(ParseError::invalid_body("invalid chunk size")),
        };
        self.remaining = self
            .remaining
            .checked_mul(16)
            .and_then(|size| size.checked_add(u64::from(value)))
            .ok_or_else(|| ParseError::invalid_body("chunk size overflow"))?;
        Ok(())
    }

    /// Consumes a single framing byte, returning the next state.
    fn step(&mut self, byte: u8) -> Result<State, ParseError> {
        use State::*;

        let next = match (self.state, byte) {
            (SizeStart, b'\r' | b'\n' | b';' | b' ' | b'\t') => {
                return Err(ParseError::invalid_body("missing chunk size"));
            }
            (SizeStart | Size, digit) if digit.is_ascii_hexdigit() => {
                self.push_size_digit(digit)?;
                Size
            }
            (SizeStart, _) => return Err(ParseError::invalid_body("invalid chunk size")),
            (Size, b'\r') => SizeLf,
            (Size, b';') => Extension,
            (Size, b' ' | b'\t') => SizeWhitespace,
            (Size, _) => return Err(ParseError::invalid_body("invalid chunk size")),
            (SizeWhitespace, b' ' | b'\t') => SizeWhitespace,
            (SizeWhitespace, b';') => Extension,
            (SizeWhitespace, b'\r') => SizeLf,
            (SizeWhitespace, _) => return Err(ParseError::invalid_body("unexpected byte after chunk size")),
            (Extension, b'\r') => SizeLf,
            (Extension, b'\n') => return Err(ParseError::invalid_body("bare LF in chunk extension")),
            (Extension, _) => Extension,
            (SizeLf, b'\n') if self.remaining == 0 => TrailerStart,
            (SizeLf, b'\n') => Data,
            (SizeLf, _) => return Err(ParseError::invalid_body("missing LF after chunk size")),
            (DataCr, b'\r') => DataLf,
            (DataCr, _) => return Err(ParseError::invalid_body("missing CR after chunk data")),
            (DataLf, b'\n') => SizeStart,
            (DataLf, _) => return Err(ParseError::invalid_body("missing LF after chunk data")),
            (TrailerStart, b'\r') => EndLf,
            (TrailerStart, _) => Trailer,
            (Trailer, b'\r') => TrailerLf,
            (Trailer, _) => Trailer,
            (TrailerLf, b'\n') => TrailerStart,
            (TrailerLf, _) => return Err(ParseError::invalid_body("missing LF after trailer field")),
            (EndLf, b'\n') => Done,
            (EndLf, _) => return Err(ParseError::invalid_body("missing final LF")),
            (Data | Done, _) => unreachable!("data and end states do not consume framing bytes"),
        };
        Ok(next)
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                State::Done => {
                    trace!("chunked payload complete");
                    return Ok(Some(PayloadItem::Eof));
                }
                State::Data => {
                    if src.is_empty() {
                        return Ok(None);
                    }
                    let len = self.remaining.min(src.len() as u64) as usize;
                    let chunk = src.split_to(len).freeze();
                    self.remaining -= len as u64;
                    if self.remaining == 0 {
                        self.state = State::DataCr;
                    }
                    trace!(len, "decoded chunk data");
                    return Ok(Some(PayloadItem::Chunk(chunk)));
                }
                _ => {
                    if !src.has_remaining() {
                        return Ok(None);
                    }
                    let byte = src.get_u8();
                    self.state = self.step(byte)?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn decode_all(decoder: &mut ChunkedDecoder, buf: &mut BytesMut) -> Result<(Vec<u8>, bool), ParseError> {
        let mut body = Vec::new();
        while let Some(item) = decoder.decode(buf)? {
            match item {
                PayloadItem::Chunk(bytes) => body.extend_from_slice(&bytes),
                PayloadItem::Eof => return Ok((body, true)),
            }
        }
        Ok((body, false))
    }

    #[test]
    fn single_chunk() {
        let mut buf = BytesMut::from(&b"10\r\n1234567890abcdef\r\n0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let item = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(item.as_bytes().unwrap(), &Bytes::from_static(b"1234567890abcdef"));
        assert!(decoder.decode(&mut buf).unwrap().unwrap().is_eof());
        assert!(decoder.is_done());
        assert!(buf.is_empty());
    }

    #[test]
    fn extensions_and_trailers_are_skipped() {
        let mut buf = BytesMut::from(&b"5;name=value\r\nhello\r\n7 ; x\r\n, world\r\n0\r\nExpires: never\r\nX-A: b\r\n\r\nNEXT"[..]);
        let mut decoder = ChunkedDecoder::new();

        let (body, eof) = decode_all(&mut decoder, &mut buf).unwrap();
        assert!(eof);
        assert_eq!(body, b"hello, world");
        assert_eq!(&buf[..], b"NEXT");
    }

    #[test]
    fn partial_input_resumes() {
        let mut decoder = ChunkedDecoder::new();
        let mut buf = BytesMut::from(&b"a\r\n01234"[..]);

        let (body, eof) = decode_all(&mut decoder, &mut buf).unwrap();
        assert_eq!(body, b"01234");
        assert!(!eof);

        buf.extend_from_slice(b"56789\r");
        let (body, eof) = decode_all(&mut decoder, &mut buf).unwrap();
        assert_eq!(body, b"56789");
        assert!(!eof);

        buf.extend_from_slice(b"\n0\r\n\r\n");
        let (body, eof) = decode_all(&mut decoder, &mut buf).unwrap();
        assert!(body.is_empty());
        assert!(eof);
    }

    #[test]
    fn missing_crlf_after_data() {
        let mut buf = BytesMut::from(&b"5\r\nhelloXX"[..]);
        let mut decoder = ChunkedDecoder::new();
        assert!(matches!(decode_all(&mut decoder, &mut buf), Err(_)));
    }

    #[test]
    fn invalid_size() {
        let mut decoder = ChunkedDecoder::new();
        assert!(matches!(decoder.decode(&mut BytesMut::from(&b"xyz\r\n"[..])), Err(_)));

        let mut decoder = ChunkedDecoder::new();
        assert!(matches!(decoder.decode(&mut BytesMut::from(&b"ffffffffffffffffff\r\n"[..])), Err(_)));

        let mut decoder = ChunkedDecoder::new();
        assert!(matches!(decoder.decode(&mut BytesMut::from(&b"5;ext\n"[..])), Err(_)));
    }

    #[test]
    fn empty_size_line_is_not_the_last_chunk() {
        let mut decoder = ChunkedDecoder::new();
        assert!(matches!(decoder.decode(&mut BytesMut::from(&b"\r\n\r\n"[..])), Err(_)));

        let mut decoder = ChunkedDecoder::new();
        assert!(matches!(decoder.decode(&mut BytesMut::from(&b";ext\r\n\r\n"[..])), Err(_)));

        let mut decoder = ChunkedDecoder::new();
        let mut buf = BytesMut::from(&b"3\r\nabc\r\n\r\n\r\nGET / HTTP/1.1\r\n"[..]);
        assert!(matches!(decode_all(&mut decoder, &mut buf), Err(_)));
    }

    #[test]
    fn large_chunk() {
        let size = 256 * 1024;
        let mut wire = format!("{size:x}\r\n").into_bytes();
        wire.extend(std::iter::repeat_n(b'A', size));
        wire.extend_from_slice(b"\r\n0\r\n\r\n");

        let mut decoder = ChunkedDecoder::new();
        let (body, eof) = decode_all(&mut decoder, &mut BytesMut::from(&wire[..])).unwrap();
        assert!(eof);
        assert_eq!(body.len(), size);
    }
}
