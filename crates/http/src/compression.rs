//! `gzip` / `deflate` content codings.
//!
//! [`Compressor`] and [`Decompressor`] are push based: every call takes the
//! next slice of input and returns whatever output the codec produced so far.
//! `finish` flushes the trailer. The server compresses bodies of responses that
//! carry `Content-Encoding`, the client inflates the bodies it receives.

use std::io::{self, Write};

use bytes::{Bytes, BytesMut};
use flate2::Compression;
use flate2::write::{GzDecoder, GzEncoder, ZlibDecoder, ZlibEncoder};
use http::HeaderMap;
use http::header::CONTENT_ENCODING;

use crate::protocol::HeaderMapExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCoding {
    Gzip,
    Deflate,
    Identity,
}

impl ContentCoding {
    /// Parses a single coding name, `None` for codings this crate can't handle.
    pub fn from_header(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("gzip") || value.eq_ignore_ascii_case("x-gzip") {
            Some(Self::Gzip)
        } else if value.eq_ignore_ascii_case("deflate") {
            Some(Self::Deflate)
        } else if value.is_empty() || value.eq_ignore_ascii_case("identity") {
            Some(Self::Identity)
        } else {
            None
        }
    }

    /// The coding declared by `Content-Encoding`, identity when the header is absent.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        match headers.get(CONTENT_ENCODING) {
            None => Some(Self::Identity),
            Some(value) => value.to_str().ok().and_then(Self::from_header),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
            Self::Identity => "identity",
        }
    }
}

/// Collects codec output until it is taken.
#[derive(Debug)]
struct Sink {
    buf: BytesMut,
}

impl Sink {
    fn new() -> Self {
        Self { buf: BytesMut::with_capacity(4096) }
    }

    fn take(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
pub struct Compressor {
    inner: Encoding,
}

#[derive(Debug)]
enum Encoding {
    Gzip(GzEncoder<Sink>),
    Deflate(ZlibEncoder<Sink>),
}

impl Compressor {
    /// `None` for the identity coding.
    pub fn new(coding: ContentCoding) -> Option<Self> {
        match coding {
            ContentCoding::Gzip => Some(Encoding::Gzip(GzEncoder::new(Sink::new(), Compression::default()))),
            ContentCoding::Deflate => Some(Encoding::Deflate(ZlibEncoder::new(Sink::new(), Compression::default()))),
            ContentCoding::Identity => None,
        }
        .map(|inner| Self { inner })
    }

    pub fn compress(&mut self, data: &[u8]) -> io::Result<Bytes> {
        match &mut self.inner {
            Encoding::Gzip(encoder) => {
                encoder.write_all(data)?;
                Ok(encoder.get_mut().take())
            }
            Encoding::Deflate(encoder) => {
                encoder.write_all(data)?;
                Ok(encoder.get_mut().take())
            }
        }
    }

    pub fn finish(self) -> io::Result<Bytes> {
        match self.inner {
            Encoding::Gzip(encoder) => encoder.finish().map(|mut sink| sink.take()),
            Encoding::Deflate(encoder) => encoder.finish().map(|mut sink| sink.take()),
        }
    }
}

#[derive(Debug)]
pub struct Decompressor {
    inner: Decoding,
}

#[derive(Debug)]
enum Decoding {
    Gzip(GzDecoder<Sink>),
    Deflate(ZlibDecoder<Sink>),
}

impl Decompressor {
    /// `None` for the identity coding.
    pub fn new(coding: ContentCoding) -> Option<Self> {
        match coding {
            ContentCoding::Gzip => Some(Decoding::Gzip(GzDecoder::new(Sink::new()))),
            ContentCoding::Deflate => Some(Decoding::Deflate(ZlibDecoder::new(Sink::new()))),
            ContentCoding::Identity => None,
        }
        .map(|inner| Self { inner })
    }

    pub fn decompress(&mut self, data: &[u8]) -> io::Result<Bytes> {
        match &mut self.inner {
            Decoding::Gzip(decoder) => {
                decoder.write_all(data)?;
                decoder.flush()?;
                Ok(decoder.get_mut().take())
            }
            Decoding::Deflate(decoder) => {
                decoder.write_all(data)?;
                decoder.flush()?;
                Ok(decoder.get_mut().take())
            }
        }
    }

    pub fn finish(self) -> io::Result<Bytes> {
        match self.inner {
            Decoding::Gzip(decoder) => decoder.finish().map(|mut sink| sink.take()),
            Decoding::Deflate(decoder) => decoder.finish().map(|mut sink| sink.take()),
        }
    }
}

/// Whether `Accept-Encoding` lists the coding, ignoring quality values.
pub fn accepts(headers: &HeaderMap, coding: ContentCoding) -> bool {
    headers
        .get_all_str(http::header::ACCEPT_ENCODING)
        .iter()
        .flat_map(|value| value.split(','))
        .filter_map(|element| element.split(';').next())
        .any(|name| name.trim().eq_ignore_ascii_case(coding.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn roundtrip(coding: ContentCoding) {
        let text = "the quick brown fox jumps over the lazy dog ".repeat(200);
        let mut compressor = Compressor::new(coding).unwrap();
        let mut compressed = BytesMut::new();
        for part in text.as_bytes().chunks(333) {
            compressed.extend_from_slice(&compressor.compress(part).unwrap());
        }
        compressed.extend_from_slice(&compressor.finish().unwrap());
        assert!(compressed.len() < text.len());

        let mut decompressor = Decompressor::new(coding).unwrap();
        let mut plain = BytesMut::new();
        for part in compressed.chunks(50) {
            plain.extend_from_slice(&decompressor.decompress(part).unwrap());
        }
        plain.extend_from_slice(&decompressor.finish().unwrap());
        assert_eq!(&plain[..], text.as_bytes());
    }

    #[test]
    fn gzip() {
        roundtrip(ContentCoding::Gzip);
    }

    #[test]
    fn deflate() {
        roundtrip(ContentCoding::Deflate);
    }

    #[test]
    fn coding_names() {
        assert_eq!(ContentCoding::from_header("GZIP"), Some(ContentCoding::Gzip));
        assert_eq!(ContentCoding::from_header(" deflate "), Some(ContentCoding::Deflate));
        assert_eq!(ContentCoding::from_header("br"), None);
        assert!(Compressor::new(ContentCoding::Identity).is_none());

        let mut headers = HeaderMap::new();
        assert_eq!(ContentCoding::from_headers(&headers), Some(ContentCoding::Identity));
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("x-gzip"));
        assert_eq!(ContentCoding::from_headers(&headers), Some(ContentCoding::Gzip));
    }

    #[test]
    fn accept_encoding_list() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::ACCEPT_ENCODING, HeaderValue::from_static("br, gzip;q=0.8"));
        assert!(accepts(&headers, ContentCoding::Gzip));
        assert!(!accepts(&headers, ContentCoding::Deflate));
    }
}
