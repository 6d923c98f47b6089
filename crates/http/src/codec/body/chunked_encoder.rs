use std::io::Write;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::protocol::{PayloadItem, SendError};

pub const DEFAULT_MAX_CHUNK_SIZE: usize = 4096;

/// Frames payload items as chunks, splitting items larger than the max chunk size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedEncoder {
    eof: bool,
    max_chunk_size: usize,
}

impl ChunkedEncoder {
    pub fn new() -> Self {
        Self::with_max_chunk_size(DEFAULT_MAX_CHUNK_SIZE)
    }

    pub fn with_max_chunk_size(max_chunk_size: usize) -> Self {
        assert!(max_chunk_size > 0, "max chunk size must not be zero");
        Self { eof: false, max_chunk_size }
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }

    /// Writes `data` as chunks carrying the extension `ext` (`key=value;...`).
    ///
    /// # Panics
    /// If the extension contains CR or LF.
    pub fn encode_with_extension<D: Buf>(&mut self, mut data: D, ext: &str, dst: &mut BytesMut) -> Result<(), SendError> {
        assert!(!ext.contains(['\r', '\n']), "chunk extensions must not contain line breaks");
        if self.eof {
            return Err(SendError::invalid_body("chunk written after the last chunk"));
        }

        while data.has_remaining() {
            let len = data.chunk().len().min(self.max_chunk_size);
            write_chunk_head(dst, len, ext);
            dst.put_slice(&data.chunk()[..len]);
            dst.put_slice(b"\r\n");
            data.advance(len);
        }
        Ok(())
    }
}

impl Default for ChunkedEncoder {
    fn default() -> Self {
        Self::new()
    }
}

fn write_chunk_head(dst: &mut BytesMut, len: usize, ext: &str) {
    dst.reserve(len + ext.len() + 20);
    let mut writer = dst.writer();
    // writing into a BytesMut never fails
    let _ = write!(writer, "{len:X}");
    let dst = writer.into_inner();
    if !ext.is_empty() {
        dst.put_u8(b';');
        dst.put_slice(ext.as_bytes());
    }
    dst.put_slice(b"\r\n");
}

impl<D: Buf> Encoder<PayloadItem<D>> for ChunkedEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(data) => self.encode_with_extension(data, "", dst),
            PayloadItem::Eof if self.eof => Ok(()),
            PayloadItem::Eof => {
                self.eof = true;
                dst.put_slice(b"0\r\n\r\n");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::body::ChunkedDecoder;
    use bytes::Bytes;
    use tokio_util::codec::Decoder;

    #[test]
    fn splits_large_items() {
        let mut encoder = ChunkedEncoder::with_max_chunk_size(4);
        let mut dst = BytesMut::new();
        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"abcdefghij")), &mut dst).unwrap();
        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();
        assert_eq!(&dst[..], b"4\r\nabcd\r\n4\r\nefgh\r\n2\r\nij\r\n0\r\n\r\n");
        assert!(encoder.is_finish());
    }

    #[test]
    fn empty_items_write_nothing() {
        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();
        encoder.encode(PayloadItem::Chunk(Bytes::new()), &mut dst).unwrap();
        assert!(dst.is_empty());
    }

    #[test]
    fn extension_is_written() {
        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();
        encoder.encode_with_extension(&b"hi"[..], "sig=abc;n=1", &mut dst).unwrap();
        assert_eq!(&dst[..], b"2;sig=abc;n=1\r\nhi\r\n");
    }

    #[test]
    #[should_panic]
    fn extension_with_newline_panics() {
        let mut encoder = ChunkedEncoder::new();
        let _ = encoder.encode_with_extension(&b"hi"[..], "a\r\nb", &mut BytesMut::new());
    }

    #[test]
    fn decodes_what_it_encodes() {
        for size in [0usize, 1, 125, 126, 4095, 4097, 65535, 65536] {
            let body: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            let mut wire = BytesMut::new();
            let mut encoder = ChunkedEncoder::new();
            encoder.encode(PayloadItem::Chunk(&body[..]), &mut wire).unwrap();
            encoder.encode(PayloadItem::<&[u8]>::Eof, &mut wire).unwrap();

            let mut decoder = ChunkedDecoder::new();
            let mut decoded = Vec::new();
            loop {
                match decoder.decode(&mut wire).unwrap().unwrap() {
                    PayloadItem::Chunk(bytes) => decoded.extend_from_slice(&bytes),
                    PayloadItem::Eof => break,
                }
            }
            assert_eq!(decoded, body, "size {size}");
        }
    }
}
