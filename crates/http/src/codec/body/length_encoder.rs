use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;

use crate::protocol::{PayloadItem, SendError};

/// Writes exactly the declared `Content-Length` worth of bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    remaining: u64,
    eof: bool,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { remaining: length, eof: false }
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(mut data) => {
                let len = data.remaining() as u64;
                if len > self.remaining {
                    return Err(SendError::invalid_body(format!(
                        "body exceeds its content-length by {} bytes",
                        len - self.remaining
                    )));
                }
                self.remaining -= len;
                while data.has_remaining() {
                    let chunk = data.chunk();
                    let n = chunk.len();
                    dst.extend_from_slice(chunk);
                    data.advance(n);
                }
                Ok(())
            }
            PayloadItem::Eof => {
                self.eof = true;
                if self.remaining > 0 {
                    return Err(SendError::invalid_body(format!(
                        "body ended {} bytes short of its content-length",
                        self.remaining
                    )));
                }
                Ok(())
            }
        }
    }
}
