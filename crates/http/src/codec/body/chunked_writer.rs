use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::codec::body::ChunkedEncoder;
use crate::codec::body::chunked_encoder::DEFAULT_MAX_CHUNK_SIZE;
use crate::protocol::{PayloadItem, SendError};

/// Streams a chunked body into a writer.
///
/// Data is buffered until `max_chunk_size` bytes are pending, then written as
/// one chunk. [`flush_chunk`](Self::flush_chunk) forces out a chunk carrying an
/// extension, [`finalize`](Self::finalize) writes the pending data and the
/// terminating zero size chunk.
#[derive(Debug)]
pub struct ChunkedWriter<W> {
    writer: W,
    encoder: ChunkedEncoder,
    pending: BytesMut,
    wire: BytesMut,
    max_chunk_size: usize,
}

impl<W: AsyncWrite + Unpin> ChunkedWriter<W> {
    pub fn new(writer: W) -> Self {
        Self::with_max_chunk_size(writer, DEFAULT_MAX_CHUNK_SIZE)
    }

    pub fn with_max_chunk_size(writer: W, max_chunk_size: usize) -> Self {
        Self {
            writer,
            encoder: ChunkedEncoder::with_max_chunk_size(max_chunk_size),
            pending: BytesMut::with_capacity(max_chunk_size),
            wire: BytesMut::new(),
            max_chunk_size,
        }
    }

    pub async fn write(&mut self, mut data: &[u8]) -> Result<(), SendError> {
        while !data.is_empty() {
            let room = self.max_chunk_size - self.pending.len();
            let take = room.min(data.len());
            self.pending.extend_from_slice(&data[..take]);
            data = &data[take..];
            if self.pending.len() == self.max_chunk_size {
                self.flush_chunk("").await?;
            }
        }
        Ok(())
    }

    /// Writes the buffered data as a chunk with the given extension.
    ///
    /// Nothing is written when no data is pending.
    pub async fn flush_chunk(&mut self, extension: &str) -> Result<(), SendError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let data = self.pending.split().freeze();
        trace!(len = data.len(), "writing chunk");
        self.encoder.encode_with_extension(data, extension, &mut self.wire)?;
        self.write_wire().await
    }

    /// Writes remaining data and the last chunk, then flushes the writer.
    pub async fn finalize(&mut self) -> Result<(), SendError> {
        if self.encoder.is_finish() {
            return Ok(());
        }
        self.flush_chunk("").await?;
        tokio_util::codec::Encoder::encode(&mut self.encoder, PayloadItem::<bytes::Bytes>::Eof, &mut self.wire)?;
        self.write_wire().await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub fn is_finalized(&self) -> bool {
        self.encoder.is_finish()
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    async fn write_wire(&mut self) -> Result<(), SendError> {
        let wire = self.wire.split();
        self.writer.write_all(&wire).await?;
        Ok(())
    }
}
