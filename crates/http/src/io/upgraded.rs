use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// A raw byte tunnel left over after a protocol switch.
///
/// Once a connection answered `101 Switching Protocols` (or a proxy accepted a
/// `CONNECT`), HTTP framing no longer applies. Bytes the HTTP layer had already
/// buffered past the response head are yielded first, then reads go straight
/// to the transport.
pub struct Upgraded {
    read_buf: Bytes,
    reader: Box<dyn AsyncRead + Send + Unpin>,
    writer: Box<dyn AsyncWrite + Send + Unpin>,
}

impl Upgraded {
    pub fn new<R, W>(read_buf: Bytes, reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self { read_buf, reader: Box::new(reader), writer: Box::new(writer) }
    }

    /// Bytes received before the switch that were not consumed yet.
    pub fn buffered(&self) -> &[u8] {
        &self.read_buf
    }
}

impl fmt::Debug for Upgraded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upgraded").field("buffered", &self.read_buf.len()).finish()
    }
}

impl AsyncRead for Upgraded {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        if self.read_buf.has_remaining() {
            let len = self.read_buf.len().min(buf.remaining());
            buf.put_slice(&self.read_buf[..len]);
            self.read_buf.advance(len);
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut self.reader).poll_read(cx, buf)
    }
}

impl AsyncWrite for Upgraded {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.writer).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.writer).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.writer).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn buffered_bytes_come_first() {
        let (mut peer, local) = tokio::io::duplex(64);
        let (reader, writer) = tokio::io::split(local);
        let mut upgraded = Upgraded::new(Bytes::from_static(b"early "), reader, writer);

        peer.write_all(b"late").await.unwrap();
        let mut buf = vec![0u8; 10];
        upgraded.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"early late");

        upgraded.write_all(b"pong").await.unwrap();
        let mut echo = [0u8; 4];
        peer.read_exact(&mut echo).await.unwrap();
        assert_eq!(&echo, b"pong");
    }
}
