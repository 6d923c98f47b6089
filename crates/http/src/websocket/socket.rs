use std::fmt;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{debug, trace};

use crate::websocket::{CloseFrame, DEFAULT_MAX_FRAME_SIZE, Frame, FrameCodec, OpCode, Role, WebSocketError};

/// A complete message, fragments already joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Binary(Bytes),
    Pong(Bytes),
    Close(Option<CloseFrame>),
}

/// A websocket connection over a switched stream.
///
/// [`receive`](Self::receive) answers pings on its own and replies to the
/// peer's close frame.
pub struct WebSocket<S> {
    framed: Framed<S, FrameCodec>,
    fragments: Option<(OpCode, BytesMut)>,
    max_message_size: usize,
    close_sent: bool,
    close_received: bool,
}

impl<S: AsyncRead + AsyncWrite + Unpin> WebSocket<S> {
    pub fn new(stream: S, role: Role) -> Self {
        Self::from_codec(stream, FrameCodec::new(role))
    }

    pub fn from_codec(stream: S, codec: FrameCodec) -> Self {
        Self {
            framed: Framed::new(stream, codec),
            fragments: None,
            max_message_size: DEFAULT_MAX_FRAME_SIZE,
            close_sent: false,
            close_received: false,
        }
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    pub fn role(&self) -> Role {
        self.framed.codec().role()
    }

    pub fn is_closed(&self) -> bool {
        self.close_sent || self.close_received
    }

    pub async fn send_text<T: Into<String>>(&mut self, text: T) -> Result<(), WebSocketError> {
        self.send_frame(Frame::text(text)).await
    }

    pub async fn send_binary<B: Into<Bytes>>(&mut self, data: B) -> Result<(), WebSocketError> {
        self.send_frame(Frame::binary(data)).await
    }

    pub async fn ping<B: Into<Bytes>>(&mut self, data: B) -> Result<(), WebSocketError> {
        self.send_frame(Frame::ping(data)).await
    }

    async fn send_frame(&mut self, frame: Frame) -> Result<(), WebSocketError> {
        if self.close_sent {
            return Err(WebSocketError::Closed);
        }
        self.framed.send(frame).await
    }

    /// The next message; `None` when the stream ended.
    pub async fn receive(&mut self) -> Result<Option<Message>, WebSocketError> {
        loop {
            let Some(frame) = self.framed.next().await.transpose()? else {
                return Ok(None);
            };
            trace!(opcode = ?frame.opcode, fin = frame.fin, len = frame.payload.len(), "received frame");

            match frame.opcode {
                OpCode::Ping => {
                    if !self.close_sent {
                        self.framed.send(Frame::pong(frame.payload)).await?;
                    }
                }
                OpCode::Pong => return Ok(Some(Message::Pong(frame.payload))),
                OpCode::Close => {
                    let close = CloseFrame::parse(&frame.payload)?;
                    self.close_received = true;
                    if !self.close_sent {
                        self.close_sent = true;
                        self.framed.send(Frame::close(close.as_ref())).await?;
                    }
                    return Ok(Some(Message::Close(close)));
                }
                OpCode::Text | OpCode::Binary => {
                    if self.fragments.is_some() {
                        return Err(WebSocketError::protocol("new message inside a fragmented one"));
                    }
                    if frame.fin {
                        return to_message(frame.opcode, frame.payload).map(Some);
                    }
                    self.check_size(frame.payload.len())?;
                    self.fragments = Some((frame.opcode, BytesMut::from(&frame.payload[..])));
                }
                OpCode::Continuation => {
                    let Some(buffered) = self.fragments.as_ref().map(|(_, buffer)| buffer.len()) else {
                        return Err(WebSocketError::protocol("continuation without a message"));
                    };
                    self.check_size(buffered + frame.payload.len())?;
                    if let Some((_, buffer)) = &mut self.fragments {
                        buffer.extend_from_slice(&frame.payload);
                    }
                    if frame.fin
                        && let Some((opcode, buffer)) = self.fragments.take()
                    {
                        return to_message(opcode, buffer.freeze()).map(Some);
                    }
                }
            }
        }
    }

    fn check_size(&self, size: usize) -> Result<(), WebSocketError> {
        if size > self.max_message_size {
            return Err(WebSocketError::FrameTooLarge { size: size as u64, max: self.max_message_size });
        }
        Ok(())
    }

    /// Sends a close frame and waits for the peer's answer.
    ///
    /// Messages arriving in between are discarded.
    pub async fn close(&mut self, code: u16, reason: &str) -> Result<(), WebSocketError> {
        if !self.close_sent {
            self.close_sent = true;
            self.framed.send(Frame::close(Some(&CloseFrame::new(code, reason)))).await?;
        }
        while !self.close_received {
            match self.framed.next().await {
                Some(Ok(frame)) if frame.opcode == OpCode::Close => self.close_received = true,
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }
        debug!(code, "websocket closed");
        Ok(())
    }

    pub fn into_inner(self) -> S {
        self.framed.into_inner()
    }
}

fn to_message(opcode: OpCode, payload: Bytes) -> Result<Message, WebSocketError> {
    match opcode {
        OpCode::Text => Ok(Message::Text(String::from_utf8(payload.to_vec()).map_err(|e| e.utf8_error())?)),
        _ => Ok(Message::Binary(payload)),
    }
}

impl<S> fmt::Debug for WebSocket<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocket")
            .field("close_sent", &self.close_sent)
            .field("close_received", &self.close_received)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncWriteExt, duplex};

    #[tokio::test]
    async fn text_and_binary() {
        let (client_io, server_io) = duplex(4096);
        let mut client = WebSocket::new(client_io, Role::Client);
        let mut server = WebSocket::new(server_io, Role::Server);

        client.send_text("hello").await.unwrap();
        client.send_binary(Bytes::from_static(b"\x00\x01")).await.unwrap();
        assert_eq!(server.receive().await.unwrap(), Some(Message::Text("hello".into())));
        assert_eq!(server.receive().await.unwrap(), Some(Message::Binary(Bytes::from_static(b"\x00\x01"))));

        server.send_text("back").await.unwrap();
        assert_eq!(client.receive().await.unwrap(), Some(Message::Text("back".into())));
    }

    #[tokio::test]
    async fn ping_is_answered() {
        let (client_io, server_io) = duplex(4096);
        let mut client = WebSocket::new(client_io, Role::Client);
        let mut server = WebSocket::new(server_io, Role::Server);

        server.ping(Bytes::from_static(b"p")).await.unwrap();
        server.send_text("after ping").await.unwrap();
        // the client answers the ping while waiting for the text
        assert_eq!(client.receive().await.unwrap(), Some(Message::Text("after ping".into())));
        assert_eq!(server.receive().await.unwrap(), Some(Message::Pong(Bytes::from_static(b"p"))));
    }

    #[tokio::test]
    async fn fragments_are_joined() {
        let (mut raw, server_io) = duplex(4096);
        let mut server = WebSocket::new(server_io, Role::Server);

        // masked with an all-zero key, the payload stays readable
        raw.write_all(b"\x01\x83\0\0\0\0hel\x80\x82\0\0\0\0lo").await.unwrap();
        assert_eq!(server.receive().await.unwrap(), Some(Message::Text("hello".into())));
    }

    #[tokio::test]
    async fn close_handshake() {
        let (client_io, server_io) = duplex(4096);
        let mut client = WebSocket::new(client_io, Role::Client);
        let mut server = WebSocket::new(server_io, Role::Server);

        let closing = tokio::spawn(async move {
            client.close(CloseFrame::NORMAL, "done").await.unwrap();
            client.is_closed()
        });
        let message = server.receive().await.unwrap();
        assert_eq!(message, Some(Message::Close(Some(CloseFrame::new(1000, "done")))));
        assert!(closing.await.unwrap());
        assert!(matches!(server.send_text("late").await, Err(WebSocketError::Closed)));
    }
}
