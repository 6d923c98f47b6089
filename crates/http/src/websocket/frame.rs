use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::websocket::WebSocketError;

pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

const MAX_CONTROL_PAYLOAD: usize = 125;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl OpCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(Self::Continuation),
            0x1 => Some(Self::Text),
            0x2 => Some(Self::Binary),
            0x8 => Some(Self::Close),
            0x9 => Some(Self::Ping),
            0xA => Some(Self::Pong),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Continuation => 0x0,
            Self::Text => 0x1,
            Self::Binary => 0x2,
            Self::Close => 0x8,
            Self::Ping => 0x9,
            Self::Pong => 0xA,
        }
    }

    pub fn is_control(self) -> bool {
        matches!(self, Self::Close | Self::Ping | Self::Pong)
    }
}

/// The status code and reason of a close frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    pub code: u16,
    pub reason: String,
}

impl CloseFrame {
    pub const NORMAL: u16 = 1000;
    pub const GOING_AWAY: u16 = 1001;
    pub const PROTOCOL_ERROR: u16 = 1002;
    pub const INVALID_DATA: u16 = 1007;
    pub const TOO_BIG: u16 = 1009;

    pub fn new<S: Into<String>>(code: u16, reason: S) -> Self {
        Self { code, reason: reason.into() }
    }

    /// An empty payload carries no close frame, otherwise two code bytes
    /// come first and the rest is the UTF-8 reason.
    pub fn parse(payload: &[u8]) -> Result<Option<Self>, WebSocketError> {
        match payload {
            [] => Ok(None),
            [_] => Err(WebSocketError::protocol("close payload of one byte")),
            [high, low, reason @ ..] => {
                let reason = std::str::from_utf8(reason)?;
                Ok(Some(Self { code: u16::from_be_bytes([*high, *low]), reason: reason.to_owned() }))
            }
        }
    }

    fn to_payload(&self) -> Bytes {
        let mut payload = BytesMut::with_capacity(2 + self.reason.len());
        payload.put_u16(self.code);
        payload.put_slice(self.reason.as_bytes());
        payload.freeze()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: bool,
    pub opcode: OpCode,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(fin: bool, opcode: OpCode, payload: Bytes) -> Self {
        Self { fin, opcode, payload }
    }

    pub fn text<S: Into<String>>(text: S) -> Self {
        Self::new(true, OpCode::Text, Bytes::from(text.into()))
    }

    pub fn binary<B: Into<Bytes>>(data: B) -> Self {
        Self::new(true, OpCode::Binary, data.into())
    }

    pub fn ping<B: Into<Bytes>>(data: B) -> Self {
        Self::new(true, OpCode::Ping, data.into())
    }

    pub fn pong<B: Into<Bytes>>(data: B) -> Self {
        Self::new(true, OpCode::Pong, data.into())
    }

    pub fn close(close: Option<&CloseFrame>) -> Self {
        Self::new(true, OpCode::Close, close.map(CloseFrame::to_payload).unwrap_or_default())
    }
}

/// Which end of the connection a codec runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Masks every frame it sends, expects unmasked frames.
    Client,
    /// Sends unmasked frames, expects masked ones.
    Server,
}

/// RFC 6455 framing.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    role: Role,
    max_frame_size: usize,
}

impl FrameCodec {
    pub fn new(role: Role) -> Self {
        Self::with_max_frame_size(role, DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(role: Role, max_frame_size: usize) -> Self {
        Self { role, max_frame_size }
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

fn apply_mask(data: &mut [u8], key: [u8; 4]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = WebSocketError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let [first, second, ..] = src[..] else {
            return Ok(None);
        };

        if first & 0x70 != 0 {
            return Err(WebSocketError::protocol("reserved bits set"));
        }
        let fin = first & 0x80 != 0;
        let opcode = OpCode::from_u8(first & 0x0F).ok_or_else(|| WebSocketError::protocol(format!("unknown opcode {:#x}", first & 0x0F)))?;
        let masked = second & 0x80 != 0;
        match (self.role, masked) {
            (Role::Server, false) => return Err(WebSocketError::protocol("unmasked client frame")),
            (Role::Client, true) => return Err(WebSocketError::protocol("masked server frame")),
            _ => {}
        }

        let (length, mut header_len) = match second & 0x7F {
            126 => {
                let Some(bytes) = src.get(2..4) else {
                    return Ok(None);
                };
                (u64::from(u16::from_be_bytes([bytes[0], bytes[1]])), 4)
            }
            127 => {
                let Some(bytes) = src.get(2..10) else {
                    return Ok(None);
                };
                let mut length = [0u8; 8];
                length.copy_from_slice(bytes);
                let length = u64::from_be_bytes(length);
                if length >> 63 != 0 {
                    return Err(WebSocketError::protocol("most significant length bit set"));
                }
                (length, 10)
            }
            length => (u64::from(length), 2),
        };

        if opcode.is_control() && (!fin || length > MAX_CONTROL_PAYLOAD as u64) {
            return Err(WebSocketError::protocol("fragmented or oversized control frame"));
        }
        if length > self.max_frame_size as u64 {
            return Err(WebSocketError::FrameTooLarge { size: length, max: self.max_frame_size });
        }
        let length = length as usize;

        let mask = if masked {
            let Some(key) = src.get(header_len..header_len + 4) else {
                return Ok(None);
            };
            let key = [key[0], key[1], key[2], key[3]];
            header_len += 4;
            Some(key)
        } else {
            None
        };

        if src.len() < header_len + length {
            src.reserve(header_len + length - src.len());
            return Ok(None);
        }

        src.advance(header_len);
        let mut payload = src.split_to(length);
        if let Some(key) = mask {
            apply_mask(&mut payload, key);
        }
        trace!(?opcode, fin, length, "decoded websocket frame");
        Ok(Some(Frame { fin, opcode, payload: payload.freeze() }))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = WebSocketError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let length = item.payload.len();
        let mask_bit = if self.role == Role::Client { 0x80 } else { 0 };
        dst.reserve(14 + length);

        dst.put_u8((if item.fin { 0x80 } else { 0 }) | item.opcode.as_u8());
        if length < 126 {
            dst.put_u8(mask_bit | length as u8);
        } else if let Ok(length) = u16::try_from(length) {
            dst.put_u8(mask_bit | 126);
            dst.put_u16(length);
        } else {
            dst.put_u8(mask_bit | 127);
            dst.put_u64(length as u64);
        }

        match self.role {
            Role::Client => {
                let key = fastrand::u32(..).to_be_bytes();
                dst.put_slice(&key);
                let start = dst.len();
                dst.put_slice(&item.payload);
                apply_mask(&mut dst[start..], key);
            }
            Role::Server => dst.put_slice(&item.payload),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(len: usize) {
        let payload = Bytes::from((0..len).map(|i| i as u8).collect::<Vec<_>>());
        let mut wire = BytesMut::new();
        FrameCodec::new(Role::Client).encode(Frame::binary(payload.clone()), &mut wire).unwrap();

        let header_len = match len {
            0..=125 => 2,
            126..=65535 => 4,
            _ => 10,
        };
        assert_eq!(wire.len(), header_len + 4 + len);

        let frame = FrameCodec::new(Role::Server).decode(&mut wire).unwrap().unwrap();
        assert_eq!(frame.opcode, OpCode::Binary);
        assert!(frame.fin);
        assert_eq!(frame.payload, payload);
        assert!(wire.is_empty());
    }

    #[test]
    fn length_field_widths() {
        for len in [0, 1, 125, 126, 65535, 65536] {
            roundtrip(len);
        }
    }

    #[test]
    fn server_frames_are_unmasked() {
        let mut wire = BytesMut::new();
        FrameCodec::new(Role::Server).encode(Frame::text("hi"), &mut wire).unwrap();
        assert_eq!(&wire[..], b"\x81\x02hi");
    }

    #[test]
    fn partial_frames_wait() {
        let mut codec = FrameCodec::new(Role::Client);
        let mut wire = BytesMut::from(&b"\x82\x7e\x01"[..]);
        assert!(codec.decode(&mut wire).unwrap().is_none());
        wire.extend_from_slice(&[0x00]);
        wire.extend_from_slice(&[7u8; 100]);
        assert!(codec.decode(&mut wire).unwrap().is_none());
        wire.extend_from_slice(&[7u8; 156]);
        let frame = codec.decode(&mut wire).unwrap().unwrap();
        assert_eq!(frame.payload.len(), 256);
    }

    #[test]
    fn rejects_protocol_violations() {
        let mut server = FrameCodec::new(Role::Server);
        assert!(matches!(server.decode(&mut BytesMut::from(&b"\x81\x02hi"[..])), Err(WebSocketError::Protocol { .. })));

        let mut client = FrameCodec::new(Role::Client);
        assert!(matches!(client.decode(&mut BytesMut::from(&b"\x09\x00"[..])), Err(WebSocketError::Protocol { .. })));
        assert!(matches!(client.decode(&mut BytesMut::from(&b"\x83\x00"[..])), Err(WebSocketError::Protocol { .. })));

        let mut small = FrameCodec::with_max_frame_size(Role::Client, 10);
        assert!(matches!(small.decode(&mut BytesMut::from(&b"\x82\x0b"[..])), Err(WebSocketError::FrameTooLarge { size: 11, max: 10 })));
    }

    #[test]
    fn close_payload() {
        let close = CloseFrame::new(CloseFrame::NORMAL, "bye");
        let frame = Frame::close(Some(&close));
        assert_eq!(&frame.payload[..], b"\x03\xe8bye");
        assert_eq!(CloseFrame::parse(&frame.payload).unwrap(), Some(close));
        assert_eq!(CloseFrame::parse(b"").unwrap(), None);
        assert!(matches!(CloseFrame::parse(b"\x03"), Err(_)));
    }
}
