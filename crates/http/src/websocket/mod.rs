//! RFC 6455 websockets over a switched HTTP connection.
//!
//! On the server a handler answers an upgrade request with
//! [`upgrade_response`], the connection runs the callback with a
//! [`WebSocket`] after the `101` went out. A client calls
//! [`connect_websocket`] on a connected [`HttpClient`](crate::client::HttpClient).
//!
//! Server frames go out unmasked, client frames masked with a random key.

mod error;
mod frame;
mod handshake;
mod socket;

pub use error::WebSocketError;
pub use frame::{CloseFrame, DEFAULT_MAX_FRAME_SIZE, Frame, FrameCodec, OpCode, Role};
pub use handshake::{accept_key, connect_websocket, is_websocket_upgrade, upgrade_response};
pub use socket::{Message, WebSocket};
