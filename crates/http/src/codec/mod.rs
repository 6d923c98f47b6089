//! Streaming codecs for HTTP/1.x messages.
//!
//! All codecs implement `tokio_util::codec` [`Decoder`](tokio_util::codec::Decoder) /
//! [`Encoder`](tokio_util::codec::Encoder) and exchange [`Message`](crate::protocol::Message)s:
//! a head, then the payload items of its body.
//!
//! | side   | reads             | writes            |
//! |--------|-------------------|-------------------|
//! | server | [`RequestDecoder`]  | [`ResponseEncoder`] |
//! | client | [`ResponseDecoder`] | [`RequestEncoder`]  |
//!
//! Head parsing lives in [`header`], body framing in [`body`].

pub mod body;
pub mod header;
mod request_decoder;
mod request_encoder;
mod response_decoder;
mod response_encoder;

pub use body::ChunkedWriter;
pub use request_decoder::RequestDecoder;
pub use request_encoder::RequestEncoder;
pub use response_decoder::ResponseDecoder;
pub use response_encoder::ResponseEncoder;

pub(crate) use header::encode_interim;
