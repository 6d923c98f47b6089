//! Body framing codecs.
//!
//! Decoders turn wire bytes into [`PayloadItem`](crate::protocol::PayloadItem)s,
//! encoders do the reverse:
//!
//! - [`ChunkedDecoder`] / [`ChunkedEncoder`]: `Transfer-Encoding: chunked`
//! - [`LengthDecoder`] / [`LengthEncoder`]: `Content-Length` bounded payloads
//! - [`PayloadDecoder`] / [`PayloadEncoder`]: dispatch on the message framing
//! - [`ChunkedWriter`]: chunked output straight into an `AsyncWrite`

mod chunked_decoder;
mod chunked_encoder;
mod chunked_writer;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use chunked_decoder::ChunkedDecoder;
pub use chunked_encoder::ChunkedEncoder;
pub use chunked_encoder::DEFAULT_MAX_CHUNK_SIZE;
pub use chunked_writer::ChunkedWriter;
pub use length_decoder::LengthDecoder;
pub use length_encoder::LengthEncoder;
pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
