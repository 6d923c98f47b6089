//! Byte stream adapters shared by the client and the server.
//!
//! - [`TimeoutReader`]: idle and per-request read deadlines
//! - [`Upgraded`]: the raw tunnel after a protocol switch
//! - [`Io`] / [`BoxedIo`]: the transport abstraction, plain TCP or a TLS wrapper

mod timeout;
mod upgraded;

pub use timeout::TimeoutReader;
pub use upgraded::Upgraded;

use tokio::io::{AsyncRead, AsyncWrite};

/// A bidirectional byte stream.
pub trait Io: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Io for T {}

pub type BoxedIo = Box<dyn Io>;
