use std::io;

use async_trait::async_trait;

use crate::client::TlsPeerValidation;
use crate::io::BoxedIo;

/// Client side TLS handshake over an established stream.
///
/// `server_name` is the host the client connects to, also when the stream is
/// a tunnel through a proxy.
#[async_trait]
pub trait TlsConnector: Send + Sync {
    async fn connect(&self, server_name: &str, stream: BoxedIo, validation: TlsPeerValidation) -> io::Result<BoxedIo>;
}
