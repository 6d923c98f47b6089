use std::io;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::io::BoxedIo;

/// Server side TLS handshake over an accepted TCP stream.
///
/// The engine does not implement TLS, an integration wraps its TLS library of
/// choice in this trait and sets it with
/// [`ServerSettings::with_tls_acceptor`](crate::server::ServerSettings::with_tls_acceptor).
#[async_trait]
pub trait TlsAcceptor: Send + Sync {
    async fn accept(&self, stream: TcpStream) -> io::Result<BoxedIo>;
}
