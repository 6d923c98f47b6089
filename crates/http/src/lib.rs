//! The HTTP/1.x protocol engine of strand.
//!
//! Both ends of HTTP/1.0 and HTTP/1.1 over tokio: a server running one task
//! per connection with virtual hosts and keep-alive, and a client state machine
//! with connection reuse, proxies and a pool. Bodies stream in both directions.
//!
//! # Example
//!
//! ```no_run
//! use http::{Request, Response, StatusCode};
//! use http_body_util::BodyExt;
//! use strand_http::handler::{BoxError, make_handler};
//! use strand_http::protocol::body::ReqBody;
//! use strand_http::server::{HttpServer, ServerSettings};
//! use tracing::info;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let mut server = HttpServer::new();
//!     server.listen(ServerSettings::new().with_port(8080), make_handler(echo));
//!     server.start().await?.wait().await;
//!     Ok(())
//! }
//!
//! async fn echo(request: Request<ReqBody>) -> Result<Response<String>, BoxError> {
//!     info!(path = request.uri().path(), "echo");
//!     let body = request.into_body().collect().await?.to_bytes();
//!     let response = Response::builder()
//!         .status(StatusCode::OK)
//!         .body(String::from_utf8_lossy(&body).into_owned())?;
//!     Ok(response)
//! }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: messages, headers, errors and bodies
//! - [`codec`]: `tokio_util` decoders and encoders for heads and body framing
//! - [`connection`]: the server side request loop of one connection
//! - [`server`]: listeners, virtual hosts, access logs and error pages
//! - [`client`]: [`HttpClient`](client::HttpClient) and [`ClientPool`](client::ClientPool)
//! - [`websocket`]: RFC 6455 framing and handshakes
//! - [`compression`]: gzip and deflate bodies
//! - [`io`]: read timeouts and switched connections
//! - [`handler`]: the [`Handler`](handler::Handler) trait requests are dispatched to
//!
//! # Limits
//!
//! - HTTP/2 and HTTP/3 are not supported
//! - TLS comes from outside through [`server::TlsAcceptor`] and [`client::TlsConnector`]
//! - at most 64 headers per message

pub mod client;
pub mod codec;
pub mod compression;
pub mod connection;
pub mod date;
pub mod handler;
pub mod io;
pub mod protocol;
pub mod server;
pub mod websocket;

mod utils;
pub(crate) use utils::ensure;
