//! The client side: one [`HttpClient`] per connection, a [`ClientPool`] to
//! share them.
//!
//! ```no_run
//! use strand_http::client::{ClientRequest, ClientSettings, HttpClient};
//!
//! # async fn run() -> Result<(), strand_http::client::ClientError> {
//! let mut client = HttpClient::new();
//! client.connect("example.com", 80, false, ClientSettings::new())?;
//! let response = client.request(ClientRequest::get("/")).await?;
//! println!("{}", response.status());
//! let body = response.read_all().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod http_client;
mod pool;
mod request;
mod response;
mod settings;
mod tls;

pub use error::ClientError;
pub use http_client::HttpClient;
pub use pool::{ClientPool, PooledClient};
pub use request::{ClientRequest, RequestBody};
pub use response::ClientResponse;
pub use settings::{ClientSettings, DEFAULT_CLIENT_KEEP_ALIVE_TIMEOUT, DEFAULT_MAX_DRAIN_SIZE, TlsPeerValidation};
pub use tls::TlsConnector;
