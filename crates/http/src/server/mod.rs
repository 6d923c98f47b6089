//! Listening for connections.
//!
//! An [`HttpServer`] collects virtual hosts with [`HttpServer::listen`] and
//! binds them on [`HttpServer::start`]. Hosts sharing an address and port share
//! one listener, the `Host` header picks among them ([`VirtualHostSelector`]).
//! Every accepted connection runs in its own task.
//!
//! ```no_run
//! use http::{Request, Response};
//! use strand_http::handler::{BoxError, make_handler};
//! use strand_http::protocol::body::ReqBody;
//! use strand_http::server::{HttpServer, ServerSettings};
//!
//! async fn hello(_req: Request<ReqBody>) -> Result<Response<&'static str>, BoxError> {
//!     Ok(Response::new("hello\n"))
//! }
//!
//! # async fn run() -> std::io::Result<()> {
//! let mut server = HttpServer::new();
//! server.listen(ServerSettings::new().with_port(8080), make_handler(hello));
//! let handle = server.start().await?;
//! handle.wait().await;
//! # Ok(())
//! # }
//! ```

mod access_log;
mod error_page;
mod settings;
mod tls;
mod vhost;

pub use access_log::{AccessLogEntry, AccessLogger, TracingAccessLogger, WriterAccessLogger};
pub use error_page::{DefaultErrorPage, ErrorInfo, ErrorPageHandler};
pub use settings::{DEFAULT_KEEP_ALIVE_TIMEOUT, DEFAULT_MAX_REQUEST_BODY_SIZE, ServerSettings};
pub use tls::TlsAcceptor;
pub use vhost::{VirtualHost, VirtualHostSelector};

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::select;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::connection::HttpConnection;
use crate::handler::Handler;
use crate::protocol::ConnectionInfo;

#[derive(Debug, Default)]
pub struct HttpServer {
    listeners: Vec<(SocketAddr, VirtualHostSelector)>,
}

impl HttpServer {
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers a virtual host on every bind address of `settings`.
    pub fn listen<H: Handler + 'static>(&mut self, settings: ServerSettings, handler: H) -> &mut Self {
        let vhost = VirtualHost::new(settings, handler);
        for addr in vhost.settings().socket_addrs() {
            match self.listeners.iter_mut().find(|(bound, _)| *bound == addr) {
                Some((_, selector)) => selector.push(vhost.clone()),
                None => self.listeners.push((addr, VirtualHostSelector::new(vhost.clone()))),
            }
        }
        self
    }

    /// Binds every listener and starts accepting connections.
    pub async fn start(self) -> io::Result<ServerHandle> {
        let token = CancellationToken::new();
        let mut local_addrs = Vec::with_capacity(self.listeners.len());
        let mut tasks = Vec::with_capacity(self.listeners.len());

        for (addr, selector) in self.listeners {
            let listener = TcpListener::bind(addr).await.inspect_err(|e| error!(%addr, cause = %e, "bind server error"))?;
            let local_addr = listener.local_addr()?;
            info!(%local_addr, hosts = selector.hosts().len(), "start listening");

            local_addrs.push(local_addr);
            tasks.push(tokio::spawn(accept_loop(listener, Arc::new(selector), token.clone())));
        }

        Ok(ServerHandle { local_addrs, token, tasks })
    }
}

/// A running server.
#[derive(Debug)]
pub struct ServerHandle {
    local_addrs: Vec<SocketAddr>,
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// The bound addresses, with the ports the system picked for port `0`.
    pub fn local_addrs(&self) -> &[SocketAddr] {
        &self.local_addrs
    }

    /// Stops accepting, connections already accepted finish on their own.
    pub async fn shutdown(self) {
        self.token.cancel();
        self.wait().await;
    }

    pub async fn wait(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(cause = %e, "listener task failed");
            }
        }
    }
}

async fn accept_loop(listener: TcpListener, selector: Arc<VirtualHostSelector>, token: CancellationToken) {
    loop {
        let (tcp_stream, peer_addr) = select! {
            _ = token.cancelled() => {
                info!("listener shut down");
                return;
            }
            accepted = listener.accept() => match accepted {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            }
        };

        let selector = Arc::clone(&selector);
        tokio::spawn(async move {
            if let Err(e) = serve_connection(tcp_stream, peer_addr, selector).await {
                debug!(%peer_addr, cause = %e, "connection ended with error");
            }
        });
    }
}

async fn serve_connection(
    tcp_stream: TcpStream,
    peer_addr: SocketAddr,
    selector: Arc<VirtualHostSelector>,
) -> Result<(), crate::protocol::HttpError> {
    let settings = Arc::clone(selector.default_host().settings());
    let local_addr = tcp_stream.local_addr().ok();
    if let Err(e) = tcp_stream.set_nodelay(true) {
        debug!(cause = %e, "failed to set TCP_NODELAY");
    }

    match &settings.tls_acceptor {
        Some(acceptor) => {
            let stream = match acceptor.accept(tcp_stream).await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(%peer_addr, cause = %e, "TLS handshake failed");
                    return Ok(());
                }
            };
            let info = ConnectionInfo { peer_addr: Some(peer_addr), local_addr, is_tls: true, persistent: false };
            let (reader, writer) = tokio::io::split(stream);
            HttpConnection::new(reader, writer, info, &settings).process(selector).await
        }
        None => {
            let info = ConnectionInfo { peer_addr: Some(peer_addr), local_addr, is_tls: false, persistent: false };
            let (reader, writer) = tcp_stream.into_split();
            HttpConnection::new(reader, writer, info, &settings).process(selector).await
        }
    }
}
