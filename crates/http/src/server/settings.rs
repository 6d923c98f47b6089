use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use crate::codec::header::DEFAULT_MAX_HEADER_BYTES;
use crate::server::{AccessLogger, ErrorPageHandler, TlsAcceptor};

pub const DEFAULT_MAX_REQUEST_BODY_SIZE: u64 = 2 * 1024 * 1024;
pub const DEFAULT_KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings of one virtual host.
///
/// Virtual hosts sharing a port share one listener, the read limits of the
/// first registered host apply until a request names its host.
#[derive(Clone)]
pub struct ServerSettings {
    pub port: u16,
    pub bind_addresses: Vec<IpAddr>,
    /// Matched against the `Host` header, empty matches any host.
    pub host_name: String,
    pub max_request_header_size: usize,
    /// `0` disables the limit.
    pub max_request_body_size: u64,
    pub max_request_time: Option<Duration>,
    /// Idle read timeout, between requests and while reading one.
    pub keep_alive_timeout: Option<Duration>,
    pub server_string: String,
    /// Compress bodies of responses whose handler set `Content-Encoding`.
    pub use_compression: bool,
    pub access_loggers: Vec<Arc<dyn AccessLogger>>,
    pub error_page_handler: Option<Arc<dyn ErrorPageHandler>>,
    pub tls_acceptor: Option<Arc<dyn TlsAcceptor>>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addresses: vec![IpAddr::V4(Ipv4Addr::UNSPECIFIED)],
            host_name: String::new(),
            max_request_header_size: DEFAULT_MAX_HEADER_BYTES,
            max_request_body_size: DEFAULT_MAX_REQUEST_BODY_SIZE,
            max_request_time: None,
            keep_alive_timeout: Some(DEFAULT_KEEP_ALIVE_TIMEOUT),
            server_string: "strand".to_owned(),
            use_compression: false,
            access_loggers: Vec::new(),
            error_page_handler: None,
            tls_acceptor: None,
        }
    }
}

impl ServerSettings {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Replaces the default bind addresses on the first call, adds to them afterwards.
    pub fn with_bind_address(mut self, address: IpAddr) -> Self {
        if self.bind_addresses == ServerSettings::default().bind_addresses {
            self.bind_addresses.clear();
        }
        if !self.bind_addresses.contains(&address) {
            self.bind_addresses.push(address);
        }
        self
    }

    pub fn with_host_name<S: Into<String>>(mut self, host_name: S) -> Self {
        self.host_name = host_name.into();
        self
    }

    pub fn with_max_request_header_size(mut self, size: usize) -> Self {
        self.max_request_header_size = size;
        self
    }

    pub fn with_max_request_body_size(mut self, size: u64) -> Self {
        self.max_request_body_size = size;
        self
    }

    pub fn with_max_request_time(mut self, time: Duration) -> Self {
        self.max_request_time = Some(time);
        self
    }

    pub fn with_keep_alive_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.keep_alive_timeout = timeout;
        self
    }

    pub fn with_server_string<S: Into<String>>(mut self, server_string: S) -> Self {
        self.server_string = server_string.into();
        self
    }

    pub fn with_compression(mut self, use_compression: bool) -> Self {
        self.use_compression = use_compression;
        self
    }

    pub fn with_access_logger<L: AccessLogger + 'static>(mut self, logger: L) -> Self {
        self.access_loggers.push(Arc::new(logger));
        self
    }

    pub fn with_error_page_handler<E: ErrorPageHandler + 'static>(mut self, handler: E) -> Self {
        self.error_page_handler = Some(Arc::new(handler));
        self
    }

    pub fn with_tls_acceptor<T: TlsAcceptor + 'static>(mut self, acceptor: T) -> Self {
        self.tls_acceptor = Some(Arc::new(acceptor));
        self
    }

    /// `None` when the body size is unlimited.
    pub fn body_limit(&self) -> Option<u64> {
        (self.max_request_body_size > 0).then_some(self.max_request_body_size)
    }

    pub fn socket_addrs(&self) -> Vec<SocketAddr> {
        self.bind_addresses.iter().map(|ip| SocketAddr::new(*ip, self.port)).collect()
    }
}

impl fmt::Debug for ServerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSettings")
            .field("port", &self.port)
            .field("bind_addresses", &self.bind_addresses)
            .field("host_name", &self.host_name)
            .field("max_request_header_size", &self.max_request_header_size)
            .field("max_request_body_size", &self.max_request_body_size)
            .field("max_request_time", &self.max_request_time)
            .field("keep_alive_timeout", &self.keep_alive_timeout)
            .field("server_string", &self.server_string)
            .field("use_compression", &self.use_compression)
            .field("access_loggers", &self.access_loggers.len())
            .field("error_page_handler", &self.error_page_handler.is_some())
            .field("tls", &self.tls_acceptor.is_some())
            .finish()
    }
}
