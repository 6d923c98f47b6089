use std::fmt;
use std::sync::Arc;

use http::Version;

use crate::handler::Handler;
use crate::protocol::HttpStatusError;
use crate::server::ServerSettings;

/// A named endpoint: its settings and the handler serving it.
#[derive(Clone)]
pub struct VirtualHost {
    settings: Arc<ServerSettings>,
    handler: Arc<dyn Handler>,
}

impl VirtualHost {
    pub fn new<H: Handler + 'static>(settings: ServerSettings, handler: H) -> Self {
        Self { settings: Arc::new(settings), handler: Arc::new(handler) }
    }

    pub fn from_arc(settings: Arc<ServerSettings>, handler: Arc<dyn Handler>) -> Self {
        Self { settings, handler }
    }

    pub fn settings(&self) -> &Arc<ServerSettings> {
        &self.settings
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    fn matches(&self, host: &str, port: Option<u16>) -> bool {
        if self.settings.host_name.is_empty() || !self.settings.host_name.eq_ignore_ascii_case(host) {
            return false;
        }
        match port {
            None => true,
            Some(port) => self.settings.port == 0 || self.settings.port == port,
        }
    }
}

impl fmt::Debug for VirtualHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualHost").field("host_name", &self.settings.host_name).field("port", &self.settings.port).finish()
    }
}

/// The virtual hosts sharing one listener, in registration order.
#[derive(Debug, Clone)]
pub struct VirtualHostSelector {
    hosts: Vec<VirtualHost>,
}

impl VirtualHostSelector {
    pub fn new(first: VirtualHost) -> Self {
        Self { hosts: vec![first] }
    }

    /// A listener serving a single host.
    pub fn single<H: Handler + 'static>(settings: ServerSettings, handler: H) -> Self {
        Self::new(VirtualHost::new(settings, handler))
    }

    pub fn push(&mut self, host: VirtualHost) {
        self.hosts.push(host);
    }

    /// The first registered host, it answers whatever no other host claims.
    pub fn default_host(&self) -> &VirtualHost {
        &self.hosts[0]
    }

    pub fn hosts(&self) -> &[VirtualHost] {
        &self.hosts
    }

    /// Picks the host named by the `Host` header.
    ///
    /// HTTP/1.1 requests must carry a `Host`, HTTP/1.0 requests without one go to
    /// the default host, like requests naming a host nobody registered.
    pub fn select(&self, host: Option<&str>, version: Version) -> Result<&VirtualHost, HttpStatusError> {
        let Some(host) = host else {
            return if version == Version::HTTP_10 {
                Ok(self.default_host())
            } else {
                Err(HttpStatusError::bad_request("missing Host header"))
            };
        };

        let (name, port) = split_host_port(host);
        Ok(self.hosts.iter().find(|vhost| vhost.matches(name, port)).unwrap_or_else(|| self.default_host()))
    }
}

/// Splits `name[:port]`, bracketed IPv6 literals included.
fn split_host_port(host: &str) -> (&str, Option<u16>) {
    let host = host.trim();
    if let Some(rest) = host.strip_prefix('[')
        && let Some((name, tail)) = rest.split_once(']')
    {
        return (name, tail.strip_prefix(':').and_then(|port| port.parse().ok()));
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') => (name, port.parse().ok()),
        _ => (host, None),
    }
}
