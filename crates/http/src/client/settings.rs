use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::client::TlsConnector;

pub const DEFAULT_CLIENT_KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_DRAIN_SIZE: u64 = 64 * 1024;

/// How strictly the TLS connector checks the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsPeerValidation {
    /// Accept any certificate.
    None,
    /// The certificate chain must be valid, the host name is not checked.
    CheckCert,
    /// The certificate must be issued for the host name.
    CheckPeer,
    /// Valid chain issued for the host name by a trusted root.
    #[default]
    ValidateCert,
}

#[derive(Clone)]
pub struct ClientSettings {
    /// Upper bound for keeping an idle connection, servers may advertise less.
    pub default_keep_alive_timeout: Duration,
    pub connect_timeout: Option<Duration>,
    /// `http://[user:password@]proxy:port`, credentials answer `407` challenges.
    pub proxy_url: Option<Url>,
    pub tls_peer_validation: TlsPeerValidation,
    pub tls_connector: Option<Arc<dyn TlsConnector>>,
    /// Unread response bodies up to this size are drained before the next
    /// request, larger ones close the connection.
    pub max_drain_size: u64,
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            default_keep_alive_timeout: DEFAULT_CLIENT_KEEP_ALIVE_TIMEOUT,
            connect_timeout: None,
            proxy_url: None,
            tls_peer_validation: TlsPeerValidation::default(),
            tls_connector: None,
            max_drain_size: DEFAULT_MAX_DRAIN_SIZE,
            user_agent: concat!("strand/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl ClientSettings {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_keep_alive_timeout(mut self, timeout: Duration) -> Self {
        self.default_keep_alive_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_proxy(mut self, proxy_url: Url) -> Self {
        self.proxy_url = Some(proxy_url);
        self
    }

    pub fn with_tls_peer_validation(mut self, validation: TlsPeerValidation) -> Self {
        self.tls_peer_validation = validation;
        self
    }

    pub fn with_tls_connector<T: TlsConnector + 'static>(mut self, connector: T) -> Self {
        self.tls_connector = Some(Arc::new(connector));
        self
    }

    pub fn with_max_drain_size(mut self, size: u64) -> Self {
        self.max_drain_size = size;
        self
    }

    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("default_keep_alive_timeout", &self.default_keep_alive_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("proxy_url", &self.proxy_url.as_ref().map(|url| url.host_str().unwrap_or_default().to_owned()))
            .field("tls_peer_validation", &self.tls_peer_validation)
            .field("tls_connector", &self.tls_connector.is_some())
            .field("max_drain_size", &self.max_drain_size)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
