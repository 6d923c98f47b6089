use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use http::Response;
use tracing::trace;
use url::Url;

use crate::client::http_client::Target;
use crate::client::{ClientError, ClientRequest, ClientSettings, HttpClient};
use crate::protocol::ResponseHead;

const DEFAULT_MAX_IDLE_PER_HOST: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PoolKey {
    target: Target,
    proxy: Option<String>,
}

struct PoolInner {
    settings: ClientSettings,
    max_idle_per_host: usize,
    idle: Mutex<HashMap<PoolKey, Vec<HttpClient>>>,
}

/// Idle clients kept per (host, port, TLS, proxy).
///
/// Each [`PooledClient`] is used by one task at a time, requests to the same
/// destination from concurrent tasks get separate connections.
#[derive(Clone)]
pub struct ClientPool {
    inner: Arc<PoolInner>,
}

impl ClientPool {
    pub fn new(settings: ClientSettings) -> Self {
        Self::with_max_idle_per_host(settings, DEFAULT_MAX_IDLE_PER_HOST)
    }

    pub fn with_max_idle_per_host(settings: ClientSettings, max_idle_per_host: usize) -> Self {
        Self { inner: Arc::new(PoolInner { settings, max_idle_per_host, idle: Mutex::new(HashMap::new()) }) }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.inner.settings
    }

    /// An idle client for the destination, or a new one.
    pub fn acquire(&self, host: &str, port: u16, use_tls: bool) -> Result<PooledClient, ClientError> {
        let key = PoolKey {
            target: Target { host: host.to_owned(), port, tls: use_tls },
            proxy: self.inner.settings.proxy_url.as_ref().map(Url::to_string),
        };

        let reused = {
            let mut idle = self.inner.idle.lock().unwrap_or_else(PoisonError::into_inner);
            idle.get_mut(&key).and_then(Vec::pop)
        };
        let client = match reused {
            Some(client) => {
                trace!(host, port, "reusing pooled client");
                client
            }
            None => {
                let mut client = HttpClient::new();
                client.connect(host, port, use_tls, self.inner.settings.clone())?;
                client
            }
        };

        Ok(PooledClient { client, key, pool: Arc::clone(&self.inner) })
    }

    /// Sends `request` to `url` and reads the whole response.
    ///
    /// `http`, `https`, `ws` and `wss` urls are accepted, the request target is
    /// replaced by the url's path and query.
    pub async fn request_url(&self, url: &str, mut request: ClientRequest) -> Result<(ResponseHead, Bytes), ClientError> {
        let (host, port, use_tls, target) = split_url(url)?;
        request.set_target(target);

        let mut client = self.acquire(&host, port, use_tls)?;
        let response = client.request(request).await?;
        let mut head = Response::new(());
        *head.status_mut() = response.status();
        *head.version_mut() = response.version();
        *head.headers_mut() = response.headers().clone();
        let body = response.read_all().await?;
        Ok((head, body))
    }

    pub fn idle_count(&self) -> usize {
        self.inner.idle.lock().unwrap_or_else(PoisonError::into_inner).values().map(Vec::len).sum()
    }
}

impl Default for ClientPool {
    fn default() -> Self {
        Self::new(ClientSettings::default())
    }
}

impl fmt::Debug for ClientPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientPool").field("idle", &self.idle_count()).finish()
    }
}

/// `(host, port, tls, path and query)` of an absolute url.
fn split_url(url: &str) -> Result<(String, u16, bool, String), ClientError> {
    let url = Url::parse(url).map_err(ClientError::invalid_url)?;
    let use_tls = match url.scheme() {
        "http" | "ws" => false,
        "https" | "wss" => true,
        scheme => return Err(ClientError::invalid_url(format!("unsupported scheme {scheme}"))),
    };
    let host = match url.host() {
        Some(url::Host::Ipv6(addr)) => addr.to_string(),
        Some(host) => host.to_string(),
        None => return Err(ClientError::invalid_url("url has no host")),
    };
    let port = url.port_or_known_default().unwrap_or(if use_tls { 443 } else { 80 });
    let target = match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_owned(),
    };
    Ok((host, port, use_tls, target))
}

/// A client checked out of a [`ClientPool`], going back when dropped.
pub struct PooledClient {
    client: HttpClient,
    key: PoolKey,
    pool: Arc<PoolInner>,
}

impl Deref for PooledClient {
    type Target = HttpClient;

    fn deref(&self) -> &HttpClient {
        &self.client
    }
}

impl DerefMut for PooledClient {
    fn deref_mut(&mut self) -> &mut HttpClient {
        &mut self.client
    }
}

impl Drop for PooledClient {
    fn drop(&mut self) {
        let client = std::mem::take(&mut self.client);
        if !client.is_connected() {
            return;
        }
        let mut idle = self.pool.idle.lock().unwrap_or_else(PoisonError::into_inner);
        let clients = idle.entry(self.key.clone()).or_default();
        if clients.len() < self.pool.max_idle_per_host {
            clients.push(client);
        }
    }
}

impl fmt::Debug for PooledClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledClient").field("client", &self.client).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn urls() {
        assert_eq!(split_url("http://example.com/a?b=c").unwrap(), ("example.com".to_owned(), 80, false, "/a?b=c".to_owned()));
        assert_eq!(split_url("wss://[::1]:8443/chat").unwrap(), ("::1".to_owned(), 8443, true, "/chat".to_owned()));
        assert_eq!(split_url("https://example.com").unwrap(), ("example.com".to_owned(), 443, true, "/".to_owned()));
        assert!(matches!(split_url("ftp://example.com/"), Err(ClientError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn reuses_connections() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&accepted);
        tokio::spawn(async move {
            loop {
                let (mut stream, _) = listener.accept().await.unwrap();
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let mut seen = Vec::new();
                    loop {
                        let n = stream.read(&mut buf).await.unwrap_or(0);
                        if n == 0 {
                            return;
                        }
                        seen.extend_from_slice(&buf[..n]);
                        while let Some(end) = seen.windows(4).position(|w| w == b"\r\n\r\n") {
                            seen.drain(..end + 4);
                            stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok").await.unwrap();
                        }
                    }
                });
            }
        });

        let pool = ClientPool::default();
        let url = format!("http://127.0.0.1:{port}/ping");
        for _ in 0..3 {
            let (head, body) = pool.request_url(&url, ClientRequest::get("/")).await.unwrap();
            assert_eq!(head.status(), 200);
            assert_eq!(body, "ok");
        }

        assert_eq!(accepted.load(Ordering::SeqCst), 1);
        assert_eq!(pool.idle_count(), 1);
    }
}
