//! HTTP request header handling implementation.
//!
//! This module provides the core abstractions for handling HTTP request headers.
//! It wraps the standard `http::Request` type to provide the protocol level
//! queries the connection handler needs (persistence, expectations, host).

use std::net::SocketAddr;

use http::header::{CONNECTION, EXPECT, HOST};
use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version};

use crate::protocol::HeaderMapExt;

/// Represents an HTTP request header.
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl AsMut<Request<()>> for RequestHeader {
    fn as_mut(&mut self) -> &mut Request<()> {
        &mut self.inner
    }
}

impl RequestHeader {
    /// Consumes the header and returns the inner `Request<()>`.
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    /// Attaches a body to this header, converting it into a full `Request<T>`.
    pub fn body<T>(self, body: T) -> Request<T> {
        self.inner.map(|_| body)
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Determines if this request may carry a body based on its HTTP method.
    ///
    /// GET, HEAD, DELETE, OPTIONS and CONNECT requests are treated as bodiless
    /// unless they declare a framing header.
    pub fn need_body(&self) -> bool {
        !matches!(self.method(), &Method::GET | &Method::HEAD | &Method::DELETE | &Method::OPTIONS | &Method::CONNECT)
    }

    /// Whether the client asked to keep the connection open after this request.
    pub fn is_persistent(&self) -> bool {
        is_persistent(self.version(), self.headers())
    }

    /// Whether the client waits for `100 Continue` before sending the body.
    pub fn expects_continue(&self) -> bool {
        self.headers().get(EXPECT).is_some_and(|value| value.as_bytes().eq_ignore_ascii_case(b"100-continue"))
    }

    /// The `Host` header, falling back to the authority of an absolute-form target.
    pub fn host(&self) -> Option<&str> {
        self.headers().get_str(HOST).or_else(|| self.uri().authority().map(|authority| authority.as_str()))
    }
}

/// HTTP/1.1 connections persist unless `Connection: close`,
/// HTTP/1.0 connections only with `Connection: keep-alive`.
pub fn is_persistent(version: Version, headers: &HeaderMap) -> bool {
    match version {
        Version::HTTP_11 => !headers.contains_token(CONNECTION, "close"),
        Version::HTTP_10 => headers.contains_token(CONNECTION, "keep-alive"),
        _ => false,
    }
}

/// Per-connection facts attached to every request as an extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub peer_addr: Option<SocketAddr>,
    pub local_addr: Option<SocketAddr>,
    pub is_tls: bool,
    pub persistent: bool,
}

impl From<Parts> for RequestHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(version: Version, connection: Option<&str>) -> RequestHeader {
        let mut builder = Request::builder().method(Method::GET).uri("/").version(version);
        if let Some(connection) = connection {
            builder = builder.header(CONNECTION, connection);
        }
        builder.body(()).unwrap().into()
    }

    #[test]
    fn persistence_http11() {
        assert!(header(Version::HTTP_11, None).is_persistent());
        assert!(header(Version::HTTP_11, Some("keep-alive")).is_persistent());
        assert!(!header(Version::HTTP_11, Some("close")).is_persistent());
        assert!(!header(Version::HTTP_11, Some("Upgrade, Close")).is_persistent());
    }

    #[test]
    fn persistence_http10() {
        assert!(!header(Version::HTTP_10, None).is_persistent());
        assert!(header(Version::HTTP_10, Some("Keep-Alive")).is_persistent());
    }

    #[test]
    fn expect_continue() {
        let header: RequestHeader =
            Request::builder().method(Method::POST).header(EXPECT, "100-Continue").body(()).unwrap().into();
        assert!(header.expects_continue());
        assert!(header.need_body());
    }

    #[test]
    fn host_from_absolute_target() {
        let header: RequestHeader =
            Request::builder().method(Method::GET).uri("http://example.com:8080/a").body(()).unwrap().into();
        assert_eq!(header.host(), Some("example.com:8080"));
    }
}
