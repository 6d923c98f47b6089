use std::fmt;
use std::io;

use bytes::Bytes;
use futures::Stream;
use futures::stream::BoxStream;
use http::header::IntoHeaderName;
use http::{HeaderMap, HeaderValue, Method, Version};

use crate::protocol::PayloadSize;

/// The body of an outgoing request.
///
/// `Bytes` bodies are sent with `Content-Length` and can be replayed,
/// streams are sent chunked and only once.
#[derive(Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Bytes(Bytes),
    Stream(BoxStream<'static, io::Result<Bytes>>),
}

impl RequestBody {
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self::Stream(Box::pin(stream))
    }

    pub fn is_replayable(&self) -> bool {
        !matches!(self, Self::Stream(_))
    }

    pub(crate) fn payload_size(&self) -> PayloadSize {
        match self {
            Self::Empty => PayloadSize::Empty,
            Self::Bytes(bytes) => PayloadSize::new_length(bytes.len() as u64),
            Self::Stream(_) => PayloadSize::Chunked,
        }
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("RequestBody::Empty"),
            Self::Bytes(bytes) => f.debug_tuple("RequestBody::Bytes").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("RequestBody::Stream"),
        }
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        if bytes.is_empty() { Self::Empty } else { Self::Bytes(bytes) }
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        Bytes::from(text).into()
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes::from(bytes).into()
    }
}

impl From<&'static str> for RequestBody {
    fn from(text: &'static str) -> Self {
        Bytes::from_static(text.as_bytes()).into()
    }
}

/// A request to send with [`HttpClient::request`](crate::client::HttpClient::request).
///
/// The target is in origin form (`/path?query`). `Host`, `User-Agent`,
/// `Accept-Encoding` and the framing headers are filled in by the client
/// unless set here.
#[derive(Debug)]
pub struct ClientRequest {
    method: Method,
    target: String,
    version: Version,
    headers: HeaderMap,
    body: RequestBody,
}

impl ClientRequest {
    pub fn new<S: Into<String>>(method: Method, target: S) -> Self {
        Self { method, target: target.into(), version: Version::HTTP_11, headers: HeaderMap::new(), body: RequestBody::Empty }
    }

    pub fn get<S: Into<String>>(target: S) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn head<S: Into<String>>(target: S) -> Self {
        Self::new(Method::HEAD, target)
    }

    pub fn post<S: Into<String>>(target: S) -> Self {
        Self::new(Method::POST, target)
    }

    pub fn put<S: Into<String>>(target: S) -> Self {
        Self::new(Method::PUT, target)
    }

    pub fn delete<S: Into<String>>(target: S) -> Self {
        Self::new(Method::DELETE, target)
    }

    pub fn with_header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body<B: Into<RequestBody>>(mut self, body: B) -> Self {
        self.body = body.into();
        self
    }

    /// Only `HTTP/1.0` and `HTTP/1.1` are sent.
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = if version == Version::HTTP_10 { Version::HTTP_10 } else { Version::HTTP_11 };
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn set_target<S: Into<String>>(&mut self, target: S) {
        self.target = target.into();
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub(crate) fn into_parts(self) -> (Method, String, Version, HeaderMap, RequestBody) {
        (self.method, self.target, self.version, self.headers, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;

    #[test]
    fn builder() {
        let request = ClientRequest::post("/items")
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body("{}");

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.target(), "/items");
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(request.body().payload_size(), PayloadSize::Length(2));
        assert!(request.body().is_replayable());
    }

    #[test]
    fn stream_bodies_are_chunked() {
        let body = RequestBody::stream(futures::stream::iter(vec![Ok(Bytes::from_static(b"a"))]));
        assert_eq!(body.payload_size(), PayloadSize::Chunked);
        assert!(!body.is_replayable());
        assert_eq!(RequestBody::from("").payload_size(), PayloadSize::Empty);
    }
}
