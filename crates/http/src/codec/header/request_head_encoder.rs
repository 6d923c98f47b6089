use std::io::Write;

use bytes::BytesMut;
use http::header::CONTENT_LENGTH;
use http::{Method, Request, Version};
use tokio_util::codec::Encoder;

use super::{FastWrite, set_framing_headers, write_headers};
use crate::protocol::{PayloadSize, SendError};

/// Serializes a client request head.
///
/// The request target is written in the form the URI carries: absolute form
/// when it has a scheme (requests through a plain proxy), authority form for
/// `CONNECT`, origin form otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestHeadEncoder;

impl Encoder<(Request<()>, PayloadSize)> for RequestHeadEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (Request<()>, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, payload_size) = item;
        dst.reserve(1024);

        let uri = head.uri();
        let target = if head.method() == Method::CONNECT {
            uri.authority().map(|authority| authority.as_str()).unwrap_or_else(|| uri.path()).to_string()
        } else if uri.scheme().is_some() {
            uri.to_string()
        } else {
            uri.path_and_query().map_or("/", |path| path.as_str()).to_string()
        };
        let version = if head.version() == Version::HTTP_10 { "HTTP/1.0" } else { "HTTP/1.1" };
        write!(FastWrite(dst), "{} {target} {version}\r\n", head.method())?;

        let bodiless_method = matches!(*head.method(), Method::GET | Method::HEAD | Method::DELETE | Method::OPTIONS | Method::CONNECT | Method::TRACE);
        if payload_size.is_empty() && bodiless_method {
            head.headers_mut().remove(CONTENT_LENGTH);
        } else {
            set_framing_headers(head.headers_mut(), payload_size);
        }

        write_headers(head.headers(), dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::HOST;

    fn encode(request: Request<()>, payload_size: PayloadSize) -> String {
        let mut dst = BytesMut::new();
        RequestHeadEncoder.encode((request, payload_size), &mut dst).unwrap();
        String::from_utf8(dst.to_vec()).unwrap()
    }

    #[test]
    fn origin_form() {
        let request = Request::get("/search?q=rust").header(HOST, "example.com").body(()).unwrap();
        assert_eq!(encode(request, PayloadSize::Empty), "GET /search?q=rust HTTP/1.1\r\nhost: example.com\r\n\r\n");
    }

    #[test]
    fn absolute_form_through_proxy() {
        let request = Request::post("http://example.com:8080/submit").body(()).unwrap();
        assert_eq!(
            encode(request, PayloadSize::Chunked),
            "POST http://example.com:8080/submit HTTP/1.1\r\ntransfer-encoding: chunked\r\n\r\n"
        );
    }

    #[test]
    fn connect_uses_authority() {
        let request = Request::connect("example.com:443").body(()).unwrap();
        assert_eq!(encode(request, PayloadSize::Empty), "CONNECT example.com:443 HTTP/1.1\r\n\r\n");
    }

    #[test]
    fn empty_post_declares_zero_length() {
        let request = Request::post("/").body(()).unwrap();
        assert_eq!(encode(request, PayloadSize::Empty), "POST / HTTP/1.1\r\ncontent-length: 0\r\n\r\n");
    }
}
