//! Turning handler return values into responses.
//!
//! A [`Responder`] may produce no response at all: the router then tries the
//! next matching route, and when none answers the server replies
//! `404 Not Found`.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response, StatusCode};
use strand_http::protocol::body::ResponseBody;

pub trait Responder {
    fn into_response(self) -> Option<Response<ResponseBody>>;
}

impl<B> Responder for Response<B>
where
    B: Into<ResponseBody>,
{
    fn into_response(self) -> Option<Response<ResponseBody>> {
        Some(self.map(Into::into))
    }
}

/// `None` declines the request.
impl<T: Responder> Responder for Option<T> {
    fn into_response(self) -> Option<Response<ResponseBody>> {
        self.and_then(Responder::into_response)
    }
}

/// Declines the request.
impl Responder for () {
    fn into_response(self) -> Option<Response<ResponseBody>> {
        None
    }
}

/// An empty response with that status.
impl Responder for StatusCode {
    fn into_response(self) -> Option<Response<ResponseBody>> {
        let mut response = Response::new(ResponseBody::empty());
        *response.status_mut() = self;
        Some(response)
    }
}

impl<T: Responder> Responder for (StatusCode, T) {
    fn into_response(self) -> Option<Response<ResponseBody>> {
        let (status, responder) = self;
        let mut response = responder.into_response().unwrap_or_else(|| Response::new(ResponseBody::empty()));
        *response.status_mut() = status;
        Some(response)
    }
}

fn with_content_type(body: ResponseBody, content_type: &'static str) -> Option<Response<ResponseBody>> {
    let mut response = Response::new(body);
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    Some(response)
}

impl Responder for &'static str {
    fn into_response(self) -> Option<Response<ResponseBody>> {
        with_content_type(ResponseBody::from(self), "text/plain; charset=utf-8")
    }
}

impl Responder for String {
    fn into_response(self) -> Option<Response<ResponseBody>> {
        with_content_type(ResponseBody::from(self), "text/plain; charset=utf-8")
    }
}

impl Responder for Bytes {
    fn into_response(self) -> Option<Response<ResponseBody>> {
        with_content_type(ResponseBody::from(self), "application/octet-stream")
    }
}
