use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Method, Response, StatusCode};

use crate::protocol::body::ResponseBody;
use crate::protocol::reason_phrase;

/// What went wrong with a request, handed to an [`ErrorPageHandler`].
#[derive(Debug, Clone, Copy)]
pub struct ErrorInfo<'a> {
    pub status: StatusCode,
    pub message: &'a str,
    /// `None` when the request could not be parsed.
    pub method: Option<&'a Method>,
    pub path: Option<&'a str>,
}

/// Renders the response sent for a failed request.
///
/// The connection overrides the status with `info.status` and sets the framing
/// headers itself.
pub trait ErrorPageHandler: Send + Sync {
    fn render(&self, info: &ErrorInfo<'_>) -> Response<ResponseBody>;
}

/// Plain text page: the status line followed by the error message.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorPage;

impl ErrorPageHandler for DefaultErrorPage {
    fn render(&self, info: &ErrorInfo<'_>) -> Response<ResponseBody> {
        let mut text = format!("{} - {}\n", info.status.as_u16(), reason_phrase(info.status));
        if !info.message.is_empty() {
            text.push('\n');
            text.push_str(info.message);
            text.push('\n');
        }

        let mut response = Response::new(ResponseBody::from(text));
        *response.status_mut() = info.status;
        response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=UTF-8"));
        response
    }
}
