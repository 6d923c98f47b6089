//! HTTP response header handling implementation.
//!
//! It uses the standard `http::Response` type with an empty body placeholder
//! to represent response headers before the actual response body is attached.

use std::borrow::Cow;

use http::{Response, StatusCode};

/// Type alias for HTTP response headers.
pub type ResponseHead = Response<()>;

/// A custom reason phrase, stored in the response extensions.
///
/// Without it the phrase comes from [`reason_phrase`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonPhrase(pub Cow<'static, str>);

/// The default reason phrase of a status code.
///
/// Unregistered codes get the name of their class.
pub fn reason_phrase(status: StatusCode) -> &'static str {
    if let Some(reason) = status.canonical_reason() {
        return reason;
    }
    match status.as_u16() {
        100..=199 => "Information",
        200..=299 => "Success",
        300..=399 => "Redirect",
        400..=499 => "Client Error",
        _ => "Server Error",
    }
}
