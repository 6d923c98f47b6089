//! `Date` header values.

use bytes::Bytes;
use http::HeaderValue;

/// The current time as an RFC 1123 date, `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date() -> HeaderValue {
    let mut buf = faf_http_date::get_date_buff_no_key();
    faf_http_date::get_date_no_key(&mut buf);
    HeaderValue::from_maybe_shared(Bytes::from_owner(buf))
        .unwrap_or_else(|_| HeaderValue::from_static("Thu, 01 Jan 1970 00:00:00 GMT"))
}
