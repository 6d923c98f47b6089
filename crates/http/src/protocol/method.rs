//! The request verbs understood by the engine.
//!
//! Besides the RFC 7231 methods, the WebDAV (RFC 4918) verbs and the
//! versioning extensions of RFC 3253 are accepted. Any other verb is rejected
//! while parsing the request line.

use std::fmt;
use std::str::FromStr;

use http::Method;

use crate::protocol::ParseError;

macro_rules! http_methods {
    ($($variant:ident => $name:literal,)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum HttpMethod {
            $($variant,)*
        }

        impl HttpMethod {
            pub const ALL: &'static [HttpMethod] = &[$(HttpMethod::$variant,)*];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(HttpMethod::$variant => $name,)*
                }
            }

            pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
                match bytes {
                    $(b if b == $name.as_bytes() => Some(HttpMethod::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

http_methods! {
    // RFC 7231
    Get => "GET",
    Head => "HEAD",
    Put => "PUT",
    Post => "POST",
    Patch => "PATCH",
    Delete => "DELETE",
    Options => "OPTIONS",
    Trace => "TRACE",
    Connect => "CONNECT",
    // WebDAV
    Copy => "COPY",
    Lock => "LOCK",
    Mkcol => "MKCOL",
    Move => "MOVE",
    Propfind => "PROPFIND",
    Proppatch => "PROPPATCH",
    Unlock => "UNLOCK",
    // versioning extensions
    VersionControl => "VERSION-CONTROL",
    Report => "REPORT",
    Checkout => "CHECKOUT",
    Checkin => "CHECKIN",
    Uncheckout => "UNCHECKOUT",
    Mkworkspace => "MKWORKSPACE",
    Update => "UPDATE",
    Label => "LABEL",
    Merge => "MERGE",
    BaselineControl => "BASELINE-CONTROL",
    Mkactivity => "MKACTIVITY",
    Orderpatch => "ORDERPATCH",
    Acl => "ACL",
}

impl HttpMethod {
    pub fn to_method(self) -> Method {
        match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Post => Method::POST,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Options => Method::OPTIONS,
            HttpMethod::Trace => Method::TRACE,
            HttpMethod::Connect => Method::CONNECT,
            // every name above is a valid token
            other => Method::from_bytes(other.as_str().as_bytes()).unwrap_or_default(),
        }
    }
}

impl FromStr for HttpMethod {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::from_bytes(s.as_bytes()).ok_or(ParseError::InvalidMethod)
    }
}

impl TryFrom<&Method> for HttpMethod {
    type Error = ParseError;

    fn try_from(method: &Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        method.to_method()
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
