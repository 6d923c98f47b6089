//! `Set-Cookie` serialization.

use std::fmt::Write;
use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters left as-is when URL encoding a cookie value.
const COOKIE_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CookieEncoding {
    /// Percent-encode the value.
    #[default]
    Url,
    /// Write the value verbatim, it must not contain `;` or `"`.
    Raw,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookie {
    value: String,
    encoding: CookieEncoding,
    domain: Option<String>,
    path: Option<String>,
    expires: Option<String>,
    max_age: Option<Duration>,
    secure: bool,
    http_only: bool,
}

impl Cookie {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self { value: value.into(), ..Default::default() }
    }

    /// # Panics
    /// When `value` contains `;` or `"`.
    pub fn raw<S: Into<String>>(value: S) -> Self {
        let value = value.into();
        assert!(!value.contains([';', '"']), "raw cookie values must not contain ';' or '\"'");
        Self { value, encoding: CookieEncoding::Raw, ..Default::default() }
    }

    pub fn with_domain<S: Into<String>>(mut self, domain: S) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_path<S: Into<String>>(mut self, path: S) -> Self {
        self.path = Some(path.into());
        self
    }

    /// `expires` is an HTTP date, written as given.
    pub fn with_expires<S: Into<String>>(mut self, expires: S) -> Self {
        self.expires = Some(expires.into());
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn encoding(&self) -> CookieEncoding {
        self.encoding
    }

    /// Renders `name=value[; Domain=..][; Path=..][; Expires=..][; Max-Age=N][; Secure][; HttpOnly]`.
    pub fn to_header_value(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len() + self.value.len() + 16);
        out.push_str(name);
        out.push('=');
        match self.encoding {
            CookieEncoding::Url => out.extend(utf8_percent_encode(&self.value, COOKIE_VALUE)),
            CookieEncoding::Raw => out.push_str(&self.value),
        }
        if let Some(domain) = &self.domain {
            let _ = write!(out, "; Domain={domain}");
        }
        if let Some(path) = &self.path {
            let _ = write!(out, "; Path={path}");
        }
        if let Some(expires) = &self.expires {
            let _ = write!(out, "; Expires={expires}");
        }
        if let Some(max_age) = self.max_age {
            let _ = write!(out, "; Max-Age={}", max_age.as_secs());
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        out
    }
}
