use std::time::Duration;

use http::{HeaderMap, header::HeaderName};

use crate::protocol::HeaderMapExt;

/// `Keep-Alive` header name, not part of the `http` crate constants.
pub const KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");

/// The parameters of a `Keep-Alive: timeout=N, max=M` header.
///
/// `max` is reported to callers only, the engine never enforces it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeepAlive {
    pub timeout: Option<Duration>,
    pub max: Option<u32>,
}

impl KeepAlive {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers.get_str(KEEP_ALIVE).map(Self::parse)
    }

    /// Unknown or malformed parameters are skipped.
    pub fn parse(value: &str) -> Self {
        let mut keep_alive = KeepAlive::default();
        for param in value.split(',') {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"');
            match key.trim().to_ascii_lowercase().as_str() {
                "timeout" => keep_alive.timeout = value.parse::<u64>().ok().map(Duration::from_secs),
                "max" => keep_alive.max = value.parse().ok(),
                _ => {}
            }
        }
        keep_alive
    }

    pub fn to_header_value(&self) -> String {
        match (self.timeout, self.max) {
            (Some(timeout), Some(max)) => format!("timeout={}, max={max}", timeout.as_secs()),
            (Some(timeout), None) => format!("timeout={}", timeout.as_secs()),
            (None, Some(max)) => format!("max={max}"),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_timeout_and_max() {
        let keep_alive = KeepAlive::parse("timeout=5, max=100");
        assert_eq!(keep_alive.timeout, Some(Duration::from_secs(5)));
        assert_eq!(keep_alive.max, Some(100));
    }

    #[test]
    fn parse_is_lenient() {
        let keep_alive = KeepAlive::parse("Timeout = 60,foo,max=abc");
        assert_eq!(keep_alive.timeout, Some(Duration::from_secs(60)));
        assert_eq!(keep_alive.max, None);
    }

    #[test]
    fn render() {
        let keep_alive = KeepAlive { timeout: Some(Duration::from_secs(10)), max: None };
        assert_eq!(keep_alive.to_header_value(), "timeout=10");
    }
}
