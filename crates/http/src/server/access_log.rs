use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use http::{Method, StatusCode, Version};
use tracing::{info, warn};

/// One finished request/response exchange.
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub peer_addr: Option<SocketAddr>,
    pub method: Method,
    pub target: String,
    pub version: Version,
    pub host: Option<String>,
    pub status: StatusCode,
    /// Body bytes written, before any transfer coding.
    pub bytes_sent: u64,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub elapsed: Duration,
}

impl AccessLogEntry {
    /// Common Log Format, extended with referer and user agent.
    pub fn to_log_line(&self, date: &str) -> String {
        let peer = self.peer_addr.map_or_else(|| "-".to_owned(), |addr| addr.ip().to_string());
        format!(
            "{peer} - - [{date}] \"{} {} {:?}\" {} {} \"{}\" \"{}\"",
            self.method,
            self.target,
            self.version,
            self.status.as_u16(),
            self.bytes_sent,
            self.referer.as_deref().unwrap_or("-"),
            self.user_agent.as_deref().unwrap_or("-"),
        )
    }
}

pub trait AccessLogger: Send + Sync {
    fn log(&self, entry: &AccessLogEntry);
}

/// Emits every entry as an `info` event on the `strand::access` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAccessLogger;

impl AccessLogger for TracingAccessLogger {
    fn log(&self, entry: &AccessLogEntry) {
        info!(
            target: "strand::access",
            peer = ?entry.peer_addr,
            method = %entry.method,
            uri = %entry.target,
            status = entry.status.as_u16(),
            bytes = entry.bytes_sent,
            elapsed_ms = entry.elapsed.as_millis() as u64,
            "request served"
        );
    }
}

/// Writes log lines to any `io::Write`, one line per entry.
///
/// Connections log concurrently, the lock is held while the line is formatted
/// and written so lines never interleave.
#[derive(Debug)]
pub struct WriterAccessLogger<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterAccessLogger<W> {
    pub fn new(writer: W) -> Self {
        Self { writer: Mutex::new(writer) }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> AccessLogger for WriterAccessLogger<W> {
    fn log(&self, entry: &AccessLogEntry) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let date = crate::date::http_date();
        let line = entry.to_log_line(date.to_str().unwrap_or("-"));
        if let Err(e) = writeln!(writer, "{line}").and_then(|_| writer.flush()) {
            warn!(cause = %e, "failed to write access log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> AccessLogEntry {
        AccessLogEntry {
            peer_addr: Some("10.0.0.7:41000".parse().unwrap()),
            method: Method::GET,
            target: "/index.html".to_owned(),
            version: Version::HTTP_11,
            host: Some("example.com".to_owned()),
            status: StatusCode::OK,
            bytes_sent: 512,
            referer: None,
            user_agent: Some("curl/8.0".to_owned()),
            elapsed: Duration::from_millis(3),
        }
    }

    #[test]
    fn log_line() {
        let line = entry().to_log_line("Sun, 06 Nov 1994 08:49:37 GMT");
        assert_eq!(
            line,
            "10.0.0.7 - - [Sun, 06 Nov 1994 08:49:37 GMT] \"GET /index.html HTTP/1.1\" 200 512 \"-\" \"curl/8.0\""
        );
    }

    #[test]
    fn writer_logger() {
        let logger = WriterAccessLogger::new(Vec::new());
        logger.log(&entry());
        logger.log(&entry());

        let text = String::from_utf8(logger.into_inner()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().all(|line| line.starts_with("10.0.0.7 - - [") && line.contains("\" 200 512 ")));
    }
}
