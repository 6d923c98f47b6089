use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use http::header::{CONNECTION, CONTENT_LENGTH, DATE, REFERER, SERVER, USER_AGENT};
use http::{HeaderValue, Method, Response, StatusCode, Uri, Version};
use http_body::Body;
use http_body_util::BodyExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::select;
use tokio::time::Instant;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, warn};

use crate::codec::{RequestDecoder, ResponseEncoder, encode_interim};
use crate::compression::{Compressor, ContentCoding};
use crate::date::http_date;
use crate::io::{TimeoutReader, Upgraded};
use crate::protocol::body::{ReqBody, ResponseBody};
use crate::protocol::{
    ConnectionInfo, HeaderMapExt, HttpError, HttpStatusError, KEEP_ALIVE, KeepAlive, Message, OnUpgrade, ParseError, PayloadItem,
    PayloadSize, RequestHeader, ResponseHead, SendError, UpgradeCallback,
};
use crate::server::{AccessLogEntry, DefaultErrorPage, ErrorInfo, ErrorPageHandler, ServerSettings, VirtualHostSelector};

/// A server side HTTP/1.x connection.
///
/// [`process`](HttpConnection::process) serves requests one after another
/// until the peer closes the connection, a response can't be followed by
/// another one, or a protocol switch hands the stream over.
///
/// Every request goes through the same steps:
/// - read the head, bounded by the header size limit
/// - pick the virtual host from `Host`
/// - answer `Expect: 100-continue` before running the handler
/// - run the handler while streaming it the request body
/// - drain whatever body the handler left unread
/// - write the response, log it, decide whether to keep the connection
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<TimeoutReader<R>, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
    info: ConnectionInfo,
    idle_timeout: Option<Duration>,
}

impl<R, W> fmt::Debug for HttpConnection<R, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConnection").field("info", &self.info).field("idle_timeout", &self.idle_timeout).finish_non_exhaustive()
    }
}

/// What happens to the connection after a response.
enum Next {
    KeepAlive,
    Close,
    Upgrade(UpgradeCallback),
}

/// The parts of a request still needed after the handler consumed it.
struct RequestLine {
    method: Method,
    uri: Uri,
    version: Version,
    host: Option<String>,
    referer: Option<String>,
    user_agent: Option<String>,
}

impl RequestLine {
    fn new(header: &RequestHeader) -> Self {
        let headers = header.headers();
        Self {
            method: header.method().clone(),
            uri: header.uri().clone(),
            version: header.version(),
            host: header.host().map(str::to_owned),
            referer: headers.get_str(REFERER).map(str::to_owned),
            user_agent: headers.get_str(USER_AGENT).map(str::to_owned),
        }
    }
}

/// How a response is written.
struct ResponseMode<'a> {
    settings: &'a ServerSettings,
    version: Version,
    head_only: bool,
    keep_alive: bool,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// The head size limit and the idle timeout between requests come from
    /// `settings`, those of the default virtual host. The body limit and the
    /// timeout while serving a request follow the host the request names.
    pub fn new(reader: R, writer: W, info: ConnectionInfo, settings: &ServerSettings) -> Self {
        let decoder = RequestDecoder::with_limits(settings.max_request_header_size, None);
        let reader = TimeoutReader::new(reader, settings.keep_alive_timeout);
        Self {
            framed_read: FramedRead::with_capacity(reader, decoder, 8 * 1024),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
            info,
            idle_timeout: settings.keep_alive_timeout,
        }
    }

    pub async fn process(mut self, hosts: Arc<VirtualHostSelector>) -> Result<(), HttpError> {
        loop {
            let next = match self.framed_read.next().await {
                Some(Ok(Message::Header((header, payload_size)))) => {
                    self.do_process(header, payload_size, &hosts).await?
                }

                Some(Ok(Message::Payload(_))) => {
                    error!("received payload while waiting for a request head");
                    let error = HttpStatusError::bad_request("unexpected request body");
                    self.send_error(hosts.default_host().settings(), &error).await?;
                    return Err(ParseError::invalid_body("payload without request head").into());
                }

                Some(Err(e)) => {
                    if e.is_timeout() && self.framed_read.read_buffer().is_empty() {
                        debug!("idle connection timed out");
                        return Ok(());
                    }
                    if matches!(e, ParseError::Io { .. }) && !e.is_timeout() {
                        return Err(e.into());
                    }

                    warn!(cause = %e, "can't read request, answering and closing");
                    let error = HttpStatusError::from(e);
                    self.send_error(hosts.default_host().settings(), &error).await?;
                    return Ok(());
                }

                None => {
                    debug!("peer closed the connection");
                    return Ok(());
                }
            };

            match next {
                Next::KeepAlive => continue,
                Next::Close => {
                    if let Err(e) = self.framed_write.get_mut().shutdown().await {
                        debug!(cause = %e, "failed to shut down the connection");
                    }
                    return Ok(());
                }
                Next::Upgrade(callback) => {
                    info!("switching protocols, connection leaves HTTP");
                    callback(self.into_upgraded()).await;
                    return Ok(());
                }
            }
        }
    }

    async fn do_process(
        &mut self,
        mut header: RequestHeader,
        payload_size: PayloadSize,
        hosts: &VirtualHostSelector,
    ) -> Result<Next, HttpError> {
        let started = Instant::now();
        let request_line = RequestLine::new(&header);

        let vhost = match hosts.select(header.host(), header.version()) {
            Ok(vhost) => vhost,
            Err(error) => {
                warn!(cause = %error, "no virtual host for request");
                let settings = hosts.default_host().settings();
                let response = error_response(settings, &error, Some(&request_line));
                let mode = ResponseMode { settings, version: request_line.version, head_only: false, keep_alive: false };
                self.send_response(response, &mode).await?;
                return Ok(Next::Close);
            }
        };
        let settings = vhost.settings().as_ref();

        self.framed_read.get_mut().set_idle_timeout(settings.keep_alive_timeout);
        if let Err(e) = self.framed_read.decoder_mut().limit_current_body(settings.body_limit()) {
            warn!(cause = %e, "request body over the limit of its virtual host");
            let head_only = header.method() == Method::HEAD;
            let response = error_response(settings, &HttpStatusError::from(e), Some(&request_line));
            let status = response.status();
            let mode = ResponseMode { settings, version: request_line.version, head_only, keep_alive: false };
            let (bytes_sent, _) = self.send_response(response, &mode).await?;
            log_access(settings, &self.info, request_line, status, bytes_sent, started);
            return Ok(Next::Close);
        }

        if let Some(max_request_time) = settings.max_request_time {
            self.framed_read.get_mut().set_deadline(Some(started + max_request_time));
        }

        let persistent = header.is_persistent();
        let head_only = header.method() == Method::HEAD;

        if header.expects_continue() && !payload_size.is_empty() {
            let mut interim = BytesMut::with_capacity(32);
            encode_interim(header.version(), StatusCode::CONTINUE, &mut interim);
            let writer = self.framed_write.get_mut();
            writer.write_all(&interim).await.map_err(SendError::io)?;
            writer.flush().await.map_err(SendError::io)?;
            debug!("sent 100 continue");
        }

        header.as_mut().extensions_mut().insert(ConnectionInfo { persistent, ..self.info });

        let (req_body, mut body_sender) = ReqBody::body_channel(&mut self.framed_read, payload_size);
        let request = header.body(req_body);

        // the handler may wait for body chunks the sender is about to read,
        // both have to make progress until the handler is done
        let (handler_result, mut body_error) = {
            let handler = vhost.handler();
            tokio::pin! {
                let handler_future = handler.call(request);
                let body_sender_future = body_sender.send_body();
            }

            let mut body_done = false;
            let mut body_error = None;
            let result = loop {
                select! {
                    biased;
                    result = &mut handler_future => break result,
                    sent = &mut body_sender_future, if !body_done => {
                        body_done = true;
                        body_error = sent.err();
                    }
                }
            };
            (result, body_error)
        };

        if body_error.is_none()
            && let Err(e) = body_sender.skip_body().await
        {
            body_error = Some(e);
        }
        drop(body_sender);

        let mut keep_alive = persistent;
        let response = match (body_error, handler_result) {
            (Some(e), _) => {
                warn!(cause = %e, "failed to read request body");
                keep_alive = false;
                error_response(settings, &HttpStatusError::from(e), Some(&request_line))
            }
            (None, Ok(Some(response))) => response,
            (None, Ok(None)) => error_response(settings, &HttpStatusError::not_found(), Some(&request_line)),
            (None, Err(e)) => {
                let error = status_error_of(e.as_ref());
                if error.status().is_server_error() {
                    error!(cause = %e, method = %request_line.method, uri = %request_line.uri, "handler failed");
                } else {
                    debug!(cause = %e, status = error.status().as_u16(), "handler answered with an error status");
                }
                keep_alive &= !error.justifies_connection_close();
                error_response(settings, &error, Some(&request_line))
            }
        };

        let upgrade = (response.status() == StatusCode::SWITCHING_PROTOCOLS)
            .then(|| response.extensions().get::<OnUpgrade>().and_then(OnUpgrade::take))
            .flatten();

        let status = response.status();
        let mode = ResponseMode { settings, version: request_line.version, head_only, keep_alive };
        let (bytes_sent, keep_alive) = self.send_response(response, &mode).await?;

        self.framed_read.get_mut().set_deadline(None);
        self.framed_read.get_mut().set_idle_timeout(self.idle_timeout);
        log_access(settings, &self.info, request_line, status, bytes_sent, started);

        if let Some(callback) = upgrade {
            return Ok(Next::Upgrade(callback));
        }
        if status == StatusCode::SWITCHING_PROTOCOLS {
            warn!("switching protocols without an upgrade callback, closing");
            return Ok(Next::Close);
        }

        Ok(if keep_alive { Next::KeepAlive } else { Next::Close })
    }

    /// Answers a request that could not be read, the connection closes afterwards.
    async fn send_error(&mut self, settings: &ServerSettings, error: &HttpStatusError) -> Result<(), HttpError> {
        let response = error_response(settings, error, None);
        let mode = ResponseMode { settings, version: Version::HTTP_11, head_only: false, keep_alive: false };
        self.send_response(response, &mode).await?;
        Ok(())
    }

    /// Writes the response, returns the body bytes sent and whether the
    /// connection can carry another request.
    async fn send_response(
        &mut self,
        response: Response<ResponseBody>,
        mode: &ResponseMode<'_>,
    ) -> Result<(u64, bool), HttpError> {
        let (mut parts, mut body) = response.into_parts();
        let mut keep_alive = mode.keep_alive;
        let settings = mode.settings;

        let mut compressor = None;
        if settings.use_compression
            && !mode.head_only
            && parts.status != StatusCode::NO_CONTENT
            && parts.status != StatusCode::NOT_MODIFIED
            && let Some(coding @ (ContentCoding::Gzip | ContentCoding::Deflate)) = ContentCoding::from_headers(&parts.headers)
        {
            compressor = Compressor::new(coding);
            parts.headers.remove(CONTENT_LENGTH);
        }

        let payload_size = match body.size_hint().exact() {
            Some(0) if compressor.is_none() => PayloadSize::Empty,
            Some(length) if compressor.is_none() => PayloadSize::Length(length),
            _ if mode.version == Version::HTTP_10 => {
                keep_alive = false;
                PayloadSize::UntilClose
            }
            _ => PayloadSize::Chunked,
        };

        parts.version = if mode.version == Version::HTTP_10 { Version::HTTP_10 } else { Version::HTTP_11 };
        parts.headers.entry(DATE).or_insert_with(http_date);
        if !settings.server_string.is_empty()
            && !parts.headers.contains_key(SERVER)
            && let Ok(server) = HeaderValue::from_str(&settings.server_string)
        {
            parts.headers.insert(SERVER, server);
        }

        if parts.status != StatusCode::SWITCHING_PROTOCOLS {
            if !keep_alive {
                parts.headers.insert(CONNECTION, HeaderValue::from_static("close"));
            } else if mode.version == Version::HTTP_10 {
                parts.headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
                if let Some(timeout) = settings.keep_alive_timeout {
                    let keep_alive = KeepAlive { timeout: Some(timeout), max: None };
                    parts.headers.set(KEEP_ALIVE, &keep_alive.to_header_value());
                }
            }
        }

        self.framed_write.encoder_mut().set_head_only(mode.head_only);
        let head = ResponseHead::from_parts(parts, ());
        self.framed_write.feed(Message::<_, Bytes>::Header((head, payload_size))).await?;

        let mut bytes_sent = 0;
        if !mode.head_only && !payload_size.is_empty() {
            loop {
                let data = match body.frame().await {
                    Some(Ok(frame)) => match frame.into_data() {
                        Ok(data) => data,
                        // trailers are not forwarded
                        Err(_) => continue,
                    },
                    Some(Err(e)) => {
                        error!(cause = %e, "response body failed after the head was sent");
                        return Err(SendError::invalid_body(format!("response body failed: {e}")).into());
                    }
                    None => break,
                };

                bytes_sent += data.len() as u64;
                let data = match &mut compressor {
                    Some(compressor) => compressor.compress(&data).map_err(SendError::io)?,
                    None => data,
                };
                if !data.is_empty() {
                    self.framed_write.send(Message::Payload(PayloadItem::Chunk(data))).await?;
                }
            }

            if let Some(compressor) = compressor {
                let tail = compressor.finish().map_err(SendError::io)?;
                if !tail.is_empty() {
                    self.framed_write.feed(Message::Payload(PayloadItem::Chunk(tail))).await?;
                }
            }
            self.framed_write.feed(Message::Payload(PayloadItem::<Bytes>::Eof)).await?;
        }

        SinkExt::<Message<(ResponseHead, PayloadSize)>>::flush(&mut self.framed_write).await?;
        self.framed_write.encoder_mut().set_head_only(false);
        Ok((bytes_sent, keep_alive))
    }

    fn into_upgraded(self) -> Upgraded {
        let parts = self.framed_read.into_parts();
        let reader = parts.io.into_inner();
        let writer = self.framed_write.into_inner();
        Upgraded::new(parts.read_buf.freeze(), reader, writer)
    }
}

fn error_response(
    settings: &ServerSettings,
    error: &HttpStatusError,
    request: Option<&RequestLine>,
) -> Response<ResponseBody> {
    let info = ErrorInfo {
        status: error.status(),
        message: error.message(),
        method: request.map(|request| &request.method),
        path: request.map(|request| request.uri.path()),
    };
    let mut response = match &settings.error_page_handler {
        Some(handler) => handler.render(&info),
        None => DefaultErrorPage.render(&info),
    };
    *response.status_mut() = error.status();
    response
}

/// The status a failed handler answers with, `500` unless the error carries one.
fn status_error_of(error: &(dyn Error + 'static)) -> HttpStatusError {
    if let Some(status_error) = HttpStatusError::find(error) {
        return status_error.clone();
    }

    let mut current = Some(error);
    while let Some(e) = current {
        if let Some(parse_error) = e.downcast_ref::<ParseError>() {
            return HttpStatusError::new(parse_error.status(), parse_error.to_string());
        }
        current = e.source();
    }
    HttpStatusError::from_status(StatusCode::INTERNAL_SERVER_ERROR)
}

fn log_access(
    settings: &ServerSettings,
    info: &ConnectionInfo,
    request: RequestLine,
    status: StatusCode,
    bytes_sent: u64,
    started: Instant,
) {
    if settings.access_loggers.is_empty() {
        return;
    }

    let entry = AccessLogEntry {
        peer_addr: info.peer_addr,
        method: request.method,
        target: request.uri.to_string(),
        version: request.version,
        host: request.host,
        status,
        bytes_sent,
        referer: request.referer,
        user_agent: request.user_agent,
        elapsed: started.elapsed(),
    };
    for logger in &settings.access_loggers {
        logger.log(&entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{BoxError, Handler, HandlerResult, make_handler};
    use crate::server::{VirtualHost, WriterAccessLogger};
    use async_trait::async_trait;
    use http::Request;
    use tokio::io::{AsyncReadExt, DuplexStream};

    struct Echo;

    #[async_trait]
    impl Handler for Echo {
        async fn call(&self, req: Request<ReqBody>) -> HandlerResult {
            match req.uri().path() {
                "/missing" => Ok(None),
                "/too-large" => Err(Box::new(HttpStatusError::from_status(StatusCode::PAYLOAD_TOO_LARGE))),
                "/fail" => Err("boom".into()),
                "/ignore-body" => Ok(Some(Response::new(ResponseBody::from("ignored")))),
                _ => {
                    let body = req.into_body().collect().await?.to_bytes();
                    Ok(Some(Response::new(ResponseBody::from(body))))
                }
            }
        }
    }

    fn spawn_connection<H: Handler + 'static>(settings: ServerSettings, handler: H) -> DuplexStream {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let hosts = Arc::new(VirtualHostSelector::single(settings.clone(), handler));
        tokio::spawn(async move {
            let (reader, writer) = tokio::io::split(server);
            let connection = HttpConnection::new(reader, writer, ConnectionInfo::default(), &settings);
            let _ = connection.process(hosts).await;
        });
        client
    }

    async fn exchange(client: &mut DuplexStream, request: &str) -> String {
        client.write_all(request.as_bytes()).await.unwrap();
        let mut buf = vec![0u8; 16 * 1024];
        let n = client.read(&mut buf).await.unwrap();
        String::from_utf8_lossy(&buf[..n]).into_owned()
    }

    async fn read_to_end(client: &mut DuplexStream) -> String {
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn keep_alive_requests() {
        let mut client = spawn_connection(ServerSettings::new(), Echo);

        let first = exchange(&mut client, "POST /echo HTTP/1.1\r\nHost: a\r\nContent-Length: 5\r\n\r\nhello").await;
        assert!(first.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(first.contains("content-length: 5\r\n"));
        assert!(first.contains("server: strand\r\n"));
        assert!(first.contains("date: "));
        assert!(first.ends_with("\r\n\r\nhello"));

        let second = exchange(&mut client, "POST /echo HTTP/1.1\r\nHost: a\r\nContent-Length: 3\r\n\r\nabc").await;
        assert!(second.ends_with("\r\n\r\nabc"));
    }

    #[tokio::test]
    async fn implicit_not_found() {
        let mut client = spawn_connection(ServerSettings::new(), Echo);
        let response = exchange(&mut client, "GET /missing HTTP/1.1\r\nHost: a\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(response.ends_with("404 - Not Found\n\nNot Found\n"));
        assert!(!response.contains("connection: close"));
    }

    #[tokio::test]
    async fn status_error_closing_the_connection() {
        let mut client = spawn_connection(ServerSettings::new(), Echo);
        client.write_all(b"GET /too-large HTTP/1.1\r\nHost: a\r\n\r\n").await.unwrap();
        let response = read_to_end(&mut client).await;
        assert!(response.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
        assert!(response.contains("connection: close\r\n"));
    }

    #[tokio::test]
    async fn handler_failure_is_500() {
        let mut client = spawn_connection(ServerSettings::new(), Echo);
        let response = exchange(&mut client, "GET /fail HTTP/1.1\r\nHost: a\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(!response.contains("boom"));
    }

    #[tokio::test]
    async fn unread_body_is_drained() {
        let mut client = spawn_connection(ServerSettings::new(), Echo);
        let request = "POST /ignore-body HTTP/1.1\r\nHost: a\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nskip\r\n0\r\n\r\n";
        let first = exchange(&mut client, request).await;
        assert!(first.ends_with("ignored"));

        let second = exchange(&mut client, "POST /echo HTTP/1.1\r\nHost: a\r\nContent-Length: 2\r\n\r\nok").await;
        assert!(second.ends_with("\r\n\r\nok"));
    }

    #[tokio::test]
    async fn expect_continue() {
        let mut client = spawn_connection(ServerSettings::new(), Echo);
        let interim =
            exchange(&mut client, "PUT /echo HTTP/1.1\r\nHost: a\r\nExpect: 100-continue\r\nContent-Length: 4\r\n\r\n").await;
        assert_eq!(interim, "HTTP/1.1 100 Continue\r\n\r\n");

        let response = exchange(&mut client, "data").await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.ends_with("data"));
    }

    #[tokio::test]
    async fn head_request_has_no_body() {
        let mut client = spawn_connection(ServerSettings::new(), Echo);
        let response = exchange(&mut client, "HEAD /ignore-body HTTP/1.1\r\nHost: a\r\n\r\n").await;
        assert!(response.contains("content-length: 7\r\n"));
        assert!(response.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn http10_closes_by_default() {
        let mut client = spawn_connection(ServerSettings::new(), Echo);
        client.write_all(b"GET /ignore-body HTTP/1.0\r\n\r\n").await.unwrap();
        let response = read_to_end(&mut client).await;
        assert!(response.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(response.contains("connection: close\r\n"));
        assert!(response.ends_with("ignored"));
    }

    #[tokio::test]
    async fn http10_keep_alive() {
        let settings = ServerSettings::new().with_keep_alive_timeout(Some(Duration::from_secs(5)));
        let mut client = spawn_connection(settings, Echo);
        let response = exchange(&mut client, "GET /ignore-body HTTP/1.0\r\nConnection: keep-alive\r\n\r\n").await;
        assert!(response.contains("connection: keep-alive\r\n"));
        assert!(response.contains("keep-alive: timeout=5\r\n"));
    }

    #[tokio::test]
    async fn missing_host_on_http11() {
        let mut client = spawn_connection(ServerSettings::new(), Echo);
        client.write_all(b"GET /echo HTTP/1.1\r\n\r\n").await.unwrap();
        let response = read_to_end(&mut client).await;
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[tokio::test]
    async fn declared_body_over_limit() {
        let mut client = spawn_connection(ServerSettings::new().with_max_request_body_size(4), Echo);
        client.write_all(b"POST /echo HTTP/1.1\r\nHost: a\r\nContent-Length: 10\r\n\r\n0123456789").await.unwrap();
        let response = read_to_end(&mut client).await;
        assert!(response.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
    }

    #[tokio::test]
    async fn body_limit_of_the_named_host() {
        let (mut client, server) = tokio::io::duplex(64 * 1024);
        let default_host = ServerSettings::new().with_host_name("a");
        let mut hosts = VirtualHostSelector::single(default_host.clone(), Echo);
        hosts.push(VirtualHost::new(ServerSettings::new().with_host_name("b").with_max_request_body_size(4), Echo));
        let hosts = Arc::new(hosts);
        tokio::spawn(async move {
            let (reader, writer) = tokio::io::split(server);
            let _ = HttpConnection::new(reader, writer, ConnectionInfo::default(), &default_host).process(hosts).await;
        });

        let response = exchange(&mut client, "POST /echo HTTP/1.1\r\nHost: a\r\nContent-Length: 10\r\n\r\n0123456789").await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.ends_with("0123456789"));

        client.write_all(b"POST /echo HTTP/1.1\r\nHost: b\r\nContent-Length: 10\r\n\r\n0123456789").await.unwrap();
        let response = read_to_end(&mut client).await;
        assert!(response.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
        assert!(response.contains("connection: close\r\n"));
    }

    #[tokio::test]
    async fn malformed_request_line() {
        let mut client = spawn_connection(ServerSettings::new(), Echo);
        client.write_all(b"GET / HTTP/1.1\r\nbroken header\r\n\r\n").await.unwrap();
        let response = read_to_end(&mut client).await;
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[tokio::test]
    async fn unknown_method() {
        let mut client = spawn_connection(ServerSettings::new(), Echo);
        client.write_all(b"BREW /pot HTTP/1.1\r\nHost: a\r\n\r\n").await.unwrap();
        let response = read_to_end(&mut client).await;
        assert!(response.starts_with("HTTP/1.1 501 Not Implemented\r\n"));
    }

    #[tokio::test]
    async fn gzip_response() {
        async fn compressible(_req: Request<ReqBody>) -> Result<Response<String>, BoxError> {
            let mut response = Response::new("z".repeat(4096));
            response.headers_mut().insert(http::header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            Ok(response)
        }

        let mut client = spawn_connection(ServerSettings::new().with_compression(true), make_handler(compressible));
        client.write_all(b"GET / HTTP/1.1\r\nHost: a\r\nConnection: close\r\n\r\n").await.unwrap();
        let response = read_to_end(&mut client).await;
        assert!(response.contains("transfer-encoding: chunked\r\n"));
        assert!(!response.contains("content-length"));
        assert!(response.len() < 4096);
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn access_log_line() {
        let buf = SharedBuf::default();
        let settings = ServerSettings::new().with_access_logger(WriterAccessLogger::new(buf.clone()));

        let mut client = spawn_connection(settings, Echo);
        client.write_all(b"GET /ignore-body HTTP/1.1\r\nHost: a\r\nConnection: close\r\n\r\n").await.unwrap();
        let _ = read_to_end(&mut client).await;

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(text.contains("\"GET /ignore-body HTTP/1.1\" 200 7 "));
    }

    #[tokio::test]
    async fn upgrade_hands_over_the_stream() {
        async fn upgrade(_req: Request<ReqBody>) -> Result<Response<()>, BoxError> {
            let mut response = Response::new(());
            *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
            response.headers_mut().insert(CONNECTION, HeaderValue::from_static("upgrade"));
            response.extensions_mut().insert(OnUpgrade::new(|mut upgraded: Upgraded| async move {
                let mut buf = [0u8; 4];
                if upgraded.read_exact(&mut buf).await.is_ok() {
                    let _ = upgraded.write_all(&buf).await;
                    let _ = upgraded.flush().await;
                }
            }));
            Ok(response)
        }

        let mut client = spawn_connection(ServerSettings::new(), make_handler(upgrade));
        let head = exchange(&mut client, "GET /ws HTTP/1.1\r\nHost: a\r\nConnection: upgrade\r\n\r\n").await;
        assert!(head.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));

        client.write_all(b"ping").await.unwrap();
        let mut echo = [0u8; 4];
        client.read_exact(&mut echo).await.unwrap();
        assert_eq!(&echo, b"ping");
    }
}
