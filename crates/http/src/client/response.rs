use std::fmt;

use bytes::{Bytes, BytesMut};
use http::header::{CONNECTION, UPGRADE};
use http::{HeaderMap, Method, StatusCode, Version};
use tracing::trace;

use crate::client::{ClientError, HttpClient};
use crate::compression::Decompressor;
use crate::io::Upgraded;
use crate::protocol::{HeaderMapExt, KeepAlive, PayloadItem, PayloadSize, ResponseHead};

/// The response to a [`HttpClient::request`], its body still on the wire.
///
/// The body is read with [`body_chunk`](Self::body_chunk) or
/// [`read_all`](Self::read_all). Dropping the response before the body ended
/// leaves the rest for the client to drain before its next request.
pub struct ClientResponse<'c> {
    client: &'c mut HttpClient,
    head: ResponseHead,
    payload_size: PayloadSize,
    decompressor: Option<Decompressor>,
    finished: bool,
    switched: bool,
}

impl<'c> ClientResponse<'c> {
    pub(crate) fn new(
        client: &'c mut HttpClient,
        request_method: &Method,
        head: ResponseHead,
        payload_size: PayloadSize,
        decompressor: Option<Decompressor>,
    ) -> Self {
        let switched = head.status() == StatusCode::SWITCHING_PROTOCOLS
            || (request_method == Method::CONNECT && head.status().is_success());
        let finished = payload_size.is_empty();
        // a switched connection is handed out by `into_upgraded`, not reused
        if finished && !switched {
            client.response_finished();
        }
        Self { client, head, payload_size, decompressor, finished, switched }
    }

    pub fn status(&self) -> StatusCode {
        self.head.status()
    }

    pub fn version(&self) -> Version {
        self.head.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.head.headers()
    }

    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    pub fn payload_size(&self) -> PayloadSize {
        self.payload_size
    }

    /// The `Keep-Alive` parameters the server advertised.
    pub fn keep_alive(&self) -> Option<KeepAlive> {
        KeepAlive::from_headers(self.head.headers())
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The next piece of the body, decompressed; `None` once it ended.
    pub async fn body_chunk(&mut self) -> Result<Option<Bytes>, ClientError> {
        while !self.finished {
            match self.client.read_payload().await {
                Ok(PayloadItem::Chunk(bytes)) => {
                    let bytes = match &mut self.decompressor {
                        Some(decompressor) => decompressor.decompress(&bytes)?,
                        None => bytes,
                    };
                    if !bytes.is_empty() {
                        return Ok(Some(bytes));
                    }
                }
                Ok(PayloadItem::Eof) => {
                    self.finish();
                    if let Some(decompressor) = self.decompressor.take() {
                        let tail = decompressor.finish()?;
                        if !tail.is_empty() {
                            return Ok(Some(tail));
                        }
                    }
                }
                Err(e) => {
                    self.finished = true;
                    return Err(e);
                }
            }
        }
        Ok(None)
    }

    pub async fn read_all(mut self) -> Result<Bytes, ClientError> {
        let mut body = BytesMut::new();
        while let Some(bytes) = self.body_chunk().await? {
            body.extend_from_slice(&bytes);
        }
        Ok(body.freeze())
    }

    /// Reads the body to its end and throws it away.
    pub async fn drop_body(mut self) -> Result<(), ClientError> {
        self.decompressor = None;
        while !self.finished {
            match self.client.read_payload().await {
                Ok(PayloadItem::Chunk(_)) => {}
                Ok(PayloadItem::Eof) => self.finish(),
                Err(e) => {
                    self.finished = true;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Checks the server switched to `protocol` and hands out the connection.
    pub fn switch_protocol(self, protocol: &str) -> Result<Upgraded, ClientError> {
        let switched = self.status() == StatusCode::SWITCHING_PROTOCOLS
            && self.headers().contains_token(CONNECTION, "upgrade")
            && self.headers().contains_token(UPGRADE, protocol);
        if !switched {
            return Err(ClientError::NotUpgraded { status: self.status() });
        }
        self.into_upgraded()
    }

    /// The raw connection after `101 Switching Protocols` or an accepted `CONNECT`.
    ///
    /// The client is left disconnected.
    pub fn into_upgraded(mut self) -> Result<Upgraded, ClientError> {
        if !self.switched {
            return Err(ClientError::NotUpgraded { status: self.status() });
        }
        self.finished = true;
        trace!(status = %self.status(), "connection switched protocols");
        self.client.take_upgraded()
    }

    fn finish(&mut self) {
        self.finished = true;
        self.client.response_finished();
    }
}

impl Drop for ClientResponse<'_> {
    fn drop(&mut self) {
        if self.switched {
            self.client.disconnect();
        } else if !self.finished {
            self.client.mark_unfinished();
        }
    }
}

impl fmt::Debug for ClientResponse<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientResponse")
            .field("status", &self.head.status())
            .field("version", &self.head.version())
            .field("payload_size", &self.payload_size)
            .field("finished", &self.finished)
            .finish()
    }
}
