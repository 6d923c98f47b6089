use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;

use futures::channel::{mpsc, oneshot};
use futures::{FutureExt, SinkExt, Stream, StreamExt};

use http_body::{Body, Frame, SizeHint};
use tracing::{debug, error};

use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize};

/// ReqBody streams the body of a request received by the server.
///
/// The connection owns the byte stream, so the body is pulled through a
/// channel: every poll sends a oneshot sender to the [`ReqBodySender`], which
/// reads the next payload item from the connection and answers with it.
/// The handler and the sender are driven concurrently by the connection.
///
/// If the handler does not read the whole body, the sender drains the rest
/// once the handler is done so the next request on the connection starts at
/// a message boundary.
pub struct ReqBody {
    inner: Kind,
}

enum Kind {
    Channel {
        signal: mpsc::Sender<oneshot::Sender<Result<PayloadItem, ParseError>>>,
        receiving: Option<oneshot::Receiver<Result<PayloadItem, ParseError>>>,
        payload_size: PayloadSize,
        eof: bool,
    },
    Full(Option<Bytes>),
}

impl std::fmt::Debug for ReqBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            Kind::Channel { payload_size, eof, .. } => {
                f.debug_struct("ReqBody").field("payload_size", payload_size).field("eof", eof).finish()
            }
            Kind::Full(bytes) => f.debug_struct("ReqBody").field("full", bytes).finish(),
        }
    }
}

impl ReqBody {
    /// A body without content.
    pub fn empty() -> Self {
        Self { inner: Kind::Full(None) }
    }

    /// A body already held in memory.
    pub fn full<B: Into<Bytes>>(bytes: B) -> Self {
        let bytes = bytes.into();
        Self { inner: Kind::Full((!bytes.is_empty()).then_some(bytes)) }
    }

    /// Creates a body streaming channel pair for processing HTTP request bodies.
    ///
    /// The returned ReqBody implements `http_body::Body` and is handed to the request handler,
    /// while ReqBodySender reads from the underlying payload stream.
    pub fn body_channel<S>(payload_stream: &mut S, payload_size: PayloadSize) -> (ReqBody, ReqBodySender<'_, S>)
    where
        S: Stream + Unpin,
    {
        let (tx, receiver) = mpsc::channel(16);
        let eof = payload_size.is_empty();

        let req_body = ReqBody { inner: Kind::Channel { signal: tx, receiving: None, payload_size, eof } };
        let body_sender = ReqBodySender { payload_stream, receiver, eof };

        (req_body, body_sender)
    }
}

/// ReqBodySender feeds body chunks from the raw payload stream to a [`ReqBody`].
///
/// The EOF flag records whether the complete body has been read, which decides
/// whether the connection can be reused.
pub struct ReqBodySender<'conn, S>
where
    S: Stream + Unpin,
{
    payload_stream: &'conn mut S,
    receiver: mpsc::Receiver<oneshot::Sender<Result<PayloadItem, ParseError>>>,
    eof: bool,
}

impl<S: Stream + Unpin> std::fmt::Debug for ReqBodySender<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqBodySender").field("eof", &self.eof).finish_non_exhaustive()
    }
}

impl<T, S> ReqBodySender<'_, S>
where
    S: Stream<Item = Result<Message<T>, ParseError>> + Unpin,
{
    /// Streams body chunks from payload stream to the ReqBody consumer,
    /// until the body is complete, the consumer went away or reading failed.
    pub async fn send_body(&mut self) -> Result<(), ParseError> {
        loop {
            if self.eof {
                return Ok(());
            }

            let Some(sender) = self.receiver.next().await else {
                // the body has been dropped, what is left gets skipped later
                return Ok(());
            };

            match self.read_item().await {
                Ok(payload_item) => {
                    self.eof = payload_item.is_eof();
                    // the consumer may have given up waiting, the item is dropped then
                    let _ = sender.send(Ok(payload_item));
                }
                Err(e) => {
                    let reason = e.to_string();
                    let _ = sender.send(Err(e));
                    return Err(ParseError::invalid_body(reason));
                }
            }
        }
    }

    /// Drains any remaining body chunks from the payload stream.
    ///
    /// This keeps the connection at a message boundary when the handler didn't
    /// read the complete body.
    pub async fn skip_body(&mut self) -> Result<(), ParseError> {
        let mut size: usize = 0;
        while !self.eof {
            match self.read_item().await? {
                PayloadItem::Eof => self.eof = true,
                PayloadItem::Chunk(bytes) => size += bytes.len(),
            }
        }
        if size > 0 {
            debug!(size, "skipped unread request body");
        }
        Ok(())
    }

    /// Whether the payload has been read up to its end.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    async fn read_item(&mut self) -> Result<PayloadItem, ParseError> {
        match self.payload_stream.next().await {
            Some(Ok(Message::Payload(payload_item))) => Ok(payload_item),
            Some(Ok(Message::Header(_))) => {
                error!("received header while reading body");
                Err(ParseError::invalid_body("received header while reading body"))
            }
            Some(Err(e)) => Err(e),
            None => Err(ParseError::invalid_body("connection closed before the body was complete")),
        }
    }
}

impl Body for ReqBody {
    type Data = Bytes;
    type Error = ParseError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let (signal, receiving, eof) = match &mut self.get_mut().inner {
            Kind::Full(bytes) => return Poll::Ready(bytes.take().map(|bytes| Ok(Frame::data(bytes)))),
            Kind::Channel { signal, receiving, eof, .. } => (signal, receiving, eof),
        };

        loop {
            if *eof {
                return Poll::Ready(None);
            }

            if let Some(oneshot_receiver) = receiving {
                let result = ready!(oneshot_receiver.poll_unpin(cx));
                receiving.take();
                return match result {
                    Ok(Ok(PayloadItem::Chunk(bytes))) => Poll::Ready(Some(Ok(Frame::data(bytes)))),
                    Ok(Ok(PayloadItem::Eof)) => {
                        *eof = true;
                        Poll::Ready(None)
                    }
                    Ok(Err(e)) => {
                        *eof = true;
                        Poll::Ready(Some(Err(e)))
                    }
                    Err(_) => {
                        *eof = true;
                        Poll::Ready(Some(Err(ParseError::invalid_body("request body is no longer available"))))
                    }
                };
            }

            match ready!(signal.poll_ready_unpin(cx)) {
                Ok(()) => {
                    let (tx, rx) = oneshot::channel();
                    if let Err(e) = signal.start_send(tx) {
                        return Poll::Ready(Some(Err(ParseError::invalid_body(e))));
                    }
                    *receiving = Some(rx);
                }
                Err(e) => return Poll::Ready(Some(Err(ParseError::invalid_body(e)))),
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.inner {
            Kind::Channel { eof, .. } => *eof,
            Kind::Full(bytes) => bytes.is_none(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.inner {
            Kind::Channel { eof: true, .. } => SizeHint::with_exact(0),
            Kind::Channel { payload_size: PayloadSize::Length(length), .. } => SizeHint::with_exact(*length),
            Kind::Channel { payload_size: PayloadSize::Empty, .. } => SizeHint::with_exact(0),
            Kind::Channel { .. } => SizeHint::default(),
            Kind::Full(bytes) => SizeHint::with_exact(bytes.as_ref().map_or(0, |b| b.len() as u64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use http_body_util::BodyExt;

    type Item = Result<Message<()>, ParseError>;

    fn payload(items: Vec<Item>) -> impl Stream<Item = Item> + Unpin {
        stream::iter(items)
    }

    #[tokio::test]
    async fn stream_whole_body() {
        let mut source = payload(vec![
            Ok(Message::Payload(PayloadItem::Chunk(Bytes::from_static(b"hello ")))),
            Ok(Message::Payload(PayloadItem::Chunk(Bytes::from_static(b"world")))),
            Ok(Message::Payload(PayloadItem::Eof)),
        ]);
        let (body, mut sender) = ReqBody::body_channel(&mut source, PayloadSize::Length(11));
        assert_eq!(body.size_hint().exact(), Some(11));

        let (collected, sent) = tokio::join!(body.collect(), sender.send_body());
        sent.unwrap();
        assert_eq!(collected.unwrap().to_bytes(), Bytes::from_static(b"hello world"));
        assert!(sender.is_eof());
    }

    #[tokio::test]
    async fn skip_unread_body() {
        let mut source = payload(vec![
            Ok(Message::Payload(PayloadItem::Chunk(Bytes::from_static(b"unused")))),
            Ok(Message::Payload(PayloadItem::Eof)),
        ]);
        let (body, mut sender) = ReqBody::body_channel(&mut source, PayloadSize::Chunked);
        drop(body);
        sender.send_body().await.unwrap();
        assert!(!sender.is_eof());
        sender.skip_body().await.unwrap();
        assert!(sender.is_eof());
    }

    #[tokio::test]
    async fn premature_end_is_an_error() {
        let mut source = payload(vec![Ok(Message::Payload(PayloadItem::Chunk(Bytes::from_static(b"par"))))]);
        let (_body, mut sender) = ReqBody::body_channel(&mut source, PayloadSize::Length(10));
        assert!(matches!(sender.skip_body().await, Err(_)));
    }

    #[tokio::test]
    async fn empty_channel_body() {
        let mut source = payload(vec![]);
        let (body, sender) = ReqBody::body_channel(&mut source, PayloadSize::Empty);
        assert!(body.is_end_stream());
        assert!(sender.is_eof());
        assert!(body.collect().await.unwrap().to_bytes().is_empty());
    }

    #[tokio::test]
    async fn full_body() {
        let body = ReqBody::full("abc");
        assert_eq!(body.size_hint().exact(), Some(3));
        assert_eq!(body.collect().await.unwrap().to_bytes(), Bytes::from_static(b"abc"));
    }
}
