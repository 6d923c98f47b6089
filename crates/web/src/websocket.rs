use std::sync::Arc;

use async_trait::async_trait;
use http::Request;
use strand_http::handler::{Handler, HandlerResult};
use strand_http::io::Upgraded;
use strand_http::protocol::body::ReqBody;
use strand_http::websocket::{WebSocket, upgrade_response};

use crate::request::clone_head;

/// Accepts websocket upgrades and hands every connection to a callback.
pub struct WebSocketHandler<F> {
    on_connect: Arc<F>,
}

/// A route handler upgrading requests to websockets; requests that are no
/// websocket upgrade are answered with `400 Bad Request`.
///
/// The callback gets the socket and the request head, path parameters included.
pub fn handle_websockets<F, Fut>(on_connect: F) -> WebSocketHandler<F>
where
    F: Fn(WebSocket<Upgraded>, Request<()>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    WebSocketHandler { on_connect: Arc::new(on_connect) }
}

#[async_trait]
impl<F, Fut> Handler for WebSocketHandler<F>
where
    F: Fn(WebSocket<Upgraded>, Request<()>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn call(&self, req: Request<ReqBody>) -> HandlerResult {
        let head = clone_head(&req);
        let on_connect = Arc::clone(&self.on_connect);
        let response = upgrade_response(&req, move |socket| on_connect(socket, head))?;
        Ok(Some(response))
    }
}

impl<F> std::fmt::Debug for WebSocketHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketHandler").finish_non_exhaustive()
    }
}
