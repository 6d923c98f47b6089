use base64ct::{Base64, Encoding as _};
use http::header::{CONNECTION, SEC_WEBSOCKET_ACCEPT, SEC_WEBSOCKET_KEY, SEC_WEBSOCKET_VERSION, UPGRADE};
use http::{HeaderValue, Method, Request, Response, StatusCode};
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::client::{ClientRequest, HttpClient};
use crate::io::Upgraded;
use crate::protocol::body::ResponseBody;
use crate::protocol::{HeaderMapExt, HttpStatusError, OnUpgrade};
use crate::websocket::{Role, WebSocket, WebSocketError};

const WEBSOCKET_GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// The `Sec-WebSocket-Accept` answer to a `Sec-WebSocket-Key`.
pub fn accept_key(key: &str) -> String {
    let mut sha1 = Sha1::new();
    sha1.update(key.trim().as_bytes());
    sha1.update(WEBSOCKET_GUID);
    Base64::encode_string(&sha1.finalize())
}

/// Whether `req` asks to switch to websocket version 13.
pub fn is_websocket_upgrade<B>(req: &Request<B>) -> bool {
    let headers = req.headers();
    req.method() == Method::GET
        && headers.contains_token(CONNECTION, "upgrade")
        && headers.contains_token(UPGRADE, "websocket")
        && headers.get_str(SEC_WEBSOCKET_VERSION).is_some_and(|version| version.trim() == "13")
        && headers.contains_key(SEC_WEBSOCKET_KEY)
}

/// Accepts a websocket upgrade; `on_connect` gets the socket once the `101`
/// went out.
pub fn upgrade_response<B, F, Fut>(req: &Request<B>, on_connect: F) -> Result<Response<ResponseBody>, HttpStatusError>
where
    F: FnOnce(WebSocket<Upgraded>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    if !is_websocket_upgrade(req) {
        return Err(HttpStatusError::bad_request("not a websocket upgrade request"));
    }
    let key = req.headers().get_str(SEC_WEBSOCKET_KEY).ok_or_else(|| HttpStatusError::bad_request("invalid Sec-WebSocket-Key"))?;
    let accept = HeaderValue::from_str(&accept_key(key)).map_err(|e| HttpStatusError::bad_request(format!("invalid Sec-WebSocket-Accept: {e}")))?;

    let mut response = Response::new(ResponseBody::empty());
    *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
    response.headers_mut().insert(CONNECTION, HeaderValue::from_static("Upgrade"));
    response.headers_mut().insert(UPGRADE, HeaderValue::from_static("websocket"));
    response.headers_mut().insert(SEC_WEBSOCKET_ACCEPT, accept);
    response.extensions_mut().insert(OnUpgrade::new(move |upgraded| on_connect(WebSocket::new(upgraded, Role::Server))));
    Ok(response)
}

/// Runs the client handshake for `path` on a connected client.
///
/// The client gives its connection up to the socket and is left disconnected.
pub async fn connect_websocket(client: &mut HttpClient, path: &str) -> Result<WebSocket<Upgraded>, WebSocketError> {
    let nonce: [u8; 16] = std::array::from_fn(|_| fastrand::u8(..));
    let key = Base64::encode_string(&nonce);

    let request = ClientRequest::get(path)
        .with_header(CONNECTION, HeaderValue::from_static("Upgrade"))
        .with_header(UPGRADE, HeaderValue::from_static("websocket"))
        .with_header(SEC_WEBSOCKET_VERSION, HeaderValue::from_static("13"))
        .with_header(SEC_WEBSOCKET_KEY, HeaderValue::from_str(&key).map_err(WebSocketError::handshake)?);

    let response = client.request(request).await?;
    if response.status() != StatusCode::SWITCHING_PROTOCOLS {
        let status = response.status();
        if let Err(e) = response.drop_body().await {
            debug!(cause = %e, "failed to read refused upgrade body");
        }
        return Err(WebSocketError::Refused { status });
    }
    if response.headers().get_str(SEC_WEBSOCKET_ACCEPT) != Some(accept_key(&key).as_str()) {
        return Err(WebSocketError::handshake("Sec-WebSocket-Accept does not match the key"));
    }

    let upgraded = response.switch_protocol("websocket")?;
    debug!(path, "websocket connected");
    Ok(WebSocket::new(upgraded, Role::Client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc_6455_sample_key() {
        assert_eq!(accept_key("dGhlIHNhbXBsZSBub25jZQ=="), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn detects_upgrade_requests() {
        let request = Request::get("/chat")
            .header(CONNECTION, "keep-alive, Upgrade")
            .header(UPGRADE, "websocket")
            .header(SEC_WEBSOCKET_VERSION, "13")
            .header(SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ==")
            .body(())
            .unwrap();
        assert!(is_websocket_upgrade(&request));

        let response = upgrade_response(&request, |_socket| async {}).unwrap();
        assert_eq!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
        assert_eq!(response.headers()[SEC_WEBSOCKET_ACCEPT], "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
        assert!(response.extensions().get::<OnUpgrade>().is_some());

        let plain = Request::get("/chat").body(()).unwrap();
        assert!(!is_websocket_upgrade(&plain));
        assert_eq!(upgrade_response(&plain, |_socket| async {}).unwrap_err().status(), StatusCode::BAD_REQUEST);
    }
}
