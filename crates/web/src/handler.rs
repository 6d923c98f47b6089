use async_trait::async_trait;
use http::Request;
use strand_http::handler::{BoxError, Handler, HandlerResult};
use strand_http::protocol::body::ReqBody;

use crate::responder::Responder;

/// An async function used as a [`Handler`].
#[derive(Debug)]
pub struct FnHandler<F> {
    f: F,
}

/// Wraps an async function whose result is a [`Responder`]; a result that
/// produces no response declines the request.
///
/// ```
/// use http::Request;
/// use strand_http::handler::BoxError;
/// use strand_http::protocol::body::ReqBody;
/// use strand_web::{RequestExt, UrlRouter, handler_fn};
///
/// async fn greet(req: Request<ReqBody>) -> Result<Option<String>, BoxError> {
///     Ok(req.path_param("name").map(|name| format!("hello {name}")))
/// }
///
/// let router = UrlRouter::new().get("/greet/:name", handler_fn(greet)).unwrap();
/// # drop(router);
/// ```
pub fn handler_fn<F, Fut, R, E>(f: F) -> FnHandler<F>
where
    F: Fn(Request<ReqBody>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, E>> + Send,
    R: Responder,
    E: Into<BoxError>,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut, R, E> Handler for FnHandler<F>
where
    F: Fn(Request<ReqBody>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, E>> + Send,
    R: Responder,
    E: Into<BoxError>,
{
    async fn call(&self, req: Request<ReqBody>) -> HandlerResult {
        match (self.f)(req).await {
            Ok(responder) => Ok(responder.into_response()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};
    use strand_http::protocol::HttpStatusError;

    fn assert_is_handler<T: Handler>(_handler: &T) {
        // no op
    }

    async fn declines(_req: Request<ReqBody>) -> Result<(), BoxError> {
        Ok(())
    }

    async fn by_method(req: Request<ReqBody>) -> Result<StatusCode, HttpStatusError> {
        match *req.method() {
            Method::GET => Ok(StatusCode::NO_CONTENT),
            _ => Err(HttpStatusError::from_status(StatusCode::METHOD_NOT_ALLOWED)),
        }
    }

    #[test]
    fn async_fns_are_handlers() {
        assert_is_handler(&handler_fn(declines));
        assert_is_handler(&handler_fn(by_method));
    }

    #[tokio::test]
    async fn results_are_converted() {
        assert!(handler_fn(declines).call(Request::new(ReqBody::empty())).await.unwrap().is_none());

        let handler = handler_fn(by_method);
        let response = handler.call(Request::new(ReqBody::empty())).await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let request = Request::post("/").body(ReqBody::empty()).unwrap();
        let err = handler.call(request).await.unwrap_err();
        assert_eq!(HttpStatusError::find(err.as_ref()).map(HttpStatusError::status), Some(StatusCode::METHOD_NOT_ALLOWED));
    }
}
