//! Request handlers driven by the server connection.
//!
//! A [`Handler`] answers a request with `Ok(Some(response))`, declines it with
//! `Ok(None)` (the connection answers `404 Not Found`), or fails. A failure
//! carrying an [`HttpStatusError`](crate::protocol::HttpStatusError) becomes an
//! error page with that status, anything else becomes `500 Internal Server Error`.

use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use http::{Request, Response};

use crate::protocol::body::{ReqBody, ResponseBody};

pub type BoxError = Box<dyn Error + Send + Sync>;

pub type HandlerResult = Result<Option<Response<ResponseBody>>, BoxError>;

#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, req: Request<ReqBody>) -> HandlerResult;
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn call(&self, req: Request<ReqBody>) -> HandlerResult {
        (**self).call(req).await
    }
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Box<H> {
    async fn call(&self, req: Request<ReqBody>) -> HandlerResult {
        (**self).call(req).await
    }
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut, B, E> Handler for HandlerFn<F>
where
    F: Fn(Request<ReqBody>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response<B>, E>> + Send,
    B: Into<ResponseBody>,
    E: Into<BoxError>,
{
    async fn call(&self, req: Request<ReqBody>) -> HandlerResult {
        match (self.f)(req).await {
            Ok(response) => Ok(Some(response.map(Into::into))),
            Err(e) => Err(e.into()),
        }
    }
}

/// Turns an async function into a [`Handler`] that always answers.
pub fn make_handler<F, Fut, B, E>(f: F) -> HandlerFn<F>
where
    F: Fn(Request<ReqBody>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response<B>, E>> + Send,
    B: Into<ResponseBody>,
    E: Into<BoxError>,
{
    HandlerFn { f }
}
