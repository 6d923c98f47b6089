//! Dispatching requests by method and path.
//!
//! [`UrlRouter`] matches the raw request path against its route patterns (see
//! [`MatchTree`](crate::MatchTree) for the pattern syntax) and calls the
//! handlers of matching routes in registration order until one answers.
//! A `HEAD` request nobody answered is retried against the `GET` routes.

use async_trait::async_trait;
use http::{Method, Request};
use percent_encoding::percent_decode_str;
use strand_http::handler::{Handler, HandlerResult};
use strand_http::protocol::HttpStatusError;
use strand_http::protocol::body::ReqBody;
use tracing::{debug, trace};

use crate::request::clone_head;
use crate::{MatchTree, PathParams, RouteBuildError};

struct Route {
    /// `None` matches any method.
    method: Option<Method>,
    handler: Box<dyn Handler>,
}

/// A route matched by [`UrlRouter::at`].
pub struct RouteMatch<'r> {
    route: &'r Route,
    pattern: &'r str,
    params: PathParams,
}

impl<'r> RouteMatch<'r> {
    pub fn pattern(&self) -> &'r str {
        self.pattern
    }

    /// `None` for routes registered with [`UrlRouter::any`].
    pub fn method(&self) -> Option<&'r Method> {
        self.route.method.as_ref()
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn handler(&self) -> &'r dyn Handler {
        self.route.handler.as_ref()
    }
}

impl std::fmt::Debug for RouteMatch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteMatch")
            .field("pattern", &self.pattern)
            .field("method", &self.route.method)
            .field("params", &self.params)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct UrlRouter {
    prefix: String,
    tree: MatchTree<Route>,
}

macro_rules! method_route {
    ($name:ident, $method:expr) => {
        pub fn $name<H: Handler + 'static>(self, pattern: &str, handler: H) -> Result<Self, RouteBuildError> {
            self.route($method, pattern, handler)
        }
    };
}

impl UrlRouter {
    pub fn new() -> Self {
        Default::default()
    }

    /// A router serving only paths below `prefix`; patterns are matched
    /// against the rest of the path.
    pub fn with_prefix<S: Into<String>>(prefix: S) -> Self {
        Self { prefix: prefix.into(), tree: MatchTree::new() }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn route<H: Handler + 'static>(self, method: Method, pattern: &str, handler: H) -> Result<Self, RouteBuildError> {
        self.add(Some(method), pattern, Box::new(handler))
    }

    /// A route for every method.
    pub fn any<H: Handler + 'static>(self, pattern: &str, handler: H) -> Result<Self, RouteBuildError> {
        self.add(None, pattern, Box::new(handler))
    }

    method_route!(get, Method::GET);
    method_route!(post, Method::POST);
    method_route!(put, Method::PUT);
    method_route!(delete, Method::DELETE);
    method_route!(patch, Method::PATCH);
    method_route!(head, Method::HEAD);
    method_route!(options, Method::OPTIONS);

    fn add(mut self, method: Option<Method>, pattern: &str, handler: Box<dyn Handler>) -> Result<Self, RouteBuildError> {
        let index = self.tree.add_terminal(pattern, Route { method, handler })?;
        debug!(prefix = %self.prefix, pattern, index, "route added");
        Ok(self)
    }

    /// Builds the route automaton ahead of the first request.
    pub fn rebuild(&mut self) {
        self.tree.rebuild();
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Routes for `method` matching the raw `path`, in registration order.
    ///
    /// Fails when a placeholder value is not valid percent-encoded UTF-8.
    pub fn at(&self, method: &Method, path: &str) -> Result<Vec<RouteMatch<'_>>, HttpStatusError> {
        self.matching(path, |route| route.method.as_ref().is_none_or(|route_method| route_method == method))
    }

    fn matching<P>(&self, path: &str, accepts: P) -> Result<Vec<RouteMatch<'_>>, HttpStatusError>
    where
        P: Fn(&Route) -> bool,
    {
        let Some(path) = path.strip_prefix(self.prefix.as_str()) else {
            return Ok(Vec::new());
        };

        let mut found = Vec::new();
        self.tree.match_path(path, |index, vars| {
            if accepts(self.tree.terminal_data(index)) {
                found.push((index, vars.to_vec()));
            }
        });

        found
            .into_iter()
            .map(|(index, vars)| {
                let mut params = PathParams::empty();
                for (name, raw) in self.tree.terminal_var_names(index).iter().zip(vars) {
                    let value = percent_decode_str(raw)
                        .decode_utf8()
                        .map_err(|e| HttpStatusError::bad_request(format!("invalid encoding of path parameter `{name}`: {e}")))?;
                    params.push(name.clone(), value.into_owned());
                }
                Ok(RouteMatch { route: self.tree.terminal_data(index), pattern: self.tree.terminal_pattern(index), params })
            })
            .collect()
    }

    /// Calls each matched handler until one answers; only the first one gets
    /// the request body.
    async fn dispatch(&self, matches: Vec<RouteMatch<'_>>, head: &Request<()>, body: &mut Option<ReqBody>) -> HandlerResult {
        for matched in matches {
            trace!(pattern = matched.pattern, params = ?matched.params, "route matched");
            let mut request = clone_head(head).map(|()| body.take().unwrap_or_else(ReqBody::empty));
            request.extensions_mut().insert(matched.params);

            if let Some(response) = matched.route.handler.call(request).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl Handler for UrlRouter {
    async fn call(&self, req: Request<ReqBody>) -> HandlerResult {
        let (parts, body) = req.into_parts();
        let head = Request::from_parts(parts, ());
        let mut body = Some(body);

        let matches = self.at(head.method(), head.uri().path())?;
        if let Some(response) = self.dispatch(matches, &head, &mut body).await? {
            return Ok(Some(response));
        }

        if head.method() == Method::HEAD {
            let matches = self.matching(head.uri().path(), |route| route.method == Some(Method::GET))?;
            return self.dispatch(matches, &head, &mut body).await;
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RequestExt, handler_fn};
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::BodyExt;
    use strand_http::handler::BoxError;

    async fn read_user(req: Request<ReqBody>) -> Result<String, BoxError> {
        Ok(format!("user {}", req.path_param("name").unwrap_or_default()))
    }

    async fn create_user(req: Request<ReqBody>) -> Result<(StatusCode, Bytes), BoxError> {
        let body = req.into_body().collect().await?.to_bytes();
        Ok((StatusCode::CREATED, body))
    }

    async fn only_admin(req: Request<ReqBody>) -> Result<Option<&'static str>, BoxError> {
        Ok((req.path_param("name") == Some("admin")).then_some("the admin"))
    }

    async fn fallback(_req: Request<ReqBody>) -> Result<&'static str, BoxError> {
        Ok("fallback")
    }

    fn router() -> UrlRouter {
        UrlRouter::new()
            .get("/users/:name", handler_fn(only_admin))
            .and_then(|router| router.get("/users/:name", handler_fn(read_user)))
            .and_then(|router| router.post("/users/:name", handler_fn(create_user)))
            .and_then(|router| router.any("/*", handler_fn(fallback)))
            .unwrap()
    }

    async fn call(router: &UrlRouter, method: Method, path: &str, body: &'static str) -> Option<(StatusCode, String)> {
        let request = Request::builder().method(method).uri(path).body(ReqBody::full(body)).unwrap();
        let response = router.call(request).await.unwrap()?;
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        Some((status, String::from_utf8(body.to_vec()).unwrap()))
    }

    #[test]
    fn matches_in_registration_order() {
        let router = router();
        let matches = router.at(&Method::GET, "/users/alice").unwrap();
        assert_eq!(matches.iter().map(RouteMatch::pattern).collect::<Vec<_>>(), vec!["/users/:name", "/users/:name", "/*"]);
        assert_eq!(matches[0].params().get("name"), Some("alice"));
        assert_eq!(matches[2].method(), None);

        let matches = router.at(&Method::POST, "/users/alice").unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].method(), Some(&Method::POST));
    }

    #[tokio::test]
    async fn declined_requests_fall_through() {
        let router = router();
        assert_eq!(call(&router, Method::GET, "/users/admin", "").await, Some((StatusCode::OK, "the admin".to_owned())));
        assert_eq!(call(&router, Method::GET, "/users/bob", "").await, Some((StatusCode::OK, "user bob".to_owned())));
        assert_eq!(call(&router, Method::DELETE, "/users/bob", "").await, Some((StatusCode::OK, "fallback".to_owned())));
    }

    #[tokio::test]
    async fn body_goes_to_the_handler() {
        let router = router();
        assert_eq!(call(&router, Method::POST, "/users/bob", "payload").await, Some((StatusCode::CREATED, "payload".to_owned())));
    }

    #[tokio::test]
    async fn head_retries_as_get() {
        let router = UrlRouter::new().get("/users/:name", handler_fn(read_user)).unwrap();
        assert_eq!(call(&router, Method::HEAD, "/users/carol", "").await, Some((StatusCode::OK, "user carol".to_owned())));
        assert_eq!(call(&router, Method::PUT, "/users/carol", "").await, None);
    }

    #[tokio::test]
    async fn prefix_is_stripped() {
        let router = UrlRouter::with_prefix("/api").get("/users/:name", handler_fn(read_user)).unwrap();
        assert_eq!(call(&router, Method::GET, "/api/users/dave", "").await, Some((StatusCode::OK, "user dave".to_owned())));
        assert_eq!(call(&router, Method::GET, "/users/dave", "").await, None);
    }

    #[tokio::test]
    async fn params_are_percent_decoded() {
        let router = UrlRouter::new().get("/users/:name", handler_fn(read_user)).unwrap();
        assert_eq!(call(&router, Method::GET, "/users/j%C3%BCrgen%20k", "").await, Some((StatusCode::OK, "user jürgen k".to_owned())));

        let request = Request::get("/users/%FF").body(ReqBody::empty()).unwrap();
        let err = router.call(request).await.unwrap_err();
        assert_eq!(HttpStatusError::find(err.as_ref()).map(HttpStatusError::status), Some(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn invalid_patterns_fail_at_registration() {
        let err = UrlRouter::new().get("/files/*/meta", handler_fn(fallback)).unwrap_err();
        assert!(matches!(err, RouteBuildError::WildcardNotAtEnd { .. }));
    }
}
