//! Url routing and server bootstrap on top of [`strand_http`].
//!
//! ```no_run
//! use http::Request;
//! use strand_http::handler::BoxError;
//! use strand_http::protocol::body::ReqBody;
//! use strand_web::{RequestExt, Server, UrlRouter, handler_fn};
//!
//! async fn groups(req: Request<ReqBody>) -> Result<String, BoxError> {
//!     let user = req.path_param("username").unwrap_or_default();
//!     let group = req.path_param("groupname").unwrap_or_default();
//!     Ok(format!("{user} is in {group}\n"))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), BoxError> {
//!     let router = UrlRouter::new().get("/users/:username/groups/:groupname", handler_fn(groups))?;
//!     Server::builder().address("127.0.0.1:8080").router(router).build()?.run().await?;
//!     Ok(())
//! }
//! ```

mod error;
mod handler;
mod match_tree;
mod request;
mod responder;
mod router;
mod server;
mod websocket;

pub use error::{RouteBuildError, ServerBuildError};
pub use handler::{FnHandler, handler_fn};
pub use match_tree::MatchTree;
pub use request::{PathParams, RequestExt};
pub use responder::Responder;
pub use router::{RouteMatch, UrlRouter};
pub use server::{Server, ServerBuilder};
pub use websocket::{WebSocketHandler, handle_websockets};
