//! HTTP body handling.
//!
//! - [`ReqBody`]: the consumer side of a request body, implementing `http_body::Body`
//! - [`ReqBodySender`]: the producer side, reading the payload off the connection
//! - [`ResponseBody`]: the body handlers answer with
//!
//! The request body is streamed rather than buffered. The connection drives
//! the handler and the [`ReqBodySender`] concurrently and drains whatever the
//! handler left unread, so a keep-alive connection always resumes at a message
//! boundary.

mod req_body;
mod response_body;

pub use req_body::ReqBody;
pub use req_body::ReqBodySender;
pub use response_body::ResponseBody;
