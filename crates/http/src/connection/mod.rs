//! The server side of a connection.
//!
//! [`HttpConnection`] owns the two halves of an accepted stream and serves
//! requests on them until the connection can't be reused any more:
//!
//! ```text
//! await-request -> parsing -> dispatching -> finalizing -+-> await-request
//!                                                        +-> closed
//! ```
//!
//! A connection is kept when the request asked for it, no error forced a close
//! and the response could be framed without closing the stream.

mod http_connection;

pub use http_connection::HttpConnection;
