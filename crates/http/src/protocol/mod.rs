//! Protocol types shared by the server and the client.
//!
//! - **Messages** ([`Message`], [`PayloadItem`], [`PayloadSize`]): what the codecs emit,
//!   a head followed by payload chunks
//! - **Requests** ([`RequestHeader`], [`ConnectionInfo`]): the parsed request head and the
//!   per-connection metadata the server attaches to every request
//! - **Responses** ([`ResponseHead`], [`ReasonPhrase`]): the response head before a body is
//!   attached, with an optional custom reason phrase
//! - **Headers** ([`HeaderMapExt`], [`KeepAlive`], [`Cookie`], [`EntityTag`]): header helpers
//! - **Bodies** ([`body`]): streaming request bodies and handler response bodies
//! - **Errors** ([`HttpError`], [`ParseError`], [`SendError`], [`HttpStatusError`])
//!
//! Codec and connection code work on these types, applications mostly see them through
//! `http::Request` and `http::Response` extensions.

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod method;
pub use method::HttpMethod;

mod request;
pub use request::ConnectionInfo;
pub use request::RequestHeader;
pub use request::is_persistent;

mod response;
pub use response::ReasonPhrase;
pub use response::ResponseHead;
pub use response::reason_phrase;

mod header;
pub use header::HeaderMapExt;

mod keep_alive;
pub use keep_alive::KEEP_ALIVE;
pub use keep_alive::KeepAlive;

mod cookie;
pub use cookie::Cookie;
pub use cookie::CookieEncoding;

mod validators;
pub use validators::EntityTag;
pub use validators::matches_if_none_match;

mod upgrade;
pub use upgrade::OnUpgrade;
pub use upgrade::UpgradeCallback;

mod error;
pub use error::HttpError;
pub use error::HttpStatusError;
pub use error::ParseError;
pub use error::SendError;
pub use error::justifies_connection_close;

pub mod body;
