//! Minimal HTTP/1.1 framing for the bot endpoint.
//!
//! One request is read per connection and one response is written before the
//! connection is closed. Bodies must be framed with `Content-Length`.

mod request;
mod response;
mod route;

pub(crate) use self::request::{HttpRequest, read_request};
pub(crate) use self::response::HttpResponse;
pub(crate) use self::route::event_from_request;
