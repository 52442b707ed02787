//! HTTP listener for inbound bot events.
//!
//! The transport module binds the configured TCP address, accepts connections
//! on a background thread, and hands each one to a [`ConnectionHandler`] on its
//! own thread.

mod connection;
mod errors;
mod handler;
mod http;
mod listener;
#[cfg(test)]
mod test_utils;

pub(crate) use self::connection::{ConnectionSettings, HttpConnectionHandler};
pub use self::errors::{ListenerError, RequestError};
pub(crate) use self::handler::{ConnectionHandler, ConnectionStream};
pub(crate) use self::listener::{ListenerHandle, SocketListener};
#[cfg(test)]
pub(crate) use self::test_utils::{CountingHandler, HttpReply, send_raw};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
