//! Error types for listener and request handling.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// Errors surfaced while binding or running the listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to resolve TCP address {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("no TCP addresses resolved for {host}:{port}")]
    ResolveEmpty { host: String, port: u16 },
    #[error("failed to bind TCP listener at {addr}: {source}")]
    BindTcp {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        #[source]
        source: io::Error,
    },
    #[error("failed to spawn listener thread: {source}")]
    Spawn {
        #[source]
        source: io::Error,
    },
    #[error("listener thread panicked")]
    ThreadPanic,
}

/// Errors raised while reading a request or turning it into an event.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The request head could not be parsed as HTTP/1.x.
    #[error("malformed request: {message}")]
    Malformed {
        /// Parser diagnostic.
        message: String,
    },

    /// The peer closed the connection part-way through the request.
    #[error("connection closed before the request was complete")]
    Incomplete,

    /// The peer stopped sending before the request was complete.
    #[error("no request data received within {}ms", waited.as_millis())]
    TimedOut {
        /// Read timeout that expired.
        waited: Duration,
    },

    /// Head and body together exceed the configured cap.
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    TooLarge {
        /// Size declared or read so far.
        size: usize,
        /// Configured cap.
        max_size: usize,
    },

    /// The route does not accept the method.
    #[error("method {method} is not allowed for {path}")]
    MethodNotAllowed {
        /// Method the client sent.
        method: String,
        /// Path the method was sent to.
        path: String,
    },

    /// The body was not valid JSON, or the envelope lacked required fields.
    #[error("invalid event body: {message}")]
    InvalidBody {
        /// What was wrong with the body.
        message: String,
        /// JSON error, when the body failed to parse.
        #[source]
        source: Option<serde_json::Error>,
    },

    /// IO error while reading the request.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl RequestError {
    /// Creates a malformed request error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Creates an invalid body error from a serde error.
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::InvalidBody {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates an invalid body error with a custom message.
    pub fn invalid_body(message: impl Into<String>) -> Self {
        Self::InvalidBody {
            message: message.into(),
            source: None,
        }
    }

    /// HTTP status code reported to the client, or `None` when the
    /// connection is unusable and no response should be attempted.
    #[must_use]
    pub const fn http_code(&self) -> Option<u16> {
        match self {
            Self::Malformed { .. } | Self::Incomplete | Self::InvalidBody { .. } => Some(400),
            Self::TimedOut { .. } => Some(408),
            Self::MethodNotAllowed { .. } => Some(405),
            Self::TooLarge { .. } => Some(413),
            Self::Io(_) => None,
        }
    }
}
