//! Error types for event dispatch failures.
//!
//! Each variant maps to one way a dispatched event can fail to produce a
//! normal handler response, and carries the event kind so that logs and
//! client-facing bodies identify the request.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::registry::HandlerError;

/// Errors surfaced while dispatching an event.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The bound handler reported a failure or panicked.
    #[error("handler for '{kind}' failed: {source}")]
    Handler {
        /// Kind of the failed event.
        kind: String,
        /// Failure reported by the handler.
        #[source]
        source: HandlerError,
    },

    /// The caller went away before the response was ready.
    #[error("client disconnected before the '{kind}' response was ready")]
    ClientDisconnected {
        /// Kind of the abandoned event.
        kind: String,
    },

    /// The response was not ready within the configured bound.
    #[error("no response for '{kind}' within {}ms", waited.as_millis())]
    Timeout {
        /// Kind of the event that timed out.
        kind: String,
        /// How long the caller waited.
        waited: Duration,
    },

    /// A worker thread could not be spawned for the event.
    #[error("failed to schedule '{kind}': {source}")]
    Spawn {
        /// Kind of the event that could not be scheduled.
        kind: String,
        /// Error from the thread builder or the lane limit.
        #[source]
        source: io::Error,
    },

    /// The handler thread exited without delivering a result.
    #[error("handler for '{kind}' exited without a result")]
    Abandoned {
        /// Kind of the abandoned event.
        kind: String,
    },

    /// Internal state became unusable (for example, a poisoned lock).
    #[error("internal error: {message}")]
    Internal {
        /// Description of the broken state.
        message: String,
    },
}

impl DispatchError {
    /// Creates a handler failure error.
    pub fn handler(kind: impl Into<String>, source: HandlerError) -> Self {
        Self::Handler {
            kind: kind.into(),
            source,
        }
    }

    /// Creates a client disconnected error.
    pub fn client_disconnected(kind: impl Into<String>) -> Self {
        Self::ClientDisconnected { kind: kind.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(kind: impl Into<String>, waited: Duration) -> Self {
        Self::Timeout {
            kind: kind.into(),
            waited,
        }
    }

    /// Creates a spawn failure error.
    pub fn spawn(kind: impl Into<String>, source: io::Error) -> Self {
        Self::Spawn {
            kind: kind.into(),
            source,
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
