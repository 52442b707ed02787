//! Handler abstraction invoked by the dispatcher.

use serde_json::Value;
use thiserror::Error;

use crate::dispatch::CancellationToken;
use crate::event::Event;

/// How the dispatcher treats a handler's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandlerMode {
    /// The caller waits for the handler's value.
    #[default]
    RequestResponse,
    /// The caller is answered with an acknowledgement before the handler runs.
    FireAndForget,
}

/// Per-invocation context passed to handlers.
#[derive(Debug, Clone, Default)]
pub struct HandlerContext {
    cancellation: CancellationToken,
}

impl HandlerContext {
    /// Builds a context observing `cancellation`.
    #[must_use]
    pub const fn new(cancellation: CancellationToken) -> Self {
        Self { cancellation }
    }

    /// Returns `true` once the caller has stopped waiting for the result.
    ///
    /// Long-running handlers should poll this and return early.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Token shared with the dispatcher.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// Failure reported by a handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandlerError {
    /// The event payload did not match what the handler expects.
    #[error("invalid payload: {message}")]
    InvalidPayload {
        /// Human-readable reason.
        message: String,
    },
    /// The handler could not complete its work.
    #[error("handler failed: {message}")]
    Failed {
        /// Human-readable reason.
        message: String,
    },
    /// The handler panicked; the dispatcher contained the panic.
    #[error("handler panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },
    /// The handler observed cancellation and stopped early.
    #[error("handler cancelled")]
    Cancelled,
}

impl HandlerError {
    /// Creates an invalid payload error.
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    /// Creates a generic failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Creates a contained-panic error.
    pub fn panicked(message: impl Into<String>) -> Self {
        Self::Panicked {
            message: message.into(),
        }
    }
}

/// Behaviour bound to one event kind.
///
/// Handlers run on dispatcher-owned threads, possibly concurrently with other
/// invocations of the same handler, so implementations must be `Send + Sync`
/// and guard any shared state themselves.
#[cfg_attr(test, mockall::automock)]
pub trait Handler: Send + Sync {
    /// Dispatch mode for this handler.
    fn mode(&self) -> HandlerMode {
        HandlerMode::RequestResponse
    }

    /// Processes `event` and produces the response body.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when the payload is unusable or the work fails.
    fn handle(&self, event: &Event, context: &HandlerContext) -> Result<Value, HandlerError>;
}

/// Adapts a closure into a [`Handler`].
pub struct FnHandler<F> {
    mode: HandlerMode,
    function: F,
}

impl<F> FnHandler<F> {
    /// Switches the handler to fire-and-forget dispatch.
    #[must_use]
    pub const fn fire_and_forget(mut self) -> Self {
        self.mode = HandlerMode::FireAndForget;
        self
    }
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(&Event, &HandlerContext) -> Result<Value, HandlerError> + Send + Sync,
{
    fn mode(&self) -> HandlerMode {
        self.mode
    }

    fn handle(&self, event: &Event, context: &HandlerContext) -> Result<Value, HandlerError> {
        (self.function)(event, context)
    }
}

/// Wraps `function` as a request-response handler.
pub const fn handler_fn<F>(function: F) -> FnHandler<F>
where
    F: Fn(&Event, &HandlerContext) -> Result<Value, HandlerError> + Send + Sync,
{
    FnHandler {
        mode: HandlerMode::RequestResponse,
        function,
    }
}
