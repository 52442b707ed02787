//! Event-driven bot runtime.
//!
//! The bot accepts events over HTTP, resolves each one against a registry of
//! handlers frozen at startup, and writes the handler's response back to the
//! caller. Three components carry a request:
//!
//! - the transport listener binds the configured address and serves every
//!   connection on its own thread;
//! - the [`Dispatcher`] looks up the handler for the event's kind and runs it
//!   on a dispatcher-owned thread, serialising events that share a session;
//! - the [`HandlerRegistry`] maps kinds to handlers and never changes once
//!   bootstrap completes.
//!
//! Handlers either answer the request directly or acknowledge it and run in
//! the background. A handler that panics, fails, or exceeds the response
//! deadline yields a structured error response; the listener keeps serving.
//!
//! Bootstrap registers the built-in handlers (`ping`, `health`, `status`,
//! worker control, indicator analysis) before any [`Extensions`] supplied by
//! the embedder, so clashes surface as [`RegistryError::DuplicateKind`].

mod bootstrap;
pub mod dispatch;
mod event;
pub mod handlers;
mod health;
mod process;
mod registry;
mod telemetry;
mod transport;

pub use bootstrap::{
    Bot, BootstrapError, ConfigLoader, Extensions, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with,
};
pub use dispatch::{CancellationToken, DispatchError, Dispatcher, Response, Status};
pub use event::{Event, UNKNOWN_SOURCE};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, LaunchPlan, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_bot,
    run_bot_with,
};
pub use registry::{
    FnHandler, Guard, Handler, HandlerContext, HandlerError, HandlerMode, HandlerRegistry,
    Registration, RegistryBuilder, RegistryError, handler_fn,
};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{ListenerError, RequestError};

#[cfg(test)]
mod tests;
