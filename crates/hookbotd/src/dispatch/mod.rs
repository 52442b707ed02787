//! Event dispatch onto registered handlers.
//!
//! The [`Dispatcher`] resolves each [`Event`](crate::Event) against the frozen
//! [`HandlerRegistry`](crate::HandlerRegistry) and runs the bound handler on a
//! dispatcher-owned thread:
//!
//! - events without a session each get their own thread, so slow handlers do
//!   not hold up unrelated requests;
//! - events that share a session are queued on a per-session lane and handled
//!   strictly in submission order.
//!
//! Handler panics are contained and surface as
//! [`Status::HandlerFailed`]. Callers that stop waiting cancel the
//! invocation through a [`CancellationToken`].

mod cancel;
mod dispatcher;
mod errors;
mod lanes;
mod response;

pub use self::cancel::CancellationToken;
pub use self::dispatcher::{Dispatcher, PendingResponse};
pub use self::errors::DispatchError;
pub use self::response::{Response, Status};

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
