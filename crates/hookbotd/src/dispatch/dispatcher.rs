//! Routes events to their handlers and collects responses.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::event::Event;
use crate::health::HealthReporter;
use crate::registry::{Handler, HandlerContext, HandlerError, HandlerMode, HandlerRegistry};

use super::DISPATCH_TARGET;
use super::cancel::CancellationToken;
use super::errors::DispatchError;
use super::lanes::SessionLanes;
use super::response::Response;

/// Routes events through the frozen registry onto execution lanes.
///
/// The dispatcher is shared by every connection thread. Lookups never block
/// on each other; handlers for distinct sessions run concurrently while
/// events that share a session run in submission order.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    lanes: SessionLanes,
    reporter: Arc<dyn HealthReporter>,
}

impl Dispatcher {
    /// Builds a dispatcher over `registry`. Session lanes retire after
    /// `session_idle` without work.
    #[must_use]
    pub fn new(
        registry: Arc<HandlerRegistry>,
        session_idle: Duration,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        Self {
            registry,
            lanes: SessionLanes::new(session_idle),
            reporter,
        }
    }

    /// Caps the number of live session lanes. Events for a new session beyond
    /// the cap resolve as unavailable until a lane retires.
    #[must_use]
    pub fn with_lane_limit(mut self, max_lanes: usize) -> Self {
        self.lanes = SessionLanes::with_limit(self.lanes.idle(), max_lanes);
        self
    }

    /// Registry consulted for lookups.
    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Dispatches `event` and blocks until its response is available.
    #[must_use]
    pub fn dispatch(&self, event: Event) -> Response {
        self.submit(event, CancellationToken::new()).wait()
    }

    /// Schedules `event` and returns a handle to its eventual response.
    ///
    /// Unknown kinds and guard rejections resolve immediately without invoking
    /// any handler. Fire-and-forget handlers resolve immediately with an
    /// acknowledgement. Request-response handlers observe `cancellation`
    /// through their [`HandlerContext`]; if it is already set when the handler
    /// is due to run, the invocation is skipped.
    pub fn submit(&self, event: Event, cancellation: CancellationToken) -> PendingResponse {
        let kind = event.kind().to_owned();
        let Some(registration) = self.registry.resolve(&kind) else {
            debug!(target: DISPATCH_TARGET, kind, "no handler registered");
            return PendingResponse::ready(kind, Response::no_handler(event.kind()));
        };
        if !registration.accepts(&event) {
            debug!(
                target: DISPATCH_TARGET,
                kind,
                source = event.source(),
                "handler guard rejected event"
            );
            return PendingResponse::ready(kind, Response::no_handler(event.kind()));
        }

        let handler = Arc::clone(registration.handler());
        match registration.mode() {
            HandlerMode::FireAndForget => self.submit_detached(kind, event, handler),
            HandlerMode::RequestResponse => {
                self.submit_awaited(kind, event, handler, cancellation)
            }
        }
    }

    fn submit_detached(
        &self,
        kind: String,
        event: Event,
        handler: Arc<dyn Handler>,
    ) -> PendingResponse {
        let response = Response::accepted(kind.clone(), event.session());
        let session = event.session().map(str::to_owned);
        let reporter = Arc::clone(&self.reporter);
        let job_kind = kind.clone();
        let job = Box::new(move || {
            let context = HandlerContext::default();
            if let Err(source) = invoke(handler.as_ref(), &event, &context) {
                let error = DispatchError::handler(job_kind, source);
                reporter.handler_failed(&error);
            }
        });
        match self.lanes.submit(session.as_deref(), job) {
            Ok(()) => PendingResponse::ready(kind, response),
            Err(source) => self.unschedulable(kind, source),
        }
    }

    fn submit_awaited(
        &self,
        kind: String,
        event: Event,
        handler: Arc<dyn Handler>,
        cancellation: CancellationToken,
    ) -> PendingResponse {
        let (sender, receiver) = mpsc::channel();
        let session = event.session().map(str::to_owned);
        let reporter = Arc::clone(&self.reporter);
        let job_kind = kind.clone();
        let job_cancellation = cancellation.clone();
        let job = Box::new(move || {
            let outcome = if job_cancellation.is_cancelled() {
                Err(DispatchError::client_disconnected(job_kind))
            } else {
                let context = HandlerContext::new(job_cancellation);
                invoke(handler.as_ref(), &event, &context)
                    .map_err(|source| DispatchError::handler(job_kind, source))
            };
            match &outcome {
                Err(error @ DispatchError::ClientDisconnected { .. }) => {
                    debug!(target: DISPATCH_TARGET, %error, "skipped cancelled invocation");
                }
                Err(error) => reporter.handler_failed(error),
                Ok(_) => {}
            }
            // The receiver is gone when the caller timed out or disconnected.
            if sender.send(outcome).is_err() {
                debug!(target: DISPATCH_TARGET, "response discarded; caller gone");
            }
        });
        match self.lanes.submit(session.as_deref(), job) {
            Ok(()) => PendingResponse {
                kind,
                state: Some(PendingState::Waiting {
                    receiver,
                    cancellation,
                }),
            },
            Err(source) => self.unschedulable(kind, source),
        }
    }

    fn unschedulable(&self, kind: String, source: std::io::Error) -> PendingResponse {
        let error = DispatchError::spawn(kind.clone(), source);
        self.reporter.handler_failed(&error);
        PendingResponse::ready(kind, Response::from_error(&error))
    }
}

type Outcome = Result<Value, DispatchError>;

enum PendingState {
    Ready(Response),
    Waiting {
        receiver: Receiver<Outcome>,
        cancellation: CancellationToken,
    },
}

/// Handle to a response that may still be in progress.
pub struct PendingResponse {
    kind: String,
    state: Option<PendingState>,
}

impl PendingResponse {
    fn ready(kind: String, response: Response) -> Self {
        Self {
            kind,
            state: Some(PendingState::Ready(response)),
        }
    }

    /// Kind of the event this handle belongs to.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Blocks until the response is available.
    #[must_use]
    pub fn wait(mut self) -> Response {
        match self.state.take() {
            Some(PendingState::Ready(response)) => response,
            Some(PendingState::Waiting { receiver, .. }) => match receiver.recv() {
                Ok(outcome) => into_response(outcome),
                Err(_) => Response::from_error(&DispatchError::Abandoned {
                    kind: self.kind.clone(),
                }),
            },
            None => Response::from_error(&DispatchError::internal("response already taken")),
        }
    }

    /// Waits up to `slice` for the response.
    ///
    /// Returns `None` while the handler is still running. Once a response has
    /// been returned, later calls return `None`.
    pub fn poll(&mut self, slice: Duration) -> Option<Response> {
        match self.state.take()? {
            PendingState::Ready(response) => Some(response),
            PendingState::Waiting {
                receiver,
                cancellation,
            } => match receiver.recv_timeout(slice) {
                Ok(outcome) => Some(into_response(outcome)),
                Err(RecvTimeoutError::Timeout) => {
                    self.state = Some(PendingState::Waiting {
                        receiver,
                        cancellation,
                    });
                    None
                }
                Err(RecvTimeoutError::Disconnected) => {
                    Some(Response::from_error(&DispatchError::Abandoned {
                        kind: self.kind.clone(),
                    }))
                }
            },
        }
    }

    /// Stops waiting and signals the handler that its result is unwanted.
    pub fn cancel(&mut self) {
        if let Some(PendingState::Waiting { cancellation, .. }) = self.state.take() {
            cancellation.cancel();
        }
    }
}

fn into_response(outcome: Outcome) -> Response {
    match outcome {
        Ok(body) => Response::ok(body),
        Err(error) => Response::from_error(&error),
    }
}

/// Invokes `handler`, converting a panic into [`HandlerError::Panicked`].
fn invoke(
    handler: &dyn Handler,
    event: &Event,
    context: &HandlerContext,
) -> Result<Value, HandlerError> {
    match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(event, context))) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(
                target: DISPATCH_TARGET,
                kind = event.kind(),
                panic = %message,
                "handler panicked"
            );
            Err(HandlerError::panicked(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
