//! Dispatcher responses and their status vocabulary.

use serde::Serialize;
use serde_json::{Value, json};

use crate::registry::HandlerError;

use super::errors::DispatchError;

/// Outcome class of a dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The handler produced a value.
    Ok,
    /// The event was queued for a fire-and-forget handler.
    Accepted,
    /// No handler is bound to the kind, or its guard rejected the event.
    NoHandler,
    /// The request or payload was unusable.
    BadRequest,
    /// The handler failed or panicked.
    HandlerFailed,
    /// The response was not ready in time.
    Timeout,
    /// The caller cancelled before the handler ran.
    Cancelled,
    /// The dispatcher could not schedule the event.
    Unavailable,
}

impl Status {
    /// HTTP status code used when the response is written to a client.
    #[must_use]
    pub const fn http_code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Accepted => 202,
            Self::BadRequest => 400,
            Self::NoHandler => 404,
            Self::Cancelled => 499,
            Self::HandlerFailed => 500,
            Self::Unavailable => 503,
            Self::Timeout => 504,
        }
    }

    /// Returns `true` for [`Status::Ok`] and [`Status::Accepted`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Ok | Self::Accepted)
    }
}

/// Result handed back to whoever submitted an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Response {
    /// The handler ran (or could not run) and this is its outcome.
    Synchronous {
        /// Outcome class.
        status: Status,
        /// Body returned by the handler or describing the failure.
        body: Value,
    },
    /// The event was accepted for a fire-and-forget handler.
    Asynchronous {
        /// Kind of the accepted event.
        kind: String,
        /// Session the event was queued on, if any.
        session: Option<String>,
    },
}

impl Response {
    /// Successful response carrying `body`.
    #[must_use]
    pub const fn ok(body: Value) -> Self {
        Self::Synchronous {
            status: Status::Ok,
            body,
        }
    }

    /// Acknowledgement for a fire-and-forget event.
    #[must_use]
    pub fn accepted(kind: impl Into<String>, session: Option<&str>) -> Self {
        Self::Asynchronous {
            kind: kind.into(),
            session: session.map(str::to_owned),
        }
    }

    /// Response for a kind with no usable binding.
    #[must_use]
    pub fn no_handler(kind: &str) -> Self {
        failure(
            Status::NoHandler,
            kind,
            format!("no handler registered for kind '{kind}'"),
        )
    }

    /// Response for a request that could not be turned into an event.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Synchronous {
            status: Status::BadRequest,
            body: json!({ "ok": false, "error": message.into() }),
        }
    }

    /// Maps a dispatch failure onto a response.
    #[must_use]
    pub fn from_error(error: &DispatchError) -> Self {
        match error {
            DispatchError::Handler { kind, source } => {
                let status = match source {
                    HandlerError::InvalidPayload { .. } => Status::BadRequest,
                    HandlerError::Cancelled => Status::Cancelled,
                    HandlerError::Failed { .. } | HandlerError::Panicked { .. } => {
                        Status::HandlerFailed
                    }
                };
                failure(status, kind, source.to_string())
            }
            DispatchError::ClientDisconnected { kind } => {
                failure(Status::Cancelled, kind, error.to_string())
            }
            DispatchError::Timeout { kind, .. } => {
                failure(Status::Timeout, kind, error.to_string())
            }
            DispatchError::Spawn { kind, .. } => {
                failure(Status::Unavailable, kind, error.to_string())
            }
            DispatchError::Abandoned { kind } => {
                failure(Status::HandlerFailed, kind, error.to_string())
            }
            DispatchError::Internal { .. } => Self::Synchronous {
                status: Status::HandlerFailed,
                body: json!({ "ok": false, "error": error.to_string() }),
            },
        }
    }

    /// Outcome class of the response.
    #[must_use]
    pub const fn status(&self) -> Status {
        match self {
            Self::Synchronous { status, .. } => *status,
            Self::Asynchronous { .. } => Status::Accepted,
        }
    }

    /// Body to send to the client.
    #[must_use]
    pub fn body(&self) -> Value {
        match self {
            Self::Synchronous { body, .. } => body.clone(),
            Self::Asynchronous { kind, session } => json!({
                "ok": true,
                "accepted": kind,
                "session": session,
            }),
        }
    }
}

fn failure(status: Status, kind: &str, message: String) -> Response {
    Response::Synchronous {
        status,
        body: json!({ "ok": false, "kind": kind, "error": message }),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(HandlerError::invalid_payload("missing closes"), Status::BadRequest)]
    #[case(HandlerError::failed("exchange down"), Status::HandlerFailed)]
    #[case(HandlerError::panicked("boom"), Status::HandlerFailed)]
    fn handler_errors_map_to_statuses(#[case] source: HandlerError, #[case] expected: Status) {
        let response = Response::from_error(&DispatchError::handler("analyze", source));
        assert_eq!(response.status(), expected);
        assert_eq!(response.body()["kind"], "analyze");
    }

    #[test]
    fn timeouts_map_to_gateway_timeout() {
        let error = DispatchError::timeout("slow", Duration::from_millis(250));
        let response = Response::from_error(&error);
        assert_eq!(response.status(), Status::Timeout);
        assert_eq!(response.status().http_code(), 504);
        assert_eq!(response.body()["error"], "no response for 'slow' within 250ms");
    }

    #[test]
    fn asynchronous_responses_report_accepted() {
        let response = Response::accepted("snapshot", Some("s-1"));
        assert_eq!(response.status(), Status::Accepted);
        assert_eq!(
            response.body(),
            json!({ "ok": true, "accepted": "snapshot", "session": "s-1" })
        );
    }

    #[test]
    fn no_handler_names_the_kind() {
        let response = Response::no_handler("unknown");
        assert_eq!(response.status().http_code(), 404);
        assert_eq!(
            response.body()["error"],
            "no handler registered for kind 'unknown'"
        );
    }
}
