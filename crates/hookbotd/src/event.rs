//! Inbound events routed through the dispatcher.
//!
//! An [`Event`] is built by the transport layer from one accepted request and
//! is immutable once it has been handed to the dispatcher.

use serde_json::Value;
use time::OffsetDateTime;

/// Source label used when neither the request nor the peer identify a sender.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// A single unit of work delivered to the bot.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    kind: String,
    payload: Value,
    source: String,
    session: Option<String>,
    received_at: OffsetDateTime,
}

impl Event {
    /// Builds an event of `kind` with the given payload, stamped with the
    /// current UTC time and an unknown source.
    #[must_use]
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            source: UNKNOWN_SOURCE.to_owned(),
            session: None,
            received_at: OffsetDateTime::now_utc(),
        }
    }

    /// Records who sent the event.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Attaches a session identifier. Blank identifiers are ignored so that an
    /// empty header does not serialise unrelated requests.
    #[must_use]
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        let session = session.into();
        let trimmed = session.trim();
        self.session = (!trimmed.is_empty()).then(|| trimmed.to_owned());
        self
    }

    /// Event kind used for handler lookup.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Structured payload supplied by the sender.
    #[must_use]
    pub const fn payload(&self) -> &Value {
        &self.payload
    }

    /// Sender identity.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Session identifier, if the sender supplied one.
    #[must_use]
    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// Time the listener accepted the request.
    #[must_use]
    pub const fn received_at(&self) -> OffsetDateTime {
        self.received_at
    }
}
