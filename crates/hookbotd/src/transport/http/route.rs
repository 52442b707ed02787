//! Maps HTTP requests onto events.
//!
//! `POST /events` carries a JSON envelope naming the kind explicitly. Any other
//! path names the kind directly (`/status` dispatches `status`, `/` dispatches
//! `root`) and the optional body becomes the payload.

use std::net::SocketAddr;

use serde::Deserialize;
use serde_json::Value;

use crate::event::{Event, UNKNOWN_SOURCE};

use super::super::RequestError;
use super::HttpRequest;

/// Path accepting JSON event envelopes.
const EVENTS_PATH: &str = "/events";
/// Kind dispatched for requests to `/`.
const ROOT_KIND: &str = "root";

const SOURCE_HEADER: &str = "x-bot-source";
const SESSION_HEADER: &str = "x-bot-session";

#[derive(Debug, Deserialize)]
struct Envelope {
    kind: String,
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    session: Option<String>,
}

/// Builds the event described by `request`.
pub(crate) fn event_from_request(
    request: &HttpRequest,
    peer: Option<SocketAddr>,
) -> Result<Event, RequestError> {
    let path = request.path();
    let (kind, payload, envelope_source, envelope_session) = if path == EVENTS_PATH {
        require_method(request, &["POST"])?;
        let envelope: Envelope =
            serde_json::from_slice(request.body()).map_err(RequestError::from_json_error)?;
        (
            envelope.kind,
            envelope.payload,
            envelope.source,
            envelope.session,
        )
    } else {
        require_method(request, &["GET", "POST"])?;
        (kind_for_path(path), body_payload(request.body())?, None, None)
    };

    let kind = kind.trim().to_owned();
    if kind.is_empty() {
        return Err(RequestError::invalid_body("event kind must not be empty"));
    }

    let source = request
        .header(SOURCE_HEADER)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .or(envelope_source)
        .or_else(|| peer.map(|addr| addr.to_string()))
        .unwrap_or_else(|| UNKNOWN_SOURCE.to_owned());

    let mut event = Event::new(kind, payload).with_source(printable("source", source)?);
    if let Some(session) = request
        .header(SESSION_HEADER)
        .map(str::to_owned)
        .or(envelope_session)
    {
        event = event.with_session(printable("session", session)?);
    }
    Ok(event)
}

/// Rejects identifiers carrying control characters.
fn printable(field: &str, value: String) -> Result<String, RequestError> {
    if value.chars().any(char::is_control) {
        return Err(RequestError::invalid_body(format!(
            "{field} must not contain control characters"
        )));
    }
    Ok(value)
}

fn require_method(request: &HttpRequest, allowed: &[&str]) -> Result<(), RequestError> {
    if allowed.contains(&request.method()) {
        return Ok(());
    }
    Err(RequestError::MethodNotAllowed {
        method: request.method().to_owned(),
        path: request.path().to_owned(),
    })
}

fn kind_for_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        ROOT_KIND.to_owned()
    } else {
        trimmed.to_owned()
    }
}

fn body_payload(body: &[u8]) -> Result<Value, RequestError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(RequestError::from_json_error)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;
    use serde_json::json;

    use super::super::read_request;
    use super::*;

    fn request(raw: &str) -> HttpRequest {
        read_request(&mut Cursor::new(raw.as_bytes().to_vec()), 4096)
            .expect("parse request")
            .expect("request present")
    }

    fn post(path: &str, headers: &str, body: &str) -> HttpRequest {
        request(&format!(
            "POST {path} HTTP/1.1\r\n{headers}Content-Length: {}\r\n\r\n{body}",
            body.len()
        ))
    }

    #[test]
    fn envelopes_supply_kind_payload_and_session() {
        let body = r#"{"kind":"analyze","payload":{"x":1},"source":"tv","session":"s-9"}"#;
        let event = event_from_request(&post("/events", "", body), None).expect("event");
        assert_eq!(event.kind(), "analyze");
        assert_eq!(event.payload(), &json!({ "x": 1 }));
        assert_eq!(event.source(), "tv");
        assert_eq!(event.session(), Some("s-9"));
    }

    #[test]
    fn headers_override_envelope_identity() {
        let body = r#"{"kind":"ping","source":"tv","session":"s-9"}"#;
        let headers = "X-Bot-Source: operator\r\nX-Bot-Session: s-1\r\n";
        let event = event_from_request(&post("/events", headers, body), None).expect("event");
        assert_eq!(event.source(), "operator");
        assert_eq!(event.session(), Some("s-1"));
        assert_eq!(event.payload(), &Value::Null);
    }

    #[rstest]
    #[case("/", "root")]
    #[case("/status", "status")]
    #[case("/status/", "status")]
    #[case("/health?verbose=1", "health")]
    fn paths_name_the_kind(#[case] path: &str, #[case] kind: &str) {
        let raw = format!("GET {path} HTTP/1.1\r\nHost: bot\r\n\r\n");
        let peer: SocketAddr = "10.0.0.7:41000".parse().expect("peer address");
        let event = event_from_request(&request(&raw), Some(peer)).expect("event");
        assert_eq!(event.kind(), kind);
        assert_eq!(event.source(), "10.0.0.7:41000");
    }

    #[test]
    fn invalid_json_bodies_are_rejected() {
        let error = event_from_request(&post("/analyze", "", "{not json"), None)
            .expect_err("invalid body");
        assert!(matches!(error, RequestError::InvalidBody { .. }));
    }

    #[test]
    fn envelopes_require_a_kind() {
        let error = event_from_request(&post("/events", "", r#"{"kind":"  "}"#), None)
            .expect_err("blank kind");
        assert_eq!(error.http_code(), Some(400));

        let error = event_from_request(&post("/events", "", r#"{"payload":1}"#), None)
            .expect_err("missing kind");
        assert!(matches!(error, RequestError::InvalidBody { .. }));
    }

    #[rstest]
    #[case(r#"{"kind":"ping","session":"a\u0000b"}"#, "session")]
    #[case(r#"{"kind":"ping","session":"line\nbreak"}"#, "session")]
    #[case(r#"{"kind":"ping","source":"tv\u0007"}"#, "source")]
    fn control_characters_in_identities_are_rejected(#[case] body: &str, #[case] field: &str) {
        let error = event_from_request(&post("/events", "", body), None)
            .expect_err("control characters rejected");
        assert_eq!(error.http_code(), Some(400));
        assert!(error.to_string().contains(field), "got {error}");
    }

    #[rstest]
    #[case("GET /events HTTP/1.1\r\n\r\n")]
    #[case("DELETE /status HTTP/1.1\r\n\r\n")]
    fn unsupported_methods_are_rejected(#[case] raw: &str) {
        let error = event_from_request(&request(raw), None).expect_err("method rejected");
        assert_eq!(error.http_code(), Some(405));
    }
}
