//! HTTP/1.1 response serialisation.

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::dispatch::Response;

use super::super::RequestError;

/// A complete response with a JSON body. Connections are closed after each
/// response.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HttpResponse {
    code: u16,
    body: Value,
}

impl HttpResponse {
    pub(crate) const fn new(code: u16, body: Value) -> Self {
        Self { code, body }
    }

    pub(crate) fn from_request_error(code: u16, error: &RequestError) -> Self {
        Self::new(code, json!({ "ok": false, "error": error.to_string() }))
    }

    pub(crate) const fn code(&self) -> u16 {
        self.code
    }

    pub(crate) fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let body = serde_json::to_vec(&self.body)?;
        write!(
            writer,
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.code,
            reason_phrase(self.code),
            body.len()
        )?;
        writer.write_all(&body)?;
        writer.flush()
    }
}

impl From<&Response> for HttpResponse {
    fn from(response: &Response) -> Self {
        Self::new(response.status().http_code(), response.body())
    }
}

const fn reason_phrase(code: u16) -> &'static str {
    match code {
        200 => "OK",
        202 => "Accepted",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        413 => "Payload Too Large",
        499 => "Client Closed Request",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
}
