//! Bounded HTTP/1.x request reader.

use std::io::{self, Read};

use super::super::RequestError;

const MAX_HEADERS: usize = 64;
const READ_CHUNK: usize = 4096;

/// Parsed request with an owned head and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HttpRequest {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl HttpRequest {
    pub(crate) fn method(&self) -> &str {
        &self.method
    }

    /// Request target without its query string.
    pub(crate) fn path(&self) -> &str {
        self.path
            .split_once('?')
            .map_or(self.path.as_str(), |(path, _)| path)
    }

    /// First header named `name`, compared case-insensitively.
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub(crate) fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Head fields extracted once `httparse` reports a complete head.
struct Head {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    length: usize,
}

/// Reads one request from `stream`.
///
/// Returns `Ok(None)` when the peer closes the connection before sending any
/// bytes. Head and body together may not exceed `max_bytes`.
pub(crate) fn read_request<R: Read>(
    stream: &mut R,
    max_bytes: usize,
) -> Result<Option<HttpRequest>, RequestError> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; READ_CHUNK];

    let head = loop {
        if let Some(head) = parse_head(&buffer)? {
            break head;
        }
        enforce_request_limit(buffer.len(), max_bytes)?;
        let read = read_chunk_with_retry(stream, &mut chunk)?;
        if read == 0 {
            return if buffer.is_empty() {
                Ok(None)
            } else {
                Err(RequestError::Incomplete)
            };
        }
        buffer.extend_from_slice(chunk.get(..read).unwrap_or_default());
    };

    let content_length = content_length(&head.headers)?;
    let total = head.length.saturating_add(content_length);
    enforce_request_limit(total, max_bytes)?;

    while buffer.len() < total {
        let read = read_chunk_with_retry(stream, &mut chunk)?;
        if read == 0 {
            return Err(RequestError::Incomplete);
        }
        buffer.extend_from_slice(chunk.get(..read).unwrap_or_default());
    }

    let body = buffer.get(head.length..total).unwrap_or_default().to_vec();
    Ok(Some(HttpRequest {
        method: head.method,
        path: head.path,
        headers: head.headers,
        body,
    }))
}

fn parse_head(buffer: &[u8]) -> Result<Option<Head>, RequestError> {
    if buffer.is_empty() {
        return Ok(None);
    }
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut request = httparse::Request::new(&mut headers);
    let length = match request.parse(buffer) {
        Ok(httparse::Status::Complete(length)) => length,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(error) => return Err(RequestError::malformed(error.to_string())),
    };

    let method = request
        .method
        .ok_or_else(|| RequestError::malformed("missing method"))?
        .to_owned();
    let path = request
        .path
        .ok_or_else(|| RequestError::malformed("missing request target"))?
        .to_owned();
    let headers = request
        .headers
        .iter()
        .map(|header| {
            std::str::from_utf8(header.value)
                .map(|value| (header.name.to_owned(), value.trim().to_owned()))
                .map_err(|_| {
                    RequestError::malformed(format!("header '{}' is not UTF-8", header.name))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(Head {
        method,
        path,
        headers,
        length,
    }))
}

fn content_length(headers: &[(String, String)]) -> Result<usize, RequestError> {
    let chunked = headers.iter().any(|(name, value)| {
        name.eq_ignore_ascii_case("transfer-encoding") && !value.eq_ignore_ascii_case("identity")
    });
    if chunked {
        return Err(RequestError::malformed(
            "transfer-encoded bodies are not supported; send Content-Length",
        ));
    }
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .map_or(Ok(0), |(_, value)| {
            value
                .parse::<usize>()
                .map_err(|_| RequestError::malformed(format!("invalid Content-Length '{value}'")))
        })
}

fn read_chunk_with_retry<R: Read>(stream: &mut R, chunk: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(chunk) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
}

const fn enforce_request_limit(size: usize, max_size: usize) -> Result<(), RequestError> {
    if size > max_size {
        return Err(RequestError::TooLarge { size, max_size });
    }
    Ok(())
}
