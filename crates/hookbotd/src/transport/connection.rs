//! Connection handler that turns HTTP requests into dispatched events.
//!
//! Each connection carries exactly one request. The handler reads it with a
//! size cap, submits the resulting event to the [`Dispatcher`], and waits for
//! the response in short slices so it can notice a departed client or an
//! expired deadline. Either condition cancels the pending invocation.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::dispatch::{CancellationToken, DispatchError, Dispatcher, PendingResponse, Response};

use super::http::{HttpResponse, event_from_request, read_request};
use super::{ConnectionHandler, ConnectionStream, LISTENER_TARGET, RequestError};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(25);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Limits applied to each connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConnectionSettings {
    pub(crate) response_timeout: Duration,
    pub(crate) max_request_bytes: usize,
    pub(crate) read_timeout: Duration,
    pub(crate) poll_interval: Duration,
}

impl ConnectionSettings {
    pub(crate) const fn new(response_timeout: Duration, max_request_bytes: usize) -> Self {
        Self {
            response_timeout,
            max_request_bytes,
            read_timeout: DEFAULT_READ_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Bounds how long a single read of the request may block.
    pub(crate) const fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

/// Serves one HTTP request per connection through the dispatcher.
pub(crate) struct HttpConnectionHandler {
    dispatcher: Arc<Dispatcher>,
    settings: ConnectionSettings,
}

impl HttpConnectionHandler {
    pub(crate) const fn new(dispatcher: Arc<Dispatcher>, settings: ConnectionSettings) -> Self {
        Self {
            dispatcher,
            settings,
        }
    }

    fn serve(&self, mut stream: ConnectionStream) {
        let peer = stream.peer_addr();
        if let Err(error) = stream.set_read_timeout(Some(self.settings.read_timeout)) {
            warn!(target: LISTENER_TARGET, %error, "failed to set read timeout");
            return;
        }
        let request = match read_request(&mut stream, self.settings.max_request_bytes)
            .map_err(|error| classify_read_error(error, self.settings.read_timeout))
        {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!(target: LISTENER_TARGET, "client disconnected without request");
                return;
            }
            Err(error) => {
                warn!(target: LISTENER_TARGET, %error, "failed to read request");
                if let Some(code) = error.http_code() {
                    respond(&mut stream, &HttpResponse::from_request_error(code, &error));
                }
                return;
            }
        };

        let event = match event_from_request(&request, peer) {
            Ok(event) => event,
            Err(error) => {
                warn!(
                    target: LISTENER_TARGET,
                    %error,
                    method = request.method(),
                    path = request.path(),
                    "rejected request"
                );
                if let Some(code) = error.http_code() {
                    respond(&mut stream, &HttpResponse::from_request_error(code, &error));
                }
                return;
            }
        };

        debug!(
            target: LISTENER_TARGET,
            kind = event.kind(),
            source = event.source(),
            session = event.session(),
            "dispatching event"
        );
        let mut pending = self.dispatcher.submit(event, CancellationToken::new());
        match self.await_response(&mut pending, &stream) {
            Ok(response) => {
                respond(&mut stream, &HttpResponse::from(&response));
            }
            Err(error @ DispatchError::ClientDisconnected { .. }) => {
                info!(target: LISTENER_TARGET, %error, "abandoning response");
            }
            Err(error) => {
                warn!(target: LISTENER_TARGET, %error, "dispatch failed");
                respond(&mut stream, &HttpResponse::from(&Response::from_error(&error)));
            }
        }
    }

    fn await_response(
        &self,
        pending: &mut PendingResponse,
        stream: &ConnectionStream,
    ) -> Result<Response, DispatchError> {
        let timeout = self.settings.response_timeout;
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                pending.cancel();
                return Err(DispatchError::timeout(pending.kind(), timeout));
            }
            if let Some(response) = pending.poll(remaining.min(self.settings.poll_interval)) {
                return Ok(response);
            }
            if stream.peer_closed() {
                pending.cancel();
                return Err(DispatchError::client_disconnected(pending.kind()));
            }
        }
    }
}

impl ConnectionHandler for HttpConnectionHandler {
    fn handle(&self, stream: ConnectionStream) {
        self.serve(stream);
    }
}

/// Reports a read that hit the socket timeout as [`RequestError::TimedOut`].
fn classify_read_error(error: RequestError, waited: Duration) -> RequestError {
    match error {
        RequestError::Io(source)
            if matches!(
                source.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ) =>
        {
            RequestError::TimedOut { waited }
        }
        other => other,
    }
}

fn respond(stream: &mut ConnectionStream, response: &HttpResponse) {
    if let Err(error) = response.write_to(stream) {
        warn!(
            target: LISTENER_TARGET,
            %error,
            code = response.code(),
            "failed to write response"
        );
    }
}
