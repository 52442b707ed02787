use camino::Utf8PathBuf;

use crate::listen::ListenAddress;

/// Default bind host; the bot listens on every interface.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default TCP port exposed by the bot.
pub const DEFAULT_PORT: u16 = 5000;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default bound on how long a connection waits for its response.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 10_000;

/// Default cap on the size of one HTTP request (head and body).
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Default bound on how long one read of a request may block.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 5_000;

/// Default cap on concurrently live session lanes.
pub const DEFAULT_MAX_SESSION_LANES: usize = 1024;

/// Default lifetime of an idle session lane.
pub const DEFAULT_SESSION_IDLE_MS: u64 = 30_000;

/// Default drain budget for in-flight connections on shutdown.
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 10_000;

/// Default location of the persisted status snapshot.
pub const DEFAULT_STATE_PATH: &str = "state.json";

/// Default cadence of the background worker.
pub const DEFAULT_WORKER_INTERVAL_SECS: u64 = 60;

/// Default bind host as an owned value for serde and the config derive.
#[must_use]
pub fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

/// Default TCP port.
#[must_use]
pub const fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Default response timeout in milliseconds.
#[must_use]
pub const fn default_response_timeout_ms() -> u64 {
    DEFAULT_RESPONSE_TIMEOUT_MS
}

/// Default request size cap in bytes.
#[must_use]
pub const fn default_max_request_bytes() -> usize {
    DEFAULT_MAX_REQUEST_BYTES
}

/// Default request read timeout in milliseconds.
#[must_use]
pub const fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT_MS
}

/// Default cap on live session lanes.
#[must_use]
pub const fn default_max_session_lanes() -> usize {
    DEFAULT_MAX_SESSION_LANES
}

/// Default idle session lane lifetime in milliseconds.
#[must_use]
pub const fn default_session_idle_ms() -> u64 {
    DEFAULT_SESSION_IDLE_MS
}

/// Default shutdown drain budget in milliseconds.
#[must_use]
pub const fn default_shutdown_grace_ms() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_MS
}

/// Default status snapshot path.
#[must_use]
pub fn default_state_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_STATE_PATH)
}

/// Default worker cadence in seconds.
#[must_use]
pub const fn default_worker_interval_secs() -> u64 {
    DEFAULT_WORKER_INTERVAL_SECS
}

/// Computes the default listen address for the bot.
#[must_use]
pub fn default_listen_address() -> ListenAddress {
    ListenAddress::new(DEFAULT_HOST, DEFAULT_PORT)
}
