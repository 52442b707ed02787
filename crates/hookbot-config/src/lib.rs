//! Shared configuration for the hookbot daemon.
//!
//! Configuration is layered by [`ortho_config`]: built-in defaults, then an
//! optional TOML file (`--config-path` or `HOOKBOT_CONFIG_PATH`), then
//! `HOOKBOT_*` environment variables, then command-line flags. The resolved
//! [`Config`] is immutable once loaded and handed to the daemon bootstrap.

mod defaults;
mod listen;
mod logging;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_MAX_REQUEST_BYTES, DEFAULT_MAX_SESSION_LANES,
    DEFAULT_PORT, DEFAULT_READ_TIMEOUT_MS, DEFAULT_RESPONSE_TIMEOUT_MS, DEFAULT_SESSION_IDLE_MS,
    DEFAULT_SHUTDOWN_GRACE_MS, DEFAULT_STATE_PATH, DEFAULT_WORKER_INTERVAL_SECS, default_host,
    default_listen_address, default_log_filter, default_log_filter_string, default_log_format,
    default_max_request_bytes, default_max_session_lanes, default_port, default_read_timeout_ms,
    default_response_timeout_ms, default_session_idle_ms, default_shutdown_grace_ms,
    default_state_path, default_worker_interval_secs,
};
pub use listen::{ListenAddress, ListenParseError};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved runtime configuration for the bot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "HOOKBOT")]
pub struct Config {
    /// Host the listener binds to.
    #[serde(default = "default_host")]
    #[ortho_config(default = defaults::default_host())]
    pub host: String,
    /// TCP port the listener binds to.
    #[serde(default = "default_port")]
    #[ortho_config(default = defaults::default_port())]
    pub port: u16,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
    /// Upper bound on how long a connection waits for its response.
    #[serde(default = "default_response_timeout_ms")]
    #[ortho_config(default = defaults::default_response_timeout_ms())]
    pub response_timeout_ms: u64,
    /// Upper bound on the size of one request, head and body combined.
    #[serde(default = "default_max_request_bytes")]
    #[ortho_config(default = defaults::default_max_request_bytes())]
    pub max_request_bytes: usize,
    /// Upper bound on how long one read of a request may block.
    #[serde(default = "default_read_timeout_ms")]
    #[ortho_config(default = defaults::default_read_timeout_ms())]
    pub read_timeout_ms: u64,
    /// Cap on concurrently live session lanes.
    #[serde(default = "default_max_session_lanes")]
    #[ortho_config(default = defaults::default_max_session_lanes())]
    pub max_session_lanes: usize,
    /// How long an idle session lane is kept before its thread retires.
    #[serde(default = "default_session_idle_ms")]
    #[ortho_config(default = defaults::default_session_idle_ms())]
    pub session_idle_ms: u64,
    /// Drain budget for in-flight connections once shutdown begins.
    #[serde(default = "default_shutdown_grace_ms")]
    #[ortho_config(default = defaults::default_shutdown_grace_ms())]
    pub shutdown_grace_ms: u64,
    /// Location of the persisted bot status snapshot.
    #[serde(default = "default_state_path")]
    #[ortho_config(default = defaults::default_state_path())]
    pub state_path: Utf8PathBuf,
    /// Cadence of the background worker.
    #[serde(default = "default_worker_interval_secs")]
    #[ortho_config(default = defaults::default_worker_interval_secs())]
    pub worker_interval_secs: u64,
    /// Starts the background worker during bootstrap.
    #[serde(default)]
    #[ortho_config(default = false)]
    pub autostart_worker: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            response_timeout_ms: default_response_timeout_ms(),
            max_request_bytes: default_max_request_bytes(),
            read_timeout_ms: default_read_timeout_ms(),
            max_session_lanes: default_max_session_lanes(),
            session_idle_ms: default_session_idle_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            state_path: default_state_path(),
            worker_interval_secs: default_worker_interval_secs(),
            autostart_worker: false,
        }
    }
}

impl Config {
    /// Address the listener binds to.
    #[must_use]
    pub fn listen_address(&self) -> ListenAddress {
        ListenAddress::new(self.host.clone(), self.port)
    }

    /// Configured `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Configured log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Bound on how long a connection waits for its response.
    #[must_use]
    pub const fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// Maximum accepted request size in bytes.
    #[must_use]
    pub const fn max_request_bytes(&self) -> usize {
        self.max_request_bytes
    }

    /// Bound on one blocking read of a request.
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Cap on concurrently live session lanes.
    #[must_use]
    pub const fn max_session_lanes(&self) -> usize {
        self.max_session_lanes
    }

    /// Idle lifetime of a session lane.
    #[must_use]
    pub const fn session_idle(&self) -> Duration {
        Duration::from_millis(self.session_idle_ms)
    }

    /// Drain budget applied during shutdown.
    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Location of the status snapshot file.
    #[must_use]
    pub fn state_path(&self) -> &Utf8Path {
        self.state_path.as_path()
    }

    /// Cadence of the background worker.
    #[must_use]
    pub const fn worker_interval(&self) -> Duration {
        Duration::from_secs(self.worker_interval_secs)
    }

    /// Rejects values that would leave the listener unable to serve requests.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a timeout, size cap, or interval is zero
    /// or the host is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.response_timeout_ms == 0 {
            return Err(ConfigError::Zero {
                field: "response_timeout_ms",
            });
        }
        if self.max_request_bytes == 0 {
            return Err(ConfigError::Zero {
                field: "max_request_bytes",
            });
        }
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::Zero {
                field: "read_timeout_ms",
            });
        }
        if self.max_session_lanes == 0 {
            return Err(ConfigError::Zero {
                field: "max_session_lanes",
            });
        }
        if self.worker_interval_secs == 0 {
            return Err(ConfigError::Zero {
                field: "worker_interval_secs",
            });
        }
        Ok(())
    }
}

/// Semantic validation failures for an otherwise well-formed [`Config`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The bind host was blank.
    #[error("listener host must not be empty")]
    EmptyHost,
    /// A field that must be positive was zero.
    #[error("configuration field '{field}' must be greater than zero")]
    Zero {
        /// Name of the offending field.
        field: &'static str,
    },
}
