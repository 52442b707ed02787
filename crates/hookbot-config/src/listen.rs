use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// TCP address the bot listener binds to.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct ListenAddress {
    /// Host name or IP literal.
    pub host: String,
    /// TCP port; `0` asks the OS for an ephemeral port.
    pub port: u16,
}

impl ListenAddress {
    /// Builds a listen address.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host component.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port component.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ListenAddress {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(formatter, "[{}]:{}", self.host, self.port)
        } else {
            write!(formatter, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for ListenAddress {
    type Err = ListenParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let without_scheme = trimmed.strip_prefix("tcp://").unwrap_or(trimmed);
        let (host, port) = without_scheme
            .rsplit_once(':')
            .ok_or_else(|| ListenParseError::MissingPort(input.to_owned()))?;
        let host = host
            .strip_prefix('[')
            .and_then(|inner| inner.strip_suffix(']'))
            .unwrap_or(host);
        if host.is_empty() {
            return Err(ListenParseError::MissingHost(input.to_owned()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| ListenParseError::InvalidPort(input.to_owned()))?;
        Ok(Self::new(host, port))
    }
}

/// Errors encountered while parsing a [`ListenAddress`] from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListenParseError {
    /// Host component was empty.
    #[error("missing host in '{0}'")]
    MissingHost(String),
    /// No `:port` suffix was present.
    #[error("missing port in '{0}'")]
    MissingPort(String),
    /// The port was not a number in `0..=65535`.
    #[error("invalid port in '{0}'")]
    InvalidPort(String),
}
