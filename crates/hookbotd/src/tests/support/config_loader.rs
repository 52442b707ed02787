//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig as _, OrthoError};
use tempfile::TempDir;

use hookbot_config::Config;

use crate::bootstrap::ConfigLoader;

/// Loader that binds an ephemeral loopback port and keeps the status file in
/// a temporary directory.
#[derive(Clone)]
pub struct TestConfigLoader {
    state_dir: Arc<TempDir>,
    port: u16,
    autostart_worker: bool,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory for state");
        Self {
            state_dir: Arc::new(dir),
            port: 0,
            autostart_worker: false,
        }
    }

    /// Starts the background worker during bootstrap.
    #[must_use]
    pub fn with_autostart(mut self) -> Self {
        self.autostart_worker = true;
        self
    }

    /// Binds `port` instead of an ephemeral one.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Location of the status file.
    pub fn state_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.state_dir.path().join("state.json"))
            .expect("temporary state path was not valid UTF-8")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            host: "127.0.0.1".to_owned(),
            port: self.port,
            response_timeout_ms: 2_000,
            shutdown_grace_ms: 500,
            state_path: self.state_path(),
            worker_interval_secs: 3_600,
            autostart_worker: self.autostart_worker,
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing invalid CLI arguments.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("hookbotd"),
            OsString::from("--port"),
            OsString::from("not-a-port"),
        ];
        Config::load_from_iter(args)
    }
}

/// Loader that yields a configuration rejected by validation.
pub struct InvalidConfigLoader;

impl ConfigLoader for InvalidConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            response_timeout_ms: 0,
            ..Config::default()
        })
    }
}
