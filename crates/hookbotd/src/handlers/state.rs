//! Persisted bot status.

use std::fs;
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};

use super::HANDLERS_TARGET;

/// Snapshot of the bot's runtime status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotStatus {
    /// Lifecycle label: `idle`, `running` or `stopped`.
    pub status: String,
    /// Whether the background worker is active.
    pub worker_running: bool,
    /// Worker cycles completed since the worker last started.
    pub cycles: u64,
    /// Worker cycles that reported an error.
    pub error_count: u64,
    /// Seconds the worker has been running.
    pub uptime_secs: u64,
    /// RFC 3339 timestamp of the last save.
    pub last_update: Option<String>,
    /// Most recent worker error.
    pub last_error: Option<String>,
}

impl Default for BotStatus {
    fn default() -> Self {
        Self {
            status: "idle".to_owned(),
            worker_running: false,
            cycles: 0,
            error_count: 0,
            uptime_secs: 0,
            last_update: None,
            last_error: None,
        }
    }
}

/// Errors raised while loading or saving the status file.
#[derive(Debug, Error)]
pub enum StateError {
    /// The status file could not be read.
    #[error("failed to read status file '{path}': {source}")]
    Read {
        /// Status file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The status file did not contain a valid snapshot.
    #[error("failed to parse status file '{path}': {source}")]
    Parse {
        /// Status file path.
        path: Utf8PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// Serialising the snapshot failed.
    #[error("failed to serialise status: {0}")]
    Serialise(#[from] serde_json::Error),
    /// Writing the status file failed.
    #[error("failed to write status file '{path}': {source}")]
    Write {
        /// Status file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Shared, file-backed [`BotStatus`].
#[derive(Debug)]
pub struct StatusStore {
    path: Utf8PathBuf,
    status: Mutex<BotStatus>,
}

impl StatusStore {
    /// Loads the snapshot at `path`, falling back to defaults when the file is
    /// missing or unreadable. A fresh process never reports the worker as
    /// running, whatever the file says.
    #[must_use]
    pub fn open(path: &Utf8Path) -> Self {
        let mut status = match read_status(path) {
            Ok(Some(status)) => {
                info!(target: HANDLERS_TARGET, path = %path, "loaded bot status");
                status
            }
            Ok(None) => BotStatus::default(),
            Err(error) => {
                warn!(target: HANDLERS_TARGET, %error, "ignoring unreadable bot status");
                BotStatus::default()
            }
        };
        status.worker_running = false;
        Self {
            path: path.to_owned(),
            status: Mutex::new(status),
        }
    }

    /// Location of the status file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Copy of the current status.
    #[must_use]
    pub fn snapshot(&self) -> BotStatus {
        self.lock().clone()
    }

    /// Applies `change` to the status under the store's lock.
    pub fn update<F>(&self, change: F)
    where
        F: FnOnce(&mut BotStatus),
    {
        change(&mut *self.lock());
    }

    /// Stamps `last_update` and writes the status as pretty JSON.
    ///
    /// The file is written beside its final location and renamed into place
    /// so readers never observe a partial snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when serialisation or the write fails.
    pub fn save(&self) -> Result<(), StateError> {
        let now = OffsetDateTime::now_utc().format(&Rfc3339).ok();
        let rendered = {
            let mut status = self.lock();
            status.last_update = now;
            serde_json::to_string_pretty(&*status)?
        };
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, rendered)
            .and_then(|()| fs::rename(&staging, &self.path))
            .map_err(|source| StateError::Write {
                path: self.path.clone(),
                source,
            })
    }

    fn lock(&self) -> MutexGuard<'_, BotStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn read_status(path: &Utf8Path) -> Result<Option<BotStatus>, StateError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StateError::Read {
                path: path.to_owned(),
                source,
            });
        }
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| StateError::Parse {
            path: path.to_owned(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn state_path(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join("state.json")).expect("utf8 temp path")
    }

    #[test]
    fn missing_files_start_idle() {
        let dir = TempDir::new().expect("temp dir");
        let store = StatusStore::open(&state_path(&dir));
        assert_eq!(store.snapshot(), BotStatus::default());
    }

    #[test]
    fn saved_status_is_reloaded() {
        let dir = TempDir::new().expect("temp dir");
        let path = state_path(&dir);
        let store = StatusStore::open(&path);
        store.update(|status| {
            status.status = "stopped".to_owned();
            status.cycles = 12;
            status.worker_running = true;
        });
        store.save().expect("save status");

        let reloaded = StatusStore::open(&path).snapshot();
        assert_eq!(reloaded.status, "stopped");
        assert_eq!(reloaded.cycles, 12);
        assert!(reloaded.last_update.is_some());
        assert!(!reloaded.worker_running, "worker flag resets on load");
    }

    #[test]
    fn partial_files_keep_defaults_for_missing_fields() {
        let dir = TempDir::new().expect("temp dir");
        let path = state_path(&dir);
        fs::write(&path, r#"{"status":"running","symbol":"BTCUSDT"}"#).expect("write file");

        let status = StatusStore::open(&path).snapshot();
        assert_eq!(status.status, "running");
        assert_eq!(status.error_count, 0);
    }

    #[test]
    fn corrupt_files_fall_back_to_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let path = state_path(&dir);
        fs::write(&path, "{ not json").expect("write file");

        assert!(matches!(read_status(&path), Err(StateError::Parse { .. })));
        assert_eq!(StatusStore::open(&path).snapshot(), BotStatus::default());
    }

    #[test]
    fn saving_into_a_missing_directory_fails() {
        let dir = TempDir::new().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("absent").join("state.json"))
            .expect("utf8 temp path");
        let error = StatusStore::open(&path).save().expect_err("save must fail");
        assert!(matches!(error, StateError::Write { .. }));
    }
}
