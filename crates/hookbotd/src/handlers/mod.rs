//! Built-in handlers shipped with the bot.
//!
//! [`install_builtin`] registers the operational surface (`ping`, `root`,
//! `health`, `status`, `config`), worker control (`start`, `stop`), the
//! indicator analysis (`analyze`), and the fire-and-forget `snapshot` that
//! persists the status file. Embedders register their own kinds after these;
//! a clash is reported as a duplicate registration.

pub mod indicators;
pub mod state;
pub mod worker;

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::warn;

use hookbot_config::{Config, LogFormat};

use crate::event::Event;
use crate::registry::{HandlerError, RegistryBuilder, RegistryError, handler_fn};

use self::indicators::Timeframes;
use self::state::StatusStore;
use self::worker::{StartOutcome, Worker};

pub(crate) const HANDLERS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::handlers");

/// Shared state the built-in handlers operate on.
#[derive(Clone)]
pub struct BuiltinServices {
    config: Arc<ConfigView>,
    store: Arc<StatusStore>,
    worker: Arc<Worker>,
    started: Instant,
}

impl BuiltinServices {
    /// Bundles the services; `started` anchors the reported uptime.
    #[must_use]
    pub fn new(config: &Config, store: Arc<StatusStore>, worker: Arc<Worker>) -> Self {
        Self {
            config: Arc::new(ConfigView::from(config)),
            store,
            worker,
            started: Instant::now(),
        }
    }

    /// Status store shared with the worker.
    #[must_use]
    pub fn store(&self) -> &Arc<StatusStore> {
        &self.store
    }

    /// Background worker.
    #[must_use]
    pub fn worker(&self) -> &Arc<Worker> {
        &self.worker
    }

    fn persist(&self) {
        if let Err(error) = self.store.save() {
            warn!(target: HANDLERS_TARGET, %error, "failed to persist bot status");
        }
    }
}

/// Configuration fields safe to expose over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct ConfigView {
    host: String,
    port: u16,
    log_format: LogFormat,
    response_timeout_ms: u64,
    max_request_bytes: usize,
    read_timeout_ms: u64,
    max_session_lanes: usize,
    session_idle_ms: u64,
    shutdown_grace_ms: u64,
    worker_interval_secs: u64,
    autostart_worker: bool,
}

impl From<&Config> for ConfigView {
    fn from(config: &Config) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            log_format: config.log_format(),
            response_timeout_ms: config.response_timeout_ms,
            max_request_bytes: config.max_request_bytes(),
            read_timeout_ms: config.read_timeout_ms,
            max_session_lanes: config.max_session_lanes(),
            session_idle_ms: config.session_idle_ms,
            shutdown_grace_ms: config.shutdown_grace_ms,
            worker_interval_secs: config.worker_interval_secs,
            autostart_worker: config.autostart_worker,
        }
    }
}

/// Registers every built-in kind on `builder`.
///
/// # Errors
///
/// Returns [`RegistryError::DuplicateKind`] when a built-in kind is already
/// bound.
pub fn install_builtin(
    builder: &mut RegistryBuilder,
    services: &BuiltinServices,
) -> Result<(), RegistryError> {
    builder.register("ping", handler_fn(|_, _| Ok(json!("pong"))))?;
    builder.register(
        "health",
        handler_fn(|_, _| Ok(json!({ "ok": true, "status": "healthy" }))),
    )?;

    let root = services.clone();
    builder.register(
        "root",
        handler_fn(move |_, _| {
            let status = root.store.snapshot();
            Ok(json!({
                "ok": true,
                "status": status.status,
                "worker_running": root.worker.is_running(),
                "uptime_secs": root.started.elapsed().as_secs(),
            }))
        }),
    )?;

    let status = services.clone();
    builder.register(
        "status",
        handler_fn(move |_, _| {
            let mut body = to_body(&status.store.snapshot())?;
            if let Value::Object(fields) = &mut body {
                fields.insert("ok".to_owned(), Value::Bool(true));
            }
            Ok(body)
        }),
    )?;

    let config = Arc::clone(&services.config);
    builder.register(
        "config",
        handler_fn(move |_, _| to_body(config.as_ref())),
    )?;

    let start = services.clone();
    builder.register(
        "start",
        handler_fn(move |_, _| {
            let outcome = start
                .worker
                .start()
                .map_err(|error| HandlerError::failed(error.to_string()))?;
            let message = match outcome {
                StartOutcome::Started => {
                    start.persist();
                    "started"
                }
                StartOutcome::AlreadyRunning => "already running",
            };
            Ok(json!({ "ok": true, "message": message }))
        }),
    )?;

    let stop = services.clone();
    builder.register(
        "stop",
        handler_fn(move |_, _| {
            let stopped = stop.worker.stop();
            stop.persist();
            let was_running = stopped.map_err(|error| HandlerError::failed(error.to_string()))?;
            Ok(json!({ "ok": true, "was_running": was_running }))
        }),
    )?;

    builder.register("analyze", handler_fn(analyze))?;

    let snapshot = services.clone();
    builder.register(
        "snapshot",
        handler_fn(move |_, _| {
            snapshot
                .store
                .save()
                .map_err(|error| HandlerError::failed(error.to_string()))?;
            Ok(Value::Null)
        })
        .fire_and_forget(),
    )?;
    Ok(())
}

fn analyze(event: &Event, _: &crate::registry::HandlerContext) -> Result<Value, HandlerError> {
    let frames: Timeframes = serde_json::from_value(event.payload().clone())
        .map_err(|error| HandlerError::invalid_payload(error.to_string()))?;
    let analysis = indicators::analyze(&frames)
        .map_err(|error| HandlerError::invalid_payload(error.to_string()))?;
    to_body(&analysis)
}

fn to_body<T: Serialize + ?Sized>(value: &T) -> Result<Value, HandlerError> {
    serde_json::to_value(value).map_err(|error| HandlerError::failed(error.to_string()))
}
