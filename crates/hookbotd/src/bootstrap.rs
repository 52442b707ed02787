//! Bot bootstrap orchestration.

use std::sync::Arc;

use ortho_config::OrthoConfig as _;
use ortho_config::OrthoError;
use thiserror::Error;
use tracing::warn;

use hookbot_config::{Config, ConfigError};

use crate::dispatch::Dispatcher;
use crate::handlers::state::{BotStatus, StatusStore};
use crate::handlers::worker::{HeartbeatJob, Job, Worker, WorkerError};
use crate::handlers::{BuiltinServices, HANDLERS_TARGET, install_builtin};
use crate::health::HealthReporter;
use crate::registry::{HandlerRegistry, RegistryBuilder, RegistryError};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the bot configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that hands out a configuration resolved elsewhere.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Configuration loaded but holds unusable values.
    #[error("invalid configuration: {source}")]
    InvalidConfiguration {
        /// Validation failure.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Handler registration failed.
    #[error("failed to register handlers: {source}")]
    Registry {
        /// Underlying registry error.
        #[source]
        source: RegistryError,
    },
    /// The background worker could not be started.
    #[error("failed to start background worker: {source}")]
    Worker {
        /// Underlying worker error.
        #[source]
        source: WorkerError,
    },
}

type HandlerInstaller = Box<dyn FnOnce(&mut RegistryBuilder) -> Result<(), RegistryError> + Send>;

/// Embedder-supplied additions to the built-in bot.
pub struct Extensions {
    job: Arc<dyn Job>,
    installers: Vec<HandlerInstaller>,
}

impl Extensions {
    /// Built-in handlers only, with the heartbeat worker job.
    #[must_use]
    pub fn new() -> Self {
        Self {
            job: Arc::new(HeartbeatJob),
            installers: Vec::new(),
        }
    }

    /// Replaces the job the background worker runs.
    #[must_use]
    pub fn with_job(mut self, job: Arc<dyn Job>) -> Self {
        self.job = job;
        self
    }

    /// Adds a registration step that runs after the built-in handlers.
    #[must_use]
    pub fn with_handlers<F>(mut self, install: F) -> Self
    where
        F: FnOnce(&mut RegistryBuilder) -> Result<(), RegistryError> + Send + 'static,
    {
        self.installers.push(Box::new(install));
        self
    }
}

impl Default for Extensions {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a successful bootstrap invocation.
pub struct Bot {
    config: Config,
    registry: Arc<HandlerRegistry>,
    dispatcher: Arc<Dispatcher>,
    services: BuiltinServices,
    telemetry: TelemetryHandle,
}

impl Bot {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Frozen handler registry.
    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Dispatcher shared with the listener.
    #[must_use]
    pub const fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Current bot status.
    #[must_use]
    pub fn status(&self) -> BotStatus {
        self.services.store().snapshot()
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Stops the background worker and persists the final status.
    ///
    /// Failures are logged; shutdown always runs to completion.
    pub fn shutdown(&self) {
        if let Err(error) = self.services.worker().stop() {
            warn!(target: HANDLERS_TARGET, %error, "background worker did not stop cleanly");
        }
        if let Err(error) = self.services.store().save() {
            warn!(target: HANDLERS_TARGET, %error, "failed to persist final bot status");
        }
    }
}

/// Bootstraps the bot using the supplied collaborators.
///
/// Loads and validates configuration, initialises telemetry, registers the
/// built-in handlers followed by `extensions`, and freezes the registry. The
/// background worker starts when `autostart_worker` is set.
///
/// # Errors
///
/// Returns [`BootstrapError`] for the first step that fails; the failure is
/// also reported through `reporter`.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    extensions: Extensions,
) -> Result<Bot, BootstrapError> {
    reporter.bootstrap_starting();
    match assemble(loader, &reporter, extensions) {
        Ok(bot) => {
            reporter.bootstrap_succeeded(bot.config());
            Ok(bot)
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn assemble(
    loader: &dyn ConfigLoader,
    reporter: &Arc<dyn HealthReporter>,
    extensions: Extensions,
) -> Result<Bot, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    config
        .validate()
        .map_err(|source| BootstrapError::InvalidConfiguration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;

    let Extensions { job, installers } = extensions;
    let store = Arc::new(StatusStore::open(config.state_path()));
    let worker = Arc::new(Worker::new(job, config.worker_interval(), Arc::clone(&store)));
    let services = BuiltinServices::new(&config, store, worker);

    let mut builder = RegistryBuilder::new();
    install_builtin(&mut builder, &services)
        .and_then(|()| installers.into_iter().try_for_each(|install| install(&mut builder)))
        .map_err(|source| BootstrapError::Registry { source })?;
    let registry = Arc::new(builder.build());
    let kinds: Vec<&str> = registry.kinds().collect();
    reporter.registry_frozen(&kinds);

    let dispatcher = Arc::new(
        Dispatcher::new(
            Arc::clone(&registry),
            config.session_idle(),
            Arc::clone(reporter),
        )
        .with_lane_limit(config.max_session_lanes()),
    );

    if config.autostart_worker {
        services
            .worker()
            .start()
            .map_err(|source| BootstrapError::Worker { source })?;
    }

    Ok(Bot {
        config,
        registry,
        dispatcher,
        services,
        telemetry,
    })
}
