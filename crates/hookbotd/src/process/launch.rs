//! Supervises bot launch sequencing and runtime orchestration.

use std::sync::Arc;

use tracing::{info, warn};

use crate::StructuredHealthReporter;
use crate::bootstrap::{
    ConfigLoader, Extensions, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
use crate::health::HealthReporter;
use crate::transport::{ConnectionSettings, HttpConnectionHandler, SocketListener};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Collaborators required to launch the bot runtime.
pub struct LaunchPlan<L, S> {
    /// Configuration source.
    pub loader: L,
    /// Lifecycle observer.
    pub reporter: Arc<dyn HealthReporter>,
    /// Blocks until the bot should stop.
    pub shutdown: S,
    /// Handlers and worker job added to the built-in set.
    pub extensions: Extensions,
}

/// Runs the bot with the production collaborators until a termination signal
/// arrives.
///
/// # Errors
///
/// Returns [`LaunchError`] when configuration, bootstrap, the listener, or
/// signal installation fails.
pub fn run_bot() -> Result<(), LaunchError> {
    run_bot_with(LaunchPlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        shutdown: SystemShutdownSignal::install()?,
        extensions: Extensions::new(),
    })
}

/// Runs the bot with injected collaborators.
///
/// The listener binds before bootstrap so an unusable address fails fast.
/// Once `shutdown` returns, the listener stops accepting, in-flight
/// connections get `shutdown_grace_ms` to finish, and the final status is
/// persisted.
///
/// # Errors
///
/// Returns [`LaunchError`] for the first step that fails.
pub fn run_bot_with<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let LaunchPlan {
        loader,
        reporter,
        shutdown,
        extensions,
    } = plan;

    info!(target: PROCESS_TARGET, "starting bot runtime");
    let config = loader.load()?;
    let listener = SocketListener::bind(&config.listen_address())?;

    let static_loader = StaticConfigLoader::new(config);
    let bot = bootstrap_with(&static_loader, Arc::clone(&reporter), extensions)?;
    let config = bot.config();

    if let Some(addr) = listener.local_addr() {
        reporter.listener_bound(addr);
    }
    let settings = ConnectionSettings::new(config.response_timeout(), config.max_request_bytes())
        .with_read_timeout(config.read_timeout());
    let handler = Arc::new(HttpConnectionHandler::new(
        Arc::clone(bot.dispatcher()),
        settings,
    ));
    let listener_handle = match listener.start(handler) {
        Ok(handle) => handle,
        Err(error) => {
            bot.shutdown();
            return Err(error.into());
        }
    };

    let waited = shutdown.wait();
    info!(target: PROCESS_TARGET, "stopping listener");
    listener_handle.shutdown();
    let remaining = listener_handle.drain(config.shutdown_grace());
    if remaining > 0 {
        warn!(
            target: PROCESS_TARGET,
            remaining,
            grace_ms = config.shutdown_grace_ms,
            "connections still active after shutdown grace period"
        );
    }
    let joined = listener_handle.join();
    bot.shutdown();
    waited?;
    joined?;
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}
