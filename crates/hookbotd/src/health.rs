//! Structured health reporting for bot lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::bootstrap::BootstrapError;
use crate::dispatch::DispatchError;

use hookbot_config::Config;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the handler registry is frozen.
    fn registry_frozen(&self, kinds: &[&str]);

    /// Invoked when the listener has bound its socket.
    fn listener_bound(&self, addr: SocketAddr);

    /// Invoked when a handler invocation fails or cannot be scheduled.
    fn handler_failed(&self, error: &DispatchError);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn registry_frozen(&self, kinds: &[&str]) {
        (**self).registry_frozen(kinds);
    }

    fn listener_bound(&self, addr: SocketAddr) {
        (**self).listener_bound(addr);
    }

    fn handler_failed(&self, error: &DispatchError) {
        (**self).handler_failed(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting bot bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            listen = %config.listen_address(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            state_path = %config.state_path(),
            "bot bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "bot bootstrap failed"
        );
    }

    fn registry_frozen(&self, kinds: &[&str]) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "registry_frozen",
            handlers = kinds.len(),
            kinds = ?kinds,
            "handler registry frozen"
        );
    }

    fn listener_bound(&self, addr: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listener_bound",
            %addr,
            "listening for events"
        );
    }

    fn handler_failed(&self, error: &DispatchError) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "handler_failed",
            error = %error,
            "handler invocation failed"
        );
    }
}
