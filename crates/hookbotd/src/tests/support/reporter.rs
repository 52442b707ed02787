//! Test double for [`HealthReporter`] that records structured events for assertions.
//!
//! The recorder captures lifecycle telemetry emitted during bootstrap, launch,
//! and dispatch so behaviour tests can validate observable events.

use std::net::SocketAddr;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use hookbot_config::Config;

use crate::bootstrap::BootstrapError;
use crate::dispatch::DispatchError;
use crate::health::HealthReporter;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// The registry was frozen with these kinds.
    RegistryFrozen(Vec<String>),
    /// The listener bound this address.
    ListenerBound(SocketAddr),
    /// A handler failed with an error description.
    HandlerFailed(String),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    pub fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }

    /// Kinds reported when the registry was frozen.
    pub fn frozen_kinds(&self) -> Option<Vec<String>> {
        self.events().into_iter().find_map(|event| match event {
            HealthEvent::RegistryFrozen(kinds) => Some(kinds),
            _ => None,
        })
    }

    /// Waits for the listener to report its bound address.
    pub fn wait_for_listener(&self, timeout: Duration) -> Option<SocketAddr> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let bound = self.events().into_iter().find_map(|event| match event {
                HealthEvent::ListenerBound(addr) => Some(addr),
                _ => None,
            });
            if bound.is_some() {
                return bound;
            }
            thread::sleep(Duration::from_millis(10));
        }
        None
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn registry_frozen(&self, kinds: &[&str]) {
        self.record(HealthEvent::RegistryFrozen(
            kinds.iter().map(|kind| (*kind).to_owned()).collect(),
        ));
    }

    fn listener_bound(&self, addr: SocketAddr) {
        self.record(HealthEvent::ListenerBound(addr));
    }

    fn handler_failed(&self, error: &DispatchError) {
        self.record(HealthEvent::HandlerFailed(error.to_string()));
    }
}
