//! BDD test world: encapsulates loader, reporter, extensions, and bootstrap state for step functions.

use std::cell::RefCell;
use std::sync::Arc;

use serde_json::{Value, json};

use crate::bootstrap::{Bot, BootstrapError, ConfigLoader, Extensions, bootstrap_with};
use crate::dispatch::Response;
use crate::event::Event;
use crate::registry::handler_fn;

use super::config_loader::{FailingConfigLoader, InvalidConfigLoader, TestConfigLoader};
use super::reporter::RecordingHealthReporter;

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    loader: Box<dyn ConfigLoader>,
    pub reporter: Arc<RecordingHealthReporter>,
    extensions: Option<Extensions>,
    bot: Option<Bot>,
    bootstrap_error: Option<BootstrapError>,
    last_response: Option<Response>,
}

impl TestWorld {
    /// Builds a world with a successful configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            loader: Box::new(TestConfigLoader::new()),
            reporter: Arc::new(RecordingHealthReporter::default()),
            extensions: Some(Extensions::new()),
            bot: None,
            bootstrap_error: None,
            last_response: None,
        }
    }

    /// Installs a loader that always fails.
    pub fn use_failing_loader(&mut self) {
        self.reset_results();
        self.loader = Box::new(FailingConfigLoader);
    }

    /// Installs a loader whose configuration fails validation.
    pub fn use_invalid_loader(&mut self) {
        self.reset_results();
        self.loader = Box::new(InvalidConfigLoader);
    }

    /// Installs a loader that succeeds.
    pub fn use_successful_loader(&mut self) {
        self.reset_results();
        self.loader = Box::new(TestConfigLoader::new());
    }

    /// Installs a loader that starts the worker during bootstrap.
    pub fn use_autostart_loader(&mut self) {
        self.reset_results();
        self.loader = Box::new(TestConfigLoader::new().with_autostart());
    }

    /// Adds an embedder handler that echoes its payload under `kind`.
    pub fn add_echo_handler(&mut self, kind: &str) {
        let kind = kind.to_owned();
        let extensions = self.extensions.take().unwrap_or_default();
        self.extensions = Some(extensions.with_handlers(move |builder| {
            builder
                .register(&kind, handler_fn(|event, _| Ok(event.payload().clone())))
                .map(|_| ())
        }));
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.bot.is_some() || self.bootstrap_error.is_some() {
            return;
        }
        let extensions = self.extensions.take().unwrap_or_default();
        match bootstrap_with(&*self.loader, self.reporter.clone(), extensions) {
            Ok(bot) => self.bot = Some(bot),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    /// Dispatches an event of `kind` through the bootstrapped bot.
    pub fn dispatch(&mut self, kind: &str, payload: Value) {
        let bot = self.bot.as_ref().expect("bot should be bootstrapped");
        self.last_response = Some(bot.dispatcher().dispatch(Event::new(kind, payload)));
    }

    /// Dispatches a payload-less event of `kind`.
    pub fn dispatch_kind(&mut self, kind: &str) {
        self.dispatch(kind, json!(null));
    }

    /// Returns whether bootstrap produced an error.
    #[must_use]
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    /// Returns the bootstrapped bot, if any.
    #[must_use]
    pub fn bot(&self) -> Option<&Bot> {
        self.bot.as_ref()
    }

    /// Returns the last dispatched response.
    #[must_use]
    pub fn last_response(&self) -> Option<&Response> {
        self.last_response.as_ref()
    }

    fn reset_results(&mut self) {
        self.shutdown_bot();
        self.bootstrap_error = None;
        self.last_response = None;
    }

    fn shutdown_bot(&mut self) {
        if let Some(bot) = self.bot.take() {
            bot.shutdown();
        }
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestWorld {
    fn drop(&mut self) {
        self.shutdown_bot();
    }
}

/// Default test world fixture.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
