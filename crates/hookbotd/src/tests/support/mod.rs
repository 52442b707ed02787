//! Test harness utilities shared by the behavioural suites.

mod config_loader;
mod reporter;
mod shutdown;
mod world;

pub use config_loader::{FailingConfigLoader, InvalidConfigLoader, TestConfigLoader};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use shutdown::TestShutdownSignal;
pub use world::{TestWorld, world};
