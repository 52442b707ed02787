//! Test suites for the hookbot daemon.

mod bootstrap_behaviour;
mod dispatch_behaviour;
pub(crate) mod support;
