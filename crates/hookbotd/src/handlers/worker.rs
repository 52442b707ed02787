//! Periodic background worker driven by the `start` and `stop` handlers.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::state::StatusStore;

const WORKER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::worker");

/// Failure reported by one job cycle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct JobError {
    message: String,
}

impl JobError {
    /// Creates a job error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Work executed once per worker cycle.
pub trait Job: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// Runs one cycle. `cycle` starts at 1 each time the worker starts.
    ///
    /// # Errors
    ///
    /// Returns [`JobError`] when the cycle fails; the worker records the error
    /// and keeps running.
    fn run_cycle(&self, cycle: u64) -> Result<(), JobError>;
}

/// Default job that only logs that the worker is alive.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeartbeatJob;

impl Job for HeartbeatJob {
    fn name(&self) -> &str {
        "heartbeat"
    }

    fn run_cycle(&self, cycle: u64) -> Result<(), JobError> {
        debug!(target: WORKER_TARGET, cycle, "heartbeat");
        Ok(())
    }
}

/// Errors raised while controlling the worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
    /// The worker thread panicked.
    #[error("worker thread panicked")]
    Panicked,
}

/// Whether [`Worker::start`] launched a new thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new worker thread was started.
    Started,
    /// The worker was already running; nothing changed.
    AlreadyRunning,
}

struct Control {
    running: Mutex<bool>,
    wake: Condvar,
}

impl Control {
    fn running(&self) -> MutexGuard<'_, bool> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runs a [`Job`] on a background thread at a fixed interval.
pub struct Worker {
    job: Arc<dyn Job>,
    interval: Duration,
    store: Arc<StatusStore>,
    control: Arc<Control>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    /// Builds a stopped worker.
    #[must_use]
    pub fn new(job: Arc<dyn Job>, interval: Duration, store: Arc<StatusStore>) -> Self {
        Self {
            job,
            interval,
            store,
            control: Arc::new(Control {
                running: Mutex::new(false),
                wake: Condvar::new(),
            }),
            thread: Mutex::new(None),
        }
    }

    /// Returns `true` while the worker thread is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        *self.control.running()
    }

    /// Starts the worker unless it is already running.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Spawn`] when the thread cannot be created.
    pub fn start(&self) -> Result<StartOutcome, WorkerError> {
        let mut thread_slot = self.thread.lock().unwrap_or_else(PoisonError::into_inner);
        {
            let mut running = self.control.running();
            if *running {
                return Ok(StartOutcome::AlreadyRunning);
            }
            *running = true;
        }

        self.store.update(|status| {
            status.status = "running".to_owned();
            status.worker_running = true;
            status.cycles = 0;
            status.uptime_secs = 0;
        });
        let cycle_loop = CycleLoop {
            job: Arc::clone(&self.job),
            interval: self.interval,
            store: Arc::clone(&self.store),
            control: Arc::clone(&self.control),
        };
        match thread::Builder::new()
            .name("hookbot-worker".to_owned())
            .spawn(move || cycle_loop.run())
        {
            Ok(handle) => {
                *thread_slot = Some(handle);
                info!(target: WORKER_TARGET, job = self.job.name(), "worker started");
                Ok(StartOutcome::Started)
            }
            Err(error) => {
                *self.control.running() = false;
                self.store.update(|status| status.worker_running = false);
                Err(WorkerError::Spawn(error))
            }
        }
    }

    /// Stops the worker and waits for its current cycle to finish.
    ///
    /// Returns `true` when a running worker was stopped.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Panicked`] when the worker thread panicked.
    pub fn stop(&self) -> Result<bool, WorkerError> {
        let mut thread_slot = self.thread.lock().unwrap_or_else(PoisonError::into_inner);
        let was_running = {
            let mut running = self.control.running();
            let was_running = *running;
            *running = false;
            was_running
        };
        self.control.wake.notify_all();

        let joined = thread_slot.take().map(JoinHandle::join);
        self.store.update(|status| {
            status.status = "stopped".to_owned();
            status.worker_running = false;
        });
        if was_running {
            info!(target: WORKER_TARGET, job = self.job.name(), "worker stopped");
        }
        match joined {
            Some(Err(_)) => Err(WorkerError::Panicked),
            Some(Ok(())) | None => Ok(was_running),
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        *self.control.running() = false;
        self.control.wake.notify_all();
    }
}

struct CycleLoop {
    job: Arc<dyn Job>,
    interval: Duration,
    store: Arc<StatusStore>,
    control: Arc<Control>,
}

impl CycleLoop {
    fn run(self) {
        let started = Instant::now();
        let mut cycle = 0_u64;
        loop {
            if !*self.control.running() {
                return;
            }
            cycle += 1;
            let outcome = self.job.run_cycle(cycle);
            if let Err(error) = &outcome {
                warn!(
                    target: WORKER_TARGET,
                    job = self.job.name(),
                    cycle,
                    %error,
                    "worker cycle failed"
                );
            }
            self.store.update(|status| {
                status.cycles = cycle;
                status.uptime_secs = started.elapsed().as_secs();
                if let Err(error) = outcome {
                    status.error_count += 1;
                    status.last_error = Some(error.to_string());
                }
            });

            let running = self.control.running();
            let (running, _) = self
                .control
                .wake
                .wait_timeout_while(running, self.interval, |running| *running)
                .unwrap_or_else(PoisonError::into_inner);
            if !*running {
                return;
            }
        }
    }
}
