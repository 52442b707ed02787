//! Execution lanes for handler invocations.
//!
//! Events without a session run on their own thread. Events that share a
//! session identifier are queued onto one lane thread so they are handled in
//! the order they were submitted. A lane retires once it has been idle for the
//! configured period; the next event for that session starts a fresh lane.
//! The number of live lanes is capped; a new session beyond the cap is refused
//! until an existing lane retires.

use std::collections::HashMap;
use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::debug;

use super::DISPATCH_TARGET;

/// Default cap on concurrently live session lanes.
pub(crate) const DEFAULT_MAX_LANES: usize = 1024;

/// Thread name shared by every lane; session ids are client input.
const LANE_THREAD_NAME: &str = "hookbot-session";

/// Unit of work executed on a lane.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Schedules jobs either on dedicated threads or on per-session lanes.
#[derive(Clone)]
pub(crate) struct SessionLanes {
    inner: Arc<LanesInner>,
}

struct LanesInner {
    lanes: Mutex<HashMap<String, Sender<Job>>>,
    idle: Duration,
    max_lanes: usize,
}

impl SessionLanes {
    pub(crate) fn new(idle: Duration) -> Self {
        Self::with_limit(idle, DEFAULT_MAX_LANES)
    }

    /// Lanes that refuse new sessions once `max_lanes` are live.
    pub(crate) fn with_limit(idle: Duration, max_lanes: usize) -> Self {
        Self {
            inner: Arc::new(LanesInner {
                lanes: Mutex::new(HashMap::new()),
                idle,
                max_lanes,
            }),
        }
    }

    pub(crate) fn idle(&self) -> Duration {
        self.inner.idle
    }

    /// Runs `job` on its own thread, or on the lane for `session`.
    pub(crate) fn submit(&self, session: Option<&str>, job: Job) -> io::Result<()> {
        match session {
            None => thread::Builder::new()
                .name("hookbot-handler".to_owned())
                .spawn(job)
                .map(drop),
            Some(session) => self.submit_to_lane(session, job),
        }
    }

    /// Number of live lanes.
    #[cfg(test)]
    pub(crate) fn active_lanes(&self) -> usize {
        self.inner
            .lanes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn submit_to_lane(&self, session: &str, job: Job) -> io::Result<()> {
        // The map lock is held across send and spawn so a retiring lane cannot
        // drop a job queued between its idle check and its removal.
        let mut lanes = self
            .inner
            .lanes
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let job = match lanes.get(session) {
            Some(sender) => match sender.send(job) {
                Ok(()) => return Ok(()),
                Err(mpsc::SendError(returned)) => returned,
            },
            None => job,
        };

        // A lane whose receiver has gone is replaced below, so only sessions
        // without any entry count against the cap.
        if !lanes.contains_key(session) && lanes.len() >= self.inner.max_lanes {
            debug!(target: DISPATCH_TARGET, session, "session lane limit reached");
            return Err(io::Error::other(format!(
                "session lane limit of {} reached",
                self.inner.max_lanes
            )));
        }

        let (sender, receiver) = mpsc::channel();
        if sender.send(job).is_err() {
            return Err(io::Error::other("lane receiver dropped before start"));
        }
        let inner = Arc::clone(&self.inner);
        let name = session.to_owned();
        thread::Builder::new()
            .name(LANE_THREAD_NAME.to_owned())
            .spawn(move || run_lane(&inner, &name, &receiver))?;
        lanes.insert(session.to_owned(), sender);
        debug!(target: DISPATCH_TARGET, session, "session lane started");
        Ok(())
    }
}

fn run_lane(inner: &LanesInner, session: &str, receiver: &Receiver<Job>) {
    loop {
        match receiver.recv_timeout(inner.idle) {
            Ok(job) => job(),
            Err(RecvTimeoutError::Timeout) => {
                let mut lanes = inner.lanes.lock().unwrap_or_else(PoisonError::into_inner);
                if let Ok(job) = receiver.try_recv() {
                    drop(lanes);
                    job();
                    continue;
                }
                lanes.remove(session);
                debug!(target: DISPATCH_TARGET, session, "session lane retired");
                return;
            }
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}
