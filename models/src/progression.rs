use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Outcome-so-far of a synchronization run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunStatus {
    #[default]
    Pending,
    Running,
    Success,
    Failed,
    Stopped,
}

#[derive(Debug, Default)]
struct Inner {
    status: RunStatus,
    total: u64,
    current: u64,
    task: Option<String>,
    message: Option<String>,
}

/// Shared progress record for one synchronization run.
///
/// The caller keeps a clone to read progress or flip the cancel flag; the
/// engine mutates the rest while running. Cancellation is cooperative:
/// the flag is polled at fixed iteration boundaries, nothing is aborted
/// mid-flight.
#[derive(Clone, Debug, Default)]
pub struct Progression {
    inner: Arc<Mutex<Inner>>,
    cancel: Arc<AtomicBool>,
}

impl Progression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> RunStatus {
        self.inner.lock().status
    }

    pub fn set_status(&self, status: RunStatus) {
        self.inner.lock().status = status;
    }

    pub fn total(&self) -> u64 {
        self.inner.lock().total
    }

    pub fn set_total(&self, total: u64) {
        self.inner.lock().total = total;
    }

    /// Progress within `total`, reported as a percentage by the engine.
    pub fn current(&self) -> u64 {
        self.inner.lock().current
    }

    pub fn set_current(&self, current: u64) {
        self.inner.lock().current = current;
    }

    pub fn task(&self) -> Option<String> {
        self.inner.lock().task.clone()
    }

    pub fn set_task(&self, task: impl Into<String>) {
        self.inner.lock().task = Some(task.into());
    }

    pub fn message(&self) -> Option<String> {
        self.inner.lock().message.clone()
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.inner.lock().message = Some(message.into());
    }

    /// Ask the engine to stop at its next check point.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}
