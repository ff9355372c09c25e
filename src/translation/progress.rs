/*!
 * Rate-limited progress reporting.
 *
 * Workers call [`ProgressReporter::report`] after every completed cell; the
 * consumer callback only runs every `interval` cells and once at the end.
 */

use log::error;
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Snapshot handed to the progress callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub current: usize,
    pub total: usize,
    pub finished: bool,
}

impl ProgressUpdate {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.current as f64 * 100.0 / self.total as f64
    }
}

/// Consumer of progress updates, invoked from worker tasks
pub type ProgressCallback = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;

#[derive(Debug, Default)]
struct ReporterState {
    last_reported: usize,
}

/// Bridge between workers and a single progress consumer
pub struct ProgressReporter {
    interval: usize,
    state: Mutex<ReporterState>,
    callback: Mutex<Option<ProgressCallback>>,
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("interval", &self.interval)
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl ProgressReporter {
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            state: Mutex::new(ReporterState::default()),
            callback: Mutex::new(None),
        }
    }

    /// Create a reporter with a callback already installed
    pub fn with_callback(interval: usize, callback: ProgressCallback) -> Self {
        let reporter = Self::new(interval);
        reporter.set_callback(callback);
        reporter
    }

    /// Replace the consumer; the previous one stops receiving updates
    pub fn set_callback(&self, callback: ProgressCallback) {
        *self.callback.lock() = Some(callback);
    }

    pub fn clear_callback(&self) {
        *self.callback.lock() = None;
    }

    /// Forget the last reported count before a new run
    pub fn reset(&self) {
        self.state.lock().last_reported = 0;
    }

    /// Report progress; returns whether the callback was due.
    pub fn report(&self, current: usize, total: usize, finished: bool) -> bool {
        {
            let mut state = self.state.lock();
            let due = finished || current.saturating_sub(state.last_reported) >= self.interval;
            if !due {
                return false;
            }
            state.last_reported = state.last_reported.max(current);
        }

        let callback = self.callback.lock().clone();
        if let Some(callback) = callback {
            let update = ProgressUpdate { current, total, finished };
            if catch_unwind(AssertUnwindSafe(|| callback(update))).is_err() {
                error!("Progress callback panicked at {}/{}", current, total);
            }
        }
        true
    }
}
