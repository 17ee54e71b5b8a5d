//! Progress reporting and cooperative cancellation.
//!
//! Orchestrators report `(current, total, message)` after every finished
//! unit. Callbacks are invoked from worker tasks; a panicking callback is
//! logged and otherwise ignored so that it can never abort a batch.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Progress callback: `(completed, total, message)`.
pub type ProgressCallback = Arc<dyn Fn(usize, usize, &str) + Send + Sync>;

/// Build a [`ProgressCallback`] from a closure.
pub fn progress_callback<F>(f: F) -> ProgressCallback
where
    F: Fn(usize, usize, &str) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Invoke `callback` if present, swallowing panics.
pub fn notify_progress(callback: Option<&ProgressCallback>, current: usize, total: usize, message: &str) {
    let Some(callback) = callback else {
        return;
    };

    if catch_unwind(AssertUnwindSafe(|| callback(current, total, message))).is_err() {
        warn!(current, total, "progress callback panicked; ignoring");
    }
}

/// Shared flag asking a batch to stop dispatching new units.
///
/// Cancellation is best-effort: units already handed to an engine run to
/// completion or time out, and may still report after `cancel` returns.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a previous request before a new batch starts.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
