//! Time-bounded execution of blocking engine calls.
//!
//! External engines cannot be interrupted safely, so a call that exceeds its
//! bound is abandoned rather than killed: the caller gets
//! [`HandlerError::Timeout`] and the worker thread is left to finish (or hang)
//! on its own.

use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::warn;

use super::HandlerError;

/// Run a blocking call on its own thread and wait at most `limit` for it.
///
/// A panic inside `call` is reported as [`HandlerError::Corrupted`]; it never
/// propagates to the caller.
///
/// # Errors
///
/// Returns the call's own error, [`HandlerError::Timeout`] when the bound is
/// exceeded, or [`HandlerError::Corrupted`] when the worker could not be
/// started or panicked.
pub async fn run_with_timeout<T, F>(limit: Duration, label: &str, call: F) -> Result<T, HandlerError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, HandlerError> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();

    thread::Builder::new()
        .name(format!("batchprint-{label}"))
        .spawn(move || {
            // Receiver may be gone after a timeout.
            let _ = tx.send(call());
        })
        .map_err(|e| HandlerError::corrupted(format!("failed to start worker: {e}")))?;

    match tokio::time::timeout(limit, rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(HandlerError::corrupted(format!(
            "{label}: engine call panicked"
        ))),
        Err(_) => {
            warn!(unit = label, limit_secs = limit.as_secs_f64(), "unit timed out, abandoning engine call");
            Err(HandlerError::Timeout { after: limit })
        }
    }
}
