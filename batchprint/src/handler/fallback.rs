//! Ordered strategy chains with guaranteed cleanup.
//!
//! Every handler follows the same protocol: try the most reliable strategy,
//! fall back to the next one on failure, and release whatever the strategy
//! acquired no matter how it ended. [`FallbackChain`] captures that once.
//!
//! # Examples
//!
//! ```
//! use batchprint::handler::{FallbackChain, HandlerError};
//!
//! let result = FallbackChain::new("report.pptx")
//!     .attempt("static reader", || Err(HandlerError::corrupted("no slides part")))
//!     .attempt("automation", || Ok(12))
//!     .run();
//!
//! assert_eq!(result, Ok(12));
//! ```

use tracing::{debug, warn};

use super::HandlerError;

type Strategy<'a, T> = Box<dyn FnOnce() -> Result<T, HandlerError> + 'a>;
type Cleanup<'a> = Box<dyn FnOnce() + 'a>;

struct Attempt<'a, T> {
    name: &'static str,
    run: Strategy<'a, T>,
    cleanup: Option<Cleanup<'a>>,
}

/// Runs a cleanup closure when dropped, including during unwinding.
struct CleanupGuard<'a>(Option<Cleanup<'a>>);

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        if let Some(cleanup) = self.0.take() {
            cleanup();
        }
    }
}

/// An ordered list of strategies for one operation on one file.
///
/// Strategies run in insertion order until one succeeds. Failure handling:
///
/// - [`HandlerError::Encrypted`] stops the chain immediately; no other
///   strategy can open a file that needs a password.
/// - Otherwise the last error from a strategy that actually ran is returned.
///   [`HandlerError::MissingDependency`] only wins when every strategy
///   reported it, since it says nothing about the file itself.
/// - An empty chain fails with [`HandlerError::MissingDependency`].
///
/// Each strategy may carry a cleanup closure that runs after the strategy
/// returns, fails, or panics.
pub struct FallbackChain<'a, T> {
    subject: String,
    attempts: Vec<Attempt<'a, T>>,
}

impl<'a, T> FallbackChain<'a, T> {
    /// Create an empty chain for `subject` (usually a file name, used in logs).
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            attempts: Vec::new(),
        }
    }

    /// Append a strategy without cleanup.
    pub fn attempt<F>(mut self, name: &'static str, run: F) -> Self
    where
        F: FnOnce() -> Result<T, HandlerError> + 'a,
    {
        self.attempts.push(Attempt {
            name,
            run: Box::new(run),
            cleanup: None,
        });
        self
    }

    /// Append a strategy whose `cleanup` always runs once it has been started.
    pub fn attempt_with_cleanup<F, C>(mut self, name: &'static str, run: F, cleanup: C) -> Self
    where
        F: FnOnce() -> Result<T, HandlerError> + 'a,
        C: FnOnce() + 'a,
    {
        self.attempts.push(Attempt {
            name,
            run: Box::new(run),
            cleanup: Some(Box::new(cleanup)),
        });
        self
    }

    /// Append a strategy only when `enabled` is true.
    pub fn attempt_if<F>(self, enabled: bool, name: &'static str, run: F) -> Self
    where
        F: FnOnce() -> Result<T, HandlerError> + 'a,
    {
        if enabled { self.attempt(name, run) } else { self }
    }

    /// Number of strategies in the chain.
    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    /// Whether the chain has no strategies.
    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    /// Run strategies in order until one succeeds.
    ///
    /// # Errors
    ///
    /// See the type-level documentation for which error is reported.
    pub fn run(self) -> Result<T, HandlerError> {
        let Self { subject, attempts } = self;
        let total = attempts.len();
        let mut last_error: Option<HandlerError> = None;

        for (index, attempt) in attempts.into_iter().enumerate() {
            let outcome = {
                let _guard = CleanupGuard(attempt.cleanup);
                (attempt.run)()
            };

            match outcome {
                Ok(value) => {
                    if index > 0 {
                        debug!(subject = %subject, strategy = attempt.name, "fallback strategy succeeded");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_terminal() => {
                    debug!(subject = %subject, strategy = attempt.name, error = %err, "stopping fallback chain");
                    return Err(err);
                }
                Err(err) => {
                    if index + 1 < total {
                        warn!(subject = %subject, strategy = attempt.name, error = %err, "strategy failed, trying next");
                    } else {
                        debug!(subject = %subject, strategy = attempt.name, error = %err, "last strategy failed");
                    }
                    let keep_previous = matches!(err, HandlerError::MissingDependency { .. })
                        && last_error
                            .as_ref()
                            .is_some_and(|prev| !matches!(prev, HandlerError::MissingDependency { .. }));
                    if !keep_previous {
                        last_error = Some(err);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| HandlerError::missing("no strategy available")))
    }
}
