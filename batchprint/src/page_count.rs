//! Page counting across a document set.
//!
//! Each document moves through a small state machine:
//!
//! ```text
//! UNKNOWN -> skip check -> SKIPPED_*                 (terminal)
//!                       -> CALCULATING -> SUCCESS     (terminal)
//!                                      -> SKIPPED_* | ERROR (terminal)
//! ```
//!
//! The skip check runs before any handler so that missing, unreadable or
//! oversized files never occupy a worker. Eligible documents run on a
//! bounded pool, each under its own time limit.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{AppConfig, TimeoutPolicy};
use crate::document::{Document, FileType};
use crate::handler::{HandlerError, HandlerRegistry, run_with_timeout};
use crate::notify::{CancelToken, ProgressCallback, notify_progress};
use crate::utils::{format_file_size, truncate_message};

/// Longest message kept on a result.
pub const MAX_MESSAGE_CHARS: usize = 150;

/// Default number of concurrent counting units.
pub const DEFAULT_WORKERS: usize = 4;

/// Default size ceiling for page counting.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// State of one document's page count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageCountStatus {
    /// Not processed; also the state of documents dropped by cancellation.
    Unknown,
    /// Handed to a handler.
    Calculating,
    /// Counted.
    Success,
    /// Above the size ceiling.
    SkippedLarge,
    /// Password protected or access denied by the engine.
    SkippedEncrypted,
    /// Malformed or unreadable.
    SkippedDamaged,
    /// Missing or unreadable before any engine was started.
    SkippedNoAccess,
    /// The required engine is not installed.
    SkippedNoOffice,
    /// No handler, an invalid count, or a timeout.
    Error,
}

impl PageCountStatus {
    /// Every status, in display order.
    pub const ALL: [PageCountStatus; 9] = [
        Self::Unknown,
        Self::Calculating,
        Self::Success,
        Self::SkippedLarge,
        Self::SkippedEncrypted,
        Self::SkippedDamaged,
        Self::SkippedNoAccess,
        Self::SkippedNoOffice,
        Self::Error,
    ];

    /// Whether this is one of the skip outcomes.
    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            Self::SkippedLarge
                | Self::SkippedEncrypted
                | Self::SkippedDamaged
                | Self::SkippedNoAccess
                | Self::SkippedNoOffice
        )
    }

    /// Whether no further transition can happen.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Unknown | Self::Calculating)
    }

    /// Status a handler failure maps to.
    pub fn from_handler_error(error: &HandlerError) -> Self {
        match error {
            HandlerError::Encrypted { .. } => Self::SkippedEncrypted,
            HandlerError::Corrupted { .. } => Self::SkippedDamaged,
            HandlerError::MissingDependency { .. } => Self::SkippedNoOffice,
            HandlerError::Timeout { .. } | HandlerError::InvalidCount { .. } => Self::Error,
        }
    }

    /// Short label for reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Calculating => "calculating",
            Self::Success => "success",
            Self::SkippedLarge => "skipped (too large)",
            Self::SkippedEncrypted => "skipped (encrypted)",
            Self::SkippedDamaged => "skipped (damaged)",
            Self::SkippedNoAccess => "skipped (no access)",
            Self::SkippedNoOffice => "skipped (engine missing)",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for PageCountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Page count outcome for one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageCountResult {
    /// Identifier of the counted document.
    pub document_id: Uuid,
    /// Path of the counted document.
    pub path: PathBuf,
    /// File name for display.
    pub file_name: String,
    /// Type of the document.
    pub file_type: FileType,
    /// Pages, set only on success.
    pub pages: Option<u32>,
    /// Whether `pages` is an estimate.
    pub approximate: bool,
    /// Current state.
    pub status: PageCountStatus,
    /// Short reason for a skip or error.
    pub message: Option<String>,
    /// Time spent on this document.
    pub elapsed: Duration,
}

impl PageCountResult {
    /// Fresh result in the `Unknown` state.
    pub fn new(document: &Document) -> Self {
        Self {
            document_id: document.id(),
            path: document.path().to_path_buf(),
            file_name: document.file_name().to_string(),
            file_type: document.file_type(),
            pages: None,
            approximate: false,
            status: PageCountStatus::Unknown,
            message: None,
            elapsed: Duration::ZERO,
        }
    }

    fn finish(mut self, status: PageCountStatus, message: impl AsRef<str>) -> Self {
        self.status = status;
        self.message = Some(truncate_message(message.as_ref(), MAX_MESSAGE_CHARS));
        self
    }

    fn cancelled(document: &Document) -> Self {
        Self::new(document).finish(PageCountStatus::Unknown, "cancelled")
    }

    /// Whether the document was counted.
    pub fn is_success(&self) -> bool {
        self.status == PageCountStatus::Success
    }
}

/// Files and pages of one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TypeTotals {
    /// Successfully counted files.
    pub files: usize,
    /// Pages in those files.
    pub pages: u64,
}

/// Read-only snapshot of a finished page-count batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageCountSummary {
    /// Documents submitted.
    pub total_files: usize,
    /// Documents counted.
    pub success_count: usize,
    /// Pages across counted documents.
    pub total_pages: u64,
    /// Whether any counted document was estimated.
    pub approximate: bool,
    /// Totals per type, for all six types.
    pub by_type: BTreeMap<FileType, TypeTotals>,
    /// Number of results per status.
    pub status_counts: BTreeMap<PageCountStatus, usize>,
    /// Skipped results, in document order.
    pub skipped: Vec<PageCountResult>,
    /// Failed results, in document order.
    pub errors: Vec<PageCountResult>,
    /// Documents never dispatched because the batch was cancelled.
    pub cancelled: Vec<PageCountResult>,
    /// Every result, in document order.
    pub results: Vec<PageCountResult>,
    /// Wall time of the batch.
    pub elapsed: Duration,
}

impl PageCountSummary {
    /// Aggregate results. Only successful results contribute to totals.
    pub fn from_results(results: Vec<PageCountResult>, elapsed: Duration) -> Self {
        let mut by_type: BTreeMap<FileType, TypeTotals> =
            FileType::ALL.iter().map(|ft| (*ft, TypeTotals::default())).collect();
        let mut status_counts: BTreeMap<PageCountStatus, usize> = BTreeMap::new();
        let mut total_pages = 0u64;
        let mut success_count = 0;
        let mut approximate = false;
        let mut skipped = Vec::new();
        let mut errors = Vec::new();
        let mut cancelled = Vec::new();

        for result in &results {
            *status_counts.entry(result.status).or_default() += 1;

            match result.status {
                PageCountStatus::Success => {
                    let pages = u64::from(result.pages.unwrap_or(0));
                    success_count += 1;
                    total_pages += pages;
                    approximate |= result.approximate;
                    let totals = by_type.entry(result.file_type).or_default();
                    totals.files += 1;
                    totals.pages += pages;
                }
                PageCountStatus::Error => errors.push(result.clone()),
                status if status.is_skipped() => skipped.push(result.clone()),
                _ => cancelled.push(result.clone()),
            }
        }

        Self {
            total_files: results.len(),
            success_count,
            total_pages,
            approximate,
            by_type,
            status_counts,
            skipped,
            errors,
            cancelled,
            results,
            elapsed,
        }
    }

    /// Number of results with `status`.
    pub fn count(&self, status: PageCountStatus) -> usize {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }

    /// Number of skipped documents.
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Number of failed documents.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Whether the batch was cut short.
    pub fn was_cancelled(&self) -> bool {
        !self.cancelled.is_empty()
    }

    /// One-line description of the batch.
    pub fn describe(&self) -> String {
        let pages = if self.approximate {
            format!("~{}", self.total_pages)
        } else {
            self.total_pages.to_string()
        };
        format!(
            "{} of {} file(s) counted: {} page(s), {} skipped, {} error(s)",
            self.success_count,
            self.total_files,
            pages,
            self.skipped_count(),
            self.error_count()
        )
    }
}

/// Counts pages of many documents on a bounded pool.
pub struct PageCountManager {
    registry: Arc<HandlerRegistry>,
    workers: usize,
    max_file_size: u64,
    timeouts: TimeoutPolicy,
    cancel: CancelToken,
    progress: Option<ProgressCallback>,
}

impl PageCountManager {
    /// Create a manager with default limits.
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            registry,
            workers: DEFAULT_WORKERS,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            timeouts: TimeoutPolicy::default(),
            cancel: CancelToken::new(),
            progress: None,
        }
    }

    /// Create a manager with the limits from `config`.
    pub fn from_config(registry: Arc<HandlerRegistry>, config: &AppConfig) -> Self {
        Self::new(registry)
            .with_workers(config.effective_workers())
            .with_max_file_size(config.max_file_size_bytes())
            .with_timeouts(config.timeouts.clone())
    }

    /// Set the number of concurrent units (at least one).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the size ceiling in bytes.
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Set per-type time limits.
    pub fn with_timeouts(mut self, timeouts: TimeoutPolicy) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Report progress after every finished document.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Token that stops dispatch of further documents.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Request cancellation of the running batch.
    pub fn cancel(&self) {
        info!("page count cancellation requested");
        self.cancel.cancel();
    }

    /// Pre-flight check; returns a terminal result when the document must
    /// not reach a handler.
    pub fn check_skip(&self, document: &Document) -> Option<PageCountResult> {
        let path = document.path();
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => {
                return Some(PageCountResult::new(document).finish(PageCountStatus::SkippedNoAccess, "Not a file"));
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "file not accessible");
                return Some(
                    PageCountResult::new(document)
                        .finish(PageCountStatus::SkippedNoAccess, "File is missing or not accessible"),
                );
            }
        };

        if metadata.len() > self.max_file_size {
            let message = format!(
                "File is {} (limit {})",
                format_file_size(metadata.len()),
                format_file_size(self.max_file_size)
            );
            return Some(PageCountResult::new(document).finish(PageCountStatus::SkippedLarge, message));
        }

        if let Err(e) = File::open(path) {
            debug!(path = %path.display(), error = %e, "file not readable");
            return Some(PageCountResult::new(document).finish(PageCountStatus::SkippedNoAccess, "File cannot be read"));
        }

        None
    }

    /// Count the pages of one document.
    pub async fn calculate(&self, document: &Document) -> PageCountResult {
        let start = Instant::now();
        if let Some(mut skipped) = self.check_skip(document) {
            debug!(file = document.file_name(), status = %skipped.status, "skipping document");
            skipped.elapsed = start.elapsed();
            return skipped;
        }

        let mut result = PageCountResult::new(document);
        let Some(handler) = self.registry.resolve_by_path(document.path()) else {
            warn!(file = document.file_name(), "no handler registered");
            let mut failed = result.finish(PageCountStatus::Error, "No handler for this file type");
            failed.elapsed = start.elapsed();
            return failed;
        };

        result.status = PageCountStatus::Calculating;
        let limit = self.timeouts.limit_for(document.file_type());
        let label = format!("count-{}", handler.name());
        let path = document.path().to_path_buf();

        let outcome = run_with_timeout(limit, &label, move || handler.count_pages(&path)).await;
        let mut result = match outcome {
            Ok(count) => {
                debug!(file = document.file_name(), pages = count.pages(), approximate = count.is_approximate(), "counted");
                result.status = PageCountStatus::Success;
                result.pages = Some(count.pages());
                result.approximate = count.is_approximate();
                result
            }
            Err(err) => {
                let status = PageCountStatus::from_handler_error(&err);
                warn!(file = document.file_name(), %status, error = %err, "page count failed");
                result.finish(status, err.user_message())
            }
        };
        result.elapsed = start.elapsed();
        result
    }

    /// Count every document and aggregate the results.
    ///
    /// Documents run concurrently on at most the configured number of
    /// workers. One document's failure never affects another. After
    /// [`cancel`](Self::cancel), documents not yet dispatched are reported as
    /// `Unknown` with a "cancelled" message.
    pub async fn calculate_all(&self, documents: &[Document]) -> PageCountSummary {
        let start = Instant::now();
        let total = documents.len();
        self.cancel.reset();
        info!(total, workers = self.workers, "starting page count");

        let tasks = documents.iter().enumerate().map(|(index, document)| async move {
            if self.cancel.is_cancelled() {
                return (index, PageCountResult::cancelled(document));
            }
            (index, self.calculate(document).await)
        });

        let mut pending = stream::iter(tasks).buffer_unordered(self.workers);
        let mut indexed = Vec::with_capacity(total);
        let mut completed = 0;

        while let Some((index, result)) = pending.next().await {
            if result.status.is_terminal() {
                completed += 1;
                notify_progress(self.progress.as_ref(), completed, total, &result.file_name);
            }
            indexed.push((index, result));
        }

        indexed.sort_by_key(|(index, _)| *index);
        let results = indexed.into_iter().map(|(_, result)| result).collect();
        let summary = PageCountSummary::from_results(results, start.elapsed());

        if summary.was_cancelled() {
            warn!(not_started = summary.cancelled.len(), "page count cancelled");
        }
        info!(
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "{}",
            summary.describe()
        );
        summary
    }
}

impl fmt::Debug for PageCountManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageCountManager")
            .field("registry", &self.registry)
            .field("workers", &self.workers)
            .field("max_file_size", &self.max_file_size)
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}
