//! Sequential batch printing.
//!
//! A [`PrintController`] owns the print queue and runs at most one batch at
//! a time on the tokio runtime. A batch:
//!
//! 1. switches the target printer to the batch settings, if a printer is named;
//! 2. prints every queued document in order, `Pending -> Printing ->
//!    Completed | Error`, pausing briefly between jobs so the spooler keeps up;
//! 3. reports progress after each document and once more at the end;
//! 4. restores the printer's original settings, whatever happened before.
//!
//! A failing or panicking handler only fails its own document.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{AppConfig, PrintSettings, TimeoutPolicy};
use crate::document::{Document, DocumentSet, FileType, ImportReport, PrintStatus};
use crate::handler::{HandlerRegistry, run_with_timeout};
use crate::notify::{CancelToken, ProgressCallback, notify_progress};
use crate::page_count::MAX_MESSAGE_CHARS;
use crate::printer::PrinterConfigManager;
use crate::utils::truncate_message;
use crate::{BatchPrintError, Result};

/// Default pause between two print jobs.
pub const DEFAULT_DOCUMENT_DELAY: Duration = Duration::from_millis(500);

/// Queue counts by print status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    /// Documents in the queue.
    pub total: usize,
    /// Waiting to be printed.
    pub pending: usize,
    /// Being submitted right now.
    pub printing: usize,
    /// Submitted successfully.
    pub completed: usize,
    /// Failed.
    pub error: usize,
    /// Whether a batch is running.
    pub is_printing: bool,
}

/// A document that failed to print.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrintFailure {
    /// Queue identifier of the document.
    pub document_id: Uuid,
    /// File name shown to the user.
    pub file_name: String,
    /// Short reason.
    pub message: String,
}

/// Outcome of a finished batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Documents in the batch.
    pub total: usize,
    /// Documents submitted successfully.
    pub completed: usize,
    /// Documents that failed.
    pub failed: usize,
    /// Documents left pending because the batch was cancelled.
    pub not_started: usize,
    /// Wall-clock duration of the batch.
    pub elapsed: Duration,
    /// One entry per failed document, in queue order.
    pub failures: Vec<PrintFailure>,
}

impl BatchReport {
    /// Whether every document was submitted.
    pub fn is_success(&self) -> bool {
        self.completed == self.total
    }

    /// Whether the batch stopped before the end of the queue.
    pub fn was_cancelled(&self) -> bool {
        self.not_started > 0
    }

    /// One-line summary.
    pub fn describe(&self) -> String {
        let mut text = format!(
            "Printed {} of {} documents, {} failed",
            self.completed, self.total, self.failed
        );
        if self.was_cancelled() {
            text.push_str(&format!(", {} not started (cancelled)", self.not_started));
        }
        text
    }
}

/// Handle to a running batch.
///
/// Dropping the handle does not stop the batch.
#[derive(Debug)]
pub struct BatchHandle {
    task: JoinHandle<BatchReport>,
}

impl BatchHandle {
    /// Whether the batch has finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the batch to finish.
    ///
    /// # Errors
    ///
    /// Returns [`BatchPrintError::Other`] if the batch task itself died.
    pub async fn wait(self) -> Result<BatchReport> {
        self.task
            .await
            .map_err(|e| BatchPrintError::other(format!("print batch aborted: {e}")))
    }
}

struct Shared {
    queue: Mutex<DocumentSet>,
    printing: AtomicBool,
    cancel: CancelToken,
}

impl Shared {
    fn queue(&self) -> MutexGuard<'_, DocumentSet> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update(&self, id: Uuid, f: impl FnOnce(&mut Document)) {
        if let Some(document) = self.queue().get_mut(id) {
            f(document);
        }
    }
}

/// Clears the in-flight flag when the batch task ends, including by panic.
struct PrintingGuard(Arc<Shared>);

impl Drop for PrintingGuard {
    fn drop(&mut self) {
        self.0.printing.store(false, Ordering::SeqCst);
    }
}

struct Job {
    id: Uuid,
    path: PathBuf,
    file_name: String,
    file_type: FileType,
}

/// Everything the batch task needs, detached from the controller.
struct BatchRun {
    registry: Arc<HandlerRegistry>,
    printers: Arc<PrinterConfigManager>,
    shared: Arc<Shared>,
    settings: PrintSettings,
    delay: Duration,
    timeouts: TimeoutPolicy,
    progress: Option<ProgressCallback>,
    jobs: Vec<Job>,
}

/// Print queue and batch driver.
pub struct PrintController {
    registry: Arc<HandlerRegistry>,
    printers: Arc<PrinterConfigManager>,
    shared: Arc<Shared>,
    settings: Mutex<Option<PrintSettings>>,
    delay: Duration,
    timeouts: TimeoutPolicy,
    progress: Option<ProgressCallback>,
}

impl PrintController {
    /// Create a controller with an empty queue and no settings.
    pub fn new(registry: Arc<HandlerRegistry>, printers: Arc<PrinterConfigManager>) -> Self {
        Self {
            registry,
            printers,
            shared: Arc::new(Shared {
                queue: Mutex::new(DocumentSet::new()),
                printing: AtomicBool::new(false),
                cancel: CancelToken::new(),
            }),
            settings: Mutex::new(None),
            delay: DEFAULT_DOCUMENT_DELAY,
            timeouts: TimeoutPolicy::default(),
            progress: None,
        }
    }

    /// Create a controller with the delay and time limits from `config`.
    pub fn from_config(
        registry: Arc<HandlerRegistry>,
        printers: Arc<PrinterConfigManager>,
        config: &AppConfig,
    ) -> Self {
        Self::new(registry, printers)
            .with_delay(config.document_delay())
            .with_timeouts(config.timeouts.clone())
    }

    /// Set the pause between two print jobs.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set per-type time limits for a single print job.
    pub fn with_timeouts(mut self, timeouts: TimeoutPolicy) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Report progress after every document.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    fn settings_slot(&self) -> MutexGuard<'_, Option<PrintSettings>> {
        self.settings.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Settings used by the next batch.
    pub fn set_settings(&self, settings: PrintSettings) {
        *self.settings_slot() = Some(settings);
    }

    /// Current settings, if any were set.
    pub fn settings(&self) -> Option<PrintSettings> {
        self.settings_slot().clone()
    }

    /// Enqueue a file.
    ///
    /// # Errors
    ///
    /// Returns [`BatchPrintError::DuplicateDocument`] if the file is already
    /// queued, or any error from [`Document::new`].
    pub fn add_document(&self, path: impl Into<PathBuf>) -> Result<Uuid> {
        let mut queue = self.shared.queue();
        Ok(queue.add_file(path)?.id())
    }

    /// Enqueue several files, collecting per-path failures.
    pub fn add_documents<I, P>(&self, paths: I) -> ImportReport
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.shared.queue().add_files(paths)
    }

    /// Remove a queued document.
    ///
    /// # Errors
    ///
    /// Returns [`BatchPrintError::BatchInProgress`] while a batch is running.
    pub fn remove_document(&self, id: Uuid) -> Result<Option<Document>> {
        if self.is_printing() {
            return Err(BatchPrintError::BatchInProgress);
        }
        Ok(self.shared.queue().remove(id))
    }

    /// Empty the queue.
    ///
    /// # Errors
    ///
    /// Returns [`BatchPrintError::BatchInProgress`] while a batch is running.
    pub fn clear_queue(&self) -> Result<()> {
        if self.is_printing() {
            return Err(BatchPrintError::BatchInProgress);
        }
        self.shared.queue().clear();
        Ok(())
    }

    /// Snapshot of the queue in print order.
    pub fn documents(&self) -> Vec<Document> {
        self.shared.queue().documents().to_vec()
    }

    /// Number of queued documents.
    pub fn queue_len(&self) -> usize {
        self.shared.queue().len()
    }

    /// Whether a batch is running.
    pub fn is_printing(&self) -> bool {
        self.shared.printing.load(Ordering::SeqCst)
    }

    /// Token that stops the running batch before its next document.
    pub fn cancel_token(&self) -> CancelToken {
        self.shared.cancel.clone()
    }

    /// Ask the running batch to stop after the current document.
    ///
    /// The document being printed is not interrupted; the rest stay pending.
    pub fn cancel(&self) {
        if self.is_printing() {
            info!("print cancellation requested");
            self.shared.cancel.cancel();
        }
    }

    /// Counts by print status.
    pub fn get_queue_status(&self) -> QueueStatus {
        let queue = self.shared.queue();
        let mut status = QueueStatus {
            total: queue.len(),
            is_printing: self.is_printing(),
            ..QueueStatus::default()
        };
        for document in queue.iter() {
            match document.status() {
                PrintStatus::Pending => status.pending += 1,
                PrintStatus::Printing => status.printing += 1,
                PrintStatus::Completed => status.completed += 1,
                PrintStatus::Error => status.error += 1,
            }
        }
        status
    }

    /// Start printing the queue in the background.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`BatchPrintError::EmptyQueue`] if nothing is queued.
    /// - [`BatchPrintError::MissingSettings`] if no settings were set.
    /// - [`BatchPrintError::BatchInProgress`] if a batch is already running;
    ///   the running batch is not affected.
    pub fn start_batch_print(&self) -> Result<BatchHandle> {
        let (jobs, settings) = {
            let mut queue = self.shared.queue();
            if queue.is_empty() {
                return Err(BatchPrintError::EmptyQueue);
            }
            let settings = self.settings().ok_or(BatchPrintError::MissingSettings)?;
            // Under the queue lock `printing` can only drop to false, so a
            // stale request is cleared without touching a running batch.
            if self.is_printing() {
                return Err(BatchPrintError::BatchInProgress);
            }
            self.shared.cancel.reset();
            if self
                .shared
                .printing
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return Err(BatchPrintError::BatchInProgress);
            }

            let ids: Vec<Uuid> = queue.iter().map(Document::id).collect();
            let mut jobs = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(document) = queue.get_mut(id) {
                    document.set_status(PrintStatus::Pending);
                    jobs.push(Job {
                        id,
                        path: document.path().to_path_buf(),
                        file_name: document.file_name().to_string(),
                        file_type: document.file_type(),
                    });
                }
            }
            (jobs, settings)
        };

        info!(documents = jobs.len(), printer = settings.printer_name().unwrap_or("(default)"), "starting print batch");

        let run = BatchRun {
            registry: self.registry.clone(),
            printers: self.printers.clone(),
            shared: self.shared.clone(),
            settings,
            delay: self.delay,
            timeouts: self.timeouts.clone(),
            progress: self.progress.clone(),
            jobs,
        };
        let guard = PrintingGuard(self.shared.clone());
        let task = tokio::spawn(async move {
            let _guard = guard;
            run.execute().await
        });
        Ok(BatchHandle { task })
    }
}

impl BatchRun {
    async fn execute(self) -> BatchReport {
        let start = Instant::now();
        let total = self.jobs.len();
        let printer = self.settings.printer_name().map(str::to_string);

        if let Some(printer) = &printer {
            self.apply_printer(printer).await;
        }

        let mut report = BatchReport {
            total,
            ..BatchReport::default()
        };

        for (index, job) in self.jobs.iter().enumerate() {
            if self.shared.cancel.is_cancelled() {
                report.not_started = total - index;
                warn!(not_started = report.not_started, "print batch cancelled");
                break;
            }

            if index > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            self.shared.update(job.id, |d| d.set_status(PrintStatus::Printing));
            let outcome = self.print_one(job).await;

            let label = match outcome {
                Ok(()) => {
                    report.completed += 1;
                    self.shared.update(job.id, |d| d.set_status(PrintStatus::Completed));
                    info!(file = %job.file_name, "printed");
                    PrintStatus::Completed
                }
                Err(message) => {
                    report.failed += 1;
                    warn!(file = %job.file_name, reason = %message, "print failed");
                    self.shared.update(job.id, |d| d.fail(message.clone()));
                    report.failures.push(PrintFailure {
                        document_id: job.id,
                        file_name: job.file_name.clone(),
                        message,
                    });
                    PrintStatus::Error
                }
            };

            notify_progress(
                self.progress.as_ref(),
                index + 1,
                total,
                &format!("{}: {label}", job.file_name),
            );
        }

        if let Some(printer) = &printer {
            self.restore_printer(printer).await;
        }

        report.elapsed = start.elapsed();
        notify_progress(self.progress.as_ref(), total, total, &report.describe());
        info!(elapsed_ms = report.elapsed.as_millis() as u64, "{}", report.describe());
        report
    }

    async fn apply_printer(&self, printer: &str) {
        let printers = self.printers.clone();
        let settings = self.settings.clone();
        let name = printer.to_string();
        match tokio::task::spawn_blocking(move || printers.apply(&name, &settings)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(printer, error = %e, "printing with the printer's current settings"),
            Err(e) => error!(printer, error = %e, "printer configuration task failed"),
        }
    }

    async fn restore_printer(&self, printer: &str) {
        let printers = self.printers.clone();
        let name = printer.to_string();
        match tokio::task::spawn_blocking(move || printers.restore(&name)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(printer, error = %e, "failed to restore printer settings"),
            Err(e) => error!(printer, error = %e, "printer restore task failed"),
        }
    }

    async fn print_one(&self, job: &Job) -> std::result::Result<(), String> {
        if !job.path.is_file() {
            return Err("File is missing or not accessible".to_string());
        }

        let Some(handler) = self.registry.resolve_by_path(&job.path) else {
            return Err("No handler for this file type".to_string());
        };

        debug!(file = %job.file_name, handler = handler.name(), "submitting print job");
        let limit = self.timeouts.limit_for(job.file_type);
        let label = format!("print-{}", handler.name());
        let path = job.path.clone();
        let settings = self.settings.clone();

        match run_with_timeout(limit, &label, move || Ok(handler.print_document(&path, &settings))).await {
            Ok(true) => Ok(()),
            Ok(false) => Err("Print job could not be submitted".to_string()),
            Err(err) => Err(truncate_message(&err.user_message(), MAX_MESSAGE_CHARS)),
        }
    }
}

impl fmt::Debug for PrintController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrintController")
            .field("queue", &self.queue_len())
            .field("printing", &self.is_printing())
            .field("delay", &self.delay)
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}
