//! batchprint - Count pages of and print mixed document batches.
//!
//! This library takes a set of office documents, PDFs, images and text
//! files and either counts their pages or prints them through whatever
//! engine each type needs. It provides:
//!
//! - A handler per file-type family behind one [`Handler`] interface
//! - A registry resolving documents to handlers
//! - Concurrent, time-bounded page counting with a per-status summary
//! - Sequential batch printing with printer configuration restore
//! - A uniform failure taxonomy that never aborts a batch
//!
//! # Examples
//!
//! ## Counting pages
//!
//! ```no_run
//! use batchprint::{AppConfig, DocumentSet, HandlerRegistry, PageCountManager};
//! use std::sync::Arc;
//!
//! # async fn example() -> batchprint::Result<()> {
//! let config = AppConfig::default();
//! let registry = Arc::new(HandlerRegistry::system(&config));
//!
//! let mut documents = DocumentSet::new();
//! documents.add_file("report.docx")?;
//! documents.add_file("slides.pptx")?;
//!
//! let manager = PageCountManager::from_config(registry, &config);
//! let summary = manager.calculate_all(documents.documents()).await;
//! println!("{}", summary.describe());
//! # Ok(())
//! # }
//! ```
//!
//! ## Printing a batch
//!
//! ```no_run
//! use batchprint::printer::{PrintTicketBackend, PrinterConfigManager};
//! use batchprint::automation::SystemLauncher;
//! use batchprint::{AppConfig, HandlerRegistry, PrintController, PrintSettings};
//! use std::sync::Arc;
//!
//! # async fn example() -> batchprint::Result<()> {
//! let config = AppConfig::default();
//! let registry = Arc::new(HandlerRegistry::system(&config));
//! let printers = Arc::new(PrinterConfigManager::new(Arc::new(
//!     PrintTicketBackend::new(Arc::new(SystemLauncher)),
//! )));
//!
//! let controller = PrintController::from_config(registry, printers, &config);
//! controller.add_document("invoice.pdf")?;
//! controller.set_settings(PrintSettings::new());
//!
//! let report = controller.start_batch_print()?.wait().await?;
//! println!("{}", report.describe());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod automation;
pub mod config;
pub mod document;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod notify;
pub mod output;
pub mod page_count;
pub mod print_controller;
pub mod printer;
pub mod utils;

// Re-export commonly used types
pub use config::{AppConfig, PrintSettings};
pub use document::{Document, DocumentSet, FileType, PrintStatus};
pub use error::{BatchPrintError, Result};
pub use handler::{Handler, HandlerError, HandlerRegistry, PageCount};
pub use page_count::{PageCountManager, PageCountStatus, PageCountSummary};
pub use print_controller::{BatchHandle, BatchReport, PrintController, QueueStatus};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
