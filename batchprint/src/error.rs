//! Error types for batchprint.
//!
//! This module defines the errors surfaced to callers of the library:
//! queue and settings misuse, configuration problems, printer
//! configuration failures and plain I/O. Per-document failures raised
//! inside handlers use [`HandlerError`](crate::handler::HandlerError)
//! instead and never abort a batch.
//!
//! # Error Categories
//!
//! - **Input Errors**: missing files, unsupported extensions, duplicates
//! - **Batch Errors**: empty queue, missing settings, batch already running
//! - **Configuration Errors**: invalid settings or unreadable config files
//! - **Printer Errors**: device configuration could not be read or written

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for batchprint operations.
pub type Result<T> = std::result::Result<T, BatchPrintError>;

/// Main error type for batchprint operations.
#[derive(Debug)]
pub enum BatchPrintError {
    /// Input file was not found.
    FileNotFound {
        /// Path to the file that was not found.
        path: PathBuf,
    },

    /// Input file exists but could not be inspected.
    FileNotAccessible {
        /// Path to the inaccessible file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// File extension does not map to any supported file type.
    UnsupportedFileType {
        /// Path to the rejected file.
        path: PathBuf,
        /// Lowercased extension including the dot, or empty.
        extension: String,
    },

    /// The same file is already part of the document set or queue.
    DuplicateDocument {
        /// Path that was added twice.
        path: PathBuf,
    },

    /// A batch was started with nothing queued.
    EmptyQueue,

    /// A batch was started before print settings were provided.
    MissingSettings,

    /// A batch is already running on this controller.
    BatchInProgress,

    /// No handler is registered for the file.
    NoHandler {
        /// Path of the file without a handler.
        path: PathBuf,
    },

    /// Reading or writing a printer's device configuration failed.
    PrinterConfig {
        /// Printer name.
        printer: String,
        /// What went wrong.
        reason: String,
    },

    /// Invalid configuration.
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },

    /// Configuration file could not be read or written.
    ConfigIo {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Operation was cancelled.
    Cancelled,

    /// Generic I/O error.
    Io {
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Generic error with a custom message.
    Other {
        /// Error message.
        message: String,
    },
}

impl fmt::Display for BatchPrintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileNotFound { path } => {
                write!(f, "File not found: {}", path.display())
            }
            Self::FileNotAccessible { path, source } => {
                write!(
                    f,
                    "Cannot access file: {}\n  Reason: {}",
                    path.display(),
                    source
                )
            }
            Self::UnsupportedFileType { path, extension } => {
                let shown = if extension.is_empty() {
                    "(none)"
                } else {
                    extension.as_str()
                };
                write!(
                    f,
                    "Unsupported file type '{}': {}\n  \
                     Hint: Run 'batchprint formats' to list supported extensions",
                    shown,
                    path.display()
                )
            }
            Self::DuplicateDocument { path } => {
                write!(f, "Document already added: {}", path.display())
            }
            Self::EmptyQueue => {
                write!(f, "Print queue is empty")
            }
            Self::MissingSettings => {
                write!(f, "No print settings provided for the batch")
            }
            Self::BatchInProgress => {
                write!(
                    f,
                    "A print batch is already in progress\n  \
                     Hint: Wait for it to finish or cancel it first"
                )
            }
            Self::NoHandler { path } => {
                write!(f, "No handler can process: {}", path.display())
            }
            Self::PrinterConfig { printer, reason } => {
                write!(
                    f,
                    "Failed to configure printer '{printer}'\n  Reason: {reason}"
                )
            }
            Self::InvalidConfig { message } => {
                write!(f, "Invalid configuration: {message}")
            }
            Self::ConfigIo { path, source } => {
                write!(
                    f,
                    "Failed to access configuration file: {}\n  Reason: {}",
                    path.display(),
                    source
                )
            }
            Self::Cancelled => {
                write!(f, "Operation cancelled")
            }
            Self::Io { source } => {
                write!(f, "I/O error: {source}")
            }
            Self::Other { message } => {
                write!(f, "{message}")
            }
        }
    }
}

impl std::error::Error for BatchPrintError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FileNotAccessible { source, .. } => Some(source),
            Self::ConfigIo { source, .. } => Some(source),
            Self::Io { source } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for BatchPrintError {
    fn from(err: io::Error) -> Self {
        Self::Io { source: err }
    }
}

impl From<serde_json::Error> for BatchPrintError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_config(err.to_string())
    }
}

impl From<anyhow::Error> for BatchPrintError {
    fn from(err: anyhow::Error) -> Self {
        Self::other(format!("{err:#}"))
    }
}

impl BatchPrintError {
    /// Create a FileNotFound error.
    pub fn file_not_found(path: PathBuf) -> Self {
        Self::FileNotFound { path }
    }

    /// Create an UnsupportedFileType error.
    pub fn unsupported_file_type(path: PathBuf, extension: impl Into<String>) -> Self {
        Self::UnsupportedFileType {
            path,
            extension: extension.into(),
        }
    }

    /// Create a PrinterConfig error.
    pub fn printer_config(printer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PrinterConfig {
            printer: printer.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Check if this error only affects a single input.
    ///
    /// Recoverable errors are reported and the remaining inputs are processed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound { .. }
                | Self::FileNotAccessible { .. }
                | Self::UnsupportedFileType { .. }
                | Self::DuplicateDocument { .. }
                | Self::NoHandler { .. }
        )
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FileNotFound { .. } => 2,
            Self::FileNotAccessible { .. } => 2,
            Self::UnsupportedFileType { .. } => 2,
            Self::DuplicateDocument { .. } => 1,
            Self::EmptyQueue => 1,
            Self::MissingSettings => 1,
            Self::BatchInProgress => 4,
            Self::NoHandler { .. } => 3,
            Self::PrinterConfig { .. } => 6,
            Self::InvalidConfig { .. } => 1,
            Self::ConfigIo { .. } => 5,
            Self::Cancelled => 130,
            Self::Io { .. } => 5,
            Self::Other { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_file_not_found_display() {
        let err = BatchPrintError::file_not_found(PathBuf::from("/tmp/missing.docx"));
        let msg = format!("{err}");
        assert!(msg.contains("File not found"));
        assert!(msg.contains("missing.docx"));
    }

    #[test]
    fn test_unsupported_file_type_display() {
        let err = BatchPrintError::unsupported_file_type(PathBuf::from("notes.md"), ".md");
        let msg = format!("{err}");
        assert!(msg.contains("'.md'"));
        assert!(msg.contains("batchprint formats"));

        let err = BatchPrintError::unsupported_file_type(PathBuf::from("Makefile"), "");
        assert!(format!("{err}").contains("(none)"));
    }

    #[test]
    fn test_batch_in_progress_display() {
        let msg = format!("{}", BatchPrintError::BatchInProgress);
        assert!(msg.contains("already in progress"));
    }

    #[test]
    fn test_printer_config_display() {
        let err = BatchPrintError::printer_config("Office Laser", "access denied");
        let msg = format!("{err}");
        assert!(msg.contains("Office Laser"));
        assert!(msg.contains("access denied"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(BatchPrintError::file_not_found(PathBuf::from("a.pdf")).is_recoverable());
        assert!(
            BatchPrintError::unsupported_file_type(PathBuf::from("a.md"), ".md").is_recoverable()
        );
        assert!(!BatchPrintError::EmptyQueue.is_recoverable());
        assert!(!BatchPrintError::BatchInProgress.is_recoverable());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            BatchPrintError::file_not_found(PathBuf::from("x")).exit_code(),
            2
        );
        assert_eq!(BatchPrintError::EmptyQueue.exit_code(), 1);
        assert_eq!(BatchPrintError::BatchInProgress.exit_code(), 4);
        assert_eq!(BatchPrintError::Cancelled.exit_code(), 130);
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "not found");
        let err: BatchPrintError = io_err.into();
        assert!(matches!(err, BatchPrintError::Io { .. }));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: BatchPrintError = json_err.into();
        assert!(matches!(err, BatchPrintError::InvalidConfig { .. }));
    }

    #[test]
    fn test_error_source() {
        let err = BatchPrintError::ConfigIo {
            path: PathBuf::from("config.json"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.source().is_some());
        assert!(BatchPrintError::MissingSettings.source().is_none());
    }
}
