//! Document handler interface.
//!
//! A [`Handler`] owns one family of file types and knows how to count pages
//! and submit print jobs through an external engine. Engines are unreliable,
//! so every handler funnels its failures into the small [`HandlerError`]
//! taxonomy, chains alternative strategies with [`FallbackChain`] and leaves
//! time limits to the orchestrators via [`run_with_timeout`].

pub mod classify;
pub mod fallback;
pub mod registry;
pub mod watchdog;

pub use classify::classify_failure;
pub use fallback::FallbackChain;
pub use registry::{HandlerRegistry, RegistryKey, Superseded};
pub use watchdog::run_with_timeout;

use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::config::PrintSettings;
use crate::document::{FileType, extension_of};

/// Why a handler could not count or print a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// Password protected, or access denied by the OS.
    #[error("file is encrypted or access is restricted: {reason}")]
    Encrypted {
        /// Engine detail.
        reason: String,
    },

    /// Malformed or unreadable file.
    #[error("file is damaged or in an unexpected format: {reason}")]
    Corrupted {
        /// Engine detail.
        reason: String,
    },

    /// The external engine needed for this file is not installed.
    #[error("{dependency} is not available")]
    MissingDependency {
        /// Name of the missing engine.
        dependency: String,
    },

    /// The unit did not finish within its bound.
    #[error("operation timed out after {}s", .after.as_secs())]
    Timeout {
        /// The bound that was exceeded.
        after: Duration,
    },

    /// The engine reported a page count below one.
    #[error("engine reported an invalid page count ({value})")]
    InvalidCount {
        /// Raw value returned by the engine.
        value: i64,
    },
}

impl HandlerError {
    /// Create an Encrypted error.
    pub fn encrypted(reason: impl Into<String>) -> Self {
        Self::Encrypted {
            reason: reason.into(),
        }
    }

    /// Create a Corrupted error.
    pub fn corrupted(reason: impl Into<String>) -> Self {
        Self::Corrupted {
            reason: reason.into(),
        }
    }

    /// Create a MissingDependency error.
    pub fn missing(dependency: impl Into<String>) -> Self {
        Self::MissingDependency {
            dependency: dependency.into(),
        }
    }

    /// Short message suitable for end users.
    pub fn user_message(&self) -> String {
        match self {
            Self::Encrypted { .. } => "File is encrypted or requires a password".to_string(),
            Self::Corrupted { .. } => "File is damaged or in an unexpected format".to_string(),
            Self::MissingDependency { dependency } => {
                format!("{dependency} is not installed or not available")
            }
            Self::Timeout { after } => {
                format!("Timed out after {}s", after.as_secs())
            }
            Self::InvalidCount { value } => format!("Invalid page count reported ({value})"),
        }
    }

    /// Whether retrying with another strategy cannot help.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Encrypted { .. })
    }
}

/// A page count, always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCount {
    pages: u32,
    approximate: bool,
}

impl PageCount {
    /// An exact count as reported by an engine.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::InvalidCount`] when `raw` is below one.
    pub fn exact(raw: i64) -> Result<Self, HandlerError> {
        Self::checked(raw, false)
    }

    /// An estimated count.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::InvalidCount`] when `raw` is below one.
    pub fn estimated(raw: i64) -> Result<Self, HandlerError> {
        Self::checked(raw, true)
    }

    fn checked(raw: i64, approximate: bool) -> Result<Self, HandlerError> {
        if raw < 1 {
            return Err(HandlerError::InvalidCount { value: raw });
        }
        let pages = u32::try_from(raw).map_err(|_| HandlerError::InvalidCount { value: raw })?;
        Ok(Self { pages, approximate })
    }

    /// Number of pages.
    pub fn pages(&self) -> u32 {
        self.pages
    }

    /// Whether the count is an estimate.
    pub fn is_approximate(&self) -> bool {
        self.approximate
    }
}

/// A strategy for one family of file types.
///
/// Implementations are called from worker threads and may block.
pub trait Handler: Send + Sync {
    /// Short name used in logs and registry diagnostics.
    fn name(&self) -> &'static str;

    /// File types this handler owns.
    fn supported_file_types(&self) -> &[FileType];

    /// Extensions this handler owns, lowercase with a leading dot.
    fn supported_extensions(&self) -> &[&'static str];

    /// Whether the handler accepts this file.
    ///
    /// The default checks existence and extension membership.
    fn can_handle(&self, path: &Path) -> bool {
        path.is_file() && self.claims_extension(path)
    }

    /// Count the pages of a document.
    ///
    /// # Errors
    ///
    /// Returns one of the [`HandlerError`] taxonomy members; never a zero or
    /// negative count.
    fn count_pages(&self, path: &Path) -> Result<PageCount, HandlerError>;

    /// Submit a print job. Expected failures are logged and reported as `false`.
    fn print_document(&self, path: &Path, settings: &PrintSettings) -> bool;

    /// Whether the path's extension is one of [`Handler::supported_extensions`].
    fn claims_extension(&self, path: &Path) -> bool {
        extension_of(path)
            .map(|ext| self.supported_extensions().contains(&ext.as_str()))
            .unwrap_or(false)
    }
}
