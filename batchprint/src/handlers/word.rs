//! Word-processing documents.

use std::path::Path;
use std::sync::Arc;

use super::ooxml::{ensure_not_encrypted, read_app_property};
use super::{office_measure, office_print, report_print, subject, unexpected_measurement};
use crate::automation::{OfficeApp, OfficeEngine, OfficeMeasurement};
use crate::config::PrintSettings;
use crate::document::{FileType, extension_of};
use crate::handler::{FallbackChain, Handler, HandlerError, PageCount};

/// Counts and prints through Word automation.
///
/// Without Word, `.docx` files still get the page count their last editor
/// saved in `docProps/app.xml`, reported as approximate.
pub struct WordHandler {
    office: Arc<dyn OfficeEngine>,
}

impl WordHandler {
    /// Create a handler driving `office`.
    pub fn new(office: Arc<dyn OfficeEngine>) -> Self {
        Self { office }
    }

    fn automation_count(&self, path: &Path) -> Result<PageCount, HandlerError> {
        match office_measure(self.office.as_ref(), OfficeApp::Word, path)? {
            OfficeMeasurement::Pages(pages) => PageCount::exact(pages),
            other => Err(unexpected_measurement(OfficeApp::Word, &other)),
        }
    }
}

fn saved_page_count(path: &Path) -> Result<PageCount, HandlerError> {
    match read_app_property(path, "Pages")? {
        Some(pages) => PageCount::estimated(pages),
        None => Err(HandlerError::missing(OfficeApp::Word.display_name())),
    }
}

impl Handler for WordHandler {
    fn name(&self) -> &'static str {
        "word"
    }

    fn supported_file_types(&self) -> &[FileType] {
        &[FileType::Word]
    }

    fn supported_extensions(&self) -> &[&'static str] {
        &[".doc", ".docx", ".wps"]
    }

    fn count_pages(&self, path: &Path) -> Result<PageCount, HandlerError> {
        ensure_not_encrypted(path)?;
        let is_docx = extension_of(path).as_deref() == Some(".docx");

        FallbackChain::new(subject(path))
            .attempt("automation", || self.automation_count(path))
            .attempt_if(is_docx, "document properties", || saved_page_count(path))
            .run()
    }

    fn print_document(&self, path: &Path, settings: &PrintSettings) -> bool {
        let result = ensure_not_encrypted(path)
            .and_then(|()| office_print(self.office.as_ref(), OfficeApp::Word, path, settings));
        report_print(self.name(), path, result)
    }
}
