//! Presentations.
//!
//! Two readers exist because neither is reliable on its own: the static
//! reader only understands zip packages, and automation fails on machines
//! without PowerPoint or on files it refuses to open without repair. `.pptx`
//! files try the static reader first; `.ppt` and `.dps` try automation first
//! and fall back to the static reader when the file turns out to be a
//! package under a legacy extension.

use std::path::Path;
use std::sync::Arc;

use super::ooxml::{count_slide_parts, ensure_not_encrypted, is_compound_file};
use super::{office_measure, office_print, report_print, subject, unexpected_measurement};
use crate::automation::{OfficeApp, OfficeEngine, OfficeMeasurement};
use crate::config::PrintSettings;
use crate::document::{FileType, extension_of};
use crate::handler::{FallbackChain, Handler, HandlerError, PageCount};

/// Counts slides and prints through PowerPoint.
pub struct PowerPointHandler {
    office: Arc<dyn OfficeEngine>,
}

impl PowerPointHandler {
    /// Create a handler driving `office`.
    pub fn new(office: Arc<dyn OfficeEngine>) -> Self {
        Self { office }
    }

    fn automation_count(&self, path: &Path) -> Result<PageCount, HandlerError> {
        match office_measure(self.office.as_ref(), OfficeApp::PowerPoint, path)? {
            OfficeMeasurement::Slides(slides) => PageCount::exact(slides),
            other => Err(unexpected_measurement(OfficeApp::PowerPoint, &other)),
        }
    }
}

fn static_count(path: &Path) -> Result<PageCount, HandlerError> {
    PageCount::exact(count_slide_parts(path)?)
}

impl Handler for PowerPointHandler {
    fn name(&self) -> &'static str {
        "powerpoint"
    }

    fn supported_file_types(&self) -> &[FileType] {
        &[FileType::Ppt]
    }

    fn supported_extensions(&self) -> &[&'static str] {
        &[".ppt", ".pptx", ".dps"]
    }

    fn count_pages(&self, path: &Path) -> Result<PageCount, HandlerError> {
        ensure_not_encrypted(path)?;
        let chain = FallbackChain::new(subject(path));

        let chain = if extension_of(path).as_deref() == Some(".pptx") {
            chain
                .attempt("slide parts", || static_count(path))
                .attempt("automation", || self.automation_count(path))
        } else {
            let is_package = matches!(is_compound_file(path), Ok(false));
            chain
                .attempt("automation", || self.automation_count(path))
                .attempt_if(is_package, "slide parts", || static_count(path))
        };

        chain.run()
    }

    fn print_document(&self, path: &Path, settings: &PrintSettings) -> bool {
        let result = ensure_not_encrypted(path)
            .and_then(|()| office_print(self.office.as_ref(), OfficeApp::PowerPoint, path, settings));
        report_print(self.name(), path, result)
    }
}
