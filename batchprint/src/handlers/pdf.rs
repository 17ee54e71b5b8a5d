//! PDF documents.

use lopdf::Document as PdfDocument;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use super::{report_print, subject};
use crate::automation::{BundledViewer, Launcher};
use crate::config::PrintSettings;
use crate::document::FileType;
use crate::handler::{Handler, HandlerError, PageCount, classify_failure};

/// Counts pages from the PDF page tree and prints through the bundled viewer.
pub struct PdfHandler {
    launcher: Arc<dyn Launcher>,
    viewer: BundledViewer,
}

impl PdfHandler {
    /// Create a handler printing through `viewer`.
    pub fn new(launcher: Arc<dyn Launcher>, viewer: BundledViewer) -> Self {
        Self { launcher, viewer }
    }
}

impl Handler for PdfHandler {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn supported_file_types(&self) -> &[FileType] {
        &[FileType::Pdf]
    }

    fn supported_extensions(&self) -> &[&'static str] {
        &[".pdf"]
    }

    fn count_pages(&self, path: &Path) -> Result<PageCount, HandlerError> {
        let doc = PdfDocument::load(path).map_err(|e| {
            debug!(file = %subject(path), error = %e, "failed to load PDF");
            classify_failure(&e.to_string())
        })?;

        if doc.is_encrypted() {
            return Err(HandlerError::encrypted("PDF is encrypted"));
        }

        let pages = doc.get_pages().len();
        PageCount::exact(pages as i64)
    }

    fn print_document(&self, path: &Path, settings: &PrintSettings) -> bool {
        let result = self.viewer.print(self.launcher.as_ref(), path, settings);
        report_print(self.name(), path, result)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::{Document, EncryptionState, EncryptionVersion, Object, Permissions, dictionary};
    use std::path::Path;

    /// Write a PDF with `pages` blank pages.
    pub fn write_pdf(path: &Path, pages: usize) {
        blank_pdf(pages).save(path).unwrap();
    }

    /// Write a one-page PDF encrypted for `user_password`.
    pub fn write_encrypted_pdf(path: &Path, user_password: &str) {
        let mut doc = blank_pdf(1);
        doc.trailer.set(
            "ID",
            Object::Array(vec![
                Object::string_literal(b"batchprint-fixture".to_vec()),
                Object::string_literal(b"batchprint-fixture".to_vec()),
            ]),
        );

        let version = EncryptionVersion::V2 {
            document: &doc,
            owner_password: "owner",
            user_password,
            key_length: 128,
            permissions: Permissions::all(),
        };
        let state = EncryptionState::try_from(version).unwrap();
        doc.encrypt(&state).unwrap();
        doc.save(path).unwrap();
    }

    fn blank_pdf(pages: usize) -> Document {
        let mut doc = Document::with_version("1.4");

        let catalog_id = doc.new_object_id();
        let pages_id = doc.new_object_id();

        let mut page_ids = Vec::new();
        for _ in 0..pages {
            let page_id = doc.new_object_id();
            let page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            };
            doc.objects.insert(page_id, page.into());
            page_ids.push(page_id);
        }

        let catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        let pages_dict = dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.into_iter().map(|id| id.into()).collect::<Vec<Object>>(),
            "Count" => pages as i64,
        };

        doc.objects.insert(catalog_id, catalog.into());
        doc.objects.insert(pages_id, pages_dict.into());
        doc.trailer.set("Root", catalog_id);
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{write_encrypted_pdf, write_pdf};
    use super::*;
    use crate::automation::testing::FakeLauncher;
    use rstest::rstest;
    use tempfile::TempDir;

    fn handler(viewer: BundledViewer) -> (Arc<FakeLauncher>, PdfHandler) {
        let fake = Arc::new(FakeLauncher::default());
        (fake.clone(), PdfHandler::new(fake, viewer))
    }

    #[test]
    fn test_count_pages() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("three.pdf");
        write_pdf(&path, 3);

        let (_, pdf) = handler(BundledViewer::new("/none"));
        let count = pdf.count_pages(&path).unwrap();
        assert_eq!(count.pages(), 3);
        assert!(!count.is_approximate());
    }

    #[test]
    fn test_zero_pages_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.pdf");
        write_pdf(&path, 0);

        let (_, pdf) = handler(BundledViewer::new("/none"));
        assert_eq!(
            pdf.count_pages(&path),
            Err(HandlerError::InvalidCount { value: 0 })
        );
    }

    #[rstest]
    #[case::user_password("user")]
    #[case::empty_user_password("")]
    fn test_encrypted_is_rejected(#[case] user_password: &str) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locked.pdf");
        write_encrypted_pdf(&path, user_password);

        let (_, pdf) = handler(BundledViewer::new("/none"));
        assert!(matches!(
            pdf.count_pages(&path),
            Err(HandlerError::Encrypted { .. })
        ));
    }

    #[test]
    fn test_garbage_is_corrupted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();

        let (_, pdf) = handler(BundledViewer::new("/none"));
        assert!(matches!(
            pdf.count_pages(&path),
            Err(HandlerError::Corrupted { .. })
        ));
    }

    #[test]
    fn test_print_without_viewer_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.pdf");
        write_pdf(&path, 1);

        let (fake, pdf) = handler(BundledViewer::new(dir.path().join("missing.exe")));
        assert!(!pdf.print_document(&path, &PrintSettings::new()));
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn test_print_with_viewer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.pdf");
        write_pdf(&path, 1);
        let exe = dir.path().join("SumatraPDF.exe");
        std::fs::write(&exe, b"").unwrap();

        let (fake, pdf) = handler(BundledViewer::new(&exe));
        assert!(pdf.print_document(&path, &PrintSettings::new()));
        let call = &fake.calls()[0];
        assert!(call.args.contains(&"-silent".to_string()));
        assert_eq!(call.args.last().unwrap(), &path.display().to_string());
    }
}
