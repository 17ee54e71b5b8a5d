//! Type derivation and handler dispatch.

use std::path::Path;
use std::sync::Arc;

use batchprint::handler::{RegistryKey, Superseded};
use batchprint::{BatchPrintError, Document, FileType, HandlerRegistry};
use rstest::rstest;

use crate::common::{ScriptedHandler, StubOffice, engines};

#[rstest]
#[case("thesis.DOCX", FileType::Word)]
#[case("draft.wps", FileType::Word)]
#[case("deck.Pptx", FileType::Ppt)]
#[case("budget.et", FileType::Excel)]
#[case("scan.TIFF", FileType::Image)]
#[case("picture.webp", FileType::Image)]
#[case("manual.pdf", FileType::Pdf)]
#[case("readme.txt", FileType::Text)]
fn test_type_follows_extension(#[case] name: &str, #[case] expected: FileType) {
    assert_eq!(Document::detect_type(Path::new(name)).unwrap(), expected);
}

#[rstest]
#[case("notes.md")]
#[case("archive.zip")]
#[case("Makefile")]
fn test_unknown_extensions_are_rejected(#[case] name: &str) {
    assert!(matches!(
        Document::detect_type(Path::new(name)),
        Err(BatchPrintError::UnsupportedFileType { .. })
    ));
}

#[test]
fn test_builtin_handlers_cover_every_type() {
    let registry = HandlerRegistry::with_engines(&engines(StubOffice::default()));

    for file_type in FileType::ALL {
        assert!(registry.resolve_by_type(file_type).is_some(), "no handler for {file_type}");
        for ext in file_type.extensions() {
            let handler = registry.resolve_by_extension(ext).unwrap();
            assert!(handler.supported_file_types().contains(&file_type));
        }
    }
    assert!(registry.resolve_by_path(Path::new("a.md")).is_none());
}

#[test]
fn test_later_registration_takes_over() {
    let mut registry = HandlerRegistry::with_engines(&engines(StubOffice::default()));
    let superseded = registry.register(Arc::new(ScriptedHandler::new("override", &[".TXT"])));

    assert!(superseded.contains(&Superseded {
        key: RegistryKey::Extension(".txt".to_string()),
        previous: "text",
        replacement: "override",
    }));
    assert_eq!(registry.resolve_by_path(Path::new("notes.txt")).unwrap().name(), "override");
    assert_eq!(registry.resolve_by_extension("pdf").unwrap().name(), "pdf");
    assert_eq!(registry.resolve_by_type(FileType::Pdf).unwrap().name(), "override");
}
