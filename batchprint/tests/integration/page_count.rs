//! Page counting over mixed batches with the built-in handlers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use batchprint::automation::{OfficeApp, OfficeMeasurement, SheetLayout};
use batchprint::config::TimeoutPolicy;
use batchprint::{DocumentSet, FileType, HandlerRegistry, PageCountManager, PageCountStatus};
use rstest::rstest;
use tempfile::TempDir;

use crate::common::{
    ScriptedHandler, StubOffice, engines, registry_of, write_encrypted, write_pdf, write_png,
    write_text, write_tiff,
};

fn manager(office: StubOffice) -> PageCountManager {
    PageCountManager::new(Arc::new(HandlerRegistry::with_engines(&engines(office))))
}

#[tokio::test]
async fn test_mixed_batch_reports_every_outcome() {
    let dir = TempDir::new().unwrap();
    let valid = dir.path().join("valid.pdf");
    let encrypted = dir.path().join("encrypted.docx");
    let missing = dir.path().join("missing.pptx");
    write_pdf(&valid, 3);
    write_encrypted(&encrypted);
    std::fs::write(&missing, b"PK placeholder").unwrap();

    let mut documents = DocumentSet::new();
    documents.add_file(&valid).unwrap();
    documents.add_file(&encrypted).unwrap();
    documents.add_file(&missing).unwrap();
    std::fs::remove_file(&missing).unwrap();

    let summary = manager(StubOffice::default())
        .calculate_all(documents.documents())
        .await;

    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.success_count, 1);
    assert_eq!(summary.total_pages, 3);
    assert_eq!(summary.count(PageCountStatus::SkippedEncrypted), 1);
    assert_eq!(summary.count(PageCountStatus::SkippedNoAccess), 1);
    assert_eq!(summary.error_count(), 0);
    assert_eq!(summary.skipped_count(), 2);

    let names: Vec<&str> = summary.results.iter().map(|r| r.file_name.as_str()).collect();
    assert_eq!(names, ["valid.pdf", "encrypted.docx", "missing.pptx"]);
    assert_eq!(summary.by_type[&FileType::Pdf].pages, 3);
}

#[tokio::test]
async fn test_workbook_without_breaks_is_estimated() {
    let dir = TempDir::new().unwrap();
    let workbook = dir.path().join("ledger.xlsx");
    std::fs::write(&workbook, b"PK\x03\x04 workbook").unwrap();

    let office = StubOffice::default().with_reply(
        OfficeApp::Excel,
        OfficeMeasurement::Sheets(vec![SheetLayout {
            name: "Ledger".to_string(),
            rows: 200,
            columns: 3,
            ..SheetLayout::default()
        }]),
    );

    let mut documents = DocumentSet::new();
    documents.add_file(&workbook).unwrap();
    let summary = manager(office).calculate_all(documents.documents()).await;

    let result = &summary.results[0];
    assert_eq!(result.status, PageCountStatus::Success);
    assert_eq!(result.pages, Some(5));
    assert!(result.approximate);
    assert!(summary.approximate);
}

#[tokio::test]
async fn test_office_documents_counted_through_automation() {
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("report.docx");
    let slides = dir.path().join("slides.pptx");
    std::fs::write(&report, b"PK\x03\x04 document").unwrap();
    std::fs::write(&slides, b"PK\x03\x04 deck").unwrap();

    let office = StubOffice::default()
        .with_reply(OfficeApp::Word, OfficeMeasurement::Pages(12))
        .with_reply(OfficeApp::PowerPoint, OfficeMeasurement::Slides(8));

    let mut documents = DocumentSet::new();
    documents.add_files([&report, &slides]);
    let summary = manager(office).calculate_all(documents.documents()).await;

    assert_eq!(summary.success_count, 2);
    assert_eq!(summary.total_pages, 20);
    assert!(!summary.approximate);
}

#[rstest]
#[case::single_frame(1)]
#[case::multi_frame(5)]
#[tokio::test]
async fn test_tiff_counts_frames(#[case] frames: usize) {
    let dir = TempDir::new().unwrap();
    let scan = dir.path().join("scan.tif");
    write_tiff(&scan, frames);

    let mut documents = DocumentSet::new();
    documents.add_file(&scan).unwrap();
    let summary = manager(StubOffice::default())
        .calculate_all(documents.documents())
        .await;

    assert_eq!(summary.results[0].pages, Some(frames as u32));
}

#[tokio::test]
async fn test_single_frame_image_is_one_page() {
    let dir = TempDir::new().unwrap();
    let photo = dir.path().join("photo.png");
    write_png(&photo);

    let mut documents = DocumentSet::new();
    documents.add_file(&photo).unwrap();
    let summary = manager(StubOffice::default())
        .calculate_all(documents.documents())
        .await;

    assert_eq!(summary.results[0].status, PageCountStatus::Success);
    assert_eq!(summary.results[0].pages, Some(1));
}

#[tokio::test]
async fn test_successful_counts_are_positive() {
    let dir = TempDir::new().unwrap();
    let empty_notes = write_text(dir.path(), "empty.txt", "");
    let zero = write_text(dir.path(), "zero.pdf", "zero");
    let lines = write_text(dir.path(), "lines.txt", "a\nb\nc\n");

    let registry = registry_of(Arc::new(ScriptedHandler::plain()));
    let mut documents = DocumentSet::new();
    documents.add_files([&empty_notes, &zero, &lines]);

    let summary = PageCountManager::new(Arc::new(registry))
        .calculate_all(documents.documents())
        .await;

    for result in summary.results.iter().filter(|r| r.is_success()) {
        assert!(result.pages.unwrap() >= 1, "{} counted zero pages", result.file_name);
    }
    assert_eq!(summary.results[0].pages, Some(1));
    assert_eq!(summary.results[1].status, PageCountStatus::Error);
    assert_eq!(summary.results[2].pages, Some(3));
}

#[tokio::test]
async fn test_failures_do_not_abort_the_batch() {
    let dir = TempDir::new().unwrap();
    let mut paths = Vec::new();
    for (index, script) in ["one", "fail", "two\nlines", "fail", "three"].iter().enumerate() {
        paths.push(write_text(dir.path(), &format!("doc{index}.txt"), script));
    }

    let registry = registry_of(Arc::new(ScriptedHandler::plain()));
    let mut documents = DocumentSet::new();
    documents.add_files(&paths);

    let summary = PageCountManager::new(Arc::new(registry))
        .with_workers(2)
        .calculate_all(documents.documents())
        .await;

    assert_eq!(summary.total_files, 5);
    assert_eq!(summary.success_count, 3);
    assert_eq!(summary.count(PageCountStatus::SkippedDamaged), 2);
    assert_eq!(summary.total_pages, 4);
    assert!(summary.results.iter().all(|r| r.status.is_terminal()));
}

#[tokio::test]
async fn test_stuck_document_times_out_alone() {
    let dir = TempDir::new().unwrap();
    let stuck = write_text(dir.path(), "stuck.txt", "slow");
    let quick = write_text(dir.path(), "quick.txt", "fast");

    let registry = registry_of(Arc::new(ScriptedHandler::plain()));
    let mut documents = DocumentSet::new();
    documents.add_files([&stuck, &quick]);

    let started = Instant::now();
    let summary = PageCountManager::new(Arc::new(registry))
        .with_timeouts(TimeoutPolicy::uniform(Duration::from_secs(1)))
        .calculate_all(documents.documents())
        .await;

    assert!(started.elapsed() < Duration::from_millis(2500));
    assert_eq!(summary.results[0].status, PageCountStatus::Error);
    assert!(summary.results[0].message.as_deref().unwrap().contains("Timed out"));
    assert_eq!(summary.results[1].status, PageCountStatus::Success);
    assert_eq!(summary.results[1].pages, Some(1));
}
