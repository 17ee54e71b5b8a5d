//! Batch printing with printer configuration backup and restore.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use batchprint::config::{ColorMode, DuplexMode, Orientation, PaperSize, PrintSettings, TimeoutPolicy};
use batchprint::notify::progress_callback;
use batchprint::printer::{DevMode, MemoryPrinterBackend, PrinterConfigManager};
use batchprint::{BatchPrintError, PrintController, PrintStatus};
use tempfile::TempDir;

use crate::common::{ScriptedHandler, registry_of, write_pdf, write_text};

const PRINTER: &str = "Office Laser";

struct Rig {
    controller: PrintController,
    handler: Arc<ScriptedHandler>,
    backend: Arc<MemoryPrinterBackend>,
    dir: TempDir,
}

fn rig(initial: DevMode) -> Rig {
    let handler = Arc::new(ScriptedHandler::plain());
    let backend = Arc::new(MemoryPrinterBackend::new().with_printer(PRINTER, initial));
    let printers = Arc::new(PrinterConfigManager::new(backend.clone()));
    let controller = PrintController::new(Arc::new(registry_of(handler.clone())), printers)
        .with_delay(Duration::ZERO);
    Rig {
        controller,
        handler,
        backend,
        dir: TempDir::new().unwrap(),
    }
}

fn settings() -> PrintSettings {
    PrintSettings {
        printer: Some(PRINTER.to_string()),
        ..PrintSettings::new()
    }
}

#[tokio::test]
async fn test_duplex_batch_restores_printer() {
    let rig = rig(DevMode::default());
    let contract = rig.dir.path().join("contract.pdf");
    write_pdf(&contract, 2);
    let notes = write_text(rig.dir.path(), "notes.txt", "ok");

    rig.controller.add_document(&contract).unwrap();
    rig.controller.add_document(&notes).unwrap();
    rig.controller.set_settings(PrintSettings {
        duplex: DuplexMode::LongEdge,
        copies: 2,
        ..settings()
    });

    let report = rig.controller.start_batch_print().unwrap().wait().await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.completed, 2);
    assert_eq!(rig.handler.printed(), ["contract.pdf", "notes.txt"]);
    assert!(
        rig.handler
            .settings_seen()
            .iter()
            .all(|s| s.duplex == DuplexMode::LongEdge && s.copies == 2)
    );

    let writes = rig.backend.writes();
    assert_eq!(writes.first().unwrap().1.duplex, DuplexMode::LongEdge);
    assert_eq!(writes.first().unwrap().1.copies, 1);
    assert_eq!(rig.backend.get(PRINTER), Some(DevMode::default()));

    let status = rig.controller.get_queue_status();
    assert_eq!(status.completed, 2);
    assert!(!status.is_printing);
}

#[tokio::test]
async fn test_every_managed_field_is_restored() {
    let initial = DevMode {
        duplex: DuplexMode::ShortEdge,
        copies: 3,
        color: ColorMode::Grayscale,
        orientation: Orientation::Landscape,
        paper: Some(PaperSize::Letter),
    };
    let rig = rig(initial);
    let ok = write_text(rig.dir.path(), "ok.txt", "ok");
    let broken = write_text(rig.dir.path(), "broken.txt", "fail");
    rig.controller.add_documents([&ok, &broken]);
    rig.controller.set_settings(PrintSettings {
        duplex: DuplexMode::Off,
        color_mode: ColorMode::Color,
        orientation: Orientation::Portrait,
        paper_size: PaperSize::A3,
        ..settings()
    });

    let report = rig.controller.start_batch_print().unwrap().wait().await.unwrap();
    assert_eq!(report.failed, 1);

    let applied = rig.backend.writes()[0].1;
    assert_eq!(applied.color, ColorMode::Color);
    assert_eq!(applied.paper, Some(PaperSize::A3));

    let restored = rig.backend.get(PRINTER).unwrap();
    assert_eq!(restored.duplex, initial.duplex);
    assert_eq!(restored.copies, initial.copies);
    assert_eq!(restored.color, initial.color);
    assert_eq!(restored.orientation, initial.orientation);
    assert_eq!(restored.paper, initial.paper);
}

#[tokio::test]
async fn test_failures_do_not_stop_the_batch() {
    let rig = rig(DevMode::default());
    let first = write_text(rig.dir.path(), "first.txt", "fail");
    let second = write_text(rig.dir.path(), "second.txt", "ok");
    let gone = write_text(rig.dir.path(), "gone.txt", "ok");
    rig.controller.add_documents([&first, &second, &gone]);
    std::fs::remove_file(&gone).unwrap();
    rig.controller.set_settings(settings());

    let report = rig.controller.start_batch_print().unwrap().wait().await.unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.completed, 1);
    assert_eq!(report.failed, 2);
    assert_eq!(rig.handler.printed(), ["first.txt", "second.txt"]);

    let documents = rig.controller.documents();
    assert_eq!(documents[0].status(), PrintStatus::Error);
    assert_eq!(documents[1].status(), PrintStatus::Completed);
    assert_eq!(documents[2].error_message(), Some("File is missing or not accessible"));
}

#[tokio::test]
async fn test_second_batch_is_refused_while_printing() {
    let rig = rig(DevMode::default());
    let slow = write_text(rig.dir.path(), "slow.txt", "slow");
    rig.controller.add_document(&slow).unwrap();
    rig.controller.set_settings(settings());

    let running = rig.controller.start_batch_print().unwrap();
    assert!(rig.controller.is_printing());
    assert!(matches!(
        rig.controller.start_batch_print(),
        Err(BatchPrintError::BatchInProgress)
    ));
    assert!(matches!(rig.controller.clear_queue(), Err(BatchPrintError::BatchInProgress)));

    let report = running.wait().await.unwrap();
    assert_eq!(report.completed, 1);
    assert!(!rig.controller.is_printing());
    assert_eq!(rig.handler.printed(), ["slow.txt"]);

    let again = rig.controller.start_batch_print().unwrap().wait().await.unwrap();
    assert_eq!(again.completed, 1);
}

#[tokio::test]
async fn test_hung_print_job_times_out() {
    let rig = rig(DevMode::default());
    let slow = write_text(rig.dir.path(), "slow.txt", "slow");
    let quick = write_text(rig.dir.path(), "quick.txt", "ok");
    let controller = rig
        .controller
        .with_timeouts(TimeoutPolicy::uniform(Duration::from_secs(1)));
    controller.add_documents([&slow, &quick]);
    controller.set_settings(settings());

    let report = controller.start_batch_print().unwrap().wait().await.unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.completed, 1);
    assert!(report.failures[0].message.contains("Timed out"));
    assert_eq!(rig.backend.get(PRINTER), Some(DevMode::default()));
}

#[tokio::test]
async fn test_cancel_leaves_remaining_documents_pending() {
    let rig = rig(DevMode::default());
    let slow = write_text(rig.dir.path(), "slow.txt", "slow");
    let next = write_text(rig.dir.path(), "next.txt", "ok");
    let last = write_text(rig.dir.path(), "last.txt", "ok");
    rig.controller.add_documents([&slow, &next, &last]);
    rig.controller.set_settings(settings());

    let running = rig.controller.start_batch_print().unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    rig.controller.cancel();
    let report = running.wait().await.unwrap();

    assert!(report.was_cancelled());
    assert_eq!(report.completed, 1);
    assert_eq!(report.not_started, 2);
    assert_eq!(rig.controller.get_queue_status().pending, 2);
    assert_eq!(rig.backend.get(PRINTER), Some(DevMode::default()));
}

#[tokio::test]
async fn test_progress_reports_each_document() {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();

    let rig = rig(DevMode::default());
    let a = write_text(rig.dir.path(), "a.txt", "ok");
    let b = write_text(rig.dir.path(), "b.txt", "fail");
    let controller = rig.controller.with_progress(progress_callback(move |current, total, message| {
        sink.lock().unwrap().push((current, total, message.to_string()));
    }));
    controller.add_documents([&a, &b]);
    controller.set_settings(settings());

    let report = controller.start_batch_print().unwrap().wait().await.unwrap();

    let messages = messages.lock().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].0, 1);
    assert!(messages[0].2.starts_with("a.txt"));
    assert_eq!(messages[1].0, 2);
    assert_eq!(messages[2], (2, 2, report.describe()));
}
