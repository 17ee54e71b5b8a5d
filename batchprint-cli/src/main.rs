//! batchprint - Count pages of and print batches of documents.
//!
//! Thin command-line front end over the `batchprint` library.

mod cli;

use clap::Parser;
use std::path::Path;
use std::process;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, CountArgs, PrintArgs};
use batchprint::automation::SystemLauncher;
use batchprint::document::ImportReport;
use batchprint::output::{
    OutputFormatter, ProgressBar, display_batch_report, display_count_summary, display_formats,
};
use batchprint::printer::{PrintTicketBackend, PrinterConfigManager};
use batchprint::utils::collect_paths_for_patterns;
use batchprint::{
    AppConfig, BatchPrintError, Document, DocumentSet, FileType, HandlerRegistry, PageCountManager,
    PrintController, Result,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        process::exit(err.exit_code());
    }
}

/// Diagnostic logs go to stderr; `BATCHPRINT_LOG` overrides the level.
fn init_tracing(verbose: bool) {
    let default = if verbose { "batchprint=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("BATCHPRINT_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    config.validate()?;
    debug!(config = ?cli.config, workers = config.effective_workers(), "configuration loaded");

    let formatter = OutputFormatter::new(cli.quiet, cli.verbose);

    match cli.command {
        Command::Count(args) => count(args, config, &formatter).await,
        Command::Print(args) => print(args, config, &formatter).await,
        Command::Formats => {
            display_formats(&formatter, &HandlerRegistry::system(&config));
            Ok(())
        }
    }
}

/// Build a document set from files, folders and glob patterns.
///
/// Folders are walked recursively. Types disabled in `config` are left out
/// and named in the returned report.
fn load_documents(inputs: &[String], config: &AppConfig) -> Result<(DocumentSet, ImportReport)> {
    let accept = |file_type: FileType| config.is_enabled(file_type);
    let mut documents = DocumentSet::new();
    let mut report = ImportReport::default();

    for input in inputs {
        let path = Path::new(input);
        if path.is_dir() {
            let folder = documents.add_folder(path, true, accept)?;
            report.added.extend(folder.added);
            report.duplicates.extend(folder.duplicates);
            report.rejected.extend(folder.rejected);
            continue;
        }

        for file in collect_paths_for_patterns([input])? {
            match Document::detect_type(&file) {
                Ok(file_type) if !accept(file_type) => report.rejected.push((
                    file.clone(),
                    BatchPrintError::other(format!("{} files are disabled", file_type.display_name())),
                )),
                _ => {
                    let added = documents.add_files([file]);
                    report.added.extend(added.added);
                    report.duplicates.extend(added.duplicates);
                    report.rejected.extend(added.rejected);
                }
            }
        }
    }

    Ok((documents, report))
}

fn report_import(formatter: &OutputFormatter, report: &ImportReport) {
    for path in &report.duplicates {
        formatter.debug(&format!("Ignoring duplicate {}", path.display()));
    }
    for (path, err) in &report.rejected {
        let reason = err.to_string();
        let reason = reason.lines().next().unwrap_or_default();
        formatter.warning(&format!("Skipping {}: {reason}", path.display()));
    }
}

fn enable_excel(config: &mut AppConfig, include: bool) {
    if include {
        config.enabled_file_types.insert(FileType::Excel, true);
    }
}

async fn count(args: CountArgs, mut config: AppConfig, formatter: &OutputFormatter) -> Result<()> {
    enable_excel(&mut config, args.include_excel);
    if let Some(jobs) = args.jobs {
        config.workers = jobs;
        config.validate()?;
    }

    let (documents, import) = load_documents(&args.inputs, &config)?;
    report_import(formatter, &import);
    if documents.is_empty() {
        return Err(BatchPrintError::EmptyQueue);
    }

    let registry = Arc::new(HandlerRegistry::system(&config));
    let mut manager = PageCountManager::from_config(registry, &config);
    let progress = (!args.json && !formatter.is_quiet()).then(|| Arc::new(ProgressBar::new("Counting")));
    if let Some(bar) = &progress {
        manager = manager.with_progress(bar.callback());
    }

    let summary = manager.calculate_all(documents.documents()).await;
    if let Some(bar) = &progress {
        bar.finish();
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        display_count_summary(formatter, &summary);
    }
    Ok(())
}

async fn print(args: PrintArgs, mut config: AppConfig, formatter: &OutputFormatter) -> Result<()> {
    enable_excel(&mut config, args.include_excel);
    let settings = args.to_settings(&config.default_settings)?;

    let registry = Arc::new(HandlerRegistry::system(&config));
    let backend = Arc::new(PrintTicketBackend::new(Arc::new(SystemLauncher)));
    let printers = Arc::new(PrinterConfigManager::new(backend));

    let (documents, import) = load_documents(&args.inputs, &config)?;
    report_import(formatter, &import);

    if args.dry_run {
        formatter.section("Dry run");
        formatter.info(&format!(
            "Printer: {}",
            settings.printer_name().unwrap_or("(system default)")
        ));
        formatter.info(&format!(
            "Settings: {} {} {} duplex={} copies={} scaling={}",
            settings.paper_size,
            settings.orientation,
            settings.color_mode,
            settings.duplex,
            settings.copies,
            settings.scaling
        ));
        for (index, document) in documents.iter().enumerate() {
            let handler = registry
                .resolve_by_path(document.path())
                .map(|h| h.name())
                .unwrap_or("none");
            formatter.list_item(index + 1, &format!("{} ({handler})", document.file_name()));
        }
        formatter.success("Dry run completed; nothing was printed");
        return Ok(());
    }

    let progress = (!formatter.is_quiet()).then(|| Arc::new(ProgressBar::new("Printing")));
    let mut controller = PrintController::from_config(registry, printers, &config);
    if let Some(bar) = &progress {
        controller = controller.with_progress(bar.callback());
    }
    controller.add_documents(documents.iter().map(|d| d.path().to_path_buf()));
    controller.set_settings(settings);

    let report = controller.start_batch_print()?.wait().await?;
    if let Some(bar) = &progress {
        bar.finish();
    }
    display_batch_report(formatter, &report);

    if report.failed > 0 {
        return Err(BatchPrintError::other(format!(
            "{} of {} document(s) failed to print",
            report.failed, report.total
        )));
    }
    Ok(())
}
