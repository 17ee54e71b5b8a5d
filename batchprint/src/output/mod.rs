//! User-facing output for batchprint.
//!
//! This module handles everything shown to the user rather than logged:
//! - Formatted status messages ([`OutputFormatter`])
//! - Batch progress ([`ProgressBar`])
//! - Page count and print batch reports
//!
//! Reports are built as plain lines first so the text can be checked
//! without capturing stdout.

pub mod formatter;
pub mod progress;

pub use formatter::{MessageLevel, OutputFormatter};
pub use progress::{ProgressBar, format_duration};

use crate::handler::HandlerRegistry;
use crate::page_count::{PageCountResult, PageCountStatus, PageCountSummary};
use crate::print_controller::BatchReport;

fn pages_text(pages: u64, approximate: bool) -> String {
    if approximate {
        format!("~{pages}")
    } else {
        pages.to_string()
    }
}

fn result_line(result: &PageCountResult) -> String {
    match (result.status, result.pages) {
        (PageCountStatus::Success, Some(pages)) => format!(
            "{}: {} page(s)",
            result.file_name,
            pages_text(u64::from(pages), result.approximate)
        ),
        (status, _) => match &result.message {
            Some(message) => format!("{}: {status} - {message}", result.file_name),
            None => format!("{}: {status}", result.file_name),
        },
    }
}

/// Lines of a page count report, with the level each is shown at.
pub fn count_summary_lines(summary: &PageCountSummary, verbose: bool) -> Vec<(MessageLevel, String)> {
    let mut lines = Vec::new();

    if verbose {
        for result in summary.results.iter().filter(|r| r.is_success()) {
            lines.push((MessageLevel::Debug, result_line(result)));
        }
    }

    for (file_type, totals) in summary.by_type.iter().filter(|(_, t)| t.files > 0) {
        lines.push((
            MessageLevel::Info,
            format!("  {:<16} {:>4} file(s) {:>8} page(s)", file_type.display_name(), totals.files, totals.pages),
        ));
    }

    for result in &summary.skipped {
        lines.push((MessageLevel::Warning, result_line(result)));
    }
    for result in &summary.errors {
        lines.push((MessageLevel::Error, result_line(result)));
    }
    if summary.was_cancelled() {
        lines.push((
            MessageLevel::Warning,
            format!("Cancelled: {} file(s) were not counted", summary.cancelled.len()),
        ));
    }

    let total = format!(
        "Total: {} page(s) in {} of {} file(s) ({:.2}s)",
        pages_text(summary.total_pages, summary.approximate),
        summary.success_count,
        summary.total_files,
        summary.elapsed.as_secs_f64()
    );
    let level = if summary.success_count == summary.total_files {
        MessageLevel::Success
    } else {
        MessageLevel::Info
    };
    lines.push((level, total));
    if summary.approximate {
        lines.push((MessageLevel::Info, "~ marks estimated page counts".to_string()));
    }
    lines
}

/// Lines of a print batch report.
pub fn batch_report_lines(report: &BatchReport) -> Vec<(MessageLevel, String)> {
    let mut lines: Vec<(MessageLevel, String)> = report
        .failures
        .iter()
        .map(|failure| (MessageLevel::Error, format!("{}: {}", failure.file_name, failure.message)))
        .collect();

    if report.was_cancelled() {
        lines.push((
            MessageLevel::Warning,
            format!("Cancelled: {} document(s) were not printed", report.not_started),
        ));
    }

    let level = if report.is_success() {
        MessageLevel::Success
    } else {
        MessageLevel::Warning
    };
    lines.push((
        level,
        format!("{} in {}", report.describe(), format_duration(report.elapsed)),
    ));
    lines
}

fn emit(formatter: &OutputFormatter, lines: Vec<(MessageLevel, String)>) {
    for (level, line) in lines {
        match level {
            MessageLevel::Info => formatter.info(&line),
            MessageLevel::Success => formatter.success(&line),
            MessageLevel::Warning => formatter.warning(&line),
            MessageLevel::Error => formatter.error(&line),
            MessageLevel::Debug => formatter.debug(&line),
        }
    }
}

/// Print a page count report.
pub fn display_count_summary(formatter: &OutputFormatter, summary: &PageCountSummary) {
    formatter.section("Page count");
    emit(formatter, count_summary_lines(summary, formatter.is_verbose()));
}

/// Print a batch report.
pub fn display_batch_report(formatter: &OutputFormatter, report: &BatchReport) {
    formatter.section("Print batch");
    emit(formatter, batch_report_lines(report));
}

/// Print the extensions each registered handler owns.
pub fn display_formats(formatter: &OutputFormatter, registry: &HandlerRegistry) {
    for (name, extensions) in registry.extensions_by_handler() {
        formatter.line(&format!("{name:<12} {}", extensions.join(" ")));
    }
}
