//! CLI argument parsing for batchprint.
//!
//! This module defines the command-line interface using `clap` and turns
//! print flags into [`PrintSettings`] on top of the configured defaults.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use batchprint::config::{ColorMode, DuplexMode, Orientation, PrintSettings};
use batchprint::error::Result;

/// Count pages of and print batches of documents.
///
/// batchprint accepts Word, PowerPoint, Excel, PDF, image and text files,
/// counts their pages concurrently, and prints them in order with one set
/// of printer settings.
#[derive(Parser, Debug)]
#[command(name = "batchprint")]
#[command(version)]
#[command(about = "Count pages of and print batches of documents", long_about = None)]
#[command(author)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (JSON)
    ///
    /// Missing files are treated as empty; every setting has a default.
    #[arg(long, global = true, value_name = "FILE", env = "BATCHPRINT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output - show per-document details and debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Count the pages of documents
    ///
    /// Examples:
    ///   batchprint count report.docx slides.pptx
    ///   batchprint count "scans/*.tif" --json
    Count(CountArgs),

    /// Print documents in order with one set of settings
    ///
    /// Examples:
    ///   batchprint print *.pdf --printer "Office Laser" --duplex long
    ///   batchprint print contracts/ --copies 2 --dry-run
    Print(PrintArgs),

    /// List supported file extensions and the handler owning each
    Formats,
}

#[derive(Args, Debug)]
pub struct CountArgs {
    /// Files, folders or glob patterns
    #[arg(required = true, value_name = "PATH")]
    pub inputs: Vec<String>,

    /// Number of documents counted at the same time
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Write the summary as JSON to stdout
    #[arg(long)]
    pub json: bool,

    /// Count Excel workbooks too (disabled by default)
    #[arg(long)]
    pub include_excel: bool,
}

#[derive(Args, Debug)]
pub struct PrintArgs {
    /// Files, folders or glob patterns, printed in the given order
    #[arg(required = true, value_name = "PATH")]
    pub inputs: Vec<String>,

    /// Target printer; the system default when omitted
    #[arg(short, long, value_name = "NAME")]
    pub printer: Option<String>,

    /// Paper size: A3, A4, A5, Letter, Legal or Tabloid
    #[arg(long, value_name = "SIZE")]
    pub paper: Option<String>,

    /// Copies of each document (1-999)
    #[arg(short = 'c', long, value_name = "N")]
    pub copies: Option<u16>,

    /// Print on both sides, flipping on the long or short edge
    #[arg(long, value_name = "EDGE")]
    #[arg(value_parser = ["off", "long", "short"])]
    pub duplex: Option<String>,

    /// Print in color instead of grayscale
    #[arg(long)]
    pub color: bool,

    /// Landscape orientation
    #[arg(long)]
    pub landscape: bool,

    /// Page scaling: fit, shrink or actual
    #[arg(long, value_name = "POLICY")]
    pub scaling: Option<String>,

    /// Print Excel workbooks too (disabled by default)
    #[arg(long)]
    pub include_excel: bool,

    /// Show what would be printed without printing
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

impl PrintArgs {
    /// Apply the flags to `base`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown paper, duplex or scaling values and
    /// for copy counts outside `1..=999`.
    pub fn to_settings(&self, base: &PrintSettings) -> Result<PrintSettings> {
        let mut settings = base.clone();

        if let Some(printer) = &self.printer {
            settings.printer = Some(printer.clone());
        }
        if let Some(paper) = &self.paper {
            settings.paper_size = paper.parse()?;
        }
        if let Some(copies) = self.copies {
            settings.copies = copies;
        }
        if let Some(duplex) = &self.duplex {
            settings.duplex = duplex.parse::<DuplexMode>()?;
        }
        if self.color {
            settings.color_mode = ColorMode::Color;
        }
        if self.landscape {
            settings.orientation = Orientation::Landscape;
        }
        if let Some(scaling) = &self.scaling {
            settings.scaling = scaling.parse()?;
        }

        settings.validate()?;
        Ok(settings)
    }
}
