//! Configuration module for batchprint.
//!
//! This module holds the typed print settings handed to every batch and the
//! application configuration persisted as JSON. It handles:
//! - Parsing of user-facing option names
//! - Application of documented defaults for absent keys
//! - Validation of numeric limits
//! - Loading and saving the configuration file

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::BatchPrintError;
use crate::document::FileType;

/// Maximum number of copies accepted for a single job.
pub const MAX_COPIES: u16 = 999;

/// Maximum number of remembered folders.
pub const MAX_RECENT_FOLDERS: usize = 10;

/// Paper size for the print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaperSize {
    /// ISO A3.
    A3,
    /// ISO A4.
    #[default]
    A4,
    /// ISO A5.
    A5,
    /// US Letter.
    Letter,
    /// US Legal.
    Legal,
    /// US Tabloid.
    Tabloid,
}

impl PaperSize {
    /// Device-mode paper code (`DMPAPER_*`).
    pub fn devmode_code(&self) -> i16 {
        match self {
            Self::Letter => 1,
            Self::Tabloid => 3,
            Self::Legal => 5,
            Self::A3 => 8,
            Self::A4 => 9,
            Self::A5 => 11,
        }
    }

    /// Paper size for a device-mode code, if it is one we name.
    pub fn from_devmode_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(Self::Letter),
            3 => Some(Self::Tabloid),
            5 => Some(Self::Legal),
            8 => Some(Self::A3),
            9 => Some(Self::A4),
            11 => Some(Self::A5),
            _ => None,
        }
    }

    /// Name as written in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A3 => "A3",
            Self::A4 => "A4",
            Self::A5 => "A5",
            Self::Letter => "Letter",
            Self::Legal => "Legal",
            Self::Tabloid => "Tabloid",
        }
    }
}

impl FromStr for PaperSize {
    type Err = BatchPrintError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "a3" => Ok(Self::A3),
            "a4" => Ok(Self::A4),
            "a5" => Ok(Self::A5),
            "letter" => Ok(Self::Letter),
            "legal" => Ok(Self::Legal),
            "tabloid" => Ok(Self::Tabloid),
            _ => Err(BatchPrintError::invalid_config(format!(
                "Invalid paper size: {s}. Must be one of: A3, A4, A5, Letter, Legal, Tabloid"
            ))),
        }
    }
}

impl fmt::Display for PaperSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which edge the sheet is flipped on when printing on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplexTie {
    /// Flip on the long edge (book style).
    #[default]
    LongEdge,
    /// Flip on the short edge (calendar style).
    ShortEdge,
}

impl FromStr for DuplexTie {
    type Err = BatchPrintError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "long" | "long_edge" => Ok(Self::LongEdge),
            "short" | "short_edge" => Ok(Self::ShortEdge),
            _ => Err(BatchPrintError::invalid_config(format!(
                "Invalid duplex tie: {s}. Must be one of: long, short"
            ))),
        }
    }
}

impl fmt::Display for DuplexTie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LongEdge => "long_edge",
            Self::ShortEdge => "short_edge",
        })
    }
}

/// Single or double sided printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplexMode {
    /// One side only.
    #[default]
    Off,
    /// Both sides, flipped on the long edge.
    LongEdge,
    /// Both sides, flipped on the short edge.
    ShortEdge,
}

impl DuplexMode {
    /// Build from the persisted flag and tie.
    pub fn from_parts(enabled: bool, tie: DuplexTie) -> Self {
        match (enabled, tie) {
            (false, _) => Self::Off,
            (true, DuplexTie::LongEdge) => Self::LongEdge,
            (true, DuplexTie::ShortEdge) => Self::ShortEdge,
        }
    }

    /// Whether both sides are printed.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Off)
    }

    /// Flip edge, only meaningful when enabled.
    pub fn tie(&self) -> Option<DuplexTie> {
        match self {
            Self::Off => None,
            Self::LongEdge => Some(DuplexTie::LongEdge),
            Self::ShortEdge => Some(DuplexTie::ShortEdge),
        }
    }

    /// Device-mode duplex code (`DMDUP_*`).
    pub fn devmode_code(&self) -> i16 {
        match self {
            Self::Off => 1,
            Self::LongEdge => 2,
            Self::ShortEdge => 3,
        }
    }

    /// Duplex mode for a device-mode code.
    pub fn from_devmode_code(code: i16) -> Self {
        match code {
            2 => Self::LongEdge,
            3 => Self::ShortEdge,
            _ => Self::Off,
        }
    }
}

impl fmt::Display for DuplexMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "off",
            Self::LongEdge => "long",
            Self::ShortEdge => "short",
        })
    }
}

impl FromStr for DuplexMode {
    type Err = BatchPrintError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "off" | "none" | "simplex" => Ok(Self::Off),
            other => other.parse::<DuplexTie>().map(|tie| Self::from_parts(true, tie)).map_err(|_| {
                BatchPrintError::invalid_config(format!(
                    "Invalid duplex mode: {s}. Must be one of: off, long, short"
                ))
            }),
        }
    }
}

/// Color or monochrome output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Full color.
    Color,
    /// Black and white.
    #[default]
    Grayscale,
}

impl ColorMode {
    /// Device-mode color code (`DMCOLOR_*`).
    pub fn devmode_code(&self) -> i16 {
        match self {
            Self::Grayscale => 1,
            Self::Color => 2,
        }
    }

    /// Color mode for a device-mode code.
    pub fn from_devmode_code(code: i16) -> Self {
        if code == 2 { Self::Color } else { Self::Grayscale }
    }
}

impl FromStr for ColorMode {
    type Err = BatchPrintError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "color" | "colour" => Ok(Self::Color),
            "grayscale" | "greyscale" | "mono" | "monochrome" => Ok(Self::Grayscale),
            _ => Err(BatchPrintError::invalid_config(format!(
                "Invalid color mode: {s}. Must be one of: color, grayscale"
            ))),
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Color => "color",
            Self::Grayscale => "grayscale",
        })
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Upright.
    #[default]
    Portrait,
    /// Sideways.
    Landscape,
}

impl Orientation {
    /// Device-mode orientation code (`DMORIENT_*`).
    pub fn devmode_code(&self) -> i16 {
        match self {
            Self::Portrait => 1,
            Self::Landscape => 2,
        }
    }

    /// Orientation for a device-mode code.
    pub fn from_devmode_code(code: i16) -> Self {
        if code == 2 {
            Self::Landscape
        } else {
            Self::Portrait
        }
    }
}

impl FromStr for Orientation {
    type Err = BatchPrintError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "portrait" => Ok(Self::Portrait),
            "landscape" => Ok(Self::Landscape),
            _ => Err(BatchPrintError::invalid_config(format!(
                "Invalid orientation: {s}. Must be one of: portrait, landscape"
            ))),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
        })
    }
}

/// How page content is scaled to the paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingPolicy {
    /// Scale up or down to fill the printable area.
    #[default]
    Fit,
    /// Only scale down oversized pages.
    Shrink,
    /// Print at 100%.
    ActualSize,
}

impl FromStr for ScalingPolicy {
    type Err = BatchPrintError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "fit" => Ok(Self::Fit),
            "shrink" => Ok(Self::Shrink),
            "actual" | "actual_size" | "none" => Ok(Self::ActualSize),
            _ => Err(BatchPrintError::invalid_config(format!(
                "Invalid scaling policy: {s}. Must be one of: fit, shrink, actual"
            ))),
        }
    }
}

impl fmt::Display for ScalingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fit => "fit",
            Self::Shrink => "shrink",
            Self::ActualSize => "actual_size",
        })
    }
}

/// Settings applied to every document of a print batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SettingsRecord", into = "SettingsRecord")]
pub struct PrintSettings {
    /// Target printer; `None` uses the system default.
    pub printer: Option<String>,
    /// Paper size.
    pub paper_size: PaperSize,
    /// Number of copies per document.
    pub copies: u16,
    /// Duplex mode.
    pub duplex: DuplexMode,
    /// Color mode.
    pub color_mode: ColorMode,
    /// Orientation.
    pub orientation: Orientation,
    /// Scaling policy.
    pub scaling: ScalingPolicy,
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            printer: None,
            paper_size: PaperSize::default(),
            copies: 1,
            duplex: DuplexMode::default(),
            color_mode: ColorMode::default(),
            orientation: Orientation::default(),
            scaling: ScalingPolicy::default(),
        }
    }
}

impl PrintSettings {
    /// Settings with the documented defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Printer name if one is set and non-blank.
    pub fn printer_name(&self) -> Option<&str> {
        self.printer
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Validate numeric limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy count is outside `1..=999`.
    pub fn validate(&self) -> Result<()> {
        if self.copies == 0 || self.copies > MAX_COPIES {
            bail!(BatchPrintError::invalid_config(format!(
                "Copies must be between 1 and {MAX_COPIES}, got {}",
                self.copies
            )));
        }
        Ok(())
    }

    /// Serialize to a flat JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        let record = SettingsRecord::from(self.clone());
        serde_json::json!({
            "printer_name": record.printer_name,
            "paper_size": record.paper_size,
            "copies": record.copies,
            "duplex": record.duplex,
            "duplex_tie": record.duplex_tie,
            "color_mode": record.color_mode,
            "orientation": record.orientation,
            "scaling": record.scaling,
        })
    }

    /// Read from a flat JSON object, applying defaults for absent keys.
    ///
    /// Two values are repaired rather than rejected: an unknown `paper_size`
    /// becomes A4 (with a warning) and `copies` is clamped to `1..=999`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an object, a key has the wrong
    /// JSON type, or an enum key (`duplex_tie`, `color_mode`, `orientation`,
    /// `scaling`) has an unrecognized value.
    pub fn from_json(value: serde_json::Value) -> crate::Result<Self> {
        let record: SettingsRecord = serde_json::from_value(value)?;
        Ok(record.into())
    }
}

/// Flat, persisted form of [`PrintSettings`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct SettingsRecord {
    printer_name: String,
    paper_size: String,
    copies: u16,
    duplex: bool,
    duplex_tie: DuplexTie,
    color_mode: ColorMode,
    orientation: Orientation,
    scaling: ScalingPolicy,
}

impl Default for SettingsRecord {
    fn default() -> Self {
        Self {
            printer_name: String::new(),
            paper_size: PaperSize::default().as_str().to_string(),
            copies: 1,
            duplex: false,
            duplex_tie: DuplexTie::default(),
            color_mode: ColorMode::default(),
            orientation: Orientation::default(),
            scaling: ScalingPolicy::default(),
        }
    }
}

impl From<SettingsRecord> for PrintSettings {
    fn from(record: SettingsRecord) -> Self {
        let paper_size = record.paper_size.parse().unwrap_or_else(|_| {
            tracing::warn!(paper = %record.paper_size, "unknown paper size, using A4");
            PaperSize::A4
        });
        let printer = Some(record.printer_name.trim().to_string()).filter(|p| !p.is_empty());

        Self {
            printer,
            paper_size,
            copies: record.copies.clamp(1, MAX_COPIES),
            duplex: DuplexMode::from_parts(record.duplex, record.duplex_tie),
            color_mode: record.color_mode,
            orientation: record.orientation,
            scaling: record.scaling,
        }
    }
}

impl From<PrintSettings> for SettingsRecord {
    fn from(settings: PrintSettings) -> Self {
        Self {
            printer_name: settings.printer.unwrap_or_default(),
            paper_size: settings.paper_size.as_str().to_string(),
            copies: settings.copies,
            duplex: settings.duplex.is_enabled(),
            duplex_tie: settings.duplex.tie().unwrap_or_default(),
            color_mode: settings.color_mode,
            orientation: settings.orientation,
            scaling: settings.scaling,
        }
    }
}

/// Per-type time limits for a single count or print unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutPolicy {
    /// Limit in seconds for PDF, Word, PowerPoint, image and text files.
    pub default_secs: u64,
    /// Limit in seconds for spreadsheets.
    pub excel_secs: u64,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            default_secs: 30,
            excel_secs: 60,
        }
    }
}

impl TimeoutPolicy {
    /// Uniform limit for every type.
    pub fn uniform(limit: Duration) -> Self {
        let secs = limit.as_secs().max(1);
        Self {
            default_secs: secs,
            excel_secs: secs,
        }
    }

    /// Time limit for a file type.
    pub fn limit_for(&self, file_type: FileType) -> Duration {
        match file_type {
            FileType::Excel => Duration::from_secs(self.excel_secs),
            _ => Duration::from_secs(self.default_secs),
        }
    }
}

fn default_enabled_types() -> BTreeMap<FileType, bool> {
    FileType::ALL
        .iter()
        .map(|ft| (*ft, *ft != FileType::Excel))
        .collect()
}

/// Application configuration persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Printer used in the previous session.
    pub last_printer: String,
    /// Settings pre-filled for new batches.
    pub default_settings: PrintSettings,
    /// Recently imported folders, most recent first.
    pub recent_folders: Vec<PathBuf>,
    /// Which file types are picked up by folder imports.
    pub enabled_file_types: BTreeMap<FileType, bool>,
    /// Concurrent page-count workers.
    pub workers: usize,
    /// Files above this size are skipped when counting pages.
    pub max_file_size_mb: u64,
    /// Pause between documents of a print batch.
    pub document_delay_ms: u64,
    /// Per-type time limits.
    pub timeouts: TimeoutPolicy,
    /// Override for the bundled viewer executable.
    pub viewer_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            last_printer: String::new(),
            default_settings: PrintSettings::new(),
            recent_folders: Vec::new(),
            enabled_file_types: default_enabled_types(),
            workers: 4,
            max_file_size_mb: 100,
            document_delay_ms: 500,
            timeouts: TimeoutPolicy::default(),
            viewer_path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file.
    ///
    /// A missing file yields the defaults. Types absent from
    /// `enabled_file_types` take their default enablement.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(BatchPrintError::ConfigIo {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let mut config: Self = serde_json::from_str(&text)?;
        for (file_type, enabled) in default_enabled_types() {
            config.enabled_file_types.entry(file_type).or_insert(enabled);
        }
        Ok(config)
    }

    /// Save configuration as pretty-printed JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let io_err = |source| BatchPrintError::ConfigIo {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(io_err)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            bail!("Number of workers must be at least 1");
        }

        if self.max_file_size_mb == 0 {
            bail!("Maximum file size must be at least 1 MB");
        }

        if self.timeouts.default_secs == 0 || self.timeouts.excel_secs == 0 {
            bail!("Timeouts must be at least 1 second");
        }

        self.default_settings
            .validate()
            .context("Invalid default print settings")?;

        if let Some(viewer) = &self.viewer_path
            && viewer.as_os_str().is_empty()
        {
            bail!("Viewer path must not be empty");
        }

        Ok(())
    }

    /// Whether folder imports pick up a file type.
    pub fn is_enabled(&self, file_type: FileType) -> bool {
        self.enabled_file_types
            .get(&file_type)
            .copied()
            .unwrap_or(file_type != FileType::Excel)
    }

    /// Get the effective number of workers.
    ///
    /// Never more than the available parallelism, never less than one.
    pub fn effective_workers(&self) -> usize {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        self.workers.clamp(1, cores.max(1))
    }

    /// Size ceiling in bytes for page counting.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    /// Pause between documents of a print batch.
    pub fn document_delay(&self) -> Duration {
        Duration::from_millis(self.document_delay_ms)
    }

    /// Remember a folder as most recently used.
    pub fn remember_folder(&mut self, folder: impl Into<PathBuf>) {
        let folder = folder.into();
        self.recent_folders.retain(|existing| existing != &folder);
        self.recent_folders.insert(0, folder);
        self.recent_folders.truncate(MAX_RECENT_FOLDERS);
    }
}
