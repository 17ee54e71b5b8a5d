//! Printer device configuration.
//!
//! Not every handler can pass duplex, color, orientation and paper through
//! its own engine, so a print batch temporarily rewrites the target
//! printer's device defaults and puts them back afterwards.
//! [`PrinterConfigManager`] owns that snapshot/apply/restore cycle; a
//! [`PrinterBackend`] reads and writes the actual device configuration.

pub mod manager;
pub mod ticket;

pub use manager::PrinterConfigManager;
pub use ticket::PrintTicketBackend;

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::{ColorMode, DuplexMode, Orientation, PaperSize, PrintSettings};
use crate::{BatchPrintError, Result};

/// Device-mode fields managed during a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevMode {
    /// Duplex mode.
    pub duplex: DuplexMode,
    /// Copies per job.
    pub copies: u16,
    /// Color mode.
    pub color: ColorMode,
    /// Orientation.
    pub orientation: Orientation,
    /// Paper size; `None` when the device uses a size we do not name, in
    /// which case writes leave it untouched.
    pub paper: Option<PaperSize>,
}

impl Default for DevMode {
    fn default() -> Self {
        Self {
            duplex: DuplexMode::Off,
            copies: 1,
            color: ColorMode::Color,
            orientation: Orientation::Portrait,
            paper: Some(PaperSize::A4),
        }
    }
}

impl DevMode {
    /// Device mode for a batch printed with `settings`.
    ///
    /// Copies stay at one: applications pass the copy count per job, and a
    /// device default on top of that would multiply it.
    pub fn for_batch(settings: &PrintSettings) -> Self {
        Self {
            duplex: settings.duplex,
            copies: 1,
            color: settings.color_mode,
            orientation: settings.orientation,
            paper: Some(settings.paper_size),
        }
    }

    /// Names of the fields that differ from `other`.
    pub fn mismatches(&self, other: &DevMode) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.duplex != other.duplex {
            fields.push("duplex");
        }
        if self.copies != other.copies {
            fields.push("copies");
        }
        if self.color != other.color {
            fields.push("color");
        }
        if self.orientation != other.orientation {
            fields.push("orientation");
        }
        if self.paper.is_some() && other.paper.is_some() && self.paper != other.paper {
            fields.push("paper");
        }
        fields
    }
}

impl fmt::Display for DevMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let paper = self.paper.map(|p| p.as_str()).unwrap_or("other");
        write!(
            f,
            "duplex={} copies={} color={} orientation={} paper={}",
            self.duplex.devmode_code(),
            self.copies,
            self.color,
            self.orientation,
            paper
        )
    }
}

/// Reads and writes a printer's device configuration.
pub trait PrinterBackend: Send + Sync {
    /// Current device mode of `printer`.
    ///
    /// # Errors
    ///
    /// [`BatchPrintError::PrinterConfig`] if the printer is unknown or
    /// cannot be queried.
    fn read(&self, printer: &str) -> Result<DevMode>;

    /// Replace the device mode of `printer`.
    ///
    /// # Errors
    ///
    /// [`BatchPrintError::PrinterConfig`] if the configuration is rejected.
    fn write(&self, printer: &str, mode: &DevMode) -> Result<()>;
}

/// In-process printers, for simulation and tests.
#[derive(Debug, Default)]
pub struct MemoryPrinterBackend {
    printers: Mutex<HashMap<String, DevMode>>,
    writes: Mutex<Vec<(String, DevMode)>>,
    reject_writes: AtomicBool,
}

impl MemoryPrinterBackend {
    /// Backend without printers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a printer with an initial device mode.
    pub fn with_printer(self, name: impl Into<String>, mode: DevMode) -> Self {
        self.set(name, mode);
        self
    }

    /// Set a printer's device mode directly, bypassing the write log.
    pub fn set(&self, name: impl Into<String>, mode: DevMode) {
        lock(&self.printers).insert(name.into(), mode);
    }

    /// Current device mode of a printer.
    pub fn get(&self, name: &str) -> Option<DevMode> {
        lock(&self.printers).get(name).copied()
    }

    /// Every successful write, oldest first.
    pub fn writes(&self) -> Vec<(String, DevMode)> {
        lock(&self.writes).clone()
    }

    /// Make subsequent writes fail, as a driver refusing changes would.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PrinterBackend for MemoryPrinterBackend {
    fn read(&self, printer: &str) -> Result<DevMode> {
        self.get(printer)
            .ok_or_else(|| BatchPrintError::printer_config(printer, "printer not found"))
    }

    fn write(&self, printer: &str, mode: &DevMode) -> Result<()> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(BatchPrintError::printer_config(printer, "driver rejected the configuration"));
        }
        let mut printers = lock(&self.printers);
        let current = printers
            .get_mut(printer)
            .ok_or_else(|| BatchPrintError::printer_config(printer, "printer not found"))?;

        let paper = mode.paper.or(current.paper);
        *current = DevMode { paper, ..*mode };
        lock(&self.writes).push((printer.to_string(), *current));
        Ok(())
    }
}
