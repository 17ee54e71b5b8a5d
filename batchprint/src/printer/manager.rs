//! Snapshot, apply and restore of printer device settings.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::{DevMode, PrinterBackend};
use crate::Result;
use crate::config::PrintSettings;

/// Applies batch settings to printers and puts the originals back.
///
/// At most one backup is held per printer. A second [`apply`](Self::apply)
/// before [`restore`](Self::restore) keeps the first snapshot, so restoring
/// always returns the printer to the state before the batch started.
pub struct PrinterConfigManager {
    backend: Arc<dyn PrinterBackend>,
    backups: Mutex<HashMap<String, DevMode>>,
}

impl fmt::Debug for PrinterConfigManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrinterConfigManager")
            .field("backups", &self.backups().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl PrinterConfigManager {
    /// Create a manager writing through `backend`.
    pub fn new(backend: Arc<dyn PrinterBackend>) -> Self {
        Self {
            backend,
            backups: Mutex::new(HashMap::new()),
        }
    }

    fn backups(&self) -> MutexGuard<'_, HashMap<String, DevMode>> {
        self.backups.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot `printer`'s current device mode unless one is already held.
    pub fn backup(&self, printer: &str) -> Result<DevMode> {
        if let Some(existing) = self.backup_for(printer) {
            debug!(printer, "keeping existing backup");
            return Ok(existing);
        }
        let current = self.backend.read(printer)?;
        self.backups().insert(printer.to_string(), current);
        debug!(printer, %current, "backed up printer settings");
        Ok(current)
    }

    /// Back up `printer` and switch it to the batch settings.
    ///
    /// The result is read back; fields the driver silently ignored are logged
    /// as warnings, not treated as failures.
    pub fn apply(&self, printer: &str, settings: &PrintSettings) -> Result<()> {
        self.backup(printer)?;

        let target = DevMode::for_batch(settings);
        self.backend.write(printer, &target)?;

        match self.backend.read(printer) {
            Ok(actual) => {
                let ignored = target.mismatches(&actual);
                if ignored.is_empty() {
                    info!(printer, %target, "applied printer settings");
                } else {
                    warn!(printer, fields = ?ignored, "printer did not accept all settings");
                }
            }
            Err(e) => warn!(printer, error = %e, "could not verify printer settings"),
        }
        Ok(())
    }

    /// Write the backup for `printer` back and forget it.
    ///
    /// Does nothing when no backup is held. A failed write keeps the backup
    /// so the restore can be retried.
    pub fn restore(&self, printer: &str) -> Result<()> {
        let Some(original) = self.backups().remove(printer) else {
            return Ok(());
        };

        if let Err(e) = self.backend.write(printer, &original) {
            self.backups().insert(printer.to_string(), original);
            return Err(e);
        }
        info!(printer, "restored printer settings");
        Ok(())
    }

    /// Restore every printer with a backup, returning the first error.
    pub fn restore_all(&self) -> Result<()> {
        let printers: Vec<String> = self.backups().keys().cloned().collect();
        let mut first_error = None;
        for printer in printers {
            if let Err(e) = self.restore(&printer) {
                warn!(printer, error = %e, "failed to restore printer settings");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Whether a backup is held for `printer`.
    pub fn has_backup(&self, printer: &str) -> bool {
        self.backups().contains_key(printer)
    }

    /// The held backup for `printer`, if any.
    pub fn backup_for(&self, printer: &str) -> Option<DevMode> {
        self.backups().get(printer).copied()
    }
}
