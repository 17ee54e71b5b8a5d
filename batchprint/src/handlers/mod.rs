//! Built-in handlers, one per file-type family.
//!
//! | Handler      | Count                                   | Print                          |
//! |--------------|-----------------------------------------|--------------------------------|
//! | `pdf`        | page tree (`lopdf`)                     | bundled viewer                 |
//! | `word`       | automation, then `docProps/app.xml`     | automation                     |
//! | `powerpoint` | slide parts or automation, per extension | automation                    |
//! | `excel`      | automation layout, then `calamine`      | automation                     |
//! | `image`      | 1, or TIFF frame count                  | viewer, print verb, open       |
//! | `text`       | wrap and paginate                       | notepad, print verb, open      |

pub mod excel;
pub mod image;
pub mod ooxml;
pub mod pdf;
pub mod powerpoint;
pub mod text;
pub mod word;

pub use excel::ExcelHandler;
pub use image::ImageHandler;
pub use pdf::PdfHandler;
pub use powerpoint::PowerPointHandler;
pub use text::TextHandler;
pub use word::WordHandler;

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::automation::{
    BundledViewer, Launcher, OfficeApp, OfficeEngine, OfficeMeasurement, PowerShellOffice, SystemLauncher,
};
use crate::config::{AppConfig, PrintSettings};
use crate::handler::{Handler, HandlerError, HandlerRegistry};

/// External engines shared by the built-in handlers.
#[derive(Clone)]
pub struct Engines {
    /// Process launcher.
    pub launcher: Arc<dyn Launcher>,
    /// Office automation.
    pub office: Arc<dyn OfficeEngine>,
    /// Bundled PDF and image viewer.
    pub viewer: BundledViewer,
}

impl Engines {
    /// Engines of the running system.
    pub fn system(config: &AppConfig) -> Self {
        let launcher: Arc<dyn Launcher> = Arc::new(SystemLauncher);
        Self {
            office: Arc::new(PowerShellOffice::new(Arc::clone(&launcher))),
            viewer: BundledViewer::locate(config.viewer_path.as_deref()),
            launcher,
        }
    }
}

impl fmt::Debug for Engines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engines")
            .field("viewer", &self.viewer)
            .finish_non_exhaustive()
    }
}

/// The six built-in handlers.
pub fn default_handlers(engines: &Engines) -> Vec<Arc<dyn Handler>> {
    vec![
        Arc::new(PdfHandler::new(Arc::clone(&engines.launcher), engines.viewer.clone())),
        Arc::new(WordHandler::new(Arc::clone(&engines.office))),
        Arc::new(PowerPointHandler::new(Arc::clone(&engines.office))),
        Arc::new(ExcelHandler::new(Arc::clone(&engines.office))),
        Arc::new(ImageHandler::new(Arc::clone(&engines.launcher), engines.viewer.clone())),
        Arc::new(TextHandler::new(Arc::clone(&engines.launcher))),
    ]
}

impl HandlerRegistry {
    /// Registry holding the built-in handlers wired to `engines`.
    pub fn with_engines(engines: &Engines) -> Self {
        Self::with_handlers(default_handlers(engines))
    }

    /// Registry holding the built-in handlers wired to the system engines.
    pub fn system(config: &AppConfig) -> Self {
        Self::with_engines(&Engines::system(config))
    }
}

/// File name used in log fields.
pub(crate) fn subject(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Error for a measurement of the wrong shape.
pub(crate) fn unexpected_measurement(app: OfficeApp, measurement: &OfficeMeasurement) -> HandlerError {
    HandlerError::corrupted(format!("{app} returned {measurement:?}"))
}

/// Measure through `office`, without starting it when `app` is not installed.
pub(crate) fn office_measure(
    office: &dyn OfficeEngine,
    app: OfficeApp,
    path: &Path,
) -> Result<OfficeMeasurement, HandlerError> {
    require_app(office, app)?;
    office.measure(app, path)
}

/// Print through `office`, without starting it when `app` is not installed.
pub(crate) fn office_print(
    office: &dyn OfficeEngine,
    app: OfficeApp,
    path: &Path,
    settings: &PrintSettings,
) -> Result<(), HandlerError> {
    require_app(office, app)?;
    office.print(app, path, settings)
}

fn require_app(office: &dyn OfficeEngine, app: OfficeApp) -> Result<(), HandlerError> {
    if office.is_available(app) {
        Ok(())
    } else {
        Err(HandlerError::missing(app.display_name()))
    }
}

/// Log the outcome of a print attempt and collapse it to a flag.
pub(crate) fn report_print(handler: &str, path: &Path, result: Result<(), HandlerError>) -> bool {
    match result {
        Ok(()) => {
            info!(handler, file = %subject(path), "print job submitted");
            true
        }
        Err(err) => {
            warn!(handler, file = %subject(path), error = %err, "print failed");
            false
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted office engine shared by handler tests.

    use super::*;
    use crate::config::PrintSettings;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    pub struct FakeOffice {
        pub available: bool,
        pub measurements: Mutex<VecDeque<Result<OfficeMeasurement, HandlerError>>>,
        pub prints: Mutex<Vec<(OfficeApp, String, u16)>>,
        pub print_result: Option<HandlerError>,
        pub engine_calls: AtomicUsize,
    }

    impl FakeOffice {
        pub fn installed() -> Self {
            Self {
                available: true,
                ..Self::default()
            }
        }

        pub fn absent() -> Self {
            Self::default()
        }

        pub fn push(&self, result: Result<OfficeMeasurement, HandlerError>) {
            self.measurements.lock().unwrap().push_back(result);
        }

        pub fn measure_calls_left(&self) -> usize {
            self.measurements.lock().unwrap().len()
        }

        pub fn engine_calls(&self) -> usize {
            self.engine_calls.load(Ordering::SeqCst)
        }
    }

    impl OfficeEngine for FakeOffice {
        fn is_available(&self, _app: OfficeApp) -> bool {
            self.available
        }

        fn measure(&self, app: OfficeApp, _path: &Path) -> Result<OfficeMeasurement, HandlerError> {
            self.engine_calls.fetch_add(1, Ordering::SeqCst);
            if !self.available {
                return Err(HandlerError::missing(app.display_name()));
            }
            self.measurements
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(HandlerError::corrupted("no scripted measurement")))
        }

        fn print(&self, app: OfficeApp, path: &Path, settings: &PrintSettings) -> Result<(), HandlerError> {
            self.engine_calls.fetch_add(1, Ordering::SeqCst);
            if !self.available {
                return Err(HandlerError::missing(app.display_name()));
            }
            self.prints
                .lock()
                .unwrap()
                .push((app, subject(path), settings.copies));
            match &self.print_result {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }
}
