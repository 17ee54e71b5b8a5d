//! Bundled PDF and image viewer.
//!
//! Ships next to the executable as `external/SumatraPDF/SumatraPDF.exe` and
//! prints silently with explicit duplex, orientation, color, scaling, paper
//! and copy settings.

use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{Launcher, launch, require_success};
use crate::config::{ColorMode, DuplexMode, Orientation, PrintSettings, ScalingPolicy};
use crate::handler::HandlerError;

/// Location of the viewer relative to the executable's directory.
pub const VIEWER_RELATIVE_PATH: &str = "external/SumatraPDF/SumatraPDF.exe";

const VIEWER_NAME: &str = "bundled PDF viewer";

/// Handle to the bundled viewer executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundledViewer {
    path: PathBuf,
}

impl BundledViewer {
    /// Viewer at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Viewer at `override_path`, or next to the running executable.
    pub fn locate(override_path: Option<&Path>) -> Self {
        if let Some(path) = override_path {
            return Self::new(path);
        }

        let base = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        Self::new(base.join(VIEWER_RELATIVE_PATH))
    }

    /// Path of the viewer executable.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the executable exists.
    pub fn is_available(&self) -> bool {
        self.path.is_file()
    }

    /// Value of the `-print-settings` argument.
    pub fn print_settings_arg(settings: &PrintSettings) -> String {
        let duplex = match settings.duplex {
            DuplexMode::Off => "simplex",
            DuplexMode::LongEdge => "duplexlong",
            DuplexMode::ShortEdge => "duplexshort",
        };
        let orientation = match settings.orientation {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        };
        let color = match settings.color_mode {
            ColorMode::Color => "color",
            ColorMode::Grayscale => "monochrome",
        };
        let scaling = match settings.scaling {
            ScalingPolicy::Fit => "fit",
            ScalingPolicy::Shrink => "shrink",
            ScalingPolicy::ActualSize => "noscale",
        };

        format!(
            "{duplex},{orientation},{color},{scaling},paper={},{}x",
            settings.paper_size.as_str(),
            settings.copies.max(1)
        )
    }

    /// Full argument list printing `file`.
    pub fn print_args(file: &Path, settings: &PrintSettings) -> Vec<String> {
        let mut args = Vec::with_capacity(6);
        match settings.printer_name() {
            Some(printer) => {
                args.push("-print-to".to_string());
                args.push(printer.to_string());
            }
            None => args.push("-print-to-default".to_string()),
        }
        args.push("-silent".to_string());
        args.push("-print-settings".to_string());
        args.push(Self::print_settings_arg(settings));
        args.push(file.display().to_string());
        args
    }

    /// Print `file` through the viewer.
    ///
    /// # Errors
    ///
    /// [`HandlerError::MissingDependency`] when the viewer is not installed,
    /// otherwise the classified failure reported by the viewer.
    pub fn print(&self, launcher: &dyn Launcher, file: &Path, settings: &PrintSettings) -> Result<(), HandlerError> {
        if !self.is_available() {
            debug!(viewer = %self.path.display(), "bundled viewer not found");
            return Err(HandlerError::missing(VIEWER_NAME));
        }

        let args = Self::print_args(file, settings);
        let outcome = launch(launcher, &self.path, VIEWER_NAME, &args, &[])?;
        require_success(outcome).map(|_| ())
    }
}
