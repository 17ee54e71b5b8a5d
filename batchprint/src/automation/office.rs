//! Office suite automation.
//!
//! Every call runs in its own PowerShell process that creates a private COM
//! instance, so sessions are never shared between documents and a crashed
//! or hung host cannot poison later calls.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use super::{Launcher, launch, powershell, powershell_args, scripts};
use crate::config::PrintSettings;
use crate::handler::{HandlerError, classify_failure};

/// An office application reachable through automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OfficeApp {
    /// Word processor.
    Word,
    /// Presentation program.
    PowerPoint,
    /// Spreadsheet program.
    Excel,
}

impl OfficeApp {
    /// Product name shown to users.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Word => "Microsoft Word",
            Self::PowerPoint => "Microsoft PowerPoint",
            Self::Excel => "Microsoft Excel",
        }
    }

    /// COM programmatic identifier.
    pub fn prog_id(&self) -> &'static str {
        match self {
            Self::Word => "Word.Application",
            Self::PowerPoint => "PowerPoint.Application",
            Self::Excel => "Excel.Application",
        }
    }

    fn measure_script(&self) -> &'static str {
        match self {
            Self::Word => scripts::WORD_MEASURE,
            Self::PowerPoint => scripts::POWERPOINT_MEASURE,
            Self::Excel => scripts::EXCEL_MEASURE,
        }
    }

    fn print_script(&self) -> &'static str {
        match self {
            Self::Word => scripts::WORD_PRINT,
            Self::PowerPoint => scripts::POWERPOINT_PRINT,
            Self::Excel => scripts::EXCEL_PRINT,
        }
    }
}

impl fmt::Display for OfficeApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Used range and manual page breaks of one worksheet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    /// Worksheet name.
    pub name: String,
    /// Rows in the used range, 0 for an empty sheet.
    pub rows: u32,
    /// Columns in the used range, 0 for an empty sheet.
    pub columns: u32,
    /// Manual horizontal page breaks.
    pub horizontal_breaks: u32,
    /// Manual vertical page breaks.
    pub vertical_breaks: u32,
}

/// What an office application reported about a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfficeMeasurement {
    /// Paginated page count of a word-processing document.
    Pages(i64),
    /// Slide count of a presentation.
    Slides(i64),
    /// Per-sheet layout of a workbook.
    Sheets(Vec<SheetLayout>),
}

/// Drives an installed office suite.
///
/// Implementations must give each call an isolated session that suppresses
/// dialogs and always shuts the host application down.
pub trait OfficeEngine: Send + Sync {
    /// Whether `app` can be automated on this machine.
    fn is_available(&self, app: OfficeApp) -> bool;

    /// Open `path` read-only and measure it.
    ///
    /// # Errors
    ///
    /// Returns a classified [`HandlerError`].
    fn measure(&self, app: OfficeApp, path: &Path) -> Result<OfficeMeasurement, HandlerError>;

    /// Print `path` with the copy count and printer from `settings`.
    ///
    /// # Errors
    ///
    /// Returns a classified [`HandlerError`].
    fn print(&self, app: OfficeApp, path: &Path, settings: &PrintSettings) -> Result<(), HandlerError>;
}

#[derive(Debug, Deserialize)]
struct MeasureReply {
    pages: Option<i64>,
    slides: Option<i64>,
    sheets: Option<Vec<SheetLayout>>,
}

/// [`OfficeEngine`] driving COM automation through PowerShell.
pub struct PowerShellOffice {
    launcher: Arc<dyn Launcher>,
    availability: Mutex<HashMap<OfficeApp, bool>>,
}

impl PowerShellOffice {
    /// Create an engine spawning processes through `launcher`.
    pub fn new(launcher: Arc<dyn Launcher>) -> Self {
        Self {
            launcher,
            availability: Mutex::new(HashMap::new()),
        }
    }

    fn run_script(&self, app: OfficeApp, script: &str, env: &[(&str, String)]) -> Result<String, HandlerError> {
        let program =
            powershell(self.launcher.as_ref()).ok_or_else(|| HandlerError::missing(app.display_name()))?;
        let outcome = launch(
            self.launcher.as_ref(),
            &program,
            "PowerShell",
            &powershell_args(script),
            env,
        )?;

        match outcome.status {
            Some(0) => Ok(outcome.stdout),
            Some(scripts::EXIT_NO_ENGINE) => {
                debug!(app = %app, detail = %outcome.detail(), "automation server unavailable");
                Err(HandlerError::missing(app.display_name()))
            }
            _ => {
                let detail = outcome.detail();
                warn!(app = %app, detail = %detail, "automation call failed");
                Err(classify_failure(&detail))
            }
        }
    }

    fn parse_measurement(app: OfficeApp, stdout: &str) -> Result<OfficeMeasurement, HandlerError> {
        let line = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| line.starts_with('{'))
            .ok_or_else(|| HandlerError::corrupted(format!("{app} returned no measurement")))?;

        let reply: MeasureReply = serde_json::from_str(line)
            .map_err(|e| HandlerError::corrupted(format!("{app} returned malformed output: {e}")))?;

        let measurement = match app {
            OfficeApp::Word => reply.pages.map(OfficeMeasurement::Pages),
            OfficeApp::PowerPoint => reply.slides.map(OfficeMeasurement::Slides),
            OfficeApp::Excel => reply.sheets.map(OfficeMeasurement::Sheets),
        };
        measurement.ok_or_else(|| HandlerError::corrupted(format!("{app} returned no measurement")))
    }
}

impl fmt::Debug for PowerShellOffice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PowerShellOffice").finish_non_exhaustive()
    }
}

impl OfficeEngine for PowerShellOffice {
    fn is_available(&self, app: OfficeApp) -> bool {
        if let Some(known) = self
            .availability
            .lock()
            .ok()
            .and_then(|cache| cache.get(&app).copied())
        {
            return known;
        }

        let env = [("BATCHPRINT_PROGID", app.prog_id().to_string())];
        let available = self.run_script(app, scripts::PROBE, &env).is_ok();
        debug!(app = %app, available, "probed automation server");

        if let Ok(mut cache) = self.availability.lock() {
            cache.insert(app, available);
        }
        available
    }

    fn measure(&self, app: OfficeApp, path: &Path) -> Result<OfficeMeasurement, HandlerError> {
        let env = [("BATCHPRINT_FILE", path.display().to_string())];
        let stdout = self.run_script(app, app.measure_script(), &env)?;
        Self::parse_measurement(app, &stdout)
    }

    fn print(&self, app: OfficeApp, path: &Path, settings: &PrintSettings) -> Result<(), HandlerError> {
        let env = [
            ("BATCHPRINT_FILE", path.display().to_string()),
            (
                "BATCHPRINT_PRINTER",
                settings.printer_name().unwrap_or_default().to_string(),
            ),
            ("BATCHPRINT_COPIES", settings.copies.max(1).to_string()),
        ];
        self.run_script(app, app.print_script(), &env).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::testing::FakeLauncher;

    fn engine(fake: FakeLauncher) -> (Arc<FakeLauncher>, PowerShellOffice) {
        let fake = Arc::new(fake);
        let engine = PowerShellOffice::new(fake.clone());
        (fake, engine)
    }

    #[test]
    fn test_measure_word_pages() {
        let (fake, office) = engine(FakeLauncher::with_programs(&["powershell"]));
        fake.push_stdout(0, "{\"pages\":12}\r\n");

        let result = office.measure(OfficeApp::Word, Path::new("C:/docs/a.docx"));
        assert_eq!(result, Ok(OfficeMeasurement::Pages(12)));

        let call = &fake.calls()[0];
        assert_eq!(call.env_var("BATCHPRINT_FILE"), Some("C:/docs/a.docx"));
        assert_eq!(call.script(), scripts::WORD_MEASURE);
    }

    #[test]
    fn test_measure_excel_sheets() {
        let (fake, office) = engine(FakeLauncher::with_programs(&["powershell"]));
        fake.push_stdout(
            0,
            r#"{"sheets":[{"name":"Data","rows":200,"columns":3,"horizontal_breaks":0,"vertical_breaks":0}]}"#,
        );

        let result = office.measure(OfficeApp::Excel, Path::new("book.xlsx")).unwrap();
        let OfficeMeasurement::Sheets(sheets) = result else {
            panic!("expected sheets");
        };
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].rows, 200);
        assert_eq!(sheets[0].columns, 3);
    }

    #[test]
    fn test_exit_code_three_is_missing_dependency() {
        let (fake, office) = engine(FakeLauncher::with_programs(&["powershell"]));
        fake.push_stderr(3, "Retrieving the COM class factory failed");

        let result = office.measure(OfficeApp::PowerPoint, Path::new("deck.ppt"));
        assert_eq!(
            result,
            Err(HandlerError::missing("Microsoft PowerPoint"))
        );
    }

    #[test]
    fn test_failure_is_classified() {
        let (fake, office) = engine(FakeLauncher::with_programs(&["powershell"]));
        fake.push_stderr(1, "The password is incorrect.");
        fake.push_stderr(1, "Word experienced an error trying to open the file.");

        assert!(matches!(
            office.measure(OfficeApp::Word, Path::new("a.doc")),
            Err(HandlerError::Encrypted { .. })
        ));
        assert!(matches!(
            office.measure(OfficeApp::Word, Path::new("a.doc")),
            Err(HandlerError::Corrupted { .. })
        ));
    }

    #[test]
    fn test_malformed_output_is_corrupted() {
        let (fake, office) = engine(FakeLauncher::with_programs(&["powershell"]));
        fake.push_stdout(0, "no json here");
        fake.push_stdout(0, "{\"slides\":4}");

        assert!(matches!(
            office.measure(OfficeApp::Word, Path::new("a.doc")),
            Err(HandlerError::Corrupted { .. })
        ));
        assert!(matches!(
            office.measure(OfficeApp::Word, Path::new("a.doc")),
            Err(HandlerError::Corrupted { .. })
        ));
    }

    #[test]
    fn test_no_powershell() {
        let (fake, office) = engine(FakeLauncher::default());
        assert!(!office.is_available(OfficeApp::Excel));
        assert_eq!(
            office.measure(OfficeApp::Excel, Path::new("a.xls")),
            Err(HandlerError::missing("Microsoft Excel"))
        );
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn test_availability_is_cached() {
        let (fake, office) = engine(FakeLauncher::with_programs(&["powershell"]));
        fake.push_stderr(3, "");

        assert!(!office.is_available(OfficeApp::Word));
        assert!(!office.is_available(OfficeApp::Word));
        assert_eq!(fake.calls().len(), 1);
        assert_eq!(
            fake.calls()[0].env_var("BATCHPRINT_PROGID"),
            Some("Word.Application")
        );
    }

    #[test]
    fn test_print_passes_settings() {
        let (fake, office) = engine(FakeLauncher::with_programs(&["powershell"]));
        let settings = PrintSettings {
            printer: Some("Laser".to_string()),
            copies: 2,
            ..PrintSettings::new()
        };

        office
            .print(OfficeApp::Excel, Path::new("book.xls"), &settings)
            .unwrap();

        let call = &fake.calls()[0];
        assert_eq!(call.env_var("BATCHPRINT_PRINTER"), Some("Laser"));
        assert_eq!(call.env_var("BATCHPRINT_COPIES"), Some("2"));
        assert_eq!(call.script(), scripts::EXCEL_PRINT);
    }
}
