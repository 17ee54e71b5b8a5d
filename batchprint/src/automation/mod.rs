//! External engines.
//!
//! Everything that leaves the process lives here: spawning programs
//! ([`Launcher`]), shell verbs, the bundled viewer and office automation.
//! Handlers only see these traits, so tests substitute recording fakes.

pub mod launcher;
pub mod office;
pub mod scripts;
pub mod shell;
pub mod viewer;

pub use launcher::{CommandOutcome, Launcher, SystemLauncher};
pub use office::{OfficeApp, OfficeEngine, OfficeMeasurement, PowerShellOffice, SheetLayout};
pub use shell::{ShellVerb, invoke_verb};
pub use viewer::BundledViewer;

use std::io;
use std::path::{Path, PathBuf};

use crate::handler::{HandlerError, classify_failure};

/// Find a PowerShell executable, preferring Windows PowerShell.
pub fn powershell(launcher: &dyn Launcher) -> Option<PathBuf> {
    ["powershell", "pwsh"]
        .iter()
        .find_map(|name| launcher.locate(name))
}

/// Arguments running `script` non-interactively.
pub fn powershell_args(script: &str) -> Vec<String> {
    [
        "-NoProfile",
        "-NonInteractive",
        "-ExecutionPolicy",
        "Bypass",
        "-Command",
        script,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Launch a tool, mapping spawn failures onto the handler taxonomy.
pub(crate) fn launch(
    launcher: &dyn Launcher,
    program: &Path,
    tool: &str,
    args: &[String],
    env: &[(&str, String)],
) -> Result<CommandOutcome, HandlerError> {
    launcher.run(program, args, env).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => HandlerError::missing(tool),
        io::ErrorKind::PermissionDenied => HandlerError::encrypted(format!("{tool}: {e}")),
        _ => HandlerError::corrupted(format!("{tool}: {e}")),
    })
}

/// Turn a non-zero exit into a classified error.
pub(crate) fn require_success(outcome: CommandOutcome) -> Result<CommandOutcome, HandlerError> {
    if outcome.success() {
        Ok(outcome)
    } else {
        Err(classify_failure(&outcome.detail()))
    }
}
