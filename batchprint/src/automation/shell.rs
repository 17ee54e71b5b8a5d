//! Operating system shell verbs.
//!
//! On Windows verbs go through `Start-Process -Verb`; elsewhere printing
//! uses CUPS `lp` and opening uses the desktop opener.

use std::path::Path;
use tracing::debug;

use super::{Launcher, launch, powershell, powershell_args, require_success, scripts};
use crate::handler::HandlerError;

/// A shell action on a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellVerb {
    /// Print on the default printer.
    Print,
    /// Print on a named printer.
    PrintTo(String),
    /// Open in the default application for manual printing.
    Open,
}

impl ShellVerb {
    /// `PrintTo` when a printer is named, `Print` otherwise.
    pub fn print_on(printer: Option<&str>) -> Self {
        match printer {
            Some(name) => Self::PrintTo(name.to_string()),
            None => Self::Print,
        }
    }
}

/// Invoke `verb` on `file`.
///
/// # Errors
///
/// [`HandlerError::MissingDependency`] when no suitable shell tool exists,
/// otherwise the classified failure of the tool.
pub fn invoke_verb(launcher: &dyn Launcher, file: &Path, verb: &ShellVerb) -> Result<(), HandlerError> {
    debug!(file = %file.display(), ?verb, "invoking shell verb");
    if cfg!(windows) {
        invoke_windows(launcher, file, verb)
    } else {
        invoke_unix(launcher, file, verb)
    }
}

fn invoke_windows(launcher: &dyn Launcher, file: &Path, verb: &ShellVerb) -> Result<(), HandlerError> {
    let program = powershell(launcher).ok_or_else(|| HandlerError::missing("PowerShell"))?;
    let mut env = vec![("BATCHPRINT_FILE", file.display().to_string())];
    let script = match verb {
        ShellVerb::Print => scripts::SHELL_PRINT,
        ShellVerb::PrintTo(printer) => {
            env.push(("BATCHPRINT_PRINTER", printer.clone()));
            scripts::SHELL_PRINT_TO
        }
        ShellVerb::Open => scripts::SHELL_OPEN,
    };
    let outcome = launch(launcher, &program, "PowerShell", &powershell_args(script), &env)?;
    require_success(outcome).map(|_| ())
}

fn invoke_unix(launcher: &dyn Launcher, file: &Path, verb: &ShellVerb) -> Result<(), HandlerError> {
    let file_arg = file.display().to_string();
    let (tool, args) = match verb {
        ShellVerb::Print => ("lp", vec![file_arg]),
        ShellVerb::PrintTo(printer) => ("lp", vec!["-d".to_string(), printer.clone(), file_arg]),
        ShellVerb::Open if cfg!(target_os = "macos") => ("open", vec![file_arg]),
        ShellVerb::Open => ("xdg-open", vec![file_arg]),
    };
    let program = launcher
        .locate(tool)
        .ok_or_else(|| HandlerError::missing(tool))?;
    let outcome = launch(launcher, &program, tool, &args, &[])?;
    require_success(outcome).map(|_| ())
}
