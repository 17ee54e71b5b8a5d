//! Process launching.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::debug;

/// Result of a finished external process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutcome {
    /// Exit code, `None` when terminated by a signal.
    pub status: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutcome {
    /// Outcome of a process that exited with `code` and no output.
    pub fn exited(code: i32) -> Self {
        Self {
            status: Some(code),
            ..Self::default()
        }
    }

    /// Whether the process exited with code 0.
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Most useful diagnostic text: stderr when present, else stdout.
    pub fn detail(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.status {
            Some(code) => format!("exited with code {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

impl From<Output> for CommandOutcome {
    fn from(output: Output) -> Self {
        Self {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Spawns external programs and waits for them.
///
/// Implementations block the calling thread; callers bound them with
/// [`run_with_timeout`](crate::handler::run_with_timeout).
pub trait Launcher: Send + Sync {
    /// Run `program` with `args` and extra environment variables.
    ///
    /// # Errors
    ///
    /// Returns the spawn error; a non-zero exit is reported in the outcome.
    fn run(&self, program: &Path, args: &[String], env: &[(&str, String)]) -> io::Result<CommandOutcome>;

    /// Find an executable on `PATH`.
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

/// [`Launcher`] backed by `std::process` and `which`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl SystemLauncher {
    #[cfg(windows)]
    fn hide_window(command: &mut Command) {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        command.creation_flags(CREATE_NO_WINDOW);
    }

    #[cfg(not(windows))]
    fn hide_window(_command: &mut Command) {}
}

impl Launcher for SystemLauncher {
    fn run(&self, program: &Path, args: &[String], env: &[(&str, String)]) -> io::Result<CommandOutcome> {
        debug!(program = %program.display(), ?args, "launching");

        let mut command = Command::new(program);
        command
            .args(args)
            .envs(env.iter().map(|(k, v)| (*k, v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        Self::hide_window(&mut command);

        let outcome = CommandOutcome::from(command.output()?);
        debug!(program = %program.display(), status = ?outcome.status, "process finished");
        Ok(outcome)
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}
