//! Terminal messages with quiet and verbose modes.
//!
//! ```
//! use batchprint::output::OutputFormatter;
//!
//! let formatter = OutputFormatter::new(false, false);
//! formatter.info("Counting 3 files");
//! formatter.success("Done");
//! ```

use std::io::{self, IsTerminal};

/// Kind of message, which picks its prefix and color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    /// Plain information.
    Info,
    /// Something finished well.
    Success,
    /// Something the user should look at.
    Warning,
    /// Something failed.
    Error,
    /// Verbose detail.
    Debug,
}

impl MessageLevel {
    fn prefix(&self) -> &'static str {
        match self {
            Self::Info => "",
            Self::Success => "✓ ",
            Self::Warning => "⚠ ",
            Self::Error => "✗ ",
            Self::Debug => "→ ",
        }
    }

    fn color(&self) -> Option<&'static str> {
        match self {
            Self::Info => None,
            Self::Success => Some("\x1b[32m"),
            Self::Warning => Some("\x1b[33m"),
            Self::Error => Some("\x1b[31m"),
            Self::Debug => Some("\x1b[36m"),
        }
    }
}

/// Writes user-facing messages to stdout.
///
/// Quiet mode keeps warnings and errors only; verbose mode adds debug lines
/// and per-document details.
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    quiet: bool,
    verbose: bool,
    colored: bool,
}

impl OutputFormatter {
    /// Create a formatter; color is used when stdout is a terminal.
    pub fn new(quiet: bool, verbose: bool) -> Self {
        Self {
            quiet,
            verbose,
            colored: io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
        }
    }

    /// Formatter printing only warnings and errors.
    pub fn quiet() -> Self {
        Self::new(true, false)
    }

    /// Formatter printing everything.
    pub fn verbose() -> Self {
        Self::new(false, true)
    }

    /// Render a message as it would be printed, without color.
    pub fn render(level: MessageLevel, message: &str) -> String {
        format!("{}{message}", level.prefix())
    }

    fn emit(&self, level: MessageLevel, message: &str) {
        let line = Self::render(level, message);
        match level.color() {
            Some(color) if self.colored => println!("{color}{line}\x1b[0m"),
            _ => println!("{line}"),
        }
    }

    /// Informational message; suppressed when quiet.
    pub fn info(&self, message: &str) {
        if !self.quiet {
            self.emit(MessageLevel::Info, message);
        }
    }

    /// Success message; suppressed when quiet.
    pub fn success(&self, message: &str) {
        if !self.quiet {
            self.emit(MessageLevel::Success, message);
        }
    }

    /// Warning; always shown.
    pub fn warning(&self, message: &str) {
        self.emit(MessageLevel::Warning, message);
    }

    /// Error; always shown.
    pub fn error(&self, message: &str) {
        self.emit(MessageLevel::Error, message);
    }

    /// Verbose-only message.
    pub fn debug(&self, message: &str) {
        if self.verbose {
            self.emit(MessageLevel::Debug, message);
        }
    }

    /// Section header; suppressed when quiet.
    pub fn section(&self, title: &str) {
        if !self.quiet {
            println!("\n{title}");
        }
    }

    /// Indented `label: value` line; verbose only.
    pub fn detail(&self, label: &str, value: &str) {
        if self.verbose {
            println!("  {label}: {value}");
        }
    }

    /// Numbered list entry; suppressed when quiet.
    pub fn list_item(&self, index: usize, message: &str) {
        if !self.quiet {
            println!("  {index}. {message}");
        }
    }

    /// Pre-rendered line printed as-is; suppressed when quiet.
    pub fn line(&self, text: &str) {
        if !self.quiet {
            println!("{text}");
        }
    }

    /// Whether only warnings and errors are shown.
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Whether debug lines are shown.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new(false, false)
    }
}
