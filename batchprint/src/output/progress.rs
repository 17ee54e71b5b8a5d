//! Terminal progress bar fed by batch progress callbacks.
//!
//! Orchestrators call their [`ProgressCallback`] from worker tasks, so the
//! bar keeps its state behind a mutex and renders on every call. On a
//! terminal it redraws one line on stderr; otherwise it prints one line per
//! update so that logs stay readable.

use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::notify::{ProgressCallback, progress_callback};

const BAR_WIDTH: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Redraw,
    Lines,
    Hidden,
}

#[derive(Debug)]
struct State {
    current: usize,
    total: usize,
    message: String,
    finished: bool,
}

/// Progress display for a batch.
#[derive(Debug)]
pub struct ProgressBar {
    label: String,
    mode: Mode,
    start: Instant,
    state: Mutex<State>,
}

impl ProgressBar {
    /// Create a bar; it redraws in place when stderr is a terminal.
    pub fn new(label: impl Into<String>) -> Self {
        let mode = if io::stderr().is_terminal() {
            Mode::Redraw
        } else {
            Mode::Lines
        };
        Self::with_mode(label.into(), mode)
    }

    /// A bar that never prints.
    pub fn hidden() -> Self {
        Self::with_mode(String::new(), Mode::Hidden)
    }

    fn with_mode(label: String, mode: Mode) -> Self {
        Self {
            label,
            mode,
            start: Instant::now(),
            state: Mutex::new(State {
                current: 0,
                total: 0,
                message: String::new(),
                finished: false,
            }),
        }
    }

    /// Callback that drives this bar.
    pub fn callback(self: &Arc<Self>) -> ProgressCallback {
        let bar = Arc::clone(self);
        progress_callback(move |current, total, message| bar.update(current, total, message))
    }

    /// Record progress and redraw.
    pub fn update(&self, current: usize, total: usize, message: &str) {
        let line = {
            let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if state.finished {
                return;
            }
            state.current = current.min(total);
            state.total = total;
            state.message = message.to_string();
            self.render(&state)
        };

        let mut stderr = io::stderr().lock();
        match self.mode {
            Mode::Redraw => {
                let _ = write!(stderr, "\r\x1b[K{line}");
            }
            Mode::Lines => {
                let _ = writeln!(stderr, "{line}");
            }
            Mode::Hidden => {}
        }
        let _ = stderr.flush();
    }

    /// End the bar, moving to a fresh line.
    pub fn finish(&self) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if state.finished {
            return;
        }
        state.finished = true;
        if self.mode == Mode::Redraw {
            let _ = writeln!(io::stderr());
        }
    }

    /// Completed fraction in percent.
    pub fn percent(&self) -> f64 {
        let state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if state.total == 0 {
            0.0
        } else {
            state.current as f64 / state.total as f64 * 100.0
        }
    }

    fn render(&self, state: &State) -> String {
        let filled = BAR_WIDTH * state.current / state.total.max(1);
        let bar = format!("[{}{}]", "=".repeat(filled), " ".repeat(BAR_WIDTH - filled));
        let mut line = format!(
            "{bar} {}/{} {}",
            state.current,
            state.total,
            format_duration(self.start.elapsed())
        );
        if !self.label.is_empty() {
            line.insert_str(0, &format!("{} ", self.label));
        }
        if !state.message.is_empty() {
            line.push_str(&format!(" {}", state.message));
        }
        line
    }
}

/// Short human-readable duration: `42s`, `3m 5s`, `1h 2m`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(30, "30s")]
    #[case(90, "1m 30s")]
    #[case(3661, "1h 1m")]
    fn test_format_duration(#[case] secs: u64, #[case] expected: &str) {
        assert_eq!(format_duration(Duration::from_secs(secs)), expected);
    }

    #[test]
    fn test_render_line() {
        let bar = ProgressBar::with_mode("Counting".to_string(), Mode::Hidden);
        let state = State {
            current: 1,
            total: 2,
            message: "a.pdf".to_string(),
            finished: false,
        };
        let line = bar.render(&state);
        assert!(line.starts_with("Counting ["));
        assert!(line.contains(&format!("{}{}", "=".repeat(15), " ".repeat(15))));
        assert!(line.contains("1/2"));
        assert!(line.ends_with("a.pdf"));
    }

    #[test]
    fn test_callback_updates_state() {
        let bar = Arc::new(ProgressBar::hidden());
        let callback = bar.callback();
        callback(3, 4, "c.docx");
        assert_eq!(bar.percent(), 75.0);

        bar.finish();
        callback(4, 4, "ignored");
        assert_eq!(bar.percent(), 75.0);
    }

    #[test]
    fn test_zero_total() {
        let bar = ProgressBar::hidden();
        bar.update(0, 0, "");
        assert_eq!(bar.percent(), 0.0);
    }
}
