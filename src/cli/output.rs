/// User-facing output: the ordered progress reporter and error rendering.
use std::io::Write;

use crate::registry::UsageError;
use crate::types::ErrorOutput;

/// Append-only progress channel driven by commands.
///
/// Every call writes one line and flushes it before returning, so the user
/// sees each step before the next remote call starts.
pub trait Ui {
    /// Print a plain line.
    fn say(&self, message: &str);
    /// Report that the previous step succeeded.
    fn ok(&self);
    /// Print a non-fatal warning.
    fn warn(&self, message: &str);
}

/// Render a warning line. Warnings share stdout with progress lines so they
/// stay in order.
fn warning_line(message: &str) -> String {
    format!("WARNING: {message}")
}

/// `Ui` writing to stdout.
#[derive(Debug, Default)]
pub struct TerminalUi;

impl TerminalUi {
    fn line(text: &str) {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        let _ = writeln!(out, "{text}");
        let _ = out.flush();
    }
}

impl Ui for TerminalUi {
    fn say(&self, message: &str) {
        Self::line(message);
    }

    fn ok(&self) {
        Self::line("OK");
    }

    fn warn(&self, message: &str) {
        Self::line(&warning_line(message));
    }
}

/// Write a command failure to stderr.
pub fn write_error(err: &ErrorOutput, json: bool) {
    let stderr = std::io::stderr();
    let mut out = stderr.lock();
    if json {
        let s = serde_json::to_string_pretty(err).unwrap_or_default();
        let _ = writeln!(out, "{s}");
    } else {
        let _ = writeln!(out, "FAILED");
        let _ = writeln!(out, "{}", err.error.message);
    }
}

/// Write an argument-contract violation and the command's usage to stderr.
pub fn write_usage_error(err: &UsageError) {
    let stderr = std::io::stderr();
    let mut out = stderr.lock();
    let _ = writeln!(out, "FAILED");
    let _ = writeln!(out, "{err}\n");
    let _ = writeln!(out, "{}", err.usage);
}

/// `Ui` that records lines in memory, for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingUi {
    lines: std::cell::RefCell<Vec<String>>,
}

#[cfg(test)]
impl RecordingUi {
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

#[cfg(test)]
impl Ui for RecordingUi {
    fn say(&self, message: &str) {
        self.lines.borrow_mut().push(message.to_owned());
    }

    fn ok(&self) {
        self.lines.borrow_mut().push("OK".to_owned());
    }

    fn warn(&self, message: &str) {
        self.lines.borrow_mut().push(warning_line(message));
    }
}
