//! Human-readable output sink
//!
//! Every classification decision and soft error is echoed as one line.
//! Workers running concurrently share one reporter, so implementations
//! must be `Send + Sync` and write whole lines atomically.

use crate::progress::Progress;
use colored::Colorize;
use std::io::{self, IsTerminal, Write};
use std::sync::Mutex;

/// Severity of a reported line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Decisions and results
    Info,
    /// Soft errors that skip a single package
    Warn,
    /// Failures of the external tool or registry
    Error,
}

/// Sink for operator-facing lines
pub trait Reporter: Send + Sync {
    /// Write one line
    fn line(&self, level: Level, message: &str);

    /// Begin a progress display over `total` items
    fn progress(&self, _total: usize, _message: &str) -> Progress {
        Progress::disabled()
    }

    /// Report a decision or result
    fn info(&self, message: &str) {
        self.line(Level::Info, message);
    }

    /// Report a soft error that skips one package
    fn warn(&self, message: &str) {
        self.line(Level::Warn, message);
    }

    /// Report a failure of the external tool or registry
    fn error(&self, message: &str) {
        self.line(Level::Error, message);
    }
}

/// Reporter writing to stdout, routing lines around an active progress bar
pub struct ConsoleReporter {
    /// Whether to draw progress bars
    show_progress: bool,
    /// Whether to use colors
    color: bool,
    /// Bar currently drawn, if any
    active: Mutex<Progress>,
}

impl ConsoleReporter {
    /// Create a console reporter; progress is only drawn on a terminal
    pub fn new(quiet: bool) -> Self {
        let is_tty = io::stdout().is_terminal();
        Self {
            show_progress: !quiet && is_tty,
            color: is_tty,
            active: Mutex::new(Progress::disabled()),
        }
    }

    fn decorate(&self, level: Level, message: &str) -> String {
        if !self.color {
            return message.to_string();
        }
        match level {
            Level::Info => message.to_string(),
            Level::Warn => message.yellow().to_string(),
            Level::Error => message.red().to_string(),
        }
    }
}

impl Reporter for ConsoleReporter {
    fn line(&self, level: Level, message: &str) {
        let text = self.decorate(level, message);
        let routed = match self.active.lock() {
            Ok(progress) => progress.println(&text),
            Err(_) => false,
        };
        if !routed {
            let mut stdout = io::stdout().lock();
            let _ = writeln!(stdout, "{}", text);
        }
    }

    fn progress(&self, total: usize, message: &str) -> Progress {
        if !self.show_progress || total == 0 {
            return Progress::disabled();
        }
        let progress = Progress::start(total as u64, message);
        if let Ok(mut active) = self.active.lock() {
            *active = progress.clone();
        }
        progress
    }
}

/// Reporter that keeps every line in memory
#[derive(Default)]
pub struct MemoryReporter {
    lines: Mutex<Vec<(Level, String)>>,
}

impl MemoryReporter {
    /// Create an empty reporter
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages in the order they were reported
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.iter().map(|(_, line)| line.clone()).collect())
            .unwrap_or_default()
    }

    /// Messages reported at the given level
    pub fn lines_at(&self, level: Level) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| {
                lines
                    .iter()
                    .filter(|(l, _)| *l == level)
                    .map(|(_, line)| line.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns true if any line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl Reporter for MemoryReporter {
    fn line(&self, level: Level, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, message.to_string()));
        }
    }
}
