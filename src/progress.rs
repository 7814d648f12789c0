//! Progress display for the fan-out phase
//!
//! Provides visual feedback while packages are audited or looked up using indicatif.
//! The handle is cheap to clone so every worker can tick the same bar.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter shared by the workers of one run
#[derive(Clone, Default)]
pub struct Progress {
    /// Current progress bar, None when display is disabled
    bar: Option<ProgressBar>,
}

impl Progress {
    /// Create a disabled progress reporter
    pub fn disabled() -> Self {
        Self { bar: None }
    }

    /// Start a progress bar for a known number of items
    pub fn start(total: u64, message: &str) -> Self {
        let bar = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.cyan} {msg} [{bar:30.cyan/blue}] {pos}/{len} ({eta})")
        {
            bar.set_style(style.progress_chars("█▓▒░"));
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar: Some(bar) }
    }

    /// Returns true if a bar is being drawn
    pub fn is_active(&self) -> bool {
        self.bar.as_ref().is_some_and(|bar| !bar.is_finished())
    }

    /// Increment progress by one
    pub fn inc(&self) {
        if let Some(ref bar) = self.bar {
            bar.inc(1);
        }
    }

    /// Print a line above the bar; returns false when no bar is active
    pub fn println(&self, line: &str) -> bool {
        match self.bar {
            Some(ref bar) if self.is_active() => {
                bar.println(line);
                true
            }
            _ => false,
        }
    }

    /// Finish and clear the current progress bar
    pub fn finish_and_clear(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
