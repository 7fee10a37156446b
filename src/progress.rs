//! Per-file progress notifications. Purely cosmetic; the pool never depends on
//! what a reporter does.
use std::path::Path;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::pool::FileOutcome;

pub trait ProgressReporter: Sync {
    fn start(&self, _label: &str, _total: usize) {}

    /// Called once per file, whatever its outcome.
    fn file_done(&self, path: &Path, outcome: FileOutcome);

    fn finish(&self) {}
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn file_done(&self, _path: &Path, _outcome: FileOutcome) {}
}

const BAR_TEMPLATE: &str =
    "{msg} {pos}/{len} [{bar:40.cyan/blue}] {percent}% {elapsed_precise} ETA {eta}";

/// Terminal progress bar drawn on stderr.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        bar.set_style(style);
        Self { bar }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for BarProgress {
    fn start(&self, label: &str, total: usize) {
        self.bar.reset();
        self.bar.set_length(total as u64);
        self.bar.set_message(label.to_string());
    }

    fn file_done(&self, _path: &Path, _outcome: FileOutcome) {
        self.bar.inc(1);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
