//! Terminal progress bar behind the core `ProgressSink` seam.

use indicatif::{ProgressBar, ProgressStyle};

use cepage_core::ProgressSink;

/// An indicatif bar driven by dispatcher progress ticks.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(label: &str) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}",
            )
            .unwrap()
            .progress_chars("█▓░"),
        );
        bar.set_message(label.to_string());
        Self { bar }
    }
}

impl ProgressSink for BarProgress {
    fn batch_started(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
    }

    fn item_done(&self, completed: u64) {
        self.bar.set_position(completed);
    }

    fn batch_finished(&self) {
        self.bar.finish_and_clear();
    }
}
