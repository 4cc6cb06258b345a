use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while a single check is in flight.
pub struct Spinner {
    progress: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

        let progress = ProgressBar::new_spinner();
        progress.set_style(style);
        progress.set_message(message.to_string());
        progress.enable_steady_tick(Duration::from_millis(80));

        Self { progress }
    }

    pub fn finish(&self) {
        self.progress.finish_and_clear();
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.progress.finish_and_clear();
    }
}
