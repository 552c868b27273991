use indicatif::{ProgressBar, ProgressStyle};

const BYTES_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}";
const SPINNER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {bytes} {msg}";

/// Console progress for a byte transfer
pub struct ProgressTracker {
    bar: ProgressBar,
}

impl ProgressTracker {
    /// Track a transfer of `total` bytes, or an open-ended one when the size is unknown
    pub fn for_bytes(total: Option<u64>, description: &str) -> Self {
        let (bar, template) = match total {
            Some(total) => (ProgressBar::new(total), BYTES_TEMPLATE),
            None => (ProgressBar::new_spinner(), SPINNER_TEMPLATE),
        };
        let style = ProgressStyle::with_template(template)
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_message(description.to_string());

        ProgressTracker { bar }
    }

    /// A tracker that draws nothing
    pub fn hidden() -> Self {
        ProgressTracker { bar: ProgressBar::hidden() }
    }

    pub fn increment(&self, amount: u64) {
        self.bar.inc(amount);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("Completed");
    }

    pub fn abandon(&self, msg: &str) {
        self.bar.abandon_with_message(msg.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_bytes_without_a_terminal() {
        let tracker = ProgressTracker::hidden();
        tracker.increment(512);
        tracker.increment(512);
        assert_eq!(tracker.position(), 1024);
        tracker.finish();
    }
}
