use dirstat::BuildReporter;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif progress bars.
///
/// - Ingest phase: spinner (observation count unknown upfront)
/// - Write phase: progress bar (directory count known from ingest)
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars(TICK_CHARS),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

impl BuildReporter for CliReporter {
    fn on_ingest_start(&self, sources: usize) {
        self.set_bar(spinner(&format!("Reading {} stats files...", sources)));
    }

    fn on_ingest_progress(&self, observations: u64) {
        self.with_bar(|pb| pb.set_message(format!("Aggregating... {} observations", observations)));
    }

    fn on_ingest_complete(&self, observations: u64, dirs: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Aggregation complete: {} observations in {} directories in {:.2}s",
            observations, dirs, duration_secs
        );
    }

    fn on_write_start(&self, dirs: usize) {
        let pb = ProgressBar::new(dirs as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} Writing [{bar:30.cyan/dim}] {pos}/{len} directories ({eta} remaining)",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─")
            .tick_chars(TICK_CHARS),
        );
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_write_progress(&self, written: usize, total: usize) {
        self.with_bar(|pb| {
            if pb.length() != Some(total as u64) {
                pb.set_length(total as u64);
            }
            pb.set_position(written as u64);
        });
    }

    fn on_write_complete(&self, dirs: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Store write complete: {} directories in {:.2}s",
            dirs, duration_secs
        );
    }
}
