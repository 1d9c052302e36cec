use devsplit_core::ProgressReporter;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// CLI progress reporter using indicatif spinners.
///
/// - Load phase: spinner while the CSV is read and the tree built
/// - Plan phase: spinner over the ownership scan
/// - Export phase: spinner with a running row count
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn start_spinner(&self, message: String) {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        pb.set_style(style);
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));

        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn set_message(&self, message: String) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.set_message(message);
            }
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_load_start(&self) {
        self.start_spinner("Reading points...".to_string());
    }

    fn on_load_complete(&self, points: usize, folders: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Loaded {} points in {} folders in {:.2}s",
            points, folders, duration_secs
        );
    }

    fn on_plan_start(&self, points: usize) {
        self.start_spinner(format!("Checking ownership of {} points...", points));
    }

    fn on_plan_complete(&self, reassignment_groups: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Plan ready: {} reassignment groups in {:.2}s",
            reassignment_groups, duration_secs
        );
    }

    fn on_export_start(&self) {
        self.start_spinner("Exporting rows...".to_string());
    }

    fn on_export_progress(&self, rows_written: usize) {
        self.set_message(format!("Exporting... {} rows written", rows_written));
    }

    fn on_export_complete(&self, rows: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Export complete: {} rows in {:.2}s",
            rows, duration_secs
        );
    }
}
