/// Trait for reporting progress of the longer engine operations.
///
/// CLI implements with indicatif spinners. All methods have default no-op
/// implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_load_start(&self) {}
    fn on_load_complete(&self, _points: usize, _folders: usize, _duration_secs: f64) {}
    fn on_plan_start(&self, _points: usize) {}
    fn on_plan_complete(&self, _reassignment_groups: usize, _duration_secs: f64) {}
    fn on_export_start(&self) {}
    fn on_export_progress(&self, _rows_written: usize) {}
    fn on_export_complete(&self, _rows: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
