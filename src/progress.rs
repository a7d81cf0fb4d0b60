/// Trait for reporting build progress.
///
/// The CLI implements it with indicatif. All methods have default no-op
/// implementations.
pub trait BuildReporter: Send + Sync {
    fn on_ingest_start(&self, _sources: usize) {}
    fn on_ingest_progress(&self, _observations: u64) {}
    fn on_ingest_complete(&self, _observations: u64, _dirs: usize, _duration_secs: f64) {}
    fn on_write_start(&self, _dirs: usize) {}
    fn on_write_progress(&self, _written: usize, _total: usize) {}
    fn on_write_complete(&self, _dirs: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl BuildReporter for SilentReporter {}
