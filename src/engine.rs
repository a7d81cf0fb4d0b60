use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::builder::{BuildSummary, DgutBuilder};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::ingest::stats_file::StatsReader;
use crate::progress::BuildReporter;

const PROGRESS_EVERY: u64 = 10_000;

pub struct BuildEngine {
    store_path: PathBuf,
    root: String,
}

#[derive(Debug)]
pub struct BuildResult {
    pub ingest_duration: Duration,
    pub summary: BuildSummary,
}

impl BuildEngine {
    pub fn new(config: AppConfig) -> Self {
        Self {
            store_path: PathBuf::from(config.store_path),
            root: config.scan_root,
        }
    }

    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    pub fn with_root(mut self, root: &str) -> Self {
        self.root = root.to_string();
        self
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Run the full build:
    /// 1. Fold every stats file into per-directory rollups, in parallel
    /// 2. Write the rollups to a new store and publish it
    pub fn build(&self, stats_files: &[PathBuf], reporter: &dyn BuildReporter) -> Result<BuildResult> {
        if stats_files.is_empty() {
            warn!("No stats files given; the store will be empty");
        }

        let sources = stats_files
            .iter()
            .map(|path| {
                StatsReader::open(path).map_err(|e| {
                    Error::BuildFailure(format!("cannot read {}: {}", path.display(), e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Aggregating {} stats files under {}...",
            sources.len(),
            self.root
        );
        reporter.on_ingest_start(sources.len());
        let ingest_start = Instant::now();

        let seen = AtomicU64::new(0);
        let counted: Vec<_> = sources
            .into_iter()
            .map(|source| {
                let seen = &seen;
                source.inspect(move |_| {
                    let n = seen.fetch_add(1, Ordering::Relaxed) + 1;
                    if n % PROGRESS_EVERY == 0 {
                        reporter.on_ingest_progress(n);
                    }
                })
            })
            .collect();
        let builder = DgutBuilder::build_parallel(&self.root, counted)?;

        let ingest_duration = ingest_start.elapsed();
        reporter.on_ingest_complete(
            builder.observations(),
            builder.dir_count(),
            ingest_duration.as_secs_f64(),
        );
        debug!(
            "Aggregation completed in {:.2}s: {} observations, {} dirs",
            ingest_duration.as_secs_f64(),
            builder.observations(),
            builder.dir_count(),
        );

        info!("Writing store to {}...", self.store_path.display());
        let summary = builder.write(&self.store_path, reporter)?;

        Ok(BuildResult {
            ingest_duration,
            summary,
        })
    }
}
