use rocksdb::{Options, WriteBatch, DB};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use super::codec::{self, StoreMeta};
use crate::error::{Error, Result};
use crate::model::{CountSize, Gut};

const BATCH_SIZE: usize = 10_000;

/// Write-once builder for a store directory.
///
/// Everything is written into a uniquely named staging directory next to the
/// target. Only [`StoreWriter::finish`] moves it into place; dropping the
/// writer without finishing deletes the staging directory, so readers never
/// see a partial store. Writers racing for the same target never share a
/// staging directory.
pub struct StoreWriter {
    db: Option<DB>,
    staging: Option<TempDir>,
    target: PathBuf,
    batch: WriteBatch,
}

impl StoreWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let target = path.as_ref().to_path_buf();
        if target.exists() {
            return Err(Error::StoreExists(target));
        }

        let staging = create_staging(&target)?;

        let mut db_options = Options::default();
        db_options.create_if_missing(true);
        db_options.set_error_if_exists(true);
        let db = DB::open(&db_options, staging.path())?;
        debug!("Staging store at {}", staging.path().display());

        Ok(Self {
            db: Some(db),
            staging: Some(staging),
            target,
            batch: WriteBatch::default(),
        })
    }

    pub fn put_dir(&mut self, dir: &str, guts: &[(Gut, CountSize)]) -> Result<()> {
        self.batch.put(codec::dir_key(dir), codec::encode_guts(guts)?);
        self.maybe_flush()
    }

    pub fn put_children(&mut self, dir: &str, children: &[String]) -> Result<()> {
        if children.is_empty() {
            return Ok(());
        }
        self.batch
            .put(codec::children_key(dir), codec::encode_children(children)?);
        self.maybe_flush()
    }

    fn maybe_flush(&mut self) -> Result<()> {
        if self.batch.len() >= BATCH_SIZE {
            self.flush_batch()?;
        }
        Ok(())
    }

    fn flush_batch(&mut self) -> Result<()> {
        let batch = std::mem::take(&mut self.batch);
        if let Some(db) = &self.db {
            db.write(batch)?;
        }
        Ok(())
    }

    /// Seal the store with its metadata and publish it at the target path.
    pub fn finish(mut self, meta: &StoreMeta) -> Result<PathBuf> {
        self.flush_batch()?;

        let Some(db) = self.db.take() else {
            return Err(Error::BuildFailure("store writer already closed".to_string()));
        };
        let sealed = seal(&db, meta);
        drop(db);

        let Some(staging) = self.staging.take() else {
            return Err(Error::BuildFailure("store writer already closed".to_string()));
        };
        if let Err(e) = sealed {
            discard(staging);
            return Err(e);
        }

        // Renaming onto a published store fails because it is not empty, so
        // the first writer to get here wins.
        match fs::rename(staging.path(), &self.target) {
            Ok(()) => {
                debug!("Published store at {}", self.target.display());
                // The staging path is gone; dropping the handle is a no-op.
                drop(staging);
                Ok(self.target.clone())
            }
            Err(e) => {
                let err = if self.target.exists() {
                    Error::StoreExists(self.target.clone())
                } else {
                    Error::Io(e)
                };
                discard(staging);
                Err(err)
            }
        }
    }
}

impl Drop for StoreWriter {
    fn drop(&mut self) {
        // Close the database before its directory goes away.
        drop(self.db.take());
        if let Some(staging) = self.staging.take() {
            discard(staging);
        }
    }
}

impl fmt::Debug for StoreWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreWriter")
            .field("staging", &self.staging.as_ref().map(TempDir::path))
            .field("target", &self.target)
            .finish()
    }
}

fn seal(db: &DB, meta: &StoreMeta) -> Result<()> {
    db.put(codec::META_KEY, codec::encode_meta(meta)?)?;
    db.flush()?;
    Ok(())
}

fn discard(staging: TempDir) {
    debug!("Discarding staging directory {}", staging.path().display());
    let path = staging.path().to_path_buf();
    if let Err(e) = staging.close() {
        warn!(
            "Failed to remove staging directory {}: {}",
            path.display(),
            e
        );
    }
}

/// Fresh `<name>.building-XXXXXX` directory beside `target`.
fn create_staging(target: &Path) -> Result<TempDir> {
    let name = target.file_name().ok_or_else(|| Error::InvalidPath {
        path: target.display().to_string(),
        reason: "store path has no final component",
    })?;
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let staging = tempfile::Builder::new()
        .prefix(&format!("{}.building-", name.to_string_lossy()))
        .tempdir_in(parent)?;
    Ok(staging)
}
