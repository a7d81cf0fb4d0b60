use glob::Pattern;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{Error, Result};
use crate::model::{FileObservation, FileType};

/// Single-host walker producing one observation per entry beneath a root
/// directory (the root itself is not reported). Symlinks are not followed.
pub struct Walker {
    root: PathBuf,
    ignore_patterns: Vec<Pattern>,
}

impl Walker {
    pub fn new(root: impl AsRef<Path>, ignore_globs: &[String]) -> Result<Self> {
        let root = fs::canonicalize(root.as_ref())?;

        let ignore_patterns = ignore_globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();

        debug!("Walking {}", root.display());
        Ok(Self {
            root,
            ignore_patterns,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_ignored(&self, path: &Path) -> bool {
        self.ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(path))
    }

    pub fn observations(&self) -> impl Iterator<Item = Result<FileObservation>> + '_ {
        WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_entry(move |entry| !self.is_ignored(entry.path()))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(observe(&entry)),
                Err(err) => {
                    let denied = err
                        .io_error()
                        .map(|e| e.kind() == io::ErrorKind::PermissionDenied)
                        .unwrap_or(false);
                    if denied {
                        warn!(
                            "Access denied reading {}: {}",
                            err.path().map(|p| p.display().to_string()).unwrap_or_default(),
                            err
                        );
                        None
                    } else {
                        Some(Err(Error::Io(err.into())))
                    }
                }
            })
    }
}

fn observe(entry: &DirEntry) -> Result<FileObservation> {
    let metadata = entry.metadata().map_err(io::Error::from)?;
    let (gid, uid) = owner(&metadata);

    Ok(FileObservation {
        path: entry.path().to_string_lossy().into_owned(),
        gid,
        uid,
        file_type: FileType::from_file_type(metadata.file_type()),
        size: metadata.len(),
    })
}

#[cfg(unix)]
fn owner(metadata: &fs::Metadata) -> (u32, u32) {
    use std::os::unix::fs::MetadataExt;
    (metadata.gid(), metadata.uid())
}

#[cfg(not(unix))]
fn owner(_metadata: &fs::Metadata) -> (u32, u32) {
    (0, 0)
}
