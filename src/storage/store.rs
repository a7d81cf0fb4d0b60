use rocksdb::{Options, DB};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::codec::{self, StoreMeta, FORMAT_VERSION};
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::model::CountSize;

/// A published rollup store, opened read-only.
///
/// Every read takes `&self`, so one handle can be shared between any number
/// of threads.
pub struct Store {
    db: DB,
    path: PathBuf,
    meta: StoreMeta,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_dir() {
            return Err(Error::unavailable(path, "no store directory"));
        }

        let db_options = Options::default();
        let db = DB::open_for_read_only(&db_options, &path, false)
            .map_err(|e| Error::unavailable(&path, e.to_string()))?;

        let meta = match db.get_pinned(codec::META_KEY)? {
            Some(bytes) => codec::decode_meta(&bytes)
                .map_err(|e| Error::unavailable(&path, format!("unreadable metadata: {}", e)))?,
            None => return Err(Error::unavailable(&path, "build never completed")),
        };
        if meta.format_version != FORMAT_VERSION {
            return Err(Error::unavailable(
                &path,
                format!(
                    "format version {} is not supported (expected {})",
                    meta.format_version, FORMAT_VERSION
                ),
            ));
        }

        debug!(
            "Opened store {} (root {}, {} dirs, built {})",
            path.display(),
            meta.root,
            meta.dirs,
            meta.created_at
        );
        Ok(Self { db, path, meta })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn meta(&self) -> &StoreMeta {
        &self.meta
    }

    /// Total count and size of the files nested under `dir` whose
    /// combination passes `filter`.
    pub fn lookup(&self, dir: &str, filter: &Filter) -> Result<CountSize> {
        let bytes = self
            .db
            .get_pinned(codec::dir_key(dir))?
            .ok_or_else(|| Error::NotFound(dir.to_string()))?;

        let mut total = CountSize::default();
        for (gut, cs) in codec::decode_guts(&bytes)? {
            if filter.matches(&gut) {
                total.merge(&cs);
            }
        }
        Ok(total)
    }

    /// Sorted immediate child directories of `dir`; empty if it has none.
    pub fn children(&self, dir: &str) -> Result<Vec<String>> {
        match self.db.get_pinned(codec::children_key(dir))? {
            Some(bytes) => codec::decode_children(&bytes),
            None => Ok(Vec::new()),
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("meta", &self.meta)
            .finish()
    }
}
