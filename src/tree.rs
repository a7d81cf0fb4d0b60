use std::path::Path;
use tracing::trace;

use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::ingest;
use crate::model::{DirCountSize, DirInfo};
use crate::storage::Store;

/// High-level queries over an opened store. Holds nothing but the store, so
/// a `Tree` can serve concurrent queries from any number of threads.
#[derive(Debug)]
pub struct Tree {
    store: Store,
}

impl Tree {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Store::open(path)?))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Nested count and size of the files under `dir` that pass `filter`,
    /// plus the same for each immediate child that holds any such files.
    ///
    /// Returns [`Error::NotFound`] if `dir` was never seen at build time.
    pub fn dir_info(&self, dir: &str, filter: &Filter) -> Result<DirInfo> {
        let dir = ingest::normalize_dir(dir)?;
        self.dir_info_normalized(&dir, filter)
    }

    fn dir_info_normalized(&self, dir: &str, filter: &Filter) -> Result<DirInfo> {
        let current = self.dir_count_size(dir, filter)?;

        let mut children = Vec::new();
        for child in self.store.children(dir)? {
            let dcs = known(self.dir_count_size(&child, filter), dir)?;
            if dcs.count > 0 {
                children.push(dcs);
            }
        }

        Ok(DirInfo { current, children })
    }

    fn dir_count_size(&self, dir: &str, filter: &Filter) -> Result<DirCountSize> {
        let cs = self.store.lookup(dir, filter)?;
        Ok(DirCountSize::new(dir, cs.count, cs.size))
    }

    /// Where the files passing `filter` live under `dir`.
    ///
    /// With a depth of 0 this is the single deepest directory that still has
    /// every passing file nested under it. Each extra level of depth also
    /// reports the depth-0 answer for every child of the previous level's
    /// answers. Results are sorted by size, largest first.
    ///
    /// For example, if a user's files are in /a/b/c/d (2 files), /a/b/c/d/1
    /// (1 file), /a/b/c/d/2 (2 files) and /a/b/e/f/g (2 files), then asking
    /// about "/" with depth 0 gives "/a/b" with 7 files; depth 1 adds
    /// "/a/b/c/d" with 5 and "/a/b/e/f/g" with 2.
    pub fn where_(&self, dir: &str, filter: &Filter, depth: usize) -> Result<Vec<DirCountSize>> {
        let dir = ingest::normalize_dir(dir)?;
        let start = self.collapse(self.dir_info_normalized(&dir, filter)?, filter)?;

        let mut results = vec![start.current];
        let mut frontier = start.children;

        for level in 0..depth {
            if frontier.is_empty() {
                break;
            }
            trace!("where {} level {}: {} dirs", dir, level + 1, frontier.len());

            let mut next = Vec::new();
            for dcs in frontier {
                let info = known(self.dir_info_normalized(&dcs.dir, filter), &dcs.dir)?;
                let info = self.collapse(info, filter)?;
                results.push(info.current);
                next.extend(info.children);
            }
            frontier = next;
        }

        results.sort_by(|a, b| b.size.cmp(&a.size));
        Ok(results)
    }

    /// Follow single-child chains that hold every matching file down to the
    /// first branch point or terminal directory.
    fn collapse(&self, mut info: DirInfo, filter: &Filter) -> Result<DirInfo> {
        while info.is_same_as_child() {
            let child = info.children.swap_remove(0);
            info = known(self.dir_info_normalized(&child.dir, filter), &child.dir)?;
        }
        Ok(info)
    }
}

/// Directories named by the store's own children index must exist in it.
fn known<T>(result: Result<T>, context: &str) -> Result<T> {
    result.map_err(|e| match e {
        Error::NotFound(dir) => {
            Error::Corrupt(format!("{} is indexed near {} but has no totals", dir, context))
        }
        other => other,
    })
}
