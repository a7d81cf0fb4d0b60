use ahash::AHashMap;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::ingest;
use crate::model::{CountSize, FileObservation, Gut};
use crate::progress::BuildReporter;
use crate::storage::{StoreMeta, StoreWriter};

const PROGRESS_INTERVAL: usize = 1_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub dirs: usize,
    pub combinations: usize,
    pub observations: u64,
    pub duration: Duration,
}

/// Accumulates cumulative (group, user, type) totals for every directory at
/// or below a scan root.
///
/// A file counts towards its containing directory and every ancestor of it
/// up to the root. Partial builders over disjoint inputs can be combined with
/// [`DgutBuilder::merge`] in any order.
#[derive(Debug, Clone)]
pub struct DgutBuilder {
    root: String,
    dirs: AHashMap<String, AHashMap<Gut, CountSize>>,
    children: AHashMap<String, BTreeSet<String>>,
    observations: u64,
}

impl DgutBuilder {
    pub fn new(root: &str) -> Result<Self> {
        Ok(Self::with_root(ingest::normalize_dir(root)?))
    }

    fn with_root(root: String) -> Self {
        Self {
            root,
            dirs: AHashMap::new(),
            children: AHashMap::new(),
            observations: 0,
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn dir_count(&self) -> usize {
        self.dirs.len()
    }

    pub fn observations(&self) -> u64 {
        self.observations
    }

    pub fn add(&mut self, obs: &FileObservation) -> Result<()> {
        let dir = ingest::containing_dir(&obs.path)?;
        let chain = ingest::ancestors(&dir, &self.root)?;
        let gut = obs.gut();

        // Once we reach a directory we'd already seen, every link above it
        // is already recorded.
        let mut linking = true;
        let mut previous: Option<&str> = None;

        for ancestor in chain {
            let is_new = !self.dirs.contains_key(ancestor);
            if is_new {
                self.dirs.insert(ancestor.to_string(), AHashMap::new());
            }
            if let Some(guts) = self.dirs.get_mut(ancestor) {
                guts.entry(gut).or_default().add(obs.size);
            }

            if linking {
                if let Some(child) = previous {
                    self.link(ancestor, child);
                }
                linking = is_new;
            }
            previous = Some(ancestor);
        }

        self.observations += 1;
        Ok(())
    }

    fn link(&mut self, parent: &str, child: &str) {
        match self.children.get_mut(parent) {
            Some(set) => {
                if !set.contains(child) {
                    set.insert(child.to_string());
                }
            }
            None => {
                self.children
                    .insert(parent.to_string(), BTreeSet::from([child.to_string()]));
            }
        }
    }

    /// Fold another partial build into this one.
    pub fn merge(mut self, other: DgutBuilder) -> Result<Self> {
        if self.root != other.root {
            return Err(Error::BuildFailure(format!(
                "cannot merge builds rooted at {} and {}",
                self.root, other.root
            )));
        }

        for (dir, guts) in other.dirs {
            let ours = self.dirs.entry(dir).or_default();
            for (gut, cs) in guts {
                ours.entry(gut).or_default().merge(&cs);
            }
        }
        for (dir, kids) in other.children {
            self.children.entry(dir).or_default().extend(kids);
        }
        self.observations += other.observations;

        Ok(self)
    }

    /// Consume a complete observation stream. The first failure, whether
    /// from the stream itself or from an observation outside the root,
    /// aborts the build.
    pub fn build_from_iter<I, E>(root: &str, observations: I) -> Result<Self>
    where
        I: IntoIterator<Item = std::result::Result<FileObservation, E>>,
        E: Display,
    {
        let mut builder = Self::new(root)?;
        for item in observations {
            let obs = item.map_err(|e| {
                Error::BuildFailure(format!(
                    "input stream failed after {} observations: {}",
                    builder.observations, e
                ))
            })?;
            builder
                .add(&obs)
                .map_err(|e| Error::BuildFailure(format!("rejected observation: {}", e)))?;
        }
        Ok(builder)
    }

    /// Fold each source on the rayon pool and merge the partial results.
    /// Any failing source aborts the whole build.
    pub fn build_parallel<S, E>(root: &str, sources: Vec<S>) -> Result<Self>
    where
        S: IntoIterator<Item = std::result::Result<FileObservation, E>> + Send,
        E: Display,
    {
        let root = ingest::normalize_dir(root)?;
        debug!("Aggregating {} sources under {}", sources.len(), root);

        sources
            .into_par_iter()
            .map(|source| Self::build_from_iter(&root, source))
            .try_reduce(|| Self::with_root(root.clone()), |a, b| a.merge(b))
    }

    /// Persist the aggregation as a new store at `path`.
    pub fn write(self, path: &Path, reporter: &dyn BuildReporter) -> Result<BuildSummary> {
        let start = Instant::now();
        let total = self.dirs.len();
        info!("Writing {} directories to {}", total, path.display());
        reporter.on_write_start(total);

        let mut writer = StoreWriter::create(path)?;

        let mut dirs: Vec<(String, AHashMap<Gut, CountSize>)> = self.dirs.into_iter().collect();
        dirs.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let mut combinations = 0;
        for (i, (dir, guts)) in dirs.into_iter().enumerate() {
            let mut guts: Vec<(Gut, CountSize)> = guts.into_iter().collect();
            guts.sort_unstable_by_key(|(gut, _)| *gut);
            combinations += guts.len();
            writer.put_dir(&dir, &guts)?;

            if let Some(kids) = self.children.get(&dir) {
                let kids: Vec<String> = kids.iter().cloned().collect();
                writer.put_children(&dir, &kids)?;
            }

            if (i + 1) % PROGRESS_INTERVAL == 0 {
                reporter.on_write_progress(i + 1, total);
            }
        }

        let meta = StoreMeta::new(&self.root, self.observations, total as u64);
        writer.finish(&meta)?;

        let duration = start.elapsed();
        reporter.on_write_complete(total, duration.as_secs_f64());
        debug!(
            "Store write completed in {:.2}s: {} dirs, {} combinations",
            duration.as_secs_f64(),
            total,
            combinations
        );

        Ok(BuildSummary {
            dirs: total,
            combinations,
            observations: self.observations,
            duration,
        })
    }

    #[cfg(test)]
    fn totals(&self, dir: &str) -> CountSize {
        let mut total = CountSize::default();
        if let Some(guts) = self.dirs.get(dir) {
            for cs in guts.values() {
                total.merge(cs);
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileType;

    fn obs(path: &str, size: u64) -> FileObservation {
        FileObservation::new(path, 1, 101, FileType::Regular, size)
    }

    fn children_of(builder: &DgutBuilder, dir: &str) -> Vec<String> {
        builder
            .children
            .get(dir)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_add_updates_every_ancestor() {
        let mut builder = DgutBuilder::new("/").unwrap();
        builder.add(&obs("/a/b/c/f1", 10)).unwrap();
        builder.add(&obs("/a/b/f2", 5)).unwrap();

        assert_eq!(builder.totals("/a/b/c"), CountSize { count: 1, size: 10 });
        assert_eq!(builder.totals("/a/b"), CountSize { count: 2, size: 15 });
        assert_eq!(builder.totals("/a"), CountSize { count: 2, size: 15 });
        assert_eq!(builder.totals("/"), CountSize { count: 2, size: 15 });
        assert_eq!(builder.dir_count(), 4);
        assert_eq!(builder.observations(), 2);
    }

    #[test]
    fn test_children_index_links_discovered_dirs() {
        let mut builder = DgutBuilder::new("/").unwrap();
        builder.add(&obs("/a/x/deep/f1", 1)).unwrap();
        builder.add(&obs("/a/b/f2", 1)).unwrap();
        builder.add(&obs("/a/x/other/f3", 1)).unwrap();

        assert_eq!(children_of(&builder, "/"), vec!["/a"]);
        assert_eq!(children_of(&builder, "/a"), vec!["/a/b", "/a/x"]);
        assert_eq!(children_of(&builder, "/a/x"), vec!["/a/x/deep", "/a/x/other"]);
        assert!(children_of(&builder, "/a/b").is_empty());
    }

    #[test]
    fn test_scan_root_bounds_the_rollup() {
        let mut builder = DgutBuilder::new("/a/b/").unwrap();
        builder.add(&obs("/a/b/c/f1", 3)).unwrap();

        assert_eq!(builder.root(), "/a/b");
        assert_eq!(builder.totals("/a/b"), CountSize { count: 1, size: 3 });
        assert_eq!(builder.totals("/a"), CountSize::default());
        assert!(builder.add(&obs("/elsewhere/f", 1)).is_err());
    }

    #[test]
    fn test_combinations_are_kept_apart() {
        let mut builder = DgutBuilder::new("/").unwrap();
        builder.add(&obs("/a/f1", 10)).unwrap();
        builder
            .add(&FileObservation::new("/a/f2", 2, 101, FileType::Regular, 4))
            .unwrap();
        builder
            .add(&FileObservation::new("/a/l", 1, 101, FileType::Symlink, 1))
            .unwrap();

        assert_eq!(builder.dirs.get("/a").map(|guts| guts.len()), Some(3));
        assert_eq!(builder.totals("/a"), CountSize { count: 3, size: 15 });
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let all = [
            obs("/a/b/f1", 1),
            obs("/a/c/f2", 2),
            obs("/a/b/d/f3", 3),
            obs("/e/f4", 4),
        ];

        let mut single = DgutBuilder::new("/").unwrap();
        for o in &all {
            single.add(o).unwrap();
        }

        let mut left = DgutBuilder::new("/").unwrap();
        let mut right = DgutBuilder::new("/").unwrap();
        for (i, o) in all.iter().enumerate() {
            if i % 2 == 0 {
                left.add(o).unwrap();
            } else {
                right.add(o).unwrap();
            }
        }
        let merged = right.merge(left).unwrap();

        assert_eq!(merged.observations(), single.observations());
        assert_eq!(merged.dirs, single.dirs);
        assert_eq!(merged.children, single.children);
    }

    #[test]
    fn test_merge_refuses_different_roots() {
        let a = DgutBuilder::new("/a").unwrap();
        let b = DgutBuilder::new("/b").unwrap();
        assert!(matches!(a.merge(b), Err(Error::BuildFailure(_))));
    }

    #[test]
    fn test_stream_failure_aborts_build() {
        let stream: Vec<std::result::Result<FileObservation, String>> = vec![
            Ok(obs("/a/f1", 1)),
            Err("disk went away".to_string()),
            Ok(obs("/a/f2", 1)),
        ];
        match DgutBuilder::build_from_iter("/", stream) {
            Err(Error::BuildFailure(msg)) => {
                assert!(msg.contains("after 1 observations"));
                assert!(msg.contains("disk went away"));
            }
            other => panic!("expected build failure, got {:?}", other),
        }
    }

    #[test]
    fn test_build_parallel_merges_sources() {
        let sources: Vec<Vec<std::result::Result<FileObservation, String>>> = vec![
            vec![Ok(obs("/a/b/f1", 10)), Ok(obs("/a/c/f2", 20))],
            vec![Ok(obs("/a/b/f3", 30))],
            vec![],
        ];
        let builder = DgutBuilder::build_parallel("/", sources).unwrap();

        assert_eq!(builder.observations(), 3);
        assert_eq!(builder.totals("/a"), CountSize { count: 3, size: 60 });
        assert_eq!(builder.totals("/a/b"), CountSize { count: 2, size: 40 });
        assert_eq!(children_of(&builder, "/a"), vec!["/a/b", "/a/c"]);
    }

    #[test]
    fn test_build_parallel_fails_if_any_source_fails() {
        let sources: Vec<Vec<std::result::Result<FileObservation, String>>> = vec![
            vec![Ok(obs("/a/f1", 1))],
            vec![Err("truncated".to_string())],
        ];
        assert!(matches!(
            DgutBuilder::build_parallel("/", sources),
            Err(Error::BuildFailure(_))
        ));
    }
}
