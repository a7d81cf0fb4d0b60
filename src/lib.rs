//! Hierarchical disk usage accounting.
//!
//! Per-file observations (path, group, user, type, size) are rolled up once
//! into a persistent store keyed by directory, holding cumulative totals for
//! every (group, user, type) combination at or beneath each directory. A
//! [`Tree`] then answers filtered usage queries without re-walking subtrees.

pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod model;
pub mod progress;
pub mod storage;
pub mod tree;

pub use builder::{BuildSummary, DgutBuilder};
pub use config::AppConfig;
pub use engine::{BuildEngine, BuildResult};
pub use error::{Error, Result};
pub use filter::Filter;
pub use model::{CountSize, DirCountSize, DirInfo, FileObservation, FileType, Gut};
pub use progress::{BuildReporter, SilentReporter};
pub use storage::Store;
pub use tree::Tree;
