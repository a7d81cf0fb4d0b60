use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Build failed: {0}")]
    BuildFailure(String),

    #[error("No completed store at {}: {reason}", path.display())]
    StoreUnavailable { path: PathBuf, reason: String },

    #[error("A store already exists at {}", .0.display())]
    StoreExists(PathBuf),

    #[error("Directory does not exist: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rocksdb::Error),

    #[error("Encoding error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parse error on line {line}: {details}")]
    Parse { line: u64, details: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Store is inconsistent: {0}")]
    Corrupt(String),
}

impl Error {
    /// True when a query named a directory the store never saw.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub(crate) fn unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::StoreUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_distinguishable() {
        assert!(Error::NotFound("/a".to_string()).is_not_found());
        let io = Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(!io.is_not_found());
    }

    #[test]
    fn test_messages_name_the_path() {
        let err = Error::NotFound("/nonexistent".to_string());
        assert_eq!(err.to_string(), "Directory does not exist: /nonexistent");

        let err = Error::unavailable("/tmp/store", "never built");
        assert_eq!(
            err.to_string(),
            "No completed store at /tmp/store: never built"
        );
    }
}
