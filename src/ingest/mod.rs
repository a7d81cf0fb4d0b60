//! Turning raw observations into the directory keys usage is rolled up under.

pub mod stats_file;
pub mod walk;

use crate::error::{Error, Result};

pub const ROOT_DIR: &str = "/";

/// Canonical form of an absolute directory path: single separators, no
/// trailing slash (except for `/` itself) and no `.` or `..` components.
pub fn normalize_dir(path: &str) -> Result<String> {
    if !path.starts_with('/') {
        return Err(invalid(path, "path must be absolute"));
    }

    let mut normalized = String::with_capacity(path.len());
    for component in path.split('/').filter(|c| !c.is_empty()) {
        if component == "." || component == ".." {
            return Err(invalid(path, "relative components are not allowed"));
        }
        normalized.push('/');
        normalized.push_str(component);
    }

    if normalized.is_empty() {
        normalized.push('/');
    }

    Ok(normalized)
}

/// Parent of a normalized directory, or `None` for `/`.
pub fn parent_dir(dir: &str) -> Option<&str> {
    if dir == ROOT_DIR {
        return None;
    }
    match dir.rfind('/') {
        Some(0) => Some(ROOT_DIR),
        Some(idx) => Some(&dir[..idx]),
        None => None,
    }
}

/// Normalized directory holding the file at `path`.
pub fn containing_dir(path: &str) -> Result<String> {
    let normalized = normalize_dir(path)?;
    parent_dir(&normalized)
        .map(str::to_string)
        .ok_or_else(|| invalid(path, "has no containing directory"))
}

pub fn is_within(dir: &str, root: &str) -> bool {
    root == ROOT_DIR
        || dir == root
        || (dir.starts_with(root) && dir.as_bytes().get(root.len()) == Some(&b'/'))
}

/// `dir` followed by each of its parents, stopping at (and including) `root`.
/// Both must already be normalized.
pub fn ancestors<'a>(dir: &'a str, root: &str) -> Result<Vec<&'a str>> {
    if !is_within(dir, root) {
        return Err(invalid(dir, "outside of the scan root"));
    }

    let mut chain = vec![dir];
    let mut current = dir;
    while current != root {
        match parent_dir(current) {
            Some(parent) => {
                chain.push(parent);
                current = parent;
            }
            None => break,
        }
    }

    Ok(chain)
}

fn invalid(path: &str, reason: &'static str) -> Error {
    Error::InvalidPath {
        path: path.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_dir() {
        assert_eq!(normalize_dir("/a/b/").unwrap(), "/a/b");
        assert_eq!(normalize_dir("//a///b").unwrap(), "/a/b");
        assert_eq!(normalize_dir("/").unwrap(), "/");
        assert_eq!(normalize_dir("///").unwrap(), "/");
        assert!(normalize_dir("a/b").is_err());
        assert!(normalize_dir("/a/../b").is_err());
        assert!(normalize_dir("").is_err());
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("/a/b"), Some("/a"));
        assert_eq!(parent_dir("/a"), Some("/"));
        assert_eq!(parent_dir("/"), None);
    }

    #[test]
    fn test_containing_dir() {
        assert_eq!(containing_dir("/a/b/file.txt").unwrap(), "/a/b");
        assert_eq!(containing_dir("/file.txt").unwrap(), "/");
        assert!(containing_dir("/").is_err());
    }

    #[test]
    fn test_ancestors_stop_at_root() {
        assert_eq!(
            ancestors("/a/b/c", "/").unwrap(),
            vec!["/a/b/c", "/a/b", "/a", "/"]
        );
        assert_eq!(ancestors("/a/b/c", "/a").unwrap(), vec!["/a/b/c", "/a/b", "/a"]);
        assert_eq!(ancestors("/a", "/a").unwrap(), vec!["/a"]);
    }

    #[test]
    fn test_ancestors_reject_paths_outside_root() {
        assert!(ancestors("/ab/c", "/a").is_err());
        assert!(ancestors("/x", "/a").is_err());
    }
}
