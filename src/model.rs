use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::str::FromStr;

use crate::error::Error;

/// Closed classification of what a path is on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FileType {
    Regular,
    Directory,
    Symlink,
    Socket,
    BlockDevice,
    CharDevice,
    Fifo,
    Other,
}

impl FileType {
    pub const ALL: [FileType; 8] = [
        FileType::Regular,
        FileType::Directory,
        FileType::Symlink,
        FileType::Socket,
        FileType::BlockDevice,
        FileType::CharDevice,
        FileType::Fifo,
        FileType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Regular => "regular",
            FileType::Directory => "directory",
            FileType::Symlink => "symlink",
            FileType::Socket => "socket",
            FileType::BlockDevice => "block",
            FileType::CharDevice => "char",
            FileType::Fifo => "fifo",
            FileType::Other => "other",
        }
    }

    /// Classify local metadata obtained without following symlinks.
    pub fn from_file_type(file_type: fs::FileType) -> Self {
        if file_type.is_symlink() {
            return FileType::Symlink;
        }
        if file_type.is_dir() {
            return FileType::Directory;
        }
        if file_type.is_file() {
            return FileType::Regular;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            if file_type.is_socket() {
                return FileType::Socket;
            }
            if file_type.is_block_device() {
                return FileType::BlockDevice;
            }
            if file_type.is_char_device() {
                return FileType::CharDevice;
            }
            if file_type.is_fifo() {
                return FileType::Fifo;
            }
        }

        FileType::Other
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileType::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| Error::InvalidFilter(format!("unknown file type '{}'", s)))
    }
}

/// One file as recorded by a walker at scan time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileObservation {
    pub path: String,
    pub gid: u32,
    pub uid: u32,
    pub file_type: FileType,
    pub size: u64,
}

impl FileObservation {
    pub fn new(path: &str, gid: u32, uid: u32, file_type: FileType, size: u64) -> Self {
        Self {
            path: path.to_string(),
            gid,
            uid,
            file_type,
            size,
        }
    }

    pub fn gut(&self) -> Gut {
        Gut {
            gid: self.gid,
            uid: self.uid,
            file_type: self.file_type,
        }
    }
}

/// A (group, user, type) combination that usage is aggregated under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Gut {
    pub gid: u32,
    pub uid: u32,
    pub file_type: FileType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountSize {
    pub count: u64,
    pub size: u64,
}

impl CountSize {
    pub fn add(&mut self, size: u64) {
        self.count += 1;
        self.size += size;
    }

    pub fn merge(&mut self, other: &CountSize) {
        self.count += other.count;
        self.size += other.size;
    }
}

/// Nested file count and size for one directory under some filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirCountSize {
    pub dir: String,
    pub count: u64,
    pub size: u64,
}

impl DirCountSize {
    pub fn new(dir: &str, count: u64, size: u64) -> Self {
        Self {
            dir: dir.to_string(),
            count,
            size,
        }
    }
}

/// A directory plus those of its immediate children that hold matching files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirInfo {
    pub current: DirCountSize,
    pub children: Vec<DirCountSize>,
}

impl DirInfo {
    /// True if every matching file lives under our single child.
    pub fn is_same_as_child(&self) -> bool {
        self.children.len() == 1 && self.children[0].count == self.current.count
    }
}
