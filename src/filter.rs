use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::model::{FileType, Gut};

/// Per-dimension inclusion sets. An empty set matches every value in that
/// dimension; a combination matches only if all three dimensions do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub gids: BTreeSet<u32>,
    pub uids: BTreeSet<u32>,
    pub types: BTreeSet<FileType>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gids(mut self, gids: impl IntoIterator<Item = u32>) -> Self {
        self.gids = gids.into_iter().collect();
        self
    }

    pub fn with_uids(mut self, uids: impl IntoIterator<Item = u32>) -> Self {
        self.uids = uids.into_iter().collect();
        self
    }

    pub fn with_types(mut self, types: impl IntoIterator<Item = FileType>) -> Self {
        self.types = types.into_iter().collect();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.gids.is_empty() && self.uids.is_empty() && self.types.is_empty()
    }

    pub fn matches(&self, gut: &Gut) -> bool {
        (self.gids.is_empty() || self.gids.contains(&gut.gid))
            && (self.uids.is_empty() || self.uids.contains(&gut.uid))
            && (self.types.is_empty() || self.types.contains(&gut.file_type))
    }

    /// Build a filter from comma-separated lists, as typed on a command line.
    /// An empty string leaves that dimension unrestricted.
    pub fn parse(gids: &str, uids: &str, types: &str) -> Result<Self> {
        Ok(Filter {
            gids: parse_ids("gid", gids)?,
            uids: parse_ids("uid", uids)?,
            types: split_list(types)
                .map(|t| t.parse::<FileType>())
                .collect::<Result<_>>()?,
        })
    }
}

fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_ids(kind: &str, list: &str) -> Result<BTreeSet<u32>> {
    split_list(list)
        .map(|id| {
            id.parse::<u32>()
                .map_err(|_| Error::InvalidFilter(format!("{} '{}' is not a number", kind, id)))
        })
        .collect()
}
