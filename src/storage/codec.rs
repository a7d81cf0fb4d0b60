//! Key layout and value encoding for the rollup store.
//!
//! All keys live in one RocksDB key space, distinguished by a two byte
//! prefix:
//!
//! - `d\0<dir>`  bincode `Vec<(Gut, CountSize)>`, sorted by `Gut`
//! - `c\0<dir>`  bincode `Vec<String>`, sorted child directories
//! - `m\0meta`   bincode [`StoreMeta`], written last when a build completes

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{CountSize, Gut};

pub const FORMAT_VERSION: u32 = 1;

const DIR_PREFIX: &[u8] = b"d\0";
const CHILDREN_PREFIX: &[u8] = b"c\0";
pub const META_KEY: &[u8] = b"m\0meta";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMeta {
    pub format_version: u32,
    pub root: String,
    pub created_at: String,
    pub observations: u64,
    pub dirs: u64,
}

impl StoreMeta {
    pub fn new(root: &str, observations: u64, dirs: u64) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            root: root.to_string(),
            created_at: Utc::now().to_rfc3339(),
            observations,
            dirs,
        }
    }
}

fn prefixed(prefix: &[u8], dir: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + dir.len());
    key.extend_from_slice(prefix);
    key.extend_from_slice(dir.as_bytes());
    key
}

pub fn dir_key(dir: &str) -> Vec<u8> {
    prefixed(DIR_PREFIX, dir)
}

pub fn children_key(dir: &str) -> Vec<u8> {
    prefixed(CHILDREN_PREFIX, dir)
}

pub fn encode_guts(guts: &[(Gut, CountSize)]) -> Result<Vec<u8>> {
    Ok(bincode::serialize(guts)?)
}

pub fn decode_guts(bytes: &[u8]) -> Result<Vec<(Gut, CountSize)>> {
    Ok(bincode::deserialize(bytes)?)
}

pub fn encode_children(children: &[String]) -> Result<Vec<u8>> {
    Ok(bincode::serialize(children)?)
}

pub fn decode_children(bytes: &[u8]) -> Result<Vec<String>> {
    Ok(bincode::deserialize(bytes)?)
}

pub fn encode_meta(meta: &StoreMeta) -> Result<Vec<u8>> {
    Ok(bincode::serialize(meta)?)
}

pub fn decode_meta(bytes: &[u8]) -> Result<StoreMeta> {
    Ok(bincode::deserialize(bytes)?)
}
