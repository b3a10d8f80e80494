//! Index cache: per-document sidecar of previously located value spans
//!
//! The sidecar file maps each looked-up key to the byte span its value
//! occupied, the indentation in effect there, and a SHA-256 digest of the
//! span's bytes at the time the entry was written. Entries let repeat reads
//! skip the boundary scanner entirely, but are trusted only after the digest
//! check passes against the current document bytes; a mismatch means some
//! writer bypassed the cache and the span must be re-located.
//!
//! The sidecar is a plain JSON object, each entry a 5-element array
//! `[start, end, indent_level, indent_unit, value_hash]`, rewritten
//! wholesale on every store. Entries are never pruned; staleness is
//! detected, not prevented.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use spandb_core::{paths, Config, Error, Result};
use std::collections::HashMap;
use std::fs;
use tracing::{debug, warn};

/// The in-memory index for one document: key to cached span descriptor.
pub type IndexData = HashMap<String, IndexEntry>;

// Sidecar wire shape: [start, end, indent_level, indent_unit, value_hash].
type EntryTuple = (usize, usize, usize, String, String);

/// One cached value span.
///
/// `start`/`end` are byte offsets into the decompressed document; the entry
/// is valid only while `value_hash` matches the digest of those bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EntryTuple", into = "EntryTuple")]
pub struct IndexEntry {
    /// Byte offset of the first byte of the value.
    pub start: usize,
    /// Byte offset one past the last byte of the value.
    pub end: usize,
    /// Number of indentation units before the key's line.
    pub indent_level: usize,
    /// The indentation unit in effect, empty for compact documents.
    pub indent_unit: String,
    /// Lowercase hex SHA-256 of the value bytes when the entry was written.
    pub value_hash: String,
}

impl From<EntryTuple> for IndexEntry {
    fn from((start, end, indent_level, indent_unit, value_hash): EntryTuple) -> Self {
        IndexEntry {
            start,
            end,
            indent_level,
            indent_unit,
            value_hash,
        }
    }
}

impl From<IndexEntry> for EntryTuple {
    fn from(e: IndexEntry) -> Self {
        (e.start, e.end, e.indent_level, e.indent_unit, e.value_hash)
    }
}

impl IndexEntry {
    /// Build an entry for a freshly located span, hashing `value_bytes`.
    pub fn new(
        start: usize,
        end: usize,
        indent_level: usize,
        indent_unit: String,
        value_bytes: &[u8],
    ) -> IndexEntry {
        IndexEntry {
            start,
            end,
            indent_level,
            indent_unit,
            value_hash: sha256_hex(value_bytes),
        }
    }

    /// Whether this entry's recorded span can be sliced out of `data` at all.
    pub fn in_bounds(&self, data: &[u8]) -> bool {
        self.start <= self.end && self.end <= data.len()
    }

    /// Whether `slice` still has the content this entry was written against.
    pub fn matches(&self, slice: &[u8]) -> bool {
        self.value_hash == sha256_hex(slice)
    }
}

/// Compute the SHA-256 digest of `data` as a lowercase hex string.
pub fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Load the index for `db_name`, returning an empty mapping if the sidecar
/// file does not exist. The sidecar's parent directory is created on demand.
///
/// An unreadable sidecar is treated as empty rather than failing the
/// operation: the index is a cache, and every entry it could have held is
/// recoverable by scanning.
pub fn load(config: &Config, db_name: &str) -> Result<IndexData> {
    let path = paths::index_path(config, db_name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    if !path.is_file() {
        return Ok(IndexData::new());
    }
    let bytes = fs::read(&path)?;
    match serde_json::from_slice(&bytes) {
        Ok(index_data) => Ok(index_data),
        Err(e) => {
            warn!(db_name, error = %e, "Discarding unreadable index sidecar");
            Ok(IndexData::new())
        }
    }
}

/// Insert or overwrite the entry for `key` and persist the whole mapping.
///
/// The sidecar is rewritten in one write rather than appended to; index
/// files stay small (one entry per distinct key ever looked up).
pub fn store(
    index_data: &mut IndexData,
    config: &Config,
    db_name: &str,
    key: &str,
    entry: IndexEntry,
) -> Result<()> {
    index_data.insert(key.to_string(), entry);
    let path = paths::index_path(config, db_name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes =
        serde_json::to_vec(index_data).map_err(|e| Error::Serialization(e.to_string()))?;
    fs::write(&path, bytes)?;
    debug!(db_name, key, entries = index_data.len(), "Index entry stored");
    Ok(())
}
