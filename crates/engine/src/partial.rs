//! Partial read and write paths
//!
//! A partial read locates the byte span of one key's value (via the index
//! cache when its digest still matches the document, via the boundary
//! scanner otherwise) and decodes only that slice. A partial write splices
//! a freshly serialized value between the prefix and suffix bytes captured
//! at read time, leaving every other byte of the document untouched.
//!
//! Precondition (per [`crate::scanner`]): the key must be unique in the
//! entire document; otherwise behavior is undefined.
//!
//! These paths take no locks. A caller performing read-then-write against
//! the same database must hold an exclusive lock across both calls (see the
//! store layer); otherwise a concurrent writer's changes are silently
//! overwritten by the splice.

use crate::index::{self, IndexData, IndexEntry};
use crate::repr;
use crate::scanner;
use serde_json::Value;
use spandb_core::{Config, Error, Result};
use tracing::debug;

/// A consumed-on-write handle to one key's value span inside a document.
///
/// Holds every byte of the document before and after the value, so that
/// [`partial_write`] can reconstruct the full document without re-reading
/// it. A handle is produced by one [`partial_read_handle`] call and moved
/// into at most one [`partial_write`] call; it must not outlive external
/// changes to the underlying document.
#[derive(Debug)]
pub struct PartialHandle {
    db_name: String,
    key: String,
    prefix: Vec<u8>,
    value: Value,
    suffix: Vec<u8>,
    indent_level: usize,
    indent_unit: String,
    index_data: IndexData,
}

impl PartialHandle {
    /// The database this handle was read from.
    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    /// The key whose value this handle carries.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The decoded value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Mutable access to the decoded value, for in-place edits.
    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    /// Replace the value wholesale.
    pub fn set_value(&mut self, value: Value) {
        self.value = value;
    }
}

/// Read the value of `key` from `db_name` without parsing the document.
pub fn partial_read(config: &Config, db_name: &str, key: &str) -> Result<Value> {
    let located = locate(config, db_name, key)?;
    decode_slice(located.value_bytes())
}

/// Like [`partial_read`], but return a [`PartialHandle`] for a later
/// [`partial_write`].
pub fn partial_read_handle(config: &Config, db_name: &str, key: &str) -> Result<PartialHandle> {
    let located = locate(config, db_name, key)?;
    let value = decode_slice(located.value_bytes())?;
    let Located {
        mut data,
        index_data,
        entry,
    } = located;
    let suffix = data.split_off(entry.end);
    data.truncate(entry.start);
    Ok(PartialHandle {
        db_name: db_name.to_string(),
        key: key.to_string(),
        prefix: data,
        value,
        suffix,
        indent_level: entry.indent_level,
        indent_unit: entry.indent_unit,
        index_data,
    })
}

/// Serialize the handle's value and splice it back into the document.
///
/// The value is re-serialized with the same configuration as full-document
/// writes, re-indented to match the surrounding document, recorded in the
/// index cache, and written as `prefix + value + suffix`.
pub fn partial_write(config: &Config, handle: PartialHandle) -> Result<()> {
    let PartialHandle {
        db_name,
        key,
        mut prefix,
        value,
        suffix,
        indent_level,
        indent_unit,
        mut index_data,
    } = handle;

    let mut serialized = repr::serialize_value(&value, config)?;
    if indent_level > 0 && !indent_unit.is_empty() {
        serialized = indent_continuation_lines(&serialized, indent_level, &indent_unit);
    }

    let entry = IndexEntry::new(
        prefix.len(),
        prefix.len() + serialized.len(),
        indent_level,
        indent_unit,
        &serialized,
    );
    index::store(&mut index_data, config, &db_name, &key, entry)?;

    prefix.reserve(serialized.len() + suffix.len());
    prefix.extend_from_slice(&serialized);
    prefix.extend_from_slice(&suffix);
    repr::write_raw(config, &db_name, &prefix)
}

// ============================================================================
// Span location
// ============================================================================

struct Located {
    data: Vec<u8>,
    index_data: IndexData,
    entry: IndexEntry,
}

impl Located {
    fn value_bytes(&self) -> &[u8] {
        &self.data[self.entry.start..self.entry.end]
    }
}

/// Locate the value span for `key`: trust the index entry if its digest
/// still matches the document bytes, otherwise scan and refresh the entry.
fn locate(config: &Config, db_name: &str, key: &str) -> Result<Located> {
    let data = repr::read_raw(config, db_name)?;
    let mut index_data = index::load(config, db_name)?;

    if let Some(entry) = index_data.get(key).cloned() {
        if entry.in_bounds(&data) && entry.matches(&data[entry.start..entry.end]) {
            debug!(db_name, key, "Index hit, scan skipped");
            return Ok(Located {
                data,
                index_data,
                entry,
            });
        }
        debug!(db_name, key, "Index entry stale, rescanning");
    }

    let key_start = scanner::find_key(&data, key).ok_or_else(|| Error::KeyNotFound {
        key: key.to_string(),
        db_name: db_name.to_string(),
    })?;

    let mut value_start = key_start + scanner::key_token(key).len();
    // At most one space sits between the colon and the value in any
    // formatting this engine produces.
    if data.get(value_start) == Some(&b' ') {
        value_start += 1;
    }
    let value_end = scanner::seek_value_end(&data, value_start)?;
    let (indent_level, indent_unit) =
        scanner::detect_indentation(&data, key_start, config.indent_unit());

    let entry = IndexEntry::new(
        value_start,
        value_end,
        indent_level,
        indent_unit,
        &data[value_start..value_end],
    );
    index::store(&mut index_data, config, db_name, key, entry.clone())?;

    Ok(Located {
        data,
        index_data,
        entry,
    })
}

fn decode_slice(slice: &[u8]) -> Result<Value> {
    serde_json::from_slice(slice).map_err(|e| Error::Serialization(e.to_string()))
}

/// Prepend `level` repetitions of `unit` after every newline, so a
/// multi-line serialized value lines up with the document around it.
fn indent_continuation_lines(serialized: &[u8], level: usize, unit: &str) -> Vec<u8> {
    let pad = unit.repeat(level);
    let mut out = Vec::with_capacity(serialized.len());
    for &b in serialized {
        out.push(b);
        if b == b'\n' {
            out.extend_from_slice(pad.as_bytes());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indent_continuation_lines() {
        let out = indent_continuation_lines(b"{\n\"a\": 1\n}", 2, "  ");
        assert_eq!(out, b"{\n    \"a\": 1\n    }".to_vec());
    }

    #[test]
    fn test_indent_continuation_ignores_escaped_newlines() {
        // Serialized JSON never contains a raw newline inside a string, so
        // only structural newlines are padded.
        let out = indent_continuation_lines(br#""a\nb""#, 1, "  ");
        assert_eq!(out, br#""a\nb""#.to_vec());
    }
}
