//! Document representation layer
//!
//! A logical database is one JSON-object document stored as either a plain
//! `.json` file or a zlib-compressed `.ddb` file holding the same bytes.
//! Exactly one representation may exist per name; this module reads
//! whichever is present (independent of the current compression setting, so
//! toggling the flag never strands data) and migrates the representation on
//! write. Compression uses the lowest zlib level, trading ratio for speed.
//!
//! `serialize_value` is the single serializer shared by full-document and
//! partial writes, which keeps spliced values byte-compatible with fully
//! rewritten documents.

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::Value;
use spandb_core::{Config, DbPaths, Error, Result};
use std::fs;
use std::io::{Read, Write};
use tracing::debug;

/// Read the raw (decompressed) bytes of the document for `db_name`.
///
/// Fails with `Error::StorageInconsistency` if both representations exist
/// and `Error::NotFound` if neither does.
pub fn read_raw(config: &Config, db_name: &str) -> Result<Vec<u8>> {
    let db_paths = DbPaths::resolve(config, db_name)?;
    if db_paths.plain_exists && db_paths.compressed_exists {
        return Err(Error::StorageInconsistency(db_name.to_string()));
    }
    if db_paths.plain_exists {
        return Ok(fs::read(&db_paths.plain_path)?);
    }
    if db_paths.compressed_exists {
        let compressed = fs::read(&db_paths.compressed_path)?;
        let mut decoder = ZlibDecoder::new(compressed.as_slice());
        let mut content = Vec::new();
        decoder.read_to_end(&mut content)?;
        return Ok(content);
    }
    Err(Error::NotFound(db_name.to_string()))
}

/// Read and decode the full document for `db_name`.
pub fn read(config: &Config, db_name: &str) -> Result<Value> {
    let content = read_raw(config, db_name)?;
    serde_json::from_slice(&content).map_err(|e| Error::Serialization(e.to_string()))
}

/// Whether any representation of `db_name` exists.
pub fn exists(config: &Config, db_name: &str) -> Result<bool> {
    let db_paths = DbPaths::resolve(config, db_name)?;
    Ok(db_paths.plain_exists || db_paths.compressed_exists)
}

/// Write raw document bytes for `db_name`.
///
/// The target representation follows `config.use_compression`; if the other
/// representation exists it is deleted first, so exactly one file remains
/// after the write. Parent directories are created on demand.
pub fn write_raw(config: &Config, db_name: &str, content: &[u8]) -> Result<()> {
    let db_paths = DbPaths::resolve(config, db_name)?;
    let (target, stale_path, stale_exists) = if config.use_compression {
        (&db_paths.compressed_path, &db_paths.plain_path, db_paths.plain_exists)
    } else {
        (&db_paths.plain_path, &db_paths.compressed_path, db_paths.compressed_exists)
    };
    if stale_exists {
        fs::remove_file(stale_path)?;
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    if config.use_compression {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(content)?;
        let compressed = encoder.finish()?;
        fs::write(target, &compressed)?;
        debug!(
            db_name,
            raw_bytes = content.len(),
            compressed_bytes = compressed.len(),
            "Document written (compressed)"
        );
    } else {
        fs::write(target, content)?;
        debug!(db_name, bytes = content.len(), "Document written");
    }
    Ok(())
}

/// Serialize and write the full document for `db_name`.
pub fn write(config: &Config, db_name: &str, value: &Value) -> Result<()> {
    let content = serialize_value(value, config)?;
    write_raw(config, db_name, &content)
}

/// Delete whichever representation of `db_name` exists. Idempotent.
pub fn delete(config: &Config, db_name: &str) -> Result<()> {
    let db_paths = DbPaths::resolve(config, db_name)?;
    if db_paths.plain_exists {
        fs::remove_file(&db_paths.plain_path)?;
    }
    if db_paths.compressed_exists {
        fs::remove_file(&db_paths.compressed_path)?;
    }
    Ok(())
}

/// Serialize a value with the configured formatting.
///
/// Compact when `config.indent` is `None`, pretty-printed with the
/// configured unit otherwise; object keys are recursively sorted when
/// `config.sort_keys` is set. Both the full-document and the partial write
/// path go through here.
pub fn serialize_value(value: &Value, config: &Config) -> Result<Vec<u8>> {
    let sorted;
    let value = if config.sort_keys {
        sorted = sort_keys_deep(value);
        &sorted
    } else {
        value
    };
    let mut content = Vec::new();
    match &config.indent {
        Some(unit) => {
            let formatter = PrettyFormatter::with_indent(unit.as_bytes());
            let mut serializer = Serializer::with_formatter(&mut content, formatter);
            value
                .serialize(&mut serializer)
                .map_err(|e| Error::Serialization(e.to_string()))?;
        }
        None => {
            content =
                serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))?;
        }
    }
    Ok(content)
}

fn sort_keys_deep(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_keys_deep(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys_deep).collect()),
        other => other.clone(),
    }
}
