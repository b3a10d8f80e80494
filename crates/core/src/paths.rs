//! On-disk layout resolution
//!
//! Maps a logical database name to its concrete storage paths. Each name has
//! two potential representations, a plain `.json` file and a zlib-compressed
//! `.ddb` file, of which at most one may exist at any time. Index sidecar
//! files and lock markers live under the `.ddb` sidecar directory inside the
//! storage root, with path separators in the name flattened so one sidecar
//! file corresponds to one database regardless of nesting.

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::PathBuf;

/// File extension of the plain-text representation.
pub const PLAIN_EXT: &str = "json";

/// File extension of the zlib-compressed representation.
pub const COMPRESSED_EXT: &str = "ddb";

/// Sidecar directory (under the storage root) for index and lock files.
pub const SIDECAR_DIR: &str = ".ddb";

/// Extension of index sidecar files.
pub const INDEX_EXT: &str = "index";

// Path separators inside a database name are flattened to this placeholder
// when forming sidecar file names.
const SEPARATOR_PLACEHOLDER: &str = "___";

/// Resolved representation paths for one logical database name.
///
/// Existence is sampled at resolution time; callers holding the appropriate
/// lock may treat it as current.
#[derive(Debug, Clone)]
pub struct DbPaths {
    /// Path of the plain `.json` representation.
    pub plain_path: PathBuf,
    /// Whether the plain representation currently exists.
    pub plain_exists: bool,
    /// Path of the compressed `.ddb` representation.
    pub compressed_path: PathBuf,
    /// Whether the compressed representation currently exists.
    pub compressed_exists: bool,
}

impl DbPaths {
    /// Resolve both representation paths for `db_name` and sample existence.
    pub fn resolve(config: &Config, db_name: &str) -> Result<DbPaths> {
        validate_name(db_name)?;
        let plain_path = config
            .storage_dir
            .join(format!("{db_name}.{PLAIN_EXT}"));
        let compressed_path = config
            .storage_dir
            .join(format!("{db_name}.{COMPRESSED_EXT}"));
        Ok(DbPaths {
            plain_exists: plain_path.is_file(),
            plain_path,
            compressed_exists: compressed_path.is_file(),
            compressed_path,
        })
    }
}

/// Check that `db_name` is safe to use under the storage root.
///
/// Names may contain `/` to group databases into subdirectories, but must
/// not escape the storage root or collide with the sidecar directory.
pub fn validate_name(db_name: &str) -> Result<()> {
    let invalid = db_name.is_empty()
        || db_name.starts_with('/')
        || db_name.ends_with('/')
        || db_name.contains('\\')
        || db_name == SIDECAR_DIR
        || db_name
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if invalid {
        return Err(Error::InvalidName(db_name.to_string()));
    }
    Ok(())
}

/// Flatten a database name into a single sidecar file-name component.
pub fn sanitize_name(db_name: &str) -> String {
    db_name.replace('/', SEPARATOR_PLACEHOLDER)
}

/// Path of the index sidecar file for `db_name`.
pub fn index_path(config: &Config, db_name: &str) -> PathBuf {
    config
        .storage_dir
        .join(SIDECAR_DIR)
        .join(format!("{}.{INDEX_EXT}", sanitize_name(db_name)))
}

/// Directory holding lock marker files.
pub fn locks_dir(config: &Config) -> PathBuf {
    config.storage_dir.join(SIDECAR_DIR).join("locks")
}
