//! Store configuration
//!
//! A `Config` is an explicit value threaded through every operation instead
//! of ambient process state. Callers construct one, optionally adjust it
//! with the `with_*` methods, and hand a reference to each call. Changing
//! the configuration between calls is supported: documents written while
//! compression was enabled stay readable after it is disabled, and the next
//! write migrates the on-disk representation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default storage directory, relative to the working directory.
pub const DEFAULT_STORAGE_DIR: &str = "spandb_storage";

/// Default indentation unit for pretty-printed documents.
pub const DEFAULT_INDENT: &str = "  ";

/// Configuration for a document store.
///
/// # Example
///
/// ```
/// use spandb_core::Config;
///
/// let config = Config::new("/tmp/mydata")
///     .with_compression(true)
///     .with_sort_keys(true);
/// assert!(config.pretty_print());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding document files and the `.ddb` sidecar directory.
    pub storage_dir: PathBuf,
    /// Write documents as zlib-compressed `.ddb` files instead of plain `.json`.
    pub use_compression: bool,
    /// Indentation unit for pretty-printed output. `None` writes compact JSON.
    pub indent: Option<String>,
    /// Sort object keys when serializing documents.
    pub sort_keys: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            use_compression: false,
            indent: Some(DEFAULT_INDENT.to_string()),
            sort_keys: false,
        }
    }
}

impl Config {
    /// Create a configuration rooted at `storage_dir` with default formatting.
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Config {
            storage_dir: storage_dir.into(),
            ..Config::default()
        }
    }

    /// Enable or disable the compressed on-disk representation.
    pub fn with_compression(mut self, use_compression: bool) -> Self {
        self.use_compression = use_compression;
        self
    }

    /// Set the indentation unit, e.g. `"  "` or `"\t"`.
    pub fn with_indent(mut self, unit: impl Into<String>) -> Self {
        self.indent = Some(unit.into());
        self
    }

    /// Write compact JSON with no indentation or newlines.
    pub fn compact(mut self) -> Self {
        self.indent = None;
        self
    }

    /// Enable or disable key sorting during serialization.
    pub fn with_sort_keys(mut self, sort_keys: bool) -> Self {
        self.sort_keys = sort_keys;
        self
    }

    /// Whether documents are pretty-printed.
    pub fn pretty_print(&self) -> bool {
        self.indent.is_some()
    }

    /// The indentation unit in effect, empty for compact output.
    pub fn indent_unit(&self) -> &str {
        self.indent.as_deref().unwrap_or("")
    }
}
