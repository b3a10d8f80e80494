//! spandb - embedded JSON document store with partial field-level I/O
//!
//! spandb persists each logical database as one JSON-object file, plain or
//! zlib-compressed, and can read or rewrite a single key inside a large
//! document without parsing or re-serializing the rest of it. Value spans
//! located by the byte scanner are remembered in a hash-validated sidecar
//! index, so repeat access to the same key skips scanning entirely.
//!
//! # Quick Start
//!
//! ```no_run
//! use spandb::{Config, Store};
//! use serde_json::json;
//!
//! # fn main() -> spandb::Result<()> {
//! let store = Store::new(Config::new("./data"));
//!
//! store.create("users", &json!({"alice": {"age": 30}, "bob": {"age": 25}}))?;
//!
//! // Reads only the span of "alice", not the whole document
//! let alice = store.read_key("users", "alice")?;
//!
//! // Read-modify-write of one key under an exclusive lock
//! let mut session = store.session_key("users", "alice")?;
//! session.value_mut()["age"] = json!(31);
//! session.write()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! [`Store`] brackets every operation in a file-based lock; the engine
//! layers underneath (`spandb_engine::{scanner, index, repr, partial}`)
//! perform no locking of their own and are re-exported for callers that
//! coordinate access themselves.
//!
//! Partial operations require every key to be unique within its document;
//! with duplicate key names their behavior is undefined.

// Re-export the public API from the member crates
pub use spandb_concurrency::{ReadLock, WriteLock};
pub use spandb_core::{Config, DbPaths, Error, Result};
pub use spandb_engine::{
    partial_read, partial_read_handle, partial_write, IndexData, IndexEntry, KeySession,
    PartialHandle, Session, Store,
};
