//! Safe operation layer: lock-bracketed store operations and sessions
//!
//! [`Store`] is the user-facing entry point. Every operation brackets the
//! engine calls in the appropriate file lock: shared for read-only
//! operations, exclusive for anything that mutates the document or its
//! index cache (the two are locked as one unit, since writing one without
//! the other leaves the cache stale).
//!
//! Read-modify-write goes through sessions, which hold the exclusive lock
//! for their whole lifetime and consume themselves on write, so a decoded
//! value can never be written back twice or after the lock is gone.
//!
//! Locks are not re-entrant: calling back into the same database from
//! inside an open session deadlocks until the acquisition timeout.

use crate::partial::{self, PartialHandle};
use crate::repr;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use spandb_concurrency::{ReadLock, WriteLock};
use spandb_core::{Config, Error, Result};
use tracing::info;

/// Handle to a directory of documents, parameterized by a [`Config`].
///
/// Cheap to clone; holds no open files or in-memory state. All data lives
/// on disk under `config.storage_dir`.
///
/// # Example
///
/// ```no_run
/// use spandb_core::Config;
/// use spandb_engine::Store;
/// use serde_json::json;
///
/// # fn main() -> spandb_core::Result<()> {
/// let store = Store::new(Config::new("./data"));
/// store.create("users", &json!({"alice": {"age": 30}}))?;
/// let age = store.read_key("users", "alice")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Store {
    config: Config,
}

impl Store {
    /// Create a store handle over `config`. No I/O happens until the first
    /// operation; directories are created on demand.
    pub fn new(config: Config) -> Store {
        Store { config }
    }

    /// The configuration in effect for this handle.
    pub fn config(&self) -> &Config {
        &self.config
    }

    // ========================================================================
    // Read operations (shared lock)
    // ========================================================================

    /// Read and decode the full document.
    pub fn read(&self, db_name: &str) -> Result<Value> {
        let _lock = ReadLock::acquire(&self.config, db_name)?;
        repr::read(&self.config, db_name)
    }

    /// Read and deserialize the full document into `T`.
    pub fn read_as<T: DeserializeOwned>(&self, db_name: &str) -> Result<T> {
        let value = self.read(db_name)?;
        serde_json::from_value(value).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Read the value of a single key without parsing the whole document.
    ///
    /// The key must be unique in the entire document.
    pub fn read_key(&self, db_name: &str, key: &str) -> Result<Value> {
        let _lock = ReadLock::acquire(&self.config, db_name)?;
        partial::partial_read(&self.config, db_name, key)
    }

    /// Whether any representation of the database exists.
    pub fn exists(&self, db_name: &str) -> Result<bool> {
        let _lock = ReadLock::acquire(&self.config, db_name)?;
        repr::exists(&self.config, db_name)
    }

    /// Whether the database exists and contains `key`.
    pub fn exists_key(&self, db_name: &str, key: &str) -> Result<bool> {
        let _lock = ReadLock::acquire(&self.config, db_name)?;
        match partial::partial_read(&self.config, db_name, key) {
            Ok(_) => Ok(true),
            Err(Error::KeyNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // Write operations (exclusive lock)
    // ========================================================================

    /// Create a new document. Fails with `Error::AlreadyExists` if any
    /// representation of the name already exists.
    pub fn create(&self, db_name: &str, value: &Value) -> Result<()> {
        let _lock = WriteLock::acquire(&self.config, db_name)?;
        if repr::exists(&self.config, db_name)? {
            return Err(Error::AlreadyExists(db_name.to_string()));
        }
        repr::write(&self.config, db_name, value)?;
        info!(db_name, "Database created");
        Ok(())
    }

    /// Write the full document, creating or replacing it.
    pub fn write(&self, db_name: &str, value: &Value) -> Result<()> {
        let _lock = WriteLock::acquire(&self.config, db_name)?;
        repr::write(&self.config, db_name, value)
    }

    /// Serialize `value` and write it as the full document.
    pub fn write_as<T: Serialize>(&self, db_name: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|e| Error::Serialization(e.to_string()))?;
        self.write(db_name, &value)
    }

    /// Delete whichever representation of the database exists. Idempotent;
    /// index cache entries are left behind and invalidated by their hash
    /// check if the name is ever reused.
    pub fn delete(&self, db_name: &str) -> Result<()> {
        let _lock = WriteLock::acquire(&self.config, db_name)?;
        repr::delete(&self.config, db_name)?;
        info!(db_name, "Database deleted");
        Ok(())
    }

    // ========================================================================
    // Sessions (exclusive lock held across read-modify-write)
    // ========================================================================

    /// Open a read-modify-write session over the full document.
    pub fn session(&self, db_name: &str) -> Result<Session> {
        let lock = WriteLock::acquire(&self.config, db_name)?;
        let value = repr::read(&self.config, db_name)?;
        Ok(Session {
            config: self.config.clone(),
            db_name: db_name.to_string(),
            value,
            _lock: lock,
        })
    }

    /// Open a read-modify-write session over a single key.
    ///
    /// The key must be unique in the entire document.
    pub fn session_key(&self, db_name: &str, key: &str) -> Result<KeySession> {
        let lock = WriteLock::acquire(&self.config, db_name)?;
        let handle = partial::partial_read_handle(&self.config, db_name, key)?;
        Ok(KeySession {
            config: self.config.clone(),
            handle,
            _lock: lock,
        })
    }
}

/// An open full-document session.
///
/// Holds the exclusive lock until dropped. Call [`Session::write`] to
/// persist the (possibly modified) value; dropping without writing discards
/// all changes.
#[derive(Debug)]
pub struct Session {
    config: Config,
    db_name: String,
    value: Value,
    _lock: WriteLock,
}

impl Session {
    /// The decoded document.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Mutable access to the decoded document.
    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    /// Replace the document wholesale.
    pub fn set_value(&mut self, value: Value) {
        self.value = value;
    }

    /// Persist the document and release the lock.
    pub fn write(self) -> Result<()> {
        repr::write(&self.config, &self.db_name, &self.value)
    }
}

/// An open single-key session over a [`PartialHandle`].
///
/// Holds the exclusive lock until dropped; consuming [`KeySession::write`]
/// drives the splice-based partial write path exactly once.
#[derive(Debug)]
pub struct KeySession {
    config: Config,
    handle: PartialHandle,
    _lock: WriteLock,
}

impl KeySession {
    /// The key this session is editing.
    pub fn key(&self) -> &str {
        self.handle.key()
    }

    /// The decoded value of the key.
    pub fn value(&self) -> &Value {
        self.handle.value()
    }

    /// Mutable access to the decoded value.
    pub fn value_mut(&mut self) -> &mut Value {
        self.handle.value_mut()
    }

    /// Replace the value wholesale.
    pub fn set_value(&mut self, value: Value) {
        self.handle.set_value(value);
    }

    /// Splice the value back into the document and release the lock.
    pub fn write(self) -> Result<()> {
        partial::partial_write(&self.config, self.handle)
    }
}
