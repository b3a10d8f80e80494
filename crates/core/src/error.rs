//! Error types for spandb
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use thiserror::Error;

/// Result type alias for spandb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the spandb document store
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A database exists as both its plain and its compressed representation
    #[error("Storage inconsistency: \"{0}\" exists as both .json and .ddb")]
    StorageInconsistency(String),

    /// Neither representation of the database exists
    #[error("Database \"{0}\" does not exist")]
    NotFound(String),

    /// Key absent from the document after a full scan
    #[error("Key \"{key}\" not found in database \"{db_name}\"")]
    KeyNotFound {
        /// The key that was requested
        key: String,
        /// The database that was scanned
        db_name: String,
    },

    /// Database already exists (create refused to overwrite)
    #[error("Database \"{0}\" already exists")]
    AlreadyExists(String),

    /// Lock could not be acquired within the acquisition timeout
    #[error("Timed out acquiring {mode} lock on \"{db_name}\"")]
    LockTimeout {
        /// The database the lock was requested for
        db_name: String,
        /// Lock mode, `"read"` or `"write"`
        mode: &'static str,
    },

    /// Database name is not usable as a storage path
    #[error("Invalid database name: \"{0}\"")]
    InvalidName(String),
}
