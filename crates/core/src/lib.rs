//! Core types for spandb
//!
//! This crate defines the foundational types used throughout the system:
//! - Config: explicit per-call configuration (storage root, compression, formatting)
//! - DbPaths: resolution of logical database names to on-disk representations
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod paths;

pub use config::{Config, DEFAULT_INDENT, DEFAULT_STORAGE_DIR};
pub use error::{Error, Result};
pub use paths::DbPaths;
