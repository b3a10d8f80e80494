//! Document engine for spandb
//!
//! This crate implements the partial I/O engine and the layers under it:
//! - scanner: locates a key's value span in raw bytes without a full parse
//! - index: hash-validated sidecar cache of previously located spans
//! - repr: plain vs. zlib-compressed on-disk document representation
//! - partial: partial read/write paths and the consumed-on-write handle
//! - store: lock-bracketed operations and read-modify-write sessions
//!
//! The modules below `store` perform no locking and are safe only under
//! external mutual exclusion; `store` is the surface most callers want.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod index;
pub mod partial;
pub mod repr;
pub mod scanner;
pub mod store;

pub use index::{IndexData, IndexEntry};
pub use partial::{partial_read, partial_read_handle, partial_write, PartialHandle};
pub use store::{KeySession, Session, Store};
