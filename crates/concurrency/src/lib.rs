//! Concurrency layer for spandb
//!
//! This crate implements mutual exclusion between readers and writers of the
//! same logical database, across threads and across processes, using lock
//! marker files:
//! - ReadLock: shared access, any number of concurrent holders
//! - WriteLock: exclusive access, one holder and no readers
//!
//! Locks are granted in FIFO order of their announcement timestamps, so a
//! steady stream of readers cannot starve a waiting writer. Locks are NOT
//! re-entrant: acquiring a second lock on the same database from a thread
//! that already holds one will deadlock until the acquisition timeout.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod lock;

pub use lock::{ReadLock, WriteLock, ACQUIRE_TIMEOUT, ORPHAN_TIMEOUT};
