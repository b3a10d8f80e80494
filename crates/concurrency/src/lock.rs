//! File-based read/write locks keyed by database name
//!
//! Each lock announces itself as a marker file in the locks directory:
//!
//! ```text
//! {name}.{id}.{time_ns}.{stage}.{mode}.lock
//! ```
//!
//! where `stage` is `need` (waiting) or `has` (granted) and `mode` is `read`
//! or `write`. Acquisition is a polling loop over a snapshot of the marker
//! files for the same database:
//!
//! - a reader is granted once no `has.write` marker exists and no `need.write`
//!   marker is older than its own announcement,
//! - a writer is granted once no `has` marker of either mode exists and its
//!   announcement is the oldest `need` of any mode.
//!
//! Promotion creates the `has` marker before removing the `need` marker, so
//! a lock is visible to every competing snapshot at all times. Markers left
//! behind by crashed holders are removed once older than [`ORPHAN_TIMEOUT`];
//! that threshold exceeds the default acquisition timeout, so markers of
//! live waiters are never reaped.

use spandb_core::{paths, Config, Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Default acquisition timeout before giving up with `Error::LockTimeout`.
///
/// Timeouts passed to `acquire_timeout` must stay below [`ORPHAN_TIMEOUT`],
/// otherwise a still-waiting announcement can be reaped as abandoned.
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(60);

/// Age after which a marker file is considered abandoned and removed.
pub const ORPHAN_TIMEOUT: Duration = Duration::from_secs(300);

// Poll interval while waiting for competing locks to clear.
const SLEEP_INTERVAL: Duration = Duration::from_millis(1);

const STAGE_NEED: &str = "need";
const STAGE_HAS: &str = "has";
const MODE_READ: &str = "read";
const MODE_WRITE: &str = "write";
const LOCK_EXT: &str = "lock";

// Distinguishes locks created by this process; combined with the process id
// it makes every marker file name unique.
static LOCK_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_lock_id() -> String {
    let count = LOCK_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}", std::process::id(), count)
}

fn now_ns() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

// ============================================================================
// Marker file metadata
// ============================================================================

/// Parsed form of one marker file name.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LockMeta {
    name: String,
    id: String,
    time_ns: u128,
    stage: String,
    mode: String,
}

impl LockMeta {
    fn file_name(&self) -> String {
        format!(
            "{}.{}.{}.{}.{}.{LOCK_EXT}",
            self.name, self.id, self.time_ns, self.stage, self.mode
        )
    }

    /// Parse a marker file name. The database name itself may contain dots,
    /// so fields are split off from the right.
    fn parse(file_name: &str) -> Option<LockMeta> {
        let stem = file_name.strip_suffix(&format!(".{LOCK_EXT}"))?;
        let mut parts = stem.rsplitn(5, '.');
        let mode = parts.next()?;
        let stage = parts.next()?;
        let time_ns = parts.next()?.parse().ok()?;
        let id = parts.next()?;
        let name = parts.next()?;
        if !matches!(mode, MODE_READ | MODE_WRITE) || !matches!(stage, STAGE_NEED | STAGE_HAS) {
            return None;
        }
        Some(LockMeta {
            name: name.to_string(),
            id: id.to_string(),
            time_ns,
            stage: stage.to_string(),
            mode: mode.to_string(),
        })
    }

    fn is_stage(&self, stage: &str) -> bool {
        self.stage == stage
    }

    fn is_mode(&self, mode: &str) -> bool {
        self.mode == mode
    }

    // Announcement order: older timestamp first, id as the tie-breaker.
    fn announced_before(&self, other: &LockMeta) -> bool {
        (self.time_ns, &self.id) < (other.time_ns, &other.id)
    }
}

// ============================================================================
// Lock directory snapshot
// ============================================================================

/// All marker files for one database, sampled in a single directory scan.
/// Orphaned markers are removed during the scan rather than reported.
struct LockSnapshot {
    locks: Vec<LockMeta>,
}

impl LockSnapshot {
    fn take(locks_dir: &Path, name: &str) -> Result<LockSnapshot> {
        let mut locks = Vec::new();
        let oldest_alive = now_ns().saturating_sub(ORPHAN_TIMEOUT.as_nanos());
        for entry in fs::read_dir(locks_dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(meta) = LockMeta::parse(&file_name.to_string_lossy()) else {
                continue;
            };
            if meta.name != name {
                continue;
            }
            if meta.time_ns < oldest_alive {
                warn!(file = %file_name.to_string_lossy(), "Removing orphaned lock marker");
                let _ = fs::remove_file(entry.path());
                continue;
            }
            locks.push(meta);
        }
        Ok(LockSnapshot { locks })
    }

    fn any_has(&self) -> bool {
        self.locks.iter().any(|l| l.is_stage(STAGE_HAS))
    }

    fn any_has_write(&self) -> bool {
        self.locks
            .iter()
            .any(|l| l.is_stage(STAGE_HAS) && l.is_mode(MODE_WRITE))
    }

    fn any_need_write_before(&self, own: &LockMeta) -> bool {
        self.locks
            .iter()
            .any(|l| l.is_stage(STAGE_NEED) && l.is_mode(MODE_WRITE) && l.announced_before(own))
    }

    fn any_need_before(&self, own: &LockMeta) -> bool {
        self.locks
            .iter()
            .any(|l| l.is_stage(STAGE_NEED) && l.announced_before(own))
    }
}

// ============================================================================
// Acquisition
// ============================================================================

/// A granted lock: the `has` marker file, removed on drop.
#[derive(Debug)]
struct Granted {
    path: PathBuf,
}

impl Drop for Granted {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to release lock marker");
        }
    }
}

fn create_marker(locks_dir: &Path, meta: &LockMeta) -> Result<PathBuf> {
    let path = locks_dir.join(meta.file_name());
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)?;
    Ok(path)
}

fn acquire(
    config: &Config,
    db_name: &str,
    mode: &'static str,
    timeout: Duration,
) -> Result<Granted> {
    paths::validate_name(db_name)?;
    let locks_dir = paths::locks_dir(config);
    fs::create_dir_all(&locks_dir)?;

    let need = LockMeta {
        name: paths::sanitize_name(db_name),
        id: next_lock_id(),
        time_ns: now_ns(),
        stage: STAGE_NEED.to_string(),
        mode: mode.to_string(),
    };
    let need_path = create_marker(&locks_dir, &need)?;
    debug!(db_name, mode, "Lock announced");

    let started = Instant::now();
    let result = wait_until_grantable(&locks_dir, &need, mode, timeout, started, db_name);
    // The need marker is obsolete whether the lock was granted or not.
    let _ = fs::remove_file(&need_path);
    result
}

fn wait_until_grantable(
    locks_dir: &Path,
    need: &LockMeta,
    mode: &'static str,
    timeout: Duration,
    started: Instant,
    db_name: &str,
) -> Result<Granted> {
    loop {
        let snapshot = LockSnapshot::take(locks_dir, &need.name)?;
        let grantable = match mode {
            MODE_READ => !snapshot.any_has_write() && !snapshot.any_need_write_before(need),
            _ => !snapshot.any_has() && !snapshot.any_need_before(need),
        };
        if grantable {
            let has = LockMeta {
                stage: STAGE_HAS.to_string(),
                ..need.clone()
            };
            // Created before the caller removes the need marker, so competing
            // snapshots never miss this lock entirely.
            let has_path = create_marker(locks_dir, &has)?;
            debug!(db_name, mode, "Lock granted");
            return Ok(Granted { path: has_path });
        }
        if started.elapsed() > timeout {
            warn!(db_name, mode, "Lock acquisition timed out");
            return Err(Error::LockTimeout {
                db_name: db_name.to_string(),
                mode,
            });
        }
        std::thread::sleep(SLEEP_INTERVAL);
    }
}

// ============================================================================
// Public lock guards
// ============================================================================

/// Shared lock on one database. Any number of readers may hold one
/// concurrently; excluded while a writer holds or awaits the database.
#[derive(Debug)]
pub struct ReadLock {
    _granted: Granted,
}

impl ReadLock {
    /// Acquire with the default [`ACQUIRE_TIMEOUT`].
    pub fn acquire(config: &Config, db_name: &str) -> Result<ReadLock> {
        Self::acquire_timeout(config, db_name, ACQUIRE_TIMEOUT)
    }

    /// Acquire, giving up with `Error::LockTimeout` after `timeout`.
    pub fn acquire_timeout(config: &Config, db_name: &str, timeout: Duration) -> Result<ReadLock> {
        Ok(ReadLock {
            _granted: acquire(config, db_name, MODE_READ, timeout)?,
        })
    }
}

/// Exclusive lock on one database.
#[derive(Debug)]
pub struct WriteLock {
    _granted: Granted,
}

impl WriteLock {
    /// Acquire with the default [`ACQUIRE_TIMEOUT`].
    pub fn acquire(config: &Config, db_name: &str) -> Result<WriteLock> {
        Self::acquire_timeout(config, db_name, ACQUIRE_TIMEOUT)
    }

    /// Acquire, giving up with `Error::LockTimeout` after `timeout`.
    pub fn acquire_timeout(config: &Config, db_name: &str, timeout: Duration) -> Result<WriteLock> {
        Ok(WriteLock {
            _granted: acquire(config, db_name, MODE_WRITE, timeout)?,
        })
    }
}
