//! Retention sweeper — reclaims artifacts past the retention window.
//!
//! A supervised background thread wakes on a fixed interval, queries the
//! metadata index for expired rows, and deletes each artifact from the
//! durable store, the cache, and the index — in that order, so a crash
//! mid-record leaves the row discoverable as "still expired" on the next
//! cycle instead of leaking an untracked blob. Per-record failures are
//! logged and retried next cycle; nothing crashes the thread.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;

use crate::config::Config;
use crate::store::index::{self, ArtifactRecord};
use crate::store::{ArtifactCache, ObjectStore, StoreError};

/// Sleep granularity for shutdown responsiveness.
const SLEEP_GRANULARITY: Duration = Duration::from_secs(5);

/// Outcome of one sweep cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Expired rows found in the index.
    pub expired: usize,
    /// Rows fully reclaimed from all three tiers.
    pub deleted: usize,
    /// Rows skipped this cycle; still expired, retried next cycle.
    pub failed: usize,
}

/// Single-in-flight guard shared between the scheduled loop and any manual
/// trigger. A trigger that arrives while a sweep runs is skipped, never
/// queued.
#[derive(Default)]
pub struct SweepGuard {
    lock: Mutex<()>,
}

impl SweepGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` only if no sweep is currently in flight.
    pub fn try_run<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let _guard = self.lock.try_lock().ok()?;
        Some(f())
    }
}

/// Run one sweep cycle against an open index connection.
pub fn sweep_once(
    conn: &Connection,
    cache: &ArtifactCache,
    store: &dyn ObjectStore,
    window: chrono::Duration,
) -> Result<SweepStats, StoreError> {
    let expired = index::find_expired(conn, window)?;
    let mut stats = SweepStats {
        expired: expired.len(),
        ..SweepStats::default()
    };

    for record in &expired {
        match reclaim_record(conn, cache, store, record) {
            Ok(()) => stats.deleted += 1,
            Err(e) => {
                stats.failed += 1;
                tracing::warn!(
                    artifact_id = %record.id,
                    error = %e,
                    "Sweep: reclaim failed — record stays expired, retried next cycle"
                );
            }
        }
    }

    if stats.expired > 0 {
        tracing::info!(
            expired = stats.expired,
            deleted = stats.deleted,
            failed = stats.failed,
            "Sweep cycle complete"
        );
    }
    Ok(stats)
}

/// Delete one expired artifact from all three tiers.
///
/// Durable copy and cache copy go first; the metadata row goes last. Any
/// failure before the row is deleted leaves it discoverable for the next
/// cycle — idempotent re-processing, never a leaked blob.
fn reclaim_record(
    conn: &Connection,
    cache: &ArtifactCache,
    store: &dyn ObjectStore,
    record: &ArtifactRecord,
) -> Result<(), StoreError> {
    store.delete(&record.id)?;

    // Cache failures are usually absorbed, but here a stale entry that
    // outlives its metadata row would never be revisited — so a failed
    // cache delete keeps the row for the next cycle.
    cache
        .delete(&record.id)
        .map_err(|e| StoreError::Unavailable(format!("cache delete: {e}")))?;

    index::delete_artifact(conn, &record.id)?;
    tracing::debug!(artifact_id = %record.id, owner = %record.owner_key, "Artifact reclaimed");
    Ok(())
}

// ---------------------------------------------------------------------------
// Background thread
// ---------------------------------------------------------------------------

/// Handle for the background sweeper thread.
///
/// Supports graceful shutdown via `shutdown()` or automatic cleanup on
/// `Drop`. Keep it alive for the lifetime of the host process.
pub struct SweeperHandle {
    shutdown: Arc<AtomicBool>,
    guard: Arc<SweepGuard>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl SweeperHandle {
    /// Request graceful shutdown. A sweep already in flight completes;
    /// no new cycle starts.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// The shared single-in-flight guard, for manual sweep triggers.
    pub fn guard(&self) -> Arc<SweepGuard> {
        self.guard.clone()
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

/// Start the retention sweeper on a background thread.
///
/// Returns `None` in development mode — the sweep is disabled entirely.
pub fn start_sweeper(
    config: &Config,
    cache: ArtifactCache,
    store: Arc<dyn ObjectStore>,
) -> Option<SweeperHandle> {
    if config.dev_mode {
        tracing::info!("Retention sweeper disabled (development mode)");
        return None;
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let guard = Arc::new(SweepGuard::new());
    let flag = shutdown.clone();
    let loop_guard = guard.clone();
    let index_path = config.index_path();
    let interval = config.sweep_interval;
    let window = config.retention_window();

    let handle = std::thread::spawn(move || {
        tracing::info!(
            interval_secs = interval.as_secs(),
            retention_days = window.num_days(),
            "Retention sweeper started"
        );
        sweeper_loop(&index_path, &cache, store.as_ref(), &loop_guard, window, interval, &flag);
    });

    Some(SweeperHandle {
        shutdown,
        guard,
        handle: Some(handle),
    })
}

fn sweeper_loop(
    index_path: &Path,
    cache: &ArtifactCache,
    store: &dyn ObjectStore,
    guard: &SweepGuard,
    window: chrono::Duration,
    interval: Duration,
    shutdown: &AtomicBool,
) {
    while !shutdown.load(Ordering::Relaxed) {
        // Sleep in small increments for responsive shutdown.
        let mut slept = Duration::ZERO;
        while slept < interval {
            if shutdown.load(Ordering::Relaxed) {
                tracing::info!("Retention sweeper shutting down");
                return;
            }
            let step = SLEEP_GRANULARITY.min(interval - slept);
            std::thread::sleep(step);
            slept += step;
        }

        let ran = guard.try_run(|| run_cycle(index_path, cache, store, window));
        if ran.is_none() {
            tracing::debug!("Sweep already in flight — skipping trigger");
        }
    }
    tracing::info!("Retention sweeper shutting down");
}

/// One scheduled cycle: open a fresh index connection and sweep. Every
/// failure is logged; the loop must survive indefinitely.
fn run_cycle(
    index_path: &Path,
    cache: &ArtifactCache,
    store: &dyn ObjectStore,
    window: chrono::Duration,
) {
    let conn = match index::open_index(index_path) {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(error = %e, "Sweep: cannot open metadata index — skipping cycle");
            return;
        }
    };

    if let Err(e) = sweep_once(&conn, cache, store, window) {
        tracing::error!(error = %e, "Sweep cycle failed — retrying next interval");
    }
}

/// Manually trigger a sweep, respecting the single-in-flight guard.
/// Returns `None` when a sweep is already running.
pub fn trigger_sweep(
    guard: &SweepGuard,
    index_path: &Path,
    cache: &ArtifactCache,
    store: &dyn ObjectStore,
    window: chrono::Duration,
) -> Option<Result<SweepStats, StoreError>> {
    guard.try_run(|| {
        let conn = index::open_index(index_path)?;
        sweep_once(&conn, cache, store, window)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ArtifactId;
    use crate::store::index::open_memory_index;
    use crate::store::object::MemoryObjectStore;
    use chrono::{Duration as ChronoDuration, Utc};

    fn fixture() -> (tempfile::TempDir, ArtifactCache, MemoryObjectStore, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::new(dir.path().join("cache")).unwrap();
        let conn = open_memory_index().unwrap();
        (dir, cache, MemoryObjectStore::new(), conn)
    }

    fn seed_artifact(
        conn: &Connection,
        cache: &ArtifactCache,
        store: &MemoryObjectStore,
        age: ChronoDuration,
    ) -> ArtifactId {
        let id = ArtifactId::generate();
        cache.put(&id, b"artifact").unwrap();
        store.upload(&id, b"artifact").unwrap();
        index::insert_artifact(
            conn,
            &ArtifactRecord {
                id,
                owner_key: "owner-1".into(),
                created_at: Utc::now() - age,
            },
        )
        .unwrap();
        id
    }

    #[test]
    fn sweep_reclaims_only_records_past_the_window() {
        let (_dir, cache, store, conn) = fixture();
        let old = seed_artifact(&conn, &cache, &store, ChronoDuration::days(31));
        let fresh = seed_artifact(&conn, &cache, &store, ChronoDuration::days(29));

        let stats = sweep_once(&conn, &cache, &store, ChronoDuration::days(30)).unwrap();
        assert_eq!(
            stats,
            SweepStats {
                expired: 1,
                deleted: 1,
                failed: 0
            }
        );

        // The 31-day record is gone from all three tiers.
        assert!(!store.contains(&old));
        assert!(cache.get(&old).unwrap().is_none());
        assert!(index::find_artifact(&conn, &old).unwrap().is_none());

        // The 29-day record is untouched everywhere.
        assert!(store.contains(&fresh));
        assert!(cache.get(&fresh).unwrap().is_some());
        assert!(index::find_artifact(&conn, &fresh).unwrap().is_some());
    }

    #[test]
    fn sweep_with_nothing_expired_is_a_no_op() {
        let (_dir, cache, store, conn) = fixture();
        seed_artifact(&conn, &cache, &store, ChronoDuration::hours(2));

        let stats = sweep_once(&conn, &cache, &store, ChronoDuration::days(30)).unwrap();
        assert_eq!(stats, SweepStats::default());
    }

    #[test]
    fn sweep_handles_missing_cache_entry() {
        let (_dir, cache, store, conn) = fixture();
        let id = seed_artifact(&conn, &cache, &store, ChronoDuration::days(40));
        // Cache entry evicted out of band; delete is idempotent.
        cache.delete(&id).unwrap();

        let stats = sweep_once(&conn, &cache, &store, ChronoDuration::days(30)).unwrap();
        assert_eq!(stats.deleted, 1);
        assert!(index::find_artifact(&conn, &id).unwrap().is_none());
    }

    #[test]
    fn store_failure_skips_record_and_keeps_metadata_for_retry() {
        let (_dir, cache, store, conn) = fixture();
        let id = seed_artifact(&conn, &cache, &store, ChronoDuration::days(40));
        store.set_unavailable(true);

        let stats = sweep_once(&conn, &cache, &store, ChronoDuration::days(30)).unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.deleted, 0);
        // Row survives, so the next cycle retries the same record.
        assert!(index::find_artifact(&conn, &id).unwrap().is_some());

        store.set_unavailable(false);
        let stats = sweep_once(&conn, &cache, &store, ChronoDuration::days(30)).unwrap();
        assert_eq!(stats.deleted, 1);
        assert!(index::find_artifact(&conn, &id).unwrap().is_none());
    }

    #[test]
    fn sweep_is_idempotent_across_cycles() {
        let (_dir, cache, store, conn) = fixture();
        seed_artifact(&conn, &cache, &store, ChronoDuration::days(40));

        let first = sweep_once(&conn, &cache, &store, ChronoDuration::days(30)).unwrap();
        assert_eq!(first.deleted, 1);

        let second = sweep_once(&conn, &cache, &store, ChronoDuration::days(30)).unwrap();
        assert_eq!(second, SweepStats::default());
    }

    #[test]
    fn guard_skips_when_sweep_in_flight() {
        let guard = Arc::new(SweepGuard::new());

        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let holder = {
            let guard = guard.clone();
            std::thread::spawn(move || {
                guard.try_run(|| {
                    started_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                })
            })
        };

        started_rx.recv().unwrap();
        // A second trigger while the first runs is skipped, not queued.
        assert!(guard.try_run(|| ()).is_none());

        release_tx.send(()).unwrap();
        assert!(holder.join().unwrap().is_some());

        // Once released, triggers run again.
        assert!(guard.try_run(|| ()).is_some());
    }

    #[test]
    fn dev_mode_disables_the_sweeper() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            dev_mode: true,
            ..Config::default()
        };
        let cache = ArtifactCache::new(config.cache_dir()).unwrap();

        let handle = start_sweeper(&config, cache, Arc::new(MemoryObjectStore::new()));
        assert!(handle.is_none());
    }

    #[test]
    fn sweeper_thread_starts_and_shuts_down() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            sweep_interval: Duration::from_secs(3600),
            ..Config::default()
        };
        index::open_index(&config.index_path()).unwrap();
        let cache = ArtifactCache::new(config.cache_dir()).unwrap();

        let handle = start_sweeper(&config, cache, Arc::new(MemoryObjectStore::new())).unwrap();
        handle.shutdown();
        drop(handle); // joins the thread; must not hang
    }

    #[test]
    fn trigger_sweep_runs_a_full_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("index.db");
        let conn = index::open_index(&db_path).unwrap();
        let cache = ArtifactCache::new(dir.path().join("cache")).unwrap();
        let store = MemoryObjectStore::new();
        seed_artifact(&conn, &cache, &store, ChronoDuration::days(40));
        drop(conn);

        let guard = SweepGuard::new();
        let stats = trigger_sweep(&guard, &db_path, &cache, &store, ChronoDuration::days(30))
            .unwrap()
            .unwrap();
        assert_eq!(stats.deleted, 1);
    }
}
