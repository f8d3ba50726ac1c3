//! Background persistence and eviction sweeps
//!
//! A single tokio task owns both timers. It stops when `shutdown` is called or when
//! the last cache handle is dropped, which closes the shutdown channel.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::error::SnapshotError;

use super::snapshot;
use super::store::CacheStore;

/// Shortest period a sweep timer runs at; `tokio::time::interval` rejects zero
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Intervals and windows the sweeps run with
#[derive(Debug, Clone)]
struct SweepPolicy {
    snapshot_path: Option<PathBuf>,
    persist_interval: Duration,
    retention: Duration,
    eviction_interval: Duration,
    max_age: Duration,
}

impl From<&CacheConfig> for SweepPolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            snapshot_path: config.snapshot_path.clone(),
            persist_interval: config.persist_interval.max(MIN_SWEEP_INTERVAL),
            retention: config.retention,
            eviction_interval: config.eviction_interval.max(MIN_SWEEP_INTERVAL),
            max_age: config.max_age,
        }
    }
}

/// Handle for stopping the housekeeping task
#[derive(Debug)]
pub struct HousekeepingHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl HousekeepingHandle {
    /// Spawns the sweep task for `store`
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(store: CacheStore, config: &CacheConfig) -> Self {
        let policy = SweepPolicy::from(config);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            let mut persist_tick = tokio::time::interval(policy.persist_interval);
            let mut evict_tick = tokio::time::interval(policy.eviction_interval);
            // Skip the first ticks (immediate)
            persist_tick.tick().await;
            evict_tick.tick().await;

            loop {
                tokio::select! {
                    _ = persist_tick.tick(), if policy.snapshot_path.is_some() => {
                        if let Some(path) = &policy.snapshot_path {
                            if let Err(err) = persist_snapshot(&store, path, policy.retention).await {
                                warn!(path = %path.display(), error = %err, "Persistence sweep failed");
                            }
                        }
                    }
                    _ = evict_tick.tick() => {
                        let removed = store.evict_older_than(policy.max_age);
                        debug!(removed, remaining = store.len(), "Eviction sweep finished");
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self { shutdown_tx, task }
    }

    /// Stops the sweeps and waits for the task to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(err) = self.task.await {
            warn!(error = %err, "Housekeeping task did not exit cleanly");
        }
    }
}

/// Writes every entry no older than `retention` to the snapshot at `path`
///
/// Returns the number of entries written.
pub async fn persist_snapshot(
    store: &CacheStore,
    path: &Path,
    retention: Duration,
) -> Result<usize, SnapshotError> {
    let entries = store.entries_within(retention);
    snapshot::save(path, &entries).await?;
    debug!(path = %path.display(), written = entries.len(), "Snapshot written");
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::CacheEntry;
    use chrono::Utc;
    use serde_json::json;
    use tempfile::TempDir;

    fn aged(hours: i64) -> CacheEntry {
        CacheEntry::fetched_at(json!({"h": hours}), Utc::now() - chrono::Duration::hours(hours))
    }

    fn fast_config(path: PathBuf) -> CacheConfig {
        CacheConfig::default()
            .with_snapshot_path(path)
            .with_persist_interval(Duration::from_millis(20))
            .with_eviction_interval(Duration::from_millis(20))
    }

    #[tokio::test]
    async fn test_persist_snapshot_drops_entries_past_retention() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("snapshot.json");
        let store = CacheStore::new();
        store.insert("recent".to_string(), aged(1));
        store.insert("ancient".to_string(), aged(25));

        let written = persist_snapshot(&store, &path, Duration::from_secs(24 * 60 * 60))
            .await
            .expect("Persist should succeed");

        assert_eq!(written, 1);
        let loaded = snapshot::load(&path).await.expect("Load should succeed");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].0, "recent");
    }

    #[tokio::test]
    async fn test_sweeps_run_periodically() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("snapshot.json");
        let store = CacheStore::new();
        store.insert("fresh".to_string(), CacheEntry::new(json!(1)));
        store.insert("expired".to_string(), aged(3));

        let handle = HousekeepingHandle::spawn(store.clone(), &fast_config(path.clone()));
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.shutdown().await;

        assert!(store.get("expired").is_none(), "Eviction sweep should remove old entry");
        assert!(store.get("fresh").is_some());
        let loaded = snapshot::load(&path).await.expect("Load should succeed");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].0, "fresh");
    }

    #[tokio::test]
    async fn test_persistence_disabled_without_path() {
        let store = CacheStore::new();
        store.insert("k".to_string(), CacheEntry::new(json!(1)));
        let config = CacheConfig::default()
            .without_persistence()
            .with_persist_interval(Duration::from_millis(10))
            .with_eviction_interval(Duration::from_millis(10));

        let handle = HousekeepingHandle::spawn(store.clone(), &config);
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.shutdown().await;

        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_persist_failure_is_swallowed() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        // A directory where the snapshot file should be makes every write fail
        let path = temp_dir.path().join("occupied");
        std::fs::create_dir_all(path.join("child")).expect("Should create directory");
        let store = CacheStore::new();
        store.insert("k".to_string(), CacheEntry::new(json!(1)));

        let handle = HousekeepingHandle::spawn(store.clone(), &fast_config(path.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.shutdown().await;

        assert!(path.is_dir());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_intervals_still_sweep() {
        let store = CacheStore::new();
        store.insert("fresh".to_string(), CacheEntry::new(json!(1)));
        store.insert("expired".to_string(), aged(3));
        let config = CacheConfig::default()
            .without_persistence()
            .with_persist_interval(Duration::ZERO)
            .with_eviction_interval(Duration::ZERO);

        let handle = HousekeepingHandle::spawn(store.clone(), &config);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.task.is_finished(), "Sweep task should still be running");
        handle.shutdown().await;

        assert!(store.get("expired").is_none(), "Eviction sweep should remove old entry");
        assert!(store.get("fresh").is_some());
    }
}
