//! Stale-while-revalidate cache in front of upstream JSON APIs
//!
//! `ResponseCache` is a cloneable handle. Clones share the store, the in-flight
//! request table and the housekeeping task.

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::config::{CacheConfig, FetchOptions};
use crate::error::{CacheError, FetchError, SnapshotError};

use super::entry::CacheEntry;
use super::housekeeping::{self, HousekeepingHandle};
use super::snapshot;
use super::store::CacheStore;
use super::upstream::UpstreamClient;

/// One upstream request whose result every waiting caller receives
type SharedFetch = Shared<BoxFuture<'static, Result<Value, FetchError>>>;

type InFlight = Mutex<HashMap<String, SharedFetch>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read-through, stale-tolerant cache for upstream API responses
///
/// | State | Result |
/// |---|---|
/// | miss | fetch upstream, store on success, return data or the error |
/// | fresh hit | cached data, no network |
/// | stale hit | cached data immediately, revalidate in the background |
///
/// Concurrent requests for the same key share one upstream call.
#[derive(Clone)]
pub struct ResponseCache {
    store: CacheStore,
    upstream: UpstreamClient,
    in_flight: Arc<InFlight>,
    config: Arc<CacheConfig>,
    housekeeping: Arc<Mutex<Option<HousekeepingHandle>>>,
}

impl fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.store.len())
            .field("in_flight", &lock(&self.in_flight).len())
            .field("config", &self.config)
            .finish()
    }
}

impl ResponseCache {
    /// Opens a cache, seeding it from the snapshot and starting housekeeping
    ///
    /// A missing or unreadable snapshot leaves the cache empty. Fails only if the
    /// HTTP client cannot be built. Must be called from within a tokio runtime.
    pub async fn open(config: CacheConfig) -> Result<Self, CacheError> {
        let upstream = UpstreamClient::new(&config.user_agent)?;
        let store = CacheStore::new();

        if let Some(path) = &config.snapshot_path {
            match snapshot::load(path).await {
                Ok(entries) => {
                    let count = entries.len();
                    store.extend(entries);
                    info!(path = %path.display(), entries = count, "Loaded cache snapshot");
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Ignoring unreadable cache snapshot");
                }
            }
        }

        let housekeeping = HousekeepingHandle::spawn(store.clone(), &config);

        Ok(Self {
            store,
            upstream,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            config: Arc::new(config),
            housekeeping: Arc::new(Mutex::new(Some(housekeeping))),
        })
    }

    /// Stops housekeeping, waits for in-flight requests and writes a final snapshot
    ///
    /// Pending fetches, including background revalidations, get up to
    /// `drain_timeout` to land in the store before it is written out. Safe to call
    /// more than once. A failed final write is logged, not returned.
    pub async fn close(&self) {
        let handle = lock(&self.housekeeping).take();
        if let Some(handle) = handle {
            handle.shutdown().await;
            self.drain_in_flight().await;
            if let Err(err) = self.persist().await {
                warn!(error = %err, "Final snapshot write failed");
            }
        }
    }

    async fn drain_in_flight(&self) {
        let pending: Vec<SharedFetch> = lock(&self.in_flight).values().cloned().collect();
        if pending.is_empty() {
            return;
        }

        debug!(requests = pending.len(), "Waiting for in-flight requests");
        let drain = futures::future::join_all(pending);
        if tokio::time::timeout(self.config.drain_timeout, drain).await.is_err() {
            warn!(
                timeout_ms = u64::try_from(self.config.drain_timeout.as_millis()).unwrap_or(u64::MAX),
                "In-flight requests still running at close; their results will not be persisted"
            );
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the data for `key`, fetching it from upstream if needed
    ///
    /// Only a miss waits on the network and only a miss can fail. A stale hit
    /// returns immediately and leaves the refresh to a background task whose
    /// failure keeps the stale entry in place.
    pub async fn fetch(&self, key: &str, options: FetchOptions) -> Result<Value, FetchError> {
        if let Some(entry) = self.store.get(key) {
            if entry.is_stale(options.ttl) {
                let age_ms = u64::try_from(entry.age().as_millis()).unwrap_or(u64::MAX);
                debug!(key, age_ms, "Serving stale entry");
                self.revalidate(key, options.timeout);
            } else {
                trace!(key, "Fresh hit");
            }
            return Ok(entry.data);
        }

        debug!(key, "Cache miss");
        self.start_fetch(key, options.timeout).await
    }

    /// Like [`fetch`](Self::fetch), then deserializes the payload into `T`
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        key: &str,
        options: FetchOptions,
    ) -> Result<T, CacheError> {
        let value = self.fetch(key, options).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Returns the stored entry without touching the network
    pub fn peek(&self, key: &str) -> Option<CacheEntry> {
        self.store.get(key)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Runs one eviction sweep now, returning how many entries were removed
    pub fn evict_expired(&self) -> usize {
        self.store.evict_older_than(self.config.max_age)
    }

    /// Runs one persistence sweep now, returning how many entries were written
    ///
    /// Writes nothing when persistence is disabled.
    pub async fn persist(&self) -> Result<usize, SnapshotError> {
        match &self.config.snapshot_path {
            Some(path) => housekeeping::persist_snapshot(&self.store, path, self.config.retention).await,
            None => Ok(0),
        }
    }

    fn revalidate(&self, key: &str, timeout: Duration) {
        let fetch = self.start_fetch(key, timeout);
        let key = key.to_string();
        tokio::spawn(async move {
            if let Err(err) = fetch.await {
                warn!(key = %key, error = %err, "Background revalidation failed; keeping stale entry");
            }
        });
    }

    /// Joins the in-flight request for `key`, or starts one
    ///
    /// The request runs on its own task, so it completes and updates the store even
    /// if every caller waiting on it goes away.
    fn start_fetch(&self, key: &str, timeout: Duration) -> SharedFetch {
        let mut in_flight = lock(&self.in_flight);
        if let Some(existing) = in_flight.get(key) {
            trace!(key, "Joining in-flight request");
            return existing.clone();
        }

        let task = tokio::spawn(fetch_and_store(
            self.store.clone(),
            self.upstream.clone(),
            Arc::downgrade(&self.in_flight),
            key.to_string(),
            timeout,
        ));
        let url = key.to_string();
        let shared = async move {
            task.await.unwrap_or_else(|err| {
                Err(FetchError::Request {
                    url,
                    message: format!("fetch task failed: {err}"),
                })
            })
        }
        .boxed()
        .shared();

        in_flight.insert(key.to_string(), shared.clone());
        shared
    }
}

/// Fetches `key` from upstream and stores the result on success
///
/// The entry is written before the in-flight slot is released, so a caller that
/// misses the slot finds the entry instead.
async fn fetch_and_store(
    store: CacheStore,
    upstream: UpstreamClient,
    in_flight: Weak<InFlight>,
    key: String,
    timeout: Duration,
) -> Result<Value, FetchError> {
    let result = upstream.get_json(&key, timeout).await;

    match &result {
        Ok(data) => store.insert(key.clone(), CacheEntry::new(data.clone())),
        Err(err) => debug!(key = %key, error = %err, "Upstream fetch failed"),
    }

    if let Some(in_flight) = in_flight.upgrade() {
        lock(&in_flight).remove(&key);
    }

    result
}
