//! In-memory map from request key to cached entry

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use super::entry::CacheEntry;

/// Shared, cloneable handle to the live entries
///
/// Clones share the same map. No lock is held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct CacheStore {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.read().get(key).cloned()
    }

    /// Inserts or replaces the entry for `key`
    pub fn insert(&self, key: String, entry: CacheEntry) {
        self.write().insert(key, entry);
    }

    /// Bulk insert, used to seed the store from a snapshot
    pub fn extend(&self, entries: impl IntoIterator<Item = (String, CacheEntry)>) {
        self.write().extend(entries);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Removes every entry older than `max_age`, returning how many were removed
    pub fn evict_older_than(&self, max_age: Duration) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.age() <= max_age);
        before - entries.len()
    }

    /// Copies out every entry no older than `retention`
    pub fn entries_within(&self, retention: Duration) -> Vec<(String, CacheEntry)> {
        self.read()
            .iter()
            .filter(|(_, entry)| entry.age() <= retention)
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }
}
