//! A single cached upstream response

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Cached payload plus the instant it was fetched
///
/// The timestamp is serialized as epoch milliseconds, which is the format the
/// snapshot file uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The upstream payload, opaque to the cache
    pub data: Value,
    /// When the payload was fetched
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates an entry stamped with the current time
    pub fn new(data: Value) -> Self {
        Self::fetched_at(data, Utc::now())
    }

    /// Creates an entry with an explicit fetch time
    pub fn fetched_at(data: Value, timestamp: DateTime<Utc>) -> Self {
        Self { data, timestamp }
    }

    /// Time elapsed since the entry was fetched
    ///
    /// Entries stamped in the future (clock skew after a restart) have zero age.
    pub fn age(&self) -> Duration {
        Utc::now()
            .signed_duration_since(self.timestamp)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Whether the entry has outlived `ttl`
    pub fn is_stale(&self, ttl: Duration) -> bool {
        self.age() > ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_entry_is_fresh() {
        let entry = CacheEntry::new(json!({"v": 1}));
        assert!(!entry.is_stale(Duration::from_secs(1)));
    }

    #[test]
    fn test_old_entry_is_stale() {
        let entry = CacheEntry::fetched_at(json!({"v": 1}), Utc::now() - chrono::Duration::seconds(5));
        assert!(entry.is_stale(Duration::from_secs(1)));
        assert!(!entry.is_stale(Duration::from_secs(60)));
        assert!(entry.age() >= Duration::from_secs(5));
    }

    #[test]
    fn test_future_timestamp_has_zero_age() {
        let entry = CacheEntry::fetched_at(json!(null), Utc::now() + chrono::Duration::hours(1));
        assert_eq!(entry.age(), Duration::ZERO);
    }

    #[test]
    fn test_timestamp_serializes_as_epoch_millis() {
        let timestamp = DateTime::from_timestamp_millis(1_700_000_000_123).expect("valid timestamp");
        let entry = CacheEntry::fetched_at(json!({"v": 1}), timestamp);

        let value = serde_json::to_value(&entry).expect("Should serialize");

        assert_eq!(value, json!({"data": {"v": 1}, "timestamp": 1_700_000_000_123_i64}));
    }
}
