//! Configuration for the response cache
//!
//! `CacheConfig` holds the process-wide policies (snapshot location, sweep intervals,
//! retention windows). `FetchOptions` holds the per-call freshness policy.

use directories::ProjectDirs;
use std::path::PathBuf;
use std::time::Duration;

/// File name of the snapshot inside the cache directory
const SNAPSHOT_FILE_NAME: &str = "api_cache.json";

/// Default `User-Agent` sent on every upstream request
pub const DEFAULT_USER_AGENT: &str = concat!("reelcache/", env!("CARGO_PKG_VERSION"));

/// Process-wide cache policies
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Where the snapshot is persisted; `None` disables persistence and startup load
    pub snapshot_path: Option<PathBuf>,
    /// Interval between persistence sweeps
    pub persist_interval: Duration,
    /// Entries older than this are left out of the snapshot
    pub retention: Duration,
    /// Interval between eviction sweeps
    pub eviction_interval: Duration,
    /// Entries older than this are removed from the live store
    pub max_age: Duration,
    /// `User-Agent` header for upstream requests
    pub user_agent: String,
    /// How long `close` waits for in-flight requests before the final snapshot
    pub drain_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            snapshot_path: Self::default_snapshot_path(),
            persist_interval: Duration::from_secs(60),
            retention: Duration::from_secs(24 * 60 * 60), // 24 hours
            eviction_interval: Duration::from_secs(10 * 60), // 10 minutes
            max_age: Duration::from_secs(2 * 60 * 60),    // 2 hours
            user_agent: DEFAULT_USER_AGENT.to_string(),
            drain_timeout: Duration::from_secs(5),
        }
    }
}

impl CacheConfig {
    /// Returns the XDG-compliant snapshot location
    ///
    /// Uses `~/.cache/reelcache/api_cache.json` on Linux, or the platform equivalent.
    /// Returns `None` if no home directory can be determined.
    pub fn default_snapshot_path() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "reelcache")?;
        Some(project_dirs.cache_dir().join(SNAPSHOT_FILE_NAME))
    }

    /// Sets the snapshot location
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// Keeps the cache purely in memory
    pub fn without_persistence(mut self) -> Self {
        self.snapshot_path = None;
        self
    }

    pub fn with_persist_interval(mut self, interval: Duration) -> Self {
        self.persist_interval = interval;
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_eviction_interval(mut self, interval: Duration) -> Self {
        self.eviction_interval = interval;
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }
}

/// Per-call freshness policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Age after which a cached entry is served stale and revalidated
    pub ttl: Duration,
    /// Upper bound on a single upstream request
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_millis(600_000),
            timeout: Duration::from_millis(3_000),
        }
    }
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.persist_interval, Duration::from_secs(60));
        assert_eq!(config.retention, Duration::from_secs(86_400));
        assert_eq!(config.eviction_interval, Duration::from_secs(600));
        assert_eq!(config.max_age, Duration::from_secs(7_200));
        assert!(config.user_agent.starts_with("reelcache/"));
        assert_eq!(config.drain_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_default_snapshot_path_is_xdg_compliant() {
        if let Some(path) = CacheConfig::default_snapshot_path() {
            let path_str = path.to_string_lossy();
            assert!(path_str.contains("reelcache"), "Path should contain project name");
            assert!(path_str.ends_with(SNAPSHOT_FILE_NAME));
        }
        // Passes when there is no home directory (e.g. in CI)
    }

    #[test]
    fn test_cache_config_builders() {
        let config = CacheConfig::default()
            .with_snapshot_path("/tmp/snap.json")
            .with_persist_interval(Duration::from_secs(5))
            .with_retention(Duration::from_secs(50))
            .with_eviction_interval(Duration::from_secs(7))
            .with_max_age(Duration::from_secs(70))
            .with_user_agent("test-agent")
            .with_drain_timeout(Duration::from_millis(250));

        assert_eq!(config.snapshot_path, Some(PathBuf::from("/tmp/snap.json")));
        assert_eq!(config.persist_interval, Duration::from_secs(5));
        assert_eq!(config.retention, Duration::from_secs(50));
        assert_eq!(config.eviction_interval, Duration::from_secs(7));
        assert_eq!(config.max_age, Duration::from_secs(70));
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.drain_timeout, Duration::from_millis(250));

        assert!(config.without_persistence().snapshot_path.is_none());
    }

    #[test]
    fn test_fetch_options_default() {
        let options = FetchOptions::default();
        assert_eq!(options.ttl, Duration::from_secs(600));
        assert_eq!(options.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_fetch_options_builders() {
        let options = FetchOptions::new()
            .with_ttl(Duration::from_millis(1000))
            .with_timeout(Duration::from_millis(500));
        assert_eq!(options.ttl, Duration::from_millis(1000));
        assert_eq!(options.timeout, Duration::from_millis(500));
    }
}
