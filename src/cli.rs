//! Command-line interface parsing for reelcache
//!
//! This module handles parsing of CLI arguments using clap, including the
//! human-friendly duration syntax accepted by `--ttl` and `--timeout`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::config::{CacheConfig, FetchOptions};

/// Error types for CLI argument parsing
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    /// The duration string could not be parsed
    #[error("Invalid duration: '{0}'. Use a whole number followed by ms, s, m or h (e.g. 1500ms, 30s, 2h)")]
    InvalidDuration(String),
}

/// reelcache - stale-while-revalidate cache for upstream JSON APIs
#[derive(Parser, Debug)]
#[command(name = "reelcache")]
#[command(about = "Fetch upstream JSON through a persistent stale-while-revalidate cache")]
#[command(version)]
pub struct Cli {
    /// Snapshot file to warm-start from and persist to
    ///
    /// Defaults to the platform cache directory (e.g. ~/.cache/reelcache/api_cache.json).
    #[arg(long, global = true, value_name = "PATH", env = "REELCACHE_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a URL through the cache and print the JSON payload
    ///
    /// Examples:
    ///   reelcache fetch https://api.example/the-loai
    ///   reelcache fetch https://api.example/phim/abc --ttl 30m --timeout 2500ms
    Fetch {
        /// Upstream URL; also the cache key
        url: String,

        /// Age after which the cached copy is revalidated
        #[arg(long, value_name = "DURATION", default_value = "10m", value_parser = parse_duration_arg)]
        ttl: Duration,

        /// Upper bound on the upstream request
        #[arg(long, value_name = "DURATION", default_value = "3s", value_parser = parse_duration_arg)]
        timeout: Duration,
    },

    /// List the entries stored in the snapshot file
    Inspect,
}

/// Parses a duration such as `1500ms`, `30s`, `10m` or `2h`.
///
/// # Arguments
/// * `s` - The duration string from the CLI
///
/// # Returns
/// * `Ok(Duration)` if the string has a whole number and a known unit
/// * `Err(CliError::InvalidDuration)` otherwise
pub fn parse_duration_arg(s: &str) -> Result<Duration, CliError> {
    let invalid = || CliError::InvalidDuration(s.to_string());
    let trimmed = s.trim();

    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (digits, unit) = trimmed.split_at(split);
    let amount: u64 = digits.parse().map_err(|_| invalid())?;

    match unit {
        "ms" => Ok(Duration::from_millis(amount)),
        "s" => Ok(Duration::from_secs(amount)),
        "m" => amount.checked_mul(60).map(Duration::from_secs).ok_or_else(invalid),
        "h" => amount.checked_mul(3600).map(Duration::from_secs).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

impl Cli {
    /// Cache configuration derived from the arguments
    pub fn cache_config(&self) -> CacheConfig {
        match &self.snapshot {
            Some(path) => CacheConfig::default().with_snapshot_path(path.clone()),
            None => CacheConfig::default(),
        }
    }

    /// Fetch options for the `fetch` subcommand, if that is the one given
    pub fn fetch_options(&self) -> Option<FetchOptions> {
        match &self.command {
            Command::Fetch { ttl, timeout, .. } => {
                Some(FetchOptions::new().with_ttl(*ttl).with_timeout(*timeout))
            }
            Command::Inspect => None,
        }
    }
}
