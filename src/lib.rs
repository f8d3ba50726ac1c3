//! reelcache
//!
//! A stale-while-revalidate response cache for upstream movie-catalog APIs, with
//! periodic snapshot persistence and eviction, plus the catalog lookups built on it.

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;

pub use cache::{CacheEntry, ResponseCache};
pub use catalog::{CatalogError, CatalogSource, MovieCatalog};
pub use config::{CacheConfig, FetchOptions};
pub use error::{CacheError, FetchError, SnapshotError};
