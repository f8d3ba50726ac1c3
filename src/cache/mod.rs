//! Response cache for upstream movie-catalog APIs
//!
//! This module provides a stale-while-revalidate cache keyed by request URL. Fresh
//! entries are served from memory, stale entries are served immediately while a
//! background task refreshes them, and misses go to the network. The live store is
//! snapshotted to a JSON file on an interval and seeded from it on open, so a
//! restarted process starts warm.

mod entry;
mod housekeeping;
mod manager;
mod snapshot;
mod store;
mod upstream;

pub use entry::CacheEntry;
pub use manager::ResponseCache;
pub use snapshot::load as load_snapshot;
