//! Durable snapshot of the cache
//!
//! The snapshot is a single JSON file holding an array of `[key, {data, timestamp}]`
//! pairs. It is read once when the cache opens and overwritten wholesale by each
//! persistence sweep.

use std::io::{self, ErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::SnapshotError;

use super::entry::CacheEntry;

/// Reads the snapshot at `path`
///
/// A missing file is an empty snapshot. A file that exists but cannot be read or
/// parsed is an error.
pub async fn load(path: &Path) -> Result<Vec<(String, CacheEntry)>, SnapshotError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    Ok(serde_json::from_slice(&bytes)?)
}

/// Overwrites the snapshot at `path` with `entries`
///
/// Creates the parent directory if needed. Each write stages into its own
/// uniquely named file beside the target and renames it into place, so readers
/// never see a half-written snapshot and concurrent writers never share a
/// staging file.
pub async fn save(path: &Path, entries: &[(String, CacheEntry)]) -> Result<(), SnapshotError> {
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent.to_path_buf(),
        None => Path::new(".").to_path_buf(),
    };
    tokio::fs::create_dir_all(&dir).await?;

    let json = serde_json::to_vec(entries)?;
    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<(), SnapshotError> {
        let mut staging = NamedTempFile::new_in(&dir)?;
        staging.write_all(&json)?;
        staging.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| SnapshotError::Io(io::Error::new(ErrorKind::Other, e)))?
}
