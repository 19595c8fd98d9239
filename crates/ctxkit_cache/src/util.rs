//! Time and filesystem helpers shared by the store and the eviction pass.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::NamedTempFile;

use crate::CacheError;

/// Milliseconds since the unix epoch, or 0 if the clock is set before 1970.
pub(crate) fn now_millis() -> u64 {
    system_time_millis(SystemTime::now())
}

pub(crate) fn system_time_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub(crate) fn system_time_nanos(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Writes `bytes` to `path` through a temp file in the same directory, so a
/// reader sees either the previous file or the complete new one.
pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| CacheError::io(parent, e))?;
    tmp.write_all(bytes).map_err(|e| CacheError::io(parent, e))?;
    tmp.persist(path).map_err(|e| CacheError::io(path, e.error))?;
    Ok(())
}

/// Removes a file, treating "already gone" as success.
pub(crate) fn remove_if_exists(path: &Path) -> std::io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}
