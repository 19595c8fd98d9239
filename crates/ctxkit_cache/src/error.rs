//! Cache error types.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur in the cache system.
///
/// Only write-side operations surface these. Read-side failures are turned
/// into misses before they reach a caller.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache directory could not be created.
    #[error("Failed to create cache directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source file backing an entry could not be stat'd.
    #[error("Failed to stat {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error on a cache file.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cache entry is corrupted.
    #[error("Corrupted cache entry: {0}")]
    Corrupted(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid cache configuration.
    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),

    /// Background cleanup could not be started or did not finish.
    #[error("Background cleanup failed: {0}")]
    BackgroundTask(String),
}

impl CacheError {
    /// Creates an I/O error tied to a path.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Creates a stat error tied to a source path.
    pub fn stat(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Stat {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Creates a corrupted cache error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}
