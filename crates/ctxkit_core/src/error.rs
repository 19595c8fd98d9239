//! Scan error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while scanning a project.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Directory walk failed.
    #[error("Failed to walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// File I/O error.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid ignore pattern.
    #[error("Invalid ignore pattern: {0}")]
    Pattern(String),

    /// Cache error.
    #[error("Cache error: {0}")]
    Cache(#[from] ctxkit_cache::CacheError),
}

impl ScanError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an I/O error tied to a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
