//! Cache identities and the keys derived from them.

use std::fmt;
use std::path::{Path, PathBuf};

/// Deterministic key for a cache entry.
///
/// Lowercase hex BLAKE3 digest of the identity name. Equal names always
/// produce equal keys; the mapping is not reversible.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for an identity name.
    pub fn derive(name: &str) -> Self {
        Self(blake3::hash(name.as_bytes()).to_hex().to_string())
    }

    /// Returns the hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The logical identity an entry is stored under.
///
/// `name` determines the key. `source`, when present, is the file whose
/// size and modification time decide whether the entry is still valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    name: String,
    source: Option<PathBuf>,
}

impl Identity {
    /// Identity of a file, validated against that same file.
    pub fn file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self {
            name: path.to_string_lossy().into_owned(),
            source: Some(path.to_path_buf()),
        }
    }

    /// Identity of data derived from a file.
    ///
    /// The suffix keeps it apart from the file's own entry while staleness
    /// is still checked against the file.
    pub fn derived(path: impl AsRef<Path>, suffix: &str) -> Self {
        let path = path.as_ref();
        Self {
            name: format!("{}{}", path.to_string_lossy(), suffix),
            source: Some(path.to_path_buf()),
        }
    }

    /// Identity with no backing file. Never goes stale on its own.
    pub fn logical(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn key(&self) -> CacheKey {
        CacheKey::derive(&self.name)
    }
}
