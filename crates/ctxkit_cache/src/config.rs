//! Cache configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cleanup::CleanupOptions;
use crate::CacheError;

/// Configuration for the cache manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Whether to enable caching.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Cache directory. Relative paths resolve against the working directory.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Whether to run one cleanup pass in the background on startup.
    #[serde(default = "default_enabled")]
    pub auto_cleanup: bool,

    /// Limits for the startup cleanup pass.
    #[serde(default)]
    pub cleanup: CleanupSettings,
}

/// Eviction limits in configuration units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleanupSettings {
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u64,

    #[serde(default = "default_max_total_mb")]
    pub max_total_mb: u64,

    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".cache")
}

fn default_max_age_days() -> u64 {
    7
}

fn default_max_total_mb() -> u64 {
    100
}

fn default_max_entries() -> usize {
    1000
}

impl Default for CleanupSettings {
    fn default() -> Self {
        Self {
            max_age_days: default_max_age_days(),
            max_total_mb: default_max_total_mb(),
            max_entries: default_max_entries(),
        }
    }
}

impl CleanupSettings {
    /// Converts to cleanup options. A zero limit disables that phase.
    pub fn to_options(&self) -> Result<CleanupOptions, CacheError> {
        Ok(CleanupOptions {
            max_age: age_limit(self.max_age_days)?,
            max_total_bytes: size_limit(self.max_total_mb)?,
            max_entry_count: (self.max_entries > 0).then_some(self.max_entries),
            dry_run: false,
        })
    }
}

/// Age limit for `days`; `None` when `days` is 0.
pub fn age_limit(days: u64) -> Result<Option<Duration>, CacheError> {
    if days == 0 {
        return Ok(None);
    }
    days.checked_mul(24 * 60 * 60)
        .map(|secs| Some(Duration::from_secs(secs)))
        .ok_or_else(|| CacheError::invalid_config(format!("max_age_days {} is too large", days)))
}

/// Size limit in bytes for `mb` MiB; `None` when `mb` is 0.
pub fn size_limit(mb: u64) -> Result<Option<u64>, CacheError> {
    if mb == 0 {
        return Ok(None);
    }
    mb.checked_mul(1024 * 1024)
        .map(Some)
        .ok_or_else(|| CacheError::invalid_config(format!("max_total_mb {} is too large", mb)))
}

impl CacheConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            enabled: default_enabled(),
            cache_dir: default_cache_dir(),
            auto_cleanup: default_enabled(),
            cleanup: CleanupSettings::default(),
        }
    }

    /// Default configuration rooted at `dir`.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: dir.into(),
            ..Self::new()
        }
    }

    /// Parses configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, CacheError> {
        serde_json::from_str(json)
            .map_err(|e| CacheError::invalid_config(format!("Invalid cache config: {}", e)))
    }

    /// Resolves `cache_dir` against `base` when it is relative.
    pub fn resolved_dir(&self, base: &Path) -> PathBuf {
        if self.cache_dir.is_absolute() {
            self.cache_dir.clone()
        } else {
            base.join(&self.cache_dir)
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new()
    }
}
