//! Project configuration.

use std::fs;
use std::path::{Path, PathBuf};

use ctxkit_cache::CacheConfig;
use serde::{Deserialize, Serialize};

use crate::ScanError;

/// Default name of the config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".ctxkit.json";

/// Scan configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    /// Files larger than this (bytes) are not tracked.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Name of the per-project ignore file, relative to the scan root.
    #[serde(default = "default_ignore_file")]
    pub ignore_file: String,

    /// Directories never descended into, regardless of the ignore filter.
    #[serde(skip)]
    pub exclude_dirs: Vec<PathBuf>,
}

fn default_max_file_size() -> u64 {
    100 * 1024
}

fn default_ignore_file() -> String {
    ".ctxkit-ignore".to_string()
}

impl ScanConfig {
    pub fn new() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            ignore_file: default_ignore_file(),
            exclude_dirs: Vec::new(),
        }
    }

    /// Adds a directory that is never scanned.
    pub fn exclude_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.exclude_dirs.push(dir.into());
        self
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Top-level configuration file: `{ "cache": {...}, "scan": {...} }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub scan: ScanConfig,
}

impl ProjectConfig {
    /// Loads configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ScanError::config(format!("Failed to read config: {}", e)))?;
        Self::from_json(&content)
    }

    /// Parses configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ScanError> {
        serde_json::from_str(json).map_err(|e| ScanError::config(format!("Invalid config: {}", e)))
    }

    /// Loads `path` if given, else `.ctxkit.json` in `base_dir` if it exists,
    /// else the defaults.
    pub fn discover(path: Option<&Path>, base_dir: &Path) -> Result<Self, ScanError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let candidate = base_dir.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    Self::from_file(candidate)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scan_config_defaults() {
        let config = ScanConfig::new();
        assert_eq!(config.max_file_size, 100 * 1024);
        assert_eq!(config.ignore_file, ".ctxkit-ignore");
        assert!(config.exclude_dirs.is_empty());
    }

    #[test]
    fn test_project_config_from_json() {
        let json = r#"{
            "cache": { "cache_dir": "/tmp/ctx-cache", "auto_cleanup": false },
            "scan": { "max_file_size": 2048 }
        }"#;

        let config = ProjectConfig::from_json(json).unwrap();
        assert_eq!(config.cache.cache_dir, PathBuf::from("/tmp/ctx-cache"));
        assert!(!config.cache.auto_cleanup);
        assert_eq!(config.scan.max_file_size, 2048);
        assert_eq!(config.scan.ignore_file, ".ctxkit-ignore");
    }

    #[test]
    fn test_project_config_rejects_unknown_sections() {
        let err = ProjectConfig::from_json(r#"{ "caches": {} }"#).unwrap_err();
        assert!(err.to_string().contains("Invalid config"));
    }

    #[test]
    fn test_discover_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::discover(None, dir.path()).unwrap();
        assert_eq!(config, ProjectConfig::default());
    }

    #[test]
    fn test_discover_reads_default_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{ "scan": { "ignore_file": ".myignore" } }"#,
        )
        .unwrap();

        let config = ProjectConfig::discover(None, dir.path()).unwrap();
        assert_eq!(config.scan.ignore_file, ".myignore");
    }

    #[test]
    fn test_discover_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ProjectConfig::discover(Some(&dir.path().join("nope.json")), dir.path());
        assert!(matches!(result, Err(ScanError::Config(_))));
    }
}
