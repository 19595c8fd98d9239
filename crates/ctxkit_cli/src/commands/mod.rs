//! Subcommand implementations

pub mod cleanup;
pub mod reset;
pub mod scan;
pub mod stats;

use std::path::PathBuf;

use ctxkit_cache::{CacheConfig, CacheManager};
use ctxkit_core::ProjectConfig;
use miette::{IntoDiagnostic, Result};
use tracing::debug;

use crate::cli::Cli;

/// Settings shared by every subcommand.
pub struct Context {
    pub config: ProjectConfig,
    /// Cache directory after `--cache-dir` and relative-path resolution.
    pub cache_dir: PathBuf,
    /// False with `--no-cache` or `"enabled": false`.
    pub cache_enabled: bool,
}

impl Context {
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().into_diagnostic()?;
        let config = ProjectConfig::discover(cli.config.as_deref(), &cwd).into_diagnostic()?;

        let cache_dir = match &cli.cache_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => cwd.join(dir),
            None => config.cache.resolved_dir(&cwd),
        };
        let cache_enabled = config.cache.enabled && !cli.no_cache;
        debug!(
            "Cache directory {} (enabled: {})",
            cache_dir.display(),
            cache_enabled
        );

        Ok(Self {
            config,
            cache_dir,
            cache_enabled,
        })
    }

    /// Cache configuration with the resolved directory.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            cache_dir: self.cache_dir.clone(),
            ..self.config.cache.clone()
        }
    }

    /// Opens the cache for maintenance commands, without a startup cleanup.
    pub fn open_cache(&self) -> Result<CacheManager> {
        CacheManager::with_dir(&self.cache_dir).into_diagnostic()
    }
}

/// Formats a byte count as MiB with two decimals.
pub fn format_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}
