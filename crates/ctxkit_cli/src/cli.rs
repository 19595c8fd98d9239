//! CLI argument definitions

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// ctxkit - Incremental project context builder
#[derive(Parser)]
#[command(name = "ctxkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Cache directory (overrides the configuration file)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable caching
    #[arg(long, global = true)]
    pub no_cache: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a project and build its context bundle
    Scan {
        /// Project root (defaults to the current directory)
        root: Option<PathBuf>,

        /// Print the rendered bundle to stdout
        #[arg(long)]
        print: bool,
    },

    /// Show cache statistics
    Stats {
        /// Include age range and efficiency ratings
        #[arg(long)]
        detailed: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evict old entries from the cache
    Cleanup(CleanupArgs),

    /// Delete every cache entry
    ResetCache {
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,

        /// Show statistics instead of resetting
        #[arg(long)]
        stats: bool,
    },
}

/// Limits for `cleanup`. Unset limits fall back to the configuration file;
/// `0` disables a limit.
#[derive(Args)]
pub struct CleanupArgs {
    /// Remove entries older than this many days
    #[arg(long, value_name = "DAYS")]
    pub max_age_days: Option<u64>,

    /// Shrink the cache to at most this many MiB
    #[arg(long, value_name = "MB")]
    pub max_mb: Option<u64>,

    /// Keep at most this many entries
    #[arg(long, value_name = "N")]
    pub max_entries: Option<usize>,

    /// Show what would be removed without deleting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
