//! # ctxkit_core
//!
//! Project scanning for ctxkit.
//!
//! This crate provides:
//! - Project snapshots (size and modification time of every tracked file)
//! - Snapshot differencing into changed and deleted paths
//! - The default ignore filter and facts extractor
//! - `ProjectScanner`, which assembles a [`ContextBundle`] and re-derives
//!   only what changed since the previous scan
//!
//! ## Example
//!
//! ```rust,ignore
//! use ctxkit_cache::CacheManager;
//! use ctxkit_core::{DefaultIgnore, OutlineExtractor, ProjectScanner};
//!
//! let cache = CacheManager::with_dir(".cache")?;
//! let filter = DefaultIgnore::load(root, ".ctxkit-ignore")?;
//! let scanner = ProjectScanner::new(Some(&cache), filter, OutlineExtractor::default());
//!
//! let outcome = scanner.scan_incremental(root)?;
//! println!("{} files, incremental: {}", outcome.bundle.len(), outcome.incremental);
//! ```

mod config;
mod error;
pub mod extractor;
pub mod ignore;
mod scanner;
pub mod snapshot;

pub use config::{CONFIG_FILE_NAME, ProjectConfig, ScanConfig};
pub use error::ScanError;
pub use extractor::{FactsExtractor, OutlineExtractor};
pub use ignore::{DefaultIgnore, IgnoreFilter};
pub use scanner::{ProjectScanner, ScanOutcome};
pub use snapshot::{SnapshotDiff, diff_snapshots, take_snapshot};

pub use ctxkit_cache::{ContextBundle, FileData, FileSnapshot, ProjectSnapshot};
