//! # ctxkit_cache
//!
//! Persistent cache for project context.
//!
//! This crate keeps derived project data on disk so that repeated requests
//! against the same project only pay for what actually changed.
//!
//! ## Cache Strategy
//!
//! 1. **One file per entry**: each entry lives in `<blake3(identity)>.cache`
//!    inside the cache directory; the directory listing is the index.
//! 2. **Self-invalidating reads**: file-backed entries record the size and
//!    modification time of their source and are dropped as soon as either
//!    changes.
//! 3. **Bounded growth**: an eviction pass trims entries by age, total size
//!    and count, oldest first.
//!
//! ## Storage
//!
//! Entries are encoded with `rkyv`, which validates the archive on read so a
//! corrupt file degrades to a miss instead of a panic.

mod cleanup;
mod config;
mod entry;
mod error;
mod key;
mod manager;
mod stats;
mod store;
mod util;

pub use cleanup::{CleanupHandle, CleanupOptions, CleanupPlan, CleanupReport, plan_cleanup};
pub use config::{CacheConfig, CleanupSettings, age_limit, size_limit};
pub use entry::{
    CacheEntry, CacheValue, ContextBundle, EntryKind, FileData, FileSnapshot, ProjectSnapshot,
    SourceStamp,
};
pub use error::CacheError;
pub use key::{CacheKey, Identity};
pub use manager::{CacheManager, DERIVED_FACTS_SUFFIX, bundle_key, snapshot_key};
pub use stats::{
    CacheReport, CacheStats, DetailedStats, Efficiency, HitRating, KindCounts, PerformanceStats,
    StorageRating,
};
pub use store::{ENTRY_EXTENSION, EntryStore, StoredEntry};
