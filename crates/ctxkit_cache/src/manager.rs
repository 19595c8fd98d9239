//! Cache manager: typed accessors over the entry store.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::CacheError;
use crate::cleanup::{CleanupHandle, CleanupOptions, CleanupReport};
use crate::config::CacheConfig;
use crate::entry::{CacheValue, ContextBundle, ProjectSnapshot};
use crate::key::Identity;
use crate::stats::{
    CacheReport, CacheStats, DetailedStats, Efficiency, PerformanceCounters, PerformanceStats,
};
use crate::store::EntryStore;
use crate::util::now_millis;

/// Suffix that separates a file's derived facts from its raw content.
pub const DERIVED_FACTS_SUFFIX: &str = ".facts";

/// Logical key of the whole-project bundle for `root`.
pub fn bundle_key(root: &str) -> String {
    format!("{}_project_scan", root)
}

/// Logical key of the project snapshot for `root`.
pub fn snapshot_key(root: &str) -> String {
    format!("{}_snapshot", root)
}

/// Manages the four logical caches kept in one entry store.
///
/// Lookups never fail: every read returns `Some` on a hit and `None` on a
/// miss, and is counted as one or the other. Writes report errors so callers
/// can decide whether to continue uncached.
pub struct CacheManager {
    store: Arc<EntryStore>,
    /// Separate from the store lock; touched on every lookup.
    counters: Mutex<PerformanceCounters>,
    startup_cleanup: Option<CleanupHandle>,
}

impl CacheManager {
    /// Opens the cache described by `config`.
    ///
    /// When `auto_cleanup` is set, one eviction pass is started in the
    /// background with the configured limits; see [`Self::take_startup_cleanup`].
    pub fn open(config: &CacheConfig) -> Result<Self, CacheError> {
        let mut manager = Self::with_dir(&config.cache_dir)?;
        if config.auto_cleanup {
            let handle = manager.spawn_cleanup(config.cleanup.to_options()?)?;
            manager.startup_cleanup = Some(handle);
        }
        info!("Cache enabled at {}", manager.store.dir().display());
        Ok(manager)
    }

    /// Opens a cache at `dir` without a startup cleanup pass.
    pub fn with_dir(dir: impl AsRef<Path>) -> Result<Self, CacheError> {
        let store = EntryStore::open(dir.as_ref())?;
        Ok(Self {
            store: Arc::new(store),
            counters: Mutex::new(PerformanceCounters::new()),
            startup_cleanup: None,
        })
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    pub fn cache_dir(&self) -> &Path {
        self.store.dir()
    }

    /// Takes the handle of the startup cleanup pass, if one was started.
    ///
    /// Join it before exiting so the pass isn't cut short.
    pub fn take_startup_cleanup(&mut self) -> Option<CleanupHandle> {
        self.startup_cleanup.take()
    }

    /// Gets the cached content of a file.
    pub fn get_file_content(&self, path: &Path) -> Option<Vec<u8>> {
        let found = match self.store.get(&Identity::file(path)) {
            Some(CacheValue::FileContent(content)) => Some(content),
            _ => None,
        };
        self.record(found.is_some());
        found
    }

    /// Stores the content of a file.
    pub fn set_file_content(&self, path: &Path, content: &[u8]) -> Result<(), CacheError> {
        self.store
            .set(&Identity::file(path), CacheValue::FileContent(content.to_vec()))
    }

    /// Gets the derived facts of a file.
    pub fn get_derived_facts(&self, path: &Path) -> Option<Vec<String>> {
        let identity = Identity::derived(path, DERIVED_FACTS_SUFFIX);
        let found = match self.store.get(&identity) {
            Some(CacheValue::DerivedFacts(facts)) => Some(facts),
            _ => None,
        };
        self.record(found.is_some());
        found
    }

    /// Stores the derived facts of a file.
    pub fn set_derived_facts(&self, path: &Path, facts: &[String]) -> Result<(), CacheError> {
        let identity = Identity::derived(path, DERIVED_FACTS_SUFFIX);
        self.store
            .set(&identity, CacheValue::DerivedFacts(facts.to_vec()))
    }

    /// Gets a whole-project bundle by logical key (see [`bundle_key`]).
    pub fn get_bundle(&self, key: &str) -> Option<ContextBundle> {
        let found = match self.store.get(&Identity::logical(key)) {
            Some(CacheValue::Bundle(bundle)) => Some(bundle),
            _ => None,
        };
        self.record(found.is_some());
        found
    }

    /// Stores a whole-project bundle.
    pub fn set_bundle(&self, key: &str, bundle: &ContextBundle) -> Result<(), CacheError> {
        self.store
            .set(&Identity::logical(key), CacheValue::Bundle(bundle.clone()))
    }

    /// Gets a project snapshot by logical key (see [`snapshot_key`]).
    pub fn get_snapshot(&self, key: &str) -> Option<ProjectSnapshot> {
        let found = match self.store.get(&Identity::logical(key)) {
            Some(CacheValue::Snapshot(snapshot)) => Some(snapshot),
            _ => None,
        };
        self.record(found.is_some());
        found
    }

    /// Replaces the project snapshot stored under `key`.
    pub fn set_snapshot(&self, key: &str, snapshot: &ProjectSnapshot) -> Result<(), CacheError> {
        self.store
            .set(&Identity::logical(key), CacheValue::Snapshot(snapshot.clone()))
    }

    /// Drops both the content and derived-facts entries of a file.
    pub fn invalidate_file(&self, path: &Path) -> Result<(), CacheError> {
        self.store.delete(&Identity::file(path))?;
        self.store
            .delete(&Identity::derived(path, DERIVED_FACTS_SUFFIX))
    }

    /// Removes every entry. Returns how many were removed.
    pub fn clear_all(&self) -> Result<usize, CacheError> {
        self.store.clear_all()
    }

    /// Runs an eviction pass on the calling thread.
    pub fn cleanup(&self, options: &CleanupOptions) -> Result<CleanupReport, CacheError> {
        self.store.cleanup(options)
    }

    /// Runs an eviction pass on a background thread.
    pub fn spawn_cleanup(&self, options: CleanupOptions) -> Result<CleanupHandle, CacheError> {
        debug!("Spawning background cache cleanup: {:?}", options);
        CleanupHandle::spawn(Arc::clone(&self.store), options)
    }

    /// Current hit/miss counters.
    pub fn performance(&self) -> PerformanceStats {
        self.counters.lock().snapshot()
    }

    /// Resets the hit/miss counters.
    pub fn reset_performance(&self) {
        self.counters.lock().reset();
    }

    /// Entry count, size, hit rate and per-kind counts.
    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        let entries = self.store.list()?;
        Ok(CacheStats::collect(
            self.store.dir().to_path_buf(),
            &entries,
            &self.performance(),
        ))
    }

    /// [`Self::stats`] plus the age range of stored entries.
    pub fn detailed_stats(&self) -> Result<DetailedStats, CacheError> {
        let entries = self.store.list()?;
        Ok(DetailedStats::collect(
            self.store.dir().to_path_buf(),
            &entries,
            &self.performance(),
        ))
    }

    /// Combined performance, storage and efficiency report.
    pub fn report(&self) -> Result<CacheReport, CacheError> {
        let performance = self.performance();
        let storage = self.detailed_stats()?;
        let efficiency = Efficiency::rate(&storage, &performance);
        Ok(CacheReport {
            performance,
            storage,
            efficiency,
            generated_at_ms: now_millis(),
        })
    }

    fn record(&self, hit: bool) {
        self.counters.lock().record(hit);
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("cache_dir", &self.store.dir())
            .field("startup_cleanup", &self.startup_cleanup.is_some())
            .finish()
    }
}
