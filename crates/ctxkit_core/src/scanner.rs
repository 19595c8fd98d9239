//! Project scanner: full and incremental bundle assembly.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use ctxkit_cache::{CacheManager, ContextBundle, ProjectSnapshot, bundle_key, snapshot_key};
use tracing::{debug, info, warn};

use crate::extractor::FactsExtractor;
use crate::ignore::IgnoreFilter;
use crate::snapshot::{SnapshotDiff, diff_snapshots, take_snapshot};
use crate::{ScanConfig, ScanError};

/// Result of [`ProjectScanner::scan_incremental`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome {
    pub bundle: ContextBundle,
    /// False when there was no earlier snapshot to compare against.
    pub incremental: bool,
    /// Differences from the earlier snapshot, when there was one.
    pub diff: Option<SnapshotDiff>,
}

/// Builds [`ContextBundle`]s for a project, reusing cached work where the
/// files behind it are unchanged.
///
/// Without a cache manager every lookup is a miss and every scan is a full,
/// non-incremental one.
pub struct ProjectScanner<'a, F, E> {
    cache: Option<&'a CacheManager>,
    filter: F,
    extractor: E,
    config: ScanConfig,
}

impl<'a, F, E> ProjectScanner<'a, F, E>
where
    F: IgnoreFilter,
    E: FactsExtractor,
{
    /// Creates a scanner with the default scan configuration.
    pub fn new(cache: Option<&'a CacheManager>, filter: F, extractor: E) -> Self {
        Self::with_config(cache, filter, extractor, ScanConfig::default())
    }

    /// Creates a scanner. The cache directory is always excluded from scans.
    pub fn with_config(
        cache: Option<&'a CacheManager>,
        filter: F,
        extractor: E,
        mut config: ScanConfig,
    ) -> Self {
        if let Some(cache) = cache {
            config.exclude_dirs.push(cache.cache_dir().to_path_buf());
        }
        Self {
            cache,
            filter,
            extractor,
            config,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Takes a fresh snapshot of `root`.
    pub fn snapshot(&self, root: &Path) -> Result<ProjectSnapshot, ScanError> {
        take_snapshot(root, &self.filter, &self.config)
    }

    /// Returns the cached bundle for `root`, or assembles and caches one.
    pub fn scan_full(&self, root: &Path) -> Result<ContextBundle, ScanError> {
        let key = bundle_key(&root.to_string_lossy());
        if let Some(bundle) = self.cache.and_then(|cache| cache.get_bundle(&key)) {
            debug!("Using cached bundle for {}", root.display());
            return Ok(bundle);
        }

        let mut snapshot = self.snapshot(root)?;
        let bundle = self.assemble(root, &mut snapshot, &HashSet::new());
        self.store_bundle(&key, &bundle);
        Ok(bundle)
    }

    /// Scans `root`, re-deriving only files that changed since the last scan.
    ///
    /// 1. Take a fresh snapshot and load the previous one.
    /// 2. No previous snapshot: assemble everything, report non-incremental.
    /// 3. Nothing changed: return the cached bundle as is.
    /// 4. Otherwise re-read changed files, reuse cached entries for the rest,
    ///    rebuild the bundle in full and replace the stored snapshot.
    pub fn scan_incremental(&self, root: &Path) -> Result<ScanOutcome, ScanError> {
        let Some(cache) = self.cache else {
            let bundle = self.scan_full(root)?;
            return Ok(ScanOutcome {
                bundle,
                incremental: false,
                diff: None,
            });
        };

        let root_key = root.to_string_lossy();
        let bundle_id = bundle_key(&root_key);
        let snapshot_id = snapshot_key(&root_key);

        let previous = cache.get_snapshot(&snapshot_id);
        let mut current = self.snapshot(root)?;

        let Some(previous) = previous else {
            info!("No previous snapshot for {}; full scan", root.display());
            let bundle = self.assemble(root, &mut current, &HashSet::new());
            self.store_bundle(&bundle_id, &bundle);
            self.store_snapshot(&snapshot_id, &current);
            return Ok(ScanOutcome {
                bundle,
                incremental: false,
                diff: None,
            });
        };

        let diff = diff_snapshots(&previous, &current);
        if diff.is_empty() {
            if let Some(bundle) = cache.get_bundle(&bundle_id) {
                debug!("No changes in {}", root.display());
                return Ok(ScanOutcome {
                    bundle,
                    incremental: true,
                    diff: Some(diff),
                });
            }
            debug!("No changes in {} but bundle evicted; reassembling", root.display());
        } else {
            info!(
                "{}: {} changed, {} deleted",
                root.display(),
                diff.changed.len(),
                diff.deleted.len()
            );
        }

        for relative in &diff.deleted {
            if let Err(err) = cache.invalidate_file(&root.join(relative)) {
                warn!("Failed to drop cache entries for {}: {}", relative, err);
            }
        }

        let changed: HashSet<&str> = diff.changed.iter().map(String::as_str).collect();
        let bundle = self.assemble(root, &mut current, &changed);
        self.store_bundle(&bundle_id, &bundle);
        self.store_snapshot(&snapshot_id, &current);

        Ok(ScanOutcome {
            bundle,
            incremental: true,
            diff: Some(diff),
        })
    }

    /// Builds a bundle covering every file in `snapshot`.
    ///
    /// Paths in `changed` are read from disk and their entries refreshed;
    /// the rest go through the cache first. Unreadable files are skipped
    /// and dropped from `snapshot`, so the next scan sees them as new.
    fn assemble(
        &self,
        root: &Path,
        snapshot: &mut ProjectSnapshot,
        changed: &HashSet<&str>,
    ) -> ContextBundle {
        let mut bundle = ContextBundle::default();
        let mut unreadable = Vec::new();

        for relative in snapshot.files.keys() {
            let path = root.join(relative);
            let is_changed = changed.contains(relative.as_str());

            let cached_content = if is_changed {
                None
            } else {
                self.cache.and_then(|cache| cache.get_file_content(&path))
            };
            let content = match cached_content {
                Some(content) => content,
                None => match fs::read(&path) {
                    Ok(content) => {
                        if let Some(cache) = self.cache
                            && let Err(err) = cache.set_file_content(&path, &content)
                        {
                            warn!("Failed to cache content of {}: {}", relative, err);
                        }
                        content
                    }
                    Err(err) => {
                        debug!("Skipping unreadable file {}: {}", relative, err);
                        unreadable.push(relative.clone());
                        continue;
                    }
                },
            };

            let cached_facts = if is_changed {
                None
            } else {
                self.cache.and_then(|cache| cache.get_derived_facts(&path))
            };
            let facts = match cached_facts {
                Some(facts) => facts,
                None => {
                    let facts = self.extractor.derive_facts(relative, &content);
                    if let Some(cache) = self.cache
                        && let Err(err) = cache.set_derived_facts(&path, &facts)
                    {
                        warn!("Failed to cache facts of {}: {}", relative, err);
                    }
                    facts
                }
            };

            bundle.push(relative, &content, &facts);
        }

        for relative in &unreadable {
            snapshot.files.remove(relative);
        }
        bundle
    }

    fn store_bundle(&self, key: &str, bundle: &ContextBundle) {
        if let Some(cache) = self.cache
            && let Err(err) = cache.set_bundle(key, bundle)
        {
            warn!("Failed to cache project bundle: {}", err);
        }
    }

    fn store_snapshot(&self, key: &str, snapshot: &ProjectSnapshot) {
        if let Some(cache) = self.cache
            && let Err(err) = cache.set_snapshot(key, snapshot)
        {
            warn!("Failed to store project snapshot: {}", err);
        }
    }
}
