//! Eviction policy for the entry store.
//!
//! Entries are ordered by their logical write time (oldest first) and
//! selected in three phases: age cutoff, then total size, then entry count.
//! An entry picked by an earlier phase is never counted again by a later one.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::CacheError;
use crate::store::{EntryStore, StoredEntry};
use crate::util::{now_millis, remove_if_exists};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);
const MIB: u64 = 1024 * 1024;

/// Limits applied by a cleanup pass. `None` disables a phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupOptions {
    /// Remove entries written longer ago than this.
    pub max_age: Option<Duration>,
    /// Remove oldest entries until the total size is at most this.
    pub max_total_bytes: Option<u64>,
    /// Remove oldest entries until at most this many remain.
    pub max_entry_count: Option<usize>,
    /// Compute the selection without deleting anything.
    pub dry_run: bool,
}

impl CleanupOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Startup defaults: 7 days, 100 MiB, 1000 entries.
    pub fn conservative() -> Self {
        Self {
            max_age: Some(7 * DAY),
            max_total_bytes: Some(100 * MIB),
            max_entry_count: Some(1000),
            dry_run: false,
        }
    }

    pub fn max_age(mut self, age: Duration) -> Self {
        self.max_age = Some(age);
        self
    }

    pub fn max_total_bytes(mut self, bytes: u64) -> Self {
        self.max_total_bytes = Some(bytes);
        self
    }

    pub fn max_entry_count(mut self, count: usize) -> Self {
        self.max_entry_count = Some(count);
        self
    }

    pub fn dry_run(mut self, yes: bool) -> Self {
        self.dry_run = yes;
        self
    }
}

/// Entries selected for removal, in selection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanupPlan {
    pub entries_before: usize,
    pub bytes_before: u64,
    pub selected: Vec<StoredEntry>,
    pub selected_bytes: u64,
    pub by_age: usize,
    pub by_size: usize,
    pub by_count: usize,
}

/// Summary of a cleanup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub entries_before: usize,
    pub bytes_before: u64,
    pub marked: usize,
    pub bytes_marked: u64,
    pub deleted: usize,
    pub deleted_by_age: usize,
    pub deleted_by_size: usize,
    pub deleted_by_count: usize,
    pub entries_after: usize,
    pub bytes_after: u64,
    pub dry_run: bool,
}

/// Selects entries to remove under `options`, as of `now_ms`.
pub fn plan_cleanup(
    mut entries: Vec<StoredEntry>,
    options: &CleanupOptions,
    now_ms: u64,
) -> CleanupPlan {
    entries.sort_by(|a, b| {
        a.cached_at_ms
            .cmp(&b.cached_at_ms)
            .then_with(|| a.file_name.cmp(&b.file_name))
    });

    let bytes_before: u64 = entries.iter().map(|e| e.size_bytes).sum();
    let mut plan = CleanupPlan {
        entries_before: entries.len(),
        bytes_before,
        ..CleanupPlan::default()
    };
    let mut marked = vec![false; entries.len()];

    if let Some(max_age) = options.max_age {
        let max_age_ms = u64::try_from(max_age.as_millis()).unwrap_or(u64::MAX);
        let cutoff = now_ms.saturating_sub(max_age_ms);
        for (i, entry) in entries.iter().enumerate() {
            if entry.cached_at_ms < cutoff {
                marked[i] = true;
                plan.selected_bytes += entry.size_bytes;
                plan.by_age += 1;
            }
        }
    }

    if let Some(max_bytes) = options.max_total_bytes {
        let mut current = bytes_before - plan.selected_bytes;
        for (i, entry) in entries.iter().enumerate() {
            if current <= max_bytes {
                break;
            }
            if marked[i] {
                continue;
            }
            marked[i] = true;
            plan.selected_bytes += entry.size_bytes;
            current -= entry.size_bytes;
            plan.by_size += 1;
        }
    }

    if let Some(max_count) = options.max_entry_count {
        let remaining = marked.iter().filter(|m| !**m).count();
        let mut excess = remaining.saturating_sub(max_count);
        for (i, entry) in entries.iter().enumerate() {
            if excess == 0 {
                break;
            }
            if marked[i] {
                continue;
            }
            marked[i] = true;
            plan.selected_bytes += entry.size_bytes;
            plan.by_count += 1;
            excess -= 1;
        }
    }

    plan.selected = entries
        .into_iter()
        .zip(marked)
        .filter_map(|(entry, marked)| marked.then_some(entry))
        .collect();
    plan
}

impl EntryStore {
    /// Runs one eviction pass over the store directory.
    ///
    /// Holds the store lock exclusively for the whole pass. A file that
    /// fails to delete is logged and left in place.
    pub fn cleanup(&self, options: &CleanupOptions) -> Result<CleanupReport, CacheError> {
        let _guard = self.lock.write();
        let plan = plan_cleanup(self.scan_entries()?, options, now_millis());

        let mut deleted: HashSet<&str> = HashSet::new();
        if options.dry_run {
            deleted.extend(plan.selected.iter().map(|e| e.file_name.as_str()));
        } else {
            for entry in &plan.selected {
                match remove_if_exists(&entry.path) {
                    Ok(_) => {
                        deleted.insert(entry.file_name.as_str());
                    }
                    Err(err) => warn!("Failed to evict {}: {}", entry.path.display(), err),
                }
            }
        }

        let deleted_bytes: u64 = plan
            .selected
            .iter()
            .filter(|e| deleted.contains(e.file_name.as_str()))
            .map(|e| e.size_bytes)
            .sum();

        let report = CleanupReport {
            entries_before: plan.entries_before,
            bytes_before: plan.bytes_before,
            marked: plan.selected.len(),
            bytes_marked: plan.selected_bytes,
            deleted: deleted.len(),
            deleted_by_age: plan.by_age,
            deleted_by_size: plan.by_size,
            deleted_by_count: plan.by_count,
            entries_after: plan.entries_before - deleted.len(),
            bytes_after: plan.bytes_before - deleted_bytes,
            dry_run: options.dry_run,
        };

        if report.marked > 0 {
            info!(
                "Cache cleanup{}: {} of {} entries ({} bytes) selected",
                if options.dry_run { " (dry run)" } else { "" },
                report.marked,
                report.entries_before,
                report.bytes_marked
            );
        } else {
            debug!("Cache cleanup: nothing to remove");
        }
        Ok(report)
    }
}

/// Handle to a cleanup pass running on a background thread.
///
/// Dropping the handle detaches the thread; `join` waits for it.
#[derive(Debug)]
pub struct CleanupHandle {
    inner: JoinHandle<Result<CleanupReport, CacheError>>,
}

impl CleanupHandle {
    pub(crate) fn spawn(
        store: Arc<EntryStore>,
        options: CleanupOptions,
    ) -> Result<Self, CacheError> {
        let inner = std::thread::Builder::new()
            .name("ctxkit-cache-cleanup".to_string())
            .spawn(move || store.cleanup(&options))
            .map_err(|e| CacheError::BackgroundTask(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Returns true once the pass has finished.
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Waits for the pass and returns its report.
    pub fn join(self) -> Result<CleanupReport, CacheError> {
        self.inner
            .join()
            .map_err(|_| CacheError::BackgroundTask("cleanup thread panicked".to_string()))?
    }
}
