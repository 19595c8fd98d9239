//! Hit/miss counters and storage statistics.

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;

use crate::entry::EntryKind;
use crate::store::StoredEntry;
use crate::util::now_millis;

const MIB: f64 = 1024.0 * 1024.0;

/// Process-wide request counters.
#[derive(Debug)]
pub(crate) struct PerformanceCounters {
    total_requests: u64,
    hits: u64,
    misses: u64,
    last_reset: Instant,
    last_reset_at_ms: u64,
}

impl PerformanceCounters {
    pub(crate) fn new() -> Self {
        Self {
            total_requests: 0,
            hits: 0,
            misses: 0,
            last_reset: Instant::now(),
            last_reset_at_ms: now_millis(),
        }
    }

    pub(crate) fn record(&mut self, hit: bool) {
        self.total_requests += 1;
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }

    pub(crate) fn snapshot(&self) -> PerformanceStats {
        let uptime_secs = self.last_reset.elapsed().as_secs_f64();
        let requests_per_second = if uptime_secs > 0.0 {
            self.total_requests as f64 / uptime_secs
        } else {
            0.0
        };
        PerformanceStats {
            total_requests: self.total_requests,
            hits: self.hits,
            misses: self.misses,
            hit_rate_percent: percent(self.hits, self.total_requests),
            miss_rate_percent: percent(self.misses, self.total_requests),
            uptime_secs,
            requests_per_second,
            last_reset_at_ms: self.last_reset_at_ms,
        }
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Point-in-time copy of the request counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceStats {
    pub total_requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate_percent: f64,
    pub miss_rate_percent: f64,
    /// Seconds since the counters were last reset.
    pub uptime_secs: f64,
    pub requests_per_second: f64,
    pub last_reset_at_ms: u64,
}

/// Number of entries of each kind. Undecodable entries count as `unknown`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KindCounts {
    pub file_content: usize,
    pub derived_facts: usize,
    pub bundle: usize,
    pub snapshot: usize,
    pub unknown: usize,
}

impl KindCounts {
    pub fn add(&mut self, kind: Option<EntryKind>) {
        match kind {
            Some(EntryKind::FileContent) => self.file_content += 1,
            Some(EntryKind::DerivedFacts) => self.derived_facts += 1,
            Some(EntryKind::Bundle) => self.bundle += 1,
            Some(EntryKind::Snapshot) => self.snapshot += 1,
            None => self.unknown += 1,
        }
    }
}

/// Basic storage statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub cache_dir: PathBuf,
    pub entry_count: usize,
    pub total_bytes: u64,
    pub hit_rate_percent: f64,
    pub per_kind: KindCounts,
}

impl CacheStats {
    pub(crate) fn collect(
        cache_dir: PathBuf,
        entries: &[StoredEntry],
        performance: &PerformanceStats,
    ) -> Self {
        let mut per_kind = KindCounts::default();
        for entry in entries {
            per_kind.add(entry.kind);
        }
        Self {
            cache_dir,
            entry_count: entries.len(),
            total_bytes: entries.iter().map(|e| e.size_bytes).sum(),
            hit_rate_percent: performance.hit_rate_percent,
            per_kind,
        }
    }
}

/// Storage statistics including the age range of stored entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedStats {
    #[serde(flatten)]
    pub basic: CacheStats,
    pub total_mb: f64,
    pub oldest_ms: Option<u64>,
    pub newest_ms: Option<u64>,
    pub age_range_hours: Option<f64>,
}

impl DetailedStats {
    pub(crate) fn collect(
        cache_dir: PathBuf,
        entries: &[StoredEntry],
        performance: &PerformanceStats,
    ) -> Self {
        let basic = CacheStats::collect(cache_dir, entries, performance);
        let oldest_ms = entries.iter().map(|e| e.cached_at_ms).min();
        let newest_ms = entries.iter().map(|e| e.cached_at_ms).max();
        let age_range_hours = oldest_ms
            .zip(newest_ms)
            .map(|(oldest, newest)| (newest - oldest) as f64 / 3_600_000.0);
        Self {
            total_mb: basic.total_bytes as f64 / MIB,
            basic,
            oldest_ms,
            newest_ms,
            age_range_hours,
        }
    }
}

/// How storage is being used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageRating {
    Good,
    /// Average entry is over 100 KiB.
    CheckLargeEntries,
}

/// How often lookups are served from cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HitRating {
    Excellent,
    Moderate,
    Poor,
}

impl HitRating {
    /// Rates a hit rate. `None` when nothing has been served yet.
    pub fn from_hit_rate(hit_rate_percent: f64) -> Option<Self> {
        if hit_rate_percent <= 0.0 {
            None
        } else if hit_rate_percent < 50.0 {
            Some(HitRating::Poor)
        } else if hit_rate_percent < 75.0 {
            Some(HitRating::Moderate)
        } else {
            Some(HitRating::Excellent)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Efficiency {
    pub avg_entry_kb: Option<f64>,
    pub storage: Option<StorageRating>,
    pub cache: Option<HitRating>,
}

impl Efficiency {
    pub(crate) fn rate(storage: &DetailedStats, performance: &PerformanceStats) -> Self {
        let avg_entry_kb = (storage.basic.entry_count > 0)
            .then(|| storage.basic.total_bytes as f64 / 1024.0 / storage.basic.entry_count as f64);
        let storage_rating = avg_entry_kb.map(|kb| {
            if kb > 100.0 {
                StorageRating::CheckLargeEntries
            } else {
                StorageRating::Good
            }
        });
        Self {
            avg_entry_kb,
            storage: storage_rating,
            cache: HitRating::from_hit_rate(performance.hit_rate_percent),
        }
    }
}

/// Performance, storage and efficiency in one report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheReport {
    pub performance: PerformanceStats,
    pub storage: DetailedStats,
    pub efficiency: Efficiency,
    pub generated_at_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn stored(kind: Option<EntryKind>, cached_at_ms: u64, size_bytes: u64) -> StoredEntry {
        StoredEntry {
            path: PathBuf::from("/cache/x.cache"),
            file_name: "x.cache".to_string(),
            size_bytes,
            cached_at_ms,
            kind,
        }
    }

    #[test]
    fn test_counters_start_empty() {
        let stats = PerformanceCounters::new().snapshot();
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.hit_rate_percent, 0.0);
        assert_eq!(stats.miss_rate_percent, 0.0);
    }

    #[test]
    fn test_counters_record_and_reset() {
        let mut counters = PerformanceCounters::new();
        counters.record(true);
        counters.record(false);
        counters.record(false);
        counters.record(true);

        let stats = counters.snapshot();
        assert_eq!(stats.total_requests, 4);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hit_rate_percent, 50.0);

        counters.reset();
        assert_eq!(counters.snapshot().total_requests, 0);
    }

    #[test]
    fn test_detailed_stats_age_range() {
        let entries = vec![
            stored(Some(EntryKind::FileContent), 1_000, 10),
            stored(Some(EntryKind::Snapshot), 3_601_000, 20),
            stored(None, 2_000, 30),
        ];
        let performance = PerformanceCounters::new().snapshot();
        let stats = DetailedStats::collect(PathBuf::from("/cache"), &entries, &performance);

        assert_eq!(stats.basic.entry_count, 3);
        assert_eq!(stats.basic.total_bytes, 60);
        assert_eq!(stats.basic.per_kind.file_content, 1);
        assert_eq!(stats.basic.per_kind.snapshot, 1);
        assert_eq!(stats.basic.per_kind.unknown, 1);
        assert_eq!(stats.oldest_ms, Some(1_000));
        assert_eq!(stats.newest_ms, Some(3_601_000));
        assert_eq!(stats.age_range_hours, Some(1.0));
    }

    #[test]
    fn test_detailed_stats_empty() {
        let performance = PerformanceCounters::new().snapshot();
        let stats = DetailedStats::collect(PathBuf::from("/cache"), &[], &performance);
        assert_eq!(stats.oldest_ms, None);
        assert_eq!(stats.age_range_hours, None);
    }

    #[rstest]
    #[case(0.0, None)]
    #[case(10.0, Some(HitRating::Poor))]
    #[case(50.0, Some(HitRating::Moderate))]
    #[case(74.9, Some(HitRating::Moderate))]
    #[case(75.0, Some(HitRating::Excellent))]
    fn test_hit_rating(#[case] rate: f64, #[case] expected: Option<HitRating>) {
        assert_eq!(HitRating::from_hit_rate(rate), expected);
    }

    #[test]
    fn test_storage_rating_flags_large_entries() {
        let entries = vec![stored(Some(EntryKind::Bundle), 0, 200 * 1024)];
        let performance = PerformanceCounters::new().snapshot();
        let storage = DetailedStats::collect(PathBuf::from("/cache"), &entries, &performance);

        let efficiency = Efficiency::rate(&storage, &performance);
        assert_eq!(efficiency.avg_entry_kb, Some(200.0));
        assert_eq!(efficiency.storage, Some(StorageRating::CheckLargeEntries));
        assert_eq!(efficiency.cache, None);
    }
}
