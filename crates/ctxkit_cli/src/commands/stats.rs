//! Stats command implementation

use std::time::{SystemTime, UNIX_EPOCH};

use ctxkit_cache::{CacheReport, CacheStats, HitRating, StorageRating};
use miette::{IntoDiagnostic, Result};

use super::{Context, format_mb};

pub fn run_stats(ctx: &Context, detailed: bool, json: bool) -> Result<()> {
    let cache = ctx.open_cache()?;

    if detailed {
        let report = cache.report().into_diagnostic()?;
        if json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).into_diagnostic()?
            );
        } else {
            print_report(&report);
        }
    } else {
        let stats = cache.stats().into_diagnostic()?;
        if json {
            println!(
                "{}",
                serde_json::to_string_pretty(&stats).into_diagnostic()?
            );
        } else {
            print_stats(&stats);
        }
    }
    Ok(())
}

pub fn print_stats(stats: &CacheStats) {
    println!("Cache directory: {}", stats.cache_dir.display());
    println!("Entries: {}", stats.entry_count);
    println!(
        "  file content: {}, derived facts: {}, bundles: {}, snapshots: {}",
        stats.per_kind.file_content,
        stats.per_kind.derived_facts,
        stats.per_kind.bundle,
        stats.per_kind.snapshot
    );
    if stats.per_kind.unknown > 0 {
        println!("  unreadable: {}", stats.per_kind.unknown);
    }
    println!("Total size: {}", format_mb(stats.total_bytes));
}

pub fn print_report(report: &CacheReport) {
    print_stats(&report.storage.basic);

    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    if let Some(oldest) = report.storage.oldest_ms {
        println!("Oldest entry: {}", format_age(now_ms, oldest));
    }
    if let Some(newest) = report.storage.newest_ms {
        println!("Newest entry: {}", format_age(now_ms, newest));
    }

    // Counters are per process; a standalone `stats` run has served nothing.
    let perf = &report.performance;
    if perf.total_requests > 0 {
        println!(
            "Requests: {} ({} hits, {} misses, {:.1}% hit rate)",
            perf.total_requests, perf.hits, perf.misses, perf.hit_rate_percent
        );
    }

    if let Some(kb) = report.efficiency.avg_entry_kb {
        println!("Average entry: {:.1} KB", kb);
    }
    if let Some(storage) = report.efficiency.storage {
        let text = match storage {
            StorageRating::Good => "good",
            StorageRating::CheckLargeEntries => "large entries, consider a cleanup",
        };
        println!("Storage: {}", text);
    }
    if let Some(rating) = report.efficiency.cache {
        let text = match rating {
            HitRating::Excellent => "excellent",
            HitRating::Moderate => "moderate",
            HitRating::Poor => "poor",
        };
        println!("Cache efficiency: {}", text);
    }
}

fn format_age(now_ms: u64, at_ms: u64) -> String {
    let hours = now_ms.saturating_sub(at_ms) as f64 / 3_600_000.0;
    if hours < 1.0 {
        format!("{:.0} minutes ago", hours * 60.0)
    } else if hours < 48.0 {
        format!("{:.1} hours ago", hours)
    } else {
        format!("{:.1} days ago", hours / 24.0)
    }
}
