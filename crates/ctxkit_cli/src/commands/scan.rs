//! Scan command implementation

use std::path::Path;

use ctxkit_cache::CacheManager;
use ctxkit_core::{DefaultIgnore, OutlineExtractor, ProjectScanner, ScanOutcome};
use miette::{IntoDiagnostic, Result};
use tracing::{debug, info, warn};

use super::Context;

pub fn run_scan(ctx: &Context, root: Option<&Path>, print: bool) -> Result<()> {
    let root = match root {
        Some(root) => root.to_path_buf(),
        None => std::env::current_dir().into_diagnostic()?,
    };
    let root = root.canonicalize().into_diagnostic()?;

    let filter = DefaultIgnore::load(&root, &ctx.config.scan.ignore_file).into_diagnostic()?;

    let mut cache = if ctx.cache_enabled {
        Some(CacheManager::open(&ctx.cache_config()).into_diagnostic()?)
    } else {
        info!("Cache disabled");
        None
    };

    let outcome = {
        let scanner = ProjectScanner::with_config(
            cache.as_ref(),
            filter,
            OutlineExtractor::default(),
            ctx.config.scan.clone(),
        );
        scanner.scan_incremental(&root).into_diagnostic()?
    };

    if let Some(cache) = &cache {
        let perf = cache.performance();
        debug!(
            "Cache lookups: {} hits, {} misses ({:.1}% hit rate)",
            perf.hits, perf.misses, perf.hit_rate_percent
        );
    }

    if let Some(handle) = cache.as_mut().and_then(|c| c.take_startup_cleanup()) {
        match handle.join() {
            Ok(report) if report.deleted > 0 => {
                info!("Startup cleanup removed {} entries", report.deleted)
            }
            Ok(_) => {}
            Err(e) => warn!("Startup cleanup failed: {}", e),
        }
    }

    if print {
        println!("{}", outcome.bundle.text());
    } else {
        print_summary(&root, &outcome);
    }
    Ok(())
}

fn print_summary(root: &Path, outcome: &ScanOutcome) {
    println!(
        "Scanned {}: {} files (incremental: {})",
        root.display(),
        outcome.bundle.len(),
        if outcome.incremental { "yes" } else { "no" }
    );
    if let Some(diff) = &outcome.diff {
        println!(
            "  {} changed, {} deleted",
            diff.changed.len(),
            diff.deleted.len()
        );
    }
}
