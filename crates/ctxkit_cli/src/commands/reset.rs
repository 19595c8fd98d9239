//! Reset-cache command implementation

use std::io::{self, BufRead, Write};

use miette::{IntoDiagnostic, Result};
use tracing::info;

use super::{Context, format_mb};
use crate::commands::stats::print_report;

pub fn run_reset_cache(ctx: &Context, force: bool, show_stats: bool) -> Result<()> {
    let cache = ctx.open_cache()?;

    if show_stats {
        let report = cache.report().into_diagnostic()?;
        print_report(&report);
        return Ok(());
    }

    let stats = cache.stats().into_diagnostic()?;
    if stats.entry_count == 0 {
        println!("Cache is already empty");
        return Ok(());
    }

    if !force {
        print!(
            "Delete {} cache entries ({}) in {}? [y/N] ",
            stats.entry_count,
            format_mb(stats.total_bytes),
            stats.cache_dir.display()
        );
        io::stdout().flush().into_diagnostic()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer).into_diagnostic()?;
        if !confirmed(&answer) {
            println!("Cancelled");
            return Ok(());
        }
    }

    let removed = cache.clear_all().into_diagnostic()?;
    info!("Cache reset at {}", stats.cache_dir.display());
    println!(
        "Removed {} cache entries ({})",
        removed,
        format_mb(stats.total_bytes)
    );
    Ok(())
}

fn confirmed(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmed() {
        assert!(confirmed("y\n"));
        assert!(confirmed("  YES "));
        assert!(!confirmed("\n"));
        assert!(!confirmed("no"));
        assert!(!confirmed("yep"));
    }
}
