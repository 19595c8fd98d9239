//! Cleanup command implementation

use ctxkit_cache::{CacheError, CleanupOptions, CleanupReport, age_limit, size_limit};
use miette::{IntoDiagnostic, Result};

use super::{Context, format_mb};
use crate::cli::CleanupArgs;

pub fn run_cleanup(ctx: &Context, args: &CleanupArgs) -> Result<()> {
    let configured = ctx.config.cache.cleanup.to_options().into_diagnostic()?;
    let options = cleanup_options(configured, args).into_diagnostic()?;
    let cache = ctx.open_cache()?;
    let report = cache.cleanup(&options).into_diagnostic()?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).into_diagnostic()?
        );
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Applies the command-line limits on top of the configured ones.
fn cleanup_options(
    mut options: CleanupOptions,
    args: &CleanupArgs,
) -> Result<CleanupOptions, CacheError> {
    if let Some(days) = args.max_age_days {
        options.max_age = age_limit(days)?;
    }
    if let Some(mb) = args.max_mb {
        options.max_total_bytes = size_limit(mb)?;
    }
    if let Some(count) = args.max_entries {
        options.max_entry_count = (count > 0).then_some(count);
    }
    Ok(options.dry_run(args.dry_run))
}

fn print_report(report: &CleanupReport) {
    if report.dry_run {
        println!(
            "Dry run: would remove {} of {} entries ({})",
            report.marked,
            report.entries_before,
            format_mb(report.bytes_marked)
        );
    } else {
        println!(
            "Removed {} of {} entries ({})",
            report.deleted,
            report.entries_before,
            format_mb(report.bytes_marked)
        );
    }
    println!(
        "  by age: {}, by size: {}, by count: {}",
        report.deleted_by_age, report.deleted_by_size, report.deleted_by_count
    );
    println!(
        "Remaining: {} entries ({})",
        report.entries_after,
        format_mb(report.bytes_after)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> CleanupArgs {
        CleanupArgs {
            max_age_days: None,
            max_mb: None,
            max_entries: None,
            dry_run: false,
            json: false,
        }
    }

    #[test]
    fn test_unset_flags_keep_configured_limits() {
        let options = cleanup_options(CleanupOptions::conservative(), &args()).unwrap();
        assert_eq!(options, CleanupOptions::conservative());
    }

    #[test]
    fn test_flags_override_and_zero_disables() {
        let args = CleanupArgs {
            max_age_days: Some(0),
            max_mb: Some(5),
            max_entries: Some(10),
            dry_run: true,
            ..args()
        };
        let options = cleanup_options(CleanupOptions::conservative(), &args).unwrap();

        assert_eq!(options.max_age, None);
        assert_eq!(options.max_total_bytes, Some(5 * 1024 * 1024));
        assert_eq!(options.max_entry_count, Some(10));
        assert!(options.dry_run);
    }

    #[test]
    fn test_overflowing_flags_are_rejected() {
        let huge_mb = CleanupArgs {
            max_mb: Some(u64::MAX),
            ..args()
        };
        let huge_age = CleanupArgs {
            max_age_days: Some(u64::MAX),
            ..args()
        };

        for args in [huge_mb, huge_age] {
            let err = cleanup_options(CleanupOptions::new(), &args).unwrap_err();
            assert!(matches!(err, CacheError::InvalidConfig(_)));
        }
    }
}
