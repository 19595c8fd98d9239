//! ctxkit CLI
//!
//! Builds project context bundles and maintains the cache behind them.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use miette::Result;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::Context;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let ctx = Context::load(&cli)?;

    match &cli.command {
        Commands::Scan { root, print } => commands::scan::run_scan(&ctx, root.as_deref(), *print),
        Commands::Stats { detailed, json } => commands::stats::run_stats(&ctx, *detailed, *json),
        Commands::Cleanup(args) => commands::cleanup::run_cleanup(&ctx, args),
        Commands::ResetCache { force, stats } => {
            commands::reset::run_reset_cache(&ctx, *force, *stats)
        }
    }
}
