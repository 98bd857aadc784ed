//! vwbackup CLI - Vaultwarden data directory backups
//!
//! This is the main entry point for the vwbackup command-line interface.

mod cli;
mod commands;
mod output;
mod passphrase;
mod paths;
mod remote;
mod upload;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;

fn main() -> Result<()> {
    // Parse CLI args
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose, cli.quiet, cli.log_level.as_deref())?;

    commands::backup::run(cli)
}

/// Initialize tracing with appropriate verbosity
///
/// An explicit `--log-level` directive wins over `-v`/`-q`.
fn init_tracing(verbose: u8, quiet: bool, log_level: Option<&str>) -> Result<()> {
    let filter = filter_for(verbose, quiet, log_level)?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}

fn filter_for(verbose: u8, quiet: bool, log_level: Option<&str>) -> Result<EnvFilter> {
    if let Some(directive) = log_level {
        return EnvFilter::try_new(directive)
            .with_context(|| format!("Invalid log level: {}", directive));
    }

    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };
    Ok(filter)
}
