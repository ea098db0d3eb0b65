//! Command-line interface definitions for the harvester.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Arguments can be provided via command-line flags or environment variables.

use clap::Parser;

/// Command-line arguments for the harvester.
///
/// A run needs no input beyond static configuration: it walks every source's
/// search space to natural exhaustion and exits.
///
/// # Examples
///
/// ```sh
/// # Harvest both sources into the default database
/// paper_harvest
///
/// # Harvest only arXiv with a custom config
/// paper_harvest --source arxiv --config ./config.yaml
///
/// # Exercise the pipeline without touching the database
/// paper_harvest --dry-run
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// SQLite database URL for the record store
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite://papers.db?mode=rwc"
    )]
    pub database_url: String,

    /// Harvest only the named source ("arxiv" or "lens"); default is both
    #[arg(short, long)]
    pub source: Option<String>,

    /// Keep harvested records in memory instead of the database
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}
