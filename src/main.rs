//! # Paper Harvest
//!
//! An incremental harvester for bibliographic metadata. Each run walks the
//! full search space of its sources — the arXiv advanced-search listing and
//! the Lens works API — and persists every newly-seen record into a local
//! document store keyed by the record's natural identifier.
//!
//! ## Usage
//!
//! ```sh
//! paper_harvest --database-url sqlite://papers.db?mode=rwc
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Seeding**: Discover the enumeration combinations for each source
//! 2. **Walking**: Fetch listing pages sequentially with position-scoped
//!    retries
//! 3. **Gating**: Skip entries whose natural key is already stored, before
//!    any detail fetch
//! 4. **Extraction**: Normalize raw fields into canonical records
//! 5. **Persistence**: Idempotent insert into the record store
//!
//! The sources run as independent sequential pipelines; re-running over an
//! unchanged source is a cheap no-op thanks to the dedup gate.

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod crawler;
mod errors;
mod models;
mod normalize;
mod scrapers;
mod session;
mod store;

use cli::Cli;
use config::HarvestConfig;
use crawler::CrawlDriver;
use scrapers::arxiv::ArxivAdapter;
use scrapers::lens::LensAdapter;
use session::BrowserSession;
use store::{MemorySink, PersistenceSink, SqliteStore};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("paper_harvest starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.config, ?args.source, args.dry_run, "Parsed CLI arguments");

    let config = HarvestConfig::load(args.config.as_deref())?;

    let (run_arxiv, run_lens) = match args.source.as_deref() {
        None => (true, true),
        Some("arxiv") => (true, false),
        Some("lens") => (false, true),
        Some(other) => {
            error!(source = other, "Unknown source; expected \"arxiv\" or \"lens\"");
            return Err(format!("unknown source: {other}").into());
        }
    };

    if args.dry_run {
        let sink = MemorySink::default();
        run_pipelines(&config, &sink, run_arxiv, run_lens).await?;
        info!(
            records = sink.len().await,
            "Dry run complete; records were kept in memory"
        );
    } else {
        let store = SqliteStore::connect(&args.database_url).await?;
        run_pipelines(&config, &store, run_arxiv, run_lens).await?;
        info!(records = store.count().await?, "Store totals");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

/// Run each enabled source as its own sequential pipeline against the
/// shared sink. A fatal setup failure in either source (client build,
/// browser session, seed discovery) stops the run here.
async fn run_pipelines<S: PersistenceSink>(
    config: &HarvestConfig,
    sink: &S,
    run_arxiv: bool,
    run_lens: bool,
) -> Result<(), Box<dyn Error>> {
    let driver = CrawlDriver::new(sink, config.max_retries);

    if run_arxiv {
        let adapter = ArxivAdapter::new(config.arxiv.clone())?;
        let stats = driver.run(&adapter).await?;
        info!(
            source = "arxiv",
            inserted = stats.records_inserted,
            duplicates = stats.duplicates_skipped,
            abandoned = stats.positions_abandoned,
            "Source pipeline finished"
        );
    }

    if run_lens {
        let session = BrowserSession::open(&config.lens.entry_url).await?;
        let adapter = LensAdapter::new(session, config.lens.clone());
        let stats = driver.run(&adapter).await?;
        info!(
            source = "lens",
            inserted = stats.records_inserted,
            duplicates = stats.duplicates_skipped,
            abandoned = stats.positions_abandoned,
            "Source pipeline finished"
        );
    }

    Ok(())
}
