//! The crawl driver: enumeration, retry, and termination policy.
//!
//! The driver owns the walk over a source's enumeration space. It is
//! generic over the [`SourceAdapter`] contract and never inspects a
//! variant's internals; everything source-specific arrives as an opaque
//! cursor.
//!
//! # Policy
//!
//! - Each page fetch carries an attempt counter starting at 0. On failure
//!   the *same* cursor is retried with attempt+1, up to `max_retries`
//!   additional attempts; a failed fetch never advances the cursor.
//! - Exceeding the cap abandons the position: depending on the adapter's
//!   [`CapPolicy`] the walk skips to the next seed combination or the whole
//!   run ends.
//! - The offset-increment pagination fallback is capped per seed by the
//!   same `max_retries` value, on its own counter: each taken fallback
//!   counts exactly once, independent of fetch retries.
//! - Per listing entry, the dedup gate is consulted *before* the expensive
//!   extraction (which may cost a detail fetch); known records are cheap
//!   no-ops, which is what makes full re-enumeration on restart tolerable.
//!
//! Retries back off exponentially with jitter; the position state lives in
//! an explicit loop, so long crawls never grow the stack.

use rand::{rng, Rng};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::SetupError;
use crate::scrapers::{Advance, CapPolicy, ListingPage, RawEntry, SourceAdapter};
use crate::store::PersistenceSink;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Counters describing one completed (or ended) crawl run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunStats {
    pub pages_fetched: u64,
    pub records_inserted: u64,
    pub duplicates_skipped: u64,
    pub extraction_failures: u64,
    pub store_failures: u64,
    pub positions_abandoned: u64,
}

/// Drives one source adapter across its full enumeration space.
pub struct CrawlDriver<'a, S: PersistenceSink> {
    sink: &'a S,
    max_retries: u32,
    base_delay: Duration,
}

impl<'a, S: PersistenceSink> CrawlDriver<'a, S> {
    pub fn new(sink: &'a S, max_retries: u32) -> Self {
        Self {
            sink,
            max_retries,
            base_delay: Duration::from_secs(1),
        }
    }

    /// Walk the adapter's entire search space to natural termination.
    ///
    /// Only seed discovery can fail the run; everything after that is
    /// position-scoped and degrades to logged skips.
    #[instrument(level = "info", skip_all, fields(source = %adapter.source()))]
    pub async fn run<A: SourceAdapter>(&self, adapter: &A) -> Result<RunStats, SetupError> {
        let seeds = adapter.seed_cursors().await.map_err(SetupError::Discovery)?;
        info!(seeds = seeds.len(), "Starting crawl");

        let mut stats = RunStats::default();
        'seeds: for seed in seeds {
            let mut cursor = seed;
            let mut fallbacks_taken = 0u32;
            loop {
                let Some(page) = self.fetch_with_retry(adapter, &cursor).await else {
                    stats.positions_abandoned += 1;
                    match adapter.cap_policy() {
                        CapPolicy::SkipToNextSeed => continue 'seeds,
                        CapPolicy::EndRun => {
                            warn!(?cursor, "Retry cap exceeded; ending run");
                            self.log_summary(&stats);
                            return Ok(stats);
                        }
                    }
                };
                stats.pages_fetched += 1;

                for entry in &page.entries {
                    self.process_entry(adapter, entry, &mut stats).await;
                }

                match page.advance {
                    Advance::Next(next) => cursor = next,
                    Advance::Fallback(next) => {
                        fallbacks_taken += 1;
                        if fallbacks_taken > self.max_retries {
                            warn!(
                                ?cursor,
                                fallbacks = fallbacks_taken - 1,
                                "Offset fallback cap reached; leaving query"
                            );
                            break;
                        }
                        debug!(?next, "No pagination link; advancing by result offset");
                        cursor = next;
                    }
                    Advance::End => break,
                }
            }
        }

        self.log_summary(&stats);
        Ok(stats)
    }

    /// Fetch one listing page, retrying the same cursor up to the cap.
    /// `None` means the position was abandoned.
    async fn fetch_with_retry<A: SourceAdapter>(
        &self,
        adapter: &A,
        cursor: &A::Cursor,
    ) -> Option<ListingPage<A::Cursor>> {
        let mut attempt = 0u32;
        loop {
            match adapter.fetch_listing_page(cursor).await {
                Ok(page) => return Some(page),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        error!(
                            ?cursor,
                            attempts = attempt,
                            error = %e,
                            "Listing fetch exhausted retries; abandoning position"
                        );
                        return None;
                    }
                    let delay = self.backoff(attempt);
                    warn!(
                        ?cursor,
                        attempt,
                        ?delay,
                        error = %e,
                        "Listing fetch failed; retrying same position"
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1).min(16));
        if delay > MAX_BACKOFF {
            delay = MAX_BACKOFF;
        }
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + Duration::from_millis(jitter_ms)
    }

    /// Dedup-check, extract, and persist one listing entry. Every failure
    /// mode here is a logged skip; a bad entry never stops the walk.
    async fn process_entry<A: SourceAdapter>(
        &self,
        adapter: &A,
        entry: &RawEntry,
        stats: &mut RunStats,
    ) {
        if entry.natural_key.is_empty() {
            warn!(url = %entry.url, "Listing entry has no natural key; skipping");
            stats.extraction_failures += 1;
            return;
        }

        // Gate before extraction: a known record must never incur the
        // detail fetch.
        match self.sink.exists(&entry.natural_key).await {
            Ok(true) => {
                debug!(key = %entry.natural_key, "Already harvested");
                stats.duplicates_skipped += 1;
                return;
            }
            Ok(false) => {}
            Err(e) => {
                error!(key = %entry.natural_key, error = %e, "Dedup lookup failed; skipping entry");
                stats.store_failures += 1;
                return;
            }
        }

        let record = match adapter.extract_record(entry).await {
            Ok(record) => record,
            Err(e) => {
                warn!(key = %entry.natural_key, error = %e, "Record extraction failed; skipping");
                stats.extraction_failures += 1;
                return;
            }
        };

        if !record.persistable() {
            warn!(url = %entry.url, "Extracted record has no natural key; skipping");
            stats.extraction_failures += 1;
            return;
        }

        match self.sink.insert(&record).await {
            Ok(()) => {
                info!(key = %record.natural_key, source = %record.source, "Harvested record");
                stats.records_inserted += 1;
            }
            Err(e) => {
                error!(key = %record.natural_key, error = %e, "Insert failed");
                stats.store_failures += 1;
            }
        }
    }

    fn log_summary(&self, stats: &RunStats) {
        info!(
            pages = stats.pages_fetched,
            inserted = stats.records_inserted,
            duplicates = stats.duplicates_skipped,
            extraction_failures = stats.extraction_failures,
            store_failures = stats.store_failures,
            abandoned = stats.positions_abandoned,
            "Crawl finished"
        );
    }
}
