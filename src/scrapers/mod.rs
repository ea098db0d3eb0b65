//! Source adapters for the harvested search interfaces.
//!
//! Each adapter turns one position of its enumeration space into a page of
//! raw listing entries, and a raw entry into a normalized [`Record`]. The
//! crawl driver is generic over this contract and never looks inside a
//! variant.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | arXiv | [`arxiv`] | HTML scraping | Advanced search, subject × year × letter cross product; one detail fetch per record |
//! | Lens | [`lens`] | In-page JSON API | Browser session; listing entries are complete records |
//!
//! # Common Patterns
//!
//! Each adapter implements [`SourceAdapter`]:
//! - `seed_cursors()`: the outer enumeration combinations, discovered once
//!   at run start
//! - `fetch_listing_page(cursor)`: one page of raw entries plus how to
//!   advance
//! - `extract_record(entry)`: the normalized record (may cost one extra
//!   detail fetch)

pub mod arxiv;
pub mod lens;

use crate::errors::AdapterError;
use crate::models::{Record, Source};

/// What the driver does when a position exhausts its retry cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapPolicy {
    /// Abandon the position and move to the next seed combination.
    SkipToNextSeed,
    /// End the entire run; a pure page-number walk has nothing reachable
    /// beyond an abandoned position.
    EndRun,
}

/// How the walk proceeds after a listing page.
#[derive(Debug, Clone)]
pub enum Advance<C> {
    /// The source provided an explicit next page.
    Next(C),
    /// No next-page link, but more results are known to exist: a cursor
    /// constructed by adding one page size to the result offset. Taking it
    /// counts against the seed's fallback cap.
    Fallback(C),
    /// The source is exhausted at this position. Normal termination.
    End,
}

/// One page of a paginated search result.
#[derive(Debug, Clone)]
pub struct ListingPage<C> {
    pub entries: Vec<RawEntry>,
    pub advance: Advance<C>,
}

/// The source-shaped payload a raw entry carries into extraction.
#[derive(Debug, Clone)]
pub enum EntryPayload {
    /// The listing item's HTML fragment (static-listing sources).
    Html(String),
    /// The listing item's JSON object (API sources).
    Json(serde_json::Value),
}

/// A single listing entry before extraction.
#[derive(Debug, Clone)]
pub struct RawEntry {
    /// Source-provided unique identifier; empty when the listing item was
    /// too malformed to carry one (the driver skips those).
    pub natural_key: String,
    /// The entry's detail-page location.
    pub url: String,
    pub payload: EntryPayload,
}

/// The contract every source variant implements.
pub trait SourceAdapter {
    /// The adapter's position in its enumeration space.
    type Cursor: Clone + std::fmt::Debug;

    fn source(&self) -> Source;

    fn cap_policy(&self) -> CapPolicy;

    /// Discover the outer enumeration combinations for a run. Called once;
    /// failure here is fatal setup.
    async fn seed_cursors(&self) -> Result<Vec<Self::Cursor>, AdapterError>;

    /// Fetch and parse one listing page at the given cursor.
    async fn fetch_listing_page(
        &self,
        cursor: &Self::Cursor,
    ) -> Result<ListingPage<Self::Cursor>, AdapterError>;

    /// Turn a raw listing entry into a normalized record. For sources whose
    /// listing is partial this performs the detail-page fetch, which is why
    /// the driver consults the dedup gate first.
    async fn extract_record(&self, entry: &RawEntry) -> Result<Record, AdapterError>;
}
