//! Error taxonomy for the harvesting pipeline.
//!
//! The original behavior this replaces was a blanket log-and-continue around
//! every operation. Here the failure classes are kept apart so the crawl
//! driver can react to each one differently:
//!
//! - [`AdapterError`]: transient fetch/parse/automation failures. The driver
//!   retries the same enumeration position up to its cap.
//! - [`StoreError`]: the persistence sink misbehaved. Logged per entry,
//!   never fatal to the crawl.
//! - [`SetupError`]: a collaborator could not be established. The run does
//!   not proceed.
//!
//! A missing field inside an otherwise healthy page is *not* an error at
//! all; the normalizer defaults it to an empty value.

use thiserror::Error;

/// A transient, position-scoped failure while fetching or parsing a page.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The HTTP fetch failed (network error or error status).
    #[error("fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The document came back but a structurally required node was missing.
    #[error("markup missing expected node: {0}")]
    Markup(&'static str),

    /// The browser-automation script could not be executed.
    #[error("automation script failed: {0}")]
    Automation(String),

    /// The automation script ran but produced something that isn't JSON.
    #[error("script output was not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A failure inside the persistence sink.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("record could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A fatal failure establishing a collaborator before the crawl starts.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to open record store: {0}")]
    Store(#[from] sqlx::Error),

    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to open browser session: {0}")]
    Session(String),

    /// Seed-cursor discovery failed (e.g. the facet-listing page was
    /// unreachable or carried no facets). Nothing to enumerate.
    #[error("failed to discover enumeration seeds: {0}")]
    Discovery(#[from] AdapterError),

    #[error("invalid configuration: {0}")]
    Config(String),
}
