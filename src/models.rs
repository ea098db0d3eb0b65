//! Data models for harvested bibliographic records.
//!
//! This module defines the canonical [`Record`] produced by every source
//! adapter after field normalization, together with the closed [`Source`]
//! enum identifying which adapter produced it.
//!
//! The record is persisted as one JSON document per natural key, so
//! everything here derives serde both ways.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of harvest sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// The arXiv advanced-search listing (server-rendered HTML).
    Arxiv,
    /// The Lens scholarly-works API (client-rendered JSON).
    Lens,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Arxiv => "arxiv",
            Source::Lens => "lens",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A canonical harvested record, shared across sources.
///
/// String fields are empty (never null) when the source lacks them; all of
/// them pass through the normalizer, so they arrive trimmed and stripped of
/// a single trailing `.` or `;`. The two dates are `None` whenever the
/// source text could not be parsed into a calendar date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Which adapter produced this record.
    pub source: Source,
    /// Source-provided unique identifier; the dedup key. Stable across
    /// re-crawls.
    pub natural_key: String,
    /// The record's detail-page location.
    pub canonical_url: String,
    /// Short classification strings from the listing entry.
    pub tags: Vec<String>,
    /// Direct PDF link, when the listing carried one.
    pub pdf_url: Option<String>,
    /// Alternate-format page link, when the listing carried one.
    pub alternate_format_url: Option<String>,
    pub title: String,
    pub abstract_text: String,
    pub authors: Vec<String>,
    /// Full subject classification text from the detail page.
    pub subjects: String,
    pub submitted_date: Option<NaiveDate>,
    pub announced_date: Option<NaiveDate>,
    /// Author-supplied comments line (page counts, venue notes).
    pub comments: String,
    /// Identifier variants usable for citation (id, versioned id, DOI).
    pub citation_markers: Vec<String>,
    /// Related DOI or other external identifier.
    pub related_identifier: String,
    /// Free-form entries from the references/citations block.
    pub references_and_citations: Vec<String>,
}

impl Record {
    /// Whether this record may be offered to the persistence sink.
    ///
    /// A record without a natural key can never be deduplicated, so it is
    /// dropped before it reaches the store.
    pub fn persistable(&self) -> bool {
        !self.natural_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> Record {
        Record {
            source: Source::Arxiv,
            natural_key: "arXiv:2005.12345".to_string(),
            canonical_url: "https://arxiv.org/abs/2005.12345".to_string(),
            tags: vec!["quant-ph".to_string()],
            pdf_url: Some("https://arxiv.org/pdf/2005.12345".to_string()),
            alternate_format_url: None,
            title: "A Test Title".to_string(),
            abstract_text: "An abstract".to_string(),
            authors: vec!["A. Author".to_string(), "B. Author".to_string()],
            subjects: "Quantum Physics (quant-ph)".to_string(),
            submitted_date: NaiveDate::from_ymd_opt(2020, 5, 12),
            announced_date: NaiveDate::from_ymd_opt(2020, 5, 1),
            comments: "12 pages, 3 figures".to_string(),
            citation_markers: vec!["arXiv:2005.12345".to_string()],
            related_identifier: String::new(),
            references_and_citations: vec![],
        }
    }

    #[test]
    fn test_record_round_trips_through_json() {
        let record = sample_record();
        let json = serde_json::to_string(&record).unwrap();
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back.natural_key, record.natural_key);
        assert_eq!(back.source, Source::Arxiv);
        assert_eq!(back.submitted_date, record.submitted_date);
        assert_eq!(back.authors.len(), 2);
    }

    #[test]
    fn test_source_serializes_lowercase() {
        let json = serde_json::to_string(&Source::Lens).unwrap();
        assert_eq!(json, "\"lens\"");
    }

    #[test]
    fn test_persistable_requires_natural_key() {
        let mut record = sample_record();
        assert!(record.persistable());
        record.natural_key.clear();
        assert!(!record.persistable());
    }

    #[test]
    fn test_absent_dates_serialize_as_null() {
        let mut record = sample_record();
        record.announced_date = None;
        let value = serde_json::to_value(&record).unwrap();
        assert!(value["announced_date"].is_null());
    }
}
