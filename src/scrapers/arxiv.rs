//! arXiv advanced-search scraper.
//!
//! The advanced-search interface truncates result counts per query, so full
//! coverage requires walking the cross product of subject facet × calendar
//! year × single-letter query seed. Subject facets are discovered once per
//! run from the advanced-search form itself.
//!
//! Within one (subject, year, letter) query, pages are walked by following
//! the explicit `pagination-next` link. When the link is missing but the
//! results header says more exist, the adapter hands back a cursor with the
//! result offset advanced by one page size; the driver decides whether to
//! take that fallback.
//!
//! Listing entries carry only partial fields, so every new record costs one
//! detail-page fetch for its abstract, subject classification, citation
//! markers, and references block. All HTML parsing happens in sync
//! functions over `&str` so it is testable offline.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE, USER_AGENT};
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::ArxivConfig;
use crate::errors::{AdapterError, SetupError};
use crate::models::{Record, Source};
use crate::normalize::{
    classify_resource_link, clean_list, clean_str, parse_date, split_date_fragments,
    ResourceKind,
};
use crate::scrapers::{Advance, CapPolicy, EntryPayload, ListingPage, RawEntry, SourceAdapter};

/// "Showing 1–200 of 12,345 results" in the listing header.
static TOTAL_RESULTS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"of\s+([\d,]+)\s+results").unwrap());

/// Position in the arXiv enumeration space.
#[derive(Debug, Clone)]
pub struct ArxivCursor {
    pub subject: String,
    pub year: i32,
    pub letter: char,
    /// Result offset within the (subject, year, letter) query.
    pub offset: usize,
    /// Explicit next-page link; overrides the constructed query URL.
    pub link: Option<String>,
}

pub struct ArxivAdapter {
    client: reqwest::Client,
    cfg: ArxivConfig,
}

impl ArxivAdapter {
    pub fn new(cfg: ArxivConfig) -> Result<Self, SetupError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_str(&cfg.accept)
                .map_err(|e| SetupError::Config(format!("accept header: {e}")))?,
        );
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&cfg.cookie)
                .map_err(|e| SetupError::Config(format!("cookie header: {e}")))?,
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&cfg.user_agent)
                .map_err(|e| SetupError::Config(format!("user-agent header: {e}")))?,
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self { client, cfg })
    }

    fn query_url(&self, cursor: &ArxivCursor) -> String {
        format!(
            "{base}/search/advanced?advanced=&terms-0-operator=AND&terms-0-term={letter}\
             &terms-0-field=all&{subject}=y&classification-physics_archives=all\
             &classification-include_cross_list=include&date-filter_by=specific_year\
             &date-year={year}&date-from_date=&date-to_date=&date-date_type=submitted_date\
             &abstracts=show&size={size}&order=-announced_date_first&start={offset}",
            base = self.cfg.base_url,
            letter = cursor.letter,
            subject = urlencoding::encode(&cursor.subject),
            year = cursor.year,
            size = self.cfg.page_size,
            offset = cursor.offset,
        )
    }
}

impl SourceAdapter for ArxivAdapter {
    type Cursor = ArxivCursor;

    fn source(&self) -> Source {
        Source::Arxiv
    }

    fn cap_policy(&self) -> CapPolicy {
        CapPolicy::SkipToNextSeed
    }

    /// Discover subject facets from the advanced-search form and cross them
    /// with the configured year range and the 26 letter seeds.
    #[instrument(level = "info", skip_all)]
    async fn seed_cursors(&self) -> Result<Vec<ArxivCursor>, AdapterError> {
        let url = format!("{}/search/advanced", self.cfg.base_url);
        let html = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let subjects = discover_subjects(&html);
        if subjects.is_empty() {
            return Err(AdapterError::Markup("subject facet checkboxes"));
        }

        let current_year = chrono::Datelike::year(&chrono::Utc::now().date_naive());
        let mut cursors = Vec::new();
        for subject in &subjects {
            for year in self.cfg.start_year..=current_year {
                for letter in 'a'..='z' {
                    cursors.push(ArxivCursor {
                        subject: subject.clone(),
                        year,
                        letter,
                        offset: 0,
                        link: None,
                    });
                }
            }
        }
        info!(
            subjects = subjects.len(),
            combinations = cursors.len(),
            "Discovered arXiv enumeration space"
        );
        Ok(cursors)
    }

    async fn fetch_listing_page(
        &self,
        cursor: &ArxivCursor,
    ) -> Result<ListingPage<ArxivCursor>, AdapterError> {
        let url = cursor
            .link
            .clone()
            .unwrap_or_else(|| self.query_url(cursor));
        debug!(%url, "Fetching listing page");
        let html = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_listing(&html, cursor, &self.cfg)
    }

    async fn extract_record(&self, entry: &RawEntry) -> Result<Record, AdapterError> {
        let EntryPayload::Html(fragment) = &entry.payload else {
            return Err(AdapterError::Markup("expected an html listing fragment"));
        };
        let detail_html = self
            .client
            .get(&entry.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(assemble_record(entry, fragment, &detail_html, &self.cfg))
    }
}

/// Pull the subject-facet ids off the advanced-search form.
///
/// The final checkbox toggles cross-listing, not a subject facet.
fn discover_subjects(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse("div.columns.is-baseline div.checkbox input").unwrap();
    let mut ids: Vec<String> = doc
        .select(&selector)
        .filter_map(|el| el.value().attr("id"))
        .map(str::to_string)
        .collect();
    ids.pop();
    ids
}

/// Parse one listing page into raw entries plus the advance decision.
fn parse_listing(
    html: &str,
    cursor: &ArxivCursor,
    cfg: &ArxivConfig,
) -> Result<ListingPage<ArxivCursor>, AdapterError> {
    let doc = Html::parse_document(html);
    let result_selector = Selector::parse("li.arxiv-result").unwrap();
    let title_link_selector = Selector::parse("p.list-title.is-inline-block a").unwrap();
    let next_selector = Selector::parse("a.pagination-next").unwrap();

    let mut entries = Vec::new();
    for item in doc.select(&result_selector) {
        let Some(link) = item.select(&title_link_selector).next() else {
            warn!(
                subject = %cursor.subject,
                year = cursor.year,
                "Listing item without a title link; skipping"
            );
            continue;
        };
        let natural_key = clean_str(&link.text().collect::<Vec<_>>().join(" "));
        let url = link
            .value()
            .attr("href")
            .map(|href| resolve_url(&cfg.base_url, href))
            .unwrap_or_default();
        entries.push(RawEntry {
            natural_key,
            url,
            payload: EntryPayload::Html(item.html()),
        });
    }

    let next_link = doc
        .select(&next_selector)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(|href| resolve_url(&cfg.base_url, href));

    let total = total_results(html);
    let advance = if let Some(link) = next_link {
        Advance::Next(ArxivCursor {
            offset: cursor.offset + cfg.page_size,
            link: Some(link),
            ..cursor.clone()
        })
    } else if total > cursor.offset + entries.len() {
        Advance::Fallback(ArxivCursor {
            offset: cursor.offset + cfg.page_size,
            link: None,
            ..cursor.clone()
        })
    } else {
        Advance::End
    };

    // A healthy page always carries either results, a results header, or
    // the explicit no-results notice. Anything else (error page, challenge
    // page) is transient and worth a retry.
    if entries.is_empty()
        && total == 0
        && matches!(advance, Advance::End)
        && !html.contains("returned no results")
    {
        return Err(AdapterError::Markup("result listing"));
    }

    Ok(ListingPage { entries, advance })
}

/// Total result count from the listing header, 0 when absent.
fn total_results(html: &str) -> usize {
    TOTAL_RESULTS_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
        .unwrap_or(0)
}

/// Build the full record from the listing fragment and the detail page.
///
/// Every selector miss degrades to an empty value through the normalizer;
/// a malformed item never aborts the record.
fn assemble_record(
    entry: &RawEntry,
    fragment: &str,
    detail_html: &str,
    cfg: &ArxivConfig,
) -> Record {
    let item = Html::parse_fragment(fragment);
    let detail = Html::parse_document(detail_html);

    let mut pdf_url = None;
    let mut alternate_format_url = None;
    for href in select_attrs(&item, "p.list-title.is-inline-block span a", "href") {
        let href = resolve_url(&cfg.base_url, &href);
        match classify_resource_link(&href) {
            Some(ResourceKind::Pdf) => {
                pdf_url.get_or_insert(href);
            }
            Some(ResourceKind::AlternateFormat) => {
                alternate_format_url.get_or_insert(href);
            }
            None => {}
        }
    }

    // exact class match: "comments is-size-7" must not shadow the date line
    let date_text = select_joined_text(&item, "p[class='is-size-7']", "|");
    let (submitted_raw, announced_raw) = split_date_fragments(&date_text);

    Record {
        source: Source::Arxiv,
        natural_key: entry.natural_key.clone(),
        canonical_url: entry.url.clone(),
        tags: clean_list(select_texts(&item, "div.tags.is-inline-block span")),
        pdf_url,
        alternate_format_url,
        title: clean_str(&select_text(&item, "p.title.is-5.mathjax")),
        abstract_text: clean_str(&select_text(&detail, "blockquote.abstract.mathjax")),
        authors: clean_list(select_texts(&item, "p.authors a")),
        subjects: clean_str(&select_text(&detail, "td.tablecell.subjects")),
        submitted_date: parse_date(&submitted_raw, &cfg.date_formats),
        announced_date: parse_date(&announced_raw, &cfg.date_formats),
        comments: clean_str(&select_text(
            &item,
            "p.comments.is-size-7 span.has-text-grey-dark.mathjax",
        )),
        citation_markers: clean_list([
            select_text(&detail, "td.tablecell.arxivid"),
            select_text(&detail, "td.tablecell.arxividv"),
            select_text(&detail, "td.tablecell.arxivdoi a"),
        ]),
        related_identifier: clean_str(&select_text(&detail, "td.tablecell.doi")),
        references_and_citations: clean_list(select_texts(&detail, "div.extra-ref-cite ul li")),
    }
}

fn resolve_url(base: &str, href: &str) -> String {
    match Url::parse(base).and_then(|b| b.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_string(),
    }
}

/// Text of the first element matching `selector`, joined across its text
/// nodes with single spaces. Empty string when nothing matches.
fn select_text(doc: &Html, selector: &str) -> String {
    let sel = Selector::parse(selector).unwrap();
    doc.select(&sel)
        .next()
        .map(|el| {
            el.text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

/// Text of every element matching `selector`, in document order.
fn select_texts(doc: &Html, selector: &str) -> Vec<String> {
    let sel = Selector::parse(selector).unwrap();
    doc.select(&sel)
        .map(|el| {
            el.text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// Attribute value of every element matching `selector`, in document order.
fn select_attrs(doc: &Html, selector: &str, attr: &str) -> Vec<String> {
    let sel = Selector::parse(selector).unwrap();
    doc.select(&sel)
        .filter_map(|el| el.value().attr(attr))
        .map(str::to_string)
        .collect()
}

/// Text nodes of the first element matching `selector`, trimmed, empties
/// dropped, joined by `sep`. Mirrors the shape the date line arrives in.
fn select_joined_text(doc: &Html, selector: &str, sep: &str) -> String {
    let sel = Selector::parse(selector).unwrap();
    doc.select(&sel)
        .next()
        .map(|el| {
            el.text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(sep)
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn cursor() -> ArxivCursor {
        ArxivCursor {
            subject: "classification-computer_science".to_string(),
            year: 2020,
            letter: 'a',
            offset: 0,
            link: None,
        }
    }

    const LISTING_WITH_NEXT: &str = r#"
    <html><body>
      <h1 class="title is-clearfix">Showing 1&ndash;200 of 1,234 results</h1>
      <ol>
        <li class="arxiv-result">
          <p class="list-title is-inline-block">
            <a href="https://arxiv.org/abs/2005.12345">arXiv:2005.12345</a>
            <span><a href="https://arxiv.org/pdf/2005.12345">pdf</a></span>
            <span><a href="https://arxiv.org/format/2005.12345">other</a></span>
          </p>
          <div class="tags is-inline-block"><span>quant-ph</span><span>cs.LG</span></div>
          <p class="title is-5 mathjax">An Amazing Result.</p>
          <p class="authors"><a>A. Author</a><a>B. Author</a></p>
          <p class="comments is-size-7">
            <span class="has-text-grey-dark mathjax">12 pages, 3 figures;</span>
          </p>
          <p class="is-size-7">
            <span class="has-text-black-bis has-text-weight-semibold">Submitted</span> 12 May, 2020;
            <span class="has-text-black-bis has-text-weight-semibold">originally announced</span> May 2020.
          </p>
        </li>
        <li class="arxiv-result">
          <p class="list-title is-inline-block">
            <a href="https://arxiv.org/abs/2005.54321">arXiv:2005.54321</a>
          </p>
        </li>
      </ol>
      <a class="pagination-next" href="/search/advanced?start=200">Next</a>
    </body></html>"#;

    const LISTING_NO_NEXT_MORE_RESULTS: &str = r#"
    <html><body>
      <h1 class="title is-clearfix">Showing 1&ndash;200 of 450 results</h1>
      <ol>
        <li class="arxiv-result">
          <p class="list-title is-inline-block">
            <a href="https://arxiv.org/abs/2005.11111">arXiv:2005.11111</a>
          </p>
        </li>
      </ol>
    </body></html>"#;

    const LISTING_NO_RESULTS: &str = r#"
    <html><body>
      <p>Sorry, your query returned no results</p>
    </body></html>"#;

    const DETAIL_PAGE: &str = r#"
    <html><body>
      <blockquote class="abstract mathjax">Abstract: We show a thing. </blockquote>
      <table>
        <tr><td class="tablecell subjects">Quantum Physics (quant-ph); Machine Learning (cs.LG)</td></tr>
        <tr><td class="tablecell arxivid">arXiv:2005.12345</td></tr>
        <tr><td class="tablecell arxividv">arXiv:2005.12345v2</td></tr>
        <tr><td class="tablecell arxivdoi"><a href="https://doi.org/10.1000/example">10.1000/example</a></td></tr>
        <tr><td class="tablecell doi">10.1000/related.</td></tr>
      </table>
      <div class="extra-ref-cite"><ul>
        <li>NASA ADS</li>
        <li>Semantic Scholar</li>
      </ul></div>
    </body></html>"#;

    #[test]
    fn test_parse_listing_extracts_entries_and_next_link() {
        let page = parse_listing(LISTING_WITH_NEXT, &cursor(), &ArxivConfig::default()).unwrap();
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].natural_key, "arXiv:2005.12345");
        assert_eq!(page.entries[0].url, "https://arxiv.org/abs/2005.12345");
        match page.advance {
            Advance::Next(next) => {
                assert_eq!(next.offset, 200);
                assert_eq!(
                    next.link.as_deref(),
                    Some("https://arxiv.org/search/advanced?start=200")
                );
            }
            other => panic!("expected Next, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_listing_falls_back_to_offset_when_link_missing() {
        let page = parse_listing(
            LISTING_NO_NEXT_MORE_RESULTS,
            &cursor(),
            &ArxivConfig::default(),
        )
        .unwrap();
        match page.advance {
            Advance::Fallback(next) => {
                // exactly one page size beyond the current offset
                assert_eq!(next.offset, 200);
                assert!(next.link.is_none());
            }
            other => panic!("expected Fallback, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_listing_ends_when_no_more_results_known() {
        let mut c = cursor();
        c.offset = 400;
        let page = parse_listing(LISTING_NO_NEXT_MORE_RESULTS, &c, &ArxivConfig::default())
            .unwrap();
        // 450 total, offset 400 + 1 entry seen = 401 < 450 would still
        // fall back; bump past the end to terminate.
        match page.advance {
            Advance::Fallback(_) => {}
            other => panic!("expected Fallback, got {other:?}"),
        }

        c.offset = 600;
        let page = parse_listing(LISTING_NO_NEXT_MORE_RESULTS, &c, &ArxivConfig::default())
            .unwrap();
        assert!(matches!(page.advance, Advance::End));
    }

    #[test]
    fn test_parse_listing_no_results_page_is_normal_end() {
        let page =
            parse_listing(LISTING_NO_RESULTS, &cursor(), &ArxivConfig::default()).unwrap();
        assert!(page.entries.is_empty());
        assert!(matches!(page.advance, Advance::End));
    }

    #[test]
    fn test_parse_listing_garbage_page_is_an_error() {
        let result = parse_listing(
            "<html><body>502 Bad Gateway</body></html>",
            &cursor(),
            &ArxivConfig::default(),
        );
        assert!(matches!(result, Err(AdapterError::Markup(_))));
    }

    #[test]
    fn test_total_results_handles_thousands_separator() {
        assert_eq!(total_results("of 1,234 results"), 1234);
        assert_eq!(total_results("of 42 results"), 42);
        assert_eq!(total_results("nothing here"), 0);
    }

    #[test]
    fn test_discover_subjects_drops_trailing_toggle() {
        let html = r#"
        <div class="columns is-baseline">
          <div class="checkbox"><input id="classification-computer_science"></div>
          <div class="checkbox"><input id="classification-physics"></div>
          <div class="checkbox"><input id="classification-include_cross_list"></div>
        </div>"#;
        let subjects = discover_subjects(html);
        assert_eq!(
            subjects,
            vec!["classification-computer_science", "classification-physics"]
        );
    }

    #[test]
    fn test_assemble_record_full_mapping() {
        let cfg = ArxivConfig::default();
        let page = parse_listing(LISTING_WITH_NEXT, &cursor(), &cfg).unwrap();
        let entry = &page.entries[0];
        let EntryPayload::Html(fragment) = &entry.payload else {
            panic!("expected html payload");
        };

        let record = assemble_record(entry, fragment, DETAIL_PAGE, &cfg);
        assert_eq!(record.source, Source::Arxiv);
        assert_eq!(record.natural_key, "arXiv:2005.12345");
        assert_eq!(record.title, "An Amazing Result");
        assert_eq!(record.tags, vec!["quant-ph", "cs.LG"]);
        assert_eq!(record.authors, vec!["A. Author", "B. Author"]);
        assert_eq!(record.pdf_url.as_deref(), Some("https://arxiv.org/pdf/2005.12345"));
        assert_eq!(
            record.alternate_format_url.as_deref(),
            Some("https://arxiv.org/format/2005.12345")
        );
        assert_eq!(record.comments, "12 pages, 3 figures");
        assert_eq!(record.abstract_text, "Abstract: We show a thing");
        assert_eq!(
            record.subjects,
            "Quantum Physics (quant-ph); Machine Learning (cs.LG)"
        );
        assert_eq!(record.submitted_date, NaiveDate::from_ymd_opt(2020, 5, 12));
        assert_eq!(record.announced_date, NaiveDate::from_ymd_opt(2020, 5, 1));
        assert_eq!(
            record.citation_markers,
            vec!["arXiv:2005.12345", "arXiv:2005.12345v2", "10.1000/example"]
        );
        assert_eq!(record.related_identifier, "10.1000/related");
        assert_eq!(
            record.references_and_citations,
            vec!["NASA ADS", "Semantic Scholar"]
        );
    }

    #[test]
    fn test_assemble_record_selector_misses_degrade_to_empty() {
        let cfg = ArxivConfig::default();
        let entry = RawEntry {
            natural_key: "arXiv:0000.00000".to_string(),
            url: "https://arxiv.org/abs/0000.00000".to_string(),
            payload: EntryPayload::Html("<li class=\"arxiv-result\"></li>".to_string()),
        };
        let record = assemble_record(&entry, "<li class=\"arxiv-result\"></li>", "<html></html>", &cfg);
        assert_eq!(record.title, "");
        assert_eq!(record.abstract_text, "");
        assert!(record.tags.is_empty());
        assert!(record.authors.is_empty());
        assert!(record.submitted_date.is_none());
        assert!(record.pdf_url.is_none());
        // the record itself survives with its key intact
        assert!(record.persistable());
    }

    #[test]
    fn test_query_url_carries_enumeration_parameters() {
        let adapter = ArxivAdapter::new(ArxivConfig::default()).unwrap();
        let url = adapter.query_url(&ArxivCursor {
            subject: "classification-computer_science".to_string(),
            year: 2015,
            letter: 'q',
            offset: 400,
            link: None,
        });
        assert!(url.contains("terms-0-term=q"));
        assert!(url.contains("classification-computer_science=y"));
        assert!(url.contains("date-year=2015"));
        assert!(url.contains("size=200"));
        assert!(url.contains("start=400"));
    }
}
