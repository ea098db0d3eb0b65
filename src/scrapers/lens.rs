//! Lens scholarly-works scraper.
//!
//! The Lens search API is only reachable after client-side execution, so
//! every page is fetched by a script running inside the automated browser
//! context, carrying the cookies the session captured at open. The walk is
//! a single page counter starting at 1; the first page that yields zero
//! works ends the run.
//!
//! Unlike the static listing, a Lens listing entry *is* the full record:
//! fields map directly from named JSON properties and no detail fetch is
//! needed.

use serde_json::Value;
use tracing::debug;

use crate::config::LensConfig;
use crate::errors::AdapterError;
use crate::models::{Record, Source};
use crate::normalize::{clean_list, clean_opt, clean_value, parse_date};
use crate::scrapers::{Advance, CapPolicy, EntryPayload, ListingPage, RawEntry, SourceAdapter};
use crate::session::BrowserSession;

/// Position in the Lens enumeration space: just the page number.
#[derive(Debug, Clone, Copy)]
pub struct PageCursor(pub u32);

pub struct LensAdapter {
    session: BrowserSession,
    cfg: LensConfig,
}

impl LensAdapter {
    pub fn new(session: BrowserSession, cfg: LensConfig) -> Self {
        Self { session, cfg }
    }

    /// Playwright script fetching one API page from within the page
    /// context, with the session cookies attached to the browser context.
    fn page_script(&self, page: u32) -> String {
        let api_url = format!(
            "{}?page={}&size={}",
            self.cfg.api_url, page, self.cfg.page_size
        );
        // serde_json renders the cookie string as a quoted JS literal
        let cookie_literal = serde_json::to_string(self.session.cookies())
            .unwrap_or_else(|_| "\"\"".to_string());
        format!(
            r#"
            const {{ chromium }} = require('playwright');
            (async () => {{
                const browser = await chromium.launch({{ headless: true }});
                const context = await browser.newContext({{
                    extraHTTPHeaders: {{ 'Cookie': {cookie_literal} }}
                }});
                const page = await context.newPage();
                await page.goto('{entry}', {{ waitUntil: 'domcontentloaded', timeout: 60000 }});
                const data = await page.evaluate(async (url) => {{
                    const res = await fetch(url, {{ credentials: 'include' }});
                    return await res.json();
                }}, '{api_url}');
                console.log(JSON.stringify(data));
                await browser.close();
            }})();
            "#,
            entry = self.session.entry_url(),
        )
    }
}

impl SourceAdapter for LensAdapter {
    type Cursor = PageCursor;

    fn source(&self) -> Source {
        Source::Lens
    }

    fn cap_policy(&self) -> CapPolicy {
        // A page-number walk has nothing reachable beyond an abandoned
        // position, so exhausting the cap ends the run.
        CapPolicy::EndRun
    }

    async fn seed_cursors(&self) -> Result<Vec<PageCursor>, AdapterError> {
        Ok(vec![PageCursor(1)])
    }

    async fn fetch_listing_page(
        &self,
        cursor: &PageCursor,
    ) -> Result<ListingPage<PageCursor>, AdapterError> {
        debug!(page = cursor.0, "Fetching Lens works page");
        let payload = self.session.run_script(&self.page_script(cursor.0)).await?;
        parse_works_page(&payload, *cursor)
    }

    async fn extract_record(&self, entry: &RawEntry) -> Result<Record, AdapterError> {
        let EntryPayload::Json(work) = &entry.payload else {
            return Err(AdapterError::Markup("expected a json work object"));
        };
        Ok(record_from_work(entry, work, &self.cfg))
    }
}

/// Turn one API response into raw entries plus the advance decision.
///
/// An empty `data` array is the normal end of the walk, not an error.
fn parse_works_page(
    payload: &Value,
    cursor: PageCursor,
) -> Result<ListingPage<PageCursor>, AdapterError> {
    let works = payload
        .get("data")
        .and_then(Value::as_array)
        .ok_or(AdapterError::Markup("data array"))?;

    let entries: Vec<RawEntry> = works
        .iter()
        .map(|work| {
            let natural_key = clean_opt(work.get("lens_id"));
            let url = {
                let external = clean_opt(work.get("external_url"));
                if external.is_empty() && !natural_key.is_empty() {
                    format!("https://www.lens.org/lens/scholar/article/{natural_key}/main")
                } else {
                    external
                }
            };
            RawEntry {
                natural_key,
                url,
                payload: EntryPayload::Json(work.clone()),
            }
        })
        .collect();

    let advance = if entries.is_empty() {
        Advance::End
    } else {
        Advance::Next(PageCursor(cursor.0 + 1))
    };

    Ok(ListingPage { entries, advance })
}

/// Map a work object straight onto the canonical record.
fn record_from_work(entry: &RawEntry, work: &Value, cfg: &LensConfig) -> Record {
    let authors = work
        .get("authors")
        .and_then(Value::as_array)
        .map(|authors| {
            clean_list(
                authors
                    .iter()
                    .map(|author| clean_opt(author.get("display_name"))),
            )
        })
        .unwrap_or_default();

    let mut citation_markers = Vec::new();
    if let Some(count) = work.get("scholarly_citations_count") {
        citation_markers.push(format!("scholarly citations: {}", clean_value(count)));
    }
    if let Some(count) = work.get("patent_citations_count") {
        citation_markers.push(format!("patent citations: {}", clean_value(count)));
    }

    let tags = work
        .get("fields_of_study")
        .and_then(Value::as_array)
        .map(|fields| clean_list(fields.iter().map(clean_value)))
        .unwrap_or_default();

    Record {
        source: Source::Lens,
        natural_key: entry.natural_key.clone(),
        canonical_url: entry.url.clone(),
        tags,
        pdf_url: None,
        alternate_format_url: None,
        title: clean_opt(work.get("title")),
        abstract_text: clean_opt(work.get("abstract")),
        authors,
        subjects: String::new(),
        submitted_date: parse_date(&clean_opt(work.get("date_published")), &cfg.date_formats),
        announced_date: None,
        comments: clean_opt(work.get("source_title")),
        citation_markers,
        related_identifier: clean_opt(work.get("doi")),
        references_and_citations: Vec::new(),
    }
}
