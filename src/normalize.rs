//! Field normalization for raw extracted values.
//!
//! Sources embed metadata as inconsistently-shaped markup: sometimes a list
//! of nodes, sometimes a single delimited string, sometimes a structured API
//! field. This module absorbs those shapes so the per-source scrapers stay
//! declarative field mappings.
//!
//! Every function here is pure and total: malformed input degrades to an
//! empty string, an empty list, or `None`, never to a panic or an error.

use chrono::NaiveDate;
use chrono::format::{Parsed, StrftimeItems, parse};
use serde_json::Value;

/// Boilerplate fragments embedded in source markup around the real date and
/// citation tokens. Compared case-insensitively after cleaning.
const NOISE_TOKENS: &[&str] = &["", ",", "submitted", "originally announced"];

/// Which bucket a resource link belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Pdf,
    AlternateFormat,
}

/// Trim surrounding whitespace and strip a single trailing `.` or `;`.
///
/// This is the core every other cleaner funnels through.
pub fn clean_str(s: &str) -> String {
    let trimmed = s.trim();
    let stripped = trimmed
        .strip_suffix('.')
        .or_else(|| trimmed.strip_suffix(';'))
        .unwrap_or(trimmed);
    stripped.trim_end().to_string()
}

/// Clean a raw JSON value into its canonical string form.
///
/// Null maps to the empty string, numbers to their decimal form, arrays to
/// their cleaned elements joined by a single space. Anything without a
/// sensible text form (objects) degrades to the empty string.
pub fn clean_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => clean_str(s),
        Value::Number(n) => clean_str(&n.to_string()),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => {
            let joined = items
                .iter()
                .map(clean_value)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            clean_str(&joined)
        }
        Value::Object(_) => String::new(),
    }
}

/// Clean an optional JSON value; absent maps to the empty string.
pub fn clean_opt(value: Option<&Value>) -> String {
    value.map(clean_value).unwrap_or_default()
}

/// Clean every element and drop the noise tokens, preserving order.
pub fn clean_list<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|item| clean_str(item.as_ref()))
        .filter(|item| !NOISE_TOKENS.contains(&item.to_lowercase().as_str()))
        .collect()
}

/// Split a composite "submitted | announced" string into its two halves.
///
/// The announced field lags the submitted field on the static source and may
/// be absent for very recent items, in which case the second half is empty.
pub fn split_date_fragments(text: &str) -> (String, String) {
    let fragments = clean_list(text.split('|'));
    match fragments.len() {
        0 => (String::new(), String::new()),
        1 => (fragments[0].clone(), String::new()),
        _ => (
            fragments[0].clone(),
            fragments[fragments.len() - 1].clone(),
        ),
    }
}

/// Try each strftime format candidate in order and return the first parse
/// that succeeds, or `None` when every candidate fails.
///
/// Candidates without a day token (e.g. `"%B %Y"`) default the day to 1.
/// A fabricated date is never returned for unparseable text.
pub fn parse_date<S: AsRef<str>>(text: &str, formats: &[S]) -> Option<NaiveDate> {
    let text = clean_str(text);
    if text.is_empty() {
        return None;
    }
    for format in formats {
        let mut parsed = Parsed::new();
        if parse(&mut parsed, &text, StrftimeItems::new(format.as_ref())).is_err() {
            continue;
        }
        match parsed.to_naive_date() {
            Ok(date) => return Some(date),
            Err(_) => {
                // Month-year candidates leave the day unset.
                if parsed.set_day(1).is_ok() {
                    if let Ok(date) = parsed.to_naive_date() {
                        return Some(date);
                    }
                }
            }
        }
    }
    None
}

/// Bucket a resource URL by its path-segment marker.
///
/// `/pdf/` links are the article PDF, `/format/` links the alternate-format
/// page. Anything else is dropped from both buckets.
pub fn classify_resource_link(url: &str) -> Option<ResourceKind> {
    if url.contains("/pdf/") {
        Some(ResourceKind::Pdf)
    } else if url.contains("/format/") {
        Some(ResourceKind::AlternateFormat)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_str_trims_and_strips_trailing_punctuation() {
        assert_eq!(clean_str("  hello world. "), "hello world");
        assert_eq!(clean_str("quant-ph;"), "quant-ph");
        assert_eq!(clean_str("no punctuation"), "no punctuation");
        assert_eq!(clean_str(""), "");
    }

    #[test]
    fn test_clean_str_strips_only_one_trailing_marker() {
        // "et al." style strings keep their inner periods.
        assert_eq!(clean_str("J. R. R. Tolkien."), "J. R. R. Tolkien");
    }

    #[test]
    fn test_clean_value_is_total() {
        assert_eq!(clean_value(&Value::Null), "");
        assert_eq!(clean_value(&json!(42)), "42");
        assert_eq!(clean_value(&json!(2.5)), "2.5");
        assert_eq!(clean_value(&json!(["a", "b"])), "a b");
        assert_eq!(clean_value(&json!({"k": "v"})), "");
        assert_eq!(clean_opt(None), "");
    }

    #[test]
    fn test_clean_value_is_idempotent() {
        for input in [
            json!(null),
            json!(17),
            json!("  already clean  "),
            json!(["Submitted", "12 May, 2020"]),
        ] {
            let once = clean_value(&input);
            assert_eq!(clean_str(&once), once, "not idempotent for {input}");
        }
    }

    #[test]
    fn test_clean_list_drops_noise_tokens_and_preserves_order() {
        let cleaned = clean_list([
            "Submitted",
            "12 May, 2020",
            ",",
            "originally announced",
            "May 2020",
        ]);
        assert_eq!(cleaned, vec!["12 May, 2020", "May 2020"]);
    }

    #[test]
    fn test_clean_list_noise_match_is_case_insensitive() {
        let cleaned = clean_list(["SUBMITTED", "Originally Announced", "real token"]);
        assert_eq!(cleaned, vec!["real token"]);
    }

    #[test]
    fn test_clean_list_never_yields_empty_strings() {
        let cleaned = clean_list(["", "   ", ".", ";", "kept"]);
        assert!(cleaned.iter().all(|s| !s.is_empty()));
        assert_eq!(cleaned, vec!["kept"]);
    }

    #[test]
    fn test_split_date_fragments_two_halves() {
        let (submitted, announced) = split_date_fragments("12 May, 2020|May 2020");
        assert_eq!(submitted, "12 May, 2020");
        assert_eq!(announced, "May 2020");
    }

    #[test]
    fn test_split_date_fragments_missing_announced_half() {
        let (submitted, announced) = split_date_fragments("12 May, 2020");
        assert_eq!(submitted, "12 May, 2020");
        assert_eq!(announced, "");
    }

    #[test]
    fn test_split_date_fragments_filters_surrounding_noise() {
        let (submitted, announced) =
            split_date_fragments("Submitted|12 May, 2020|,|originally announced|May 2020");
        assert_eq!(submitted, "12 May, 2020");
        assert_eq!(announced, "May 2020");
    }

    #[test]
    fn test_parse_date_first_matching_candidate_wins() {
        let date = parse_date("12 May, 2020", &["%d %B, %Y", "%d %B %Y"]);
        assert_eq!(date, NaiveDate::from_ymd_opt(2020, 5, 12));
    }

    #[test]
    fn test_parse_date_month_year_defaults_day() {
        let date = parse_date("May 2020", &["%d %B, %Y", "%B %Y"]);
        assert_eq!(date, NaiveDate::from_ymd_opt(2020, 5, 1));
    }

    #[test]
    fn test_parse_date_unparseable_text_is_none() {
        assert_eq!(parse_date("not a date", &["%d %B, %Y", "%B %Y"]), None);
        assert_eq!(parse_date("", &["%d %B, %Y"]), None);
        let empty: &[&str] = &[];
        assert_eq!(parse_date("12 May, 2020", empty), None);
    }

    #[test]
    fn test_classify_resource_link() {
        assert_eq!(
            classify_resource_link("https://arxiv.org/pdf/2005.12345"),
            Some(ResourceKind::Pdf)
        );
        assert_eq!(
            classify_resource_link("https://arxiv.org/format/2005.12345"),
            Some(ResourceKind::AlternateFormat)
        );
        assert_eq!(classify_resource_link("https://arxiv.org/abs/2005.12345"), None);
    }
}
