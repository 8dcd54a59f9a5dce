//! Source detail page scraper.
//!
//! A rating page is free-form HTML, so extraction works on the flattened
//! text with one `Label: value` pattern per field. Every field is
//! best-effort: a label that is missing or malformed leaves the field `None`
//! and never fails the page.
//!
//! # Source URL
//!
//! The outlet's homepage is recovered in two tiers, first match wins:
//! 1. an anchor whose text is byte-identical to its `href`, pointing off-site
//! 2. a `Source: https://...` line in the page text

use crate::error::FetchError;
use crate::fetcher::Fetcher;
use crate::html::{Anchor, Page};
use crate::models::{SourceLink, SourceRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};
use url::Url;

/// A `Label: value` field on the rating page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    BiasRating,
    FactualReporting,
    Country,
    FreedomRating,
    MediaType,
    Traffic,
    Credibility,
}

/// Label text for each field, as printed on the page. Matched case-insensitively.
pub const FIELD_LABELS: [(Field, &str); 7] = [
    (Field::BiasRating, "Bias Rating"),
    (Field::FactualReporting, "Factual Reporting"),
    (Field::Country, "Country"),
    (Field::FreedomRating, "Country Freedom Rating"),
    (Field::MediaType, "Media Type"),
    (Field::Traffic, "Traffic/Popularity"),
    (Field::Credibility, "MBFC Credibility Rating"),
];

static FIELD_PATTERNS: Lazy<Vec<(Field, Regex)>> = Lazy::new(|| {
    FIELD_LABELS
        .iter()
        .map(|(field, label)| (*field, label_pattern(label)))
        .collect()
});

static SOURCE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Source:\s*(https?://\S+)").unwrap());

static COMPOSITE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\s*\(([-0-9.]+)\)\s*$").unwrap());

fn label_pattern(label: &str) -> Regex {
    // `\s` spans newlines, so a label and its value may sit in different text nodes
    Regex::new(&format!(r"(?i){}\s*:\s*(.+)", regex::escape(label))).unwrap()
}

/// Value following the [`Field`]'s label in `text`, trimmed.
///
/// `None` if the label is absent or nothing but whitespace follows it.
pub fn extract_field(text: &str, field: Field) -> Option<String> {
    FIELD_PATTERNS
        .iter()
        .find(|(f, _)| *f == field)
        .and_then(|(_, re)| capture_value(re, text))
}

fn capture_value(re: &Regex, text: &str) -> Option<String> {
    let value = re.captures(text)?.get(1)?.as_str().trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Split `"LEFT (-5.3)"` into `("LEFT", Some(-5.3))`.
///
/// Only the last parenthesised group counts as the score. Anything that is
/// not `label (number)` comes back whole, trimmed, with no score.
pub fn parse_composite_field(value: &str) -> (String, Option<f64>) {
    let trimmed = value.trim();
    COMPOSITE
        .captures(trimmed)
        .and_then(|caps| {
            let score = caps[2].parse::<f64>().ok()?;
            Some((caps[1].trim().to_string(), Some(score)))
        })
        .unwrap_or_else(|| (trimmed.to_string(), None))
}

/// Recover the outlet's own homepage from a rating page.
pub fn recover_source_url(anchors: &[Anchor], text: &str, site: &Url) -> Option<String> {
    anchors
        .iter()
        .find(|a| !a.href.is_empty() && a.href == a.text && is_off_site(&a.href, site))
        .map(|a| a.href.clone())
        .or_else(|| {
            SOURCE_LINE
                .captures(text)
                .map(|caps| caps[1].trim().to_string())
        })
}

/// Whether `href` is an absolute http(s) URL on a host other than `site`'s.
fn is_off_site(href: &str, site: &Url) -> bool {
    let Ok(url) = Url::parse(href) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    match (url.host_str(), site.host_str()) {
        (Some(host), Some(own)) => {
            let host = host.trim_start_matches("www.");
            let own = own.trim_start_matches("www.");
            host != own && !host.ends_with(&format!(".{own}"))
        }
        (Some(_), None) => true,
        _ => false,
    }
}

/// Extract every rating field from a detail page.
///
/// `name`, `url` and `category` are left empty for the caller to fill in
/// from the listing link.
pub fn extract_record(body: &str, site: &Url) -> SourceRecord {
    let page = Page::parse(body);
    let text = page.text();

    let (bias_rating, bias_score) = split_composite(extract_field(&text, Field::BiasRating));
    let (factual_reporting, factual_score) =
        split_composite(extract_field(&text, Field::FactualReporting));

    SourceRecord {
        source_url: recover_source_url(&page.anchors(), &text, site),
        bias_rating,
        bias_score,
        factual_reporting,
        factual_score,
        country: extract_field(&text, Field::Country),
        freedom_rating: extract_field(&text, Field::FreedomRating),
        media_type: extract_field(&text, Field::MediaType),
        traffic: extract_field(&text, Field::Traffic),
        credibility: extract_field(&text, Field::Credibility),
        ..Default::default()
    }
}

fn split_composite(value: Option<String>) -> (Option<String>, Option<f64>) {
    match value {
        Some(v) => {
            let (label, score) = parse_composite_field(&v);
            (Some(label), score)
        }
        None => (None, None),
    }
}

/// Fetch one detail page and build its record, identity included.
///
/// # Arguments
///
/// * `fetcher` - Fetcher used for the detail request
/// * `link` - Listing link supplying `name`, `url` and `category`
/// * `site` - Site root, used to tell off-site anchors from internal ones
///
/// # Returns
///
/// The extracted [`SourceRecord`]. Missing fields are `None`; only the fetch itself can fail.
#[instrument(level = "info", skip_all, fields(url = %link.detail_url))]
pub async fn fetch_record<F: Fetcher>(
    fetcher: &F,
    link: &SourceLink,
    site: &Url,
) -> Result<SourceRecord, FetchError> {
    let body = fetcher.fetch(&link.detail_url).await?;
    let record = extract_record(&body, site).with_link(link);
    debug!(
        country = ?record.country,
        bias = ?record.bias_rating,
        source_url = ?record.source_url,
        "Parsed source page"
    );
    Ok(record)
}
