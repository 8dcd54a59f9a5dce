//! Data models for listing links and scraped source ratings.
//!
//! This module defines the core data structures used throughout the application:
//! - [`SourceLink`]: A detail-page link discovered on a category listing
//! - [`SourceRecord`]: The persisted rating record for one media outlet
//! - [`FIELDNAMES`]: The published column order shared by the CSV and JSON outputs

use serde::{Deserialize, Serialize};

/// Column order of the published CSV, and key order of each JSON object.
///
/// Downstream consumers depend on this order; append new columns at the end.
pub const FIELDNAMES: [&str; 13] = [
    "name",
    "url",
    "category",
    "source_url",
    "bias_rating",
    "bias_score",
    "factual_reporting",
    "factual_score",
    "country",
    "freedom_rating",
    "media_type",
    "traffic",
    "credibility",
];

/// A detail-page link discovered in a category listing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLink {
    /// Display name of the outlet, as shown in the listing.
    pub name: String,
    /// Absolute URL of the outlet's rating page.
    pub detail_url: String,
    /// Name of the category the listing belongs to (e.g. "Left").
    pub category: String,
}

/// The rating record persisted for one media outlet.
///
/// `url` is the rating page URL and the dedup/resume key. Every other field
/// extracted from the page is best-effort and may be `None`.
///
/// Field order matters: it is the key order of the JSON output and must stay
/// in step with [`FIELDNAMES`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SourceRecord {
    #[serde(default)]
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub category: String,
    /// The outlet's own homepage, recovered from the rating page.
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub bias_rating: Option<String>,
    #[serde(default)]
    pub bias_score: Option<f64>,
    #[serde(default)]
    pub factual_reporting: Option<String>,
    #[serde(default)]
    pub factual_score: Option<f64>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub freedom_rating: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub traffic: Option<String>,
    #[serde(default)]
    pub credibility: Option<String>,
}

impl SourceRecord {
    /// Copy the listing-side identity (name, url, category) onto an extracted record.
    pub fn with_link(mut self, link: &SourceLink) -> Self {
        self.name = link.name.clone();
        self.url = link.detail_url.clone();
        self.category = link.category.clone();
        self
    }

    /// Whether the record's country matches `country`, ignoring ASCII case.
    ///
    /// A record without a country never matches.
    pub fn is_from(&self, country: &str) -> bool {
        self.country
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(country))
    }

    /// Render the record as CSV cells in [`FIELDNAMES`] order.
    ///
    /// Missing values become empty strings.
    pub fn to_row(&self) -> [String; 13] {
        fn text(v: &Option<String>) -> String {
            v.clone().unwrap_or_default()
        }
        fn score(v: &Option<f64>) -> String {
            v.and_then(format_score).unwrap_or_default()
        }

        [
            self.name.clone(),
            self.url.clone(),
            self.category.clone(),
            text(&self.source_url),
            text(&self.bias_rating),
            score(&self.bias_score),
            text(&self.factual_reporting),
            score(&self.factual_score),
            text(&self.country),
            text(&self.freedom_rating),
            text(&self.media_type),
            text(&self.traffic),
            text(&self.credibility),
        ]
    }
}

/// Format a score exactly as the JSON output renders it (`5.0`, `1e-7`).
///
/// Non-finite values have no JSON number form and render as `None`.
pub fn format_score(v: f64) -> Option<String> {
    serde_json::Number::from_f64(v).map(|n| n.to_string())
}
