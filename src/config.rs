//! Run configuration for the scraper.
//!
//! A [`ScrapeConfig`] is built once at startup (defaults, then an optional
//! YAML file, then CLI overrides) and handed to the
//! [`Pipeline`](crate::pipeline::Pipeline). Nothing here is global.
//!
//! # Example YAML
//!
//! ```yaml
//! output_json: out/mbfc_data.json
//! max_per_category: 10
//! request_pacing:
//!   base_secs: 2.0
//! fetch:
//!   max_attempts: 5
//! ```

use crate::checkpoint::processed_path_for;
use crate::error::ConfigError;
use rand::{Rng, rng};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

/// A category listing page, e.g. `Left` at `/left/`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    pub name: String,
    pub path: String,
}

impl Category {
    fn new(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
        }
    }
}

/// A politeness pause: `base_secs` plus a uniform jitter in
/// `[jitter_min_secs, jitter_max_secs]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Pacing {
    pub base_secs: f64,
    pub jitter_min_secs: f64,
    pub jitter_max_secs: f64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            base_secs: 1.0,
            jitter_min_secs: 0.5,
            jitter_max_secs: 2.0,
        }
    }
}

impl Pacing {
    /// No pause at all.
    #[cfg(test)]
    pub const NONE: Pacing = Pacing {
        base_secs: 0.0,
        jitter_min_secs: 0.0,
        jitter_max_secs: 0.0,
    };

    /// Draw the next delay.
    pub fn next_delay(&self) -> Duration {
        let jitter = if self.jitter_max_secs > self.jitter_min_secs {
            rng().random_range(self.jitter_min_secs..=self.jitter_max_secs)
        } else {
            self.jitter_min_secs
        };
        Duration::try_from_secs_f64(self.base_secs + jitter).unwrap_or(Duration::ZERO)
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let values = [self.base_secs, self.jitter_min_secs, self.jitter_max_secs];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(ConfigError::Invalid(format!(
                "{name}: delays must be finite and non-negative"
            )));
        }
        Ok(())
    }
}

/// Retry and timeout settings for the HTTP fetcher.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Total attempts per URL, including the first.
    pub max_attempts: usize,
    /// Per-attempt timeout.
    pub timeout_secs: u64,
    /// After a 429, wait `rate_limit_step_secs * attempt`.
    pub rate_limit_step_secs: u64,
    /// After a transport error, wait `transport_backoff_secs * attempt`.
    pub transport_backoff_secs: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout_secs: 30,
            rate_limit_step_secs: 30,
            transport_backoff_secs: 1,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Everything the pipeline needs to know about a run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub base_url: String,
    /// Listing pages, scraped in this order.
    pub categories: Vec<Category>,
    /// `id` of the `<table>` holding the links on each listing page.
    pub listing_table_id: String,
    pub output_csv: PathBuf,
    pub output_json: PathBuf,
    /// Only records whose country equals this (ignoring case) are kept.
    pub keep_country: String,
    /// Truncate each category's link list; handy for test runs.
    pub max_per_category: Option<usize>,
    /// Save a checkpoint after this many attempted links. `0` disables mid-run saves.
    pub checkpoint_every: usize,
    /// Pause after every attempted detail page.
    pub request_pacing: Pacing,
    /// Pause after every category listing.
    pub category_pacing: Pacing,
    pub fetch: FetchSettings,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://mediabiasfactcheck.com".to_string(),
            categories: vec![Category::new("Left", "/left/"), Category::new("Right", "/right/")],
            listing_table_id: "mbfc-table".to_string(),
            output_csv: PathBuf::from("mbfc_data.csv"),
            output_json: PathBuf::from("mbfc_data.json"),
            keep_country: "USA".to_string(),
            max_per_category: None,
            checkpoint_every: 25,
            request_pacing: Pacing::default(),
            category_pacing: Pacing {
                base_secs: 3.0,
                jitter_min_secs: 1.0,
                jitter_max_secs: 2.0,
            },
            fetch: FetchSettings::default(),
        }
    }
}

impl ScrapeConfig {
    /// Parse a YAML document. Keys left out keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML config file.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::from_yaml_str(&yaml)?;
        info!(categories = config.categories.len(), "Loaded configuration file");
        Ok(config)
    }

    /// The site root every listing path is joined onto.
    pub fn base(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url)
            .map_err(|e| ConfigError::Invalid(format!("base_url {:?}: {e}", self.base_url)))
    }

    /// Absolute URL of a category listing page.
    pub fn category_url(&self, category: &Category) -> Result<Url, ConfigError> {
        self.base()?.join(&category.path).map_err(|e| {
            ConfigError::Invalid(format!("category {} path {:?}: {e}", category.name, category.path))
        })
    }

    /// Reject configurations that could only fail later, mid-run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base()?;
        for category in &self.categories {
            self.category_url(category)?;
        }
        if self.fetch.max_attempts == 0 {
            return Err(ConfigError::Invalid("fetch.max_attempts must be at least 1".into()));
        }
        if self.output_csv == self.output_json {
            return Err(ConfigError::Invalid("output_csv and output_json must differ".into()));
        }
        let sidecar = processed_path_for(&self.output_json);
        if sidecar == self.output_csv {
            return Err(ConfigError::Invalid(format!(
                "output_csv {} is the processed URL list of output_json",
                sidecar.display()
            )));
        }
        self.request_pacing.validate("request_pacing")?;
        self.category_pacing.validate("category_pacing")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScrapeConfig::default();
        config.validate().unwrap();
        assert_eq!(config.checkpoint_every, 25);
        assert_eq!(config.fetch.max_attempts, 3);
        assert_eq!(config.fetch.timeout_secs, 30);
    }

    #[test]
    fn test_category_url_joins_path() {
        let config = ScrapeConfig::default();
        let url = config.category_url(&config.categories[1]).unwrap();
        assert_eq!(url.as_str(), "https://mediabiasfactcheck.com/right/");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ScrapeConfig::from_yaml_str(
            "max_per_category: 10\nrequest_pacing:\n  base_secs: 2.5\nfetch:\n  max_attempts: 5\n",
        )
        .unwrap();

        assert_eq!(config.max_per_category, Some(10));
        assert_eq!(config.request_pacing.base_secs, 2.5);
        assert_eq!(config.request_pacing.jitter_max_secs, 2.0);
        assert_eq!(config.fetch.max_attempts, 5);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.categories.len(), 2);
    }

    #[test]
    fn test_yaml_categories_replace_defaults() {
        let config = ScrapeConfig::from_yaml_str(
            "categories:\n  - name: Center\n    path: /center/\n",
        )
        .unwrap();
        assert_eq!(config.categories, vec![Category::new("Center", "/center/")]);
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let config = ScrapeConfig::from_yaml_str(include_str!("../config.example.yaml")).unwrap();
        assert_eq!(config, ScrapeConfig::default());
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let config = ScrapeConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_csv_must_not_collide_with_sidecar() {
        let config = ScrapeConfig {
            output_csv: PathBuf::from("out/mbfc.processed.txt"),
            output_json: PathBuf::from("out/mbfc.json"),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_negative_delay_rejected() {
        let mut config = ScrapeConfig::default();
        config.request_pacing.base_secs = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pacing_stays_in_range() {
        let pacing = Pacing::default();
        for _ in 0..100 {
            let d = pacing.next_delay().as_secs_f64();
            assert!((1.499_999..=3.000_001).contains(&d), "{d}");
        }
        assert_eq!(Pacing::NONE.next_delay(), Duration::ZERO);
    }
}
