//! Command-line interface definitions for the scraper.
//!
//! Every flag overrides the matching key of the YAML config file (if one is
//! given), which in turn overrides the built-in defaults.

use crate::config::ScrapeConfig;
use clap::Parser;
use std::path::PathBuf;

/// Scrape media bias ratings into CSV and JSON snapshots.
///
/// # Examples
///
/// ```sh
/// # Defaults: writes mbfc_data.csv and mbfc_data.json in the current directory
/// mbfc_scrape
///
/// # Quick test run against a handful of sources per category
/// mbfc_scrape --max-per-category 5 --output-json /tmp/mbfc.json --output-csv /tmp/mbfc.csv
///
/// # Everything else from a config file
/// mbfc_scrape --config mbfc.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, env = "MBFC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output path for the CSV snapshot
    #[arg(long)]
    pub output_csv: Option<PathBuf>,

    /// Output path for the JSON snapshot (also the resume checkpoint)
    #[arg(long)]
    pub output_json: Option<PathBuf>,

    /// Site root the category paths are joined onto
    #[arg(long, env = "MBFC_BASE_URL")]
    pub base_url: Option<String>,

    /// Only scrape the first N sources of each category
    #[arg(short = 'n', long)]
    pub max_per_category: Option<usize>,

    /// Base delay in seconds between detail pages (jitter is added on top)
    #[arg(long)]
    pub request_delay: Option<f64>,

    /// Save a checkpoint after this many pages (0 disables mid-run saves)
    #[arg(long)]
    pub checkpoint_every: Option<usize>,

    /// Keep only sources from this country (case-insensitive)
    #[arg(long)]
    pub country: Option<String>,
}

impl Cli {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut ScrapeConfig) {
        if let Some(path) = &self.output_csv {
            config.output_csv = path.clone();
        }
        if let Some(path) = &self.output_json {
            config.output_json = path.clone();
        }
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(max) = self.max_per_category {
            config.max_per_category = Some(max);
        }
        if let Some(delay) = self.request_delay {
            config.request_pacing.base_secs = delay;
        }
        if let Some(every) = self.checkpoint_every {
            config.checkpoint_every = every;
        }
        if let Some(country) = &self.country {
            config.keep_country = country.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_defaults() {
        let cli = Cli::parse_from(["mbfc_scrape"]);
        let mut config = ScrapeConfig::default();
        cli.apply(&mut config);
        assert_eq!(config, ScrapeConfig::default());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "mbfc_scrape",
            "--output-json",
            "/tmp/out.json",
            "-n",
            "5",
            "--request-delay",
            "2.5",
            "--checkpoint-every",
            "10",
            "--country",
            "Canada",
        ]);
        let mut config = ScrapeConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.output_json, PathBuf::from("/tmp/out.json"));
        assert_eq!(config.output_csv, PathBuf::from("mbfc_data.csv"));
        assert_eq!(config.max_per_category, Some(5));
        assert_eq!(config.request_pacing.base_secs, 2.5);
        assert_eq!(config.checkpoint_every, 10);
        assert_eq!(config.keep_country, "Canada");
    }
}
