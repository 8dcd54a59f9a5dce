//! # MBFC Scrape
//!
//! A batch scraper that collects media bias and credibility ratings from
//! [Media Bias/Fact Check](https://mediabiasfactcheck.com), keeps the
//! US-based outlets, and writes them to CSV and JSON snapshots.
//!
//! ## Usage
//!
//! ```sh
//! mbfc_scrape --output-csv mbfc_data.csv --output-json mbfc_data.json
//! ```
//!
//! Re-running with the same outputs resumes: pages already in the snapshot
//! are not fetched again. Ctrl-C stops after the current page and saves.
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Collecting**: Read every category listing for source links
//! 2. **Extracting**: Fetch each source page and parse its rating fields (sequential, paced)
//! 3. **Checkpointing**: Save the result set every 25 pages
//! 4. **Finalizing**: Save once more, interrupted or not, and report counts

use clap::Parser;
use std::error::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod checkpoint;
mod cli;
mod config;
mod error;
mod fetcher;
mod html;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod utils;

use cli::Cli;
use config::ScrapeConfig;
use fetcher::{ReqwestTransport, RetryingFetcher};
use pipeline::Pipeline;
use utils::ensure_writable_parent;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("mbfc_scrape starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // --- Build configuration ---
    let mut config = match &args.config {
        Some(path) => ScrapeConfig::load(path).await?,
        None => ScrapeConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;
    info!(
        base_url = %config.base_url,
        categories = config.categories.len(),
        csv = %config.output_csv.display(),
        json = %config.output_json.display(),
        "Configuration ready"
    );

    // Early check: both outputs must be writable before hours of scraping
    for path in [&config.output_csv, &config.output_json] {
        if let Err(e) = ensure_writable_parent(path).await {
            error!(
                path = %path.display(),
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    // --- Ctrl-C trips the cancellation token; the pipeline saves and stops ---
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received; finishing up");
                on_signal.cancel();
            }
            Err(e) => error!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    let transport = ReqwestTransport::new(&config.fetch)?;
    let fetcher = RetryingFetcher::from_settings(transport, &config.fetch);
    let pipeline = Pipeline::new(config, fetcher, cancel)?;

    let summary = pipeline.run().await?;

    let elapsed = start_time.elapsed();
    info!(
        total_links = summary.total_links,
        kept = summary.kept,
        new = summary.newly_kept,
        dropped = summary.dropped,
        skipped = summary.skipped,
        errors = summary.errors,
        checkpoints = summary.checkpoints,
        interrupted = summary.interrupted,
        "Scraped {} sources",
        summary.kept
    );
    info!(
        csv = %summary.csv_path.display(),
        json = %summary.json_path.display(),
        processed = %pipeline.store().processed_path().display(),
        "Output written"
    );
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
