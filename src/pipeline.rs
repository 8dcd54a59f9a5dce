//! The two-phase scrape driver.
//!
//! A run moves through [`Phase`]s strictly forward:
//!
//! ```text
//! CollectingLinks -> ExtractingRecords -> Finalizing -> Done
//! ```
//!
//! 1. **CollectingLinks**: fetch each category listing, gather every source link
//! 2. **ExtractingRecords**: fetch each detail page not yet processed, filter by country
//! 3. **Finalizing**: save the full result set, whatever happened before
//! 4. **Done**: report the [`RunSummary`]
//!
//! Requests are strictly sequential and paced. A page or category that fails
//! is counted and logged, never fatal. Cancelling the token skips straight to
//! `Finalizing`.

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::config::{Pacing, ScrapeConfig};
use crate::error::{CheckpointError, ConfigError};
use crate::fetcher::Fetcher;
use crate::models::SourceLink;
use crate::scrapers::{category, source};
use std::path::PathBuf;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Stage of a run. Only ever advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    CollectingLinks,
    ExtractingRecords,
    Finalizing,
    Done,
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Links gathered from all category listings.
    pub total_links: usize,
    /// Records in the final result set, including ones loaded from a previous run.
    pub kept: usize,
    /// Records added to the result set by this run.
    pub newly_kept: usize,
    /// Pages scraped this run whose country did not match.
    pub dropped: usize,
    /// Links skipped because their URL was already processed.
    pub skipped: usize,
    /// Pages that failed to fetch.
    pub errors: usize,
    /// Checkpoints saved mid-run (the final save is not counted).
    pub checkpoints: usize,
    /// Whether the run was cancelled before all links were processed.
    pub interrupted: bool,
    pub csv_path: PathBuf,
    pub json_path: PathBuf,
}

struct RunState {
    phase: Phase,
    checkpoint: Checkpoint,
    summary: RunSummary,
    /// Links attempted this run, successful or not. Drives the checkpoint cadence.
    attempted: usize,
}

impl RunState {
    fn enter(&mut self, next: Phase) {
        debug_assert!(next > self.phase, "phase went backwards: {:?} -> {next:?}", self.phase);
        info!(from = ?self.phase, to = ?next, "Entering phase");
        self.phase = next;
    }

    fn interrupt(&mut self) {
        if !self.summary.interrupted {
            warn!("Interrupted; saving progress");
        }
        self.summary.interrupted = true;
    }
}

/// Drives one scrape run against a [`Fetcher`].
pub struct Pipeline<F> {
    config: ScrapeConfig,
    site: Url,
    fetcher: F,
    store: CheckpointStore,
    cancel: CancellationToken,
}

impl<F: Fetcher> Pipeline<F> {
    /// Validate `config` and set up the checkpoint store at its output paths.
    pub fn new(config: ScrapeConfig, fetcher: F, cancel: CancellationToken) -> Result<Self, ConfigError> {
        config.validate()?;
        let site = config.base()?;
        let store = CheckpointStore::new(&config.output_csv, &config.output_json);
        Ok(Self {
            config,
            site,
            fetcher,
            store,
            cancel,
        })
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Run both phases and always finish with a full save.
    ///
    /// Only a failed save ends the run early; the final save is still
    /// attempted, and the first save error is returned.
    #[instrument(level = "info", skip_all)]
    pub async fn run(&self) -> Result<RunSummary, CheckpointError> {
        let mut run = RunState {
            phase: Phase::CollectingLinks,
            checkpoint: self.store.load().await,
            summary: RunSummary {
                csv_path: self.store.csv_path().to_path_buf(),
                json_path: self.store.json_path().to_path_buf(),
                ..Default::default()
            },
            attempted: 0,
        };
        info!(
            kept = run.checkpoint.kept.len(),
            dropped = run.checkpoint.dropped.len(),
            "Loaded previous progress"
        );

        let links = self.collect_links(&mut run).await;
        run.summary.total_links = links.len();
        info!(total = links.len(), "Total sources found");

        let extracted = if run.summary.interrupted {
            Ok(())
        } else {
            run.enter(Phase::ExtractingRecords);
            self.extract_records(&links, &mut run).await
        };

        run.enter(Phase::Finalizing);
        let saved = self.store.save(&run.checkpoint).await;
        if let Err(e) = &saved {
            error!(error = %e, "Final save failed");
        }

        run.enter(Phase::Done);
        run.summary.kept = run.checkpoint.kept.len();
        extracted?;
        saved?;
        Ok(run.summary)
    }

    async fn collect_links(&self, run: &mut RunState) -> Vec<SourceLink> {
        let mut all = Vec::new();
        let categories = &self.config.categories;

        for (i, cat) in categories.iter().enumerate() {
            let url = match self.config.category_url(cat) {
                Ok(url) => url,
                Err(e) => {
                    error!(category = %cat.name, error = %e, "Bad category URL; skipping");
                    continue;
                }
            };
            info!(category = %cat.name, %url, "Fetching category");

            let fetched = category::index_category(&self.fetcher, &url, &self.config.listing_table_id, &cat.name);
            match self.until_cancelled(fetched).await {
                None => {
                    run.interrupt();
                    break;
                }
                Some(Ok(mut links)) => {
                    if let Some(max) = self.config.max_per_category {
                        links.truncate(max);
                    }
                    info!(category = %cat.name, count = links.len(), "Found sources");
                    all.extend(links);
                }
                Some(Err(e)) => {
                    error!(category = %cat.name, error = %e, "Category fetch failed; continuing");
                }
            }

            if i + 1 < categories.len() && !self.pause(&self.config.category_pacing).await {
                run.interrupt();
                break;
            }
        }
        all
    }

    async fn extract_records(&self, links: &[SourceLink], run: &mut RunState) -> Result<(), CheckpointError> {
        let total = links.len();

        for (i, link) in links.iter().enumerate() {
            if self.cancel.is_cancelled() {
                run.interrupt();
                break;
            }
            if run.checkpoint.is_processed(&link.detail_url) {
                run.summary.skipped += 1;
                continue;
            }

            info!("[{}/{}] {}", i + 1, total, link.name);
            let fetched = source::fetch_record(&self.fetcher, link, &self.site);
            let Some(result) = self.until_cancelled(fetched).await else {
                run.interrupt();
                break;
            };

            match result {
                Ok(record) if record.is_from(&self.config.keep_country) => {
                    run.checkpoint.kept.insert(record.url.clone(), record);
                    run.summary.newly_kept += 1;
                }
                Ok(record) => {
                    debug!(url = %record.url, country = ?record.country, "Dropped by country filter");
                    run.checkpoint.dropped.insert(record.url);
                    run.summary.dropped += 1;
                }
                Err(e) => {
                    error!(url = %link.detail_url, error = %e, "Source page failed");
                    run.summary.errors += 1;
                }
            }
            run.attempted += 1;

            let every = self.config.checkpoint_every;
            if every > 0 && run.attempted % every == 0 {
                self.store.save(&run.checkpoint).await?;
                run.summary.checkpoints += 1;
                info!(kept = run.checkpoint.kept.len(), "Progress saved");
            }

            if !self.pause(&self.config.request_pacing).await {
                run.interrupt();
                break;
            }
        }
        Ok(())
    }

    /// Await `fut` unless the run is cancelled first.
    async fn until_cancelled<T>(&self, fut: impl Future<Output = T>) -> Option<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            out = fut => Some(out),
        }
    }

    /// Sleep for the next paced delay. Returns `false` if cancelled meanwhile.
    async fn pause(&self, pacing: &Pacing) -> bool {
        let delay = pacing.next_delay();
        debug!(?delay, "Pausing");
        self.until_cancelled(sleep(delay)).await.is_some()
    }
}
