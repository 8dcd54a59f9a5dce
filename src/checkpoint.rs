//! Snapshot persistence and resume support.
//!
//! The JSON snapshot doubles as the checkpoint: on startup it is loaded into a
//! [`RecordSet`] keyed by rating-page URL, and every URL in it is treated as
//! already scraped. A missing or unreadable snapshot means "start fresh".
//!
//! URLs that were scraped but dropped by the country filter are not part of
//! either published snapshot, so they go to a plain-text sidecar next to the
//! JSON file (`<name>.processed.txt`, one URL per line). Between them the
//! snapshot and the sidecar cover every URL a later run should skip.
//!
//! Saves always write the full state: JSON first, then CSV, then the sidecar.

use crate::error::CheckpointError;
use crate::models::SourceRecord;
use crate::outputs;
use indexmap::{IndexMap, IndexSet};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

/// Kept records keyed by `url`, in first-seen order.
pub type RecordSet = IndexMap<String, SourceRecord>;

/// Everything a run knows about previously scraped pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Checkpoint {
    /// Records that passed the country filter; the published result set.
    pub kept: RecordSet,
    /// URLs scraped and then dropped by the country filter.
    pub dropped: IndexSet<String>,
}

impl Checkpoint {
    /// Whether `url` was already scraped, kept or not.
    pub fn is_processed(&self, url: &str) -> bool {
        self.kept.contains_key(url) || self.dropped.contains(url)
    }
}

/// Where the snapshots live.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    csv_path: PathBuf,
    json_path: PathBuf,
    processed_path: PathBuf,
}

impl CheckpointStore {
    pub fn new(csv_path: impl Into<PathBuf>, json_path: impl Into<PathBuf>) -> Self {
        let json_path = json_path.into();
        let processed_path = processed_path_for(&json_path);
        Self {
            csv_path: csv_path.into(),
            json_path,
            processed_path,
        }
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub fn json_path(&self) -> &Path {
        &self.json_path
    }

    pub fn processed_path(&self) -> &Path {
        &self.processed_path
    }

    /// Load the previous run's state. Never fails.
    pub async fn load(&self) -> Checkpoint {
        Checkpoint {
            kept: load_records(&self.json_path).await,
            dropped: load_url_list(&self.processed_path).await,
        }
    }

    /// Overwrite the snapshots and the sidecar with `checkpoint`.
    pub async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        save_records(&checkpoint.kept, &self.csv_path, &self.json_path).await?;
        let list: String = checkpoint
            .dropped
            .iter()
            .map(|url| format!("{url}\n"))
            .collect();
        write_file(&self.processed_path, list.into_bytes()).await
    }
}

/// Sidecar path for a JSON snapshot: `out/mbfc_data.json` -> `out/mbfc_data.processed.txt`.
pub fn processed_path_for(json_path: &Path) -> PathBuf {
    json_path.with_extension("processed.txt")
}

/// Read a one-URL-per-line sidecar. Missing or unreadable means empty.
async fn load_url_list(path: &Path) -> IndexSet<String> {
    match fs::read_to_string(path).await {
        Ok(text) => text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to read processed URL list; ignoring");
            }
            IndexSet::new()
        }
    }
}

/// Read a JSON snapshot into a [`RecordSet`].
///
/// Returns an empty set when the file does not exist, cannot be read, is not
/// an array of objects, or any object lacks a `url`. For duplicate URLs the
/// first position and the last value win.
///
/// # Arguments
///
/// * `json_path` - Path of a JSON snapshot written by [`save_records`]
///
/// # Returns
///
/// The kept records keyed by `url`, possibly empty. Never an error.
#[instrument(level = "info", fields(path = %json_path.display()))]
pub async fn load_records(json_path: &Path) -> RecordSet {
    let json = match fs::read_to_string(json_path).await {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No previous results found; starting fresh");
            return RecordSet::new();
        }
        Err(e) => {
            warn!(error = %e, "Failed to read previous results; starting fresh");
            return RecordSet::new();
        }
    };

    match outputs::json::parse_records(&json) {
        Ok(records) => {
            let set: RecordSet = records.into_iter().map(|r| (r.url.clone(), r)).collect();
            info!(count = set.len(), "Resuming from previous results");
            set
        }
        Err(e) => {
            warn!(error = %e, "Previous results are corrupt; starting fresh");
            RecordSet::new()
        }
    }
}

/// Write `records` as JSON to `json_path`, then as CSV to `csv_path`.
///
/// Both files are overwritten in full. If the JSON write fails the CSV is left untouched.
///
/// # Arguments
///
/// * `records` - The full result set, in output order
/// * `csv_path` - Destination of the CSV snapshot
/// * `json_path` - Destination of the JSON snapshot
///
/// # Returns
///
/// `Ok(())` once both files are written, or the first [`CheckpointError`].
#[instrument(level = "info", skip(records), fields(count = records.len()))]
pub async fn save_records(
    records: &RecordSet,
    csv_path: &Path,
    json_path: &Path,
) -> Result<(), CheckpointError> {
    let json = outputs::json::render_records(records.values())?;
    write_file(json_path, json).await?;

    let csv = outputs::csv::render_records(records.values())?;
    write_file(csv_path, csv).await?;

    info!(json = %json_path.display(), csv = %csv_path.display(), "Saved results");
    Ok(())
}

async fn write_file(path: &Path, contents: Vec<u8>) -> Result<(), CheckpointError> {
    fs::write(path, contents)
        .await
        .map_err(|source| CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        })
}
