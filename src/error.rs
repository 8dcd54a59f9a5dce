//! Typed errors for fetching, checkpointing and configuration.
//!
//! Field extraction has no error type: a field that fails to match is simply
//! `None`. Page-level failures are [`FetchError`]s and never escape the link
//! being processed; only [`CheckpointError`] and [`ConfigError`] can end a run.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error produced by a [`Transport`](crate::fetcher::Transport).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by a [`Fetcher`](crate::fetcher::Fetcher).
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure or timeout on the final attempt.
    #[error("transport error for {url} after {attempts} attempts: {source}")]
    Transport {
        url: String,
        attempts: usize,
        #[source]
        source: BoxError,
    },

    /// Every attempt in the budget came back with HTTP 429.
    #[error("rate limited (429) on all {attempts} attempts for {url}")]
    RateLimited { url: String, attempts: usize },

    /// Any other non-2xx status. Never retried.
    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },
}

/// Errors writing the CSV/JSON snapshots.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors building the [`ScrapeConfig`](crate::config::ScrapeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
