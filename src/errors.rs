//! Error types for fetching, persistence, and job-level failures.
//!
//! The taxonomy follows the run's recovery policy: per-page fetch failures
//! are absorbed by the page producer (skipped, logged, counted), while
//! malformed-request and destination failures propagate and terminate the
//! run.

use thiserror::Error;

/// Errors surfaced by a [`crate::producer::PageSource`] fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A single page failed after the source exhausted its retries.
    ///
    /// The page producer absorbs this variant: the page is recorded as
    /// failed and an empty batch is yielded in its place.
    #[error("page {page} failed after retries: {reason}")]
    PageFailed { page: u32, reason: String },

    /// The request could not be constructed at all. Fatal.
    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl FetchError {
    /// Whether the page producer may absorb this error and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FetchError::PageFailed { .. })
    }
}

/// Errors from the streaming file writers. All fatal for the run.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors from the keyed upsert store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be opened or reached. Fatal.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A batch write failed. Reported and counted; later batches proceed.
    #[error("store write failed: {0}")]
    Write(#[from] rusqlite::Error),

    #[error("record serialization failed: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Top-level error for a production run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
