use std::path::PathBuf;

use legislink_store::StoreError;
use thiserror::Error;

/// A failed call to a registry collaborator.
///
/// Contained at the call site for candidate verification and enrichment;
/// fatal only for the initial government listing.
#[derive(Error, Debug)]
pub enum FetchError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid {what}: {value:?}")]
    Invalid { what: &'static str, value: String },
}

/// A run-aborting failure.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("fetching government records failed: {0}")]
    Source(#[source] FetchError),
    #[error("persisting project {government_id} failed after {processed} projects: {source}")]
    Store {
        government_id: String,
        processed: usize,
        #[source]
        source: StoreError,
    },
    #[error("sync run log unavailable: {0}")]
    RunLog(#[source] StoreError),
}

impl SyncError {
    /// Projects persisted before the run aborted.
    pub fn processed(&self) -> usize {
        match self {
            Self::Store { processed, .. } => *processed,
            Self::Source(_) | Self::RunLog(_) => 0,
        }
    }
}
