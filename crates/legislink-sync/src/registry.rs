//! Collaborator seams for the external registries.
//!
//! All calls are read-only. Any of them may fail with a [`FetchError`];
//! callers decide whether that is fatal (the bulk listing) or degrades to
//! missing data (everything else).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use legislink_core::{
    Committee, ProcessRecord, ProcessSummary, Publication, Rapporteur, SenatePosition,
    SourceRecord, TribunalCase, Voting,
};
use serde::Deserialize;
use tracing::info;

use crate::FetchError;

/// Bulk listing of government-stage drafts.
#[async_trait]
pub trait GovernmentSource: Send + Sync {
    async fn fetch_records(&self) -> Result<Vec<SourceRecord>, FetchError>;
}

/// The parliamentary process registry, addressed by print key and term.
///
/// Only search and detail are required; the auxiliary lookups default to
/// "nothing known" so a registry can leave them out.
#[async_trait]
pub trait ParliamentRegistry: Send + Sync {
    async fn search_candidates(
        &self,
        query: &str,
        term: u32,
        limit: usize,
    ) -> Result<Vec<ProcessSummary>, FetchError>;

    async fn fetch_process_detail(
        &self,
        print_key: &str,
        term: u32,
    ) -> Result<ProcessRecord, FetchError>;

    async fn fetch_committees(
        &self,
        _print_key: &str,
        _term: u32,
    ) -> Result<Vec<Committee>, FetchError> {
        Ok(Vec::new())
    }

    async fn fetch_rapporteurs(
        &self,
        _print_key: &str,
        _term: u32,
    ) -> Result<Vec<Rapporteur>, FetchError> {
        Ok(Vec::new())
    }

    async fn fetch_senate_position(
        &self,
        _print_key: &str,
        _term: u32,
    ) -> Result<Option<SenatePosition>, FetchError> {
        Ok(None)
    }

    async fn fetch_signature_date(
        &self,
        _print_key: &str,
        _term: u32,
    ) -> Result<Option<String>, FetchError> {
        Ok(None)
    }

    /// Final-passage voting with its per-party breakdown.
    async fn fetch_final_voting(
        &self,
        _print_key: &str,
        _term: u32,
    ) -> Result<Option<Voting>, FetchError> {
        Ok(None)
    }
}

/// Official journal lookups by publication key (e.g. `DU/2024/878`).
#[async_trait]
pub trait PublicationRegistry: Send + Sync {
    /// `Ok(None)` when no act is published under the key.
    async fn fetch_publication(&self, key: &str) -> Result<Option<Publication>, FetchError>;
}

/// Constitutional tribunal judgments concerning a published act.
#[async_trait]
pub trait TribunalRegistry: Send + Sync {
    async fn fetch_tribunal_cases(&self, key: &str) -> Result<Vec<TribunalCase>, FetchError>;
}

/// A government listing dumped to a JSON file.
///
/// Accepts either `{"projects": [...]}` or a bare array of records.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Listing {
    Wrapped { projects: Vec<SourceRecord> },
    Bare(Vec<SourceRecord>),
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl GovernmentSource for JsonFileSource {
    async fn fetch_records(&self) -> Result<Vec<SourceRecord>, FetchError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| FetchError::Io {
                path: self.path.clone(),
                source,
            })?;
        let records = match serde_json::from_str(&text)? {
            Listing::Wrapped { projects } => projects,
            Listing::Bare(records) => records,
        };
        info!(path = %self.path.display(), records = records.len(), "loaded government listing");
        Ok(records)
    }
}
