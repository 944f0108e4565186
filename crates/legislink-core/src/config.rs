//! Pipeline configuration, loadable from a JSON file.
//!
//! Every field has a default, so an empty object (or no file at all) gives a
//! working configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::phase::PhaseKeywords;
use crate::query::DEFAULT_TITLE_PREFIXES;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Parliamentary terms to search, newest first.
    pub terms: Vec<u32>,
    /// Candidates verified per term and search.
    pub candidate_limit: usize,
    /// Words kept in a title query (clamped to 3..=5).
    pub query_words: usize,
    pub title_prefixes: Vec<String>,
    pub phase_keywords: PhaseKeywords,
    /// Run the auxiliary lookups (committees, publication, ...) when linked.
    pub enrich: bool,
    pub sejm_base_url: String,
    pub eli_base_url: String,
    pub saos_base_url: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            terms: vec![10, 9],
            candidate_limit: 10,
            query_words: 3,
            title_prefixes: DEFAULT_TITLE_PREFIXES.iter().map(|p| p.to_string()).collect(),
            phase_keywords: PhaseKeywords::default(),
            enrich: true,
            sejm_base_url: "https://api.sejm.gov.pl/sejm".to_string(),
            eli_base_url: "https://api.sejm.gov.pl/eli".to_string(),
            saos_base_url: "https://www.saos.org.pl/api".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}
