//! Storage layer: idempotent project upserts, child collections, and the sync run log.

mod error;
mod memory;
mod rows;

pub use error::StoreError;
pub use memory::{MemoryStore, RunRecord, RunStatus};
pub use rows::{DocumentRow, PartyVoteRow, StageRow};

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;

use chrono::{DateTime, Utc};
use legislink_core::Project;

/// Whether an upsert created the project or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Counts recorded when a sync run finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records left after the limit and the skip-recent filter.
    pub scraped: usize,
    pub linked: usize,
    pub inserted: usize,
    pub updated: usize,
}

/// Persistence collaborator for unified projects.
///
/// Projects are keyed by government id. Child collections are keyed by
/// (government id, secondary key): stages by [`StageRow::key`], party votes
/// by party, documents by URL. An upsert replaces all of a project's child
/// rows. Upserting the same project twice leaves the store in the same state
/// as upserting it once.
pub trait ProjectStore {
    fn upsert_project(&mut self, project: &Project) -> Result<UpsertOutcome, StoreError>;

    /// When the project was last upserted, if ever.
    fn last_synced(&self, government_id: &str) -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Open a run-log entry and return its id.
    fn start_run(&mut self) -> Result<i64, StoreError>;

    fn finish_run(&mut self, run_id: i64, summary: &RunSummary) -> Result<(), StoreError>;

    fn fail_run(&mut self, run_id: i64, message: &str) -> Result<(), StoreError>;
}
