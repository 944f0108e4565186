//! In-memory [`ProjectStore`] for dry runs and tests.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use legislink_core::Project;

use crate::rows::{DocumentRow, PartyVoteRow, StageRow};
use crate::{ProjectStore, RunSummary, StoreError, UpsertOutcome};

#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Running,
    Finished(RunSummary),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub status: RunStatus,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    projects: BTreeMap<String, (Project, DateTime<Utc>)>,
    stages: BTreeMap<(String, String), StageRow>,
    party_votes: BTreeMap<(String, String), PartyVoteRow>,
    documents: BTreeMap<(String, String), DocumentRow>,
    runs: Vec<RunRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(&self, government_id: &str) -> Option<&Project> {
        self.projects.get(government_id).map(|(p, _)| p)
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    pub fn stages(&self, government_id: &str) -> Vec<&StageRow> {
        child_rows(&self.stages, government_id)
    }

    pub fn party_votes(&self, government_id: &str) -> Vec<&PartyVoteRow> {
        child_rows(&self.party_votes, government_id)
    }

    pub fn documents(&self, government_id: &str) -> Vec<&DocumentRow> {
        child_rows(&self.documents, government_id)
    }

    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }

    fn run_mut(&mut self, run_id: i64) -> Result<&mut RunRecord, StoreError> {
        self.runs
            .iter_mut()
            .find(|r| r.id == run_id)
            .ok_or(StoreError::UnknownRun(run_id))
    }
}

fn clear_children<V>(map: &mut BTreeMap<(String, String), V>, government_id: &str) {
    map.retain(|(id, _), _| id != government_id);
}

fn child_rows<'a, V>(map: &'a BTreeMap<(String, String), V>, government_id: &str) -> Vec<&'a V> {
    map.iter()
        .filter(|((id, _), _)| id == government_id)
        .map(|(_, v)| v)
        .collect()
}

impl ProjectStore for MemoryStore {
    fn upsert_project(&mut self, project: &Project) -> Result<UpsertOutcome, StoreError> {
        let id = project.government_id.clone();
        let stages = StageRow::from_project(project)?;
        clear_children(&mut self.stages, &id);
        clear_children(&mut self.party_votes, &id);
        clear_children(&mut self.documents, &id);
        for row in stages {
            self.stages.insert((id.clone(), row.key.clone()), row);
        }
        for row in PartyVoteRow::from_project(project) {
            self.party_votes.insert((id.clone(), row.party.clone()), row);
        }
        for row in DocumentRow::from_project(project) {
            self.documents.insert((id.clone(), row.url.clone()), row);
        }
        let previous = self.projects.insert(id, (project.clone(), Utc::now()));
        Ok(match previous {
            Some(_) => UpsertOutcome::Updated,
            None => UpsertOutcome::Inserted,
        })
    }

    fn last_synced(&self, government_id: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.projects.get(government_id).map(|(_, at)| *at))
    }

    fn start_run(&mut self) -> Result<i64, StoreError> {
        let id = self.runs.len() as i64 + 1;
        self.runs.push(RunRecord {
            id,
            started_at: Utc::now(),
            status: RunStatus::Running,
        });
        Ok(id)
    }

    fn finish_run(&mut self, run_id: i64, summary: &RunSummary) -> Result<(), StoreError> {
        self.run_mut(run_id)?.status = RunStatus::Finished(summary.clone());
        Ok(())
    }

    fn fail_run(&mut self, run_id: i64, message: &str) -> Result<(), StoreError> {
        self.run_mut(run_id)?.status = RunStatus::Failed(message.to_string());
        Ok(())
    }
}
