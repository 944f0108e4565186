//! Flattening of a [`Project`] into child-collection rows.

use std::collections::HashSet;

use legislink_core::{Origin, Project};

use crate::StoreError;

/// One timeline entry, keyed within its project by [`key`](Self::key).
#[derive(Debug, Clone, PartialEq)]
pub struct StageRow {
    /// `government:<stage number>` or `parliamentary:<ordinal>`. Government
    /// stages without a number, or repeating one, use `government:#<position>`.
    pub key: String,
    /// Position in the merged timeline.
    pub ordinal: i64,
    pub origin: &'static str,
    pub name: String,
    pub stage_type: Option<String>,
    pub date: Option<String>,
    pub is_active: bool,
    pub decision: Option<String>,
    pub committee_code: Option<String>,
    pub print_number: Option<String>,
    pub catalog_id: Option<String>,
    pub url: Option<String>,
    pub rapporteur_id: Option<String>,
    pub rapporteur_name: Option<String>,
    pub proposal: Option<String>,
    pub voting_json: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyVoteRow {
    pub party: String,
    pub yes: i64,
    pub no: i64,
    pub abstain: i64,
    pub absent: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRow {
    pub url: String,
    pub stage_number: Option<i64>,
    pub filename: String,
    pub doc_type: Option<String>,
}

impl StageRow {
    pub fn from_project(project: &Project) -> Result<Vec<Self>, StoreError> {
        let mut parliamentary = 0usize;
        let mut numbers = HashSet::new();
        project
            .stages
            .iter()
            .enumerate()
            .map(|(i, stage)| {
                let key = match stage.origin {
                    Origin::Government => match stage.stage_number {
                        Some(n) if numbers.insert(n) => format!("government:{n}"),
                        _ => format!("government:#{}", i + 1),
                    },
                    Origin::Parliamentary => {
                        parliamentary += 1;
                        format!("parliamentary:{parliamentary}")
                    }
                };
                let voting_json = stage
                    .voting
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;
                Ok(Self {
                    key,
                    ordinal: i as i64,
                    origin: stage.origin.as_str(),
                    name: stage.name.clone(),
                    stage_type: stage.stage_type.clone(),
                    date: stage.date.clone(),
                    is_active: stage.is_active,
                    decision: stage.decision.clone(),
                    committee_code: stage.committee_code.clone(),
                    print_number: stage.print_number.clone(),
                    catalog_id: stage.catalog_id.clone(),
                    url: stage.url.clone(),
                    rapporteur_id: stage.rapporteur.as_ref().map(|r| r.id.clone()),
                    rapporteur_name: stage.rapporteur.as_ref().map(|r| r.name.clone()),
                    proposal: stage.proposal.clone(),
                    voting_json,
                })
            })
            .collect()
    }
}

impl PartyVoteRow {
    /// Per-party breakdown of the project's final voting.
    pub fn from_project(project: &Project) -> Vec<Self> {
        project
            .voting
            .iter()
            .flat_map(|v| v.by_party.iter())
            .map(|pv| Self {
                party: pv.party.clone(),
                yes: pv.yes.into(),
                no: pv.no.into(),
                abstain: pv.abstain.into(),
                absent: pv.absent.into(),
            })
            .collect()
    }
}

impl DocumentRow {
    /// Documents of all stages, first occurrence of each URL kept.
    pub fn from_project(project: &Project) -> Vec<Self> {
        let mut rows: Vec<Self> = Vec::new();
        for stage in &project.stages {
            for doc in &stage.documents {
                if rows.iter().any(|r| r.url == doc.url) {
                    continue;
                }
                rows.push(Self {
                    url: doc.url.clone(),
                    stage_number: stage.stage_number.map(i64::from),
                    filename: doc.filename.clone(),
                    doc_type: doc.doc_type.clone(),
                });
            }
        }
        rows
    }
}
