//! Conversion of native stage entries into canonical [`Stage`]s.
//!
//! This is the only place the two heterogeneous native schemas are read;
//! everything downstream works on [`Stage`] and its [`Origin`] tag.

use tracing::debug;

use crate::model::{Origin, Rapporteur, Stage, VoteOutcome, Voting};
use crate::source::{
    GovernmentStageEntry, NativeStage, NativeVoting, ParliamentaryStageEntry, ProcessRecord,
    SourceRecord,
};

pub fn normalize(native: &NativeStage) -> Stage {
    match native {
        NativeStage::Government(entry) => government_stage(entry),
        NativeStage::Parliamentary(entry) => parliamentary_stage(entry),
    }
}

/// Direct field mapping; documents are carried through unchanged.
pub fn government_stage(entry: &GovernmentStageEntry) -> Stage {
    Stage {
        date: entry
            .start_date
            .clone()
            .or_else(|| entry.last_modified.clone()),
        stage_type: entry.stage_number.map(|n| format!("rcl_stage_{n}")),
        is_active: entry.is_active,
        documents: entry.documents.clone(),
        stage_number: entry.stage_number,
        catalog_id: entry.catalog_id.clone(),
        url: entry.catalog_url.clone(),
        ..Stage::new(Origin::Government, entry.stage_name.clone())
    }
}

/// Direct field mapping plus flattening of nested children.
///
/// Children are scanned in order. The last voting payload wins. Committee
/// code, rapporteur and proposal come from the stage itself when present,
/// otherwise from the last child that carries them.
pub fn parliamentary_stage(entry: &ParliamentaryStageEntry) -> Stage {
    let mut voting = None;
    let mut committee_code = None;
    let mut rapporteur = None;
    let mut proposal = None;
    let mut votings_seen = 0usize;

    for child in &entry.children {
        if let Some(v) = &child.voting {
            voting = Some(voting_from_native(v));
            votings_seen += 1;
        }
        if let Some(code) = child.committee_code.as_ref().filter(|c| !c.is_empty()) {
            committee_code = Some(code.clone());
        }
        if let (Some(id), Some(name)) = (&child.rapporteur_id, &child.rapporteur_name) {
            rapporteur = Some(Rapporteur {
                id: id.clone(),
                name: name.clone(),
            });
        }
        if let Some(p) = &child.proposal {
            proposal = Some(p.clone());
        }
    }
    if votings_seen > 1 {
        debug!(
            stage = %entry.stage_name,
            votings = votings_seen,
            "stage has several votings; keeping the last"
        );
    }

    Stage {
        date: entry.date.clone(),
        stage_type: entry.stage_type.clone(),
        // Parliamentary stages are historical records.
        is_active: false,
        decision: entry.decision.clone(),
        committee_code: entry.committee_code.clone().or(committee_code),
        print_number: entry.print_number.clone(),
        voting,
        rapporteur,
        proposal,
        ..Stage::new(Origin::Parliamentary, entry.stage_name.clone())
    }
}

pub fn voting_from_native(v: &NativeVoting) -> Voting {
    Voting {
        date: v.date.clone().unwrap_or_default(),
        yes: v.yes,
        no: v.no,
        abstain: v.abstain,
        total: v.total_voted,
        result: VoteOutcome::from_counts(v.yes, v.no),
        sitting: v.sitting,
        voting_number: v.voting_number,
        pdf_url: v.pdf_url().map(str::to_string),
        by_party: Vec::new(),
    }
}

pub fn government_stages(record: &SourceRecord) -> Vec<Stage> {
    record.stages.iter().map(government_stage).collect()
}

pub fn parliamentary_stages(process: &ProcessRecord) -> Vec<Stage> {
    process.stages.iter().map(parliamentary_stage).collect()
}
