//! Canonical project model spanning both registries.

use serde::{Deserialize, Serialize};

use crate::phase::PhaseResolver;
use crate::source::{Document, ProcessRecord, SourceRecord};

/// Which registry a canonical [`Stage`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Government,
    Parliamentary,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Government => "government",
            Self::Parliamentary => "parliamentary",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteOutcome {
    Passed,
    Rejected,
}

impl VoteOutcome {
    /// A motion passes on a simple majority of cast yes/no votes.
    pub fn from_counts(yes: u32, no: u32) -> Self {
        if yes > no { Self::Passed } else { Self::Rejected }
    }
}

/// Tally for a single parliamentary club.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyVote {
    pub party: String,
    pub yes: u32,
    pub no: u32,
    pub abstain: u32,
    pub absent: u32,
}

impl PartyVote {
    pub fn total(&self) -> u32 {
        self.yes + self.no + self.abstain + self.absent
    }

    /// `"YES"`, `"NO"` or `"ABSTAIN"`, whichever the club cast most. Ties
    /// resolve in that order.
    pub fn dominant_vote(&self) -> &'static str {
        let mut best = ("YES", self.yes);
        for candidate in [("NO", self.no), ("ABSTAIN", self.abstain)] {
            if candidate.1 > best.1 {
                best = candidate;
            }
        }
        best.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voting {
    pub date: String,
    pub yes: u32,
    pub no: u32,
    pub abstain: u32,
    pub total: u32,
    pub result: VoteOutcome,
    pub sitting: Option<u32>,
    pub voting_number: Option<u32>,
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub by_party: Vec<PartyVote>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rapporteur {
    pub id: String,
    pub name: String,
}

/// One canonical timeline entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// Raw date in one of the three accepted formats, see
    /// [`timeline::parse_stage_date`](crate::timeline::parse_stage_date).
    pub date: Option<String>,
    pub origin: Origin,
    pub name: String,
    pub stage_type: Option<String>,
    pub is_active: bool,
    pub decision: Option<String>,
    pub committee_code: Option<String>,
    pub print_number: Option<String>,
    /// At most one voting result per stage.
    pub voting: Option<Voting>,
    #[serde(default)]
    pub documents: Vec<Document>,
    pub stage_number: Option<u32>,
    pub catalog_id: Option<String>,
    pub url: Option<String>,
    pub rapporteur: Option<Rapporteur>,
    pub proposal: Option<String>,
}

impl Stage {
    pub fn new(origin: Origin, name: impl Into<String>) -> Self {
        Self {
            date: None,
            origin,
            name: name.into(),
            stage_type: None,
            is_active: false,
            decision: None,
            committee_code: None,
            print_number: None,
            voting: None,
            documents: Vec::new(),
            stage_number: None,
            catalog_id: None,
            url: None,
            rapporteur: None,
            proposal: None,
        }
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Committee {
    pub code: String,
    pub name: String,
    pub chairman_name: Option<String>,
    pub chairman_party: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenatePosition {
    pub date: String,
    /// e.g. "bez poprawek", "wniósł poprawki", "odrzucił ustawę".
    pub position: String,
    pub print_number: Option<String>,
    /// The chamber's decision on the senate's position.
    pub decision: Option<String>,
}

/// Publication metadata from the official journal registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub publication_date: Option<String>,
    pub entry_into_force: Option<String>,
    pub publication_url: Option<String>,
    pub status: Option<String>,
    pub in_force: Option<String>,
}

/// A constitutional tribunal judgment referencing a published act.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TribunalCase {
    /// e.g. "K 16/24".
    pub case_number: String,
    pub judgment_date: String,
    /// SENTENCE, DECISION, RESOLUTION.
    pub judgment_type: String,
    pub registry_id: i64,
    /// `Some(false)` when the tribunal found the act unconstitutional.
    pub is_constitutional: Option<bool>,
}

/// Discrete lifecycle phase, always derived by [`PhaseResolver`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Government,
    Sejm,
    Senate,
    President,
    Published,
    Rejected,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Government => "government",
            Self::Sejm => "sejm",
            Self::Senate => "senate",
            Self::President => "president",
            Self::Published => "published",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a government draft was matched to a parliamentary process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMethod {
    /// No cross-reference key yet; nothing was searched.
    None,
    /// The candidate's embedded key equals the expected key.
    ExactVerified,
    /// First title hit, unverified.
    TitleFuzzy,
    NotFound,
}

impl LinkMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ExactVerified => "exact_verified",
            Self::TitleFuzzy => "title_fuzzy",
            Self::NotFound => "not_found",
        }
    }
}

/// Outcome of linking one government record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkResult {
    /// Extracted cross-reference key; empty when the record carries none.
    pub cross_reference: String,
    pub record: SourceRecord,
    pub process: Option<ProcessRecord>,
    pub print_key: Option<String>,
    pub term: Option<u32>,
    pub method: LinkMethod,
}

impl LinkResult {
    /// A record that has not reached the parliamentary registry, or whose
    /// linking was skipped.
    pub fn unlinked(cross_reference: Option<String>, record: SourceRecord) -> Self {
        Self {
            cross_reference: cross_reference.unwrap_or_default(),
            record,
            process: None,
            print_key: None,
            term: None,
            method: LinkMethod::None,
        }
    }

    pub fn not_found(cross_reference: String, record: SourceRecord) -> Self {
        Self {
            cross_reference,
            record,
            process: None,
            print_key: None,
            term: None,
            method: LinkMethod::NotFound,
        }
    }

    pub fn matched(
        cross_reference: String,
        record: SourceRecord,
        process: ProcessRecord,
        term: u32,
        method: LinkMethod,
    ) -> Self {
        Self {
            cross_reference,
            record,
            print_key: Some(process.number.clone()),
            process: Some(process),
            term: Some(term),
            method,
        }
    }

    pub fn is_linked(&self) -> bool {
        self.process.is_some()
    }
}

/// The canonical project aggregate persisted once per run.
///
/// `phase` is private: it can only change through [`Project::refresh_phase`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Project {
    pub government_id: String,
    pub cross_reference: Option<String>,
    pub print_key: Option<String>,
    pub term: Option<u32>,
    pub publication_key: Option<String>,

    pub title: String,
    pub description: Option<String>,
    pub initiator: Option<String>,
    pub document_type: String,
    pub creation_date: Option<String>,
    pub last_modified: Option<String>,
    pub government_status: Option<String>,
    pub government_url: Option<String>,
    pub parliament_url: Option<String>,
    pub link_method: Option<LinkMethod>,

    pub stages: Vec<Stage>,

    pub passed: Option<bool>,
    pub closure_date: Option<String>,
    pub voting: Option<Voting>,
    pub committees: Vec<Committee>,
    pub rapporteurs: Vec<Rapporteur>,
    pub senate_position: Option<SenatePosition>,
    pub signature_date: Option<String>,
    pub publication: Option<Publication>,
    pub publication_url: Option<String>,
    pub tribunal_cases: Vec<TribunalCase>,

    phase: Phase,
}

impl Project {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Recompute the phase from the other fields and store it.
    pub fn refresh_phase(&mut self, resolver: &PhaseResolver) -> Phase {
        self.phase = resolver.resolve(self);
        self.phase
    }

    /// Publication date, when the publication lookup supplied one.
    pub fn publication_date(&self) -> Option<&str> {
        self.publication
            .as_ref()
            .and_then(|p| p.publication_date.as_deref())
    }

    pub fn stages_from(&self, origin: Origin) -> impl Iterator<Item = &Stage> {
        self.stages.iter().filter(move |s| s.origin == origin)
    }

    /// Most recent active stage, else the last stage.
    pub fn current_stage(&self) -> Option<&Stage> {
        self.stages
            .iter()
            .rev()
            .find(|s| s.is_active)
            .or_else(|| self.stages.last())
    }
}
