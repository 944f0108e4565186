//! Native records as delivered by the two registries.
//!
//! Government-stage records come from the pre-parliamentary registry dump
//! (snake_case keys). Parliamentary records follow the Sejm API wire format
//! (camelCase keys). Both are ephemeral: fetched fresh on every run and
//! converted to canonical [`Stage`](crate::Stage)s at the normaliser boundary.

use serde::{Deserialize, Deserializer, Serialize};

use crate::model::{Rapporteur, SenatePosition};

/// A draft as listed by the government-stage registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Government registry identifier; the upsert key for the whole project.
    #[serde(alias = "project_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub initiator: Option<String>,
    /// Free-text link to the parliamentary registry. Carries the
    /// cross-reference key once the draft has been submitted.
    #[serde(default, alias = "sejm_url")]
    pub parliament_url: Option<String>,
    #[serde(default)]
    pub stages: Vec<GovernmentStageEntry>,
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub modification_date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "project_type_name")]
    pub document_type: Option<String>,
}

/// One step of the government-stage procedure (consultations, opinions, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GovernmentStageEntry {
    #[serde(default)]
    pub stage_number: Option<u32>,
    #[serde(default)]
    pub stage_name: String,
    #[serde(default, alias = "katalog_id")]
    pub catalog_id: Option<String>,
    #[serde(default, alias = "katalog_url")]
    pub catalog_url: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub documents: Vec<Document>,
}

/// A document attached to a government stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub doc_type: Option<String>,
}

/// A search hit from the parliamentary registry. Carries no cross-reference
/// key: verification needs the full [`ProcessRecord`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSummary {
    pub number: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub term: Option<u32>,
    #[serde(default)]
    pub document_date: Option<String>,
}

/// A legislative process in the parliamentary registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRecord {
    /// Print key.
    pub number: String,
    #[serde(default)]
    pub term: Option<u32>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub passed: Option<bool>,
    #[serde(default)]
    pub closure_date: Option<String>,
    #[serde(default)]
    pub change_date: Option<String>,
    /// Embedded cross-reference key back to the government-stage registry.
    #[serde(default)]
    pub rcl_num: Option<String>,
    /// Publication key, present once the act has been published.
    #[serde(default, rename = "ELI")]
    pub eli: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub stages: Vec<ParliamentaryStageEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default)]
    pub rel: String,
}

/// A top-level stage of a parliamentary process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParliamentaryStageEntry {
    #[serde(default)]
    pub stage_name: String,
    #[serde(default)]
    pub stage_type: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub decision: Option<String>,
    #[serde(default)]
    pub committee_code: Option<String>,
    #[serde(default)]
    pub print_number: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub children: Vec<StageChild>,
}

/// A nested entry under a parliamentary stage: committee referral, report,
/// or a voting event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageChild {
    #[serde(default)]
    pub stage_name: Option<String>,
    #[serde(default)]
    pub stage_type: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub committee_code: Option<String>,
    #[serde(
        default,
        rename = "rapporteurID",
        deserialize_with = "string_or_number"
    )]
    pub rapporteur_id: Option<String>,
    #[serde(default)]
    pub rapporteur_name: Option<String>,
    #[serde(default)]
    pub proposal: Option<String>,
    #[serde(default)]
    pub voting: Option<NativeVoting>,
}

/// A voting payload as embedded in a stage child.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeVoting {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub yes: u32,
    #[serde(default)]
    pub no: u32,
    #[serde(default)]
    pub abstain: u32,
    #[serde(default)]
    pub not_participating: u32,
    #[serde(default)]
    pub total_voted: u32,
    #[serde(default)]
    pub sitting: Option<u32>,
    #[serde(default)]
    pub voting_number: Option<u32>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl NativeVoting {
    pub fn pdf_url(&self) -> Option<&str> {
        find_link(&self.links, "pdf")
    }
}

/// The closed set of native stage shapes, converted once by
/// [`normalize::normalize`](crate::normalize::normalize).
#[derive(Debug, Clone, PartialEq)]
pub enum NativeStage {
    Government(GovernmentStageEntry),
    Parliamentary(ParliamentaryStageEntry),
}

impl ProcessRecord {
    /// Link with the given `rel`, e.g. `"eli"` for the publication page.
    pub fn link(&self, rel: &str) -> Option<&str> {
        find_link(&self.links, rel)
    }

    /// Committee codes mentioned on stages and their children, first-seen order.
    pub fn committee_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = Vec::new();
        let nested = self.stages.iter().flat_map(|stage| {
            std::iter::once(stage.committee_code.as_deref())
                .chain(stage.children.iter().map(|c| c.committee_code.as_deref()))
        });
        for code in nested.flatten() {
            if !code.is_empty() && !codes.iter().any(|c| c == code) {
                codes.push(code.to_string());
            }
        }
        codes
    }

    /// Rapporteurs named on stage children, deduplicated by id.
    pub fn rapporteurs(&self) -> Vec<Rapporteur> {
        let mut out: Vec<Rapporteur> = Vec::new();
        for child in self.stages.iter().flat_map(|s| s.children.iter()) {
            if let (Some(id), Some(name)) = (&child.rapporteur_id, &child.rapporteur_name)
                && !out.iter().any(|r| &r.id == id)
            {
                out.push(Rapporteur {
                    id: id.clone(),
                    name: name.clone(),
                });
            }
        }
        out
    }

    /// The senate's position, with the chamber's follow-up decision attached
    /// when the position was considered.
    pub fn senate_position(&self) -> Option<SenatePosition> {
        let mut position: Option<SenatePosition> = None;
        let mut decision: Option<String> = None;
        for stage in &self.stages {
            match stage.stage_type.as_deref() {
                Some("SenatePosition") => {
                    position = Some(SenatePosition {
                        date: stage.date.clone().unwrap_or_default(),
                        position: stage.position.clone().unwrap_or_default(),
                        print_number: stage.print_number.clone(),
                        decision: None,
                    });
                }
                Some("SenatePositionConsideration") => decision = stage.decision.clone(),
                _ => {}
            }
        }
        position.map(|p| SenatePosition { decision, ..p })
    }

    /// Date of the presidential signature, if the process reached it.
    pub fn signature_date(&self) -> Option<String> {
        self.stages
            .iter()
            .find(|s| s.stage_type.as_deref() == Some("PresidentSignature"))
            .and_then(|s| s.date.clone())
    }
}

fn find_link<'a>(links: &'a [Link], rel: &str) -> Option<&'a str> {
    links
        .iter()
        .find(|l| l.rel == rel)
        .map(|l| l.href.as_str())
}

/// The registry emits some identifiers as numbers and some as strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(i64),
    }
    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Str(s)) if !s.is_empty() => Some(s),
        Some(Raw::Num(n)) => Some(n.to_string()),
        _ => None,
    })
}
