//! Sejm API client (`https://api.sejm.gov.pl/sejm`).

use std::collections::BTreeMap;

use async_trait::async_trait;
use legislink_core::{
    Committee, PartyVote, ProcessRecord, ProcessSummary, Rapporteur, SenatePosition, VoteOutcome,
    Voting, source::Link,
};
use serde::Deserialize;
use tracing::{info, warn};

use super::JsonClient;
use crate::{FetchError, ParliamentRegistry};

const DOCUMENT_TYPE: &str = "projekt ustawy";
const CHAIRMAN: &str = "przewodniczący";
/// Marks the final-passage voting ("głosowanie nad całością projektu").
const FINAL_VOTING_MARKER: &str = "całość";

pub struct SejmClient {
    http: JsonClient,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitteeDetail {
    code: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    members: Vec<CommitteeMember>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitteeMember {
    #[serde(default)]
    last_first_name: String,
    #[serde(default)]
    club: Option<String>,
    #[serde(default)]
    function: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VotingSummary {
    sitting: u32,
    voting_number: u32,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl VotingSummary {
    fn is_final(&self) -> bool {
        [&self.topic, &self.description]
            .into_iter()
            .flatten()
            .any(|text| text.to_lowercase().contains(FINAL_VOTING_MARKER))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VotingDetail {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    yes: u32,
    #[serde(default)]
    no: u32,
    #[serde(default)]
    abstain: u32,
    #[serde(default)]
    total_voted: u32,
    #[serde(default)]
    sitting: Option<u32>,
    #[serde(default)]
    voting_number: Option<u32>,
    #[serde(default)]
    links: Vec<Link>,
    #[serde(default)]
    votes: Vec<MemberVote>,
}

#[derive(Debug, Deserialize)]
struct MemberVote {
    #[serde(default)]
    club: Option<String>,
    #[serde(default)]
    vote: Option<String>,
}

impl CommitteeDetail {
    fn into_committee(self) -> Committee {
        let chairman = self
            .members
            .into_iter()
            .find(|m| m.function.as_deref() == Some(CHAIRMAN));
        Committee {
            code: self.code,
            name: self.name,
            chairman_name: chairman.as_ref().map(|m| m.last_first_name.clone()),
            chairman_party: chairman.and_then(|m| m.club),
        }
    }
}

impl VotingDetail {
    /// Per-club tallies of individual votes, clubs in name order.
    fn by_party(&self) -> Vec<PartyVote> {
        let mut clubs: BTreeMap<&str, PartyVote> = BTreeMap::new();
        for vote in &self.votes {
            let club = vote.club.as_deref().unwrap_or("unknown");
            let tally = clubs.entry(club).or_insert_with(|| PartyVote {
                party: club.to_string(),
                ..Default::default()
            });
            match vote.vote.as_deref() {
                Some("YES") => tally.yes += 1,
                Some("NO") => tally.no += 1,
                Some("ABSTAIN") => tally.abstain += 1,
                _ => tally.absent += 1,
            }
        }
        clubs.into_values().collect()
    }

    fn into_voting(self, sitting: u32, voting_number: u32) -> Voting {
        let by_party = self.by_party();
        let pdf_url = self
            .links
            .iter()
            .find(|l| l.rel == "pdf")
            .map(|l| l.href.clone());
        Voting {
            date: self.date.unwrap_or_default(),
            yes: self.yes,
            no: self.no,
            abstain: self.abstain,
            total: self.total_voted,
            result: VoteOutcome::from_counts(self.yes, self.no),
            sitting: self.sitting.or(Some(sitting)),
            voting_number: self.voting_number.or(Some(voting_number)),
            pdf_url,
            by_party,
        }
    }
}

impl SejmClient {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        Ok(Self {
            http: JsonClient::new(base_url)?,
        })
    }

    async fn committee(&self, code: &str, term: u32) -> Result<Committee, FetchError> {
        let detail: CommitteeDetail = self
            .http
            .get(&format!("term{term}/committees/{code}"), &[])
            .await?;
        Ok(detail.into_committee())
    }
}

#[async_trait]
impl ParliamentRegistry for SejmClient {
    async fn search_candidates(
        &self,
        query: &str,
        term: u32,
        limit: usize,
    ) -> Result<Vec<ProcessSummary>, FetchError> {
        let params = [
            ("title", query.to_string()),
            ("documentType", DOCUMENT_TYPE.to_string()),
            ("limit", limit.to_string()),
            ("sort_by", "-documentDate".to_string()),
        ];
        let found: Vec<ProcessSummary> = self
            .http
            .get(&format!("term{term}/processes"), &params)
            .await?;
        info!(query, term, count = found.len(), "searched processes");
        Ok(found)
    }

    async fn fetch_process_detail(
        &self,
        print_key: &str,
        term: u32,
    ) -> Result<ProcessRecord, FetchError> {
        let mut process: ProcessRecord = self
            .http
            .get(&format!("term{term}/processes/{print_key}"), &[])
            .await?;
        process.term.get_or_insert(term);
        Ok(process)
    }

    async fn fetch_committees(
        &self,
        print_key: &str,
        term: u32,
    ) -> Result<Vec<Committee>, FetchError> {
        let process = self.fetch_process_detail(print_key, term).await?;
        let mut committees = Vec::new();
        for code in process.committee_codes() {
            match self.committee(&code, term).await {
                Ok(committee) => committees.push(committee),
                Err(e) => warn!(code = %code, term, error = %e, "committee lookup failed"),
            }
        }
        Ok(committees)
    }

    async fn fetch_rapporteurs(
        &self,
        print_key: &str,
        term: u32,
    ) -> Result<Vec<Rapporteur>, FetchError> {
        Ok(self.fetch_process_detail(print_key, term).await?.rapporteurs())
    }

    async fn fetch_senate_position(
        &self,
        print_key: &str,
        term: u32,
    ) -> Result<Option<SenatePosition>, FetchError> {
        Ok(self
            .fetch_process_detail(print_key, term)
            .await?
            .senate_position())
    }

    async fn fetch_signature_date(
        &self,
        print_key: &str,
        term: u32,
    ) -> Result<Option<String>, FetchError> {
        Ok(self
            .fetch_process_detail(print_key, term)
            .await?
            .signature_date())
    }

    async fn fetch_final_voting(
        &self,
        print_key: &str,
        term: u32,
    ) -> Result<Option<Voting>, FetchError> {
        let votings: Vec<VotingSummary> = self
            .http
            .get(
                &format!("term{term}/votings/search"),
                &[("title", print_key.to_string())],
            )
            .await?;
        let Some(final_voting) = votings.iter().find(|v| v.is_final()) else {
            return Ok(None);
        };
        let detail: VotingDetail = self
            .http
            .get(
                &format!(
                    "term{term}/votings/{}/{}",
                    final_voting.sitting, final_voting.voting_number
                ),
                &[],
            )
            .await?;
        Ok(Some(detail.into_voting(final_voting.sitting, final_voting.voting_number)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_voting_detected_by_topic_or_description() {
        let summaries: Vec<VotingSummary> = serde_json::from_str(
            r#"[
                {"sitting": 12, "votingNumber": 39, "topic": "Poprawka 1"},
                {"sitting": 12, "votingNumber": 40, "description": "Głosowanie nad CAŁOŚĆ projektu"},
                {"sitting": 12, "votingNumber": 41, "topic": "Wniosek o odrzucenie"}
            ]"#,
        )
        .unwrap();
        let finals: Vec<u32> = summaries
            .iter()
            .filter(|v| v.is_final())
            .map(|v| v.voting_number)
            .collect();
        assert_eq!(finals, vec![40]);
    }

    #[test]
    fn voting_aggregated_per_club() {
        let detail: VotingDetail = serde_json::from_str(
            r#"{
                "date": "2024-05-10T12:31:00",
                "yes": 3, "no": 1, "abstain": 1, "totalVoted": 5,
                "links": [{"href": "https://api.sejm.gov.pl/sejm/term10/votings/12/40/pdf", "rel": "pdf"}],
                "votes": [
                    {"club": "PiS", "vote": "NO"},
                    {"club": "KO", "vote": "YES"},
                    {"club": "KO", "vote": "YES"},
                    {"club": "Lewica", "vote": "YES"},
                    {"club": "KO", "vote": "ABSTAIN"},
                    {"club": "PiS", "vote": "ABSENT"}
                ]
            }"#,
        )
        .unwrap();
        let voting = detail.into_voting(12, 40);
        assert_eq!(voting.result, VoteOutcome::Passed);
        assert_eq!(voting.sitting, Some(12));
        assert!(voting.pdf_url.is_some());
        let parties: Vec<(&str, u32, u32, u32, u32)> = voting
            .by_party
            .iter()
            .map(|p| (p.party.as_str(), p.yes, p.no, p.abstain, p.absent))
            .collect();
        assert_eq!(
            parties,
            vec![
                ("KO", 2, 0, 1, 0),
                ("Lewica", 1, 0, 0, 0),
                ("PiS", 0, 1, 0, 1)
            ]
        );
    }

    #[test]
    fn committee_chairman_extracted() {
        let detail: CommitteeDetail = serde_json::from_str(
            r#"{"code": "ZDR", "name": "Komisja Zdrowia", "members": [
                {"lastFirstName": "Kowalski Jan", "club": "KO", "function": "zastępca przewodniczącego"},
                {"lastFirstName": "Nowak Anna", "club": "Lewica", "function": "przewodniczący"}
            ]}"#,
        )
        .unwrap();
        let committee = detail.into_committee();
        assert_eq!(committee.chairman_name.as_deref(), Some("Nowak Anna"));
        assert_eq!(committee.chairman_party.as_deref(), Some("Lewica"));
    }
}
