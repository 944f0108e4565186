//! SAOS court judgments client (`https://www.saos.org.pl/api`).

use async_trait::async_trait;
use legislink_core::TribunalCase;
use serde::Deserialize;
use tracing::{info, warn};

use super::JsonClient;
use crate::{FetchError, TribunalRegistry};

const COURT_TYPE: &str = "CONSTITUTIONAL_TRIBUNAL";
const PAGE_SIZE: u32 = 100;

pub struct SaosClient {
    http: JsonClient,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct JudgmentEnvelope {
    data: Judgment,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Judgment {
    id: i64,
    #[serde(default)]
    court_cases: Vec<CourtCase>,
    #[serde(default)]
    judgment_date: String,
    #[serde(default)]
    judgment_type: String,
    #[serde(default)]
    text_content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourtCase {
    #[serde(default)]
    case_number: String,
}

impl Judgment {
    fn into_case(self) -> TribunalCase {
        let is_constitutional = self.text_content.as_deref().and_then(verdict);
        TribunalCase {
            case_number: self
                .court_cases
                .into_iter()
                .next()
                .map(|c| c.case_number)
                .unwrap_or_default(),
            judgment_date: self.judgment_date,
            judgment_type: self.judgment_type,
            registry_id: self.id,
            is_constitutional,
        }
    }
}

/// Law journal code as SAOS indexes it: `DU/2024/878` → `2024/878`.
fn law_journal_code(key: &str) -> &str {
    key.strip_prefix("DU/")
        .or_else(|| key.strip_prefix("MP/"))
        .unwrap_or(key)
}

/// Best-effort reading of the ruling from the judgment text.
fn verdict(text: &str) -> Option<bool> {
    let text = text.to_lowercase();
    if text.contains("jest niezgodny") || text.contains("są niezgodne") {
        Some(false)
    } else if text.contains("jest zgodny") || text.contains("są zgodne") {
        Some(true)
    } else {
        None
    }
}

impl SaosClient {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        Ok(Self {
            http: JsonClient::new(base_url)?,
        })
    }
}

#[async_trait]
impl TribunalRegistry for SaosClient {
    async fn fetch_tribunal_cases(&self, key: &str) -> Result<Vec<TribunalCase>, FetchError> {
        let code = law_journal_code(key);
        let params = [
            ("courtType", COURT_TYPE.to_string()),
            ("lawJournalEntryCode", code.to_string()),
            ("pageSize", PAGE_SIZE.to_string()),
            ("pageNumber", "0".to_string()),
        ];
        let page: SearchPage = self.http.get("search/judgments", &params).await?;

        let mut cases = Vec::with_capacity(page.items.len());
        for item in page.items {
            match self
                .http
                .get::<JudgmentEnvelope>(&format!("judgments/{}", item.id), &[])
                .await
            {
                Ok(envelope) => cases.push(envelope.data.into_case()),
                Err(e) => warn!(judgment = item.id, error = %e, "judgment lookup failed"),
            }
        }
        info!(key, code, count = cases.len(), "tribunal cases found");
        Ok(cases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_prefix_stripped() {
        assert_eq!(law_journal_code("DU/2024/878"), "2024/878");
        assert_eq!(law_journal_code("MP/2023/12"), "2023/12");
        assert_eq!(law_journal_code("2024/878"), "2024/878");
    }

    #[test]
    fn verdict_from_judgment_text() {
        assert_eq!(verdict("Art. 5 ustawy JEST NIEZGODNY z art. 2 Konstytucji"), Some(false));
        assert_eq!(verdict("przepisy są zgodne z Konstytucją"), Some(true));
        assert_eq!(verdict("umarza postępowanie"), None);
    }

    #[test]
    fn judgment_parsed_into_case() {
        let envelope: JudgmentEnvelope = serde_json::from_str(
            r#"{"data": {"id": 301, "courtCases": [{"caseNumber": "K 12/24"}],
                "judgmentDate": "2025-01-15", "judgmentType": "SENTENCE",
                "textContent": "Trybunał orzeka: art. 3 jest zgodny z Konstytucją."}}"#,
        )
        .unwrap();
        let case = envelope.data.into_case();
        assert_eq!(case.case_number, "K 12/24");
        assert_eq!(case.registry_id, 301);
        assert_eq!(case.is_constitutional, Some(true));
    }
}
