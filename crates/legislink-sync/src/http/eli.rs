//! ELI API client for the official journals (`https://api.sejm.gov.pl/eli`).

use async_trait::async_trait;
use legislink_core::Publication;
use serde::Deserialize;
use tracing::info;

use super::JsonClient;
use crate::{FetchError, PublicationRegistry};

pub struct EliClient {
    http: JsonClient,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActDetail {
    #[serde(default)]
    announcement_date: Option<String>,
    #[serde(default)]
    entry_into_force: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    in_force: Option<String>,
    #[serde(default, rename = "textPDF")]
    text_pdf: bool,
}

/// Split `DU/2024/878` into journal, year and position.
fn parse_key(key: &str) -> Result<(&str, u32, u32), FetchError> {
    let invalid = || FetchError::Invalid {
        what: "publication key",
        value: key.to_string(),
    };
    let mut parts = key.split('/');
    let (Some(journal), Some(year), Some(position), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };
    if journal.is_empty() {
        return Err(invalid());
    }
    let year = year.parse().map_err(|_| invalid())?;
    let position = position.parse().map_err(|_| invalid())?;
    Ok((journal, year, position))
}

impl EliClient {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        Ok(Self {
            http: JsonClient::new(base_url)?,
        })
    }

    fn publication(&self, path: &str, act: ActDetail) -> Publication {
        Publication {
            publication_date: act.announcement_date,
            entry_into_force: act.entry_into_force,
            publication_url: act
                .text_pdf
                .then(|| self.http.url(&format!("{path}/text.pdf"))),
            status: act.status,
            in_force: act.in_force,
        }
    }
}

#[async_trait]
impl PublicationRegistry for EliClient {
    async fn fetch_publication(&self, key: &str) -> Result<Option<Publication>, FetchError> {
        let (journal, year, position) = parse_key(key)?;
        let path = format!("acts/{journal}/{year}/{position}");
        let Some(act) = self.http.get_optional::<ActDetail>(&path, &[]).await? else {
            info!(key, "no published act");
            return Ok(None);
        };
        Ok(Some(self.publication(&path, act)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publication_key_parsed() {
        assert_eq!(parse_key("DU/2024/878").unwrap(), ("DU", 2024, 878));
        assert_eq!(parse_key("MP/2023/12").unwrap(), ("MP", 2023, 12));
        for bad in ["", "DU/2024", "DU/2024/878/1", "DU/rok/878", "/2024/878"] {
            assert!(
                matches!(parse_key(bad), Err(FetchError::Invalid { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn pdf_url_only_when_text_published() {
        let client = EliClient::new("https://api.sejm.gov.pl/eli").unwrap();
        let act: ActDetail = serde_json::from_str(
            r#"{"announcementDate": "2024-06-20", "entryIntoForce": "2024-07-05",
                "status": "obowiązujący", "inForce": "IN_FORCE", "textPDF": true}"#,
        )
        .unwrap();
        let publication = client.publication("acts/DU/2024/878", act);
        assert_eq!(publication.publication_date.as_deref(), Some("2024-06-20"));
        assert_eq!(
            publication.publication_url.as_deref(),
            Some("https://api.sejm.gov.pl/eli/acts/DU/2024/878/text.pdf")
        );

        let act: ActDetail = serde_json::from_str(r#"{"announcementDate": "2024-06-20"}"#).unwrap();
        assert!(client.publication("acts/DU/2024/878", act).publication_url.is_none());
    }
}
