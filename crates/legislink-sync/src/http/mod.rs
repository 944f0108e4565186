//! reqwest clients for the public registries.

mod eli;
mod saos;
mod sejm;

pub use eli::EliClient;
pub use saos::SaosClient;
pub use sejm::SejmClient;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::FetchError;

const USER_AGENT: &str = concat!("legislink/", env!("CARGO_PKG_VERSION"));

/// GET-only JSON client rooted at one API base URL.
#[derive(Debug, Clone)]
struct JsonClient {
    client: reqwest::Client,
    base_url: String,
}

impl JsonClient {
    /// `base_url` like `https://api.sejm.gov.pl/sejm`; a trailing slash is dropped.
    fn new(base_url: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        self.get_optional(path, query)
            .await?
            .ok_or_else(|| FetchError::Server {
                status: StatusCode::NOT_FOUND.as_u16(),
                body: format!("nothing at {path}"),
            })
    }

    /// Like [`get`](Self::get) but a 404 is `Ok(None)`.
    async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, FetchError> {
        let url = self.url(path);
        debug!(url = %url, "GET");
        let resp = self.client.get(&url).query(query).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Server {
                status: status.as_u16(),
                body,
            });
        }
        let text = resp.text().await?;
        Ok(Some(serde_json::from_str(&text)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let client = JsonClient::new("https://api.sejm.gov.pl/sejm/").unwrap();
        assert_eq!(client.base_url, "https://api.sejm.gov.pl/sejm");
        assert_eq!(
            client.url("/term10/processes/1604"),
            "https://api.sejm.gov.pl/sejm/term10/processes/1604"
        );
    }
}
