use crate::config::SearchConfig;
use crate::domain::model::{Credential, SearchResultItem};
use crate::utils::error::SearchError;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const ERROR_BODY_SNIPPET: usize = 200;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchResultItem>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Custom Search JSON API client bound to one search engine id.
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: Client,
    endpoint: String,
    engine_id: String,
}

impl SearchClient {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &SearchConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            engine_id: config.engine_id.clone(),
        }
    }

    /// Runs one query. Zero matches is an empty vector, not an error.
    pub async fn search(
        &self,
        query: &str,
        credential: &Credential,
    ) -> Result<Vec<SearchResultItem>, SearchError> {
        tracing::debug!(query = %query, engine_id = %self.engine_id, "Performing search");

        let url = url::Url::parse_with_params(
            &self.endpoint,
            &[("q", query), ("cx", self.engine_id.as_str())],
        )
        .map_err(|e| SearchError::Endpoint {
            endpoint: self.endpoint.clone(),
            message: e.to_string(),
        })?;

        let response = self
            .client
            .get(url)
            .bearer_auth(&credential.access_token)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, query = %query, "Search request failed");
                SearchError::Transport(e)
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "Search API responded");

        let body = response.text().await?;
        if !status.is_success() {
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api) => match api.error.status {
                    Some(reason) => format!("{} ({})", api.error.message, reason),
                    None => api.error.message,
                },
                Err(_) => body.chars().take(ERROR_BODY_SNIPPET).collect(),
            };
            tracing::error!(status = status.as_u16(), message = %message, "Search API error");
            return Err(SearchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SearchResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "Search response could not be decoded");
            SearchError::Malformed {
                message: e.to_string(),
            }
        })?;

        tracing::debug!(count = parsed.items.len(), "Search results: {:?}", parsed.items);
        Ok(parsed.items)
    }
}
