use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::{Result, StashError};

const API_KEY_HEADER: &str = "ApiKey";
const ERROR_PREVIEW_CHARS: usize = 320;

/// Minimal GraphQL-over-HTTP client shared by both stash endpoints.
#[derive(Clone)]
pub struct GraphQlClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlErrorItem>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorItem {
    message: String,
}

impl GraphQlClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(StashError::InvalidEndpoint(endpoint));
        }
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Posts `query` and decodes `data` into `T`. `operation` names the
    /// request in errors and logs.
    pub async fn execute<V, T>(&self, operation: &'static str, query: &str, variables: V) -> Result<T>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let body = json!({ "query": query, "variables": variables });
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        debug!(operation, endpoint = %self.endpoint, "graphql request");

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StashError::Status {
                status: status.as_u16(),
                body: preview(body),
            });
        }

        let decoded: GraphQlResponse<T> = resp.json().await?;
        if !decoded.errors.is_empty() {
            let messages = decoded
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(StashError::GraphQl(messages));
        }
        decoded.data.ok_or(StashError::MissingData(operation))
    }
}

fn preview(body: String) -> String {
    if body.chars().count() > ERROR_PREVIEW_CHARS {
        let truncated: String = body.chars().take(ERROR_PREVIEW_CHARS).collect();
        format!("{truncated}...")
    } else {
        body
    }
}

/// Normalizes a configured server URL to its GraphQL endpoint.
pub fn graphql_endpoint(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.ends_with("/graphql") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/graphql")
    }
}
