use std::future::Future;

use crate::config::{ApiKey, SearchConfig};
use crate::{PipelineError, Result, Snippet};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Anything that can turn a topic into a list of search snippets.
pub trait Retriever: Send + Sync {
    fn search(&self, api_key: &ApiKey, query: &str) -> impl Future<Output = Result<Vec<Snippet>>> + Send;
}

/// Request body for the Tavily search API.
#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
}

/// Response returned by the Tavily API.
#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<Snippet>,
}

/// The `TavilyRetriever` struct performs web searches against the Tavily API.
#[derive(Debug, Clone)]
pub struct TavilyRetriever {
    /// The HTTP client used for making requests.
    client: Client,
    /// The search provider settings.
    config: SearchConfig,
}

impl TavilyRetriever {
    /// Creates a new `TavilyRetriever` sharing the given HTTP client.
    pub fn new(client: Client, config: SearchConfig) -> Self {
        Self { client, config }
    }
}

impl Retriever for TavilyRetriever {
    /// Performs a search and returns at most `max_results` snippets, in provider order.
    #[instrument(skip(self, api_key), fields(max_results = self.config.max_results))]
    async fn search(&self, api_key: &ApiKey, query: &str) -> Result<Vec<Snippet>> {
        debug!("Search URL: {}", self.config.endpoint);

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key.expose())
            .json(&TavilyRequest {
                query,
                max_results: self.config.max_results,
            })
            .send()
            .await?;

        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, "Tavily search rejected");
            return Err(PipelineError::SearchError(format!(
                "HTTP {status}: {}",
                excerpt(&text)
            )));
        }

        let body: TavilyResponse = response.json().await?;
        let mut results = body.results;
        results.truncate(self.config.max_results);

        debug!(count = results.len(), "Search complete");
        Ok(results)
    }
}

/// The first 200 bytes of a response body, cut on a character boundary.
pub(crate) fn excerpt(text: &str) -> &str {
    let mut end = text.len().min(200);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
