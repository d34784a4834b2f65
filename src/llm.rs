use std::future::Future;

use crate::config::{ApiKey, LLMConfig};
use crate::prompt::PromptBuilder;
use crate::search::excerpt;
use crate::{PipelineError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Anything that can turn a topic and its search results into a breakdown.
pub trait Narrator: Send + Sync {
    fn narrate(
        &self,
        api_key: &ApiKey,
        question: &str,
        search_results: &str,
    ) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<u16>,
    message: Option<String>,
}

impl ApiError {
    fn into_error(self) -> PipelineError {
        let message = self.message.unwrap_or_else(|| "Unknown error".to_string());
        match self.code {
            Some(code) => PipelineError::LLMError(format!("API error ({code}): {message}")),
            None => PipelineError::LLMError(message),
        }
    }
}

/// The `GeminiNarrator` struct sends the trend-spotter prompt to the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiNarrator {
    client: Client,
    config: LLMConfig,
}

impl GeminiNarrator {
    /// Creates a new `GeminiNarrator` sharing the given HTTP client.
    pub fn new(client: Client, config: LLMConfig) -> Self {
        Self { client, config }
    }

    /// Sends a prompt to the model and returns the generated text.
    #[instrument(skip(self, api_key, prompt), fields(model = %self.config.model, prompt_len = prompt.len()))]
    pub async fn generate(&self, api_key: &ApiKey, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            urlencoding::encode(&self.config.model)
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key.expose())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if let Ok(GenerateContentResponse {
                error: Some(err), ..
            }) = serde_json::from_str::<GenerateContentResponse>(&text)
            {
                warn!(status = %status, "Gemini API error");
                return Err(err.into_error());
            }
            warn!(status = %status, "Gemini API error (no structured body)");
            return Err(PipelineError::LLMError(format!(
                "HTTP {status}: {}",
                excerpt(&text)
            )));
        }

        let body: GenerateContentResponse = response.json().await?;
        if let Some(err) = body.error {
            warn!("Gemini API error in 200 response");
            return Err(err.into_error());
        }

        let text = body
            .candidates
            .and_then(|candidates| candidates.into_iter().next())
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(PipelineError::LLMError("empty response".to_string()));
        }

        debug!(len = text.len(), "Generation complete");
        Ok(text)
    }
}

impl Narrator for GeminiNarrator {
    async fn narrate(&self, api_key: &ApiKey, question: &str, search_results: &str) -> Result<String> {
        let prompt = PromptBuilder::new(question)
            .with_search_results(search_results)
            .build();

        self.generate(api_key, &prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn narrator(endpoint: String) -> GeminiNarrator {
        GeminiNarrator::new(
            Client::new(),
            LLMConfig {
                endpoint,
                model: crate::DEFAULT_MODEL.to_string(),
            },
        )
    }

    fn key() -> ApiKey {
        ApiKey::new("g-test").unwrap()
    }

    fn path() -> &'static str {
        "/gemini-2.5-flash:generateContent"
    }

    #[tokio::test]
    async fn test_narrate_embeds_question_and_results() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", path())
            .match_header("x-goog-api-key", "g-test")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("new phone launch".to_string()),
                Matcher::Regex("RESULTS-MARKER-42".to_string()),
            ]))
            .with_status(200)
            .with_body(
                json!({
                    "candidates": [{
                        "content": {
                            "parts": [{"text": "📱 HEADLINE: "}, {"text": "the phone is here"}],
                            "role": "model"
                        }
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let story = narrator(server.url())
            .narrate(&key(), "new phone launch", "RESULTS-MARKER-42")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(story, "📱 HEADLINE: the phone is here");
    }

    #[tokio::test]
    async fn test_structured_error_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", path())
            .with_status(403)
            .with_body(json!({"error": {"code": 403, "message": "Quota exceeded"}}).to_string())
            .create_async()
            .await;

        let result = narrator(server.url()).generate(&key(), "prompt").await;

        match result {
            Err(PipelineError::LLMError(message)) => {
                assert!(message.contains("403"));
                assert!(message.contains("Quota exceeded"));
            }
            other => panic!("expected LLMError, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unstructured_error_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", path())
            .with_status(500)
            .with_body("not json")
            .create_async()
            .await;

        let result = narrator(server.url()).generate(&key(), "prompt").await;

        match result {
            Err(PipelineError::LLMError(message)) => {
                assert!(message.contains("500"));
                assert!(message.contains("not json"));
            }
            other => panic!("expected LLMError, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_error_field_in_200_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", path())
            .with_status(200)
            .with_body(json!({"error": {"code": 400, "message": "API key not valid"}}).to_string())
            .create_async()
            .await;

        let result = narrator(server.url()).generate(&key(), "prompt").await;

        assert!(matches!(result, Err(PipelineError::LLMError(m)) if m.contains("API key not valid")));
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", path())
            .with_status(200)
            .with_body(json!({"candidates": []}).to_string())
            .create_async()
            .await;

        let result = narrator(server.url()).generate(&key(), "prompt").await;

        assert!(matches!(result, Err(PipelineError::LLMError(m)) if m == "empty response"));
    }
}
