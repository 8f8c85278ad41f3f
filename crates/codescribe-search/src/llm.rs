//! LLM client: calls Gemini's `generateContent` to turn an assembled
//! context into a grounded answer.

use crate::error::{SearchError, SearchResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_GENERATE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 200;
const TEMPERATURE: f32 = 0.1;
const MAX_OUTPUT_TOKENS: u32 = 1024;

/// Generates a grounded answer from a system/user prompt pair.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> SearchResult<String>;
}

/// Gemini-backed [`LlmClient`]. Shares the same API key as the remote
/// embedding provider, since both call the same Gemini account.
pub struct GeminiLlmClient {
    client: reqwest::Client,
    api_key: String,
    url: String,
}

impl GeminiLlmClient {
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            url: DEFAULT_GENERATE_URL.to_string(),
        }
    }

    /// Builds a client from the same `gemini_api_key` the remote embedding
    /// provider uses. Returns `None` when no key is configured (e.g. the
    /// local embedding provider is in use and no LLM calls are expected).
    #[must_use]
    pub fn from_config(config: &codescribe_config::EmbeddingConfig) -> Option<Self> {
        config.gemini_api_key.clone().map(Self::new)
    }

    async fn generate_once(&self, system_prompt: &str, user_prompt: &str) -> SearchResult<String> {
        let request = GenerateContentRequest {
            system_instruction: Content {
                parts: vec![Part {
                    text: system_prompt.to_string(),
                }],
            },
            contents: vec![Content {
                parts: vec![Part {
                    text: user_prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .client
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| SearchError::LlmFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::LlmFailed(format!("generateContent returned {status}: {body}")));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| SearchError::LlmFailed(format!("invalid generateContent response: {e}")))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| SearchError::LlmFailed("no candidates in generateContent response".to_string()))
    }
}

#[async_trait]
impl LlmClient for GeminiLlmClient {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> SearchResult<String> {
        let retry_delay = Duration::from_millis(RETRY_BASE_DELAY_MS);
        let mut last_err = None;

        for attempt in 0..MAX_ATTEMPTS {
            match self.generate_once(system_prompt, user_prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "generateContent attempt failed");
                    last_err = Some(e);
                    if attempt + 1 < MAX_ATTEMPTS {
                        let delay = retry_delay * 2_u32.pow(attempt);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| SearchError::LlmFailed("no attempts made".to_string())))
    }
}

/// Stand-in used when no `GEMINI_API_KEY` is configured. The server still
/// starts and serves `/api/index`; `/api/rag/query` fails clearly instead
/// of the process refusing to boot.
pub struct UnconfiguredLlmClient;

#[async_trait]
impl LlmClient for UnconfiguredLlmClient {
    async fn generate(&self, _system_prompt: &str, _user_prompt: &str) -> SearchResult<String> {
        Err(SearchError::LlmFailed(
            "GEMINI_API_KEY is not configured; the query endpoint is unavailable".to_string(),
        ))
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn generate_returns_the_first_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "the answer is [1]"}]}}]
            })))
            .mount(&server)
            .await;

        let client = GeminiLlmClient {
            client: reqwest::Client::new(),
            api_key: "test-key".to_string(),
            url: format!("{}/v1beta/models/gemini-1.5-flash:generateContent", server.uri()),
        };

        let answer = client.generate("system", "user").await.unwrap();
        assert_eq!(answer, "the answer is [1]");
    }

    #[tokio::test]
    async fn generate_retries_on_server_error_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "recovered"}]}}]
            })))
            .mount(&server)
            .await;

        let client = GeminiLlmClient {
            client: reqwest::Client::new(),
            api_key: "test-key".to_string(),
            url: server.uri(),
        };

        let answer = client.generate("system", "user").await.unwrap();
        assert_eq!(answer, "recovered");
    }
}
