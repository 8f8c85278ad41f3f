//! Remote embedding provider: an HTTPS embedding API, bearer-token
//! authenticated, rate-limited by exponential backoff on transient errors.

use super::traits::EmbeddingProvider;
use crate::{EmbeddingError, EmbeddingResult};
use async_trait::async_trait;
use codescribe_config::EmbeddingConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_EMBED_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/text-embedding-004:batchEmbedContents";
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 200;

/// HTTPS embedding provider, always reports ready since there's no local
/// warm-up phase.
pub struct RemoteEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    url: String,
    dimensions: usize,
    max_tokens: usize,
    model_id: String,
}

impl RemoteEmbeddingProvider {
    /// Construct a provider from the embedding configuration. Panics-free;
    /// callers must ensure `config.gemini_api_key` is present (enforced by
    /// [`codescribe_config::Validate`] before this is ever called).
    #[must_use]
    pub fn new(config: &EmbeddingConfig, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            url: DEFAULT_EMBED_URL.to_string(),
            dimensions: config.dimensions,
            max_tokens: config.max_tokens,
            model_id: config.model_id.clone(),
        }
    }

    async fn embed_once(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        let requests: Vec<EmbedContentRequest> = texts
            .iter()
            .map(|text| EmbedContentRequest {
                model: format!("models/{}", self.model_id),
                content: Content {
                    parts: vec![Part { text: (*text).to_string() }],
                },
            })
            .collect();

        let response = self
            .client
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(&BatchEmbedRequest { requests })
            .send()
            .await
            .map_err(|e| EmbeddingError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Network(format!(
                "embedding API returned {status}: {body}"
            )));
        }

        let parsed: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Embedding(format!("invalid embedding response: {e}")))?;

        Ok(parsed
            .embeddings
            .into_iter()
            .map(|e| normalize(e.values))
            .collect())
    }
}

fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbeddingProvider {
    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        let retry_delay = Duration::from_millis(RETRY_BASE_DELAY_MS);
        let mut last_err = None;

        for attempt in 0..MAX_ATTEMPTS {
            match self.embed_once(texts).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "remote embedding attempt failed");
                    last_err = Some(e);
                    if attempt + 1 < MAX_ATTEMPTS {
                        let delay = retry_delay * 2_u32.pow(attempt);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| EmbeddingError::Network("no attempts made".to_string())))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimensions
    }

    fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }

    async fn is_ready(&self) -> bool {
        true
    }

    async fn ensure_ready(&self) -> EmbeddingResult<()> {
        Ok(())
    }
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Serialize)]
struct EmbedContentRequest {
    model: String,
    content: Content,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::normalize;

    #[test]
    fn normalize_produces_a_unit_vector() {
        let v = normalize(vec![3.0, 4.0]);
        let norm = (v[0] * v[0] + v[1] * v[1]).sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_handles_the_zero_vector_without_dividing_by_zero() {
        let v = normalize(vec![0.0, 0.0]);
        assert_eq!(v, vec![0.0, 0.0]);
    }
}
