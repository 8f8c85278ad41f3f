//! Provider-agnostic embedding service: batches texts, tracks stats, and
//! exposes the selected [`EmbeddingProvider`] to callers.

use super::local::LocalEmbeddingProvider;
use super::remote::RemoteEmbeddingProvider;
use super::traits::{EmbeddingProvider, EmbeddingService, EmbeddingStats};
use crate::{EmbeddingError, EmbeddingResult};
use async_trait::async_trait;
use codescribe_config::{EmbeddingConfig, EmbeddingProviderKind};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Builds the configured [`EmbeddingProvider`] — Local or Remote — per
/// `config.provider`. Provider selection is a startup-time choice.
///
/// # Errors
///
/// Returns an error if `Remote` is selected without a `GEMINI_API_KEY`
/// (normally already rejected by [`codescribe_config::Validate`]).
pub fn build_provider(config: &EmbeddingConfig) -> EmbeddingResult<Arc<dyn EmbeddingProvider>> {
    match config.provider {
        EmbeddingProviderKind::Local => Ok(Arc::new(LocalEmbeddingProvider::new(config))),
        EmbeddingProviderKind::Remote => {
            let api_key = config.gemini_api_key.clone().ok_or_else(|| {
                EmbeddingError::Config("GEMINI_API_KEY is required for the remote provider".to_string())
            })?;
            Ok(Arc::new(RemoteEmbeddingProvider::new(config, api_key)))
        }
    }
}

// Global service counter for debugging
static SERVICE_COUNTER: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);

/// Default implementation of EmbeddingService
///
/// Provider is Arc-shared to ensure pool stays alive across all users
pub struct DefaultEmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    stats: Arc<RwLock<EmbeddingStats>>,
    batch_size: usize,
    service_id: String, // Unique ID for debugging
}

impl DefaultEmbeddingService {
    /// Create a new embedding service from configuration, building whichever
    /// provider `config.provider` selects.
    ///
    /// # Errors
    ///
    /// Propagates [`build_provider`]'s error.
    pub fn new(config: &EmbeddingConfig) -> EmbeddingResult<Self> {
        let provider = build_provider(config)?;
        Ok(Self::with_provider(provider, config.batch_size))
    }

    /// Create with a custom provider
    pub fn with_provider(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        let service_id = format!(
            "service-{}",
            SERVICE_COUNTER.fetch_add(1, std::sync::atomic::Ordering::SeqCst)
        );
        tracing::debug!(service_id, "creating embedding service");

        let stats = Arc::new(RwLock::new(EmbeddingStats {
            model_name: provider.model_name().to_string(),
            embedding_dimension: provider.embedding_dimension(),
            ..Default::default()
        }));

        Self {
            provider,
            stats,
            batch_size,
            service_id,
        }
    }
}

#[async_trait]
impl EmbeddingService for DefaultEmbeddingService {
    async fn generate_embeddings(&self, texts: Vec<&str>) -> EmbeddingResult<Vec<Vec<f32>>> {
        use std::time::Instant;

        self.provider.ensure_ready().await?;

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let start = Instant::now();

            let embeddings = self.provider.embed_batch(batch).await?;

            all_embeddings.extend(embeddings);

            let elapsed = start.elapsed().as_millis() as f64;
            let mut stats = self.stats.write().await;
            stats.total_embeddings += batch.len();
            stats.total_batches += 1;

            let prev_avg = stats.avg_batch_time_ms;
            let count = stats.total_batches as f64;
            stats.avg_batch_time_ms = (prev_avg * (count - 1.0) + elapsed) / count;
        }

        tracing::debug!(service_id = %self.service_id, count = all_embeddings.len(), "generated embeddings");
        Ok(all_embeddings)
    }

    fn provider(&self) -> &dyn EmbeddingProvider {
        self.provider.as_ref()
    }

    async fn get_stats(&self) -> EmbeddingStats {
        self.stats.read().await.clone()
    }
}

/// Mock implementation for testing
#[cfg(any(test, feature = "test-utils"))]
pub struct MockEmbeddingProvider {
    dimension: usize,
    fail: bool,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockEmbeddingProvider {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail: false,
        }
    }

    #[must_use]
    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if self.fail {
            return Err(crate::EmbeddingError::Other(
                "Mock embedding failure".into(),
            ));
        }

        Ok(texts.iter().map(|_| vec![0.1; self.dimension]).collect())
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn max_tokens(&self) -> usize {
        8192
    }

    fn model_name(&self) -> &str {
        "mock-embedding-model"
    }

    async fn is_ready(&self) -> bool {
        true
    }

    async fn ensure_ready(&self) -> EmbeddingResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_embedding_service_batching() {
        let provider = Arc::new(MockEmbeddingProvider::new(768));
        let service = DefaultEmbeddingService::with_provider(provider, 2);

        let texts = vec!["text1", "text2", "text3", "text4", "text5"];

        let embeddings = service.generate_embeddings(texts).await.unwrap();
        assert_eq!(embeddings.len(), 5);
        assert_eq!(embeddings[0].len(), 768);

        let stats = service.get_stats().await;
        assert_eq!(stats.total_embeddings, 5);
        assert_eq!(stats.total_batches, 3); // 5 texts with batch size 2 = 3 batches
    }

    #[tokio::test]
    async fn test_embedding_service_error_handling() {
        let provider = Arc::new(MockEmbeddingProvider::new(768).with_failure());
        let service = DefaultEmbeddingService::with_provider(provider, 2);

        let texts = vec!["text1"];
        let result = service.generate_embeddings(texts).await;

        assert!(result.is_err());
    }
}
