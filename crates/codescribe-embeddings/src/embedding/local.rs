//! Local embedding provider: an in-process model pool executed on CPU/GPU,
//! loaded once at startup and kept warm.

use super::model::EmbeddingModel;
use super::pool::EmbeddingModelPool;
use super::traits::EmbeddingProvider;
use crate::EmbeddingResult;
use async_trait::async_trait;
use codescribe_config::EmbeddingConfig;
use std::time::Duration;

/// Number of warm model instances kept in the pool.
const POOL_SIZE: usize = 2;
/// Max time a worker waits to fill a batch before flushing what it has.
const BATCH_TIMEOUT_MS: u64 = 25;

/// In-process embedding provider backed by a warm pool of Candle models.
pub struct LocalEmbeddingProvider {
    pool: EmbeddingModelPool,
    dimensions: usize,
    max_tokens: usize,
    model_id: String,
}

impl LocalEmbeddingProvider {
    /// Construct a provider from the embedding configuration, spinning up a
    /// pool of [`POOL_SIZE`] warm model workers.
    #[must_use]
    pub fn new(config: &EmbeddingConfig) -> Self {
        let pool = EmbeddingModelPool::new(
            config.model_id.clone(),
            config.max_tokens,
            POOL_SIZE,
            config.batch_size,
            Duration::from_millis(BATCH_TIMEOUT_MS),
        );

        Self {
            pool,
            dimensions: config.dimensions,
            max_tokens: config.max_tokens,
            model_id: config.model_id.clone(),
        }
    }

    /// Construct a provider with a single warm worker, for tests that don't
    /// need parallel inference.
    #[must_use]
    pub fn single(model: EmbeddingModel, config: &EmbeddingConfig) -> Self {
        let _ = model;
        let pool = EmbeddingModelPool::new(
            config.model_id.clone(),
            config.max_tokens,
            1,
            config.batch_size,
            Duration::from_millis(BATCH_TIMEOUT_MS),
        );
        Self {
            pool,
            dimensions: config.dimensions,
            max_tokens: config.max_tokens,
            model_id: config.model_id.clone(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddingProvider {
    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        let owned_texts: Vec<String> = texts.iter().map(|s| (*s).to_string()).collect();
        self.pool.embed(owned_texts).await
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
        // Workers load their model lazily on first request; the pool itself
        // is ready to accept work as soon as it's constructed.
        true
    }

    async fn ensure_ready(&self) -> EmbeddingResult<()> {
        let _ = self.embed_batch(&["// warm-up"]).await?;
        Ok(())
    }
}
