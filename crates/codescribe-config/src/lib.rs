//! Centralized configuration management for codescribe
//!
//! This crate provides a unified configuration system with type-safe,
//! validated configuration loaded from environment variables.
//!
//! Configuration follows a simple hierarchy:
//! 1. Safe defaults (defined as constants)
//! 2. Environment variable overrides
//! 3. Runtime validation (`Validate::validate`), run once at process startup

pub mod error;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use validation::Validate;

use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
};
use std::time::Duration;

// =============================================================================
// SAFE DEFAULTS
// =============================================================================

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600;

const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_DB_MIN_CONNECTIONS: u32 = 2;
const DEFAULT_DB_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_DB_IDLE_TIMEOUT_SECONDS: u64 = 300;
const DEFAULT_DB_SSL_MODE: &str = "prefer";

const DEFAULT_EMBEDDING_MODEL_ID: &str = "jinaai/jina-embeddings-v2-base-code";
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 768;
const DEFAULT_EMBEDDING_MAX_TOKENS: usize = 512;
const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 32;

const DEFAULT_QUEUE_NAME: &str = "index-repo";
const DEFAULT_QUEUE_CONCURRENCY: usize = 3;
const DEFAULT_QUEUE_ATTEMPTS: u32 = 3;
const DEFAULT_QUEUE_BACKOFF_BASE_SECONDS: u64 = 5;

/// Core configuration for the entire codescribe application.
///
/// All settings have safe defaults and can be overridden via environment
/// variables. Call [`ApplicationConfig::from_env`] once at process start,
/// then [`Validate::validate`] before accepting traffic.
#[derive(Debug, Clone)]
pub struct ApplicationConfig {
    /// API server configuration
    pub api: ApiConfig,
    /// Database configuration (also backs the durable job queue)
    pub database: DatabaseConfig,
    /// Durable queue / worker pool configuration
    pub queue: QueueConfig,
    /// Embedding provider configuration
    pub embedding: EmbeddingConfig,
    /// GitHub repo-fetcher configuration
    pub github: GithubConfig,
    /// Response/query caching configuration
    pub cache: CacheConfig,
}

impl ApplicationConfig {
    /// Load the full application configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            database: DatabaseConfig::from_env(),
            queue: QueueConfig::from_env(),
            embedding: EmbeddingConfig::from_env(),
            github: GithubConfig::from_env(),
            cache: CacheConfig::from_env(),
        }
    }
}

impl Validate for ApplicationConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.api.validate()?;
        self.database.validate()?;
        self.queue.validate()?;
        self.embedding.validate()?;
        self.cache.validate()?;
        Ok(())
    }
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Port the HTTP server binds to (`PORT`)
    pub port: u16,
    /// Origins allowed by CORS (`ALLOWED_ORIGINS`, comma-separated)
    pub allowed_origins: Vec<String>,
}

impl ApiConfig {
    /// Load configuration from environment variables with safe defaults.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            port,
            allowed_origins,
        }
    }
}

impl Validate for ApiConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_port(self.port, "port")
    }
}

/// Database configuration backing both the vector store and the durable queue.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Full connection string (`DATABASE_URL`, required)
    pub url: String,
    /// SSL mode for connections ("disable", "prefer", "require")
    pub ssl_mode: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections in the pool
    pub min_connections: u32,
    /// Connection acquire timeout, seconds
    pub timeout_seconds: u64,
    /// Idle connection timeout, seconds
    pub idle_timeout_seconds: u64,
}

impl DatabaseConfig {
    /// Load configuration from environment variables.
    ///
    /// `DATABASE_URL` is required; the process is expected to exit at
    /// startup if [`Validate::validate`] rejects an empty value.
    pub fn from_env() -> Self {
        let url = std::env::var("DATABASE_URL").unwrap_or_default();

        let ssl_mode = std::env::var("DATABASE_SSL_MODE")
            .unwrap_or_else(|_| DEFAULT_DB_SSL_MODE.to_string());

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);

        let min_connections = std::env::var("DATABASE_MIN_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DB_MIN_CONNECTIONS);

        let timeout_seconds = std::env::var("DATABASE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DB_TIMEOUT_SECONDS);

        let idle_timeout_seconds = std::env::var("DATABASE_IDLE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DB_IDLE_TIMEOUT_SECONDS);

        Self {
            url,
            ssl_mode,
            max_connections,
            min_connections,
            timeout_seconds,
            idle_timeout_seconds,
        }
    }

    fn parse_ssl_mode(&self) -> PgSslMode {
        match self.ssl_mode.as_str() {
            "disable" => PgSslMode::Disable,
            "require" => PgSslMode::Require,
            _ => PgSslMode::Prefer,
        }
    }

    /// Build `PostgreSQL` connection options from `url`.
    ///
    /// # Errors
    /// Returns an error if `url` is not a valid connection string.
    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        let opts: PgConnectOptions = self.url.parse()?;
        Ok(opts.ssl_mode(self.parse_ssl_mode()))
    }

    /// Create a `PostgreSQL` connection pool with proper configuration.
    ///
    /// # Errors
    /// Returns an error if the connection string is invalid or the
    /// database is unreachable.
    pub async fn create_pool(&self) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.timeout_seconds))
            .idle_timeout(Duration::from_secs(self.idle_timeout_seconds))
            .connect_with(self.connect_options()?)
            .await
    }

    /// Connection info safe for logging (credentials redacted).
    pub fn safe_connection_string(&self) -> String {
        self.url.find('@').map_or_else(
            || "<unparseable DATABASE_URL>".to_string(),
            |at| format!("***@{} (ssl: {})", &self.url[at + 1..], self.ssl_mode),
        )
    }
}

impl Validate for DatabaseConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_non_empty(&self.url, "DATABASE_URL")?;
        validation::validate_range(u64::from(self.max_connections), 1, 1000, "max_connections")?;
        validation::validate_range(self.timeout_seconds, 1, 3600, "timeout_seconds")?;
        Ok(())
    }
}

/// Durable-queue / worker-pool configuration for the job orchestrator.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis connection string, retained for parity with deployments that
    /// still point monitoring at a Redis instance (`REDIS_URL`). The queue
    /// itself is backed by the same Postgres database as the vector store.
    pub redis_url: String,
    /// Durable queue name (`"index-repo"`)
    pub queue_name: String,
    /// Number of concurrent workers draining the queue
    pub concurrency: usize,
    /// Maximum attempts per job before terminal failure
    pub attempts: u32,
    /// Base delay for exponential backoff between retries, seconds
    pub backoff_base_seconds: u64,
}

impl QueueConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string());

        let concurrency = std::env::var("QUEUE_CONCURRENCY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_QUEUE_CONCURRENCY);

        let attempts = std::env::var("QUEUE_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_QUEUE_ATTEMPTS);

        let backoff_base_seconds = std::env::var("QUEUE_BACKOFF_BASE_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_QUEUE_BACKOFF_BASE_SECONDS);

        Self {
            redis_url,
            queue_name: DEFAULT_QUEUE_NAME.to_string(),
            concurrency,
            attempts,
            backoff_base_seconds,
        }
    }
}

impl Validate for QueueConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_range(self.concurrency as u64, 1, 64, "queue_concurrency")?;
        validation::validate_range(u64::from(self.attempts), 1, 10, "queue_attempts")?;
        Ok(())
    }
}

/// Embedding provider selection, model in charge of indexing-time and
/// query-time vectors, and the `GEMINI_API_KEY` used by both the remote
/// embedding provider and the LLM answer client.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Which provider to construct (`EMBEDDING_PROVIDER=local|remote`)
    pub provider: EmbeddingProviderKind,
    /// Model identifier
    pub model_id: String,
    /// Embedding dimensionality, `D` in the data model
    pub dimensions: usize,
    /// Maximum tokens per chunk the model accepts
    pub max_tokens: usize,
    /// Batch size used when embedding chunks
    pub batch_size: usize,
    /// API key for the remote embedding provider and the LLM client
    pub gemini_api_key: Option<String>,
}

/// Where embeddings are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProviderKind {
    /// In-process model execution
    Local,
    /// HTTPS embedding API
    Remote,
}

impl EmbeddingConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let provider = match std::env::var("EMBEDDING_PROVIDER").as_deref() {
            Ok("remote") => EmbeddingProviderKind::Remote,
            _ => EmbeddingProviderKind::Local,
        };

        let model_id = std::env::var("EMBEDDING_MODEL_ID")
            .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL_ID.to_string());

        let dimensions = std::env::var("EMBEDDING_DIMENSIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_EMBEDDING_DIMENSIONS);

        let max_tokens = std::env::var("EMBEDDING_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_EMBEDDING_MAX_TOKENS);

        let batch_size = std::env::var("EMBEDDING_BATCH_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_EMBEDDING_BATCH_SIZE);

        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok().filter(|s| !s.is_empty());

        Self {
            provider,
            model_id,
            dimensions,
            max_tokens,
            batch_size,
            gemini_api_key,
        }
    }
}

impl Validate for EmbeddingConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_range(self.dimensions as u64, 1, 8192, "embedding_dimensions")?;
        validation::validate_range(self.max_tokens as u64, 1, 32_768, "embedding_max_tokens")?;
        validation::validate_range(self.batch_size as u64, 1, 1024, "embedding_batch_size")?;
        if self.provider == EmbeddingProviderKind::Remote && self.gemini_api_key.is_none() {
            return Err(ConfigError::MissingField {
                field: "GEMINI_API_KEY".to_string(),
            });
        }
        Ok(())
    }
}

/// GitHub repo-fetcher configuration.
#[derive(Debug, Clone, Default)]
pub struct GithubConfig {
    /// Optional bearer token (`GITHUB_TOKEN`) that boosts REST API rate limits
    pub token: Option<String>,
}

impl GithubConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            token: std::env::var("GITHUB_TOKEN").ok().filter(|s| !s.is_empty()),
        }
    }
}

/// Response/query caching configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Time-to-live for cached query responses, seconds (`CACHE_TTL_SECONDS`)
    pub ttl_seconds: u64,
}

impl CacheConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            ttl_seconds: std::env::var("CACHE_TTL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CACHE_TTL_SECONDS),
        }
    }
}

impl Validate for CacheConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_range(self.ttl_seconds, 1, 86_400 * 30, "cache_ttl_seconds")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_config_defaults_to_8000() {
        // SAFETY: tests run single-threaded per `cargo test` default for this module
        // because we touch process-wide env state.
        unsafe {
            std::env::remove_var("PORT");
        }
        let cfg = ApiConfig::from_env();
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn database_config_rejects_empty_url() {
        let cfg = DatabaseConfig {
            url: String::new(),
            ssl_mode: "disable".to_string(),
            max_connections: 5,
            min_connections: 1,
            timeout_seconds: 30,
            idle_timeout_seconds: 300,
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn embedding_config_requires_key_for_remote_provider() {
        let cfg = EmbeddingConfig {
            provider: EmbeddingProviderKind::Remote,
            model_id: "test-model".to_string(),
            dimensions: 768,
            max_tokens: 512,
            batch_size: 32,
            gemini_api_key: None,
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn allowed_origins_parses_csv() {
        let cfg = ApiConfig {
            port: 8000,
            allowed_origins: "https://a.example, https://b.example"
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
        };
        assert_eq!(cfg.allowed_origins.len(), 2);
    }
}
