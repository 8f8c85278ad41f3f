//! Application bootstrap and service initialization
//!
//! Separates service construction and dependency wiring from `main`, in
//! dependency order: database → vector store → embedding service → LLM
//! client → query service → job orchestrator → application state.

use codescribe_config::ApplicationConfig;
use codescribe_embeddings::{DefaultEmbeddingService, EmbeddingService};
use codescribe_indexing::Orchestrator;
use codescribe_meta::{DataClient, JobQueue, RepoIndexStore};
use codescribe_search::{DefaultRetriever, GeminiLlmClient, LlmClient, QueryService, Retriever, UnconfiguredLlmClient};
use codescribe_vector::{PgVectorStore, VectorStore};
use std::sync::Arc;
use tracing::info;

use crate::AppState;

/// Bootstrap result type
pub type BootstrapResult<T> = Result<T, Box<dyn std::error::Error>>;

/// The orchestrator type this binary wires concretely: trait objects over
/// each seam, so bootstrap doesn't need a generic parameter per provider.
pub type AppOrchestrator =
    Orchestrator<dyn JobQueue, dyn RepoIndexStore, dyn EmbeddingService, dyn VectorStore>;

/// Initialize the database connection pool and run embedded migrations.
///
/// # Errors
///
/// Returns an error if the pool cannot connect or a migration fails.
pub async fn setup_database(config: &ApplicationConfig) -> BootstrapResult<Arc<DataClient>> {
    info!("initializing database connection pool");
    let pool = codescribe_meta::initialize_database(&config.database).await?;
    let data_client = Arc::new(DataClient::new(
        pool,
        config.queue.attempts,
        config.queue.backoff_base_seconds,
    ));
    Ok(data_client)
}

/// Initialize the `pgvector`-backed vector store over the shared pool.
#[must_use]
pub fn setup_vector_store(data_client: &Arc<DataClient>) -> Arc<dyn VectorStore> {
    info!("initializing vector store");
    Arc::new(PgVectorStore::new(Arc::clone(data_client))) as Arc<dyn VectorStore>
}

/// Initialize the configured embedding provider (Local or Remote).
///
/// # Errors
///
/// Returns an error if the configured provider fails to build (e.g. the
/// remote provider selected without a `GEMINI_API_KEY`).
pub fn setup_embedding_service(config: &ApplicationConfig) -> BootstrapResult<Arc<dyn EmbeddingService>> {
    info!("initializing embedding service");
    let service = Arc::new(DefaultEmbeddingService::new(&config.embedding)?) as Arc<dyn EmbeddingService>;
    Ok(service)
}

/// Initialize the LLM client backing `/api/rag/query`'s answer generation.
///
/// Returns an [`UnconfiguredLlmClient`] (not an error) when `GEMINI_API_KEY`
/// is absent, so the process still starts and serves indexing traffic.
#[must_use]
pub fn setup_llm_client(config: &ApplicationConfig) -> Arc<dyn LlmClient> {
    match GeminiLlmClient::from_config(&config.embedding) {
        Some(client) => Arc::new(client) as Arc<dyn LlmClient>,
        None => {
            tracing::warn!("GEMINI_API_KEY not set; /api/rag/query will return an error until configured");
            Arc::new(UnconfiguredLlmClient) as Arc<dyn LlmClient>
        }
    }
}

/// Initialize the query service (C6 retrieve → C7 assemble → LLM generate).
#[must_use]
pub fn setup_query_service(
    embedding_service: &Arc<dyn EmbeddingService>,
    vector_store: &Arc<dyn VectorStore>,
    llm_client: Arc<dyn LlmClient>,
) -> Arc<QueryService> {
    info!("initializing query service");
    let retriever = Arc::new(DefaultRetriever::new(
        Arc::clone(embedding_service),
        Arc::clone(vector_store),
    )) as Arc<dyn Retriever>;
    Arc::new(QueryService::new(retriever, llm_client))
}

/// Initialize the job orchestrator (C9), draining `data_client`'s durable
/// queue with the worker concurrency and embedding model configured
/// application-wide. Does not start it — the caller decides when to
/// `tokio::spawn(orchestrator.run())`.
#[must_use]
pub fn setup_orchestrator(
    config: &ApplicationConfig,
    data_client: &Arc<DataClient>,
    embedding_service: &Arc<dyn EmbeddingService>,
    vector_store: &Arc<dyn VectorStore>,
) -> AppOrchestrator {
    info!("initializing job orchestrator");
    let queue = Arc::clone(data_client) as Arc<dyn JobQueue>;
    let repo_index_store = Arc::clone(data_client) as Arc<dyn RepoIndexStore>;
    let mut orchestrator = Orchestrator::with_config(
        config,
        queue,
        repo_index_store,
        Arc::clone(embedding_service),
        Arc::clone(vector_store),
    );
    if let Ok(base_url) = std::env::var("GITHUB_API_BASE_URL") {
        orchestrator = orchestrator.with_github_api_base_url(base_url);
    }
    orchestrator
}

/// Initialize all services, returning the application state plus the
/// not-yet-started orchestrator for the binary to spawn.
///
/// # Errors
///
/// Returns an error if any service initialization fails.
pub async fn initialize_app_state(config: &ApplicationConfig) -> BootstrapResult<(AppState, AppOrchestrator)> {
    let data_client = setup_database(config).await?;
    let vector_store = setup_vector_store(&data_client);
    let embedding_service = setup_embedding_service(config)?;
    let llm_client = setup_llm_client(config);
    let query_service = setup_query_service(&embedding_service, &vector_store, llm_client);
    let orchestrator = setup_orchestrator(config, &data_client, &embedding_service, &vector_store);

    let job_queue = Arc::clone(&data_client) as Arc<dyn JobQueue>;
    let state = AppState::new(job_queue, query_service, config.github.token.clone());

    info!("application state initialized successfully");
    Ok((state, orchestrator))
}
