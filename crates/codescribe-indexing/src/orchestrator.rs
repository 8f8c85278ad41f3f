//! Job Orchestrator (C9): a bounded worker pool draining the durable
//! `"index-repo"` queue, running each job through fetch → filter → chunk →
//! embed → write.

use crate::error::{IndexerError, IndexerResult};
use crate::fetcher::RepoFetcher;
use crate::pipeline;
use chrono::Utc;
use codescribe_embeddings::EmbeddingService;
use codescribe_meta::{IndexRepoJobResult, Job, JobQueue, RepoIndex, RepoIndexStore};
use codescribe_vector::{EmbeddedChunk, VectorStore, WriteOptions, WriteStrategy};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio::time::sleep;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Bounded pool of workers, each independently draining the queue and
/// running jobs to completion. Jobs across workers are independent; within
/// one worker, phases run sequentially.
pub struct Orchestrator<Q, S, E, V>
where
    Q: JobQueue + ?Sized,
    S: RepoIndexStore + ?Sized,
    E: EmbeddingService + ?Sized,
    V: VectorStore + ?Sized,
{
    queue: Arc<Q>,
    repo_index_store: Arc<S>,
    embedding_service: Arc<E>,
    vector_store: Arc<V>,
    embedding_model: String,
    concurrency: usize,
    shutdown: Arc<AtomicBool>,
    github_api_base_url: Option<String>,
}

impl<Q, S, E, V> Orchestrator<Q, S, E, V>
where
    Q: JobQueue + ?Sized + 'static,
    S: RepoIndexStore + ?Sized + 'static,
    E: EmbeddingService + ?Sized + 'static,
    V: VectorStore + ?Sized + 'static,
{
    #[must_use]
    pub fn new(
        queue: Arc<Q>,
        repo_index_store: Arc<S>,
        embedding_service: Arc<E>,
        vector_store: Arc<V>,
        embedding_model: String,
        concurrency: usize,
    ) -> Self {
        Self {
            queue,
            repo_index_store,
            embedding_service,
            vector_store,
            embedding_model,
            concurrency,
            shutdown: Arc::new(AtomicBool::new(false)),
            github_api_base_url: None,
        }
    }

    /// Points every job's [`RepoFetcher`] at a different GitHub REST API
    /// base URL — a GitHub Enterprise host, or a mock server in tests.
    #[must_use]
    pub fn with_github_api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.github_api_base_url = Some(base_url.into());
        self
    }

    /// Builds an orchestrator using the queue concurrency and embedding
    /// model configured application-wide, leaving the service handles to
    /// the caller (they're wired up differently depending on provider).
    #[must_use]
    pub fn with_config(
        config: &codescribe_config::ApplicationConfig,
        queue: Arc<Q>,
        repo_index_store: Arc<S>,
        embedding_service: Arc<E>,
        vector_store: Arc<V>,
    ) -> Self {
        Self::new(
            queue,
            repo_index_store,
            embedding_service,
            vector_store,
            config.embedding.model_id.clone(),
            config.queue.concurrency,
        )
    }

    /// Handle used to request a graceful stop: new dequeues stop, in-flight
    /// jobs run to their next phase boundary.
    #[must_use]
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Spawns `concurrency` workers and waits for all of them to exit,
    /// which happens once [`Self::shutdown_handle`] is set.
    pub async fn run(&self) {
        tracing::info!(concurrency = self.concurrency, "starting indexing worker pool");

        let mut workers = JoinSet::new();
        for worker_id in 0..self.concurrency {
            let queue = Arc::clone(&self.queue);
            let repo_index_store = Arc::clone(&self.repo_index_store);
            let embedding_service = Arc::clone(&self.embedding_service);
            let vector_store = Arc::clone(&self.vector_store);
            let embedding_model = self.embedding_model.clone();
            let shutdown = Arc::clone(&self.shutdown);
            let github_api_base_url = self.github_api_base_url.clone();

            workers.spawn(async move {
                worker_loop(
                    worker_id,
                    queue,
                    repo_index_store,
                    embedding_service,
                    vector_store,
                    embedding_model,
                    shutdown,
                    github_api_base_url,
                )
                .await;
            });
        }

        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "indexing worker task panicked");
            }
        }

        tracing::info!("indexing worker pool stopped");
    }
}

#[allow(clippy::too_many_arguments)]
async fn worker_loop<Q, S, E, V>(
    worker_id: usize,
    queue: Arc<Q>,
    repo_index_store: Arc<S>,
    embedding_service: Arc<E>,
    vector_store: Arc<V>,
    embedding_model: String,
    shutdown: Arc<AtomicBool>,
    github_api_base_url: Option<String>,
) where
    Q: JobQueue + ?Sized,
    S: RepoIndexStore + ?Sized,
    E: EmbeddingService + ?Sized,
    V: VectorStore + ?Sized,
{
    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::debug!(worker_id, "shutdown signal received");
            break;
        }

        match queue.dequeue().await {
            Ok(Some(job)) => {
                let job_id = job.job_id;
                tracing::info!(worker_id, %job_id, url = %job.github_url, "starting indexing job");

                match run_job(
                    &job,
                    &*queue,
                    &*repo_index_store,
                    &*embedding_service,
                    &*vector_store,
                    &embedding_model,
                    github_api_base_url.as_deref(),
                )
                .await
                {
                    Ok(result) => {
                        if let Err(e) = queue.complete(job_id, result).await {
                            tracing::error!(worker_id, %job_id, error = %e, "failed to mark job complete");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(worker_id, %job_id, error = %e, "indexing job failed");
                        if let Err(e) = queue.fail(job_id, &e.to_string()).await {
                            tracing::error!(worker_id, %job_id, error = %e, "failed to record job failure");
                        }
                    }
                }
            }
            Ok(None) => sleep(POLL_INTERVAL).await,
            Err(e) => {
                tracing::error!(worker_id, error = %e, "failed to dequeue job");
                sleep(POLL_INTERVAL * 5).await;
            }
        }
    }
}

/// Runs one job's phases: parse URL + fetch metadata, C8, C4, C5.
async fn run_job<S, E, V>(
    job: &Job,
    queue: &(impl JobQueue + ?Sized),
    repo_index_store: &S,
    embedding_service: &E,
    vector_store: &V,
    embedding_model: &str,
    github_api_base_url: Option<&str>,
) -> IndexerResult<IndexRepoJobResult>
where
    S: RepoIndexStore + ?Sized,
    E: EmbeddingService + ?Sized,
    V: VectorStore + ?Sized,
{
    let started = Instant::now();
    let mut fetcher = RepoFetcher::new(job.github_token.clone());
    if let Some(base_url) = github_api_base_url {
        fetcher = fetcher.with_api_base_url(base_url);
    }
    let _ = queue.update_progress(job.job_id, 5).await;

    let (chunks, repo_meta, stats) = pipeline::run(&fetcher, &job.github_url).await?;
    tracing::debug!(
        job_id = %job.job_id,
        fetched = stats.files_fetched,
        accepted = stats.files_accepted,
        rejected = stats.files_rejected,
        chunks = stats.chunks_emitted,
        "ingestion pipeline finished"
    );
    let _ = queue.update_progress(job.job_id, 40).await;

    if chunks.is_empty() {
        return Ok(IndexRepoJobResult {
            repo_id: repo_meta.repo_id,
            strategy: "skipped".to_string(),
            chunks_written: 0,
            total_duration_ms: started.elapsed().as_millis() as u64,
        });
    }

    let commit_hash = fetcher
        .fetch_latest_commit_hash(&repo_meta.repo_id, &repo_meta.default_branch)
        .await;

    let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    let embeddings = embedding_service.generate_embeddings(texts).await?;
    let _ = queue.update_progress(job.job_id, 80).await;

    let embedded_at = Utc::now();
    let embedded_chunks: Vec<EmbeddedChunk> = chunks
        .into_iter()
        .zip(embeddings)
        .map(|(chunk, embedding)| EmbeddedChunk {
            chunk,
            embedding,
            embedded_at,
        })
        .collect();

    let write_result = vector_store
        .write(
            &embedded_chunks,
            &WriteOptions {
                repo_id: repo_meta.repo_id.clone(),
                commit_hash: commit_hash.clone(),
                default_branch: repo_meta.default_branch.clone(),
                size_kb: repo_meta.size_kb,
                file_count: repo_meta.file_count,
                embedding_model: embedding_model.to_string(),
            },
        )
        .await?;
    let _ = queue.update_progress(job.job_id, 100).await;

    // `Skipped` means the write left `code_chunks` and `repo_index` untouched
    // (§4.5: "no writes"); upserting here regardless would zero out
    // `chunk_count` on an unchanged commit and break reindex idempotency.
    if write_result.strategy != WriteStrategy::Skipped {
        repo_index_store
            .upsert_repo_index(&RepoIndex {
                repo_id: repo_meta.repo_id.clone(),
                commit_hash,
                default_branch: repo_meta.default_branch,
                size_kb: repo_meta.size_kb,
                file_count: repo_meta.file_count,
                chunk_count: write_result.chunks_written as i32,
                embedding_model: embedding_model.to_string(),
                updated_at: embedded_at,
            })
            .await?;
    }

    Ok(IndexRepoJobResult {
        repo_id: repo_meta.repo_id,
        strategy: format!("{:?}", write_result.strategy).to_lowercase(),
        chunks_written: write_result.chunks_written,
        total_duration_ms: started.elapsed().as_millis() as u64,
    })
}

/// Status of a job for HTTP status polling. `None` maps to a `404`.
pub async fn status(queue: &(impl JobQueue + ?Sized), job_id: uuid::Uuid) -> IndexerResult<Option<Job>> {
    queue.get(job_id).await.map_err(IndexerError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codescribe_embeddings::embedding::service::{DefaultEmbeddingService, MockEmbeddingProvider};
    use codescribe_meta::{IndexRepoJobData, JobStatus, MockDataClient};
    use codescribe_vector::InMemoryVectorStore;

    async fn mount_small_repo(server: &wiremock::MockServer, owner_repo: &str) {
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path(format!("/repos/{owner_repo}")))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"default_branch": "main", "size": 1})),
            )
            .mount(server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path(format!("/repos/{owner_repo}/git/trees/main")))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tree": [{"path": "src/index.ts", "type": "blob", "sha": "abc", "size": 20}]
            })))
            .mount(server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path(format!("/repos/{owner_repo}/contents/src/index.ts")))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("export function lib() {}"))
            .mount(server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path(format!("/repos/{owner_repo}/commits/main")))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({"sha": "deadbeef"})),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn run_job_indexes_a_small_repo_end_to_end() {
        let server = wiremock::MockServer::start().await;
        mount_small_repo(&server, "octocat/demo").await;

        let queue = MockDataClient::new();
        let job_id = queue
            .enqueue(IndexRepoJobData {
                github_url: "https://github.com/octocat/demo".to_string(),
                github_token: None,
                requested_by: None,
            })
            .await
            .unwrap();
        let job = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(job.job_id, job_id);

        let embedding_service =
            DefaultEmbeddingService::with_provider(Arc::new(MockEmbeddingProvider::new(4)), 16);
        let vector_store = InMemoryVectorStore::new();

        let result = run_job(
            &job,
            &queue,
            &queue,
            &embedding_service,
            &vector_store,
            "mock-embedding-model",
            Some(&server.uri()),
        )
        .await
        .unwrap();

        assert_eq!(result.repo_id, "octocat/demo");
        assert!(result.chunks_written > 0);

        let repo_index = queue.get_repo_index("octocat/demo").await.unwrap().unwrap();
        assert_eq!(repo_index.commit_hash.as_deref(), Some("deadbeef"));
        assert_eq!(repo_index.chunk_count as usize, result.chunks_written);
    }

    #[tokio::test]
    async fn run_job_resubmit_with_unchanged_commit_leaves_repo_index_untouched() {
        let server = wiremock::MockServer::start().await;
        mount_small_repo(&server, "octocat/demo").await;

        let queue = MockDataClient::new();
        let embedding_service =
            DefaultEmbeddingService::with_provider(Arc::new(MockEmbeddingProvider::new(4)), 16);
        let vector_store = InMemoryVectorStore::new();

        queue
            .enqueue(IndexRepoJobData {
                github_url: "https://github.com/octocat/demo".to_string(),
                github_token: None,
                requested_by: None,
            })
            .await
            .unwrap();
        let job = queue.dequeue().await.unwrap().unwrap();
        let first = run_job(
            &job,
            &queue,
            &queue,
            &embedding_service,
            &vector_store,
            "mock-embedding-model",
            Some(&server.uri()),
        )
        .await
        .unwrap();
        assert_eq!(first.strategy, "full-reindex");
        assert!(first.chunks_written > 0);
        let after_first = queue.get_repo_index("octocat/demo").await.unwrap().unwrap();

        queue
            .enqueue(IndexRepoJobData {
                github_url: "https://github.com/octocat/demo".to_string(),
                github_token: None,
                requested_by: None,
            })
            .await
            .unwrap();
        let job = queue.dequeue().await.unwrap().unwrap();
        let second = run_job(
            &job,
            &queue,
            &queue,
            &embedding_service,
            &vector_store,
            "mock-embedding-model",
            Some(&server.uri()),
        )
        .await
        .unwrap();
        assert_eq!(second.strategy, "skipped");
        assert_eq!(second.chunks_written, 0);

        let after_second = queue.get_repo_index("octocat/demo").await.unwrap().unwrap();
        assert_eq!(after_second.chunk_count, after_first.chunk_count);
        assert_eq!(after_second.updated_at, after_first.updated_at);
    }

    #[tokio::test]
    async fn run_job_skips_writes_when_the_repo_has_no_chunkable_files() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/repos/octocat/empty"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"default_branch": "main", "size": 0})),
            )
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/repos/octocat/empty/git/trees/main"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({"tree": []})))
            .mount(&server)
            .await;

        let queue = MockDataClient::new();
        queue
            .enqueue(IndexRepoJobData {
                github_url: "https://github.com/octocat/empty".to_string(),
                github_token: None,
                requested_by: None,
            })
            .await
            .unwrap();
        let job = queue.dequeue().await.unwrap().unwrap();

        let embedding_service =
            DefaultEmbeddingService::with_provider(Arc::new(MockEmbeddingProvider::new(4)), 16);
        let vector_store = InMemoryVectorStore::new();

        let result = run_job(
            &job,
            &queue,
            &queue,
            &embedding_service,
            &vector_store,
            "mock-embedding-model",
            Some(&server.uri()),
        )
        .await
        .unwrap();

        assert_eq!(result.repo_id, "octocat/empty");
        assert_eq!(result.strategy, "skipped");
        assert_eq!(result.chunks_written, 0);
    }

    #[tokio::test]
    async fn worker_loop_completes_a_queued_job_then_stops_on_shutdown() {
        let server = wiremock::MockServer::start().await;
        mount_small_repo(&server, "octocat/demo2").await;

        let queue = Arc::new(MockDataClient::new());
        let job_id = queue
            .enqueue(IndexRepoJobData {
                github_url: "https://github.com/octocat/demo2".to_string(),
                github_token: None,
                requested_by: None,
            })
            .await
            .unwrap();

        let embedding_service: Arc<DefaultEmbeddingService> = Arc::new(
            DefaultEmbeddingService::with_provider(Arc::new(MockEmbeddingProvider::new(4)), 16),
        );
        let vector_store = Arc::new(InMemoryVectorStore::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let shutdown_clone = Arc::clone(&shutdown);
        let queue_clone = Arc::clone(&queue);
        let handle = tokio::spawn(async move {
            worker_loop(
                0,
                queue_clone.clone(),
                queue_clone,
                embedding_service,
                vector_store,
                "mock-embedding-model".to_string(),
                shutdown_clone,
                Some(server.uri()),
            )
            .await;
        });

        // Give the worker a chance to drain the one queued job, then stop it.
        tokio::time::sleep(Duration::from_millis(200)).await;
        shutdown.store(true, Ordering::Relaxed);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("worker_loop did not stop after shutdown signal")
            .unwrap();

        let job = queue.get(job_id).await.unwrap().unwrap();
        assert_eq!(job.state, JobStatus::Completed);
    }
}
