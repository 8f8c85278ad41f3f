//! Trait seam for the repo index + durable job queue, so callers can depend
//! on an abstraction and tests can substitute an in-memory fake.

use crate::error::MetaResult;
use crate::models::{IndexRepoJobData, IndexRepoJobResult, Job, RepoIndex};
use async_trait::async_trait;
use uuid::Uuid;

/// Repo-index bookkeeping: the commit-hash-versioned reindex idempotency key
/// and per-repo counters the vector store writer updates after a successful
/// write.
#[async_trait]
pub trait RepoIndexStore: Send + Sync {
    /// Fetch the current index record for `repo_id`, if any.
    async fn get_repo_index(&self, repo_id: &str) -> MetaResult<Option<RepoIndex>>;

    /// Insert or replace the index record for `repo_id`.
    async fn upsert_repo_index(&self, index: &RepoIndex) -> MetaResult<()>;
}

/// Durable `"index-repo"` queue: producer side (`enqueue`) and consumer side
/// (`dequeue`/progress/completion), backed by `FOR UPDATE SKIP LOCKED` so a
/// bounded worker pool can poll concurrently without double-dequeue.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a new `"index-repo"` job, returning its id.
    async fn enqueue(&self, data: IndexRepoJobData) -> MetaResult<Uuid>;

    /// Atomically claim the next due `queued` job, marking it `active`.
    async fn dequeue(&self) -> MetaResult<Option<Job>>;

    /// Report incremental progress, 0-100.
    async fn update_progress(&self, job_id: Uuid, progress: i32) -> MetaResult<()>;

    /// Mark a job `completed` with its result.
    async fn complete(&self, job_id: Uuid, result: IndexRepoJobResult) -> MetaResult<()>;

    /// Record a failed attempt. Requeues with exponential backoff if
    /// `attempts < max_attempts`, otherwise marks the job terminally `failed`.
    async fn fail(&self, job_id: Uuid, reason: &str) -> MetaResult<()>;

    /// Fetch current job state for status polling. `None` if unknown.
    async fn get(&self, job_id: Uuid) -> MetaResult<Option<Job>>;
}
