//! Postgres-backed implementation of [`RepoIndexStore`] and [`JobQueue`]

use crate::error::{DatabaseErrorExt, DatabaseOperation, MetaError, MetaResult};
use crate::models::{IndexRepoJobData, IndexRepoJobResult, Job, JobStatus, RepoIndex};
use crate::traits::{JobQueue, RepoIndexStore};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Owns the connection pool backing both the repo index and the durable
/// `"index-repo"` queue; the job orchestrator and query service each receive
/// one `Arc<DataClient>` at construction (cf. the "global singleton DB
/// clients" design note — abstracted here as an injected dependency).
#[derive(Clone)]
pub struct DataClient {
    pool: PgPool,
    max_attempts: i32,
    backoff_base_seconds: i64,
}

impl DataClient {
    /// Construct a client over an existing pool.
    pub fn new(pool: PgPool, max_attempts: u32, backoff_base_seconds: u64) -> Self {
        Self {
            pool,
            max_attempts: max_attempts as i32,
            backoff_base_seconds: backoff_base_seconds as i64,
        }
    }

    /// Access the underlying pool, e.g. for a sibling crate's raw queries
    /// against `code_chunks`.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RepoIndexStore for DataClient {
    async fn get_repo_index(&self, repo_id: &str) -> MetaResult<Option<RepoIndex>> {
        sqlx::query_as::<_, RepoIndex>(
            "SELECT repo_id, commit_hash, default_branch, size_kb, file_count, chunk_count, \
             embedding_model, updated_at FROM repo_index WHERE repo_id = $1",
        )
        .bind(repo_id)
        .fetch_optional(&self.pool)
        .await
        .with_op(DatabaseOperation::GetRepoIndex {
            repo_id: repo_id.to_string(),
        })
    }

    async fn upsert_repo_index(&self, index: &RepoIndex) -> MetaResult<()> {
        sqlx::query(
            "INSERT INTO repo_index (repo_id, commit_hash, default_branch, size_kb, file_count, \
             chunk_count, embedding_model, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (repo_id) DO UPDATE SET \
             commit_hash = EXCLUDED.commit_hash, \
             default_branch = EXCLUDED.default_branch, \
             size_kb = EXCLUDED.size_kb, \
             file_count = EXCLUDED.file_count, \
             chunk_count = EXCLUDED.chunk_count, \
             embedding_model = EXCLUDED.embedding_model, \
             updated_at = EXCLUDED.updated_at",
        )
        .bind(&index.repo_id)
        .bind(&index.commit_hash)
        .bind(&index.default_branch)
        .bind(index.size_kb)
        .bind(index.file_count)
        .bind(index.chunk_count)
        .bind(&index.embedding_model)
        .bind(index.updated_at)
        .execute(&self.pool)
        .await
        .with_op(DatabaseOperation::UpsertRepoIndex {
            repo_id: index.repo_id.clone(),
        })?;
        Ok(())
    }
}

#[async_trait]
impl JobQueue for DataClient {
    async fn enqueue(&self, data: IndexRepoJobData) -> MetaResult<Uuid> {
        let job_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO index_jobs (job_id, github_url, github_token, requested_by, state, \
             progress, attempts, max_attempts, run_at) \
             VALUES ($1, $2, $3, $4, 'queued', 0, 0, $5, now())",
        )
        .bind(job_id)
        .bind(&data.github_url)
        .bind(&data.github_token)
        .bind(&data.requested_by)
        .bind(self.max_attempts)
        .execute(&self.pool)
        .await
        .with_op(DatabaseOperation::EnqueueJob {
            job_id: job_id.to_string(),
        })?;
        Ok(job_id)
    }

    async fn dequeue(&self) -> MetaResult<Option<Job>> {
        let row = sqlx::query(
            "UPDATE index_jobs SET state = 'active', updated_at = now() \
             WHERE job_id = ( \
                SELECT job_id FROM index_jobs \
                WHERE state = 'queued' AND run_at <= now() \
                ORDER BY run_at ASC \
                FOR UPDATE SKIP LOCKED \
                LIMIT 1 \
             ) \
             RETURNING job_id, github_url, github_token, requested_by, state, progress, \
                       attempts, max_attempts, return_value, fail_reason",
        )
        .fetch_optional(&self.pool)
        .await
        .with_op(DatabaseOperation::DequeueJob)?;

        row.map(|row| row_to_job(&row)).transpose()
    }

    async fn update_progress(&self, job_id: Uuid, progress: i32) -> MetaResult<()> {
        sqlx::query("UPDATE index_jobs SET progress = $2, updated_at = now() WHERE job_id = $1")
            .bind(job_id)
            .bind(progress)
            .execute(&self.pool)
            .await
            .with_op(DatabaseOperation::UpdateJobProgress {
                job_id: job_id.to_string(),
            })?;
        Ok(())
    }

    async fn complete(&self, job_id: Uuid, result: IndexRepoJobResult) -> MetaResult<()> {
        let value = serde_json::to_value(&result).map_err(|e| MetaError::Other(e.to_string()))?;
        sqlx::query(
            "UPDATE index_jobs SET state = 'completed', progress = 100, return_value = $2, \
             updated_at = now() WHERE job_id = $1",
        )
        .bind(job_id)
        .bind(value)
        .execute(&self.pool)
        .await
        .with_op(DatabaseOperation::CompleteJob {
            job_id: job_id.to_string(),
        })?;
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, reason: &str) -> MetaResult<()> {
        let row = sqlx::query("SELECT attempts, max_attempts FROM index_jobs WHERE job_id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .with_op(DatabaseOperation::FailJob {
                job_id: job_id.to_string(),
            })?
            .ok_or_else(|| MetaError::JobNotFound(job_id.to_string()))?;

        let attempts: i32 = row.try_get("attempts").unwrap_or(0);
        let max_attempts: i32 = row.try_get("max_attempts").unwrap_or(self.max_attempts);
        let next_attempts = attempts + 1;

        if next_attempts >= max_attempts {
            sqlx::query(
                "UPDATE index_jobs SET state = 'failed', attempts = $2, fail_reason = $3, \
                 updated_at = now() WHERE job_id = $1",
            )
            .bind(job_id)
            .bind(next_attempts)
            .bind(reason)
            .execute(&self.pool)
            .await
            .with_op(DatabaseOperation::FailJob {
                job_id: job_id.to_string(),
            })?;
        } else {
            // exponential backoff: base * 2^(attempts): 5s, 10s, 20s for base=5
            let delay_seconds = self.backoff_base_seconds * (1_i64 << attempts.max(0));
            sqlx::query(
                "UPDATE index_jobs SET state = 'queued', attempts = $2, fail_reason = $3, \
                 run_at = now() + make_interval(secs => $4), updated_at = now() \
                 WHERE job_id = $1",
            )
            .bind(job_id)
            .bind(next_attempts)
            .bind(reason)
            .bind(delay_seconds as f64)
            .execute(&self.pool)
            .await
            .with_op(DatabaseOperation::FailJob {
                job_id: job_id.to_string(),
            })?;
        }
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> MetaResult<Option<Job>> {
        let row = sqlx::query(
            "SELECT job_id, github_url, github_token, requested_by, state, progress, attempts, \
             max_attempts, return_value, fail_reason FROM index_jobs WHERE job_id = $1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .with_op(DatabaseOperation::GetJob {
            job_id: job_id.to_string(),
        })?;

        row.map(|row| row_to_job(&row)).transpose()
    }
}

fn row_to_job(row: &sqlx::postgres::PgRow) -> MetaResult<Job> {
    let state_str: String = row.try_get("state").map_err(sqlx_col_err)?;
    let return_value: Option<serde_json::Value> =
        row.try_get("return_value").map_err(sqlx_col_err)?;

    Ok(Job {
        job_id: row.try_get("job_id").map_err(sqlx_col_err)?,
        github_url: row.try_get("github_url").map_err(sqlx_col_err)?,
        github_token: row.try_get("github_token").map_err(sqlx_col_err)?,
        requested_by: row.try_get("requested_by").map_err(sqlx_col_err)?,
        state: state_str
            .parse()
            .map_err(|e: String| MetaError::Other(e))?,
        progress: row.try_get("progress").map_err(sqlx_col_err)?,
        attempts: row.try_get("attempts").map_err(sqlx_col_err)?,
        max_attempts: row.try_get("max_attempts").map_err(sqlx_col_err)?,
        return_value: return_value
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| MetaError::Other(e.to_string()))?,
        fail_reason: row.try_get("fail_reason").map_err(sqlx_col_err)?,
    })
}

fn sqlx_col_err(e: sqlx::Error) -> MetaError {
    MetaError::Database {
        operation: DatabaseOperation::GetJob {
            job_id: "<row decode>".to_string(),
        },
        source: e,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_round_trips_through_display_and_parse() {
        for state in [
            JobStatus::Queued,
            JobStatus::Active,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            let parsed: JobStatus = state.to_string().parse().unwrap();
            assert_eq!(parsed, state);
        }
    }

    #[test]
    fn backoff_doubles_from_base() {
        let base = 5_i64;
        let delays: Vec<i64> = (0..3).map(|attempt| base * (1_i64 << attempt)).collect();
        assert_eq!(delays, vec![5, 10, 20]);
    }
}
