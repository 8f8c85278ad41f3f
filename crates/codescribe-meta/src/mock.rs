//! In-memory fakes for [`RepoIndexStore`] and [`JobQueue`], for unit tests
//! that should not require a live Postgres instance.

use crate::error::{MetaError, MetaResult};
use crate::models::{IndexRepoJobData, IndexRepoJobResult, Job, JobStatus, RepoIndex};
use crate::traits::{JobQueue, RepoIndexStore};
use async_trait::async_trait;
use std::sync::Mutex;
use uuid::Uuid;

/// An in-memory stand-in for [`DataClient`](crate::client::DataClient).
#[derive(Default)]
pub struct MockDataClient {
    repos: Mutex<std::collections::HashMap<String, RepoIndex>>,
    jobs: Mutex<std::collections::HashMap<Uuid, Job>>,
}

impl MockDataClient {
    /// Create an empty mock store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RepoIndexStore for MockDataClient {
    async fn get_repo_index(&self, repo_id: &str) -> MetaResult<Option<RepoIndex>> {
        Ok(self.repos.lock().unwrap().get(repo_id).cloned())
    }

    async fn upsert_repo_index(&self, index: &RepoIndex) -> MetaResult<()> {
        self.repos
            .lock()
            .unwrap()
            .insert(index.repo_id.clone(), index.clone());
        Ok(())
    }
}

#[async_trait]
impl JobQueue for MockDataClient {
    async fn enqueue(&self, data: IndexRepoJobData) -> MetaResult<Uuid> {
        let job_id = Uuid::new_v4();
        let job = Job {
            job_id,
            github_url: data.github_url,
            github_token: data.github_token,
            requested_by: data.requested_by,
            state: JobStatus::Queued,
            progress: 0,
            attempts: 0,
            max_attempts: 3,
            return_value: None,
            fail_reason: None,
        };
        self.jobs.lock().unwrap().insert(job_id, job);
        Ok(job_id)
    }

    async fn dequeue(&self) -> MetaResult<Option<Job>> {
        let mut jobs = self.jobs.lock().unwrap();
        let next = jobs
            .values_mut()
            .find(|j| j.state == JobStatus::Queued)
            .map(|j| {
                j.state = JobStatus::Active;
                j.clone()
            });
        Ok(next)
    }

    async fn update_progress(&self, job_id: Uuid, progress: i32) -> MetaResult<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(&job_id)
            .ok_or_else(|| MetaError::JobNotFound(job_id.to_string()))?;
        job.progress = progress;
        Ok(())
    }

    async fn complete(&self, job_id: Uuid, result: IndexRepoJobResult) -> MetaResult<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(&job_id)
            .ok_or_else(|| MetaError::JobNotFound(job_id.to_string()))?;
        job.state = JobStatus::Completed;
        job.progress = 100;
        job.return_value = Some(result);
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, reason: &str) -> MetaResult<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(&job_id)
            .ok_or_else(|| MetaError::JobNotFound(job_id.to_string()))?;
        job.attempts += 1;
        job.fail_reason = Some(reason.to_string());
        job.state = if job.attempts >= job.max_attempts {
            JobStatus::Failed
        } else {
            JobStatus::Queued
        };
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> MetaResult<Option<Job>> {
        Ok(self.jobs.lock().unwrap().get(&job_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enqueue_then_dequeue_marks_active() {
        let client = MockDataClient::new();
        let job_id = client
            .enqueue(IndexRepoJobData {
                github_url: "https://github.com/octocat/Hello-World".to_string(),
                github_token: None,
                requested_by: None,
            })
            .await
            .unwrap();

        let job = client.dequeue().await.unwrap().unwrap();
        assert_eq!(job.job_id, job_id);
        assert_eq!(job.state, JobStatus::Active);
    }

    #[tokio::test]
    async fn fail_requeues_until_attempts_exhausted() {
        let client = MockDataClient::new();
        let job_id = client
            .enqueue(IndexRepoJobData {
                github_url: "https://github.com/octocat/Hello-World".to_string(),
                github_token: None,
                requested_by: None,
            })
            .await
            .unwrap();

        client.fail(job_id, "boom").await.unwrap();
        assert_eq!(
            client.get(job_id).await.unwrap().unwrap().state,
            JobStatus::Queued
        );
        client.fail(job_id, "boom").await.unwrap();
        client.fail(job_id, "boom").await.unwrap();
        assert_eq!(
            client.get(job_id).await.unwrap().unwrap().state,
            JobStatus::Failed
        );
    }
}
