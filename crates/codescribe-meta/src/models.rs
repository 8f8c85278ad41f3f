//! Persisted record types for the repo index and the durable job queue

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One record per indexed repository.
///
/// `commit_hash` present implies every stored chunk for `repo_id` was
/// embedded from that commit.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RepoIndex {
    pub repo_id: String,
    pub commit_hash: Option<String>,
    pub default_branch: String,
    pub size_kb: i32,
    pub file_count: i32,
    pub chunk_count: i32,
    pub embedding_model: String,
    pub updated_at: DateTime<Utc>,
}

/// Job lifecycle state. Transitions are monotonic except the backoff-driven
/// `Failed -> Queued` retry transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Active,
    Completed,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown job state: {other}")),
        }
    }
}

/// Payload for an `"index-repo"` job, as submitted by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRepoJobData {
    pub github_url: String,
    pub github_token: Option<String>,
    pub requested_by: Option<String>,
}

/// Result of a completed `"index-repo"` job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct IndexRepoJobResult {
    pub repo_id: String,
    pub strategy: String,
    pub chunks_written: usize,
    pub total_duration_ms: u64,
}

/// A durable queue entry backing one indexing request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: Uuid,
    pub github_url: String,
    /// Never serialized: present only so a worker can authenticate its
    /// fetch, absent from any HTTP status response.
    #[serde(skip_serializing, default)]
    pub github_token: Option<String>,
    pub requested_by: Option<String>,
    pub state: JobStatus,
    pub progress: i32,
    pub attempts: i32,
    pub max_attempts: i32,
    pub return_value: Option<IndexRepoJobResult>,
    pub fail_reason: Option<String>,
}
