//! Error types for the metadata/queue layer

use thiserror::Error;

/// Names the database operation that failed, for structured log context.
#[derive(Debug, Clone)]
pub enum DatabaseOperation {
    GetRepoIndex { repo_id: String },
    UpsertRepoIndex { repo_id: String },
    DeleteChunksForRepo { repo_id: String },
    EnqueueJob { job_id: String },
    DequeueJob,
    UpdateJobProgress { job_id: String },
    CompleteJob { job_id: String },
    FailJob { job_id: String },
    GetJob { job_id: String },
}

impl std::fmt::Display for DatabaseOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GetRepoIndex { repo_id } => write!(f, "get_repo_index({repo_id})"),
            Self::UpsertRepoIndex { repo_id } => write!(f, "upsert_repo_index({repo_id})"),
            Self::DeleteChunksForRepo { repo_id } => {
                write!(f, "delete_chunks_for_repo({repo_id})")
            }
            Self::EnqueueJob { job_id } => write!(f, "enqueue_job({job_id})"),
            Self::DequeueJob => write!(f, "dequeue_job"),
            Self::UpdateJobProgress { job_id } => write!(f, "update_job_progress({job_id})"),
            Self::CompleteJob { job_id } => write!(f, "complete_job({job_id})"),
            Self::FailJob { job_id } => write!(f, "fail_job({job_id})"),
            Self::GetJob { job_id } => write!(f, "get_job({job_id})"),
        }
    }
}

/// Errors raised by the metadata store and durable job queue.
#[derive(Debug, Error)]
pub enum MetaError {
    #[error("database error during {operation}: {source}")]
    Database {
        operation: DatabaseOperation,
        #[source]
        source: sqlx::Error,
    },

    #[error("job {0} not found")]
    JobNotFound(String),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Other(String),
}

/// Result type for the metadata/queue layer.
pub type MetaResult<T> = Result<T, MetaError>;

/// Extension trait attaching [`DatabaseOperation`] context to a raw `sqlx::Error`.
pub trait DatabaseErrorExt<T> {
    /// Wrap a raw `sqlx` result with operation context.
    fn with_op(self, operation: DatabaseOperation) -> MetaResult<T>;
}

impl<T> DatabaseErrorExt<T> for Result<T, sqlx::Error> {
    fn with_op(self, operation: DatabaseOperation) -> MetaResult<T> {
        self.map_err(|source| MetaError::Database { operation, source })
    }
}
