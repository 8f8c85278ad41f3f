//! Repo-index bookkeeping and durable job queue, backed by `PostgreSQL`.
//!
//! This crate owns the `repo_index` and `index_jobs` tables (schema in
//! `migrations/`), and the pool those tables share with the vector store
//! (`codescribe-vector` borrows the same pool via [`client::DataClient::pool`]).

pub mod client;
pub mod error;
pub mod mock;
pub mod models;
pub mod pool;
pub mod traits;

pub use client::DataClient;
pub use error::{DatabaseOperation, MetaError, MetaResult};
pub use mock::MockDataClient;
pub use models::{IndexRepoJobData, IndexRepoJobResult, Job, JobStatus, RepoIndex};
pub use pool::{create_pool, initialize_database};
pub use traits::{JobQueue, RepoIndexStore};
