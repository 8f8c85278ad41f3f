//! Vector Store Writer (C5) and the storage half of the Retriever (C6).
//!
//! Persists [`EmbeddedChunk`]s into a vector-capable `PostgreSQL` table
//! (`code_chunks`, `pgvector`-typed) under one of three commit-hash-driven
//! write strategies, and serves per-repo cosine-similarity search restricted
//! by an HNSW index. Storage is abstracted behind [`VectorStore`] so callers
//! depend on a trait, not a concrete backend.

pub mod error;
pub mod models;
pub mod storage;

pub use error::{VectorDataError, VectorDataResult};
pub use models::{EmbeddedChunk, RetrievedChunk, WriteOptions, WriteResult, WriteStrategy};
pub use storage::{InMemoryVectorStore, PgVectorStore, VectorStore, DEFAULT_TOP_K, SIMILARITY_FLOOR};
