//! Embedder (C4): turns code chunks into unit-length vectors.
//!
//! Two interchangeable providers sit behind one [`EmbeddingProvider`] trait:
//! a [`LocalEmbeddingProvider`] running a Candle model in-process, and a
//! [`RemoteEmbeddingProvider`] calling an HTTPS embedding API. Provider
//! selection happens once at startup, driven by configuration.

pub mod embedding;
pub mod error;

pub use embedding::{
    build_provider, DefaultEmbeddingService, EmbeddingModel, EmbeddingProvider, EmbeddingService,
    EmbeddingStats, LocalEmbeddingProvider, RemoteEmbeddingProvider,
};
pub use error::{EmbeddingError, EmbeddingResult};
