//! Chunker (C3): splits accepted files into embeddable [`chunk::CodeChunk`]s.

pub mod chunk;
pub mod chunker;
pub mod languages;
pub mod sliding_window;
pub mod symbol;

pub use chunk::{chunk_id, safe, ChunkStrategy, ChunkingResult, CodeChunk};
pub use chunker::chunk;
pub use languages::{extension_of, language_for_extension};
