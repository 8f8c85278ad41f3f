//! File filtering and chunking: turns raw fetched files into embeddable,
//! deterministically-identified code chunks.
//!
//! This crate implements C1 (File Filter) and C3 (Chunker). It deliberately
//! does not parse source with a real grammar: chunk boundaries are detected
//! with per-language line patterns, falling back to a fixed-size sliding
//! window, which keeps the crate free of native-code toolchain dependencies.

pub mod chunking;
pub mod error;
pub mod filter;

pub use chunking::{chunk, chunk_id, safe, ChunkStrategy, ChunkingResult, CodeChunk};
pub use error::{ParsingError, ParsingResult};
pub use filter::{filter, path_is_admissible, AcceptedFile, FilterResult, RawFile, RejectedFile};
