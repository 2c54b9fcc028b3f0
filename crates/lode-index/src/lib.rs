//! Semantic indexing and similarity search engine.
//!
//! Turns heterogeneous source files into structurally meaningful chunks,
//! embeds each chunk through an external provider, persists the vectors in
//! SQLite, and answers ranked nearest-neighbor queries with deterministic
//! tie-breaking. Chunking uses lightweight structural heuristics keyed by
//! language (indentation tracking, brace counting, sliding window), not a
//! full-grammar parser.

pub mod chunker;
pub mod coordinator;
pub mod embedding;
pub mod extract;
pub mod filter;
pub mod scan;
pub mod store;

pub use chunker::{ChunkExtractor, CodeChunk};
pub use coordinator::IndexCoordinator;
pub use embedding::EmbeddingClient;
pub use store::{StoreStats, VectorStore};
