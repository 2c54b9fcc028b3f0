//! Core types, configuration, and error handling for Lodestone.
//!
//! This crate provides the shared foundation used by the engine and the CLI:
//! - [`LodeError`]: unified error type using `thiserror`
//! - [`LodeConfig`]: configuration loaded from `.lodestone.toml`
//! - Shared types: [`FileDescriptor`], [`ChunkType`], [`SearchResult`],
//!   [`RelatedFile`], [`IndexSummary`]

mod config;
mod error;
mod types;

pub use config::{EmbeddingConfig, IndexConfig, LodeConfig, SearchConfig};
pub use error::LodeError;
pub use types::{ChunkType, FileDescriptor, IndexSummary, RelatedFile, SearchResult};

/// A convenience `Result` type for Lodestone operations.
pub type Result<T> = std::result::Result<T, LodeError>;
