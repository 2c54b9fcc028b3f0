use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A file handed to the engine by the repository-crawling collaborator.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use lode_core::FileDescriptor;
///
/// let file = FileDescriptor {
///     path: PathBuf::from("src/main.py"),
///     extension: ".py".into(),
///     size: 120,
///     content_preview: "def main():\n    pass\n".into(),
///     language: "python".into(),
/// };
/// assert_eq!(file.language, "python");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    /// Path relative to the repository root.
    pub path: PathBuf,
    /// File extension including the leading dot (e.g. `".py"`).
    pub extension: String,
    /// File size in bytes.
    pub size: u64,
    /// File content available for chunking.
    pub content_preview: String,
    /// Language tag (e.g. `"python"`, `"javascript"`, `"unknown"`).
    pub language: String,
}

/// Classification of a code chunk, first matching rule wins.
///
/// # Examples
///
/// ```
/// use lode_core::ChunkType;
///
/// let ct = ChunkType::Function;
/// assert_eq!(format!("{ct}"), "function");
/// assert_eq!(ChunkType::default(), ChunkType::General);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    /// Contains a class definition.
    Class,
    /// Contains a function definition (and no class).
    Function,
    /// Mentions configuration, settings, or environment keywords.
    Config,
    /// Mentions test or spec keywords.
    Test,
    /// Anything else.
    #[default]
    General,
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkType::Class => write!(f, "class"),
            ChunkType::Function => write!(f, "function"),
            ChunkType::Config => write!(f, "config"),
            ChunkType::Test => write!(f, "test"),
            ChunkType::General => write!(f, "general"),
        }
    }
}

impl std::str::FromStr for ChunkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "class" => Ok(ChunkType::Class),
            "function" => Ok(ChunkType::Function),
            "config" => Ok(ChunkType::Config),
            "test" => Ok(ChunkType::Test),
            "general" => Ok(ChunkType::General),
            other => Err(format!("unknown chunk type: {other}")),
        }
    }
}

/// A semantic search hit. Never persisted, produced only as a query response.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use lode_core::{ChunkType, SearchResult};
///
/// let result = SearchResult {
///     file_path: PathBuf::from("src/auth.py"),
///     content: "def login(): ...".into(),
///     similarity_score: 0.92,
///     chunk_type: ChunkType::Function,
///     language: "python".into(),
///     line_count: 1,
///     char_count: 16,
/// };
/// assert!(result.similarity_score > 0.9);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Path of the file the chunk came from.
    pub file_path: PathBuf,
    /// Raw chunk content.
    pub content: String,
    /// `1 - cosine_distance(query, chunk)`, in `[-1, 1]`.
    pub similarity_score: f64,
    /// Classification of the matched chunk.
    pub chunk_type: ChunkType,
    /// Language tag of the matched chunk.
    pub language: String,
    /// Number of lines in the chunk.
    pub line_count: usize,
    /// Number of characters in the chunk.
    pub char_count: usize,
}

/// A file related to another file, ranked by embedding similarity.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use lode_core::{ChunkType, RelatedFile};
///
/// let related = RelatedFile {
///     file_path: PathBuf::from("src/session.py"),
///     chunk_type: ChunkType::Class,
///     language: "python".into(),
///     similarity_score: 0.81,
/// };
/// assert_eq!(related.language, "python");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedFile {
    /// Path of the related file.
    pub file_path: PathBuf,
    /// Classification of the best-matching chunk in that file.
    pub chunk_type: ChunkType,
    /// Language of the best-matching chunk.
    pub language: String,
    /// Highest similarity among the file's chunks.
    pub similarity_score: f64,
}

/// Summary returned by `index_repository`, counting successful items only.
///
/// # Examples
///
/// ```
/// use lode_core::IndexSummary;
///
/// let summary = IndexSummary {
///     repository_id: "repo-1".into(),
///     files_processed: 12,
///     chunks_created: 80,
///     embeddings_generated: 78,
/// };
/// assert!(summary.embeddings_generated <= summary.chunks_created);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSummary {
    /// Opaque id of the indexed repository.
    pub repository_id: String,
    /// Files that passed the filter and were picked up by the pipeline.
    pub files_processed: usize,
    /// Chunks produced across all processed files.
    pub chunks_created: usize,
    /// Chunks that were embedded and persisted.
    pub embeddings_generated: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_type_serializes_lowercase() {
        let json = serde_json::to_string(&ChunkType::Class).unwrap();
        assert_eq!(json, "\"class\"");
        let back: ChunkType = serde_json::from_str("\"general\"").unwrap();
        assert_eq!(back, ChunkType::General);
    }

    #[test]
    fn search_result_uses_camel_case_keys() {
        let result = SearchResult {
            file_path: PathBuf::from("a.py"),
            content: "x = 1".into(),
            similarity_score: 0.5,
            chunk_type: ChunkType::General,
            language: "python".into(),
            line_count: 1,
            char_count: 5,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("filePath").is_some());
        assert!(json.get("similarityScore").is_some());
        assert!(json.get("file_path").is_none());
    }

    #[test]
    fn index_summary_round_trips() {
        let summary = IndexSummary {
            repository_id: "r".into(),
            files_processed: 1,
            chunks_created: 2,
            embeddings_generated: 2,
        };
        let json = serde_json::to_string(&summary).unwrap();
        let back: IndexSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.chunks_created, 2);
    }
}
