use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LodeError;

/// Top-level configuration loaded from `.lodestone.toml`.
///
/// Every field has a sensible default so an empty (or absent) file works.
///
/// # Examples
///
/// ```
/// use lode_core::LodeConfig;
///
/// let config = LodeConfig::default();
/// assert_eq!(config.index.chunk_size, 500);
/// assert_eq!(config.search.limit, 10);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LodeConfig {
    /// Chunking and pipeline settings.
    #[serde(default)]
    pub index: IndexConfig,
    /// Embedding provider settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Search behavior settings.
    #[serde(default)]
    pub search: SearchConfig,
}

impl LodeConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Io`] if the file cannot be read, or
    /// [`LodeError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use lode_core::LodeConfig;
    /// use std::path::Path;
    ///
    /// let config = LodeConfig::from_file(Path::new(".lodestone.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, LodeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use lode_core::LodeConfig;
    ///
    /// let toml = r#"
    /// [index]
    /// chunk_size = 800
    /// "#;
    /// let config = LodeConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.index.chunk_size, 800);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, LodeError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// Chunking and indexing pipeline configuration.
///
/// # Examples
///
/// ```
/// use lode_core::IndexConfig;
///
/// let config = IndexConfig::default();
/// assert_eq!(config.chunk_size, 500);
/// assert_eq!(config.chunk_overlap, 50);
/// assert_eq!(config.min_chunk_chars, 50);
/// assert_eq!(config.max_file_size, 1_048_576);
/// assert_eq!(config.workers, 4);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Maximum characters per sliding-window chunk (default: 500).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Character overlap between consecutive window chunks (default: 50).
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Content shorter than this yields no chunks at all (default: 50).
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,
    /// Files larger than this are never indexed (default: 1 MiB).
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Number of files embedded concurrently (default: 4).
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_min_chunk_chars() -> usize {
    50
}

fn default_max_file_size() -> u64 {
    1_048_576
}

fn default_workers() -> usize {
    4
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            min_chunk_chars: default_min_chunk_chars(),
            max_file_size: default_max_file_size(),
            workers: default_workers(),
        }
    }
}

/// Configuration for the embedding provider.
///
/// # Examples
///
/// ```
/// use lode_core::EmbeddingConfig;
///
/// let config = EmbeddingConfig::default();
/// assert_eq!(config.model, "text-embedding-ada-002");
/// assert_eq!(config.max_tokens, 8191);
/// assert_eq!(config.dimensions, 1536);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// API key for the embedding provider.
    pub api_key: Option<String>,
    /// Custom base URL for an OpenAI-compatible API.
    pub base_url: Option<String>,
    /// Model identifier (default: `"text-embedding-ada-002"`).
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Embedding vector dimensions (default: 1536).
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,
    /// Published maximum input tokens for the model (default: 8191).
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Path to a HuggingFace `tokenizer.json` matched to the model,
    /// used for local token counting and truncation.
    pub tokenizer_path: Option<String>,
    /// Per-call timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".into()
}

fn default_embedding_dimensions() -> usize {
    1536
}

fn default_max_tokens() -> usize {
    8191
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
            max_tokens: default_max_tokens(),
            tokenizer_path: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Search behavior configuration.
///
/// # Examples
///
/// ```
/// use lode_core::SearchConfig;
///
/// let config = SearchConfig::default();
/// assert_eq!(config.limit, 10);
/// assert_eq!(config.similarity_threshold, 0.7);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum results per query (default: 10).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Minimum similarity score to include a result (default: 0.7).
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

fn default_limit() -> usize {
    10
}

fn default_similarity_threshold() -> f64 {
    0.7
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}
