//! SQLite storage for chunks and their embedding vectors.
//!
//! Embeddings are stored as little-endian f32 BLOBs; cosine similarity is
//! computed in Rust at query time. Inserts are append-only: re-indexing a
//! file adds new rows rather than replacing old ones, and cleanup happens
//! per repository via [`VectorStore::delete_repository`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use lode_core::{LodeError, RelatedFile, SearchResult};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::chunker::CodeChunk;

/// Index statistics.
///
/// # Examples
///
/// ```
/// use lode_index::store::StoreStats;
///
/// let stats = StoreStats {
///     total_chunks: 100,
///     total_files: 10,
///     total_repositories: 2,
///     index_size_bytes: 50000,
/// };
/// assert_eq!(stats.total_chunks, 100);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    /// Total number of chunks in the store.
    pub total_chunks: usize,
    /// Number of distinct file paths indexed.
    pub total_files: usize,
    /// Number of distinct repository identifiers.
    pub total_repositories: usize,
    /// Size of the database in bytes.
    pub index_size_bytes: u64,
}

/// SQLite-backed vector store for indexed chunks.
///
/// # Examples
///
/// ```
/// use lode_index::store::VectorStore;
///
/// let store = VectorStore::in_memory().unwrap();
/// let stats = store.stats().unwrap();
/// assert_eq!(stats.total_chunks, 0);
/// ```
pub struct VectorStore {
    conn: Connection,
}

impl VectorStore {
    /// Open or create a store database at the given path.
    ///
    /// Creates parent directories and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Storage`] if the database cannot be opened.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use lode_index::store::VectorStore;
    ///
    /// let store = VectorStore::open(Path::new(".lodestone/index.db")).unwrap();
    /// ```
    pub fn open(path: &Path) -> Result<Self, LodeError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                LodeError::Storage(format!("failed to create index directory: {e}"))
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|e| LodeError::Storage(format!("failed to open database: {e}")))?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Storage`] if schema creation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use lode_index::store::VectorStore;
    ///
    /// let store = VectorStore::in_memory().unwrap();
    /// ```
    pub fn in_memory() -> Result<Self, LodeError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            LodeError::Storage(format!("failed to create in-memory database: {e}"))
        })?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), LodeError> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS indexed_chunks (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    repository_id TEXT NOT NULL,
                    file_path TEXT NOT NULL,
                    chunk_type TEXT NOT NULL,
                    language TEXT NOT NULL,
                    content TEXT NOT NULL,
                    start_line INTEGER NOT NULL,
                    end_line INTEGER NOT NULL,
                    line_count INTEGER NOT NULL,
                    char_count INTEGER NOT NULL,
                    content_hash TEXT NOT NULL,
                    functions TEXT NOT NULL,
                    classes TEXT NOT NULL,
                    imports TEXT NOT NULL,
                    embedding BLOB NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_chunks_repository
                    ON indexed_chunks(repository_id);
                CREATE INDEX IF NOT EXISTS idx_chunks_file_path
                    ON indexed_chunks(file_path);
                ",
            )
            .map_err(|e| LodeError::Storage(format!("failed to create schema: {e}")))?;

        Ok(())
    }

    /// Store a chunk with its embedding under a repository identifier.
    ///
    /// Append-only: inserting the same chunk twice creates two rows.
    /// Returns the rowid of the inserted chunk.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Storage`] on insert failure.
    pub fn insert_chunk(
        &self,
        repository_id: &str,
        chunk: &CodeChunk,
        embedding: &[f32],
    ) -> Result<i64, LodeError> {
        let functions = serde_json::to_string(&chunk.functions)?;
        let classes = serde_json::to_string(&chunk.classes)?;
        let imports = serde_json::to_string(&chunk.imports)?;
        let embedding_bytes = floats_to_bytes(embedding);

        self.conn
            .execute(
                "INSERT INTO indexed_chunks
                 (repository_id, file_path, chunk_type, language, content,
                  start_line, end_line, line_count, char_count, content_hash,
                  functions, classes, imports, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    repository_id,
                    chunk.file_path.to_string_lossy().to_string(),
                    chunk.chunk_type.to_string(),
                    chunk.language,
                    chunk.content,
                    chunk.start_line,
                    chunk.end_line,
                    chunk.metadata.line_count as i64,
                    chunk.metadata.char_count as i64,
                    chunk.metadata.content_hash,
                    functions,
                    classes,
                    imports,
                    embedding_bytes,
                ],
            )
            .map_err(|e| LodeError::Storage(format!("failed to insert chunk: {e}")))?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Nearest-neighbour search by cosine similarity.
    ///
    /// Loads candidate embeddings and scores them in Rust. Results are
    /// filtered to `threshold` and the optional repository set, ordered by
    /// descending score with ties broken by ascending rowid (first-inserted
    /// first), and truncated to `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Storage`] on query failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use lode_index::store::VectorStore;
    ///
    /// let store = VectorStore::in_memory().unwrap();
    /// let results = store.query_nearest(&[0.1, 0.2], None, 5, 0.7).unwrap();
    /// assert!(results.is_empty());
    /// ```
    pub fn query_nearest(
        &self,
        query_embedding: &[f32],
        repository_ids: Option<&[String]>,
        limit: usize,
        threshold: f64,
    ) -> Result<Vec<SearchResult>, LodeError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, repository_id, file_path, chunk_type, language, content,
                        line_count, char_count, embedding
                 FROM indexed_chunks
                 ORDER BY id ASC",
            )
            .map_err(|e| LodeError::Storage(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                let repository_id: String = row.get(1)?;
                let embedding_bytes: Vec<u8> = row.get(8)?;
                let score = cosine_similarity(query_embedding, &bytes_to_floats(&embedding_bytes));

                let chunk_type: String = row.get(3)?;
                let result = SearchResult {
                    file_path: PathBuf::from(row.get::<_, String>(2)?),
                    content: row.get(5)?,
                    similarity_score: score,
                    chunk_type: chunk_type.parse().unwrap_or_default(),
                    language: row.get(4)?,
                    line_count: row.get::<_, i64>(6)? as usize,
                    char_count: row.get::<_, i64>(7)? as usize,
                };
                Ok((repository_id, result))
            })
            .map_err(|e| LodeError::Storage(format!("failed to query chunks: {e}")))?;

        let mut scored: Vec<SearchResult> = Vec::new();
        for row in rows {
            let (repository_id, result) =
                row.map_err(|e| LodeError::Storage(format!("failed to read row: {e}")))?;
            if let Some(ids) = repository_ids {
                if !ids.iter().any(|id| id == &repository_id) {
                    continue;
                }
            }
            if result.similarity_score >= threshold {
                scored.push(result);
            }
        }

        // Rows arrive in rowid order; a stable sort preserves it on ties.
        scored.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        Ok(scored)
    }

    /// Embedding of the representative chunk for a file: the first chunk by
    /// line number, ties broken by insertion order.
    ///
    /// Returns `None` for files with no indexed chunks.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Storage`] on query failure.
    pub fn representative_embedding(
        &self,
        file_path: &Path,
    ) -> Result<Option<Vec<f32>>, LodeError> {
        let result = self.conn.query_row(
            "SELECT embedding FROM indexed_chunks
             WHERE file_path = ?1
             ORDER BY start_line ASC, id ASC
             LIMIT 1",
            params![file_path.to_string_lossy().to_string()],
            |row| row.get::<_, Vec<u8>>(0),
        );

        match result {
            Ok(bytes) => Ok(Some(bytes_to_floats(&bytes))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(LodeError::Storage(format!(
                "failed to look up representative chunk: {e}"
            ))),
        }
    }

    /// Files related to `file_path`, ranked by similarity to its
    /// representative chunk.
    ///
    /// Each remaining file is scored by the MAX similarity across its
    /// chunks. Results are ordered by descending score (path ascending on
    /// ties) and truncated to `limit`. A file with no indexed chunks yields
    /// an empty list, never an error.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Storage`] on query failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use lode_index::store::VectorStore;
    ///
    /// let store = VectorStore::in_memory().unwrap();
    /// let related = store.find_related_files(Path::new("unknown.py"), 5).unwrap();
    /// assert!(related.is_empty());
    /// ```
    pub fn find_related_files(
        &self,
        file_path: &Path,
        limit: usize,
    ) -> Result<Vec<RelatedFile>, LodeError> {
        let Some(anchor) = self.representative_embedding(file_path)? else {
            return Ok(Vec::new());
        };

        let path_str = file_path.to_string_lossy().to_string();
        let mut stmt = self
            .conn
            .prepare(
                "SELECT file_path, chunk_type, language, embedding
                 FROM indexed_chunks
                 WHERE file_path != ?1
                 ORDER BY id ASC",
            )
            .map_err(|e| LodeError::Storage(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map(params![path_str], |row| {
                let embedding_bytes: Vec<u8> = row.get(3)?;
                let score = cosine_similarity(&anchor, &bytes_to_floats(&embedding_bytes));
                let chunk_type: String = row.get(1)?;
                Ok(RelatedFile {
                    file_path: PathBuf::from(row.get::<_, String>(0)?),
                    chunk_type: chunk_type.parse().unwrap_or_default(),
                    language: row.get(2)?,
                    similarity_score: score,
                })
            })
            .map_err(|e| LodeError::Storage(format!("failed to query chunks: {e}")))?;

        // One entry per file: keep the best-scoring chunk (first wins ties).
        let mut best: HashMap<PathBuf, RelatedFile> = HashMap::new();
        for row in rows {
            let candidate =
                row.map_err(|e| LodeError::Storage(format!("failed to read row: {e}")))?;
            match best.get(&candidate.file_path) {
                Some(existing) if existing.similarity_score >= candidate.similarity_score => {}
                _ => {
                    best.insert(candidate.file_path.clone(), candidate);
                }
            }
        }

        let mut related: Vec<RelatedFile> = best.into_values().collect();
        related.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.file_path.cmp(&b.file_path))
        });
        related.truncate(limit);

        Ok(related)
    }

    /// Remove all chunks stored under a repository identifier.
    ///
    /// Returns the number of deleted rows.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Storage`] on delete failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use lode_index::store::VectorStore;
    ///
    /// let store = VectorStore::in_memory().unwrap();
    /// assert_eq!(store.delete_repository("repo").unwrap(), 0);
    /// ```
    pub fn delete_repository(&self, repository_id: &str) -> Result<usize, LodeError> {
        self.conn
            .execute(
                "DELETE FROM indexed_chunks WHERE repository_id = ?1",
                params![repository_id],
            )
            .map_err(|e| LodeError::Storage(format!("failed to delete repository: {e}")))
    }

    /// Get index statistics.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Storage`] on query failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use lode_index::store::VectorStore;
    ///
    /// let store = VectorStore::in_memory().unwrap();
    /// let stats = store.stats().unwrap();
    /// assert_eq!(stats.total_files, 0);
    /// ```
    pub fn stats(&self) -> Result<StoreStats, LodeError> {
        let total_chunks: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM indexed_chunks", [], |row| row.get(0))
            .map_err(|e| LodeError::Storage(format!("failed to count chunks: {e}")))?;

        let total_files: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(DISTINCT file_path) FROM indexed_chunks",
                [],
                |row| row.get(0),
            )
            .map_err(|e| LodeError::Storage(format!("failed to count files: {e}")))?;

        let total_repositories: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(DISTINCT repository_id) FROM indexed_chunks",
                [],
                |row| row.get(0),
            )
            .map_err(|e| LodeError::Storage(format!("failed to count repositories: {e}")))?;

        // For in-memory databases, page_count returns a small number
        let page_count: i64 = self
            .conn
            .query_row("PRAGMA page_count", [], |row| row.get(0))
            .unwrap_or(0);
        let page_size: i64 = self
            .conn
            .query_row("PRAGMA page_size", [], |row| row.get(0))
            .unwrap_or(4096);

        Ok(StoreStats {
            total_chunks: total_chunks as usize,
            total_files: total_files as usize,
            total_repositories: total_repositories as usize,
            index_size_bytes: (page_count * page_size) as u64,
        })
    }
}

fn floats_to_bytes(floats: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(floats.len() * 4);
    for f in floats {
        bytes.extend_from_slice(&f.to_le_bytes());
    }
    bytes
}

fn bytes_to_floats(bytes: &[u8]) -> Vec<f32> {
    let mut floats = Vec::with_capacity(bytes.len() / 4);
    for chunk in bytes.chunks_exact(4) {
        let arr: [u8; 4] = [chunk[0], chunk[1], chunk[2], chunk[3]];
        floats.push(f32::from_le_bytes(arr));
    }
    floats
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for i in 0..a.len() {
        let ai = a[i] as f64;
        let bi = b[i] as f64;
        dot += ai * bi;
        norm_a += ai * ai;
        norm_b += bi * bi;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }

    dot / denom
}
