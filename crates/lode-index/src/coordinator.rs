//! Indexing pipeline orchestration.
//!
//! Drives filter → chunk → embed → store across a file set with bounded
//! parallelism. Per-file and per-chunk failures are isolated: a file that
//! cannot be re-read falls back to the content carried on its descriptor,
//! a chunk the provider refuses to embed is logged and skipped, and the
//! summary reports what actually succeeded.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use lode_core::{FileDescriptor, IndexSummary, LodeConfig, LodeError, RelatedFile, SearchResult};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chunker::ChunkExtractor;
use crate::embedding::EmbeddingClient;
use crate::filter;
use crate::store::{StoreStats, VectorStore};

/// Orchestrates indexing and search over a shared vector store.
pub struct IndexCoordinator {
    config: LodeConfig,
    embedder: Arc<EmbeddingClient>,
    store: Arc<Mutex<VectorStore>>,
}

impl IndexCoordinator {
    /// Create a coordinator over an embedding client and an open store.
    pub fn new(config: LodeConfig, embedder: EmbeddingClient, store: VectorStore) -> Self {
        Self {
            config,
            embedder: Arc::new(embedder),
            store: Arc::new(Mutex::new(store)),
        }
    }

    fn lock_store(store: &Mutex<VectorStore>) -> Result<MutexGuard<'_, VectorStore>, LodeError> {
        store
            .lock()
            .map_err(|_| LodeError::Storage("store lock poisoned".into()))
    }

    /// Index a set of files under a repository identifier.
    ///
    /// Files are filtered first, then processed with bounded parallelism
    /// (`index.workers` at a time). Cancellation is cooperative and checked
    /// at file boundaries: chunks already persisted stay in the store.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Storage`] only if the store itself becomes
    /// unusable. Individual file or embedding failures never fail the run.
    pub async fn index_repository(
        &self,
        repository_id: &str,
        files: Vec<FileDescriptor>,
        cancel: &CancellationToken,
    ) -> Result<IndexSummary, LodeError> {
        let indexable = filter::filter_indexable(&files, self.config.index.max_file_size);
        info!(
            repository_id,
            candidates = files.len(),
            indexable = indexable.len(),
            "starting index run"
        );

        let extractor = Arc::new(ChunkExtractor::new(&self.config.index));
        let semaphore = Arc::new(Semaphore::new(self.config.index.workers.max(1)));
        let files_processed = Arc::new(AtomicUsize::new(0));
        let chunks_created = Arc::new(AtomicUsize::new(0));
        let embeddings_generated = Arc::new(AtomicUsize::new(0));

        let mut tasks = JoinSet::new();
        for file in indexable {
            if cancel.is_cancelled() {
                debug!("cancellation requested, not scheduling further files");
                break;
            }

            let semaphore = Arc::clone(&semaphore);
            let extractor = Arc::clone(&extractor);
            let embedder = Arc::clone(&self.embedder);
            let store = Arc::clone(&self.store);
            let cancel = cancel.clone();
            let files_processed = Arc::clone(&files_processed);
            let chunks_created = Arc::clone(&chunks_created);
            let embeddings_generated = Arc::clone(&embeddings_generated);
            let repository_id = repository_id.to_string();

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                if cancel.is_cancelled() {
                    return;
                }

                let content = match tokio::fs::read_to_string(&file.path).await {
                    Ok(content) => content,
                    Err(e) if !file.content_preview.is_empty() => {
                        debug!(
                            path = %file.path.display(),
                            "read failed, indexing descriptor content: {e}"
                        );
                        file.content_preview.clone()
                    }
                    Err(e) => {
                        warn!(path = %file.path.display(), "skipping unreadable file: {e}");
                        return;
                    }
                };

                let full = FileDescriptor {
                    content_preview: content,
                    ..file.clone()
                };
                let chunks = extractor.extract(&full);
                files_processed.fetch_add(1, Ordering::Relaxed);
                chunks_created.fetch_add(chunks.len(), Ordering::Relaxed);

                for chunk in chunks {
                    if cancel.is_cancelled() {
                        return;
                    }
                    let Some(embedding) = embedder.embed(&chunk.content).await else {
                        continue;
                    };
                    let inserted = match Self::lock_store(&store) {
                        Ok(store) => store.insert_chunk(&repository_id, &chunk, &embedding),
                        Err(e) => Err(e),
                    };
                    match inserted {
                        Ok(_) => {
                            embeddings_generated.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            warn!(path = %file.path.display(), "failed to persist chunk: {e}");
                        }
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!("indexing task panicked: {e}");
            }
        }

        let summary = IndexSummary {
            repository_id: repository_id.to_string(),
            files_processed: files_processed.load(Ordering::Relaxed),
            chunks_created: chunks_created.load(Ordering::Relaxed),
            embeddings_generated: embeddings_generated.load(Ordering::Relaxed),
        };
        info!(
            repository_id,
            files = summary.files_processed,
            chunks = summary.chunks_created,
            embeddings = summary.embeddings_generated,
            "index run finished"
        );
        Ok(summary)
    }

    /// Semantic search over indexed chunks.
    ///
    /// The query is embedded and matched against stored vectors by cosine
    /// similarity. A query the provider cannot embed yields an empty list,
    /// never an error.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Storage`] on store query failure.
    pub async fn search_similar_code(
        &self,
        query: &str,
        repository_ids: Option<&[String]>,
        limit: usize,
        threshold: f64,
    ) -> Result<Vec<SearchResult>, LodeError> {
        let Some(embedding) = self.embedder.embed(query).await else {
            warn!("query could not be embedded, returning no results");
            return Ok(Vec::new());
        };

        Self::lock_store(&self.store)?.query_nearest(&embedding, repository_ids, limit, threshold)
    }

    /// Files most similar to the given file's representative chunk.
    ///
    /// A file with no indexed chunks yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Storage`] on store query failure.
    pub fn find_related_files(
        &self,
        file_path: &Path,
        limit: usize,
    ) -> Result<Vec<RelatedFile>, LodeError> {
        Self::lock_store(&self.store)?.find_related_files(file_path, limit)
    }

    /// Current store statistics.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Storage`] on query failure.
    pub fn stats(&self) -> Result<StoreStats, LodeError> {
        Self::lock_store(&self.store)?.stats()
    }

    /// Remove everything indexed under a repository identifier.
    ///
    /// Returns the number of deleted chunks.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Storage`] on delete failure.
    pub fn delete_repository(&self, repository_id: &str) -> Result<usize, LodeError> {
        Self::lock_store(&self.store)?.delete_repository(repository_id)
    }

    /// The configuration this coordinator runs with.
    pub fn config(&self) -> &LodeConfig {
        &self.config
    }
}
