//! Vector store service: embed, index, persist, and query document chunks.
//!
//! One service owns one index, its metadata, and their on-disk artifacts.
//! Mutations (add, delete, clear, flush) are serialized by a write gate and
//! commit under the state write lock together with their persistence write.
//! Reads share the state read lock. Embedding always happens outside the
//! state lock.

use crate::config::StoreConfig;
use crate::embeddings::EmbeddingClient;
use crate::error::{StoreError, StoreResult};
use crate::metadata::{MatchMode, MetadataStore};
use crate::persistence::Persistence;
use crate::types::{DocumentChunk, EmbeddingResult, MetadataRecord, SearchResult, StoreStats};
use crate::vector_index::{FlatIndex, VectorIndex};
use futures::{stream, StreamExt, TryStreamExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

/// Default number of contexts returned by a search.
pub const DEFAULT_TOP_K: usize = 3;

#[derive(Debug)]
struct StoreState {
    index: FlatIndex,
    metadata: MetadataStore,
}

/// Owned vector store, constructed at startup and flushed at shutdown.
#[derive(Debug)]
pub struct VectorStoreService {
    config: StoreConfig,
    client: Arc<dyn EmbeddingClient>,
    persistence: Persistence,
    state: RwLock<StoreState>,
    write_gate: Mutex<()>,
}

impl VectorStoreService {
    /// Open the store under `config.root`, loading persisted artifacts or
    /// starting empty when there are none.
    pub async fn open(config: StoreConfig, client: Arc<dyn EmbeddingClient>) -> StoreResult<Self> {
        config.validate()?;

        if client.dimensions() != config.dimension() {
            return Err(StoreError::DimensionMismatch {
                expected: config.dimension(),
                actual: client.dimensions(),
            });
        }

        let persistence = Persistence::new(&config.root);
        let (index, metadata) = persistence.load(config.dimension())?;

        tracing::info!(
            "Opened vector store at {:?}: {} chunks, dimension {}, provider {} ({})",
            config.root,
            metadata.len(),
            config.dimension(),
            client.provider_name(),
            client.model_name()
        );

        Ok(Self {
            config,
            client,
            persistence,
            state: RwLock::new(StoreState { index, metadata }),
            write_gate: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension()
    }

    /// Embed `text` with the configured timeout and validate its dimension.
    pub async fn generate_embedding(&self, text: &str) -> StoreResult<EmbeddingResult> {
        let limit = Duration::from_secs(self.config.embed_timeout_secs);
        let result = tokio::time::timeout(limit, self.client.embed(text))
            .await
            .map_err(|_| {
                StoreError::EmbeddingService(format!(
                    "Embedding timed out after {}s",
                    self.config.embed_timeout_secs
                ))
            })??;

        if result.dimension() != self.dimension() {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension(),
                actual: result.dimension(),
            });
        }
        Ok(result)
    }

    /// Embed every text, in order, with bounded concurrency. Fails on the
    /// first error.
    async fn embed_all(&self, texts: &[String]) -> StoreResult<Vec<Vec<f32>>> {
        let pending: Vec<_> = texts
            .iter()
            .map(|text| self.generate_embedding(text))
            .collect();

        stream::iter(pending)
            .buffered(self.config.embed_concurrency)
            .map_ok(|result| result.vector)
            .try_collect()
            .await
    }

    /// Embed and append `chunks` as one unit. Returns the number added.
    ///
    /// Nothing is appended unless every embedding succeeds and both artifacts
    /// are written.
    pub async fn try_add_documents(&self, chunks: &[DocumentChunk]) -> StoreResult<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let start = Instant::now();
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embed_all(&texts).await?;
        let records: Vec<MetadataRecord> = chunks.iter().map(MetadataRecord::from).collect();

        let _gate = self.write_gate.lock().await;
        let mut state = self.state.write().await;

        let previous = state.index.size();
        state.index.add(&vectors)?;
        state.metadata.append(records);

        if let Err(e) = self.persistence.save(&state.index, &state.metadata) {
            state.index.truncate(previous);
            state.metadata.truncate(previous);
            return Err(e);
        }

        tracing::info!(
            "Added {} chunks in {:.2}s (total {})",
            chunks.len(),
            start.elapsed().as_secs_f64(),
            state.metadata.len()
        );
        Ok(chunks.len())
    }

    /// Add `chunks`, returning `false` and logging the cause on failure.
    pub async fn add_documents(&self, chunks: &[DocumentChunk]) -> bool {
        match self.try_add_documents(chunks).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Failed to add {} chunks: {}", chunks.len(), e);
                false
            }
        }
    }

    /// Remove every chunk whose source or chunk id matches `document_id`,
    /// then rebuild the index by re-embedding the survivors. Returns the
    /// number removed.
    pub async fn try_delete_documents(
        &self,
        document_id: &str,
        mode: MatchMode,
    ) -> StoreResult<usize> {
        if document_id.is_empty() {
            return Err(StoreError::NoMatch(document_id.to_string()));
        }

        let _gate = self.write_gate.lock().await;

        let (metadata, removed) = {
            let state = self.state.read().await;
            let matched = state.metadata.matching_ordinals(document_id, mode);
            if matched.is_empty() {
                return Err(StoreError::NoMatch(document_id.to_string()));
            }
            let mut metadata = state.metadata.clone();
            let removed = metadata.remove_ordinals(&matched);
            (metadata, removed)
        };

        tracing::debug!(
            "Rebuilding index for '{}': removing {}, re-embedding {}",
            document_id,
            removed,
            metadata.len()
        );

        let vectors = self.embed_all(metadata.documents()).await?;
        let mut index = FlatIndex::new(self.dimension());
        index.add(&vectors)?;

        let mut state = self.state.write().await;
        self.persistence.save(&index, &metadata)?;
        state.index = index;
        state.metadata.replace(metadata);

        tracing::info!(
            "Deleted {} chunks matching '{}' ({} remain)",
            removed,
            document_id,
            state.metadata.len()
        );
        Ok(removed)
    }

    /// Delete with the configured match mode, returning `false` when nothing
    /// matched or the rebuild failed.
    pub async fn delete_documents(&self, document_id: &str) -> bool {
        match self
            .try_delete_documents(document_id, self.config.delete_match)
            .await
        {
            Ok(_) => true,
            Err(StoreError::NoMatch(id)) => {
                tracing::warn!("No chunks match '{}'", id);
                false
            }
            Err(e) => {
                tracing::error!("Failed to delete '{}': {}", document_id, e);
                false
            }
        }
    }

    /// Reset the store to empty and persist it.
    pub async fn try_clear_all(&self) -> StoreResult<()> {
        let _gate = self.write_gate.lock().await;
        let mut state = self.state.write().await;

        self.persistence
            .save(&FlatIndex::new(self.dimension()), &MetadataStore::new())?;
        state.index.reset();
        state.metadata.clear();

        tracing::info!("Cleared vector store at {:?}", self.config.root);
        Ok(())
    }

    pub async fn clear_all(&self) -> bool {
        match self.try_clear_all().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to clear vector store: {}", e);
                false
            }
        }
    }

    /// Top-`k` contexts for `query`. Any failure yields an empty result.
    pub async fn search_similar(&self, query: &str, k: usize) -> SearchResult {
        match self.try_search_similar(query, k).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Search failed, returning no contexts: {}", e);
                SearchResult::empty()
            }
        }
    }

    /// Typed variant of [`search_similar`](Self::search_similar).
    pub async fn try_search_similar(&self, query: &str, k: usize) -> StoreResult<SearchResult> {
        if k == 0 || self.state.read().await.index.size() == 0 {
            return Ok(SearchResult::empty());
        }

        let start = Instant::now();
        let embedding = self.generate_embedding(query).await?;
        let embedding_time = start.elapsed().as_secs_f64();

        let state = self.state.read().await;
        let k = k.min(state.index.size());
        let neighbors = state.index.search(&embedding.vector, k)?;

        let mut contexts = Vec::with_capacity(neighbors.len());
        let mut similarity_scores = Vec::with_capacity(neighbors.len());
        for neighbor in &neighbors {
            let content = state.metadata.content(neighbor.ordinal).ok_or_else(|| {
                StoreError::corruption(
                    self.persistence.metadata_path(),
                    format!("no metadata for ordinal {}", neighbor.ordinal),
                )
            })?;
            contexts.push(content.to_string());
            similarity_scores.push(neighbor.score);
        }
        drop(state);

        let total = start.elapsed().as_secs_f64();
        let result = SearchResult {
            retrieved_chunks: contexts.len(),
            contexts,
            similarity_scores,
            search_time: (total - embedding_time).max(0.0),
            embedding_time,
        };

        tracing::debug!(
            "Retrieved {} chunks (top score {:.3}) in {:.3}s",
            result.retrieved_chunks,
            result.max_similarity_score(),
            result.total_search_time()
        );
        Ok(result)
    }

    /// Persist the current in-memory state.
    pub async fn flush(&self) -> StoreResult<()> {
        let _gate = self.write_gate.lock().await;
        let state = self.state.read().await;
        self.persistence.save(&state.index, &state.metadata)
    }

    pub async fn get_document_count(&self) -> usize {
        self.state.read().await.metadata.len()
    }

    /// Distinct source identifiers.
    pub async fn list_documents(&self) -> BTreeSet<String> {
        self.state.read().await.metadata.distinct_sources()
    }

    pub async fn stats(&self) -> StoreStats {
        let state = self.state.read().await;
        let total_chunks = state.metadata.len();
        let unique_documents = state.metadata.distinct_sources().len();
        let avg_chunks_per_document = if unique_documents == 0 {
            0.0
        } else {
            total_chunks as f64 / unique_documents as f64
        };

        StoreStats {
            total_chunks,
            unique_documents,
            avg_chunks_per_document,
            dimension: state.index.dimension(),
            index_size: state.index.size(),
        }
    }

    /// True when the index has the configured dimension and agrees with the
    /// metadata on its size.
    pub async fn health_check(&self) -> bool {
        let state = self.state.read().await;
        let healthy = state.index.dimension() == self.dimension()
            && state.index.size() == state.metadata.len()
            && state.metadata.is_aligned();
        if !healthy {
            tracing::warn!(
                "Vector store unhealthy: index {}x{}, metadata columns {:?}",
                state.index.size(),
                state.index.dimension(),
                state.metadata.column_lengths()
            );
        }
        healthy
    }
}
