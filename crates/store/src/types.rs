//! Vector store type definitions.

use serde::{Deserialize, Serialize};

/// A bounded span of source text, embedded and indexed as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Text content that gets embedded
    pub content: String,

    /// Chunk identifier assigned by the chunker
    pub chunk_id: String,

    /// Source document identifier (usually a file name)
    pub source: String,

    /// Page number within the source
    #[serde(default)]
    pub page: i64,

    /// Free-form extra metadata; not persisted by the store
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl DocumentChunk {
    pub fn new(
        content: impl Into<String>,
        chunk_id: impl Into<String>,
        source: impl Into<String>,
        page: i64,
    ) -> Self {
        Self {
            content: content.into(),
            chunk_id: chunk_id.into(),
            source: source.into(),
            page,
            metadata: serde_json::Map::new(),
        }
    }

    /// Length of the content in characters.
    pub fn content_length(&self) -> usize {
        self.content.chars().count()
    }

    /// True when the content is blank.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// First `length` characters of the content, with an ellipsis when cut.
    pub fn preview(&self, length: usize) -> String {
        if self.content_length() <= length {
            return self.content.clone();
        }
        let cut: String = self.content.chars().take(length).collect();
        format!("{}...", cut)
    }
}

/// One row of the metadata store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub content: String,
    pub source: String,
    pub chunk_id: String,
    pub page: i64,
}

impl From<&DocumentChunk> for MetadataRecord {
    fn from(chunk: &DocumentChunk) -> Self {
        Self {
            content: chunk.content.clone(),
            source: chunk.source.clone(),
            chunk_id: chunk.chunk_id.clone(),
            page: chunk.page,
        }
    }
}

/// Output of a single embedding call.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingResult {
    /// Unit-normalized embedding
    pub vector: Vec<f32>,

    /// Wall-clock seconds spent producing the vector
    pub generation_time: f64,
}

impl EmbeddingResult {
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }

    /// L2 norm of the vector.
    pub fn norm(&self) -> f32 {
        self.vector.iter().map(|x| x * x).sum::<f32>().sqrt()
    }
}

/// Result of a similarity search, positionally aligned.
///
/// `similarity_scores[i]` is the score of `contexts[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub contexts: Vec<String>,
    pub similarity_scores: Vec<f32>,
    pub retrieved_chunks: usize,
    /// Seconds spent scanning the index, excluding the query embedding
    pub search_time: f64,
    /// Seconds spent embedding the query
    pub embedding_time: f64,
}

impl SearchResult {
    /// Result with no contexts and zero timings.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Contexts joined by a blank line, ready for prompt assembly.
    pub fn combined_context(&self) -> String {
        self.contexts.join("\n\n")
    }

    pub fn max_similarity_score(&self) -> f32 {
        self.similarity_scores
            .iter()
            .copied()
            .fold(None, |acc: Option<f32>, s| Some(acc.map_or(s, |a| a.max(s))))
            .unwrap_or(0.0)
    }

    pub fn avg_similarity_score(&self) -> f32 {
        if self.similarity_scores.is_empty() {
            return 0.0;
        }
        self.similarity_scores.iter().sum::<f32>() / self.similarity_scores.len() as f32
    }

    pub fn has_results(&self) -> bool {
        !self.contexts.is_empty()
    }

    pub fn total_search_time(&self) -> f64 {
        self.search_time + self.embedding_time
    }
}

/// Summary statistics of a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of stored chunks
    pub total_chunks: usize,

    /// Number of distinct sources
    pub unique_documents: usize,

    /// Mean chunks per distinct source (0 when empty)
    pub avg_chunks_per_document: f64,

    /// Configured vector dimension
    pub dimension: usize,

    /// Number of vectors in the index
    pub index_size: usize,
}
