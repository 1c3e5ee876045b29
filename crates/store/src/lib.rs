//! Local vector store for retrieval-augmented generation.
//!
//! Stores unit-normalized embeddings in an exact inner-product index next to
//! ordinal-aligned chunk metadata, persisted as two artifacts under one root.
//! [`VectorStoreService`] is the entry point.

pub mod config;
pub mod embeddings;
pub mod error;
pub mod metadata;
pub mod persistence;
pub mod service;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use config::StoreConfig;
pub use embeddings::{create_client, EmbeddingClient, EmbeddingConfig};
pub use error::{StoreError, StoreResult};
pub use metadata::{MatchMode, MetadataStore};
pub use persistence::Persistence;
pub use service::{VectorStoreService, DEFAULT_TOP_K};
pub use types::{DocumentChunk, EmbeddingResult, MetadataRecord, SearchResult, StoreStats};
pub use vector_index::{FlatIndex, Neighbor, VectorIndex};
