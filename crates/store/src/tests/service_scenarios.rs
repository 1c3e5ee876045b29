//! End-to-end behavior of the vector store service.

use crate::config::StoreConfig;
use crate::embeddings::EmbeddingConfig;
use crate::error::StoreError;
use crate::metadata::MatchMode;
use crate::service::VectorStoreService;
use crate::tests::support::ScriptedEmbedder;
use crate::types::DocumentChunk;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[cfg(test)]
mod tests {
    use super::*;

    const DIM: usize = 8;

    fn config(root: &Path) -> StoreConfig {
        StoreConfig::new(root, EmbeddingConfig::trigram(DIM))
    }

    async fn open_store(root: &Path, client: Arc<ScriptedEmbedder>) -> VectorStoreService {
        VectorStoreService::open(config(root), client).await.unwrap()
    }

    fn chunk(content: &str, source: &str, n: usize) -> DocumentChunk {
        DocumentChunk::new(content, format!("{}_{}", source, n), source, 1)
    }

    /// Three chunks from doc1.pdf and two from doc2.pdf.
    fn five_chunks() -> Vec<DocumentChunk> {
        vec![
            chunk("A", "doc1.pdf", 0),
            chunk("B", "doc1.pdf", 1),
            chunk("C", "doc1.pdf", 2),
            chunk("D", "doc2.pdf", 0),
            chunk("E", "doc2.pdf", 1),
        ]
    }

    #[tokio::test]
    async fn test_add_search_delete_by_source() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(ScriptedEmbedder::new(DIM));
        let store = open_store(temp.path(), client.clone()).await;

        assert!(store.add_documents(&five_chunks()).await);
        assert_eq!(store.get_document_count().await, 5);

        let result = store.search_similar("A", 1).await;
        assert_eq!(result.contexts, vec!["A"]);
        assert_eq!(result.retrieved_chunks, 1);
        assert!((result.similarity_scores[0] - 1.0).abs() < 1e-6);

        let calls_before_delete = client.calls();
        assert!(store.delete_documents("doc1.pdf").await);
        assert_eq!(store.get_document_count().await, 2);
        assert_eq!(
            store.list_documents().await.into_iter().collect::<Vec<_>>(),
            vec!["doc2.pdf"]
        );
        // Only the two survivors are re-embedded
        assert_eq!(client.calls(), calls_before_delete + 2);

        let result = store.search_similar("E", 1).await;
        assert_eq!(result.contexts, vec!["E"]);
        assert!(store.health_check().await);
    }

    #[tokio::test]
    async fn test_search_on_empty_store_skips_embedding() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(ScriptedEmbedder::new(DIM));
        let store = open_store(temp.path(), client.clone()).await;

        let result = store.search_similar("anything at all", 3).await;
        assert_eq!(result.retrieved_chunks, 0);
        assert!(result.similarity_scores.is_empty());
        assert!(result.contexts.is_empty());
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_leaves_store_unchanged() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(ScriptedEmbedder::new(DIM));
        let store = open_store(temp.path(), client.clone()).await;
        store.try_add_documents(&five_chunks()).await.unwrap();
        let calls = client.calls();

        assert!(!store.delete_documents("doesNotExist").await);
        assert_eq!(store.get_document_count().await, 5);
        assert_eq!(client.calls(), calls);

        assert!(matches!(
            store
                .try_delete_documents("doesNotExist", MatchMode::Substring)
                .await,
            Err(StoreError::NoMatch(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_embedding_adds_nothing() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(ScriptedEmbedder::new(DIM));
        let store = open_store(temp.path(), client.clone()).await;
        store
            .try_add_documents(&[chunk("seed", "seed.pdf", 0)])
            .await
            .unwrap();

        client.fail_on("C");
        assert!(!store.add_documents(&five_chunks()).await);
        assert_eq!(store.get_document_count().await, 1);

        // Disk still holds only the seed chunk
        let reopened = open_store(temp.path(), client.clone()).await;
        assert_eq!(reopened.get_document_count().await, 1);

        client.recover("C");
        assert!(store.add_documents(&five_chunks()).await);
        assert_eq!(store.get_document_count().await, 6);
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back_add() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("not-a-directory");
        std::fs::write(&blocker, "occupied").unwrap();

        let client = Arc::new(ScriptedEmbedder::new(DIM));
        let store = open_store(&blocker, client).await;

        let err = store
            .try_add_documents(&five_chunks())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StorageWrite { .. }));
        assert_eq!(store.get_document_count().await, 0);
        assert_eq!(store.stats().await.index_size, 0);
        assert!(store.health_check().await);
    }

    #[tokio::test]
    async fn test_clear_all_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(ScriptedEmbedder::new(DIM));
        let store = open_store(temp.path(), client.clone()).await;
        store.try_add_documents(&five_chunks()).await.unwrap();

        assert!(store.clear_all().await);
        assert!(store.clear_all().await);
        assert_eq!(store.get_document_count().await, 0);
        assert!(store.list_documents().await.is_empty());

        let reopened = open_store(temp.path(), client).await;
        assert_eq!(reopened.get_document_count().await, 0);
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(ScriptedEmbedder::new(DIM));
        {
            let store = open_store(temp.path(), client.clone()).await;
            store.try_add_documents(&five_chunks()).await.unwrap();
            store.flush().await.unwrap();
        }

        let store = open_store(temp.path(), client.clone()).await;
        assert_eq!(store.get_document_count().await, 5);
        assert_eq!(store.search_similar("D", 1).await.contexts, vec!["D"]);

        let stats = store.stats().await;
        assert_eq!(stats.total_chunks, 5);
        assert_eq!(stats.unique_documents, 2);
        assert!((stats.avg_chunks_per_document - 2.5).abs() < 1e-9);
        assert_eq!(stats.index_size, 5);
        assert_eq!(stats.dimension, DIM);
    }

    #[tokio::test]
    async fn test_results_ordered_with_ordinal_tie_break() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(ScriptedEmbedder::new(DIM));
        let store = open_store(temp.path(), client).await;
        store.try_add_documents(&five_chunks()).await.unwrap();

        let result = store.search_similar("C", 10).await;
        assert_eq!(result.retrieved_chunks, 5);
        assert_eq!(result.contexts, vec!["C", "A", "B", "D", "E"]);
        assert!(result
            .similarity_scores
            .windows(2)
            .all(|w| w[0] >= w[1]));

        // Same snapshot, same answer
        assert_eq!(store.search_similar("C", 10).await.contexts, result.contexts);
        assert_eq!(store.search_similar("C", 2).await.contexts, vec!["C", "A"]);
    }

    #[tokio::test]
    async fn test_substring_and_exact_delete() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(ScriptedEmbedder::new(DIM));
        let store = open_store(temp.path(), client).await;
        store
            .try_add_documents(&[
                chunk("one", "doc1.pdf", 0),
                chunk("ten", "doc10.pdf", 0),
                chunk("two", "doc2.pdf", 0),
            ])
            .await
            .unwrap();

        let removed = store
            .try_delete_documents("doc1.pdf", MatchMode::Exact)
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store.list_documents().await.contains("doc10.pdf"));

        let removed = store
            .try_delete_documents("doc", MatchMode::Substring)
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.get_document_count().await, 0);
    }

    #[tokio::test]
    async fn test_configured_exact_mode_applies_to_delete_documents() {
        let temp = TempDir::new().unwrap();
        let mut config = config(temp.path());
        config.delete_match = MatchMode::Exact;
        let store = VectorStoreService::open(config, Arc::new(ScriptedEmbedder::new(DIM)))
            .await
            .unwrap();
        store
            .try_add_documents(&[chunk("one", "doc1.pdf", 0), chunk("ten", "doc10.pdf", 0)])
            .await
            .unwrap();

        assert!(!store.delete_documents("doc1").await);
        assert!(store.delete_documents("doc10.pdf_0").await);
        assert_eq!(store.get_document_count().await, 1);
    }

    #[tokio::test]
    async fn test_failed_rebuild_leaves_store_unchanged() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(ScriptedEmbedder::new(DIM));
        let store = open_store(temp.path(), client.clone()).await;
        store.try_add_documents(&five_chunks()).await.unwrap();

        client.fail_on("D");
        assert!(!store.delete_documents("doc1.pdf").await);
        assert_eq!(store.get_document_count().await, 5);
        assert_eq!(store.list_documents().await.len(), 2);

        let reopened = open_store(temp.path(), client.clone()).await;
        assert_eq!(reopened.get_document_count().await, 5);
    }

    #[tokio::test]
    async fn test_wrong_vector_length_is_rejected() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(ScriptedEmbedder::new(DIM).returning_dimensions(4));
        let store = open_store(temp.path(), client).await;

        let err = store
            .try_add_documents(&[chunk("A", "doc1.pdf", 0)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::DimensionMismatch {
                expected: DIM,
                actual: 4
            }
        ));
        assert_eq!(store.get_document_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_embedding_times_out() {
        let temp = TempDir::new().unwrap();
        let slow = Arc::new(ScriptedEmbedder::new(DIM).with_delay(Duration::from_secs(120)));
        let mut config = config(temp.path());
        config.embed_timeout_secs = 5;
        let store = VectorStoreService::open(config, slow).await.unwrap();

        let err = store
            .try_add_documents(&[chunk("A", "doc1.pdf", 0)])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert_eq!(store.get_document_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_metadata_swap_keeps_disk_and_memory_in_step() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(ScriptedEmbedder::new(DIM));
        let store = open_store(temp.path(), client.clone()).await;
        assert!(store.add_documents(&[chunk("A", "doc1.pdf", 0)]).await);

        let metadata_path = temp.path().join("metadata.json");
        let metadata_before = std::fs::read(&metadata_path).unwrap();
        std::fs::remove_file(&metadata_path).unwrap();
        std::fs::create_dir(&metadata_path).unwrap();
        std::fs::write(metadata_path.join("occupied"), "x").unwrap();

        let err = store
            .try_add_documents(&[chunk("B", "doc2.pdf", 0), chunk("C", "doc2.pdf", 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StorageWrite { .. }));
        assert_eq!(store.get_document_count().await, 1);
        assert!(store.health_check().await);

        let index_bytes = std::fs::read(temp.path().join("vector_index.bin")).unwrap();
        let mut count = [0u8; 8];
        count.copy_from_slice(&index_bytes[12..20]);
        assert_eq!(u64::from_le_bytes(count), 1);

        std::fs::remove_dir_all(&metadata_path).unwrap();
        std::fs::write(&metadata_path, metadata_before).unwrap();
        let reopened = open_store(temp.path(), client).await;
        assert_eq!(reopened.get_document_count().await, 1);
        assert_eq!(reopened.search_similar("A", 1).await.contexts, vec!["A"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_and_searches_keep_columns_aligned() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(ScriptedEmbedder::new(DIM));
        let store = Arc::new(open_store(temp.path(), client.clone()).await);
        assert!(
            store
                .add_documents(&[chunk("seed a", "seed.pdf", 0), chunk("seed b", "seed.pdf", 1)])
                .await
        );

        let mut handles = Vec::new();
        let deleter = store.clone();
        handles.push(tokio::spawn(async move {
            assert_eq!(
                deleter
                    .try_delete_documents("seed.pdf", MatchMode::Exact)
                    .await
                    .unwrap(),
                2
            );
        }));

        for batch in 0..6 {
            let adder = store.clone();
            handles.push(tokio::spawn(async move {
                let chunks: Vec<DocumentChunk> = (0..3)
                    .map(|n| chunk(&format!("text {}-{}", batch, n), &format!("b{}.pdf", batch), n))
                    .collect();
                assert!(adder.add_documents(&chunks).await);
            }));

            let searcher = store.clone();
            handles.push(tokio::spawn(async move {
                let result = searcher.search_similar("text 0-0", 4).await;
                assert_eq!(result.contexts.len(), result.similarity_scores.len());
                assert!(searcher.health_check().await);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.get_document_count().await, 18);
        assert_eq!(store.stats().await.index_size, 18);
        assert!(store.health_check().await);

        let reopened = open_store(temp.path(), client).await;
        assert_eq!(reopened.get_document_count().await, 18);
    }
}
