//! Ordinal-aligned metadata for the vector index.
//!
//! Four parallel sequences share the index's ordinals. They are private and
//! only mutated together, so their lengths never diverge.

use crate::types::MetadataRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How a delete identifier is compared against `source` and `chunk_id`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Identifier occurs anywhere in the value ("doc1.pdf" also hits "doc10.pdf")
    #[default]
    Substring,
    /// Identifier equals the whole value
    Exact,
}

impl MatchMode {
    fn matches(self, value: &str, id: &str) -> bool {
        match self {
            MatchMode::Substring => value.contains(id),
            MatchMode::Exact => value == id,
        }
    }
}

/// Parallel sequences of content, source, chunk id, and page.
///
/// Serializes as `{documents, sources, chunk_ids, pages}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataStore {
    documents: Vec<String>,
    sources: Vec<String>,
    chunk_ids: Vec<String>,
    pages: Vec<i64>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from records in ordinal order.
    pub fn from_records(records: impl IntoIterator<Item = MetadataRecord>) -> Self {
        let mut store = Self::new();
        store.append(records);
        store
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Append records at the next ordinals.
    pub fn append(&mut self, records: impl IntoIterator<Item = MetadataRecord>) {
        for record in records {
            self.documents.push(record.content);
            self.sources.push(record.source);
            self.chunk_ids.push(record.chunk_id);
            self.pages.push(record.page);
        }
    }

    /// Drop every record at or after `len`. Used to roll back an append.
    pub fn truncate(&mut self, len: usize) {
        self.documents.truncate(len);
        self.sources.truncate(len);
        self.chunk_ids.truncate(len);
        self.pages.truncate(len);
    }

    /// Remove the given ordinals, highest first so lower ones stay valid.
    ///
    /// Out-of-range and duplicate ordinals are ignored. Returns the number of
    /// records removed.
    pub fn remove_ordinals(&mut self, ordinals: &[usize]) -> usize {
        let unique: BTreeSet<usize> = ordinals.iter().copied().filter(|&o| o < self.len()).collect();
        for &ordinal in unique.iter().rev() {
            self.documents.remove(ordinal);
            self.sources.remove(ordinal);
            self.chunk_ids.remove(ordinal);
            self.pages.remove(ordinal);
        }
        unique.len()
    }

    /// Replace the whole contents with `other`.
    pub fn replace(&mut self, other: MetadataStore) {
        *self = other;
    }

    pub fn clear(&mut self) {
        self.replace(MetadataStore::new());
    }

    /// Content string stored at `ordinal`.
    pub fn content(&self, ordinal: usize) -> Option<&str> {
        self.documents.get(ordinal).map(String::as_str)
    }

    /// Full record stored at `ordinal`.
    pub fn record(&self, ordinal: usize) -> Option<MetadataRecord> {
        Some(MetadataRecord {
            content: self.documents.get(ordinal)?.clone(),
            source: self.sources.get(ordinal)?.clone(),
            chunk_id: self.chunk_ids.get(ordinal)?.clone(),
            page: *self.pages.get(ordinal)?,
        })
    }

    /// All content strings in ordinal order.
    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    /// Distinct source identifiers.
    pub fn distinct_sources(&self) -> BTreeSet<String> {
        self.sources.iter().cloned().collect()
    }

    /// Ordinals whose source or chunk id matches `id`, ascending.
    pub fn matching_ordinals(&self, id: &str, mode: MatchMode) -> Vec<usize> {
        self.sources
            .iter()
            .zip(&self.chunk_ids)
            .enumerate()
            .filter(|(_, (source, chunk_id))| mode.matches(source, id) || mode.matches(chunk_id, id))
            .map(|(ordinal, _)| ordinal)
            .collect()
    }

    /// Lengths of the four sequences, used to detect ragged persisted data.
    pub fn column_lengths(&self) -> [usize; 4] {
        [
            self.documents.len(),
            self.sources.len(),
            self.chunk_ids.len(),
            self.pages.len(),
        ]
    }

    /// True when all four sequences have the same length.
    pub fn is_aligned(&self) -> bool {
        let [documents, sources, chunk_ids, pages] = self.column_lengths();
        documents == sources && sources == chunk_ids && chunk_ids == pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(content: &str, source: &str, chunk_id: &str, page: i64) -> MetadataRecord {
        MetadataRecord {
            content: content.to_string(),
            source: source.to_string(),
            chunk_id: chunk_id.to_string(),
            page,
        }
    }

    fn sample() -> MetadataStore {
        MetadataStore::from_records(vec![
            record("A", "doc1.pdf", "doc1.pdf_0", 1),
            record("B", "doc1.pdf", "doc1.pdf_1", 1),
            record("C", "doc10.pdf", "doc10.pdf_0", 2),
            record("D", "doc2.pdf", "doc2.pdf_0", 1),
        ])
    }

    #[test]
    fn test_append_keeps_columns_aligned() {
        let store = sample();
        assert_eq!(store.len(), 4);
        assert_eq!(store.column_lengths(), [4, 4, 4, 4]);
        assert!(store.is_aligned());
        assert_eq!(store.record(2).unwrap(), record("C", "doc10.pdf", "doc10.pdf_0", 2));
        assert!(store.record(4).is_none());
    }

    #[test]
    fn test_substring_match_is_loose() {
        let store = sample();
        assert_eq!(
            store.matching_ordinals("doc1.pdf", MatchMode::Substring),
            vec![0, 1]
        );
        // "doc1" also hits "doc10.pdf"
        assert_eq!(
            store.matching_ordinals("doc1", MatchMode::Substring),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_exact_match_on_source_or_chunk_id() {
        let store = sample();
        assert_eq!(store.matching_ordinals("doc1", MatchMode::Exact), Vec::<usize>::new());
        assert_eq!(store.matching_ordinals("doc1.pdf", MatchMode::Exact), vec![0, 1]);
        assert_eq!(store.matching_ordinals("doc2.pdf_0", MatchMode::Exact), vec![3]);
    }

    #[test]
    fn test_remove_ordinals_descending() {
        let mut store = sample();
        let removed = store.remove_ordinals(&[0, 2, 2, 99]);
        assert_eq!(removed, 2);
        assert_eq!(store.documents(), &["B".to_string(), "D".to_string()]);
        assert!(store.is_aligned());
    }

    #[test]
    fn test_truncate_and_clear() {
        let mut store = sample();
        store.truncate(1);
        assert_eq!(store.len(), 1);
        assert!(store.is_aligned());

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_distinct_sources() {
        let sources = sample().distinct_sources();
        let expected: BTreeSet<String> = ["doc1.pdf", "doc10.pdf", "doc2.pdf"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(sources, expected);
    }

    #[test]
    fn test_json_shape() {
        let store = MetadataStore::from_records(vec![record("제1조", "law.pdf", "law.pdf_0", 3)]);
        let value = serde_json::to_value(&store).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "documents": ["제1조"],
                "sources": ["law.pdf"],
                "chunk_ids": ["law.pdf_0"],
                "pages": [3]
            })
        );
    }

    #[test]
    fn test_ragged_json_detected() {
        let store: MetadataStore = serde_json::from_str(
            r#"{"documents":["a","b"],"sources":["s"],"chunk_ids":["c","d"],"pages":[1,2]}"#,
        )
        .unwrap();
        assert!(!store.is_aligned());
    }
}
