//! Deterministic embedding client for store tests.

use crate::embeddings::EmbeddingClient;
use crate::error::{StoreError, StoreResult};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Assigns each distinct text the next one-hot basis vector, so identical
/// text scores 1.0 and different text scores 0.0.
#[derive(Debug)]
pub struct ScriptedEmbedder {
    dimensions: usize,
    assigned: Mutex<HashMap<String, usize>>,
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
    returned_dimensions: Option<usize>,
}

impl ScriptedEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            assigned: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
            delay: None,
            returned_dimensions: None,
        }
    }

    /// Sleep this long before every answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report `dimensions` but return vectors of another length.
    pub fn returning_dimensions(mut self, actual: usize) -> Self {
        self.returned_dimensions = Some(actual);
        self
    }

    /// Fail every embedding of `text` until [`recover`](Self::recover).
    pub fn fail_on(&self, text: &str) {
        self.failing.lock().unwrap().insert(text.to_string());
    }

    pub fn recover(&self, text: &str) {
        self.failing.lock().unwrap().remove(text);
    }

    /// Number of `generate` calls so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn basis_slot(&self, text: &str) -> usize {
        let mut assigned = self.assigned.lock().unwrap();
        let next = assigned.len();
        *assigned.entry(text.to_string()).or_insert(next) % self.dimensions
    }
}

#[async_trait::async_trait]
impl EmbeddingClient for ScriptedEmbedder {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "one-hot"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn generate(&self, text: &str) -> StoreResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().unwrap().contains(text) {
            return Err(StoreError::EmbeddingService(format!(
                "scripted failure for '{}'",
                text
            )));
        }

        let slot = self.basis_slot(text);
        let mut vector = vec![0.0; self.returned_dimensions.unwrap_or(self.dimensions)];
        if let Some(v) = vector.get_mut(slot) {
            *v = 1.0;
        }
        Ok(vector)
    }
}
