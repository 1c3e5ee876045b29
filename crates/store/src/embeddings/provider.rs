//! Embedding client trait and factory.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::providers::{OllamaEmbeddings, OpenAiEmbeddings, TrigramEmbeddings};
use crate::error::{StoreError, StoreResult};
use crate::types::EmbeddingResult;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 100;

/// Upper bound on a single backoff sleep
const MAX_BACKOFF_MS: u64 = 30_000;

/// Converts text into a unit-normalized, fixed-dimension vector.
#[async_trait::async_trait]
pub trait EmbeddingClient: Send + Sync + std::fmt::Debug {
    /// Provider name (e.g., "openai", "ollama", "trigram")
    fn provider_name(&self) -> &str;

    /// Model identifier
    fn model_name(&self) -> &str;

    /// Dimension of every vector this client returns
    fn dimensions(&self) -> usize;

    /// Produce the normalized vector for one text.
    async fn generate(&self, text: &str) -> StoreResult<Vec<f32>>;

    /// Embed one text and record how long it took.
    async fn embed(&self, text: &str) -> StoreResult<EmbeddingResult> {
        let start = Instant::now();
        let vector = self.generate(text).await?;
        Ok(EmbeddingResult {
            vector,
            generation_time: start.elapsed().as_secs_f64(),
        })
    }

    /// Embed several texts in order, failing on the first error.
    async fn embed_batch(&self, texts: &[String]) -> StoreResult<Vec<EmbeddingResult>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }
}

/// Create an embedding client based on configuration.
pub fn create_client(
    config: &EmbeddingConfig,
    api_key: Option<&str>,
) -> StoreResult<Arc<dyn EmbeddingClient>> {
    config.validate()?;

    match config.provider.as_str() {
        "openai" => {
            let key = match api_key {
                Some(key) => key.to_string(),
                None => std::env::var(&config.api_key_env).map_err(|_| {
                    StoreError::Config(format!(
                        "OpenAI provider requires an API key in {}",
                        config.api_key_env
                    ))
                })?,
            };
            Ok(Arc::new(OpenAiEmbeddings::new(config, key)?))
        }

        "ollama" => Ok(Arc::new(OllamaEmbeddings::new(config)?)),

        "trigram" => Ok(Arc::new(TrigramEmbeddings::new(config.dimensions))),

        other => Err(StoreError::Config(format!(
            "Unknown embedding provider: '{}'",
            other
        ))),
    }
}

/// Scale `vector` to unit length in place.
///
/// Returns `false` and leaves the vector untouched when its norm is zero or
/// not finite.
pub fn normalize(vector: &mut [f32]) -> bool {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return false;
    }
    for v in vector.iter_mut() {
        *v /= norm;
    }
    true
}

/// Outcome of one remote attempt.
#[derive(Debug)]
pub(crate) enum Attempt {
    /// Worth retrying (transport error, 429, 5xx)
    Retry(StoreError),
    /// Retrying cannot help (bad request, auth, malformed payload)
    Fatal(StoreError),
}

/// Run `op` up to `max_retries` times with exponential backoff between tries.
pub(crate) async fn with_retries<F, Fut>(max_retries: u32, mut op: F) -> StoreResult<Vec<f32>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<f32>, Attempt>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(vector) => return Ok(vector),
            Err(Attempt::Fatal(e)) => return Err(e),
            Err(Attempt::Retry(e)) => {
                attempt += 1;
                if attempt >= max_retries {
                    return Err(e);
                }
                let backoff_ms = backoff_ms(attempt);
                tracing::warn!(
                    "Embedding failed (attempt {}/{}): {}; retrying in {}ms",
                    attempt,
                    max_retries,
                    e,
                    backoff_ms
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
        }
    }
}

/// Exponential backoff for the given attempt, capped at [`MAX_BACKOFF_MS`].
fn backoff_ms(attempt: u32) -> u64 {
    2_u64
        .checked_pow(attempt)
        .map_or(MAX_BACKOFF_MS, |factor| INITIAL_BACKOFF_MS.saturating_mul(factor))
        .min(MAX_BACKOFF_MS)
}

/// Map an HTTP status to retry policy.
pub(crate) fn classify_status(status: reqwest::StatusCode, error: StoreError) -> Attempt {
    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        Attempt::Retry(error)
    } else {
        Attempt::Fatal(error)
    }
}
