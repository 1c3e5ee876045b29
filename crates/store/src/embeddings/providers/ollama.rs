//! Ollama Embedding Provider
//!
//! Local embeddings via Ollama's HTTP API using models like nomic-embed-text.
//! No API key or per-call cost, which makes it the usual choice for
//! development against a real model.

use crate::embeddings::provider::{classify_status, normalize, with_retries, Attempt};
use crate::embeddings::{EmbeddingClient, EmbeddingConfig};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Ollama API endpoint for embeddings
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Ollama embedding provider using local API
#[derive(Debug, Clone)]
pub struct OllamaEmbeddings {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
    max_retries: u32,
}

/// Request payload for Ollama embeddings API
#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Response from Ollama embeddings API
#[derive(Debug, Clone, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Error response from Ollama API
#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaEmbeddings {
    /// Create a provider. The endpoint comes from config, then `OLLAMA_URL`,
    /// then the local default.
    pub fn new(config: &EmbeddingConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                StoreError::EmbeddingService(format!(
                    "Failed to create HTTP client for Ollama: {}",
                    e
                ))
            })?;

        let base_url = config
            .endpoint
            .clone()
            .or_else(|| std::env::var("OLLAMA_URL").ok())
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            model: config.model.clone(),
            dimensions: config.dimensions,
            max_retries: config.max_retries,
        })
    }

    /// Embed single text (no retries)
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>, Attempt> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);

        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                Attempt::Retry(StoreError::EmbeddingService(format!(
                    "Failed to send request to Ollama: {}",
                    e
                )))
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|r| r.error)
                .unwrap_or(error_text);

            return Err(classify_status(
                status,
                StoreError::EmbeddingService(format!("Ollama API error ({}): {}", status, message)),
            ));
        }

        let mut body: EmbeddingResponse = response.json().await.map_err(|e| {
            Attempt::Fatal(StoreError::EmbeddingService(format!(
                "Failed to parse Ollama response: {}",
                e
            )))
        })?;

        if body.embedding.len() != self.dimensions {
            return Err(Attempt::Fatal(StoreError::DimensionMismatch {
                expected: self.dimensions,
                actual: body.embedding.len(),
            }));
        }

        if !normalize(&mut body.embedding) {
            return Err(Attempt::Fatal(StoreError::EmbeddingService(
                "Ollama returned a zero or non-finite vector".to_string(),
            )));
        }

        Ok(body.embedding)
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddings {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, text), fields(text_len = text.len(), provider = "ollama", model = %self.model))]
    async fn generate(&self, text: &str) -> StoreResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(StoreError::EmbeddingService(
                "Cannot embed empty text".to_string(),
            ));
        }

        with_retries(self.max_retries, || self.embed_single(text)).await
    }
}
