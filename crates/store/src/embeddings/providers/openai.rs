//! OpenAI Embedding Provider
//!
//! Calls the `/embeddings` endpoint of the OpenAI API (or any compatible
//! server) and normalizes the returned vector for inner-product search.
//!
//! # Example
//! ```no_run
//! use ragvault_store::embeddings::{EmbeddingClient, EmbeddingConfig};
//! use ragvault_store::embeddings::providers::OpenAiEmbeddings;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EmbeddingConfig::default();
//! let provider = OpenAiEmbeddings::new(&config, std::env::var("OPENAI_API_KEY")?)?;
//! let result = provider.embed("What does article 750 cover?").await?;
//! assert_eq!(result.vector.len(), 1536);
//! # Ok(())
//! # }
//! ```

use crate::embeddings::provider::{classify_status, normalize, with_retries, Attempt};
use crate::embeddings::{EmbeddingClient, EmbeddingConfig};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
const EMBEDDING_ENDPOINT: &str = "/embeddings";

/// OpenAI embedding provider.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddings {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    max_retries: u32,
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

/// Successful response body.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Error response body.
#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl OpenAiEmbeddings {
    /// Create a provider. The endpoint falls back to the public OpenAI API.
    pub fn new(config: &EmbeddingConfig, api_key: impl Into<String>) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                StoreError::EmbeddingService(format!("Failed to create HTTP client: {}", e))
            })?;

        let base_url = config
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            max_retries: config.max_retries,
        })
    }

    /// Embed single text (no retries)
    #[instrument(skip(self, text), fields(text_len = text.len(), model = %self.model))]
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>, Attempt> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);

        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                Attempt::Retry(StoreError::EmbeddingService(format!(
                    "Failed to send request to OpenAI: {}",
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
                .map(|r| r.error.message)
                .unwrap_or(error_text);

            return Err(classify_status(
                status,
                StoreError::EmbeddingService(format!("OpenAI API error ({}): {}", status, message)),
            ));
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            Attempt::Fatal(StoreError::EmbeddingService(format!(
                "Failed to parse OpenAI response: {}",
                e
            )))
        })?;

        vector_from_response(body, self.dimensions).map_err(Attempt::Fatal)
    }
}

/// Validate a response body and return its normalized vector.
pub(crate) fn vector_from_response(
    body: EmbeddingResponse,
    dimensions: usize,
) -> StoreResult<Vec<f32>> {
    let mut vector = body
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| {
            StoreError::EmbeddingService("OpenAI response contained no embedding".to_string())
        })?;

    if vector.len() != dimensions {
        return Err(StoreError::DimensionMismatch {
            expected: dimensions,
            actual: vector.len(),
        });
    }

    if !normalize(&mut vector) {
        return Err(StoreError::EmbeddingService(
            "OpenAI returned a zero or non-finite vector".to_string(),
        ));
    }

    debug!("Generated {} dimensional embedding", vector.len());
    Ok(vector)
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddings {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, text), fields(text_len = text.len(), provider = "openai", model = %self.model))]
    async fn generate(&self, text: &str) -> StoreResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(StoreError::EmbeddingService(
                "Cannot embed empty text".to_string(),
            ));
        }

        with_retries(self.max_retries, || self.embed_single(text)).await
    }
}
