//! Wiring from application configuration to an opened vector store.

use anyhow::{Context, Result};
use ragvault_core::config::{AppConfig, ProviderConfig};
use ragvault_store::{create_client, EmbeddingConfig, StoreConfig, VectorStoreService};

const OLLAMA_DEFAULT_MODEL: &str = "nomic-embed-text";
const OLLAMA_DEFAULT_DIMENSIONS: usize = 768;
const TRIGRAM_DEFAULT_DIMENSIONS: usize = 384;

/// Embedding settings for the active provider.
///
/// Provider defaults first, then the model from flags/env when it was set
/// explicitly, then the provider's entry in config.yaml.
pub fn embedding_config(config: &AppConfig) -> EmbeddingConfig {
    let mut embedding = match config.provider.as_str() {
        "trigram" => EmbeddingConfig::trigram(TRIGRAM_DEFAULT_DIMENSIONS),
        "ollama" => EmbeddingConfig {
            provider: "ollama".to_string(),
            model: OLLAMA_DEFAULT_MODEL.to_string(),
            dimensions: OLLAMA_DEFAULT_DIMENSIONS,
            ..Default::default()
        },
        other => EmbeddingConfig {
            provider: other.to_string(),
            ..Default::default()
        },
    };

    let model_is_default = config.model == AppConfig::default().model;
    if embedding.provider != "trigram" && (embedding.provider == "openai" || !model_is_default) {
        embedding.model = config.model.clone();
    }

    if let Some(provider_config) = config.get_provider_config(&config.provider) {
        if let Some(dimensions) = provider_config.dimensions() {
            embedding.dimensions = dimensions;
        }
        if let Some(endpoint) = provider_config.endpoint() {
            embedding.endpoint = Some(endpoint.to_string());
        }
        if let Some(timeout) = provider_config.timeout_secs() {
            embedding.request_timeout_secs = timeout;
        }
        if let ProviderConfig::OpenAI { api_key_env, .. } = provider_config {
            embedding.api_key_env = api_key_env.clone();
        }
    }

    embedding
}

/// Open the store under the configured data directory.
///
/// Tuning (timeouts, concurrency, delete match mode) comes from
/// `<data_dir>/store.yaml`; the embedding setup always follows `config`.
pub async fn open_store(config: &AppConfig) -> Result<VectorStoreService> {
    let mut store_config = StoreConfig::load(&config.data_dir)
        .with_context(|| format!("Failed to load store config from {:?}", config.data_dir))?;
    store_config.embedding = embedding_config(config);

    if !store_config.config_path().exists() {
        store_config.save()?;
    }

    let api_key = config.resolve_api_key(&config.provider);
    let client = create_client(&store_config.embedding, api_key.as_deref())
        .context("Failed to create embedding client")?;

    let store = VectorStoreService::open(store_config, client)
        .await
        .with_context(|| format!("Failed to open vector store at {:?}", config.data_dir))?;
    Ok(store)
}
