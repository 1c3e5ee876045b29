//! Embedding configuration types.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};

/// Providers `create_client` can construct.
pub const SUPPORTED_PROVIDERS: [&str; 3] = ["openai", "ollama", "trigram"];

/// Largest accepted `max_retries`.
pub const MAX_RETRIES: u32 = 10;

/// Embedding configuration for a store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "openai", "ollama", "trigram"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Base URL override for remote providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Attempts per text before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-ada-002".to_string(),
            dimensions: 1536,
            endpoint: None,
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl EmbeddingConfig {
    /// Offline trigram configuration with the given dimension.
    pub fn trigram(dimensions: usize) -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions,
            ..Default::default()
        }
    }

    /// Check that the configuration can produce a usable client.
    pub fn validate(&self) -> StoreResult<()> {
        if !SUPPORTED_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(StoreError::Config(format!(
                "Unknown embedding provider: '{}'. Supported providers: {}",
                self.provider,
                SUPPORTED_PROVIDERS.join(", ")
            )));
        }

        if self.dimensions == 0 {
            return Err(StoreError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }

        if self.max_retries == 0 {
            return Err(StoreError::Config(
                "max_retries must be at least 1".to_string(),
            ));
        }

        if self.max_retries > MAX_RETRIES {
            return Err(StoreError::Config(format!(
                "max_retries must be at most {}, got {}",
                MAX_RETRIES, self.max_retries
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "text-embedding-ada-002");
        assert_eq!(config.dimensions, 1536);
        assert_eq!(config.max_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_defaults_fill_in() {
        let config: EmbeddingConfig =
            serde_yaml::from_str("provider: ollama\nmodel: nomic-embed-text\ndimensions: 768\n")
                .unwrap();
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.api_key_env, "OPENAI_API_KEY");
        assert!(config.endpoint.is_none());
    }

    #[test]
    fn test_validate_rejects_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "gguf".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn test_validate_rejects_zero_dimensions() {
        assert!(EmbeddingConfig::trigram(0).validate().is_err());
        assert!(EmbeddingConfig::trigram(64).validate().is_ok());
    }

    #[test]
    fn test_validate_bounds_max_retries() {
        let config = EmbeddingConfig {
            max_retries: MAX_RETRIES,
            ..EmbeddingConfig::trigram(64)
        };
        assert!(config.validate().is_ok());

        let config = EmbeddingConfig {
            max_retries: 64,
            ..EmbeddingConfig::trigram(64)
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("at most 10"));
    }
}
