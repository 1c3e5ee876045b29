//! Store configuration management.

use crate::embeddings::EmbeddingConfig;
use crate::error::{StoreError, StoreResult};
use crate::metadata::MatchMode;
use crate::persistence::{INDEX_FILE, METADATA_FILE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the per-store configuration under the root.
pub const CONFIG_FILE: &str = "store.yaml";

/// Configuration of one vector store instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Directory holding the persisted artifacts. Not serialized; always the
    /// directory the config was loaded from.
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Upper bound on a single embedding call, in seconds
    #[serde(default = "default_embed_timeout_secs")]
    pub embed_timeout_secs: u64,

    /// Embedding calls in flight during add and rebuild
    #[serde(default = "default_embed_concurrency")]
    pub embed_concurrency: usize,

    /// How `delete_documents` compares its identifier
    #[serde(default)]
    pub delete_match: MatchMode,
}

fn default_embed_timeout_secs() -> u64 {
    60
}

fn default_embed_concurrency() -> usize {
    4
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./data/vectorstore"),
            embedding: EmbeddingConfig::default(),
            embed_timeout_secs: default_embed_timeout_secs(),
            embed_concurrency: default_embed_concurrency(),
            delete_match: MatchMode::default(),
        }
    }
}

impl StoreConfig {
    /// Default configuration rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, embedding: EmbeddingConfig) -> Self {
        Self {
            root: root.into(),
            embedding,
            ..Default::default()
        }
    }

    /// Load `<root>/store.yaml`, falling back to defaults when it is absent.
    pub fn load(root: &Path) -> StoreResult<Self> {
        let config_path = Self::config_path_for(root);

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).map_err(|e| {
                StoreError::Config(format!("Failed to read config at {:?}: {}", config_path, e))
            })?;

            let config: StoreConfig = serde_yaml::from_str(&content).map_err(|e| {
                StoreError::Config(format!("Failed to parse config at {:?}: {}", config_path, e))
            })?;

            tracing::debug!("Loaded store config from {:?}", config_path);
            config
        } else {
            tracing::debug!(
                "Using default store config for {:?} (no config file found)",
                root
            );
            StoreConfig::default()
        };

        config.root = root.to_path_buf();
        Ok(config)
    }

    /// Write the configuration to `<root>/store.yaml`.
    pub fn save(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.root).map_err(|e| StoreError::write(&self.root, e))?;

        let yaml = serde_yaml::to_string(self)
            .map_err(|e| StoreError::Config(format!("Failed to serialize config: {}", e)))?;

        let config_path = self.config_path();
        fs::write(&config_path, yaml).map_err(|e| StoreError::write(&config_path, e))?;

        tracing::debug!("Saved store config to {:?}", config_path);
        Ok(())
    }

    pub fn validate(&self) -> StoreResult<()> {
        self.embedding.validate()?;

        if self.embed_timeout_secs == 0 {
            return Err(StoreError::Config(
                "embed_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.embed_concurrency == 0 {
            return Err(StoreError::Config(
                "embed_concurrency must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn dimension(&self) -> usize {
        self.embedding.dimensions
    }

    pub fn config_path(&self) -> PathBuf {
        Self::config_path_for(&self.root)
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    fn config_path_for(root: &Path) -> PathBuf {
        root.join(CONFIG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let config = StoreConfig::load(temp.path()).unwrap();

        assert_eq!(config.root, temp.path());
        assert_eq!(config.embedding.provider, "openai");
        assert_eq!(config.dimension(), 1536);
        assert_eq!(config.delete_match, MatchMode::Substring);
        assert_eq!(config.index_path(), temp.path().join("vector_index.bin"));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let mut config = StoreConfig::new(temp.path().join("store"), EmbeddingConfig::trigram(256));
        config.delete_match = MatchMode::Exact;
        config.embed_concurrency = 8;

        config.save().unwrap();

        let loaded = StoreConfig::load(&temp.path().join("store")).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE),
            "embedding:\n  provider: ollama\n  model: nomic-embed-text\n  dimensions: 768\ndelete_match: exact\n",
        )
        .unwrap();

        let config = StoreConfig::load(temp.path()).unwrap();
        assert_eq!(config.embedding.provider, "ollama");
        assert_eq!(config.dimension(), 768);
        assert_eq!(config.embedding.max_retries, 3);
        assert_eq!(config.embed_timeout_secs, 60);
        assert_eq!(config.delete_match, MatchMode::Exact);
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), "embedding: [not, a, map").unwrap();
        assert!(matches!(
            StoreConfig::load(temp.path()),
            Err(StoreError::Config(_))
        ));
    }

    #[test]
    fn test_validate() {
        let mut config = StoreConfig::new("/tmp/unused", EmbeddingConfig::trigram(64));
        assert!(config.validate().is_ok());

        config.embed_concurrency = 0;
        assert!(config.validate().is_err());

        config.embed_concurrency = 1;
        config.embedding.dimensions = 0;
        assert!(config.validate().is_err());
    }
}
