//! Configuration management for Ragvault.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - Config file (`<data_dir>/config.yaml` or `RAGVAULT_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! All persistent state lives under the data directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Providers the application knows how to construct.
pub const KNOWN_PROVIDERS: [&str; 3] = ["openai", "ollama", "trigram"];

/// Environment variable consulted for the OpenAI key when no other source is set.
pub const DEFAULT_OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root directory holding the persisted index and metadata
    pub data_dir: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active embedding provider ("openai", "ollama", "trigram")
    pub provider: String,

    /// Embedding model identifier
    pub model: String,

    /// API key for the embedding provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Log line format
    pub log_format: LogFormat,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Embedding provider configurations from config.yaml
    pub embedding: Option<EmbeddingSection>,
}

/// Embedding section of config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSection {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
        dimensions: Option<usize>,
        timeout: Option<u64>,
    },
    Ollama {
        endpoint: String,
        model: String,
        dimensions: Option<usize>,
        timeout: Option<u64>,
    },
    Trigram {
        dimensions: usize,
    },
}

impl ProviderConfig {
    /// Model name for this provider, if it has one.
    pub fn model(&self) -> Option<&str> {
        match self {
            ProviderConfig::OpenAI { model, .. } | ProviderConfig::Ollama { model, .. } => {
                Some(model)
            }
            ProviderConfig::Trigram { .. } => None,
        }
    }

    /// Endpoint override, if configured.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ProviderConfig::OpenAI { endpoint, .. } => endpoint.as_deref(),
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint),
            ProviderConfig::Trigram { .. } => None,
        }
    }

    /// Expected vector dimension, if configured.
    pub fn dimensions(&self) -> Option<usize> {
        match self {
            ProviderConfig::OpenAI { dimensions, .. }
            | ProviderConfig::Ollama { dimensions, .. } => *dimensions,
            ProviderConfig::Trigram { dimensions } => Some(*dimensions),
        }
    }

    /// Request timeout in seconds, if configured.
    pub fn timeout_secs(&self) -> Option<u64> {
        match self {
            ProviderConfig::OpenAI { timeout, .. } | ProviderConfig::Ollama { timeout, .. } => {
                *timeout
            }
            ProviderConfig::Trigram { .. } => None,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    embedding: Option<EmbeddingSection>,
    storage: Option<StorageSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StorageSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    format: Option<LogFormat>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/vectorstore"),
            config_file: None,
            provider: "openai".to_string(),
            model: "text-embedding-ada-002".to_string(),
            api_key: None,
            log_level: None,
            log_format: LogFormat::Pretty,
            verbose: false,
            no_color: false,
            embedding: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, the config file, and defaults.
    ///
    /// Environment variables:
    /// - `RAGVAULT_DATA_DIR`: Override data directory
    /// - `RAGVAULT_CONFIG`: Path to config file
    /// - `RAGVAULT_PROVIDER`: Embedding provider
    /// - `RAGVAULT_MODEL`: Embedding model
    /// - `RAGVAULT_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use ragvault_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Data dir: {:?}", config.data_dir);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with_file(None)
    }

    /// Like [`load`](Self::load), but an explicit `config_file` wins over
    /// `RAGVAULT_CONFIG` and the data directory default.
    pub fn load_with_file(config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(data_dir) = std::env::var("RAGVAULT_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        config.config_file =
            config_file.or_else(|| std::env::var("RAGVAULT_CONFIG").ok().map(PathBuf::from));

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.data_dir.join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file does not exist: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("RAGVAULT_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("RAGVAULT_MODEL") {
            config.model = model;
        }

        if let Ok(key) = std::env::var("RAGVAULT_API_KEY") {
            config.api_key = Some(key);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(storage) = config_file.storage {
            if let Some(path) = storage.path {
                result.data_dir = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(format) = logging.format {
                result.log_format = format;
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(embedding) = config_file.embedding {
            result.provider = embedding.active_provider.clone();

            if let Some(model) = embedding
                .providers
                .get(&embedding.active_provider)
                .and_then(ProviderConfig::model)
            {
                result.model = model.to_string();
            }

            result.embedding = Some(embedding);
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        data_dir: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        log_format: Option<LogFormat>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(data_dir) = data_dir {
            self.data_dir = data_dir;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if let Some(log_format) = log_format {
            self.log_format = log_format;
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Ensure the data directory exists.
    pub fn ensure_data_dir(&self) -> AppResult<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir).map_err(|e| {
                AppError::Config(format!(
                    "Failed to create data directory {:?}: {}",
                    self.data_dir, e
                ))
            })?;
        }
        Ok(())
    }

    /// Get a provider's configuration from the config file.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.embedding
            .as_ref()
            .and_then(|section| section.providers.get(provider))
    }

    /// Resolve the API key for a provider.
    ///
    /// Order: explicit key (`RAGVAULT_API_KEY` or flag), the provider's
    /// `apiKeyEnv`, then `OPENAI_API_KEY` for the openai provider.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        if let Some(ProviderConfig::OpenAI { api_key_env, .. }) = self.get_provider_config(provider)
        {
            if let Ok(key) = std::env::var(api_key_env) {
                return Some(key);
            }
        }

        if provider == "openai" {
            return std::env::var(DEFAULT_OPENAI_KEY_ENV).ok();
        }

        None
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.as_str();

        if !KNOWN_PROVIDERS.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if provider == "openai" && self.resolve_api_key(provider).is_none() {
            let env_var = match self.get_provider_config(provider) {
                Some(ProviderConfig::OpenAI { api_key_env, .. }) => api_key_env.as_str(),
                _ => DEFAULT_OPENAI_KEY_ENV,
            };
            return Err(AppError::Config(format!(
                "API key not found in environment variable: {}",
                env_var
            )));
        }

        Ok(())
    }
}
