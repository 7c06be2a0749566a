//! YAML configuration for `kbsearch`
//!
//! One file configures every layer: the embedding providers (`semantic`), the
//! on-disk collections (`collections`), ranking (`search`), the optional
//! answer step (`generation`) and logging. Every section and field has a
//! default, so an empty file is a valid configuration.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//!
//! semantic:
//!   model_name: "bge-large-en-v1.5"
//!   model_path: "./models/bge-large-en-v1.5/model.onnx"
//!   local_dimension: 1024
//!   api_model: "text-embedding-3-large"
//!   api_dimensions: [3072, 1536]
//!
//! collections:
//!   root: "./data"
//!   specs:
//!     - { dimension: 1024, suffix: "_1024" }
//!     - { dimension: 3072, suffix: "_3072" }
//!
//! search:
//!   top_k: 5
//!   min_similarity: 0.1
//!
//! generation:
//!   api_model: "gpt-4o-mini"
//!   local_server_model: "llama3.2"
//!
//! logging:
//!   level: "info"
//!   format: "json"
//! ```
//!
//! [`KbConfig::load`] layers an optional `kbsearch.yaml` with `KB__`-prefixed
//! environment variables (`KB__SEARCH__TOP_K=8`), after reading `.env`.

use std::fs;
use std::path::Path;

use index::CollectionLayout;
use matcher::{GenerationConfig, SearchSettings};
use semantic::SemanticConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default file name looked up by [`KbConfig::load`], without extension.
pub const DEFAULT_CONFIG_NAME: &str = "kbsearch";
/// Prefix of environment overrides; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "KB";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("failed to layer configuration sources: {0}")]
    Layered(#[from] config::ConfigError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Json,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbConfig {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub semantic: SemanticConfig,

    #[serde(default)]
    pub collections: CollectionLayout,

    #[serde(default)]
    pub search: SearchSettings,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for KbConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            semantic: SemanticConfig::default(),
            collections: CollectionLayout::default(),
            search: SearchSettings::default(),
            generation: GenerationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl KbConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: KbConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `.env`, then layers `path` (or an optional `kbsearch.yaml` in the
    /// working directory) under `KB__` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        let _ = dotenvy::dotenv();

        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };
        let layered = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: KbConfig = layered.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.semantic
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        self.search
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        self.generation
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;

        if self.collections.specs.is_empty() {
            return Err(ConfigLoadError::Validation(
                "collections.specs must list at least one dimension".into(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for spec in &self.collections.specs {
            if spec.dimension == 0 {
                return Err(ConfigLoadError::Validation(
                    "collection dimension must be > 0".into(),
                ));
            }
            if !seen.insert(spec.suffix.as_str()) {
                return Err(ConfigLoadError::Validation(format!(
                    "collection suffix `{}` is used twice",
                    spec.suffix
                )));
            }
        }
        Ok(())
    }
}

fn default_version() -> String {
    "1.0".to_string()
}
