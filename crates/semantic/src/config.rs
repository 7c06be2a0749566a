use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::SemanticError;

/// Runtime configuration for every embedding provider.
///
/// The local fields describe the bundled ONNX model; the `api_*` fields an
/// OpenAI-compatible embeddings endpoint; the `local_server_*` fields an
/// Ollama-style server on the same machine.
///
/// # Example
/// ```
/// use semantic::SemanticConfig;
/// use std::path::PathBuf;
///
/// let cfg = SemanticConfig {
///     model_path: PathBuf::from("models/bge-large-en-v1.5/model.onnx"),
///     local_dimension: 1024,
///     ..Default::default()
/// };
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SemanticConfig {
    /// Friendly label surfaced on every `SemanticEmbedding` produced locally.
    pub model_name: String,
    /// ONNX weights of the bundled model. Required for local embedding.
    pub model_path: PathBuf,
    /// `tokenizer.json` next to the model. Optional.
    pub tokenizer_path: Option<PathBuf>,
    /// One-token-per-line vocabulary used when no `tokenizer.json` exists.
    pub vocab_path: Option<PathBuf>,
    /// Tokens per input, boundary markers included.
    pub max_sequence_length: usize,
    /// Output width of the bundled model.
    pub local_dimension: usize,
    /// Normalize local vectors to unit length.
    pub normalize: bool,

    pub api_url: String,
    pub api_model: String,
    /// Output widths the remote model can produce, most preferred first.
    pub api_dimensions: Vec<usize>,
    pub api_timeout_secs: u64,

    pub local_server_url: String,
    pub local_server_model: String,
    /// Output width of the local server's embedding model, when it has
    /// collections of its own.
    pub local_server_dimension: Option<usize>,
    pub local_server_timeout_secs: u64,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            model_name: "all-MiniLM-L6-v2".into(),
            model_path: PathBuf::from("./models/all-MiniLM-L6-v2/model.onnx"),
            tokenizer_path: Some(PathBuf::from("./models/all-MiniLM-L6-v2/tokenizer.json")),
            vocab_path: Some(PathBuf::from("./models/all-MiniLM-L6-v2/vocab.txt")),
            max_sequence_length: 128,
            local_dimension: 384,
            normalize: true,
            api_url: "https://api.openai.com/v1".into(),
            api_model: "text-embedding-3-large".into(),
            api_dimensions: vec![3072, 1536],
            api_timeout_secs: 30,
            local_server_url: "http://localhost:11434/v1".into(),
            local_server_model: "nomic-embed-text".into(),
            local_server_dimension: None,
            local_server_timeout_secs: 60,
        }
    }
}

impl SemanticConfig {
    pub fn validate(&self) -> Result<(), SemanticError> {
        if self.max_sequence_length < 2 {
            return Err(SemanticError::InvalidConfig(
                "max_sequence_length must leave room for the boundary markers".into(),
            ));
        }
        if self.local_dimension == 0 {
            return Err(SemanticError::InvalidConfig(
                "local_dimension must be > 0".into(),
            ));
        }
        if self.api_dimensions.iter().any(|&d| d == 0) {
            return Err(SemanticError::InvalidConfig(
                "api_dimensions must not contain 0".into(),
            ));
        }
        if self.local_server_dimension == Some(0) {
            return Err(SemanticError::InvalidConfig(
                "local_server_dimension must be > 0".into(),
            ));
        }
        if self.api_timeout_secs == 0 || self.local_server_timeout_secs == 0 {
            return Err(SemanticError::InvalidConfig(
                "provider timeouts must be at least one second".into(),
            ));
        }
        Ok(())
    }

    /// Whether the bundled model's weights are on disk.
    pub fn has_local_model(&self) -> bool {
        self.model_path.is_file()
    }
}
