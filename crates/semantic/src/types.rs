use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SemanticError;

/// The closed set of ways a query can be turned into a vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingMethod {
    /// Bundled ONNX model, no network.
    Local,
    /// OpenAI-compatible embeddings API, caller-supplied credential.
    Remote,
    /// Ollama-style server on the same machine.
    LocalServer,
}

impl EmbeddingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingMethod::Local => "local",
            EmbeddingMethod::Remote => "remote",
            EmbeddingMethod::LocalServer => "local_server",
        }
    }
}

impl fmt::Display for EmbeddingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddingMethod {
    type Err = SemanticError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "onnx" => Ok(EmbeddingMethod::Local),
            "remote" | "api" => Ok(EmbeddingMethod::Remote),
            "local_server" | "local-server" | "ollama" => Ok(EmbeddingMethod::LocalServer),
            other => Err(SemanticError::InvalidConfig(format!(
                "unknown embedding method `{other}`"
            ))),
        }
    }
}

/// Embedding output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SemanticEmbedding {
    /// Final embedding values.
    pub vector: Vec<f32>,
    /// Provider that produced the vector.
    pub method: EmbeddingMethod,
    /// Name of the model used to produce the vector.
    pub model_name: String,
    /// Dimension of `vector`.
    pub embedding_dim: usize,
    /// Whether [`vector`](Self::vector) has unit length.
    pub normalized: bool,
}
