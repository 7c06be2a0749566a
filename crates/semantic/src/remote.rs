use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::http::{build_http_client, EmbeddingCall};
use crate::provider::Embedder;
use crate::{EmbeddingMethod, SemanticConfig, SemanticError};

/// OpenAI-compatible embeddings API authenticated with a caller-supplied key.
///
/// The key is held only for the lifetime of the embedder and is never logged.
pub struct RemoteEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    dimension: usize,
    timeout: Duration,
}

impl RemoteEmbedder {
    /// Builds an embedder that requests `dimension`-wide vectors.
    pub fn new(
        cfg: &SemanticConfig,
        api_key: impl Into<String>,
        dimension: usize,
    ) -> Result<Self, SemanticError> {
        Self::with_client(build_http_client()?, cfg, api_key, dimension)
    }

    pub fn with_client(
        client: reqwest::Client,
        cfg: &SemanticConfig,
        api_key: impl Into<String>,
        dimension: usize,
    ) -> Result<Self, SemanticError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SemanticError::InvalidConfig(
                "remote embedding requires a non-empty API key".into(),
            ));
        }
        if dimension == 0 {
            return Err(SemanticError::InvalidConfig(
                "remote embedding dimension must be > 0".into(),
            ));
        }
        Ok(Self {
            client,
            base_url: cfg.api_url.clone(),
            model: cfg.api_model.clone(),
            api_key,
            dimension,
            timeout: Duration::from_secs(cfg.api_timeout_secs),
        })
    }
}

impl std::fmt::Debug for RemoteEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteEmbedder")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    fn method(&self) -> EmbeddingMethod {
        EmbeddingMethod::Remote
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        debug!(model = %self.model, dimension = self.dimension, "requesting remote embedding");
        EmbeddingCall {
            provider: EmbeddingMethod::Remote.as_str(),
            base_url: &self.base_url,
            api_key: Some(&self.api_key),
            model: &self.model,
            dimensions: Some(self.dimension),
            timeout: self.timeout,
        }
        .send(&self.client, text)
        .await
    }
}
