use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::http::{build_http_client, EmbeddingCall};
use crate::provider::Embedder;
use crate::{EmbeddingMethod, SemanticConfig, SemanticError};

/// Ollama-style server on the same machine, reached through its
/// OpenAI-compatible `/v1/embeddings` route. No credential is sent.
#[derive(Debug)]
pub struct LocalServerEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimension: usize,
    timeout: Duration,
}

impl LocalServerEmbedder {
    pub fn new(cfg: &SemanticConfig) -> Result<Self, SemanticError> {
        Self::with_client(build_http_client()?, cfg)
    }

    /// Fails when `local_server_dimension` is unset: without it there is no
    /// collection the server's vectors could be compared against.
    pub fn with_client(client: reqwest::Client, cfg: &SemanticConfig) -> Result<Self, SemanticError> {
        let dimension = cfg.local_server_dimension.ok_or_else(|| {
            SemanticError::InvalidConfig(
                "local_server_dimension must be set to embed through the local server".into(),
            )
        })?;
        Ok(Self {
            client,
            base_url: cfg.local_server_url.clone(),
            model: cfg.local_server_model.clone(),
            dimension,
            timeout: Duration::from_secs(cfg.local_server_timeout_secs),
        })
    }
}

#[async_trait]
impl Embedder for LocalServerEmbedder {
    fn method(&self) -> EmbeddingMethod {
        EmbeddingMethod::LocalServer
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        debug!(model = %self.model, url = %self.base_url, "requesting local server embedding");
        EmbeddingCall {
            provider: EmbeddingMethod::LocalServer.as_str(),
            base_url: &self.base_url,
            api_key: None,
            model: &self.model,
            dimensions: None,
            timeout: self.timeout,
        }
        .send(&self.client, text)
        .await
    }
}
