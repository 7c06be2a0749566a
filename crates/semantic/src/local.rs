use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::info;

use crate::assets::resolve_model_assets;
use crate::normalize::l2_normalize_in_place;
use crate::provider::Embedder;
use crate::session::{InferenceWorker, OnnxInference};
use crate::tokenize::QueryTokenizer;
use crate::{EmbeddingMethod, SemanticConfig, SemanticError};

/// The bundled ONNX model. Runs entirely in-process.
///
/// The model is opened once, on a dedicated inference thread that every clone
/// of the embedder shares. Tokenization happens on the caller's thread.
#[derive(Clone)]
pub struct LocalEmbedder {
    inner: Arc<LocalModel>,
}

struct LocalModel {
    model_name: String,
    model_path: PathBuf,
    tokenizer: QueryTokenizer,
    worker: InferenceWorker,
    max_len: usize,
    dimension: usize,
    normalize: bool,
}

impl LocalEmbedder {
    /// Locates the model and tokenizer and opens the session, so a broken
    /// model file fails here rather than on first query.
    pub fn load(cfg: &SemanticConfig) -> Result<Self, SemanticError> {
        cfg.validate()?;
        let started = Instant::now();
        let assets = resolve_model_assets(cfg)?;
        let tokenizer = QueryTokenizer::load(&assets.tokenizer, cfg.max_sequence_length)?;
        let model_path = assets.model_path.clone();
        let worker = InferenceWorker::spawn("kb-onnx-inference", move || {
            OnnxInference::open(&model_path)
        })?;

        info!(
            model = %cfg.model_name,
            path = %assets.model_path.display(),
            dimension = cfg.local_dimension,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "local embedding model ready"
        );

        Ok(Self::from_parts(cfg, assets.model_path, tokenizer, worker))
    }

    fn from_parts(
        cfg: &SemanticConfig,
        model_path: PathBuf,
        tokenizer: QueryTokenizer,
        worker: InferenceWorker,
    ) -> Self {
        Self {
            inner: Arc::new(LocalModel {
                model_name: cfg.model_name.clone(),
                model_path,
                tokenizer,
                worker,
                max_len: cfg.max_sequence_length,
                dimension: cfg.local_dimension,
                normalize: cfg.normalize,
            }),
        }
    }

    /// Synchronous embedding for callers outside the async runtime.
    pub fn embed_sync(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        let encoded = self.inner.tokenizer.encode(text, self.inner.max_len)?;
        let pooled = self.inner.worker.infer_blocking(encoded)?;
        self.inner.finish(pooled)
    }
}

impl LocalModel {
    fn finish(&self, mut vector: Vec<f32>) -> Result<Vec<f32>, SemanticError> {
        if self.normalize {
            l2_normalize_in_place(&mut vector);
        }
        if vector.len() != self.dimension {
            return Err(SemanticError::DimensionMismatch {
                method: EmbeddingMethod::Local.to_string(),
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }
}

impl std::fmt::Debug for LocalEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEmbedder")
            .field("model_name", &self.inner.model_name)
            .field("model_path", &self.inner.model_path)
            .field("dimension", &self.inner.dimension)
            .finish()
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn method(&self) -> EmbeddingMethod {
        EmbeddingMethod::Local
    }

    fn dimension(&self) -> usize {
        self.inner.dimension
    }

    fn model_name(&self) -> &str {
        &self.inner.model_name
    }

    fn normalized(&self) -> bool {
        self.inner.normalize
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        let encoded = self.inner.tokenizer.encode(text, self.inner.max_len)?;
        let pooled = self.inner.worker.infer(encoded).await?;
        self.inner.finish(pooled)
    }
}
