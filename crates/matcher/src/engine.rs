use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use index::{CollectionLayout, SearchOptions, StoreRegistry};
use semantic::{
    build_http_client, embed_text, Embedder, EmbeddingMethod, LocalEmbedder,
    LocalServerEmbedder, RemoteEmbedder, SemanticConfig, SemanticEmbedding, SemanticError,
};
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::answer::AnswerComposer;
use crate::generation::{GenerationConfig, LocalServerGenerator, OpenAiGenerator, TextGenerator};
use crate::resolver::{
    resolve, resolve_generator, Capabilities, ConfigError, GenerationMethod, ResolverPolicy,
};
use crate::types::{
    MatchError, SearchRequest, SearchResponse, SearchResult, SearchSettings, SearchStatus,
};

#[cfg(test)]
mod tests;

/// Snapshot for health checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineHealth {
    pub available_dimensions: Vec<usize>,
    /// Resident document count per loaded dimension.
    pub loaded: BTreeMap<usize, usize>,
    pub local_model: bool,
}

/// Serves searches over the pre-computed collections.
///
/// Built once at startup and shared. The collections and the bundled model
/// load lazily, at most once each; everything derived from the caller's
/// credential is recomputed per request.
pub struct SearchEngine {
    settings: SearchSettings,
    semantic_cfg: SemanticConfig,
    generation_cfg: GenerationConfig,
    policy: ResolverPolicy,
    registry: Arc<StoreRegistry>,
    client: reqwest::Client,
    local: OnceCell<Arc<dyn Embedder>>,
}

impl SearchEngine {
    pub fn new(
        settings: SearchSettings,
        semantic_cfg: SemanticConfig,
        generation_cfg: GenerationConfig,
        layout: CollectionLayout,
    ) -> Result<Self, MatchError> {
        Self::with_registry(
            settings,
            semantic_cfg,
            generation_cfg,
            Arc::new(StoreRegistry::new(layout)),
        )
    }

    /// Construct an engine over a shared registry.
    pub fn with_registry(
        settings: SearchSettings,
        semantic_cfg: SemanticConfig,
        generation_cfg: GenerationConfig,
        registry: Arc<StoreRegistry>,
    ) -> Result<Self, MatchError> {
        settings.validate()?;
        semantic_cfg.validate()?;
        generation_cfg
            .validate()
            .map_err(|e| MatchError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            settings,
            policy: ResolverPolicy::from_config(&semantic_cfg),
            semantic_cfg,
            generation_cfg,
            registry,
            client: build_http_client()?,
            local: OnceCell::new(),
        })
    }

    /// Uses `embedder` in place of the bundled model. Its dimension becomes the
    /// local collection width.
    pub fn with_local_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.policy.local_dimension = embedder.dimension();
        self.local = OnceCell::new_with(Some(embedder));
        self
    }

    pub fn registry(&self) -> &Arc<StoreRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    fn capabilities(&self, request: &SearchRequest) -> Capabilities {
        Capabilities {
            has_local_model: self.local.initialized() || self.semantic_cfg.has_local_model(),
            has_api_key: request.credential().is_some(),
            wants_local_server: request.use_local_server,
            available_dimensions: self.registry.available_dimensions(),
        }
    }

    /// The search operation.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, MatchError> {
        let started = Instant::now();
        let query = request.validate()?;
        let api_key = request.credential();

        let resolution = resolve(&self.capabilities(request), &self.policy)?;
        for warning in &resolution.warnings {
            warn!(warning = %warning, "degraded provider resolution");
        }

        let embedder = self
            .embedder_for(resolution.method, resolution.dimension, api_key)
            .await?;
        let embedding = embed_text(embedder.as_ref(), query).await?;

        let store = self.registry.get_or_load(resolution.dimension).await?;
        let top_k = request
            .top_k
            .unwrap_or(self.settings.top_k)
            .min(self.settings.max_top_k);
        let options = SearchOptions::default()
            .with_top_k(top_k)
            .with_min_similarity(self.settings.min_similarity)
            .with_kind(request.kind);
        let results: Vec<SearchResult> = store
            .search(&embedding.vector, &options)?
            .into_iter()
            .map(|hit| SearchResult::from_scored(hit, resolution.method))
            .collect();

        let status = if results.is_empty() {
            SearchStatus::NoConfidentMatch
        } else {
            SearchStatus::Matched
        };

        let answer = if request.generate_answer {
            let generator = self.generator_for(api_key, request.use_local_server);
            Some(AnswerComposer::new(generator).compose(query, &results).await)
        } else {
            None
        };

        info!(
            method = %resolution.method,
            dimension = resolution.dimension,
            results = results.len(),
            top_similarity = results.first().map(|r| r.similarity),
            answered = answer.is_some(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search complete"
        );

        Ok(SearchResponse {
            results,
            method_used: resolution.method,
            dimension: resolution.dimension,
            answer,
            warnings: resolution.warnings,
            status,
        })
    }

    /// The embedding operation: `text` through the named provider, at the
    /// width that provider would search with.
    pub async fn embed(
        &self,
        text: &str,
        method: EmbeddingMethod,
        api_key: Option<&str>,
    ) -> Result<SemanticEmbedding, MatchError> {
        let dimension = match method {
            EmbeddingMethod::Local => self.policy.local_dimension,
            EmbeddingMethod::Remote => {
                let available = self.registry.available_dimensions();
                self.policy
                    .remote_dimensions
                    .iter()
                    .copied()
                    .find(|d| available.contains(d))
                    .or_else(|| self.policy.remote_dimensions.first().copied())
                    .ok_or_else(|| {
                        MatchError::InvalidConfig("no remote dimensions configured".into())
                    })?
            }
            EmbeddingMethod::LocalServer => {
                self.policy.local_server_dimension.ok_or_else(|| {
                    MatchError::InvalidConfig("local_server_dimension is not configured".into())
                })?
            }
        };
        let embedder = self.embedder_for(method, dimension, api_key).await?;
        Ok(embed_text(embedder.as_ref(), text).await?)
    }

    pub fn health(&self) -> EngineHealth {
        let available: BTreeSet<usize> = self.registry.available_dimensions();
        EngineHealth {
            available_dimensions: available.into_iter().collect(),
            loaded: self.registry.loaded(),
            local_model: self.local.initialized() || self.semantic_cfg.has_local_model(),
        }
    }

    async fn embedder_for(
        &self,
        method: EmbeddingMethod,
        dimension: usize,
        api_key: Option<&str>,
    ) -> Result<Arc<dyn Embedder>, MatchError> {
        match method {
            EmbeddingMethod::Local => Ok(Arc::clone(self.local_embedder().await?)),
            EmbeddingMethod::Remote => {
                let key = api_key.ok_or_else(|| ConfigError::MissingCredential {
                    dimensions: vec![dimension],
                })?;
                Ok(Arc::new(RemoteEmbedder::with_client(
                    self.client.clone(),
                    &self.semantic_cfg,
                    key,
                    dimension,
                )?))
            }
            EmbeddingMethod::LocalServer => Ok(Arc::new(LocalServerEmbedder::with_client(
                self.client.clone(),
                &self.semantic_cfg,
            )?)),
        }
    }

    async fn local_embedder(&self) -> Result<&Arc<dyn Embedder>, MatchError> {
        self.local
            .get_or_try_init(|| async {
                let cfg = self.semantic_cfg.clone();
                let embedder = tokio::task::spawn_blocking(move || LocalEmbedder::load(&cfg))
                    .await
                    .map_err(|e| {
                        SemanticError::Inference(format!("model loading task failed: {e}"))
                    })??;
                Ok::<Arc<dyn Embedder>, MatchError>(Arc::new(embedder))
            })
            .await
    }

    fn generator_for(
        &self,
        api_key: Option<&str>,
        wants_local_server: bool,
    ) -> Option<Box<dyn TextGenerator>> {
        match resolve_generator(api_key.is_some(), wants_local_server)? {
            GenerationMethod::Remote => {
                let key = api_key?;
                Some(Box::new(OpenAiGenerator::new(
                    self.client.clone(),
                    &self.generation_cfg,
                    key,
                )))
            }
            GenerationMethod::LocalServer => Some(Box::new(LocalServerGenerator::new(
                self.client.clone(),
                &self.generation_cfg,
            ))),
        }
    }
}
