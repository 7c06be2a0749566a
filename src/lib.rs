//! Workspace umbrella crate for the knowledge-base search core.
//!
//! Re-exports the three layers (`semantic` embeddings, `index` collections,
//! `matcher` resolution and search) and adds what a process needs around
//! them: layered configuration, logging setup, and [`build_engine`] to wire a
//! [`SearchEngine`] from a [`KbConfig`].
//!
//! ```no_run
//! use kbsearch::{build_engine, KbConfig, SearchRequest};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = KbConfig::load(None)?;
//! let engine = build_engine(&config)?;
//! let response = engine.search(&SearchRequest::new("how are trainees mentored?")).await?;
//! println!("{}", serde_json::to_string_pretty(&response)?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod telemetry;

use tracing::info;

pub use index::{
    cosine_similarity, rank, CollectionLayout, CollectionSpec, CollectionStore, DocumentKind,
    DocumentMetadata, IndexError, SearchOptions, StoreRegistry, VectorDocument,
};
pub use matcher::{
    resolve, resolve_generator, AnswerComposer, Capabilities, ConfigError, EngineHealth,
    GenerationConfig, MatchError, Resolution, ResolutionWarning, ResolverPolicy, SearchEngine,
    SearchRequest, SearchResponse, SearchResult, SearchSettings, SearchStatus,
};
pub use semantic::{
    embed_text, Embedder, EmbeddingMethod, LocalEmbedder, LocalServerEmbedder, RemoteEmbedder,
    SemanticConfig, SemanticEmbedding, SemanticError,
};

pub use crate::config::{ConfigLoadError, KbConfig, LogFormat, LoggingConfig};
pub use crate::telemetry::init_tracing;

/// Wires a [`SearchEngine`] from configuration. Nothing is loaded yet:
/// collections and the bundled model load on first use.
pub fn build_engine(config: &KbConfig) -> Result<SearchEngine, MatchError> {
    let engine = SearchEngine::new(
        config.search,
        config.semantic.clone(),
        config.generation.clone(),
        config.collections.clone(),
    )?;
    info!(
        root = %config.collections.root.display(),
        configured_dimensions = ?config.collections.specs.iter().map(|s| s.dimension).collect::<Vec<_>>(),
        available_dimensions = ?engine.registry().available_dimensions(),
        local_model = config.semantic.has_local_model(),
        "search engine configured"
    );
    Ok(engine)
}
