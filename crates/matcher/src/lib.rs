//! # Knowledge-base matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` sits on top of the embedding providers (`semantic`) and the
//! collection layer (`index`). For each request it decides which embedding
//! method can serve it, embeds the query, ranks the matching collection and,
//! when asked, composes a cited answer from the ranked documents.
//!
//! ## Core Types
//!
//! - [`resolve`]: pure provider selection from [`Capabilities`] and a
//!   [`ResolverPolicy`]; fails with a [`ConfigError`] that carries remediation.
//! - [`SearchRequest`] / [`SearchResponse`]: the search operation's input and
//!   output, including the method used and any [`ResolutionWarning`]s.
//! - [`SearchEngine`]: long-lived composition root owning the collection
//!   registry, the lazily loaded bundled model and the HTTP client.
//! - [`AnswerComposer`]: formats results as numbered sources and asks a
//!   [`TextGenerator`] for an answer. Generation failures never fail a search.
//!
//! ## Example Usage
//!
//! ```no_run
//! use index::CollectionLayout;
//! use matcher::{GenerationConfig, SearchEngine, SearchRequest, SearchSettings};
//! use semantic::SemanticConfig;
//!
//! # async fn run() -> Result<(), matcher::MatchError> {
//! let engine = SearchEngine::new(
//!     SearchSettings::default(),
//!     SemanticConfig::default(),
//!     GenerationConfig::default(),
//!     CollectionLayout::new("./data"),
//! )?;
//!
//! let response = engine.search(&SearchRequest::new("hands-on training methods")).await?;
//! for hit in &response.results {
//!     println!("{:.3} {} {}", hit.similarity, hit.kind, hit.id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod answer;
pub mod engine;
pub mod generation;
pub mod resolver;
pub mod types;

#[doc(hidden)]
pub mod demo_utils;

pub use crate::answer::{build_context, format_citation, AnswerComposer};
pub use crate::engine::{EngineHealth, SearchEngine};
pub use crate::generation::{
    GenerationConfig, GenerationError, LocalServerGenerator, OpenAiGenerator, TextGenerator,
};
pub use crate::resolver::{
    resolve, resolve_generator, Capabilities, ConfigError, GenerationMethod, Resolution,
    ResolutionWarning, ResolverPolicy,
};
pub use crate::types::{
    MatchError, SearchRequest, SearchResponse, SearchResult, SearchSettings, SearchStatus,
};
