//! # Knowledge-base vector index
//!
//! In-memory home for the pre-computed document collections and the cosine
//! ranking that runs over them.
//!
//! The corpus is small (hundreds of documents) and never changes at runtime, so
//! there is no ANN structure and no persistence layer: each collection is read
//! from static JSON once, kept resident, and scanned linearly per query.
//!
//! ## Pieces
//!
//! - [`cosine_similarity`] and [`rank`]: the pure scoring core.
//! - [`VectorDocument`] with a [`DocumentMetadata`] variant per [`DocumentKind`].
//! - [`CollectionLayout`]: maps a dimensionality to its three files
//!   (`insights_embedded{suffix}.json`, `curriculum_embedded{suffix}.json`,
//!   `metadata_embedded{suffix}.json`).
//! - [`CollectionStore`]: one dimensionality, loaded lazily and exactly once.
//! - [`StoreRegistry`]: memoizes one store per dimensionality.
//!
//! Vectors of different dimensionality never meet: a store rejects any query
//! whose length differs from its own.
//!
//! ## Example
//!
//! ```no_run
//! use index::{CollectionLayout, SearchOptions, StoreRegistry};
//!
//! # async fn run() -> Result<(), index::IndexError> {
//! let registry = StoreRegistry::new(CollectionLayout::new("./data"));
//! let store = registry.get_or_load(1024).await?;
//! let hits = store.search(&vec![0.0; 1024], &SearchOptions::default().with_top_k(3))?;
//! for hit in hits {
//!     println!("{} {:.3}", hit.document.id, hit.similarity);
//! }
//! # Ok(())
//! # }
//! ```

mod document;
mod layout;
mod registry;
pub mod similarity;
mod store;

pub use document::{
    CurriculumMetadata, DocumentKind, DocumentMetadata, FactMetadata, InsightMetadata,
    VectorDocument,
};
pub use layout::{CollectionLayout, CollectionSpec};
pub use registry::StoreRegistry;
pub use similarity::{cosine_similarity, rank, Ranked, DEFAULT_MIN_SIMILARITY};
pub use store::{CollectionStore, ScoredDocument, SearchOptions};

use thiserror::Error;

/// Errors raised while loading or querying collections.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("failed to read collection file {path}: {message}")]
    Io { path: String, message: String },
    #[error("failed to parse collection file {path}: {message}")]
    Parse { path: String, message: String },
    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        context: String,
    },
    #[error("no collection layout registered for dimension {0}")]
    UnknownDimension(usize),
    #[error("collection for dimension {dimension} is missing: {path}")]
    MissingCollection { dimension: usize, path: String },
    #[error("duplicate document id `{id}` in {path}")]
    DuplicateId { id: String, path: String },
    #[error("collection for dimension {dimension} has not been loaded")]
    NotLoaded { dimension: usize },
    #[error("unknown document type `{0}`")]
    UnknownKind(String),
}
