use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use hashbrown::HashSet;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::document::RawDocument;
use crate::similarity::{rank, DEFAULT_MIN_SIMILARITY};
use crate::{CollectionLayout, DocumentKind, IndexError, VectorDocument};

/// Per-query knobs for [`CollectionStore::search`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub top_k: usize,
    pub min_similarity: f32,
    /// Restrict the candidate pool to one document family.
    pub kind: Option<DocumentKind>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_similarity: DEFAULT_MIN_SIMILARITY,
            kind: None,
        }
    }
}

impl SearchOptions {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    pub fn with_kind(mut self, kind: Option<DocumentKind>) -> Self {
        self.kind = kind;
        self
    }
}

/// A resident document together with its score against the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDocument {
    pub document: VectorDocument,
    pub similarity: f32,
}

/// All documents of one dimensionality, loaded from disk at most once.
///
/// Concurrent first calls to [`load`](Self::load) share a single read; later
/// calls return immediately.
#[derive(Debug)]
pub struct CollectionStore {
    dimension: usize,
    files: Vec<(DocumentKind, PathBuf)>,
    pool: OnceCell<Vec<VectorDocument>>,
}

impl CollectionStore {
    pub fn new(dimension: usize, files: Vec<(DocumentKind, PathBuf)>) -> Self {
        Self {
            dimension,
            files,
            pool: OnceCell::new(),
        }
    }

    pub fn from_layout(layout: &CollectionLayout, dimension: usize) -> Result<Self, IndexError> {
        Ok(Self::new(dimension, layout.files_for(dimension)?))
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn is_loaded(&self) -> bool {
        self.pool.initialized()
    }

    /// Resident document count; zero until loaded.
    pub fn count(&self) -> usize {
        self.pool.get().map_or(0, Vec::len)
    }

    /// Reads the collection files into memory. Idempotent.
    pub async fn load(&self) -> Result<usize, IndexError> {
        let pool = self
            .pool
            .get_or_try_init(|| read_pool(self.dimension, &self.files))
            .await?;
        Ok(pool.len())
    }

    pub fn search(
        &self,
        query: &[f32],
        options: &SearchOptions,
    ) -> Result<Vec<ScoredDocument>, IndexError> {
        let pool = self.pool.get().ok_or(IndexError::NotLoaded {
            dimension: self.dimension,
        })?;

        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
                context: "query vector".into(),
            });
        }

        let candidates = pool
            .iter()
            .enumerate()
            .filter(|(_, doc)| options.kind.map_or(true, |kind| doc.kind == kind))
            .map(|(position, doc)| (position, doc.embedding.as_slice()));

        let ranked = rank(query, candidates, options.top_k, options.min_similarity)?;
        Ok(ranked
            .into_iter()
            .map(|hit| ScoredDocument {
                document: pool[hit.position].clone(),
                similarity: hit.similarity,
            })
            .collect())
    }
}

async fn read_pool(
    dimension: usize,
    files: &[(DocumentKind, PathBuf)],
) -> Result<Vec<VectorDocument>, IndexError> {
    let started = Instant::now();
    let mut pool = Vec::new();
    let mut seen = HashSet::new();

    for (kind, path) in files {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                if *kind == DocumentKind::Insight {
                    return Err(IndexError::MissingCollection {
                        dimension,
                        path: path.display().to_string(),
                    });
                }
                debug!(dimension, kind = %kind, path = %path.display(), "optional collection file absent");
                continue;
            }
            Err(err) => return Err(IndexError::io(path, err)),
        };

        let raw: Vec<RawDocument> =
            serde_json::from_slice(&bytes).map_err(|err| IndexError::parse(path, err))?;
        let before = pool.len();

        for entry in raw {
            let doc = entry
                .into_document(*kind)
                .map_err(|err| IndexError::parse(path, err))?;

            if doc.embedding.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: doc.embedding.len(),
                    context: format!("document `{}` in {}", doc.id, path.display()),
                });
            }
            if !seen.insert(doc.id.clone()) {
                return Err(IndexError::DuplicateId {
                    id: doc.id,
                    path: path.display().to_string(),
                });
            }
            pool.push(doc);
        }

        debug!(dimension, kind = %kind, documents = pool.len() - before, path = %path.display(), "collection file read");
    }

    info!(
        dimension,
        documents = pool.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "vector collection loaded"
    );
    Ok(pool)
}

impl IndexError {
    pub(crate) fn io(path: &Path, err: std::io::Error) -> Self {
        IndexError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn parse(path: &Path, err: serde_json::Error) -> Self {
        IndexError::Parse {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}
