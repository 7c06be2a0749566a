use index::{
    DocumentKind, DocumentMetadata, IndexError, ScoredDocument, DEFAULT_MIN_SIMILARITY,
};
use semantic::{EmbeddingMethod, SemanticError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resolver::{ConfigError, ResolutionWarning};

/// Accepted query length, in characters, after trimming.
pub const MIN_QUERY_CHARS: usize = 2;
pub const MAX_QUERY_CHARS: usize = 1000;

/// Engine-wide search tuning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchSettings {
    /// Results returned when a request does not ask for a specific count.
    pub top_k: usize,
    /// Upper bound on a request's own `top_k`.
    pub max_top_k: usize,
    /// Noise floor; results below it are dropped.
    pub min_similarity: f32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_top_k: 50,
            min_similarity: DEFAULT_MIN_SIMILARITY,
        }
    }
}

impl SearchSettings {
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.top_k == 0 {
            return Err(MatchError::InvalidConfig("top_k must be greater than zero".into()));
        }
        if self.max_top_k < self.top_k {
            return Err(MatchError::InvalidConfig(
                "max_top_k must be >= top_k".into(),
            ));
        }
        if !(-1.0..=1.0).contains(&self.min_similarity) {
            return Err(MatchError::InvalidConfig(
                "min_similarity must be between -1.0 and 1.0".into(),
            ));
        }
        Ok(())
    }
}

/// One inbound search.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchRequest {
    pub query: String,
    /// Caller-supplied remote credential. Never serialized back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub generate_answer: bool,
    pub use_local_server: bool,
    pub top_k: Option<usize>,
    /// Restrict results to one document family.
    pub kind: Option<DocumentKind>,
}

impl std::fmt::Debug for SearchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchRequest")
            .field("query", &self.query)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("generate_answer", &self.generate_answer)
            .field("use_local_server", &self.use_local_server)
            .field("top_k", &self.top_k)
            .field("kind", &self.kind)
            .finish()
    }
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_answer(mut self, generate: bool) -> Self {
        self.generate_answer = generate;
        self
    }

    pub fn with_local_server(mut self, enabled: bool) -> Self {
        self.use_local_server = enabled;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_kind(mut self, kind: DocumentKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// The non-blank credential, if any.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Returns the trimmed query when its length is acceptable.
    pub fn validate(&self) -> Result<&str, MatchError> {
        let query = self.query.trim();
        let chars = query.chars().count();
        if chars < MIN_QUERY_CHARS {
            return Err(MatchError::InvalidRequest(format!(
                "query must be at least {MIN_QUERY_CHARS} characters"
            )));
        }
        if chars > MAX_QUERY_CHARS {
            return Err(MatchError::InvalidRequest(format!(
                "query must be at most {MAX_QUERY_CHARS} characters, got {chars}"
            )));
        }
        if self.top_k == Some(0) {
            return Err(MatchError::InvalidRequest(
                "top_k must be greater than zero".into(),
            ));
        }
        Ok(query)
    }
}

/// A ranked document as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    pub metadata: DocumentMetadata,
    pub similarity: f32,
    /// Provider that embedded the query.
    pub method: EmbeddingMethod,
}

impl SearchResult {
    pub fn from_scored(scored: ScoredDocument, method: EmbeddingMethod) -> Self {
        let doc = scored.document;
        Self {
            id: doc.id,
            text: doc.text,
            kind: doc.kind,
            metadata: doc.metadata,
            similarity: scored.similarity,
            method,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Matched,
    /// Nothing cleared the similarity floor. Not a failure.
    NoConfidentMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub method_used: EmbeddingMethod,
    pub dimension: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ResolutionWarning>,
    pub status: SearchStatus,
}

/// Errors surfaced by the search layer.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid search config: {0}")]
    InvalidConfig(String),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("embedding error: {0}")]
    Semantic(#[from] SemanticError),
    #[error("index error: {0}")]
    Index(#[from] IndexError),
}

impl MatchError {
    /// Remediation text for configuration problems.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            MatchError::Config(err) => Some(err.remediation()),
            MatchError::Semantic(SemanticError::ModelNotFound(_)) => Some(
                ConfigError::ModelWeightsMissing { dimension: 0 }.remediation(),
            ),
            MatchError::Index(IndexError::DimensionMismatch { .. })
            | MatchError::Index(IndexError::MissingCollection { .. }) => {
                Some("regenerate embeddings for this dimension")
            }
            _ => None,
        }
    }
}
