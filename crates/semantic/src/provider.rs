use async_trait::async_trait;

use crate::{EmbeddingMethod, SemanticError};

/// A query-to-vector provider.
///
/// Implementations are cheap to share behind an `Arc` and never retry on
/// their own: a failed call is reported to the caller as-is.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn method(&self) -> EmbeddingMethod;

    /// Width of every vector this provider returns.
    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;

    /// Whether returned vectors already have unit length.
    fn normalized(&self) -> bool {
        false
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError>;
}
