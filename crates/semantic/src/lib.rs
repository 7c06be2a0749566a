//! Query embedding for the knowledge-base search core.
//!
//! Three providers turn a query into a vector:
//!
//! - **Local** - the bundled ONNX model, no network. Needs the weights on disk.
//! - **Remote** - an OpenAI-compatible embeddings API, authenticated with a
//!   caller-supplied key. Can produce several output widths.
//! - **Local server** - an Ollama-style server on the same machine.
//!
//! All three implement [`Embedder`]. Nothing here falls back silently: a
//! missing model or a failed HTTP call comes back as a [`SemanticError`] and
//! the caller decides what to do about it.
//!
//! ## Threading notes
//!
//! [`LocalEmbedder::load`] opens the ONNX session once, on a dedicated
//! inference thread that owns it. Clones share that thread; queries queue on
//! it, so async callers never block a runtime worker during inference.
//!
//! ## Quick example
//!
//! ```no_run
//! use semantic::{embed_text, LocalEmbedder, SemanticConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), semantic::SemanticError> {
//!     let embedder = LocalEmbedder::load(&SemanticConfig::default())?;
//!     let embedding = embed_text(&embedder, "how do I insulate an attic?").await?;
//!     assert_eq!(embedding.embedding_dim, 384);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod types;

mod assets;
mod http;
mod local;
mod local_server;
mod normalize;
mod onnx;
mod provider;
mod remote;
mod session;
mod tokenize;

pub use crate::config::SemanticConfig;
pub use crate::error::SemanticError;
pub use crate::http::build_http_client;
pub use crate::local::LocalEmbedder;
pub use crate::local_server::LocalServerEmbedder;
pub use crate::provider::Embedder;
pub use crate::remote::RemoteEmbedder;
pub use crate::types::{EmbeddingMethod, SemanticEmbedding};

/// Embeds `text` with `embedder` and checks the result against the
/// provider's declared width.
///
/// Blank input is rejected before any provider work happens.
pub async fn embed_text(
    embedder: &dyn Embedder,
    text: &str,
) -> Result<SemanticEmbedding, SemanticError> {
    if text.trim().is_empty() {
        return Err(SemanticError::EmptyInput);
    }

    let vector = embedder.embed(text).await?;
    let expected = embedder.dimension();
    if vector.len() != expected {
        return Err(SemanticError::DimensionMismatch {
            method: embedder.method().to_string(),
            expected,
            actual: vector.len(),
        });
    }

    Ok(SemanticEmbedding {
        embedding_dim: vector.len(),
        vector,
        method: embedder.method(),
        model_name: embedder.model_name().to_string(),
        normalized: embedder.normalized(),
    })
}
