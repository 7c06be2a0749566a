//! Picks the embedding method and collection width for a request.
//!
//! [`resolve`] is a pure function of [`Capabilities`] and [`ResolverPolicy`]:
//! no I/O, no caching, and every input reaches either a [`Resolution`] or a
//! [`ConfigError`].

use std::collections::BTreeSet;
use std::fmt;

use semantic::{EmbeddingMethod, SemanticConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the current request and process can offer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Bundled model weights are on disk.
    pub has_local_model: bool,
    /// The caller supplied a remote credential.
    pub has_api_key: bool,
    /// The caller opted into the local server.
    pub wants_local_server: bool,
    /// Widths with a collection on disk.
    pub available_dimensions: BTreeSet<usize>,
}

/// Which collection widths belong to which provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverPolicy {
    pub local_dimension: usize,
    /// Most preferred first.
    pub remote_dimensions: Vec<usize>,
    pub local_server_dimension: Option<usize>,
}

impl Default for ResolverPolicy {
    fn default() -> Self {
        Self::from_config(&SemanticConfig::default())
    }
}

impl ResolverPolicy {
    pub fn from_config(cfg: &SemanticConfig) -> Self {
        Self {
            local_dimension: cfg.local_dimension,
            remote_dimensions: cfg.api_dimensions.clone(),
            local_server_dimension: cfg.local_server_dimension,
        }
    }

    fn first_remote(&self, available: &BTreeSet<usize>) -> Option<usize> {
        self.remote_dimensions
            .iter()
            .copied()
            .find(|d| available.contains(d))
    }
}

/// Non-fatal notes attached to a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ResolutionWarning {
    /// A credential was supplied but no collection for the remote provider exists.
    CredentialUnused { dimension: usize },
}

impl fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionWarning::CredentialUnused { dimension } => write!(
                f,
                "API key ignored: no remote-provider embeddings on disk, searched the {dimension}-dim local collection instead"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub method: EmbeddingMethod,
    pub dimension: usize,
    pub warnings: Vec<ResolutionWarning>,
}

impl Resolution {
    fn new(method: EmbeddingMethod, dimension: usize) -> Self {
        Self {
            method,
            dimension,
            warnings: Vec::new(),
        }
    }
}

/// Provider for the generated-answer path. Independent of retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMethod {
    Remote,
    LocalServer,
}

/// No usable provider/collection pairing exists for the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("the {dimension}-dim collection needs the bundled model, but its weights are missing")]
    ModelWeightsMissing { dimension: usize },
    #[error("embeddings for dimension(s) {dimensions:?} need an API key, none was supplied")]
    MissingCredential { dimensions: Vec<usize> },
    #[error("no usable embeddings available (found dimension(s) {found:?})")]
    NoEmbeddings { found: Vec<usize> },
}

impl ConfigError {
    pub fn remediation(&self) -> &'static str {
        match self {
            ConfigError::ModelWeightsMissing { .. } => {
                "download the bundled model weights or point semantic.model_path at them"
            }
            ConfigError::MissingCredential { .. } => {
                "provide an API key, or regenerate embeddings with the bundled model"
            }
            ConfigError::NoEmbeddings { .. } => {
                "regenerate embeddings into the collections directory"
            }
        }
    }
}

/// Chooses a provider and width; first matching rule wins.
///
/// 1. credential + remote collection: remote, first width in preference order
/// 2. local collection: bundled model (a credential is then unused, with a warning)
/// 3. local server opted in + its collection: local server
/// 4. remote collection only, no credential: [`ConfigError::MissingCredential`]
/// 5. anything else: [`ConfigError::NoEmbeddings`]
pub fn resolve(caps: &Capabilities, policy: &ResolverPolicy) -> Result<Resolution, ConfigError> {
    let available = &caps.available_dimensions;
    let remote = policy.first_remote(available);

    if caps.has_api_key {
        if let Some(dimension) = remote {
            return Ok(Resolution::new(EmbeddingMethod::Remote, dimension));
        }
    }

    if available.contains(&policy.local_dimension) {
        if !caps.has_local_model {
            return Err(ConfigError::ModelWeightsMissing {
                dimension: policy.local_dimension,
            });
        }
        let mut resolution = Resolution::new(EmbeddingMethod::Local, policy.local_dimension);
        if caps.has_api_key {
            resolution.warnings.push(ResolutionWarning::CredentialUnused {
                dimension: policy.local_dimension,
            });
        }
        return Ok(resolution);
    }

    if caps.wants_local_server {
        if let Some(dimension) = policy
            .local_server_dimension
            .filter(|d| available.contains(d))
        {
            return Ok(Resolution::new(EmbeddingMethod::LocalServer, dimension));
        }
    }

    if remote.is_some() {
        let dimensions = policy
            .remote_dimensions
            .iter()
            .copied()
            .filter(|d| available.contains(d))
            .collect();
        return Err(ConfigError::MissingCredential { dimensions });
    }

    Err(ConfigError::NoEmbeddings {
        found: available.iter().copied().collect(),
    })
}

/// Remote generation when a credential exists, else the local server when
/// opted into, else nothing.
pub fn resolve_generator(has_api_key: bool, wants_local_server: bool) -> Option<GenerationMethod> {
    if has_api_key {
        Some(GenerationMethod::Remote)
    } else if wants_local_server {
        Some(GenerationMethod::LocalServer)
    } else {
        None
    }
}
