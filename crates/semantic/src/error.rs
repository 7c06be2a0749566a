use std::io;
use thiserror::Error;

/// Errors surfaced by the embedding providers.
#[derive(Debug, Error)]
pub enum SemanticError {
    /// The bundled model's weights are not on disk.
    #[error(
        "model file not found: {0}; download the ONNX weights to this path or point semantic.model_path at them"
    )]
    ModelNotFound(String),
    /// The tokenizer assets exist but could not be read or applied.
    #[error("tokenizer failure: {0}")]
    Tokenizer(String),
    /// Configuration is inconsistent (e.g., a zero timeout).
    #[error("invalid semantic config: {0}")]
    InvalidConfig(String),
    /// Blank text was handed to a provider.
    #[error("cannot embed empty text")]
    EmptyInput,
    /// A provider produced a vector of the wrong width.
    #[error("{method} provider returned {actual} dimensions, expected {expected}")]
    DimensionMismatch {
        method: String,
        expected: usize,
        actual: usize,
    },
    /// A remote or local-server call failed or answered with a non-success status.
    #[error(
        "{provider} request failed ({}): {message}",
        .status.map_or_else(|| "no response".to_string(), |s| format!("HTTP {s}"))
    )]
    Upstream {
        provider: String,
        status: Option<u16>,
        message: String,
    },
    /// Low-level IO failures while touching the filesystem.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// ONNX Runtime or pooling errors.
    #[error("inference failure: {0}")]
    Inference(String),
}

impl SemanticError {
    /// True for failures of an HTTP provider call.
    pub fn is_upstream(&self) -> bool {
        matches!(self, SemanticError::Upstream { .. })
    }
}

impl Clone for SemanticError {
    fn clone(&self) -> Self {
        match self {
            SemanticError::ModelNotFound(s) => SemanticError::ModelNotFound(s.clone()),
            SemanticError::Tokenizer(s) => SemanticError::Tokenizer(s.clone()),
            SemanticError::InvalidConfig(s) => SemanticError::InvalidConfig(s.clone()),
            SemanticError::EmptyInput => SemanticError::EmptyInput,
            SemanticError::DimensionMismatch {
                method,
                expected,
                actual,
            } => SemanticError::DimensionMismatch {
                method: method.clone(),
                expected: *expected,
                actual: *actual,
            },
            SemanticError::Upstream {
                provider,
                status,
                message,
            } => SemanticError::Upstream {
                provider: provider.clone(),
                status: *status,
                message: message.clone(),
            },
            SemanticError::Io(e) => SemanticError::Io(io::Error::new(e.kind(), e.to_string())),
            SemanticError::Inference(s) => SemanticError::Inference(s.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_not_found_names_path_and_remedy() {
        let err = SemanticError::ModelNotFound("/models/model.onnx".into());
        let msg = err.to_string();
        assert!(msg.contains("model file not found"));
        assert!(msg.contains("/models/model.onnx"));
        assert!(msg.contains("semantic.model_path"));
    }

    #[test]
    fn upstream_formats_status() {
        let err = SemanticError::Upstream {
            provider: "remote".into(),
            status: Some(429),
            message: "rate limited".into(),
        };
        assert_eq!(err.to_string(), "remote request failed (HTTP 429): rate limited");
        assert!(err.is_upstream());

        let err = SemanticError::Upstream {
            provider: "local_server".into(),
            status: None,
            message: "operation timed out".into(),
        };
        assert!(err.to_string().contains("no response"));
    }

    #[test]
    fn dimension_mismatch_message() {
        let err = SemanticError::DimensionMismatch {
            method: "local".into(),
            expected: 1024,
            actual: 384,
        };
        assert_eq!(
            err.to_string(),
            "local provider returned 384 dimensions, expected 1024"
        );
        assert!(!err.is_upstream());
    }

    #[test]
    fn io_errors_survive_clone() {
        let err: SemanticError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        let cloned = err.clone();
        match cloned {
            SemanticError::Io(inner) => assert_eq!(inner.kind(), io::ErrorKind::NotFound),
            other => panic!("unexpected clone {other:?}"),
        }
    }
}
