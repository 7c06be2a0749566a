use std::path::{Path, PathBuf};

use tracing::warn;

use crate::{SemanticConfig, SemanticError};

/// Where token ids come from for the bundled model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenizerSource {
    /// A HuggingFace `tokenizer.json`.
    Json(PathBuf),
    /// A one-token-per-line `vocab.txt` for the built-in word-level tokenizer.
    Vocab(PathBuf),
    /// No vocabulary at all; words are hashed into the id space.
    Hashed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ModelAssets {
    pub(crate) model_path: PathBuf,
    pub(crate) tokenizer: TokenizerSource,
}

/// Locates the bundled model on disk. Nothing is downloaded: absent weights
/// are a fatal configuration problem for the local provider.
pub(crate) fn resolve_model_assets(cfg: &SemanticConfig) -> Result<ModelAssets, SemanticError> {
    if !cfg.model_path.is_file() {
        return Err(SemanticError::ModelNotFound(
            cfg.model_path.display().to_string(),
        ));
    }

    let sibling = |name: &str| -> PathBuf {
        cfg.model_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(name)
    };

    let tokenizer_json = cfg
        .tokenizer_path
        .clone()
        .unwrap_or_else(|| sibling("tokenizer.json"));
    let vocab = cfg
        .vocab_path
        .clone()
        .unwrap_or_else(|| sibling("vocab.txt"));

    let tokenizer = if tokenizer_json.is_file() {
        TokenizerSource::Json(tokenizer_json)
    } else if vocab.is_file() {
        TokenizerSource::Vocab(vocab)
    } else {
        warn!(
            model = %cfg.model_path.display(),
            "no tokenizer.json or vocab.txt beside the model; falling back to hashed word ids"
        );
        TokenizerSource::Hashed
    };

    Ok(ModelAssets {
        model_path: cfg.model_path.clone(),
        tokenizer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn cfg_for(dir: &Path) -> SemanticConfig {
        SemanticConfig {
            model_path: dir.join("model.onnx"),
            tokenizer_path: None,
            vocab_path: None,
            ..Default::default()
        }
    }

    #[test]
    fn missing_weights_are_fatal() {
        let dir = tempdir().unwrap();
        let err = resolve_model_assets(&cfg_for(dir.path())).unwrap_err();
        assert!(matches!(err, SemanticError::ModelNotFound(ref p) if p.ends_with("model.onnx")));
    }

    #[test]
    fn prefers_tokenizer_json_over_vocab() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("model.onnx"), b"onnx").unwrap();
        fs::write(dir.path().join("vocab.txt"), "[PAD]\n").unwrap();
        fs::write(dir.path().join("tokenizer.json"), "{}").unwrap();

        let assets = resolve_model_assets(&cfg_for(dir.path())).unwrap();
        assert_eq!(
            assets.tokenizer,
            TokenizerSource::Json(dir.path().join("tokenizer.json"))
        );
    }

    #[test]
    fn falls_back_to_vocab_then_hashing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("model.onnx"), b"onnx").unwrap();
        let cfg = cfg_for(dir.path());
        assert_eq!(
            resolve_model_assets(&cfg).unwrap().tokenizer,
            TokenizerSource::Hashed
        );

        fs::write(dir.path().join("vocab.txt"), "[PAD]\n").unwrap();
        assert_eq!(
            resolve_model_assets(&cfg).unwrap().tokenizer,
            TokenizerSource::Vocab(dir.path().join("vocab.txt"))
        );
    }
}
