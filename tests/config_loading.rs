use std::io::Write;

use kbsearch::{build_engine, ConfigLoadError, KbConfig, LogFormat};

#[test]
fn full_yaml_builds_an_engine() {
    let yaml = r#"
version: "1.0"
semantic:
  model_name: "bge-large-en-v1.5"
  model_path: "./models/bge-large-en-v1.5/model.onnx"
  local_dimension: 1024
  api_dimensions: [3072, 1536]
  local_server_dimension: 768
collections:
  root: "./data"
  specs:
    - { dimension: 1024, suffix: "_1024" }
    - { dimension: 3072, suffix: "_3072" }
    - { dimension: 768, suffix: "_768" }
search:
  top_k: 5
  max_top_k: 25
  min_similarity: 0.15
generation:
  api_model: "gpt-4o-mini"
  timeout_secs: 45
logging:
  level: "kbsearch=debug,info"
  format: pretty
"#;

    let config = KbConfig::from_yaml(yaml).unwrap();
    assert_eq!(config.semantic.local_server_dimension, Some(768));
    assert_eq!(config.collections.specs.len(), 3);
    assert!((config.search.min_similarity - 0.15).abs() < f32::EPSILON);
    assert_eq!(config.generation.timeout_secs, 45);
    assert_eq!(config.logging.format, LogFormat::Pretty);

    let engine = build_engine(&config).unwrap();
    assert_eq!(engine.settings().max_top_k, 25);
    assert!(engine.health().loaded.is_empty());
}

#[test]
fn invalid_generation_settings_are_rejected() {
    let err = KbConfig::from_yaml("generation:\n  max_tokens: 0\n").unwrap_err();
    assert!(matches!(err, ConfigLoadError::Validation(_)));
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"search: [unterminated").unwrap();
    let err = KbConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigLoadError::YamlParse(_)));
}
