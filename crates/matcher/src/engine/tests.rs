use super::*;
use std::net::SocketAddr;
use std::path::Path;

use axum::extract::Json;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use index::{CollectionSpec, DocumentKind};
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};

use crate::demo_utils::{
    write_collection, write_keyword_collection, KeywordEmbedder, KEYWORD_DIMENSION,
};
use crate::resolver::ResolutionWarning;

const KW_SUFFIX: &str = "_kw";
const REMOTE_DIM: usize = 8;

fn layout(root: &Path) -> CollectionLayout {
    CollectionLayout::new(root).with_specs(vec![
        CollectionSpec::new(KEYWORD_DIMENSION, KW_SUFFIX),
        CollectionSpec::new(REMOTE_DIM, "_remote"),
    ])
}

fn semantic_cfg(mock: Option<SocketAddr>) -> SemanticConfig {
    let base = mock.map_or_else(|| "http://127.0.0.1:9/v1".to_string(), |a| format!("http://{a}/v1"));
    SemanticConfig {
        model_path: "./no/such/model.onnx".into(),
        api_url: base.clone(),
        api_dimensions: vec![REMOTE_DIM],
        api_timeout_secs: 2,
        local_server_url: base,
        local_server_timeout_secs: 2,
        ..Default::default()
    }
}

fn generation_cfg(mock: Option<SocketAddr>) -> GenerationConfig {
    let base = mock.map_or_else(|| "http://127.0.0.1:9/v1".to_string(), |a| format!("http://{a}/v1"));
    GenerationConfig {
        api_url: base.clone(),
        local_server_url: base,
        timeout_secs: 2,
        ..Default::default()
    }
}

fn engine(root: &Path, mock: Option<SocketAddr>) -> SearchEngine {
    SearchEngine::new(
        SearchSettings::default(),
        semantic_cfg(mock),
        generation_cfg(mock),
        layout(root),
    )
    .unwrap()
    .with_local_embedder(Arc::new(KeywordEmbedder::default()))
}

fn keyword_corpus() -> TempDir {
    let dir = tempdir().unwrap();
    write_keyword_collection(
        dir.path(),
        KW_SUFFIX,
        DocumentKind::Insight,
        &[
            ("budget-1", "The grant covers equipment costs and funding gaps."),
            ("train-1", "Mentoring and hands-on coaching are the best training methods."),
            ("solar-1", "Install the inverter before mounting roof panels."),
        ],
    )
    .unwrap();
    write_keyword_collection(
        dir.path(),
        KW_SUFFIX,
        DocumentKind::Curriculum,
        &[("safety-1", "Harness check before any ladder or roof work, safety first.")],
    )
    .unwrap();
    dir
}

async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

#[tokio::test]
async fn related_document_ranks_first() {
    let dir = keyword_corpus();
    let engine = engine(dir.path(), None);

    let response = engine
        .search(&SearchRequest::new("training methods"))
        .await
        .unwrap();

    assert_eq!(response.method_used, EmbeddingMethod::Local);
    assert_eq!(response.dimension, KEYWORD_DIMENSION);
    assert_eq!(response.status, SearchStatus::Matched);
    assert_eq!(response.results[0].id, "train-1");
    assert!(response.results[0].similarity > 0.9);
    // Unrelated documents sit at zero and are filtered by the floor.
    assert_eq!(response.results.len(), 1);
    assert!(response.warnings.is_empty());
    assert!(response.answer.is_none());
}

#[tokio::test]
async fn unmatched_query_is_not_an_error() {
    let dir = keyword_corpus();
    let engine = engine(dir.path(), None);

    let response = engine
        .search(&SearchRequest::new("quarterly weather outlook"))
        .await
        .unwrap();
    assert!(response.results.is_empty());
    assert_eq!(response.status, SearchStatus::NoConfidentMatch);
}

#[tokio::test]
async fn kind_filter_restricts_results() {
    let dir = keyword_corpus();
    let engine = engine(dir.path(), None);

    let request = SearchRequest::new("roof safety harness").with_kind(DocumentKind::Insight);
    let response = engine.search(&request).await.unwrap();
    assert!(response
        .results
        .iter()
        .all(|r| r.kind == DocumentKind::Insight));
    assert_eq!(response.results[0].id, "solar-1");

    let request = SearchRequest::new("roof safety harness");
    let response = engine.search(&request).await.unwrap();
    assert_eq!(response.results[0].id, "safety-1");
}

#[tokio::test]
async fn unused_credential_still_returns_results() {
    let dir = keyword_corpus();
    let engine = engine(dir.path(), None);

    let request = SearchRequest::new("training methods").with_api_key("sk-test");
    let response = engine.search(&request).await.unwrap();
    assert_eq!(response.method_used, EmbeddingMethod::Local);
    assert_eq!(
        response.warnings,
        vec![ResolutionWarning::CredentialUnused {
            dimension: KEYWORD_DIMENSION
        }]
    );
    assert!(!response.results.is_empty());
}

#[tokio::test]
async fn empty_data_directory_is_a_config_error() {
    let dir = tempdir().unwrap();
    let engine = engine(dir.path(), None);

    let err = engine
        .search(&SearchRequest::new("training methods"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MatchError::Config(ConfigError::NoEmbeddings { .. })
    ));
    assert!(err.remediation().is_some());
}

#[tokio::test]
async fn invalid_query_is_rejected_before_any_work() {
    let dir = keyword_corpus();
    let embedder = Arc::new(KeywordEmbedder::default());
    let engine = SearchEngine::new(
        SearchSettings::default(),
        semantic_cfg(None),
        generation_cfg(None),
        layout(dir.path()),
    )
    .unwrap()
    .with_local_embedder(embedder.clone());

    let err = engine.search(&SearchRequest::new(" x ")).await.unwrap_err();
    assert!(matches!(err, MatchError::InvalidRequest(_)));
    assert_eq!(embedder.calls(), 0);
    assert!(engine.registry().loaded().is_empty());
}

#[tokio::test]
async fn missing_weights_without_injection_is_reported() {
    let dir = keyword_corpus();
    let cfg = SemanticConfig {
        local_dimension: KEYWORD_DIMENSION,
        ..semantic_cfg(None)
    };
    let engine = SearchEngine::new(
        SearchSettings::default(),
        cfg,
        generation_cfg(None),
        layout(dir.path()),
    )
    .unwrap();

    let err = engine
        .search(&SearchRequest::new("training methods"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MatchError::Config(ConfigError::ModelWeightsMissing { .. })
    ));
}

#[tokio::test]
async fn top_k_is_capped_by_settings() {
    let dir = tempdir().unwrap();
    let docs: Vec<(String, String)> = (0..10)
        .map(|i| (format!("t-{i}"), format!("training session {i}")))
        .collect();
    let refs: Vec<(&str, &str)> = docs.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
    write_keyword_collection(dir.path(), KW_SUFFIX, DocumentKind::Insight, &refs).unwrap();

    let settings = SearchSettings {
        top_k: 2,
        max_top_k: 3,
        ..Default::default()
    };
    let engine = SearchEngine::new(
        settings,
        semantic_cfg(None),
        generation_cfg(None),
        layout(dir.path()),
    )
    .unwrap()
    .with_local_embedder(Arc::new(KeywordEmbedder::default()));

    let response = engine.search(&SearchRequest::new("training")).await.unwrap();
    assert_eq!(response.results.len(), 2);
    let response = engine
        .search(&SearchRequest::new("training").with_top_k(9))
        .await
        .unwrap();
    assert_eq!(response.results.len(), 3);
    // Equal scores keep file order.
    let ids: Vec<_> = response.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["t-0", "t-1", "t-2"]);
}

#[tokio::test]
async fn credential_with_remote_collection_goes_remote() {
    let router = Router::new().route(
        "/v1/embeddings",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["dimensions"], json!(REMOTE_DIM));
            let mut v = vec![0.0f32; REMOTE_DIM];
            v[1] = 1.0;
            Json(json!({ "data": [{ "embedding": v }] }))
        }),
    );
    let addr = spawn(router).await;

    let dir = keyword_corpus();
    let mut near = vec![0.0f32; REMOTE_DIM];
    near[1] = 0.9;
    near[2] = 0.1;
    let mut far = vec![0.0f32; REMOTE_DIM];
    far[5] = 1.0;
    write_collection(
        dir.path(),
        "_remote",
        DocumentKind::Insight,
        &[("far", "unrelated", far), ("near", "related", near)],
    )
    .unwrap();

    let engine = engine(dir.path(), Some(addr));
    let response = engine
        .search(&SearchRequest::new("training methods").with_api_key("sk-test"))
        .await
        .unwrap();
    assert_eq!(response.method_used, EmbeddingMethod::Remote);
    assert_eq!(response.dimension, REMOTE_DIM);
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].id, "near");
    assert_eq!(response.results[0].method, EmbeddingMethod::Remote);
}

#[tokio::test]
async fn remote_failure_propagates_with_status() {
    let router = Router::new().route(
        "/v1/embeddings",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
    );
    let addr = spawn(router).await;

    let dir = tempdir().unwrap();
    write_collection(
        dir.path(),
        "_remote",
        DocumentKind::Insight,
        &[("a", "a", vec![1.0; REMOTE_DIM])],
    )
    .unwrap();

    let engine = engine(dir.path(), Some(addr));
    let err = engine
        .search(&SearchRequest::new("anything").with_api_key("sk-test"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MatchError::Semantic(SemanticError::Upstream {
            status: Some(429),
            ..
        })
    ));
}

#[tokio::test]
async fn remote_only_without_key_asks_for_one() {
    let dir = tempdir().unwrap();
    write_collection(
        dir.path(),
        "_remote",
        DocumentKind::Insight,
        &[("a", "a", vec![1.0; REMOTE_DIM])],
    )
    .unwrap();
    let engine = engine(dir.path(), None);
    let err = engine
        .search(&SearchRequest::new("anything"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MatchError::Config(ConfigError::MissingCredential { .. })
    ));
}

#[tokio::test]
async fn answer_uses_local_server_when_opted_in() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|Json(body): Json<Value>| async move {
            let prompt = body["messages"][1]["content"].as_str().unwrap_or_default();
            assert!(prompt.contains("[1] Interview insight"));
            assert!(prompt.contains("Question: training methods"));
            Json(json!({
                "choices": [{ "message": { "role": "assistant", "content": " Pair trainees with mentors [1]. " } }]
            }))
        }),
    );
    let addr = spawn(router).await;

    let dir = keyword_corpus();
    let engine = engine(dir.path(), Some(addr));
    let request = SearchRequest::new("training methods")
        .with_answer(true)
        .with_local_server(true);
    let response = engine.search(&request).await.unwrap();
    assert_eq!(
        response.answer.as_deref(),
        Some("Pair trainees with mentors [1].")
    );
    // Retrieval still used the local collection.
    assert_eq!(response.method_used, EmbeddingMethod::Local);
}

#[tokio::test]
async fn answer_failure_keeps_results() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model crashed") }),
    );
    let addr = spawn(router).await;

    let dir = keyword_corpus();
    let engine = engine(dir.path(), Some(addr));
    let request = SearchRequest::new("training methods")
        .with_answer(true)
        .with_local_server(true);
    let response = engine.search(&request).await.unwrap();
    assert_eq!(response.results[0].id, "train-1");
    let answer = response.answer.unwrap();
    assert!(answer.contains("could not be generated"));
    assert!(answer.contains("model crashed"));
}

#[tokio::test]
async fn answer_without_generator_explains_itself() {
    let dir = keyword_corpus();
    let engine = engine(dir.path(), None);
    let response = engine
        .search(&SearchRequest::new("training methods").with_answer(true))
        .await
        .unwrap();
    assert_eq!(
        response.answer.as_deref(),
        Some(crate::answer::NO_GENERATOR_MESSAGE)
    );
}

#[tokio::test]
async fn concurrent_searches_load_once() {
    let dir = keyword_corpus();
    let engine = Arc::new(engine(dir.path(), None));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .search(&SearchRequest::new("solar roof"))
                    .await
                    .map(|r| r.results.len())
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().unwrap() > 0);
    }

    let health = engine.health();
    assert_eq!(health.loaded.get(&KEYWORD_DIMENSION), Some(&4));
    assert!(health.local_model);
    assert_eq!(health.available_dimensions, vec![KEYWORD_DIMENSION]);
}

#[tokio::test]
async fn embed_operation_uses_the_named_provider() {
    let dir = keyword_corpus();
    let engine = engine(dir.path(), None);

    let embedding = engine
        .embed("solar panels", EmbeddingMethod::Local, None)
        .await
        .unwrap();
    assert_eq!(embedding.embedding_dim, KEYWORD_DIMENSION);
    assert_eq!(embedding.model_name, "keyword");

    let err = engine
        .embed("solar panels", EmbeddingMethod::Remote, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MatchError::Config(ConfigError::MissingCredential { .. })
    ));

    let err = engine
        .embed("solar panels", EmbeddingMethod::LocalServer, None)
        .await
        .unwrap_err();
    assert!(matches!(err, MatchError::InvalidConfig(_)));
}
