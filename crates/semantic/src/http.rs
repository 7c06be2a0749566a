use std::time::Duration;

use serde_json::{json, Value};

use crate::SemanticError;

/// Shared HTTP client for the remote and local-server providers. Timeouts are
/// applied per request so one pool can serve both.
pub fn build_http_client() -> Result<reqwest::Client, SemanticError> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(8)
        .build()
        .map_err(|e| SemanticError::InvalidConfig(format!("failed to build HTTP client: {e}")))
}

/// Parameters of one OpenAI-compatible `/embeddings` call.
pub(crate) struct EmbeddingCall<'a> {
    pub(crate) provider: &'a str,
    pub(crate) base_url: &'a str,
    pub(crate) api_key: Option<&'a str>,
    pub(crate) model: &'a str,
    pub(crate) dimensions: Option<usize>,
    pub(crate) timeout: Duration,
}

impl EmbeddingCall<'_> {
    fn url(&self) -> String {
        format!("{}/embeddings", self.base_url.trim_end_matches('/'))
    }

    fn payload(&self, text: &str) -> Value {
        let mut payload = json!({ "input": text, "model": self.model });
        if let Some(dimensions) = self.dimensions {
            payload["dimensions"] = json!(dimensions);
        }
        payload
    }

    /// Sends the request once. Any failure, including a timeout, is returned
    /// to the caller untouched.
    pub(crate) async fn send(
        &self,
        client: &reqwest::Client,
        text: &str,
    ) -> Result<Vec<f32>, SemanticError> {
        let mut request = client
            .post(self.url())
            .timeout(self.timeout)
            .json(&self.payload(text));
        if let Some(key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| SemanticError::Upstream {
            provider: self.provider.to_string(),
            status: e.status().map(|s| s.as_u16()),
            message: if e.is_timeout() {
                format!("timed out after {}s", self.timeout.as_secs())
            } else {
                e.to_string()
            },
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SemanticError::Upstream {
                provider: self.provider.to_string(),
                status: Some(status.as_u16()),
                message: body,
            });
        }

        let value = response
            .json::<Value>()
            .await
            .map_err(|e| SemanticError::Upstream {
                provider: self.provider.to_string(),
                status: Some(status.as_u16()),
                message: format!("invalid JSON response: {e}"),
            })?;
        first_embedding(value).map_err(|e| SemanticError::Upstream {
            provider: self.provider.to_string(),
            status: Some(status.as_u16()),
            message: format!("unusable response body: {e}"),
        })
    }
}

/// Pulls the first vector out of the response shapes seen in the wild:
/// `data[].embedding`, `embeddings`, `embedding`, or a bare (nested) array.
pub(crate) fn first_embedding(value: Value) -> Result<Vec<f32>, SemanticError> {
    parse_embeddings_from_value(value)?
        .into_iter()
        .next()
        .ok_or_else(|| SemanticError::Inference("response contained no embeddings".into()))
}

fn parse_embeddings_from_value(value: Value) -> Result<Vec<Vec<f32>>, SemanticError> {
    match value {
        Value::Object(mut map) => {
            if let Some(embeddings) = map.remove("embeddings") {
                return parse_embedding_collection(embeddings);
            }

            if let Some(embedding) = map.remove("embedding") {
                return parse_embedding_vector(embedding).map(|v| vec![v]);
            }

            if let Some(Value::Array(items)) = map.remove("data") {
                let mut vectors = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(mut obj) => match obj.remove("embedding") {
                            Some(embedding) => vectors.push(parse_embedding_vector(embedding)?),
                            None => {
                                return Err(SemanticError::Inference(
                                    "missing `embedding` field in data item".into(),
                                ))
                            }
                        },
                        _ => {
                            return Err(SemanticError::Inference(
                                "unexpected entry inside `data` array".into(),
                            ))
                        }
                    }
                }
                return Ok(vectors);
            }

            Err(SemanticError::Inference(
                "unsupported embedding response shape".into(),
            ))
        }
        other => parse_embedding_collection(other),
    }
}

fn parse_embedding_collection(value: Value) -> Result<Vec<Vec<f32>>, SemanticError> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                Ok(Vec::new())
            } else if items.iter().all(|item| matches!(item, Value::Array(_))) {
                items.into_iter().map(parse_embedding_vector).collect()
            } else {
                parse_embedding_vector(Value::Array(items)).map(|vec| vec![vec])
            }
        }
        other => parse_embedding_vector(other).map(|vec| vec![vec]),
    }
}

fn parse_embedding_vector(value: Value) -> Result<Vec<f32>, SemanticError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| match entry {
                Value::Number(num) => num
                    .as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| SemanticError::Inference("non-finite embedding value".into())),
                other => Err(SemanticError::Inference(format!(
                    "embedding entries must be numbers, got {other:?}"
                ))),
            })
            .collect(),
        other => Err(SemanticError::Inference(format!(
            "embedding vector must be an array, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_openai_shape() {
        let value = json!({ "data": [{ "embedding": [0.1, 0.2] }], "model": "m" });
        assert_eq!(first_embedding(value).unwrap(), vec![0.1, 0.2]);
    }

    #[test]
    fn parses_ollama_and_bare_shapes() {
        assert_eq!(
            first_embedding(json!({ "embedding": [1.0, 2.0] })).unwrap(),
            vec![1.0, 2.0]
        );
        assert_eq!(
            first_embedding(json!({ "embeddings": [[3.0], [4.0]] })).unwrap(),
            vec![3.0]
        );
        assert_eq!(first_embedding(json!([[5.0, 6.0]])).unwrap(), vec![5.0, 6.0]);
        assert_eq!(first_embedding(json!([7.0])).unwrap(), vec![7.0]);
    }

    #[test]
    fn rejects_unusable_responses() {
        assert!(first_embedding(json!({ "data": [] })).is_err());
        assert!(first_embedding(json!({ "data": [{ "vector": [1.0] }] })).is_err());
        assert!(first_embedding(json!({ "embedding": ["a"] })).is_err());
        assert!(first_embedding(json!({ "object": "list" })).is_err());
    }

    #[test]
    fn payload_includes_dimensions_only_when_set() {
        let call = EmbeddingCall {
            provider: "remote",
            base_url: "https://api.example.com/v1/",
            api_key: Some("k"),
            model: "text-embedding-3-large",
            dimensions: Some(1536),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(call.url(), "https://api.example.com/v1/embeddings");
        assert_eq!(call.payload("hi")["dimensions"], json!(1536));

        let call = EmbeddingCall {
            dimensions: None,
            ..call
        };
        assert!(call.payload("hi").get("dimensions").is_none());
    }
}
