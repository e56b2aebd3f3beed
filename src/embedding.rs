//! Embedding provider abstraction and the Ollama HTTP adapter.
//!
//! The [`Embedder`] trait is the seam between the pipeline and the external
//! text-embedding service: a batch of strings in, one fixed-dimension vector
//! per string out, order preserved. Collections hold a shared `Arc<dyn
//! Embedder>` so the store can embed at write and query time.
//!
//! [`OllamaEmbedder`] talks to an Ollama-compatible endpoint. The wire
//! protocol is one call per text (`{"model", "prompt"}` → `{"embedding":
//! [..]}`), so embedding N chunks costs N round trips even though the trait
//! is batch-shaped.
//!
//! # Retry Strategy
//!
//! Transient failures are retried with exponential backoff:
//! - HTTP 429 and 5xx → retry
//! - other 4xx → fail immediately with the raw response body
//! - network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! Also provides vector utilities shared with the store:
//! - [`vec_to_blob`] / [`blob_to_vec`] — little-endian f32 BLOB encoding
//! - [`cosine_similarity`] — similarity metric used for ranking

use std::time::Duration;

use async_trait::async_trait;

use crate::config::EmbeddingConfig;
use crate::error::ProviderError;

/// Capability interface over an external text-embedding provider.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier (e.g. `"nomic-embed-text"`). Collections are bound
    /// to one model for their whole lifetime.
    fn model_name(&self) -> &str;

    /// Embed a batch of texts, one vector per input, in input order.
    /// An empty input yields an empty output without any provider calls.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;
}

/// Embedding client for an Ollama-compatible HTTP endpoint.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    max_retries: u32,
}

impl OllamaEmbedder {
    /// Build a client from configuration. The per-call timeout comes from
    /// `embedding.timeout_secs`.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": text,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.url)
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_embedding(&json);
                    }

                    let body_text = response.text().await.unwrap_or_default();

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(ProviderError::Http {
                            status: status.as_u16(),
                            body: body_text,
                        });
                        continue;
                    }

                    return Err(ProviderError::Http {
                        status: status.as_u16(),
                        body: body_text,
                    });
                }
                Err(e) => {
                    last_err = Some(ProviderError::Request(e));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or(ProviderError::MalformedResponse))
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed_one(text).await?);
        }
        Ok(embeddings)
    }
}

/// Extract the `embedding` array from a provider response.
fn parse_embedding(json: &serde_json::Value) -> Result<Vec<f32>, ProviderError> {
    let values = json
        .get("embedding")
        .and_then(|e| e.as_array())
        .ok_or(ProviderError::MalformedResponse)?;

    Ok(values
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`; `0.0` for empty or mismatched
/// lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn test_config(url: String) -> EmbeddingConfig {
        EmbeddingConfig {
            url,
            model: "nomic-embed-text".to_string(),
            timeout_secs: 5,
            max_retries: 0,
        }
    }

    #[tokio::test]
    async fn embed_posts_model_and_prompt_per_text() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/embeddings")
                    .json_body(serde_json::json!({
                        "model": "nomic-embed-text",
                        "prompt": "hello",
                    }));
                then.status(200)
                    .json_body(serde_json::json!({"embedding": [0.1, 0.2, 0.3]}));
            })
            .await;

        let embedder =
            OllamaEmbedder::new(&test_config(server.url("/api/embeddings"))).unwrap();
        let out = embedder.embed(&["hello".to_string()]).await.unwrap();

        mock.assert_async().await;
        assert_eq!(out, vec![vec![0.1, 0.2, 0.3]]);
    }

    #[tokio::test]
    async fn embed_preserves_input_order() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).json_body_includes(r#"{"prompt": "first"}"#);
                then.status(200)
                    .json_body(serde_json::json!({"embedding": [1.0]}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).json_body_includes(r#"{"prompt": "second"}"#);
                then.status(200)
                    .json_body(serde_json::json!({"embedding": [2.0]}));
            })
            .await;

        let embedder = OllamaEmbedder::new(&test_config(server.url("/"))).unwrap();
        let out = embedder
            .embed(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        assert_eq!(out, vec![vec![1.0], vec![2.0]]);
    }

    #[tokio::test]
    async fn embed_empty_input_makes_no_calls() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200)
                    .json_body(serde_json::json!({"embedding": [1.0]}));
            })
            .await;

        let embedder = OllamaEmbedder::new(&test_config(server.url("/"))).unwrap();
        let out = embedder.embed(&[]).await.unwrap();

        assert!(out.is_empty());
        mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn provider_error_carries_raw_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(404).body("model not found");
            })
            .await;

        let embedder = OllamaEmbedder::new(&test_config(server.url("/"))).unwrap();
        let err = embedder.embed(&["x".to_string()]).await.unwrap_err();

        match err {
            ProviderError::Http { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "model not found");
            }
            other => panic!("expected Http error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_embedding_field_is_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(serde_json::json!({"ok": true}));
            })
            .await;

        let embedder = OllamaEmbedder::new(&test_config(server.url("/"))).unwrap();
        let err = embedder.embed(&["x".to_string()]).await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse));
    }

    #[test]
    fn vec_blob_roundtrip() {
        let vec = vec![0.5f32, -1.25, 3.0, 0.0];
        assert_eq!(blob_to_vec(&vec_to_blob(&vec)), vec);
    }

    #[test]
    fn cosine_basics() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[2.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }
}
