//! Google AI Studio (Gemini API) embeddings.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use super::{Embedder, build_http_client, check_status, send_error};
use crate::error::{ConfigError, EmbeddingError};
use crate::models::{DEFAULT_GEMINI_URL, EmbeddingConfig};

/// `batchEmbedContents` accepts at most this many requests.
const MAX_BATCH: usize = 100;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'static str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

pub struct GeminiEmbedder {
    client: Client,
    base_url: String,
    api_key: Secret<String>,
    /// Fully qualified model resource, `models/{id}`.
    model: String,
    batch_size: usize,
}

impl GeminiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, ConfigError> {
        let api_key = config.google_api_key()?;
        let model = config.model_or_default();
        let model = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        };

        Ok(Self {
            client: build_http_client(config.timeout_secs, "gemini")?,
            base_url: config
                .url
                .as_deref()
                .unwrap_or(DEFAULT_GEMINI_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model,
            batch_size: (config.batch_size.max(1) as usize).min(MAX_BATCH),
        })
    }

    fn request<'a>(&'a self, text: &'a str) -> EmbedContentRequest<'a> {
        EmbedContentRequest {
            model: &self.model,
            content: Content {
                parts: [Part { text }],
            },
            task_type: "RETRIEVAL_DOCUMENT",
        }
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<reqwest::Response, EmbeddingError> {
        let response = self
            .client
            .post(format!("{}/v1beta/{}:{method}", self.base_url, self.model))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(send_error)?;
        check_status(response).await
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn name(&self) -> String {
        format!("gemini/{}", self.model.trim_start_matches("models/"))
    }

    fn max_batch_size(&self) -> usize {
        self.batch_size
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let parsed: EmbedContentResponse = self
            .post("embedContent", &self.request(text))
            .await?
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;
        Ok(parsed.embedding.values)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = BatchEmbedRequest {
            requests: texts.iter().map(|t| self.request(t)).collect(),
        };
        let parsed: BatchEmbedResponse = self
            .post("batchEmbedContents", &body)
            .await?
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "requested {} embeddings, received {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }
        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn embedder_for(server: &MockServer) -> GeminiEmbedder {
        GeminiEmbedder::new(&EmbeddingConfig {
            url: Some(server.uri()),
            api_key: Some("test-key".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_model_is_qualified_once() {
        let embedder = GeminiEmbedder::new(&EmbeddingConfig {
            model: Some("models/embedding-001".to_string()),
            api_key: Some("k".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(embedder.model, "models/embedding-001");
        assert_eq!(embedder.name(), "gemini/embedding-001");
    }

    #[test]
    fn test_batch_size_capped() {
        let embedder = GeminiEmbedder::new(&EmbeddingConfig {
            batch_size: 500,
            api_key: Some("k".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(embedder.max_batch_size(), MAX_BATCH);
    }

    #[tokio::test]
    async fn test_embed_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/text-embedding-004:embedContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "models/text-embedding-004",
                "content": {"parts": [{"text": "Great lectures"}]},
                "taskType": "RETRIEVAL_DOCUMENT"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"embedding": {"values": [0.25, -0.5]}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let vector = embedder_for(&server).embed("Great lectures").await.unwrap();
        assert_eq!(vector, vec![0.25, -0.5]);
    }

    #[tokio::test]
    async fn test_batch_embed_preserves_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/text-embedding-004:batchEmbedContents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [{"values": [1.0]}, {"values": [2.0]}, {"values": [3.0]}]
            })))
            .mount(&server)
            .await;

        let texts: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let vectors = embedder_for(&server).embed_batch(&texts).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0], vec![2.0], vec![3.0]]);
    }

    #[tokio::test]
    async fn test_batch_count_mismatch_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"embeddings": [{"values": [1.0]}]})),
            )
            .mount(&server)
            .await;

        let texts = vec!["a".to_string(), "b".to_string()];
        let err = embedder_for(&server).embed_batch(&texts).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_rejected_key_is_not_retryable() {
        use crate::utils::Retryable;

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("API key not valid"))
            .mount(&server)
            .await;

        let err = embedder_for(&server).embed("a").await.unwrap_err();
        assert!(!err.is_retryable());
    }
}
