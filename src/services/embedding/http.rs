//! Client for a self-hosted text-embeddings-inference style server.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Embedder, build_http_client, check_status, send_error};
use crate::error::{ConfigError, EmbeddingError};
use crate::models::{DEFAULT_HTTP_EMBEDDING_URL, EmbeddingConfig};

/// Request body for the /embed endpoint.
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [String],
    truncate: bool,
}

/// Response from the /embed endpoint.
#[derive(Debug, Deserialize)]
struct EmbedResponse(Vec<Vec<f32>>);

#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: Client,
    base_url: String,
    batch_size: usize,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, ConfigError> {
        let base_url = config
            .url
            .as_deref()
            .unwrap_or(DEFAULT_HTTP_EMBEDDING_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: build_http_client(config.timeout_secs, "embedding")?,
            base_url,
            batch_size: config.batch_size.max(1) as usize,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn name(&self) -> String {
        format!("http/{}", self.base_url)
    }

    fn max_batch_size(&self) -> usize {
        self.batch_size
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(format!("{}/embed", self.base_url))
            .json(&EmbedRequest {
                inputs: texts,
                truncate: true,
            })
            .send()
            .await
            .map_err(send_error)?;

        let EmbedResponse(vectors) = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn embedder_for(server: &MockServer) -> HttpEmbedder {
        HttpEmbedder::new(&EmbeddingConfig {
            url: Some(format!("{}/", server.uri())),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_base_url_trimming() {
        let embedder = HttpEmbedder::new(&EmbeddingConfig {
            url: Some("http://localhost:8080/".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(embedder.base_url(), "http://localhost:8080");
    }

    #[tokio::test]
    async fn test_embed_batch_posts_inputs() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .and(body_json(serde_json::json!({
                "inputs": ["Great lectures", "Hard exams"],
                "truncate": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec![vec![0.1f32], vec![0.2]]))
            .expect(1)
            .mount(&server)
            .await;

        let vectors = embedder_for(&server)
            .embed_batch(&["Great lectures".to_string(), "Hard exams".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![0.1], vec![0.2]]);
    }

    #[tokio::test]
    async fn test_server_error_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("loading model"))
            .mount(&server)
            .await;

        let err = embedder_for(&server).embed("text").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::ServerError { status: 503, .. }));
    }
}
