//! Vertex AI prediction embeddings.
//!
//! Calls either a Google publisher model or a model deployed to a custom
//! endpoint. Both take `instances: [{"content": ...}]`; publisher models answer
//! with `predictions[].embeddings.values` while deployed endpoints may answer
//! with the bare vector.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::debug;

use super::{Embedder, build_http_client, check_status, send_error};
use crate::error::{ConfigError, EmbeddingError};
use crate::models::EmbeddingConfig;

/// Instances accepted per predict call by the gecko models.
const MAX_BATCH: usize = 5;

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: Vec<Instance<'a>>,
}

#[derive(Debug, Serialize)]
struct Instance<'a> {
    content: &'a str,
    task_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Prediction {
    Publisher { embeddings: PublisherEmbedding },
    Raw(Vec<f32>),
}

#[derive(Debug, Deserialize)]
struct PublisherEmbedding {
    values: Vec<f32>,
}

impl Prediction {
    fn into_values(self) -> Vec<f32> {
        match self {
            Prediction::Publisher { embeddings } => embeddings.values,
            Prediction::Raw(values) => values,
        }
    }
}

/// Where the bearer token for Vertex calls comes from.
#[derive(Debug)]
pub enum TokenSource {
    Static(Secret<String>),
    /// Run `{program} auth print-access-token` once and reuse the result.
    Gcloud { program: String },
}

impl TokenSource {
    async fn fetch(&self) -> Result<Secret<String>, EmbeddingError> {
        match self {
            TokenSource::Static(token) => Ok(Secret::new(token.expose_secret().clone())),
            TokenSource::Gcloud { program } => {
                debug!(program = %program, "requesting access token from gcloud");
                let output = Command::new(program)
                    .args(["auth", "print-access-token"])
                    .output()
                    .await
                    .map_err(|e| {
                        EmbeddingError::Credentials(format!("failed to run {program}: {e}"))
                    })?;

                if !output.status.success() {
                    return Err(EmbeddingError::Credentials(format!(
                        "{program} auth print-access-token failed: {}",
                        String::from_utf8_lossy(&output.stderr).trim()
                    )));
                }

                let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if token.is_empty() {
                    return Err(EmbeddingError::Credentials(format!(
                        "{program} returned an empty access token"
                    )));
                }
                Ok(Secret::new(token))
            }
        }
    }
}

pub struct VertexEmbedder {
    client: Client,
    predict_url: String,
    model: String,
    tokens: TokenSource,
    token: OnceCell<Secret<String>>,
    batch_size: usize,
}

impl VertexEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, ConfigError> {
        let vertex = &config.vertex;
        let project = vertex.project()?;
        let location = &vertex.location;
        let model = config.model_or_default().to_string();

        let base = match &config.url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{location}-aiplatform.googleapis.com"),
        };
        let predict_url = match &vertex.endpoint_id {
            Some(endpoint) => format!(
                "{base}/v1/projects/{project}/locations/{location}/endpoints/{endpoint}:predict"
            ),
            None => format!(
                "{base}/v1/projects/{project}/locations/{location}/publishers/google/models/{model}:predict"
            ),
        };

        let tokens = match &vertex.access_token {
            Some(token) => TokenSource::Static(Secret::new(token.clone())),
            None => TokenSource::Gcloud {
                program: vertex.gcloud_program.clone(),
            },
        };

        Ok(Self {
            client: build_http_client(config.timeout_secs, "vertex")?,
            predict_url,
            model,
            tokens,
            token: OnceCell::new(),
            batch_size: (config.batch_size.max(1) as usize).min(MAX_BATCH),
        })
    }

    async fn access_token(&self) -> Result<&Secret<String>, EmbeddingError> {
        self.token.get_or_try_init(|| self.tokens.fetch()).await
    }

    async fn predict(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let token = self.access_token().await?;
        let body = PredictRequest {
            instances: texts
                .iter()
                .map(|content| Instance {
                    content,
                    task_type: "RETRIEVAL_DOCUMENT",
                })
                .collect(),
        };

        let response = self
            .client
            .post(&self.predict_url)
            .bearer_auth(token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(send_error)?;

        let parsed: PredictResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        if parsed.predictions.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "requested {} predictions, received {}",
                texts.len(),
                parsed.predictions.len()
            )));
        }
        Ok(parsed
            .predictions
            .into_iter()
            .map(Prediction::into_values)
            .collect())
    }

    pub fn predict_url(&self) -> &str {
        &self.predict_url
    }
}

#[async_trait]
impl Embedder for VertexEmbedder {
    fn name(&self) -> String {
        format!("vertex/{}", self.model)
    }

    fn max_batch_size(&self) -> usize {
        self.batch_size
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.predict(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty prediction response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.predict(texts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmbeddingBackend, VertexConfig};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(url: Option<String>, endpoint_id: Option<&str>) -> EmbeddingConfig {
        EmbeddingConfig {
            backend: EmbeddingBackend::Vertex,
            url,
            vertex: VertexConfig {
                project: Some("rate-my-professor".to_string()),
                endpoint_id: endpoint_id.map(String::from),
                access_token: Some("ya29.test".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_publisher_model_url() {
        let embedder = VertexEmbedder::new(&config(None, None)).unwrap();
        assert_eq!(
            embedder.predict_url(),
            "https://us-central1-aiplatform.googleapis.com/v1/projects/rate-my-professor/\
             locations/us-central1/publishers/google/models/textembedding-gecko@003:predict"
        );
    }

    #[test]
    fn test_endpoint_url() {
        let embedder = VertexEmbedder::new(&config(None, Some("123"))).unwrap();
        assert!(embedder.predict_url().ends_with("/endpoints/123:predict"));
    }

    #[tokio::test]
    async fn test_publisher_predictions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(
                "/v1/projects/rate-my-professor/locations/us-central1/publishers/google/models/textembedding-gecko@003:predict",
            ))
            .and(header("authorization", "Bearer ya29.test"))
            .and(body_partial_json(serde_json::json!({
                "instances": [{"content": "Great lectures"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "predictions": [{"embeddings": {"values": [0.5, 0.25],
                                 "statistics": {"token_count": 2, "truncated": false}}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let embedder = VertexEmbedder::new(&config(Some(server.uri()), None)).unwrap();
        let vector = embedder.embed("Great lectures").await.unwrap();
        assert_eq!(vector, vec![0.5, 0.25]);
    }

    #[tokio::test]
    async fn test_endpoint_raw_predictions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(
                "/v1/projects/rate-my-professor/locations/us-central1/endpoints/42:predict",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "predictions": [[1.0, 2.0], [3.0, 4.0]]
            })))
            .mount(&server)
            .await;

        let embedder = VertexEmbedder::new(&config(Some(server.uri()), Some("42"))).unwrap();
        let vectors = embedder
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[tokio::test]
    async fn test_missing_gcloud_is_credentials_error() {
        let source = TokenSource::Gcloud {
            program: "definitely-not-gcloud-on-this-machine".to_string(),
        };
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Credentials(_)));
    }
}
