//! Embedding backends.
//!
//! Every backend implements [`Embedder`], so the pipeline never knows which
//! service produced a vector. Backends are built from configuration by
//! [`create_embedder`].

mod gemini;
mod http;
mod vertex;

pub use gemini::GeminiEmbedder;
pub use http::HttpEmbedder;
pub use vertex::{TokenSource, VertexEmbedder};

use async_trait::async_trait;

use crate::error::{ConfigError, EmbeddingError};
use crate::models::{EmbeddingBackend, EmbeddingConfig};

/// Capability interface over an external embedding service.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Short label for logs and reports, e.g. `gemini/text-embedding-004`.
    fn name(&self) -> String;

    /// Largest number of texts a single `embed_batch` call may carry.
    fn max_batch_size(&self) -> usize {
        1
    }

    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed several texts; the result is in the same order as `texts`.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// Build the configured embedding backend.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>, ConfigError> {
    match config.backend {
        EmbeddingBackend::Gemini => Ok(Box::new(GeminiEmbedder::new(config)?)),
        EmbeddingBackend::Vertex => Ok(Box::new(VertexEmbedder::new(config)?)),
        EmbeddingBackend::Http => Ok(Box::new(HttpEmbedder::new(config)?)),
    }
}

pub(crate) fn build_http_client(
    timeout_secs: u64,
    service: &'static str,
) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ConfigError::ClientInit {
            service,
            message: e.to_string(),
        })
}

/// Map a send failure, keeping timeouts distinct.
pub(crate) fn send_error(e: reqwest::Error) -> EmbeddingError {
    if e.is_timeout() {
        EmbeddingError::Timeout
    } else if e.is_connect() {
        EmbeddingError::ConnectionError(e.to_string())
    } else {
        EmbeddingError::RequestError(e)
    }
}

/// Turn a non-success response into a `ServerError` carrying the body.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, EmbeddingError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(EmbeddingError::ServerError { status, body })
}
