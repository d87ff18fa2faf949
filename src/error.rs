//! Error types for the review indexing pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors raised while resolving configuration and credentials.
///
/// These are always reported before any remote call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("missing credential: {name} is not set ({hint})")]
    MissingCredential { name: &'static str, hint: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to initialize {service} client: {message}")]
    ClientInit {
        service: &'static str,
        message: String,
    },
}

/// Errors raised while loading and validating the reviews document.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: top-level document must be a JSON object, found {found}", path.display())]
    NotAnObject { path: PathBuf, found: &'static str },

    #[error("{}: the 'reviews' key is missing", path.display())]
    MissingReviews { path: PathBuf },

    #[error("{}: the 'reviews' key is not a list (found {found}), check the JSON structure", path.display())]
    NotAList { path: PathBuf, found: &'static str },

    #[error("{}: review #{index} is invalid: {reason}", path.display())]
    InvalidRecord {
        path: PathBuf,
        index: usize,
        reason: String,
    },
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding service: {0}")]
    ConnectionError(String),

    #[error("embedding service returned status {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding credentials unavailable: {0}")]
    Credentials(String),

    #[error("embedding timeout")]
    Timeout,
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::ConnectionError(_) | EmbeddingError::Timeout => true,
            EmbeddingError::ServerError { status, .. } => is_transient_status(*status),
            EmbeddingError::RequestError(e) => e.is_timeout() || e.is_connect(),
            EmbeddingError::InvalidResponse(_)
            | EmbeddingError::DimensionMismatch { .. }
            | EmbeddingError::Credentials(_) => false,
        }
    }
}

/// Errors related to vector index operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("failed to connect to vector index service: {0}")]
    ConnectionError(String),

    #[error("index '{0}' already exists")]
    AlreadyExists(String),

    #[error("index '{0}' not found")]
    NotFound(String),

    #[error("vector index service returned status {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("vector index request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid vector index response: {0}")]
    InvalidResponse(String),

    #[error("Qdrant client error: {0}")]
    ClientError(String),

    #[error("vector index timeout")]
    Timeout,
}

impl Retryable for VectorStoreError {
    fn is_retryable(&self) -> bool {
        match self {
            VectorStoreError::ConnectionError(_) | VectorStoreError::Timeout => true,
            VectorStoreError::ServerError { status, .. } => is_transient_status(*status),
            VectorStoreError::RequestError(e) => e.is_timeout() || e.is_connect(),
            VectorStoreError::ClientError(msg) => {
                let msg_lower = msg.to_lowercase();
                msg_lower.contains("timeout")
                    || msg_lower.contains("connection")
                    || msg_lower.contains("unavailable")
                    || msg_lower.contains("too many")
            }
            VectorStoreError::AlreadyExists(_)
            | VectorStoreError::NotFound(_)
            | VectorStoreError::InvalidResponse(_) => false,
        }
    }
}

/// Errors raised while ensuring the index exists.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("failed to list indexes: {0}")]
    ListFailed(#[source] VectorStoreError),

    #[error("failed to create index '{name}': {source}")]
    CreateFailed {
        name: String,
        #[source]
        source: VectorStoreError,
    },
}

/// A batch upsert that failed after retries.
///
/// Batches before `batch` were committed and stay in the index.
#[derive(Debug, Error)]
#[error("upsert of batch {batch} ({size} records) failed after {committed} records were committed: {source}")]
pub struct UpsertError {
    pub batch: usize,
    pub size: usize,
    pub committed: u64,
    #[source]
    pub source: VectorStoreError,
}

/// Failure to fetch index statistics. Never fatal.
#[derive(Debug, Error)]
#[error("failed to fetch stats for index '{index}': {source}")]
pub struct ReportingError {
    pub index: String,
    #[source]
    pub source: VectorStoreError,
}

fn is_transient_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_retryable_by_status() {
        let busy = EmbeddingError::ServerError {
            status: 429,
            body: "RESOURCE_EXHAUSTED".to_string(),
        };
        let bad = EmbeddingError::ServerError {
            status: 400,
            body: "INVALID_ARGUMENT".to_string(),
        };
        assert!(busy.is_retryable());
        assert!(!bad.is_retryable());
    }

    #[test]
    fn test_conflict_is_not_retryable() {
        assert!(!VectorStoreError::AlreadyExists("rmp-rag".to_string()).is_retryable());
        assert!(
            VectorStoreError::ServerError {
                status: 503,
                body: String::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_validation_error_names_record() {
        let err = ValidationError::InvalidRecord {
            path: PathBuf::from("reviews.json"),
            index: 3,
            reason: "missing field `stars`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "reviews.json: review #3 is invalid: missing field `stars`"
        );
    }
}
