use std::path::{Path, PathBuf};

use secrecy::Secret;
use serde::{Deserialize, Serialize};

use super::index::{CloudSpec, IndexDescriptor, Metric, validate_index_name};
use crate::error::ConfigError;

pub const DEFAULT_INDEX_NAME: &str = "rmp-rag";
pub const DEFAULT_DIMENSION: u32 = 768;
pub const DEFAULT_NAMESPACE: &str = "ns1";
pub const DEFAULT_REVIEWS_FILE: &str = "reviews.json";
pub const DEFAULT_PINECONE_CONTROL_URL: &str = "https://api.pinecone.io";
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_HTTP_EMBEDDING_URL: &str = "http://localhost:8080";
pub const DEFAULT_GEMINI_MODEL: &str = "text-embedding-004";
pub const DEFAULT_VERTEX_MODEL: &str = "textembedding-gecko@003";

const REDACTED: &str = "********";

/// Which embedding service computes review vectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Google AI Studio (Gemini API key)
    #[default]
    Gemini,
    /// Vertex AI prediction endpoint (project + access token)
    Vertex,
    /// Self-hosted text-embeddings-inference compatible server
    Http,
}

impl std::str::FromStr for EmbeddingBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "vertex" | "vertexai" => Ok(Self::Vertex),
            "http" | "tei" => Ok(Self::Http),
            _ => Err(format!("unknown embedding backend: {s}")),
        }
    }
}

impl std::fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::Vertex => write!(f, "vertex"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Which vector index service stores the records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Pinecone,
    Qdrant,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pinecone" => Ok(Self::Pinecone),
            "qdrant" => Ok(Self::Qdrant),
            _ => Err(format!("unknown index backend: {s}")),
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pinecone => write!(f, "pinecone"),
            Self::Qdrant => write!(f, "qdrant"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("rmp-rag").join("config.toml"))
    }

    /// Load the config file if present, then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Apply environment overrides. `lookup` is injected so tests need not touch the process env.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("RMP_RAG_EMBEDDING_BACKEND").and_then(|v| v.parse().ok()) {
            self.embedding.backend = v;
        }
        if let Some(v) = get("RMP_RAG_INDEX_BACKEND").and_then(|v| v.parse().ok()) {
            self.index.backend = v;
        }
        if let Some(v) = get("GOOGLE_API_KEY") {
            self.embedding.api_key = Some(v);
        }
        if let Some(v) = get("GOOGLE_ACCESS_TOKEN") {
            self.embedding.vertex.access_token = Some(v);
        }
        if let Some(v) = get("GOOGLE_CLOUD_PROJECT") {
            self.embedding.vertex.project = Some(v);
        }
        if let Some(v) = get("GOOGLE_CLOUD_LOCATION") {
            self.embedding.vertex.location = v;
        }
        if let Some(v) = get("PINECONE_API_KEY") {
            self.index.pinecone_api_key = Some(v);
        }
        if let Some(v) = get("QDRANT_URL") {
            self.index.qdrant_url = v;
        }
        if let Some(v) = get("QDRANT_API_KEY") {
            self.index.qdrant_api_key = Some(v);
        }
    }

    /// Check values that can be verified without any remote call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_index_name(&self.index.name)?;
        if self.index.dimension == 0 {
            return Err(ConfigError::InvalidValue {
                field: "index.dimension",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.index.namespace.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "index.namespace",
                reason: "must not be empty".to_string(),
            });
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "embedding.batch_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.index.upsert_batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "index.upsert_batch_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Copy of the config with every credential masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mask = |v: &Option<String>| v.as_ref().map(|_| REDACTED.to_string());
        let mut config = self.clone();
        config.embedding.api_key = mask(&self.embedding.api_key);
        config.embedding.vertex.access_token = mask(&self.embedding.vertex.access_token);
        config.index.pinecone_api_key = mask(&self.index.pinecone_api_key);
        config.index.qdrant_api_key = mask(&self.index.qdrant_api_key);
        config
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackend,

    /// Model id; each backend has its own default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Base URL override (required for the http backend).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: u32,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default)]
    pub vertex: VertexConfig,
}

fn default_embedding_batch_size() -> u32 {
    32
}

fn default_embedding_timeout() -> u64 {
    60
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            model: None,
            url: None,
            batch_size: default_embedding_batch_size(),
            timeout_secs: default_embedding_timeout(),
            api_key: None,
            vertex: VertexConfig::default(),
        }
    }
}

impl EmbeddingConfig {
    pub fn model_or_default(&self) -> &str {
        match (&self.model, self.backend) {
            (Some(model), _) => model,
            (None, EmbeddingBackend::Vertex) => DEFAULT_VERTEX_MODEL,
            (None, _) => DEFAULT_GEMINI_MODEL,
        }
    }

    pub fn google_api_key(&self) -> Result<Secret<String>, ConfigError> {
        self.api_key
            .clone()
            .map(Secret::new)
            .ok_or(ConfigError::MissingCredential {
                name: "GOOGLE_API_KEY",
                hint: "required by the gemini embedding backend",
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    #[serde(default = "default_vertex_location")]
    pub location: String,

    /// Deployed endpoint id; when unset the publisher model is called directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// CLI used to mint an access token when none is configured.
    #[serde(default = "default_gcloud_program")]
    pub gcloud_program: String,
}

fn default_vertex_location() -> String {
    "us-central1".to_string()
}

fn default_gcloud_program() -> String {
    "gcloud".to_string()
}

impl Default for VertexConfig {
    fn default() -> Self {
        Self {
            project: None,
            location: default_vertex_location(),
            endpoint_id: None,
            access_token: None,
            gcloud_program: default_gcloud_program(),
        }
    }
}

impl VertexConfig {
    pub fn project(&self) -> Result<&str, ConfigError> {
        self.project
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingCredential {
                name: "GOOGLE_CLOUD_PROJECT",
                hint: "required by the vertex embedding backend",
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    #[serde(default = "default_index_name")]
    pub name: String,

    #[serde(default = "default_dimension")]
    pub dimension: u32,

    #[serde(default)]
    pub metric: Metric,

    #[serde(default = "default_cloud")]
    pub cloud: String,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: u32,

    #[serde(default = "default_index_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_ready_poll_attempts")]
    pub ready_poll_attempts: u32,

    #[serde(default = "default_ready_poll_interval_ms")]
    pub ready_poll_interval_ms: u64,

    #[serde(default = "default_control_plane_url")]
    pub control_plane_url: String,

    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinecone_api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qdrant_api_key: Option<String>,
}

fn default_index_name() -> String {
    DEFAULT_INDEX_NAME.to_string()
}

fn default_dimension() -> u32 {
    DEFAULT_DIMENSION
}

fn default_cloud() -> String {
    "aws".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_upsert_batch_size() -> u32 {
    100
}

fn default_index_timeout() -> u64 {
    30
}

fn default_ready_poll_attempts() -> u32 {
    30
}

fn default_ready_poll_interval_ms() -> u64 {
    1000
}

fn default_control_plane_url() -> String {
    DEFAULT_PINECONE_CONTROL_URL.to_string()
}

fn default_qdrant_url() -> String {
    DEFAULT_QDRANT_URL.to_string()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            name: default_index_name(),
            dimension: default_dimension(),
            metric: Metric::default(),
            cloud: default_cloud(),
            region: default_region(),
            namespace: default_namespace(),
            upsert_batch_size: default_upsert_batch_size(),
            timeout_secs: default_index_timeout(),
            ready_poll_attempts: default_ready_poll_attempts(),
            ready_poll_interval_ms: default_ready_poll_interval_ms(),
            control_plane_url: default_control_plane_url(),
            qdrant_url: default_qdrant_url(),
            pinecone_api_key: None,
            qdrant_api_key: None,
        }
    }
}

impl IndexConfig {
    pub fn descriptor(&self) -> IndexDescriptor {
        IndexDescriptor {
            name: self.name.clone(),
            dimension: self.dimension,
            metric: self.metric,
            spec: CloudSpec {
                cloud: self.cloud.clone(),
                region: self.region.clone(),
            },
        }
    }

    pub fn pinecone_api_key(&self) -> Result<Secret<String>, ConfigError> {
        self.pinecone_api_key
            .clone()
            .map(Secret::new)
            .ok_or(ConfigError::MissingCredential {
                name: "PINECONE_API_KEY",
                hint: "required by the pinecone index backend",
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_reviews_file")]
    pub reviews_file: PathBuf,

    /// Treat a document without a `reviews` key as an empty list.
    #[serde(default)]
    pub allow_missing_reviews: bool,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_reviews_file() -> PathBuf {
    PathBuf::from(DEFAULT_REVIEWS_FILE)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    200
}

fn default_max_backoff_ms() -> u64 {
    5000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reviews_file: default_reviews_file(),
            allow_missing_reviews: false,
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.index.name, DEFAULT_INDEX_NAME);
        assert_eq!(config.index.dimension, 768);
        assert_eq!(config.index.metric, Metric::Cosine);
        assert_eq!(config.index.namespace, "ns1");
        assert_eq!(config.pipeline.reviews_file, PathBuf::from("reviews.json"));
        assert!(!config.pipeline.allow_missing_reviews);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [index]
            name = "reviews-dev"
            backend = "qdrant"

            [embedding]
            backend = "vertex"
            "#,
        )
        .unwrap();
        assert_eq!(config.index.name, "reviews-dev");
        assert_eq!(config.index.backend, StoreBackend::Qdrant);
        assert_eq!(config.index.region, "us-east-1");
        assert_eq!(config.embedding.model_or_default(), DEFAULT_VERTEX_MODEL);
        assert_eq!(config.embedding.vertex.location, "us-central1");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(env(&[
            ("PINECONE_API_KEY", "pk-test"),
            ("GOOGLE_API_KEY", "gk-test"),
            ("GOOGLE_CLOUD_PROJECT", "rate-my-professor"),
            ("RMP_RAG_INDEX_BACKEND", "qdrant"),
            ("QDRANT_URL", ""),
        ]));
        assert_eq!(config.index.pinecone_api_key.as_deref(), Some("pk-test"));
        assert_eq!(config.embedding.api_key.as_deref(), Some("gk-test"));
        assert_eq!(config.embedding.vertex.project().unwrap(), "rate-my-professor");
        assert_eq!(config.index.backend, StoreBackend::Qdrant);
        assert_eq!(config.index.qdrant_url, DEFAULT_QDRANT_URL);
    }

    #[test]
    fn test_missing_credentials_are_config_errors() {
        let config = Config::default();
        assert!(matches!(
            config.index.pinecone_api_key(),
            Err(ConfigError::MissingCredential {
                name: "PINECONE_API_KEY",
                ..
            })
        ));
        assert!(config.embedding.google_api_key().is_err());
        assert!(config.embedding.vertex.project().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_index_name() {
        let mut config = Config::default();
        config.index.name = "RMP_RAG".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "index.name",
                ..
            })
        ));
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let mut config = Config::default();
        config.index.pinecone_api_key = Some("pk-secret".to_string());
        let shown = toml::to_string(&config.redacted()).unwrap();
        assert!(!shown.contains("pk-secret"));
        assert!(shown.contains(REDACTED));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.index.namespace = "professors".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.index.namespace, "professors");
    }
}
