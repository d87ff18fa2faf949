//! Pinecone backend over the REST control and data planes.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::VectorStore;
use crate::error::{ConfigError, VectorStoreError};
use crate::models::{
    CloudSpec, IndexConfig, IndexDescriptor, IndexListing, IndexRecord, IndexStats, Metric,
};

const API_VERSION: &str = "2024-07";

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: u32,
    metric: Metric,
    spec: IndexSpec<'a>,
}

#[derive(Debug, Serialize)]
struct IndexSpec<'a> {
    serverless: &'a CloudSpec,
}

#[derive(Debug, Deserialize)]
struct DescribeIndexResponse {
    host: String,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [IndexRecord],
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: u64,
}

pub struct PineconeStore {
    client: Client,
    control_plane_url: String,
    api_key: Secret<String>,
    /// Data plane host per index, resolved on first use.
    hosts: Mutex<HashMap<String, String>>,
}

impl PineconeStore {
    pub fn new(config: &IndexConfig) -> Result<Self, ConfigError> {
        let api_key = config.pinecone_api_key()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::ClientInit {
                service: "pinecone",
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            control_plane_url: config.control_plane_url.trim_end_matches('/').to_string(),
            api_key,
            hosts: Mutex::new(HashMap::new()),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Api-Key", self.api_key.expose_secret())
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, VectorStoreError> {
        self.authorized(request).send().await.map_err(|e| {
            if e.is_timeout() {
                VectorStoreError::Timeout
            } else if e.is_connect() {
                VectorStoreError::ConnectionError(e.to_string())
            } else {
                VectorStoreError::RequestError(e)
            }
        })
    }

    async fn describe_index(&self, index: &str) -> Result<DescribeIndexResponse, VectorStoreError> {
        let url = format!("{}/indexes/{index}", self.control_plane_url);
        let response = self.send(self.client.get(url)).await?;
        let described: DescribeIndexResponse = check_status(response, index)
            .await?
            .json()
            .await
            .map_err(|e| VectorStoreError::InvalidResponse(e.to_string()))?;

        if let Ok(mut hosts) = self.hosts.lock() {
            hosts.insert(index.to_string(), described.host.clone());
        }
        Ok(described)
    }

    /// Base URL of the index's data plane.
    async fn data_plane(&self, index: &str) -> Result<String, VectorStoreError> {
        let cached = self
            .hosts
            .lock()
            .ok()
            .and_then(|hosts| hosts.get(index).cloned());
        let host = match cached {
            Some(host) => host,
            None => {
                let host = self.describe_index(index).await?.host;
                debug!(index, host = %host, "resolved index host");
                host
            }
        };

        let host = host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            Ok(host.to_string())
        } else {
            Ok(format!("https://{host}"))
        }
    }
}

async fn check_status(response: Response, index: &str) -> Result<Response, VectorStoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::CONFLICT => Err(VectorStoreError::AlreadyExists(index.to_string())),
        StatusCode::NOT_FOUND => Err(VectorStoreError::NotFound(index.to_string())),
        _ => Err(VectorStoreError::ServerError {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        }),
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    fn name(&self) -> &'static str {
        "pinecone"
    }

    async fn list_indexes(&self) -> Result<IndexListing, VectorStoreError> {
        let url = format!("{}/indexes", self.control_plane_url);
        let response = self.send(self.client.get(url)).await?;
        check_status(response, "")
            .await?
            .json()
            .await
            .map_err(|e| VectorStoreError::InvalidResponse(e.to_string()))
    }

    async fn create_index(&self, descriptor: &IndexDescriptor) -> Result<(), VectorStoreError> {
        let url = format!("{}/indexes", self.control_plane_url);
        let body = CreateIndexRequest {
            name: &descriptor.name,
            dimension: descriptor.dimension,
            metric: descriptor.metric,
            spec: IndexSpec {
                serverless: &descriptor.spec,
            },
        };
        let response = self.send(self.client.post(url).json(&body)).await?;
        check_status(response, &descriptor.name).await?;
        Ok(())
    }

    async fn index_ready(&self, index: &str) -> Result<bool, VectorStoreError> {
        Ok(self.describe_index(index).await?.status.ready)
    }

    async fn upsert(
        &self,
        index: &str,
        namespace: &str,
        records: &[IndexRecord],
    ) -> Result<u64, VectorStoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let url = format!("{}/vectors/upsert", self.data_plane(index).await?);
        let body = UpsertRequest {
            vectors: records,
            namespace,
        };
        let response = self.send(self.client.post(url).json(&body)).await?;
        let parsed: UpsertResponse = check_status(response, index)
            .await?
            .json()
            .await
            .map_err(|e| VectorStoreError::InvalidResponse(e.to_string()))?;
        Ok(parsed.upserted_count)
    }

    async fn describe_index_stats(&self, index: &str) -> Result<IndexStats, VectorStoreError> {
        let url = format!("{}/describe_index_stats", self.data_plane(index).await?);
        let response = self
            .send(self.client.post(url).json(&serde_json::json!({})))
            .await?;
        check_status(response, index)
            .await?
            .json()
            .await
            .map_err(|e| VectorStoreError::InvalidResponse(e.to_string()))
    }
}
