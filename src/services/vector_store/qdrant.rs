//! Qdrant vector store backend.
//!
//! Each index is a collection. Namespaces live in the payload, and point ids
//! are UUIDv5 of `{namespace}:{id}` since Qdrant only accepts UUIDs or integers.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CollectionStatus, CreateCollectionBuilder, Distance, PayloadIncludeSelector, PointId,
    PointStruct, ScrollPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
    vectors_config,
};
use uuid::Uuid;

use super::VectorStore;
use crate::error::{ConfigError, VectorStoreError};
use crate::models::{
    IndexConfig, IndexDescriptor, IndexListing, IndexRecord, IndexStats, Metric, NamespaceStats,
};

const SCROLL_PAGE: u32 = 256;

pub struct QdrantStore {
    client: Qdrant,
}

impl QdrantStore {
    pub fn new(config: &IndexConfig) -> Result<Self, ConfigError> {
        let mut builder =
            Qdrant::from_url(&config.qdrant_url).timeout(Duration::from_secs(config.timeout_secs));

        if let Some(ref api_key) = config.qdrant_api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder.build().map_err(|e| ConfigError::ClientInit {
            service: "qdrant",
            message: e.to_string(),
        })?;

        Ok(Self { client })
    }

    pub fn point_id(namespace: &str, id: &str) -> String {
        let name = format!("{namespace}:{id}");
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }

    fn distance(metric: Metric) -> Distance {
        match metric {
            Metric::Cosine => Distance::Cosine,
            Metric::Euclidean => Distance::Euclid,
            Metric::Dotproduct => Distance::Dot,
        }
    }

    fn point(namespace: &str, record: &IndexRecord) -> PointStruct {
        let mut payload: HashMap<String, Value> = HashMap::new();
        payload.insert("record_id".to_string(), record.id.clone().into());
        payload.insert("namespace".to_string(), namespace.to_string().into());
        payload.insert("review".to_string(), record.metadata.review.clone().into());
        payload.insert("subject".to_string(), record.metadata.subject.clone().into());
        payload.insert("stars".to_string(), record.metadata.stars.into());

        PointStruct::new(
            Self::point_id(namespace, &record.id),
            record.values.clone(),
            payload,
        )
    }

    async fn namespace_counts(
        &self,
        index: &str,
    ) -> Result<BTreeMap<String, NamespaceStats>, VectorStoreError> {
        let mut namespaces: BTreeMap<String, NamespaceStats> = BTreeMap::new();
        let mut offset: Option<PointId> = None;

        loop {
            let mut scroll = ScrollPointsBuilder::new(index)
                .limit(SCROLL_PAGE)
                .with_payload(PayloadIncludeSelector {
                    fields: vec!["namespace".to_string()],
                })
                .with_vectors(false);

            if let Some(off) = offset {
                scroll = scroll.offset(off);
            }

            let response = self
                .client
                .scroll(scroll)
                .await
                .map_err(|e| VectorStoreError::ClientError(e.to_string()))?;

            for point in &response.result {
                if let Some(Value {
                    kind: Some(Kind::StringValue(ns)),
                }) = point.payload.get("namespace")
                {
                    namespaces.entry(ns.clone()).or_default().vector_count += 1;
                }
            }

            offset = response.next_page_offset;
            if offset.is_none() || response.result.is_empty() {
                break;
            }
        }

        Ok(namespaces)
    }
}

fn is_not_found(msg: &str) -> bool {
    msg.contains("not found") || msg.contains("doesn't exist")
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn name(&self) -> &'static str {
        "qdrant"
    }

    async fn list_indexes(&self) -> Result<IndexListing, VectorStoreError> {
        let response = self
            .client
            .list_collections()
            .await
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(IndexListing::Names(
            response.collections.into_iter().map(|c| c.name).collect(),
        ))
    }

    async fn create_index(&self, descriptor: &IndexDescriptor) -> Result<(), VectorStoreError> {
        let create = CreateCollectionBuilder::new(&descriptor.name).vectors_config(
            VectorParamsBuilder::new(
                u64::from(descriptor.dimension),
                Self::distance(descriptor.metric),
            ),
        );

        self.client.create_collection(create).await.map_err(|e| {
            let msg = e.to_string();
            if msg.contains("already exists") {
                VectorStoreError::AlreadyExists(descriptor.name.clone())
            } else {
                VectorStoreError::ClientError(msg)
            }
        })?;

        Ok(())
    }

    async fn index_ready(&self, index: &str) -> Result<bool, VectorStoreError> {
        match self.client.collection_info(index.to_string()).await {
            Ok(info) => Ok(info
                .result
                .is_some_and(|r| r.status == CollectionStatus::Green as i32)),
            Err(e) if is_not_found(&e.to_string()) => Ok(false),
            Err(e) => Err(VectorStoreError::ClientError(e.to_string())),
        }
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

        let points: Vec<PointStruct> = records
            .iter()
            .map(|record| Self::point(namespace, record))
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(index, points).wait(true))
            .await
            .map_err(|e| VectorStoreError::ClientError(e.to_string()))?;

        // Qdrant acknowledges the whole batch without a per-point count.
        Ok(records.len() as u64)
    }

    async fn describe_index_stats(&self, index: &str) -> Result<IndexStats, VectorStoreError> {
        let info = match self.client.collection_info(index.to_string()).await {
            Ok(info) => info.result,
            Err(e) if is_not_found(&e.to_string()) => {
                return Err(VectorStoreError::NotFound(index.to_string()));
            }
            Err(e) => return Err(VectorStoreError::ClientError(e.to_string())),
        };

        let total_vector_count = info
            .as_ref()
            .and_then(|r| r.points_count)
            .unwrap_or(0);
        let dimension = info
            .as_ref()
            .and_then(|r| r.config.as_ref())
            .and_then(|c| c.params.as_ref())
            .and_then(|p| p.vectors_config.as_ref())
            .and_then(|v| match &v.config {
                Some(vectors_config::Config::Params(params)) => u32::try_from(params.size).ok(),
                _ => None,
            });

        Ok(IndexStats {
            dimension,
            total_vector_count,
            namespaces: self.namespace_counts(index).await?,
        })
    }
}
