//! Vector index abstraction layer.
//!
//! This module provides a trait-based abstraction over the managed index
//! services (Pinecone, Qdrant), selected by configuration.

mod pinecone;
mod qdrant;

pub use pinecone::PineconeStore;
pub use qdrant::QdrantStore;

use async_trait::async_trait;

use crate::error::{ConfigError, VectorStoreError};
use crate::models::{IndexConfig, IndexDescriptor, IndexListing, IndexRecord, IndexStats, StoreBackend};

/// Operations consumed from the external vector index service.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend label for logs and reports.
    fn name(&self) -> &'static str;

    /// List the indexes that currently exist.
    async fn list_indexes(&self) -> Result<IndexListing, VectorStoreError>;

    /// Create an index. Fails with [`VectorStoreError::AlreadyExists`] if the name is taken.
    async fn create_index(&self, descriptor: &IndexDescriptor) -> Result<(), VectorStoreError>;

    /// Whether the index accepts writes yet.
    async fn index_ready(&self, index: &str) -> Result<bool, VectorStoreError>;

    /// Insert or replace `records` by id. Returns the count the service reports as upserted.
    async fn upsert(
        &self,
        index: &str,
        namespace: &str,
        records: &[IndexRecord],
    ) -> Result<u64, VectorStoreError>;

    /// Aggregate statistics for the index.
    async fn describe_index_stats(&self, index: &str) -> Result<IndexStats, VectorStoreError>;
}

/// Create the configured vector index backend.
pub fn create_backend(config: &IndexConfig) -> Result<Box<dyn VectorStore>, ConfigError> {
    match config.backend {
        StoreBackend::Pinecone => Ok(Box::new(PineconeStore::new(config)?)),
        StoreBackend::Qdrant => Ok(Box::new(QdrantStore::new(config)?)),
    }
}
