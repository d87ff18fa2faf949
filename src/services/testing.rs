//! In-memory embedder and index used by the service tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{Embedder, VectorStore};
use crate::error::{EmbeddingError, VectorStoreError};
use crate::models::{
    IndexDescriptor, IndexListing, IndexRecord, IndexStats, IndexSummary, NamespaceStats,
};

/// Returns a constant vector of `dimension` for every text.
pub struct FakeEmbedder {
    dimension: usize,
    max_batch: usize,
    failing: HashSet<String>,
    wrong_dimension: HashSet<String>,
    embed_calls: AtomicUsize,
    batch_calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            max_batch: 1,
            failing: HashSet::new(),
            wrong_dimension: HashSet::new(),
            embed_calls: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch;
        self
    }

    /// Reject `text` with a permanent error.
    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    /// Answer `text` with a vector one element too short.
    pub fn short_vector_for(mut self, text: &str) -> Self {
        self.wrong_dimension.insert(text.to_string());
        self
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn vector_for(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if self.failing.contains(text) {
            return Err(EmbeddingError::ServerError {
                status: 400,
                body: "INVALID_ARGUMENT".to_string(),
            });
        }
        if self.wrong_dimension.contains(text) {
            return Ok(vec![0.0; self.dimension.saturating_sub(1)]);
        }
        Ok(vec![0.0; self.dimension])
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn name(&self) -> String {
        "fake".to_string()
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        self.vector_for(text)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        texts.iter().map(|t| self.vector_for(t)).collect()
    }
}

/// How [`FakeStore`] shapes its index listing.
#[derive(Debug, Clone, Copy)]
pub enum ListingShape {
    Names,
    Wrapped,
    Described,
}

#[derive(Default)]
struct StoreState {
    indexes: Vec<IndexDescriptor>,
    extra_names: Vec<String>,
    vectors: BTreeMap<(String, String), IndexRecord>,
    upsert_calls: Vec<(String, Vec<IndexRecord>)>,
    create_calls: usize,
    ready_checks: usize,
    transient_upsert_failures: usize,
}

/// An index service held in memory. Upserts replace by `(namespace, id)`.
pub struct FakeStore {
    state: Mutex<StoreState>,
    listing: ListingShape,
    create_conflict: bool,
    create_failure: Option<u16>,
    ready: bool,
    upsert_failure: Option<u16>,
    upsert_shortfall: u64,
    stats_failure: bool,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            listing: ListingShape::Names,
            create_conflict: false,
            create_failure: None,
            ready: true,
            upsert_failure: None,
            upsert_shortfall: 0,
            stats_failure: false,
        }
    }

    pub fn with_listing(mut self, shape: ListingShape) -> Self {
        self.listing = shape;
        self
    }

    /// Pretend an index with this name already exists.
    pub fn with_index(self, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .extra_names
            .push(name.to_string());
        self
    }

    /// Creation reports a conflict, as if another run got there first.
    pub fn with_create_conflict(mut self) -> Self {
        self.create_conflict = true;
        self
    }

    pub fn with_create_failure(mut self, status: u16) -> Self {
        self.create_failure = Some(status);
        self
    }

    pub fn never_ready(mut self) -> Self {
        self.ready = false;
        self
    }

    /// Every upsert fails with `status`.
    pub fn with_upsert_failure(mut self, status: u16) -> Self {
        self.upsert_failure = Some(status);
        self
    }

    /// The first `count` upserts fail with a 503.
    pub fn with_transient_upsert_failures(self, count: usize) -> Self {
        self.state.lock().unwrap().transient_upsert_failures = count;
        self
    }

    /// Each upsert reports `shortfall` fewer records than it received.
    pub fn with_upsert_shortfall(mut self, shortfall: u64) -> Self {
        self.upsert_shortfall = shortfall;
        self
    }

    pub fn with_stats_failure(mut self) -> Self {
        self.stats_failure = true;
        self
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }

    pub fn ready_checks(&self) -> usize {
        self.state.lock().unwrap().ready_checks
    }

    pub fn index_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .extra_names
            .iter()
            .cloned()
            .chain(state.indexes.iter().map(|d| d.name.clone()))
            .collect()
    }

    /// Namespace and records of every successful upsert, in call order.
    pub fn upsert_calls(&self) -> Vec<(String, Vec<IndexRecord>)> {
        self.state.lock().unwrap().upsert_calls.clone()
    }

    pub fn stored(&self, namespace: &str) -> Vec<IndexRecord> {
        self.state
            .lock()
            .unwrap()
            .vectors
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, record)| record.clone())
            .collect()
    }
}

#[async_trait]
impl VectorStore for FakeStore {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn list_indexes(&self) -> Result<IndexListing, VectorStoreError> {
        let names = self.index_names();
        let summaries = || {
            names
                .iter()
                .map(|name| IndexSummary {
                    name: name.clone(),
                    dimension: Some(768),
                    host: None,
                })
                .collect::<Vec<_>>()
        };
        Ok(match self.listing {
            ListingShape::Names => IndexListing::Names(names.clone()),
            ListingShape::Wrapped => IndexListing::Wrapped {
                indexes: summaries(),
            },
            ListingShape::Described => IndexListing::Described(summaries()),
        })
    }

    async fn create_index(&self, descriptor: &IndexDescriptor) -> Result<(), VectorStoreError> {
        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;
        if self.create_conflict {
            return Err(VectorStoreError::AlreadyExists(descriptor.name.clone()));
        }
        if let Some(status) = self.create_failure {
            return Err(VectorStoreError::ServerError {
                status,
                body: "bad request".to_string(),
            });
        }
        state.indexes.push(descriptor.clone());
        Ok(())
    }

    async fn index_ready(&self, _index: &str) -> Result<bool, VectorStoreError> {
        self.state.lock().unwrap().ready_checks += 1;
        Ok(self.ready)
    }

    async fn upsert(
        &self,
        _index: &str,
        namespace: &str,
        records: &[IndexRecord],
    ) -> Result<u64, VectorStoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(status) = self.upsert_failure {
            return Err(VectorStoreError::ServerError {
                status,
                body: "rejected".to_string(),
            });
        }
        if state.transient_upsert_failures > 0 {
            state.transient_upsert_failures -= 1;
            return Err(VectorStoreError::ServerError {
                status: 503,
                body: "unavailable".to_string(),
            });
        }

        for record in records {
            state
                .vectors
                .insert((namespace.to_string(), record.id.clone()), record.clone());
        }
        state
            .upsert_calls
            .push((namespace.to_string(), records.to_vec()));
        Ok((records.len() as u64).saturating_sub(self.upsert_shortfall))
    }

    async fn describe_index_stats(&self, _index: &str) -> Result<IndexStats, VectorStoreError> {
        if self.stats_failure {
            return Err(VectorStoreError::ServerError {
                status: 500,
                body: "stats unavailable".to_string(),
            });
        }

        let state = self.state.lock().unwrap();
        let mut namespaces: BTreeMap<String, NamespaceStats> = BTreeMap::new();
        for (namespace, _) in state.vectors.keys() {
            namespaces.entry(namespace.clone()).or_default().vector_count += 1;
        }
        Ok(IndexStats {
            dimension: state.indexes.first().map(|d| d.dimension),
            total_vector_count: state.vectors.len() as u64,
            namespaces,
        })
    }
}
