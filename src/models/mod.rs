mod config;
mod format;
mod index;
mod report;
mod review;

pub use config::{
    Config, DEFAULT_DIMENSION, DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_URL,
    DEFAULT_HTTP_EMBEDDING_URL, DEFAULT_INDEX_NAME, DEFAULT_NAMESPACE,
    DEFAULT_PINECONE_CONTROL_URL, DEFAULT_QDRANT_URL, DEFAULT_REVIEWS_FILE, DEFAULT_VERTEX_MODEL,
    EmbeddingBackend, EmbeddingConfig, IndexConfig, PipelineConfig, StoreBackend, VertexConfig,
};
pub use format::OutputFormat;
pub use index::{
    CloudSpec, IndexDescriptor, IndexListing, IndexStats, IndexSummary, Metric, NamespaceStats,
    validate_index_name,
};
pub use report::{ProvisionOutcome, RunReport, SkipReason, SkippedReview};
pub use review::{IndexRecord, Review, ReviewMetadata};
