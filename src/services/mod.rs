mod batch;
mod embedding;
mod loader;
mod pipeline;
mod provisioner;
mod upserter;
mod vector_store;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{EmbeddingOutcome, embed_reviews};
pub use embedding::{
    Embedder, GeminiEmbedder, HttpEmbedder, TokenSource, VertexEmbedder, create_embedder,
};
pub use loader::{load_reviews, parse_reviews};
pub use pipeline::{Pipeline, PipelineError, PipelineSettings, PipelineStage};
pub use provisioner::{ReadyWait, ensure_index};
pub use upserter::{UpsertSummary, upsert_records};
pub use vector_store::{PineconeStore, QdrantStore, VectorStore, create_backend};
