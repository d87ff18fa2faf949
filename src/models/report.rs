//! Results of a pipeline run.

use serde::Serialize;

use super::index::IndexStats;

/// What the provisioner did with the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionOutcome {
    Created,
    AlreadyExists,
    Skipped,
}

impl std::fmt::Display for ProvisionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProvisionOutcome::Created => write!(f, "created"),
            ProvisionOutcome::AlreadyExists => write!(f, "already exists"),
            ProvisionOutcome::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    EmptyText,
    EmbeddingFailed(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::EmptyText => write!(f, "review has no text"),
            SkipReason::EmbeddingFailed(msg) => write!(f, "embedding failed: {msg}"),
        }
    }
}

/// A review that did not make it into the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedReview {
    pub index: usize,
    pub id: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub index: String,
    pub namespace: String,
    pub provision: ProvisionOutcome,
    pub loaded: usize,
    pub embedded: usize,
    pub skipped: Vec<SkippedReview>,
    pub submitted: u64,
    pub upserted: u64,
    pub batches: usize,
    pub warnings: Vec<String>,
    pub stats: Option<IndexStats>,
    pub duration_ms: u64,
}
