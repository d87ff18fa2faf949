//! Writing embedded records to the index.

use tracing::{debug, info, warn};

use super::VectorStore;
use crate::error::UpsertError;
use crate::models::IndexRecord;
use crate::utils::{RetryConfig, RetryResult, with_retry};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub submitted: u64,
    pub upserted: u64,
    pub batches: usize,
    pub warnings: Vec<String>,
}

/// Upsert `records` into `namespace` in batches of `batch_size`.
///
/// Each batch is retried on transient failures; replays are safe because
/// records replace by id. A batch that still fails aborts the run, leaving
/// earlier batches committed.
pub async fn upsert_records(
    store: &dyn VectorStore,
    index: &str,
    namespace: &str,
    records: &[IndexRecord],
    batch_size: usize,
    retry: &RetryConfig,
) -> Result<UpsertSummary, UpsertError> {
    let mut summary = UpsertSummary {
        submitted: records.len() as u64,
        ..Default::default()
    };

    if records.is_empty() {
        info!(index, namespace, "nothing to upsert");
        return Ok(summary);
    }

    for (batch, chunk) in records.chunks(batch_size.max(1)).enumerate() {
        let result = with_retry(retry, "upsert", || store.upsert(index, namespace, chunk)).await;
        let count = match result {
            RetryResult::Success(count) => count,
            RetryResult::Failed {
                last_error,
                attempts,
            } => {
                warn!(batch, attempts, error = %last_error, "upsert batch failed");
                return Err(UpsertError {
                    batch,
                    size: chunk.len(),
                    committed: summary.upserted,
                    source: last_error,
                });
            }
        };

        debug!(batch, size = chunk.len(), upserted = count, "upserted batch");
        summary.upserted += count;
        summary.batches += 1;
    }

    if summary.upserted != summary.submitted {
        let message = format!(
            "submitted {} records but the index reported {} upserted",
            summary.submitted, summary.upserted
        );
        warn!(index, namespace, "{message}");
        summary.warnings.push(message);
    }

    info!(
        index,
        namespace,
        upserted = summary.upserted,
        batches = summary.batches,
        "upsert complete"
    );
    Ok(summary)
}
