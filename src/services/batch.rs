//! Embedding reviews in batches.

use indicatif::ProgressBar;
use tracing::{debug, warn};

use super::Embedder;
use crate::error::EmbeddingError;
use crate::models::{IndexRecord, Review, SkipReason, SkippedReview};
use crate::utils::{RetryConfig, with_retry};

/// Records ready to upsert, plus the reviews that were left out.
#[derive(Debug, Default)]
pub struct EmbeddingOutcome {
    /// In input order.
    pub records: Vec<IndexRecord>,
    /// Sorted by input position.
    pub skipped: Vec<SkippedReview>,
}

struct Pending {
    index: usize,
    text: String,
    review: Review,
}

/// Embed every review that has text, isolating failures to single records.
///
/// A failed batch is retried one text at a time so that one bad record
/// does not take its neighbours down with it.
pub async fn embed_reviews(
    embedder: &dyn Embedder,
    reviews: Vec<Review>,
    batch_size: usize,
    expected_dim: usize,
    retry: &RetryConfig,
    progress: Option<&ProgressBar>,
) -> EmbeddingOutcome {
    let mut outcome = EmbeddingOutcome::default();
    let mut pending = Vec::with_capacity(reviews.len());

    for (index, review) in reviews.into_iter().enumerate() {
        match review.text().map(str::to_string) {
            Some(text) => pending.push(Pending {
                index,
                text,
                review,
            }),
            None => {
                warn!(index, "skipping review without text");
                outcome.skipped.push(SkippedReview {
                    index,
                    id: review.record_id(index),
                    reason: SkipReason::EmptyText,
                });
                if let Some(pb) = progress {
                    pb.inc(1);
                }
            }
        }
    }

    let batch_size = batch_size.max(1).min(embedder.max_batch_size().max(1));
    debug!(
        embedder = %embedder.name(),
        texts = pending.len(),
        batch_size,
        "embedding reviews"
    );

    let mut remaining = pending.into_iter();
    loop {
        let chunk: Vec<Pending> = remaining.by_ref().take(batch_size).collect();
        if chunk.is_empty() {
            break;
        }
        let chunk_len = chunk.len() as u64;

        for (item, result) in embed_chunk(embedder, chunk, expected_dim, retry).await {
            match result {
                Ok(values) => outcome
                    .records
                    .push(item.review.into_record(item.index, values)),
                Err(e) => {
                    let id = item.review.record_id(item.index);
                    warn!(index = item.index, id = %id, error = %e, "skipping review, embedding failed");
                    outcome.skipped.push(SkippedReview {
                        index: item.index,
                        id,
                        reason: SkipReason::EmbeddingFailed(e.to_string()),
                    });
                }
            }
        }

        if let Some(pb) = progress {
            pb.inc(chunk_len);
        }
    }

    outcome.skipped.sort_by_key(|s| s.index);
    outcome
}

async fn embed_chunk(
    embedder: &dyn Embedder,
    chunk: Vec<Pending>,
    expected_dim: usize,
    retry: &RetryConfig,
) -> Vec<(Pending, Result<Vec<f32>, EmbeddingError>)> {
    if chunk.len() > 1 {
        let texts: Vec<String> = chunk.iter().map(|p| p.text.clone()).collect();
        let batch = with_retry(retry, "embed batch", || embedder.embed_batch(&texts))
            .await
            .into_result();

        match batch {
            Ok(vectors) if vectors.len() == chunk.len() => {
                return chunk
                    .into_iter()
                    .zip(vectors)
                    .map(|(item, values)| (item, check_dimension(values, expected_dim)))
                    .collect();
            }
            Ok(vectors) => warn!(
                expected = chunk.len(),
                actual = vectors.len(),
                "batch returned the wrong number of embeddings, retrying one by one"
            ),
            Err(e) => warn!(
                size = chunk.len(),
                error = %e,
                "batch embedding failed, retrying one by one"
            ),
        }
    }

    let mut results = Vec::with_capacity(chunk.len());
    for item in chunk {
        let result = with_retry(retry, "embed", || embedder.embed(&item.text))
            .await
            .into_result()
            .and_then(|values| check_dimension(values, expected_dim));
        results.push((item, result));
    }
    results
}

fn check_dimension(values: Vec<f32>, expected: usize) -> Result<Vec<f32>, EmbeddingError> {
    if values.len() == expected {
        Ok(values)
    } else {
        Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: values.len(),
        })
    }
}
