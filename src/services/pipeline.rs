//! The setup run: provision, load, embed, upsert, report.

use std::path::PathBuf;
use std::time::Instant;

use indicatif::ProgressBar;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::batch::embed_reviews;
use super::loader::load_reviews;
use super::provisioner::{ReadyWait, ensure_index};
use super::upserter::upsert_records;
use super::{Embedder, VectorStore};
use crate::error::{ConfigError, ProvisioningError, ReportingError, UpsertError, ValidationError};
use crate::models::{Config, IndexDescriptor, IndexStats, ProvisionOutcome, RunReport};
use crate::utils::RetryConfig;

/// Where a run is. A failed run reports the last stage it reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Init,
    Provisioned,
    Loaded,
    Embedding,
    Upserted,
    Reported,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Init => write!(f, "init"),
            PipelineStage::Provisioned => write!(f, "provisioned"),
            PipelineStage::Loaded => write!(f, "loaded"),
            PipelineStage::Embedding => write!(f, "embedding"),
            PipelineStage::Upserted => write!(f, "upserted"),
            PipelineStage::Reported => write!(f, "reported"),
        }
    }
}

/// A stage-fatal failure.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration failed: {0}")]
    Configuration(#[from] ConfigError),

    #[error("provisioning failed: {0}")]
    Provisioning(#[from] ProvisioningError),

    #[error("loading reviews failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("upsert failed: {0}")]
    Upsert(#[from] UpsertError),
}

impl PipelineError {
    /// Last stage completed before the failure.
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::Configuration(_) | PipelineError::Provisioning(_) => {
                PipelineStage::Init
            }
            PipelineError::Validation(_) => PipelineStage::Provisioned,
            PipelineError::Upsert(_) => PipelineStage::Embedding,
        }
    }
}

/// Everything a run needs besides the two service handles.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub descriptor: IndexDescriptor,
    pub namespace: String,
    pub reviews_file: PathBuf,
    pub allow_missing_reviews: bool,
    pub embed_batch_size: usize,
    pub upsert_batch_size: usize,
    pub ready_wait: ReadyWait,
    pub retry: RetryConfig,
    pub skip_provision: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            descriptor: config.index.descriptor(),
            namespace: config.index.namespace.clone(),
            reviews_file: config.pipeline.reviews_file.clone(),
            allow_missing_reviews: config.pipeline.allow_missing_reviews,
            embed_batch_size: config.embedding.batch_size.max(1) as usize,
            upsert_batch_size: config.index.upsert_batch_size.max(1) as usize,
            ready_wait: ReadyWait::from(&config.index),
            retry: RetryConfig::from(&config.pipeline),
            skip_provision: false,
        }
    }
}

pub struct Pipeline<'a> {
    embedder: &'a dyn Embedder,
    store: &'a dyn VectorStore,
    settings: PipelineSettings,
    progress: Option<ProgressBar>,
    stage: PipelineStage,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        embedder: &'a dyn Embedder,
        store: &'a dyn VectorStore,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            embedder,
            store,
            settings,
            progress: None,
            stage: PipelineStage::Init,
        }
    }

    /// Report embedding progress on `progress`. Its length is set by the run.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    fn advance(&mut self, stage: PipelineStage) {
        debug!(from = %self.stage, to = %stage, "pipeline stage");
        self.stage = stage;
    }

    pub async fn run(&mut self) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        let index = self.settings.descriptor.name.clone();
        let namespace = self.settings.namespace.clone();
        info!(
            index = %index,
            namespace = %namespace,
            embedder = %self.embedder.name(),
            store = self.store.name(),
            "starting setup"
        );

        let provision = if self.settings.skip_provision {
            info!(index = %index, "provisioning skipped");
            ProvisionOutcome::Skipped
        } else {
            ensure_index(
                self.store,
                &self.settings.descriptor,
                &self.settings.ready_wait,
            )
            .await?
        };
        self.advance(PipelineStage::Provisioned);

        let reviews = load_reviews(
            &self.settings.reviews_file,
            self.settings.allow_missing_reviews,
        )?;
        let loaded = reviews.len();
        info!(count = loaded, file = %self.settings.reviews_file.display(), "loaded reviews");
        self.advance(PipelineStage::Loaded);

        self.advance(PipelineStage::Embedding);
        if let Some(pb) = &self.progress {
            pb.set_length(loaded as u64);
        }
        let outcome = embed_reviews(
            self.embedder,
            reviews,
            self.settings.embed_batch_size,
            self.settings.descriptor.dimension as usize,
            &self.settings.retry,
            self.progress.as_ref(),
        )
        .await;
        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }
        let embedded = outcome.records.len();
        info!(
            embedded,
            skipped = outcome.skipped.len(),
            "embedding complete"
        );

        let summary = upsert_records(
            self.store,
            &index,
            &namespace,
            &outcome.records,
            self.settings.upsert_batch_size,
            &self.settings.retry,
        )
        .await?;
        self.advance(PipelineStage::Upserted);

        let mut warnings = summary.warnings;
        let stats = match self.fetch_stats(&index).await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!(error = %e, "could not fetch index stats");
                warnings.push(e.to_string());
                None
            }
        };
        self.advance(PipelineStage::Reported);

        Ok(RunReport {
            index,
            namespace,
            provision,
            loaded,
            embedded,
            skipped: outcome.skipped,
            submitted: summary.submitted,
            upserted: summary.upserted,
            batches: summary.batches,
            warnings,
            stats,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn fetch_stats(&self, index: &str) -> Result<IndexStats, ReportingError> {
        self.store
            .describe_index_stats(index)
            .await
            .map_err(|source| ReportingError {
                index: index.to_string(),
                source,
            })
    }
}
