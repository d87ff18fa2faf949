//! Idempotent index provisioning.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::VectorStore;
use crate::error::{ProvisioningError, VectorStoreError};
use crate::models::{IndexConfig, IndexDescriptor, ProvisionOutcome};

/// How long to wait for a freshly created index to become ready.
#[derive(Debug, Clone)]
pub struct ReadyWait {
    pub attempts: u32,
    pub interval: Duration,
}

impl From<&IndexConfig> for ReadyWait {
    fn from(config: &IndexConfig) -> Self {
        Self {
            attempts: config.ready_poll_attempts,
            interval: Duration::from_millis(config.ready_poll_interval_ms),
        }
    }
}

/// Create the index described by `descriptor` unless one with that name exists.
///
/// Create is never retried. A conflict from a concurrent creator counts as
/// success.
pub async fn ensure_index(
    store: &dyn VectorStore,
    descriptor: &IndexDescriptor,
    wait: &ReadyWait,
) -> Result<ProvisionOutcome, ProvisioningError> {
    let existing = store
        .list_indexes()
        .await
        .map_err(ProvisioningError::ListFailed)?
        .into_names();
    info!(backend = store.name(), existing = ?existing, "existing indexes");

    if existing.iter().any(|name| name == &descriptor.name) {
        info!(index = %descriptor.name, "index already exists, skipping creation");
        return Ok(ProvisionOutcome::AlreadyExists);
    }

    match store.create_index(descriptor).await {
        Ok(()) => {
            info!(
                index = %descriptor.name,
                dimension = descriptor.dimension,
                metric = %descriptor.metric,
                cloud = %descriptor.spec.cloud,
                region = %descriptor.spec.region,
                "index created"
            );
            wait_until_ready(store, &descriptor.name, wait).await;
            Ok(ProvisionOutcome::Created)
        }
        Err(VectorStoreError::AlreadyExists(_)) => {
            warn!(index = %descriptor.name, "index was created concurrently, continuing");
            Ok(ProvisionOutcome::AlreadyExists)
        }
        Err(source) => Err(ProvisioningError::CreateFailed {
            name: descriptor.name.clone(),
            source,
        }),
    }
}

async fn wait_until_ready(store: &dyn VectorStore, index: &str, wait: &ReadyWait) -> bool {
    for attempt in 1..=wait.attempts {
        match store.index_ready(index).await {
            Ok(true) => {
                debug!(index, attempt, "index ready");
                return true;
            }
            Ok(false) => debug!(index, attempt, "index not ready yet"),
            Err(e) => debug!(index, attempt, error = %e, "readiness check failed"),
        }
        if attempt < wait.attempts {
            sleep(wait.interval).await;
        }
    }

    if wait.attempts > 0 {
        warn!(
            index,
            attempts = wait.attempts,
            "index did not report ready, continuing anyway"
        );
    }
    false
}
