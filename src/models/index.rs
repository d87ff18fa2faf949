//! Index descriptors, listings and statistics.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Lowercase alphanumerics and hyphens, starting and ending alphanumeric, at most 45 chars.
static INDEX_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9](?:[a-z0-9-]{0,43}[a-z0-9])?$").expect("index name pattern is valid")
});

pub fn validate_index_name(name: &str) -> Result<(), ConfigError> {
    if INDEX_NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: "index.name",
            reason: format!(
                "'{name}' must be 1-45 lowercase alphanumeric characters or '-', \
                 starting and ending with an alphanumeric"
            ),
        })
    }
}

/// Similarity metric of an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
    Dotproduct,
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Cosine => write!(f, "cosine"),
            Metric::Euclidean => write!(f, "euclidean"),
            Metric::Dotproduct => write!(f, "dotproduct"),
        }
    }
}

/// Where a serverless index lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudSpec {
    pub cloud: String,
    pub region: String,
}

/// Desired shape of the index, checked by name before creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub dimension: u32,
    pub metric: Metric,
    pub spec: CloudSpec,
}

/// One entry of a descriptor-style index listing.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexSummary {
    pub name: String,
    #[serde(default)]
    pub dimension: Option<u32>,
    #[serde(default)]
    pub host: Option<String>,
}

/// Index listing as returned by a backend.
///
/// Services answer either with bare names or with richer descriptors,
/// wrapped in an `indexes` object or not.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IndexListing {
    Wrapped { indexes: Vec<IndexSummary> },
    Described(Vec<IndexSummary>),
    Names(Vec<String>),
}

impl IndexListing {
    pub fn into_names(self) -> Vec<String> {
        match self {
            IndexListing::Names(names) => names,
            IndexListing::Wrapped { indexes } | IndexListing::Described(indexes) => {
                indexes.into_iter().map(|i| i.name).collect()
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        match self {
            IndexListing::Names(names) => names.iter().any(|n| n == name),
            IndexListing::Wrapped { indexes } | IndexListing::Described(indexes) => {
                indexes.iter().any(|i| i.name == name)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceStats {
    #[serde(default)]
    pub vector_count: u64,
}

/// Aggregate statistics of an index, printed after a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    #[serde(default)]
    pub dimension: Option<u32>,
    #[serde(default)]
    pub total_vector_count: u64,
    #[serde(default)]
    pub namespaces: BTreeMap<String, NamespaceStats>,
}
