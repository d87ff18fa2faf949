use serde::{Deserialize, Serialize};

/// A single professor review as found in the reviews document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub professor: Option<String>,
    #[serde(default)]
    pub review: Option<String>,
    pub subject: String,
    pub stars: f64,
}

/// Metadata stored next to each vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewMetadata {
    pub review: String,
    pub subject: String,
    pub stars: f64,
}

/// The unit persisted into the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ReviewMetadata,
}

impl Review {
    /// Record id: the professor name, or `review-{index}` when there is none.
    pub fn record_id(&self, index: usize) -> String {
        match self.professor.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("review-{index}"),
        }
    }

    /// Review text, if it has any non-whitespace content.
    pub fn text(&self) -> Option<&str> {
        self.review.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn into_record(self, index: usize, values: Vec<f32>) -> IndexRecord {
        IndexRecord {
            id: self.record_id(index),
            values,
            metadata: ReviewMetadata {
                review: self.review.unwrap_or_default(),
                subject: self.subject,
                stars: self.stars,
            },
        }
    }
}
