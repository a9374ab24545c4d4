use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single indexed documentation file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Path relative to the documentation root, unique within the corpus
    pub path: String,
    pub content: String,
    /// Empty until the embedding pass has run
    #[serde(default)]
    pub embedding: Vec<f32>,
    /// Last modification time reported by the filesystem. Informational only.
    pub modified: DateTime<Utc>,
}

impl Document {
    #[inline]
    pub fn new(path: impl Into<String>, content: impl Into<String>, modified: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            embedding: Vec::new(),
            modified,
        }
    }

    #[inline]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    #[inline]
    pub fn has_embedding(&self) -> bool {
        !self.embedding.is_empty()
    }
}
