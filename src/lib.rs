use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

/// Errors raised by the retrieval engine.
///
/// Every variant is cloneable so that a single failed initialization can be
/// reported to every caller that waited on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error{}: {message}", .status.map_or_else(String::new, |s| format!(" (HTTP {s})")))]
    Network {
        status: Option<u16>,
        message: String,
    },

    #[error("Archive entry escapes extraction directory: {0}")]
    PathTraversal(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Embedding batch is inconsistent: sent {expected} inputs, received {actual} vectors")]
    InconsistentBatch { expected: usize, actual: usize },

    #[error("Embedding response index {index} is out of range, repeated or missing in a batch of {expected}")]
    InvalidBatchIndex { index: usize, expected: usize },

    #[error("Retrieval service not initialized")]
    NotInitialized,

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for RagError {
    #[inline]
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

pub mod archive;
pub mod cache;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod retrieval;
