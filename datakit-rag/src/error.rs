//! Error types for the `datakit-rag` crate.

use thiserror::Error;

/// Errors that can occur while chunking, embedding, or ranking.
///
/// Candidates that cannot be scored (missing embedding, dimension mismatch)
/// are skipped rather than reported here.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while splitting document content.
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The caller asked for zero results.
    #[error("top_k must be at least 1, got {0}")]
    InvalidTopK(usize),

    /// A dataset or result could not be (de)serialized.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
