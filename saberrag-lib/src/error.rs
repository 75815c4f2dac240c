//! Error types for saberrag

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for saberrag operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or querying the retrieval index
#[derive(Error, Debug)]
pub enum Error {
    /// A required source document is missing
    #[error("source document not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Ingestion and chunking produced nothing to index
    #[error("no chunks produced from the source documents")]
    EmptyCorpus,

    /// The embedding model could not be reached or returned garbage
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// A vector does not match the index dimension
    #[error("dimension mismatch: index has {expected} dimensions, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A document exists but its text could not be extracted
    #[error("failed to extract text from {}: {reason}", .path.display())]
    Extraction { path: PathBuf, reason: String },

    /// Configuration file could not be read or parsed
    #[error("config error: {0}")]
    Config(String),

    /// Invalid input provided
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
