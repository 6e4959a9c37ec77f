//! Error types shared across ingestion, indexing, and retrieval.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
///
/// Query callers can tell "no index loaded" ([`Error::IndexUnavailable`]) from
/// "gateway unreachable" ([`Error::EmbeddingFailure`]) and recover differently.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad chunking parameters or other invalid settings.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A vector did not have the dimension the index expects.
    #[error("dimension mismatch at {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Where the bad vector came from (row, document, query).
        context: String,
        expected: usize,
        actual: usize,
    },

    /// The persisted bundle is unreadable or its artifacts disagree.
    #[error("corrupt index at {}: {reason}", .path.display())]
    CorruptIndex { path: PathBuf, reason: String },

    #[error("index not found at {}: {reason}", .path.display())]
    IndexNotFound { path: PathBuf, reason: String },

    #[error("no index loaded")]
    IndexUnavailable,

    #[error("embedding failed: {0}")]
    EmbeddingFailure(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn dimension_mismatch(
        context: impl Into<String>,
        expected: usize,
        actual: usize,
    ) -> Self {
        Error::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::CorruptIndex {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
