//! Storage engine error types.

use thiserror::Error;

/// Errors raised by the resolution and storage engine.
///
/// "Artifact not found" is not in this list on purpose: an absent artifact is
/// an expected outcome (`Ok(None)` from resolution), not a failure.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("path escapes repository root: {0}")]
    PathTraversal(String),

    #[error("unknown repository: {storage_id}:{repository_id}")]
    UnknownRepository {
        storage_id: String,
        repository_id: String,
    },

    #[error("cyclic group definition: {0}")]
    CyclicGroupDefinition(String),

    #[error("remote fetch failed for {url}: {reason}")]
    RemoteFetch { url: String, reason: String },

    #[error("checksum mismatch for {path} ({algorithm}): expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: String,
        algorithm: String,
        expected: String,
        actual: String,
    },

    #[error("partial write: {0}")]
    PartialWrite(String),

    #[error("deployment rejected: {0}")]
    DeploymentRejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] depot_core::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
