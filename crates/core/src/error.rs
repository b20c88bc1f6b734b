//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not a valid artifact path: {0}")]
    NotAValidArtifactPath(String),

    #[error("unsupported coordinate shape: {0}")]
    UnsupportedCoordinateShape(String),

    #[error("unknown layout alias: {0}")]
    UnknownLayout(String),

    #[error("checksum mismatch for {algorithm}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        algorithm: String,
        expected: String,
        actual: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("cyclic group definition: {0}")]
    CyclicGroupDefinition(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
