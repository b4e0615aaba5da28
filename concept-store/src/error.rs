//! Error types for the concept store.

use thiserror::Error;

/// Result type alias for concept store operations.
pub type Result<T> = std::result::Result<T, ConceptError>;

/// Errors that can occur in the concept store.
#[derive(Error, Debug)]
pub enum ConceptError {
    /// No concept with the given id or name exists.
    #[error("concept not found: {0}")]
    NotFound(String),

    /// A concept with the same name already exists.
    #[error("concept already exists: {0}")]
    Conflict(String),

    /// The operation would break a store invariant (cycle, empty name, ...).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error while persisting the store.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The extraction collaborator failed.
    #[error("extraction error: {0}")]
    Extraction(String),
}

impl ConceptError {
    /// Whether this error comes from the persistence layer rather than from
    /// validating the request.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Serialization(_))
    }
}
