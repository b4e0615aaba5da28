//! Error types for the concept engine.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur in the concept engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Concept store error.
    #[error("concept error: {0}")]
    Concept(#[from] concept_store::ConceptError),

    /// Codebase scan error.
    #[error("scan error: {0}")]
    Scan(#[from] concept_scanner::ScanError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A blocking scan task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl EngineError {
    /// Whether the error means the requested concept does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Concept(concept_store::ConceptError::NotFound(_))
        )
    }
}
