//! Error types for the codebase scanner.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for scan operations.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors that abort a scan.
///
/// Problems below the root (unreadable files, binary content, oversized
/// files) are skipped and never surface here.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The scan root could not be read.
    #[error("cannot read scan root {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The scan root exists but is not a directory.
    #[error("scan root is not a directory: {0}")]
    NotADirectory(PathBuf),
}
