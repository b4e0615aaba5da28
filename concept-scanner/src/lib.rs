//! # Concept Scanner
//!
//! Links concepts to the places a codebase mentions them. Given a set of
//! concept names and a root directory, it walks the source files and reports
//! every line containing a name as a whole word.
//!
//! ## Features
//!
//! - **Deterministic walk**: entries are visited in file-name order
//! - **Exclusion**: dependency, build and VCS directories plus hidden entries
//! - **Whole-word matching**: case-insensitive, punctuation-aware (`C++`)
//! - **Single pass**: each file is read once and tested against every name
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Concept Scanner                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ScanOptions ──► WalkDir ──► source file ──► NameMatcher        │
//! │                                                  │              │
//! │                                                  ▼              │
//! │                         ScanReport { id ─► [CodeLocation] }     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod scanner;

pub use config::{DEFAULT_EXCLUDES, DEFAULT_EXTENSIONS, DEFAULT_MAX_FILE_BYTES, ScanOptions};
pub use error::{Result, ScanError};
pub use scanner::{CodeLocation, ScanReport, ScanStats, ScanTarget, scan, scan_report};
