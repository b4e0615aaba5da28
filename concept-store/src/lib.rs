//! # Concept Store
//!
//! The knowledge base behind the concept explorer. It provides:
//!
//! - **Concepts**: named units of technical knowledge with a category,
//!   explanation, provenance snippets and code locations
//! - **Repository**: lookup, search, merge-on-extraction, partial updates and
//!   cycle-safe reparenting over a single tenant's store
//! - **Persistence**: one JSON document per tenant, rewritten atomically
//! - **Forest view**: the flat name-keyed parent relation projected into trees
//! - **Export**: JSON data documents and Markdown narratives
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Concept Store                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ConceptExtractor ──► ConceptRepository ──► StoreFile (JSON)    │
//! │                              │                                  │
//! │                              ▼                                  │
//! │                     snapshot: [Concept]                         │
//! │                              │                                  │
//! │                 build_forest ──► export                         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod concept;
pub mod error;
pub mod export;
pub mod extraction;
pub mod repository;
pub mod storage;
pub mod tree;

pub use concept::{Category, ChatSnippet, Concept, ExtractedConcept};
pub use error::{ConceptError, Result};
pub use export::{
    DataExport, ExportFormat, ExportOptions, ExportedConcept, export, parse_data_export,
};
pub use extraction::{ConceptExtractor, DictionaryExtractor};
pub use repository::{ConceptRepository, ConceptUpdate, would_create_cycle};
pub use storage::{Store, StoreFile};
pub use tree::{TreeNode, build_forest, depth_first, forest_size};
