//! # Concept Engine
//!
//! This crate ties the concept store and the codebase scanner together:
//!
//! - **Tenants**: one lazily loaded repository per namespace
//! - **Ingest**: extraction collaborator output merged into the store
//! - **Code linking**: scanner results persisted as code locations
//! - **Views**: forest, search and export per tenant
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Concept Engine                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │  Extractor   │  │   Registry   │  │   Scanner    │           │
//! │  │  (external)  │  │  (tenants)   │  │  (blocking)  │           │
//! │  └──────────────┘  └──────────────┘  └──────────────┘           │
//! │         │                 │                  │                  │
//! │         └─────────────────┼──────────────────┘                  │
//! │                           ▼                                     │
//! │                 ┌───────────────────┐                           │
//! │                 │ ConceptRepository │                           │
//! │                 └───────────────────┘                           │
//! │                           │                                     │
//! │                           ▼                                     │
//! │                  forest / export                                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use concept_engine::ConceptEngine;
//!
//! let engine = ConceptEngine::builder()
//!     .with_data_dir("/var/lib/concept-forest")
//!     .build();
//!
//! engine.ingest("alice", conversation, &extractor).await?;
//! engine.link_codebase("alice", "~/src/app").await?;
//! let markdown = engine.export("alice", None).await?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod registry;

pub use config::{EngineConfig, ExportSettings, ScanSettings};
pub use engine::{ConceptEngine, ConceptEngineBuilder, EngineStats, LinkReport};
pub use error::{EngineError, Result};
pub use registry::{ConceptRegistry, SharedRepository};

// Re-export from dependencies for convenience
pub use concept_scanner::{CodeLocation, ScanOptions, ScanStats};
pub use concept_store::{
    Category, Concept, ConceptExtractor, ConceptUpdate, ExportFormat, ExportOptions,
    ExtractedConcept, TreeNode,
};
