//! Persistent storage for the concept store.
//!
//! Each tenant's knowledge base is a single JSON document. Saves rewrite the
//! whole document through a temporary sibling file so a crash never leaves a
//! half-written store behind. Loads never fail: a missing or corrupt document
//! degrades to an empty store.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::concept::Concept;
use crate::error::Result;

/// File name of the per-tenant document.
pub const STORE_FILE_NAME: &str = "concepts.json";

/// Directory used for the empty namespace.
pub const DEFAULT_NAMESPACE: &str = "default";

/// The aggregate root persisted for each tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    /// Schema version of the document.
    pub version: u32,

    /// All concepts, in insertion order.
    #[serde(default)]
    pub concepts: Vec<Concept>,

    /// When the document was last saved.
    pub last_updated: DateTime<Utc>,
}

impl Store {
    /// Current schema version.
    pub const CURRENT_VERSION: u32 = 1;

    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            concepts: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// Location of a tenant's store document on disk.
#[derive(Debug, Clone)]
pub struct StoreFile {
    path: PathBuf,
}

impl StoreFile {
    /// Use the document at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The document for a tenant namespace under a data directory.
    pub fn for_namespace(data_dir: &Path, namespace: &str) -> Self {
        Self::new(
            data_dir
                .join(namespace_dir(namespace))
                .join(STORE_FILE_NAME),
        )
    }

    /// Path of the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a document has been written yet.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    /// Load the store, falling back to an empty one on any failure.
    pub fn load(&self) -> Store {
        if !self.exists() {
            info!(
                "No concept store at {}, starting empty",
                self.path.display()
            );
            return Store::new();
        }

        match self.try_load() {
            Ok(store) => {
                info!(
                    "Loaded {} concepts from {}",
                    store.concepts.len(),
                    self.path.display()
                );
                store
            }
            Err(e) => {
                warn!(
                    "Failed to load concept store {}: {e}; starting empty",
                    self.path.display()
                );
                Store::new()
            }
        }
    }

    fn try_load(&self) -> Result<Store> {
        let json = fs::read_to_string(&self.path)?;
        let store: Store = serde_json::from_str(&json)?;

        if store.version != Store::CURRENT_VERSION {
            warn!(
                "Concept store version mismatch: found {}, expected {}",
                store.version,
                Store::CURRENT_VERSION
            );
        }

        Ok(store)
    }

    /// Stamp `last_updated` and rewrite the whole document.
    pub fn save(&self, store: &mut Store) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        store.last_updated = Utc::now();
        let json = serde_json::to_string_pretty(store)?;

        let temp_path = self.temp_path();
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, &self.path)?;

        debug!(
            "Saved {} concepts to {}",
            store.concepts.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Map a tenant namespace to a single, safe path component.
///
/// Lowercase ASCII letters, digits and `-` are kept; every other byte is
/// written as `%XX`. The mapping is injective, so distinct namespaces never
/// share a directory, including on case-insensitive filesystems. The empty
/// namespace is the default tenant.
pub fn namespace_dir(namespace: &str) -> String {
    if namespace.is_empty() {
        return DEFAULT_NAMESPACE.to_string();
    }

    let mut dir = String::with_capacity(namespace.len());
    for byte in namespace.bytes() {
        if byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-' {
            dir.push(char::from(byte));
        } else {
            let _ = write!(dir, "%{byte:02X}");
        }
    }
    dir
}
