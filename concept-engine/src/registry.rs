//! Per-tenant repository registry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use concept_store::storage::namespace_dir;
use concept_store::{ConceptRepository, StoreFile};
use tokio::sync::RwLock;
use tracing::debug;

/// A tenant's repository, shared between callers.
pub type SharedRepository = Arc<RwLock<ConceptRepository>>;

/// Owns one lazily opened repository per namespace.
///
/// A repository is loaded on first use and cached for the registry's
/// lifetime. Each distinct namespace gets its own repository; only the
/// empty namespace aliases `default`.
pub struct ConceptRegistry {
    data_dir: PathBuf,
    tenants: RwLock<HashMap<String, SharedRepository>>,
}

impl ConceptRegistry {
    /// Create a registry storing tenants under `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            tenants: RwLock::new(HashMap::new()),
        }
    }

    /// Root directory of all tenants.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The repository for `namespace`, loading it on first use.
    pub async fn tenant(&self, namespace: &str) -> SharedRepository {
        let key = namespace_dir(namespace);

        if let Some(repo) = self.tenants.read().await.get(&key) {
            return Arc::clone(repo);
        }

        let mut tenants = self.tenants.write().await;
        let repo = tenants.entry(key).or_insert_with(|| {
            debug!("Opening concept store for tenant {namespace:?}");
            let file = StoreFile::for_namespace(&self.data_dir, namespace);
            Arc::new(RwLock::new(ConceptRepository::open(file)))
        });
        Arc::clone(repo)
    }

    /// Namespaces (as directory names) loaded so far, sorted.
    pub async fn loaded(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tenants.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}
