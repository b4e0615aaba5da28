//! Concept engine implementation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use concept_scanner::{ScanOptions, ScanStats, ScanTarget, scan_report};
use concept_store::{
    Category, Concept, ConceptExtractor, ConceptUpdate, ExportOptions, ExtractedConcept,
    TreeNode, build_forest, export,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::registry::ConceptRegistry;

/// Entry point for working with concept knowledge bases.
///
/// It coordinates:
/// - Per-tenant repositories, loaded lazily through the [`ConceptRegistry`]
/// - Ingesting conversation text through a [`ConceptExtractor`]
/// - Linking concepts to a codebase with the scanner
/// - Forest views and exports
pub struct ConceptEngine {
    /// Configuration.
    config: EngineConfig,

    /// Tenant repositories.
    registry: ConceptRegistry,
}

impl ConceptEngine {
    /// Create a new engine builder.
    pub fn builder() -> ConceptEngineBuilder {
        ConceptEngineBuilder::new()
    }

    /// Create an engine with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        info!(
            "Initializing concept engine at {}",
            config.data_dir.display()
        );
        Self {
            registry: ConceptRegistry::new(&config.data_dir),
            config,
        }
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The tenant registry.
    pub fn registry(&self) -> &ConceptRegistry {
        &self.registry
    }

    /// Extract concepts from conversation text and merge them into the store.
    ///
    /// The text is recorded as provenance on every concept. The batch is
    /// stored in one commit: if extraction fails or any extracted concept is
    /// invalid, the store is left untouched.
    pub async fn ingest(
        &self,
        namespace: &str,
        text: &str,
        extractor: &dyn ConceptExtractor,
    ) -> Result<Vec<Concept>> {
        let extracted = extractor.extract(text).await?;
        debug!(
            "Extractor {} found {} concepts",
            extractor.name(),
            extracted.len()
        );
        if extracted.is_empty() {
            return Ok(Vec::new());
        }

        let repo = self.registry.tenant(namespace).await;
        let mut repo = repo.write().await;
        let merged = repo.add_all_from_extraction(&extracted, Some(text))?;

        info!("Ingested {} concepts into {namespace}", merged.len());
        Ok(merged)
    }

    /// Add one extracted concept, merging with an existing one of that name.
    pub async fn add(
        &self,
        namespace: &str,
        concept: &ExtractedConcept,
        provenance: Option<&str>,
    ) -> Result<Concept> {
        let repo = self.registry.tenant(namespace).await;
        let added = repo.write().await.add_from_extraction(concept, provenance)?;
        Ok(added)
    }

    /// Create a concept; fails if the name is taken.
    pub async fn create(&self, namespace: &str, concept: &ExtractedConcept) -> Result<Concept> {
        let repo = self.registry.tenant(namespace).await;
        let created = repo.write().await.create(concept)?;
        Ok(created)
    }

    /// Get a concept by id.
    pub async fn get(&self, namespace: &str, id: &str) -> Option<Concept> {
        let repo = self.registry.tenant(namespace).await;
        let repo = repo.read().await;
        repo.get(id).cloned()
    }

    /// Find a concept by name (case-insensitive).
    pub async fn find_by_name(&self, namespace: &str, name: &str) -> Option<Concept> {
        let repo = self.registry.tenant(namespace).await;
        let repo = repo.read().await;
        repo.find_by_name(name).cloned()
    }

    /// All concepts in insertion order.
    pub async fn list(&self, namespace: &str) -> Vec<Concept> {
        let repo = self.registry.tenant(namespace).await;
        let repo = repo.read().await;
        repo.list().to_vec()
    }

    /// Search by name and explanation, optionally within one category.
    pub async fn search(
        &self,
        namespace: &str,
        query: &str,
        category: Option<Category>,
    ) -> Vec<Concept> {
        let repo = self.registry.tenant(namespace).await;
        let repo = repo.read().await;
        repo.search(query, category).into_iter().cloned().collect()
    }

    /// The resolved parent chain of a concept, nearest first.
    pub async fn ancestors(&self, namespace: &str, id: &str) -> Vec<Concept> {
        let repo = self.registry.tenant(namespace).await;
        let repo = repo.read().await;
        repo.ancestors(id).into_iter().cloned().collect()
    }

    /// Apply a partial update.
    pub async fn update(&self, namespace: &str, id: &str, update: ConceptUpdate) -> Result<Concept> {
        let repo = self.registry.tenant(namespace).await;
        let updated = repo.write().await.update(id, update)?;
        Ok(updated)
    }

    /// Delete a concept. Returns whether it existed.
    pub async fn delete(&self, namespace: &str, id: &str) -> Result<bool> {
        let repo = self.registry.tenant(namespace).await;
        let deleted = repo.write().await.delete(id)?;
        Ok(deleted)
    }

    /// Move a concept under another one, or detach it with `None`.
    pub async fn reparent(
        &self,
        namespace: &str,
        id: &str,
        parent: Option<&str>,
    ) -> Result<Concept> {
        let repo = self.registry.tenant(namespace).await;
        let moved = repo.write().await.reparent(id, parent)?;
        Ok(moved)
    }

    /// The forest view of a tenant's concepts.
    pub async fn forest(&self, namespace: &str) -> Vec<TreeNode> {
        let repo = self.registry.tenant(namespace).await;
        let repo = repo.read().await;
        build_forest(repo.list())
    }

    /// Export with the configured defaults, optionally limited to a category.
    pub async fn export(&self, namespace: &str, category: Option<Category>) -> Result<String> {
        self.export_with(namespace, category, &self.config.export.into())
            .await
    }

    /// Export with explicit options, optionally limited to a category.
    pub async fn export_with(
        &self,
        namespace: &str,
        category: Option<Category>,
        options: &ExportOptions,
    ) -> Result<String> {
        let repo = self.registry.tenant(namespace).await;
        let repo = repo.read().await;

        let document = match category {
            Some(category) => {
                let selected: Vec<Concept> = repo
                    .list()
                    .iter()
                    .filter(|c| c.category == category)
                    .cloned()
                    .collect();
                export(&selected, options)?
            }
            None => export(repo.list(), options)?,
        };
        Ok(document)
    }

    /// Scan `root` with the configured settings and store the locations found.
    pub async fn link_codebase(
        &self,
        namespace: &str,
        root: impl Into<PathBuf>,
    ) -> Result<LinkReport> {
        let options = self.config.scan.options_for(root);
        self.link_codebase_with(namespace, options).await
    }

    /// Scan with explicit options and store the locations found.
    ///
    /// The scan runs on a blocking thread over a snapshot of concept names,
    /// without holding the tenant lock. Concepts with matches get their code
    /// locations replaced; concepts deleted during the scan are skipped.
    pub async fn link_codebase_with(
        &self,
        namespace: &str,
        options: ScanOptions,
    ) -> Result<LinkReport> {
        let repo = self.registry.tenant(namespace).await;

        let targets: Vec<ScanTarget> = repo
            .read()
            .await
            .list()
            .iter()
            .map(|c| ScanTarget::new(c.id.clone(), c.name.clone()))
            .collect();
        if targets.is_empty() {
            debug!("No concepts to link in {namespace}");
            return Ok(LinkReport::default());
        }

        let report =
            tokio::task::spawn_blocking(move || scan_report(&targets, &options)).await??;

        let updates: Vec<(String, Vec<String>)> = report
            .locations
            .into_iter()
            .map(|(id, locations)| (id, locations.iter().map(ToString::to_string).collect()))
            .collect();
        let concepts_linked = repo.write().await.replace_code_locations(updates)?;

        info!("Linked {concepts_linked} concepts in {namespace} to code");
        Ok(LinkReport {
            concepts_linked,
            stats: report.stats,
        })
    }

    /// Get statistics about a tenant's concepts.
    pub async fn stats(&self, namespace: &str) -> EngineStats {
        let repo = self.registry.tenant(namespace).await;
        let repo = repo.read().await;
        let forest = build_forest(repo.list());

        let mut by_category = BTreeMap::new();
        for concept in repo.list() {
            *by_category.entry(concept.category).or_insert(0) += 1;
        }

        EngineStats {
            concepts: repo.len(),
            roots: forest.len(),
            max_depth: forest.iter().map(TreeNode::depth).max().unwrap_or(0),
            by_category,
            linked: repo
                .list()
                .iter()
                .filter(|c| !c.code_locations.is_empty())
                .count(),
        }
    }
}

/// Builder for [`ConceptEngine`].
pub struct ConceptEngineBuilder {
    config: EngineConfig,
}

impl ConceptEngineBuilder {
    /// Create a new builder with the default configuration.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Start from an existing configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    /// Set the file size limit for codebase scans.
    pub fn with_max_file_bytes(mut self, bytes: u64) -> Self {
        self.config.scan.max_file_bytes = bytes;
        self
    }

    /// Build the engine.
    pub fn build(self) -> ConceptEngine {
        ConceptEngine::new(self.config)
    }
}

impl Default for ConceptEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of linking a tenant's concepts to a codebase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    /// Concepts whose code locations were replaced.
    pub concepts_linked: usize,

    /// Scanner counters.
    pub stats: ScanStats,
}

/// Statistics about a tenant's concepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Number of concepts.
    pub concepts: usize,

    /// Number of trees in the forest.
    pub roots: usize,

    /// Height of the tallest tree.
    pub max_depth: usize,

    /// Concept count per category.
    pub by_category: BTreeMap<Category, usize>,

    /// Concepts with at least one code location.
    pub linked: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use concept_store::{ConceptError, DictionaryExtractor};
    use crate::error::EngineError;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn engine(temp_dir: &TempDir) -> ConceptEngine {
        ConceptEngine::builder()
            .with_data_dir(temp_dir.path())
            .build()
    }

    #[tokio::test]
    async fn test_builder_pattern() {
        let temp_dir = TempDir::new().unwrap();

        let engine = ConceptEngine::builder()
            .with_config(EngineConfig::new("/unused"))
            .with_data_dir(temp_dir.path())
            .with_max_file_bytes(512)
            .build();

        assert_eq!(engine.config().data_dir, temp_dir.path());
        assert_eq!(engine.config().scan.max_file_bytes, 512);
        assert_eq!(engine.registry().data_dir(), temp_dir.path());
    }

    #[tokio::test]
    async fn test_ingest_records_provenance() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine(&temp_dir);
        let extractor = DictionaryExtractor::new()
            .with_concept(ExtractedConcept::new("Rust", Category::Language, "Systems language"))
            .with_concept(ExtractedConcept::new("Go", Category::Language, ""));

        let merged = engine
            .ingest("default", "Why does Rust have a borrow checker?", &extractor)
            .await
            .unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].chat_snippets.len(), 1);
        assert_eq!(
            merged[0].chat_snippets[0].text,
            "Why does Rust have a borrow checker?"
        );
        assert_eq!(engine.list("default").await.len(), 1);
    }

    struct FailingExtractor;

    #[async_trait::async_trait]
    impl ConceptExtractor for FailingExtractor {
        fn name(&self) -> &str {
            "failing"
        }

        async fn extract(&self, _text: &str) -> concept_store::Result<Vec<ExtractedConcept>> {
            Err(ConceptError::Extraction("model unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_failed_extraction_leaves_store_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine(&temp_dir);

        let err = engine
            .ingest("default", "anything", &FailingExtractor)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("model unavailable"));
        assert!(engine.list("default").await.is_empty());
        assert!(!engine.registry().tenant("default").await.read().await.file().exists());
    }

    struct ListExtractor(Vec<ExtractedConcept>);

    #[async_trait::async_trait]
    impl ConceptExtractor for ListExtractor {
        fn name(&self) -> &str {
            "list"
        }

        async fn extract(&self, _text: &str) -> concept_store::Result<Vec<ExtractedConcept>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_invalid_extraction_stores_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine(&temp_dir);
        let extractor = ListExtractor(vec![
            ExtractedConcept::new("Rust", Category::Language, ""),
            ExtractedConcept::new("  ", Category::Library, ""),
            ExtractedConcept::new("Tokio", Category::Library, ""),
        ]);

        let err = engine
            .ingest("default", "Rust with Tokio", &extractor)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Concept(ConceptError::InvalidOperation(_))
        ));
        assert!(engine.list("default").await.is_empty());
        assert!(!engine.registry().tenant("default").await.read().await.file().exists());
    }

    #[tokio::test]
    async fn test_stats() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine(&temp_dir);

        engine
            .add(
                "default",
                &ExtractedConcept::new("React", Category::Library, ""),
                None,
            )
            .await
            .unwrap();
        engine
            .add(
                "default",
                &ExtractedConcept::new("useState", Category::Library, "").with_parent("React"),
                None,
            )
            .await
            .unwrap();
        engine
            .add(
                "default",
                &ExtractedConcept::new("Rust", Category::Language, ""),
                None,
            )
            .await
            .unwrap();

        let stats = engine.stats("default").await;
        assert_eq!(stats.concepts, 3);
        assert_eq!(stats.roots, 2);
        assert_eq!(stats.max_depth, 2);
        assert_eq!(stats.by_category[&Category::Library], 2);
        assert_eq!(stats.by_category[&Category::Language], 1);
        assert_eq!(stats.linked, 0);
    }

    #[tokio::test]
    async fn test_not_found_errors() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine(&temp_dir);

        let err = engine
            .reparent("default", "missing", None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(engine.get("default", "missing").await.is_none());
        assert!(!engine.delete("default", "missing").await.unwrap());
    }
}
