//! The extraction boundary.
//!
//! Turning conversation text into concepts is done by an external
//! collaborator (usually an LLM call). The store only sees it through the
//! [`ConceptExtractor`] trait. [`DictionaryExtractor`] is a simple offline
//! implementation that recognizes a fixed set of known concepts.

use async_trait::async_trait;
use regex_lite::Regex;
use tracing::debug;

use crate::concept::ExtractedConcept;
use crate::error::Result;

/// Produces concepts from free text.
#[async_trait]
pub trait ConceptExtractor: Send + Sync {
    /// Name of this extractor, for logging.
    fn name(&self) -> &str;

    /// Extract the concepts mentioned in `text`.
    async fn extract(&self, text: &str) -> Result<Vec<ExtractedConcept>>;
}

/// Recognizes known concepts by case-insensitive whole-word match.
///
/// `Go` is found in "I like Go." but not in "good". A word boundary is the
/// text edge or any character outside `[A-Za-z0-9_]`, so names ending in
/// punctuation (`C++`) still match.
#[derive(Debug, Clone, Default)]
pub struct DictionaryExtractor {
    known: Vec<KnownConcept>,
}

#[derive(Debug, Clone)]
struct KnownConcept {
    concept: ExtractedConcept,
    pattern: Regex,
}

impl DictionaryExtractor {
    /// Create an extractor with no known concepts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a known concept.
    pub fn with_concept(mut self, concept: ExtractedConcept) -> Self {
        self.add(concept);
        self
    }

    /// Register a known concept. Concepts with an empty name are ignored.
    pub fn add(&mut self, concept: ExtractedConcept) {
        let name = concept.name.trim();
        if name.is_empty() {
            debug!("Ignoring known concept with an empty name");
            return;
        }

        let pattern = format!(
            r"(?i)(?:^|[^A-Za-z0-9_]){}(?:[^A-Za-z0-9_]|$)",
            regex_lite::escape(name)
        );
        match Regex::new(&pattern) {
            Ok(pattern) => self.known.push(KnownConcept { concept, pattern }),
            Err(err) => debug!("Ignoring known concept {name}: {err}"),
        }
    }
}

#[async_trait]
impl ConceptExtractor for DictionaryExtractor {
    fn name(&self) -> &str {
        "dictionary"
    }

    async fn extract(&self, text: &str) -> Result<Vec<ExtractedConcept>> {
        let found: Vec<ExtractedConcept> = self
            .known
            .iter()
            .filter(|known| known.pattern.is_match(text))
            .map(|known| known.concept.clone())
            .collect();

        debug!("Extracted {} concepts from text", found.len());
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::Category;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_dictionary_extraction() {
        let extractor = DictionaryExtractor::new()
            .with_concept(ExtractedConcept::new("useState", Category::Library, "state hook"))
            .with_concept(ExtractedConcept::new("Rust", Category::Language, "language"));

        let found = extractor
            .extract("How do I call USESTATE inside a component?")
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "useState");
    }

    #[tokio::test]
    async fn test_dictionary_matches_whole_words() {
        let extractor = DictionaryExtractor::new()
            .with_concept(ExtractedConcept::new("Go", Category::Language, "language"))
            .with_concept(ExtractedConcept::new("C++", Category::Language, "language"))
            .with_concept(ExtractedConcept::new(" ", Category::Language, "blank"));

        assert!(extractor.extract("This looks good to me").await.unwrap().is_empty());
        assert!(extractor.extract("cargo build").await.unwrap().is_empty());

        let found = extractor.extract("I like Go.").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Go");

        let found = extractor.extract("Porting c++ code").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "C++");
    }
}
