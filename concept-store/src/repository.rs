//! The concept repository: the only code path that mutates a store.
//!
//! Every successful mutation rewrites the tenant's document. Mutations are
//! staged on a copy of the store and only replace the cached store once the
//! save has succeeded, so a rejected operation or a failed write leaves both
//! memory and disk untouched.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::concept::{Category, ChatSnippet, Concept, ExtractedConcept, name_key, names_equal};
use crate::error::{ConceptError, Result};
use crate::storage::{Store, StoreFile};

/// A partial update to a concept.
///
/// Each field is either absent (`None`, left unchanged) or present. A present
/// empty explanation clears the explanation; nothing is inferred from
/// "falsy" values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptUpdate {
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// New explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,

    /// Locations to union into the existing set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_locations: Option<Vec<String>>,

    /// Provenance text to append.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl ConceptUpdate {
    /// An update that changes nothing but `last_seen`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rename the concept.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replace the explanation.
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Add code locations.
    pub fn with_code_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.code_locations = Some(locations.into_iter().map(Into::into).collect());
        self
    }

    /// Append a provenance snippet.
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

/// CRUD, lookup and hierarchy maintenance over one tenant's store.
pub struct ConceptRepository {
    file: StoreFile,
    store: Store,
}

impl ConceptRepository {
    /// Open the repository backed by the given document.
    ///
    /// A missing or unreadable document yields an empty repository.
    pub fn open(file: StoreFile) -> Self {
        let store = file.load();
        Self { file, store }
    }

    /// The backing document.
    pub fn file(&self) -> &StoreFile {
        &self.file
    }

    /// The cached store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// All concepts in insertion order.
    pub fn list(&self) -> &[Concept] {
        &self.store.concepts
    }

    /// Number of concepts.
    pub fn len(&self) -> usize {
        self.store.concepts.len()
    }

    /// Whether the store has no concepts.
    pub fn is_empty(&self) -> bool {
        self.store.concepts.is_empty()
    }

    /// Get a concept by id.
    pub fn get(&self, id: &str) -> Option<&Concept> {
        self.store.concepts.iter().find(|c| c.id == id)
    }

    /// Find a concept by name (case-insensitive, first match wins).
    pub fn find_by_name(&self, name: &str) -> Option<&Concept> {
        find_by_name(&self.store.concepts, name)
    }

    /// Case-insensitive substring search over name and explanation.
    ///
    /// An empty query matches every concept; `category` further restricts
    /// the results.
    pub fn search(&self, query: &str, category: Option<Category>) -> Vec<&Concept> {
        let query_lower = query.trim().to_lowercase();
        self.store
            .concepts
            .iter()
            .filter(|c| category.is_none_or(|cat| c.category == cat))
            .filter(|c| query_lower.is_empty() || c.matches_text(&query_lower))
            .collect()
    }

    /// Parent chain of a concept, nearest first.
    ///
    /// Stops at a dangling reference or at the first revisited name.
    pub fn ancestors(&self, id: &str) -> Vec<&Concept> {
        let mut ancestors = Vec::new();
        let Some(concept) = self.get(id) else {
            return ancestors;
        };

        let mut visited = HashSet::from([name_key(&concept.name)]);
        let mut current = concept.parent_name();
        while let Some(name) = current {
            if !visited.insert(name_key(name)) {
                break;
            }
            let Some(parent) = self.find_by_name(name) else {
                break;
            };
            ancestors.push(parent);
            current = parent.parent_name();
        }

        ancestors
    }

    /// Create a concept, rejecting duplicate names.
    pub fn create(&mut self, extracted: &ExtractedConcept) -> Result<Concept> {
        let name = validate_name(&extracted.name)?;
        if self.find_by_name(name).is_some() {
            return Err(ConceptError::Conflict(name.to_string()));
        }

        let mut concept = Concept::from_extracted(extracted);
        if let Some(parent) = extracted.parent.as_deref().map(str::trim) {
            if names_equal(parent, name) {
                return Err(ConceptError::InvalidOperation(format!(
                    "{name} cannot be its own parent"
                )));
            }
            if !parent.is_empty() {
                let resolved = self
                    .find_by_name(parent)
                    .ok_or_else(|| ConceptError::NotFound(parent.to_string()))?;
                if would_create_cycle(&self.store.concepts, name, &resolved.name) {
                    return Err(cycle_error(name, &resolved.name));
                }
                concept.parent = Some(resolved.name.clone());
            }
        }

        let created = self.commit(move |store| {
            store.concepts.push(concept.clone());
            Ok(concept)
        })?;
        info!("Created concept {} ({})", created.name, created.category);
        Ok(created)
    }

    /// Add an extracted concept, merging into an existing one by name.
    ///
    /// A name collision never creates a second concept: the existing one
    /// gains a provenance snippet (when text is supplied) and a fresh
    /// `last_seen`. The parent may name a concept that does not exist yet.
    pub fn add_from_extraction(
        &mut self,
        extracted: &ExtractedConcept,
        provenance: Option<&str>,
    ) -> Result<Concept> {
        let (concept, created) =
            self.commit(|store| merge_extraction(&mut store.concepts, extracted, provenance))?;
        if created {
            info!("Created concept {} ({})", concept.name, concept.category);
        }
        Ok(concept)
    }

    /// Add a batch of extracted concepts in a single commit.
    ///
    /// Each entry is merged as by [`add_from_extraction`](Self::add_from_extraction),
    /// in order, so later entries see earlier ones. If any entry is invalid
    /// nothing is stored.
    pub fn add_all_from_extraction(
        &mut self,
        batch: &[ExtractedConcept],
        provenance: Option<&str>,
    ) -> Result<Vec<Concept>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let merged = self.commit(|store| {
            batch
                .iter()
                .map(|extracted| merge_extraction(&mut store.concepts, extracted, provenance))
                .collect::<Result<Vec<_>>>()
        })?;

        let created = merged.iter().filter(|(_, created)| *created).count();
        info!(
            "Stored {} extracted concepts ({created} new)",
            merged.len()
        );
        Ok(merged.into_iter().map(|(concept, _)| concept).collect())
    }

    /// Apply a partial update.
    pub fn update(&mut self, id: &str, update: ConceptUpdate) -> Result<Concept> {
        let index = self.index_of(id)?;

        let new_name = match update.name.as_deref() {
            Some(name) => {
                let name = validate_name(name)?.to_string();
                self.check_rename(index, &name)?;
                Some(name)
            }
            None => None,
        };

        let snippet = match update.snippet.as_deref().map(str::trim) {
            Some("") => {
                return Err(ConceptError::InvalidOperation(
                    "snippet text is empty".to_string(),
                ));
            }
            other => other.map(str::to_string),
        };

        self.commit(move |store| {
            let concept = &mut store.concepts[index];
            if let Some(name) = new_name {
                debug!("Renaming concept {} to {name}", concept.name);
                concept.name = name;
            }
            if let Some(explanation) = update.explanation {
                concept.explanation = explanation;
            }
            if let Some(locations) = update.code_locations {
                concept.add_code_locations(locations);
            }
            if let Some(text) = snippet {
                concept.add_snippet(&text);
            }
            concept.touch();
            Ok(concept.clone())
        })
    }

    /// Replace the code locations of several concepts in a single save.
    ///
    /// Unknown ids are skipped. Returns how many concepts were updated.
    pub fn replace_code_locations<I>(&mut self, updates: I) -> Result<usize>
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let updates: Vec<(usize, Vec<String>)> = updates
            .into_iter()
            .filter_map(|(id, locations)| match self.index_of(&id) {
                Ok(index) => Some((index, locations)),
                Err(_) => {
                    debug!("Skipping locations for removed concept {id}");
                    None
                }
            })
            .collect();

        if updates.is_empty() {
            return Ok(0);
        }

        self.commit(move |store| {
            let count = updates.len();
            for (index, locations) in updates {
                store.concepts[index].set_code_locations(locations);
            }
            Ok(count)
        })
    }

    /// Delete a concept. Children keep their (now dangling) parent name.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let Ok(index) = self.index_of(id) else {
            return Ok(false);
        };

        self.commit(|store| {
            let removed = store.concepts.remove(index);
            info!("Deleted concept {}", removed.name);
            Ok(true)
        })
    }

    /// Move a concept under a new parent, or detach it with `None`.
    pub fn reparent(&mut self, id: &str, new_parent: Option<&str>) -> Result<Concept> {
        let index = self.index_of(id)?;

        let parent = match new_parent {
            None => None,
            Some(name) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(ConceptError::InvalidOperation(
                        "parent name is empty".to_string(),
                    ));
                }
                let parent = self
                    .find_by_name(name)
                    .ok_or_else(|| ConceptError::NotFound(name.to_string()))?;
                let child_name = &self.store.concepts[index].name;
                if would_create_cycle(&self.store.concepts, child_name, &parent.name) {
                    return Err(cycle_error(child_name, &parent.name));
                }
                Some(parent.name.clone())
            }
        };

        self.commit(move |store| {
            let concept = &mut store.concepts[index];
            debug!(
                "Reparenting {} from {:?} to {:?}",
                concept.name, concept.parent, parent
            );
            concept.parent = parent;
            concept.touch();
            Ok(concept.clone())
        })
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.store
            .concepts
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| ConceptError::NotFound(id.to_string()))
    }

    fn check_rename(&self, index: usize, new_name: &str) -> Result<()> {
        let concept = &self.store.concepts[index];
        if let Some(other) = self.find_by_name(new_name) {
            if other.id != concept.id {
                return Err(ConceptError::Conflict(new_name.to_string()));
            }
        }
        if let Some(parent) = concept.parent_name() {
            if would_create_cycle(&self.store.concepts, new_name, parent) {
                return Err(cycle_error(new_name, parent));
            }
        }
        Ok(())
    }

    /// Stage a mutation on a copy, persist it, then swap it in.
    fn commit<T>(&mut self, op: impl FnOnce(&mut Store) -> Result<T>) -> Result<T> {
        let mut working = self.store.clone();
        let out = op(&mut working)?;
        self.file.save(&mut working)?;
        self.store = working;
        Ok(out)
    }
}

/// Merge one extraction into `concepts`. Returns the stored concept and
/// whether it was newly created.
fn merge_extraction(
    concepts: &mut Vec<Concept>,
    extracted: &ExtractedConcept,
    provenance: Option<&str>,
) -> Result<(Concept, bool)> {
    let name = validate_name(&extracted.name)?;
    let provenance = provenance.map(str::trim).filter(|t| !t.is_empty());

    if let Some(index) = position_by_name(concepts, name) {
        debug!("Merging extraction into existing concept: {name}");
        let concept = &mut concepts[index];
        match provenance {
            Some(text) => concept.add_snippet(text),
            None => concept.touch(),
        }
        return Ok((concept.clone(), false));
    }

    let mut concept = Concept::from_extracted(extracted);
    if let Some(parent) = concept.parent.clone() {
        if would_create_cycle(concepts, &concept.name, &parent) {
            warn!(
                "Dropping parent {parent} of extracted concept {}: it would create a cycle",
                concept.name
            );
            concept.parent = None;
        }
    }
    if let Some(text) = provenance {
        concept
            .chat_snippets
            .push(ChatSnippet::at(text, concept.first_seen));
    }

    concepts.push(concept.clone());
    Ok((concept, true))
}

/// Find a concept by name (case-insensitive, first match wins).
pub fn find_by_name<'a>(concepts: &'a [Concept], name: &str) -> Option<&'a Concept> {
    concepts.iter().find(|c| c.has_name(name))
}

fn position_by_name(concepts: &[Concept], name: &str) -> Option<usize> {
    concepts.iter().position(|c| c.has_name(name))
}

/// Whether making `parent_name` the parent of `child_name` closes a cycle.
///
/// Walks the current parent chain upward from the prospective parent. Reaching
/// the child's name, or revisiting any name, counts as a cycle.
pub fn would_create_cycle(concepts: &[Concept], child_name: &str, parent_name: &str) -> bool {
    let mut visited = HashSet::new();
    let mut current = Some(parent_name);

    while let Some(name) = current {
        if names_equal(name, child_name) || !visited.insert(name_key(name)) {
            return true;
        }
        current = find_by_name(concepts, name).and_then(Concept::parent_name);
    }

    false
}

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ConceptError::InvalidOperation(
            "concept name is empty".to_string(),
        ));
    }
    Ok(name)
}

fn cycle_error(child: &str, parent: &str) -> ConceptError {
    ConceptError::InvalidOperation(format!(
        "placing {child} under {parent} would create a cycle"
    ))
}
