//! Concept types.
//!
//! A concept is a named unit of technical knowledge pulled out of a
//! conversation. Concepts reference their parent by *name*, so the parent
//! relation is a weak back-reference that is resolved fresh on every lookup.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConceptError;

/// What kind of knowledge a concept describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// A programming language (Rust, TypeScript, ...).
    Language,

    /// A library, framework, or API surface (React, useState, ...).
    Library,

    /// A design or coding pattern.
    Pattern,

    /// A system-level architectural idea.
    Architecture,
}

impl Category {
    /// All categories in presentation order.
    pub const ALL: [Category; 4] = [
        Category::Language,
        Category::Library,
        Category::Pattern,
        Category::Architecture,
    ];

    /// The serialized name of the category.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Language => "language",
            Self::Library => "library",
            Self::Pattern => "pattern",
            Self::Architecture => "architecture",
        }
    }

    /// Heading used when grouping concepts by category.
    pub fn heading(self) -> &'static str {
        match self {
            Self::Language => "Languages",
            Self::Library => "Libraries",
            Self::Pattern => "Patterns",
            Self::Architecture => "Architecture",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ConceptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "language" | "languages" => Ok(Self::Language),
            "library" | "libraries" => Ok(Self::Library),
            "pattern" | "patterns" => Ok(Self::Pattern),
            "architecture" | "architectures" => Ok(Self::Architecture),
            other => Err(ConceptError::InvalidOperation(format!(
                "unknown category: {other}"
            ))),
        }
    }
}

/// A timestamped excerpt showing where a concept was discussed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSnippet {
    /// When the excerpt was recorded.
    pub timestamp: DateTime<Utc>,

    /// The excerpt itself.
    pub text: String,
}

impl ChatSnippet {
    /// Maximum number of characters kept from the provenance text.
    pub const MAX_CHARS: usize = 500;

    /// Record an excerpt taken now.
    pub fn new(text: &str) -> Self {
        Self::at(text, Utc::now())
    }

    /// Record an excerpt with an explicit timestamp.
    pub fn at(text: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            text: text.trim().chars().take(Self::MAX_CHARS).collect(),
        }
    }
}

/// A concept as produced by the extraction collaborator.
///
/// This is the only input shape accepted by add-with-merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedConcept {
    /// Concept name.
    pub name: String,

    /// Concept category.
    pub category: Category,

    /// Free-text explanation.
    #[serde(default)]
    pub explanation: String,

    /// Name of the parent concept, if the extractor proposed one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl ExtractedConcept {
    /// Create a new extracted concept.
    pub fn new(
        name: impl Into<String>,
        category: Category,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            explanation: explanation.into(),
            parent: None,
        }
    }

    /// Set the proposed parent.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

/// A concept stored in the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    /// Unique identifier, immutable once assigned.
    pub id: String,

    /// Display name; the join key for hierarchy and deduplication.
    pub name: String,

    /// What kind of knowledge this is.
    pub category: Category,

    /// Name of the parent concept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Free-text description.
    #[serde(default)]
    pub explanation: String,

    /// Provenance records in chronological order.
    #[serde(default)]
    pub chat_snippets: Vec<ChatSnippet>,

    /// `file:line` locations in the linked codebase.
    #[serde(default)]
    pub code_locations: BTreeSet<String>,

    /// When the concept was created.
    pub first_seen: DateTime<Utc>,

    /// When the concept was last touched.
    pub last_seen: DateTime<Utc>,
}

impl Concept {
    /// Create a new concept from an extraction result.
    pub fn from_extracted(extracted: &ExtractedConcept) -> Self {
        let now = Utc::now();
        let name = extracted.name.trim().to_string();
        let parent = extracted
            .parent
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty() && !names_equal(p, &name))
            .map(str::to_string);

        Self {
            id: Uuid::new_v4().to_string(),
            name,
            category: extracted.category,
            parent,
            explanation: extracted.explanation.clone(),
            chat_snippets: Vec::new(),
            code_locations: BTreeSet::new(),
            first_seen: now,
            last_seen: now,
        }
    }

    /// Case-insensitive name comparison.
    pub fn has_name(&self, name: &str) -> bool {
        names_equal(&self.name, name)
    }

    /// The parent name, if set and non-empty.
    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref().filter(|p| !p.trim().is_empty())
    }

    /// Bump `last_seen`. Never moves it backwards.
    pub fn touch(&mut self) {
        let now = Utc::now();
        if now > self.last_seen {
            self.last_seen = now;
        }
    }

    /// Append a provenance record.
    pub fn add_snippet(&mut self, text: &str) {
        self.chat_snippets.push(ChatSnippet::new(text));
        self.touch();
    }

    /// Union new code locations into the existing set.
    pub fn add_code_locations<I, S>(&mut self, locations: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.code_locations
            .extend(locations.into_iter().map(Into::into));
        self.touch();
    }

    /// Replace the code locations wholesale.
    pub fn set_code_locations<I, S>(&mut self, locations: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.code_locations = locations.into_iter().map(Into::into).collect();
        self.touch();
    }

    /// Whether the query matches the name or explanation (case-insensitive).
    pub(crate) fn matches_text(&self, query_lower: &str) -> bool {
        self.name.to_lowercase().contains(query_lower)
            || self.explanation.to_lowercase().contains(query_lower)
    }
}

/// Case-insensitive name equality used for every name-keyed lookup.
pub fn names_equal(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Normalized form of a name used as a map key.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}
