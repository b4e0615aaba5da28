//! Document export.
//!
//! Concepts can be exported as a JSON data document (lossless for every
//! included field) or as a Markdown narrative built from the forest view.

use std::fmt::Write as _;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::concept::{Category, ChatSnippet, Concept};
use crate::error::{ConceptError, Result};
use crate::tree::{TreeNode, build_forest, depth_first};

/// Deepest Markdown heading level used for nested concepts.
pub const MAX_HEADING_LEVEL: usize = 6;

/// Heading level of root concepts (categories use level 2).
const ROOT_HEADING_LEVEL: usize = 3;

/// Most code locations listed per concept in a narrative export.
pub const MAX_NARRATIVE_LOCATIONS: usize = 10;

/// Most snippets listed per concept in a narrative export.
pub const MAX_NARRATIVE_SNIPPETS: usize = 3;

/// Snippet text longer than this is truncated in a narrative export.
pub const MAX_SNIPPET_CHARS: usize = 200;

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Structured JSON document.
    #[default]
    #[serde(alias = "data")]
    Json,

    /// Markdown narrative grouped by category.
    #[serde(alias = "md", alias = "narrative")]
    Markdown,
}

impl FromStr for ExportFormat {
    type Err = ConceptError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" | "data" => Ok(Self::Json),
            "markdown" | "md" | "narrative" => Ok(Self::Markdown),
            other => Err(ConceptError::InvalidOperation(format!(
                "unknown export format: {other}"
            ))),
        }
    }
}

/// What to export and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    /// Output format.
    pub format: ExportFormat,

    /// Include provenance snippets.
    pub include_snippets: bool,

    /// Include code locations.
    pub include_code_locations: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Json,
            include_snippets: true,
            include_code_locations: true,
        }
    }
}

impl ExportOptions {
    /// Default options for the given format.
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// Include or omit provenance snippets.
    pub fn with_snippets(mut self, include: bool) -> Self {
        self.include_snippets = include;
        self
    }

    /// Include or omit code locations.
    pub fn with_code_locations(mut self, include: bool) -> Self {
        self.include_code_locations = include;
        self
    }
}

/// A concept as it appears in a data export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedConcept {
    /// Stable concept id.
    pub id: String,

    /// Display name.
    pub name: String,

    pub category: Category,

    /// Parent name, omitted for roots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    pub explanation: String,

    /// When the concept was first stored.
    pub first_seen: DateTime<Utc>,

    /// When the concept was last mentioned or edited.
    pub last_seen: DateTime<Utc>,

    /// Provenance snippets; absent when the export omits them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_snippets: Option<Vec<ChatSnippet>>,

    /// `path:line` locations; absent when the export omits them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_locations: Option<Vec<String>>,
}

impl ExportedConcept {
    fn from_concept(concept: &Concept, options: &ExportOptions) -> Self {
        Self {
            id: concept.id.clone(),
            name: concept.name.clone(),
            category: concept.category,
            parent: concept.parent.clone(),
            explanation: concept.explanation.clone(),
            first_seen: concept.first_seen,
            last_seen: concept.last_seen,
            chat_snippets: options
                .include_snippets
                .then(|| concept.chat_snippets.clone()),
            code_locations: options
                .include_code_locations
                .then(|| concept.code_locations.iter().cloned().collect()),
        }
    }
}

/// Envelope of a data export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataExport {
    /// When the export was produced.
    pub exported_at: DateTime<Utc>,

    /// Number of exported concepts.
    pub count: usize,

    /// The exported concepts.
    pub concepts: Vec<ExportedConcept>,
}

/// Render concepts in the requested format.
pub fn export(concepts: &[Concept], options: &ExportOptions) -> Result<String> {
    match options.format {
        ExportFormat::Json => export_data(concepts, options),
        ExportFormat::Markdown => Ok(export_narrative(concepts, options)),
    }
}

/// Render concepts as a JSON data document.
pub fn export_data(concepts: &[Concept], options: &ExportOptions) -> Result<String> {
    let document = DataExport {
        exported_at: Utc::now(),
        count: concepts.len(),
        concepts: concepts
            .iter()
            .map(|c| ExportedConcept::from_concept(c, options))
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Parse a document produced by [`export_data`].
pub fn parse_data_export(json: &str) -> Result<DataExport> {
    Ok(serde_json::from_str(json)?)
}

/// Render concepts as a Markdown narrative grouped by category.
pub fn export_narrative(concepts: &[Concept], options: &ExportOptions) -> String {
    let forest = build_forest(concepts);
    let mut out = String::new();

    let _ = writeln!(out, "# Concept Knowledge Base");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "_Exported {} · {} concepts_",
        Utc::now().format("%Y-%m-%d %H:%M UTC"),
        concepts.len()
    );

    for category in Category::ALL {
        let roots: Vec<TreeNode> = forest
            .iter()
            .filter(|node| node.concept.category == category)
            .cloned()
            .collect();
        if roots.is_empty() {
            continue;
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "## {}", category.heading());

        for (level, node) in depth_first(&roots) {
            render_concept(&mut out, &node.concept, level, options);
        }
    }

    out
}

fn render_concept(out: &mut String, concept: &Concept, level: usize, options: &ExportOptions) {
    let heading = (ROOT_HEADING_LEVEL + level).min(MAX_HEADING_LEVEL);

    let _ = writeln!(out);
    let _ = writeln!(out, "{} {}", "#".repeat(heading), concept.name);

    if !concept.explanation.trim().is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", concept.explanation.trim());
    }

    if let Some(parent) = concept.parent_name() {
        let _ = writeln!(out);
        let _ = writeln!(out, "_Part of: {parent}_");
    }

    if options.include_code_locations && !concept.code_locations.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "**Code locations:**");
        let _ = writeln!(out);
        for location in concept.code_locations.iter().take(MAX_NARRATIVE_LOCATIONS) {
            let _ = writeln!(out, "- `{location}`");
        }
        let hidden = concept
            .code_locations
            .len()
            .saturating_sub(MAX_NARRATIVE_LOCATIONS);
        if hidden > 0 {
            let _ = writeln!(out, "- …and {hidden} more");
        }
    }

    if options.include_snippets && !concept.chat_snippets.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "**From conversations:**");
        let _ = writeln!(out);
        for snippet in concept
            .chat_snippets
            .iter()
            .rev()
            .take(MAX_NARRATIVE_SNIPPETS)
        {
            let _ = writeln!(
                out,
                "- {}: {}",
                snippet.timestamp.format("%Y-%m-%d"),
                truncate_chars(&single_line(&snippet.text), MAX_SNIPPET_CHARS)
            );
        }
        let hidden = concept
            .chat_snippets
            .len()
            .saturating_sub(MAX_NARRATIVE_SNIPPETS);
        if hidden > 0 {
            let _ = writeln!(out, "- …and {hidden} more");
        }
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut `text` to `max` characters, marking the cut with `...`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::ExtractedConcept;
    use pretty_assertions::assert_eq;

    fn concept(name: &str, category: Category, parent: Option<&str>) -> Concept {
        let mut extracted = ExtractedConcept::new(name, category, format!("{name} explained"));
        extracted.parent = parent.map(str::to_string);
        Concept::from_extracted(&extracted)
    }

    #[test]
    fn test_data_export_round_trip() {
        let mut hooks = concept("React Hooks", Category::Library, None);
        hooks.add_snippet("what are hooks?");
        hooks.add_code_locations(["src/App.tsx:3"]);
        let state = concept("useState", Category::Library, Some("React Hooks"));
        let concepts = vec![hooks, state];

        let json = export(&concepts, &ExportOptions::default()).unwrap();
        let parsed = parse_data_export(&json).unwrap();

        assert_eq!(parsed.count, 2);
        for (exported, original) in parsed.concepts.iter().zip(&concepts) {
            assert_eq!(exported.id, original.id);
            assert_eq!(exported.name, original.name);
            assert_eq!(exported.category, original.category);
            assert_eq!(exported.parent, original.parent);
            assert_eq!(exported.explanation, original.explanation);
            assert_eq!(exported.first_seen, original.first_seen);
        }
        assert_eq!(
            parsed.concepts[0].chat_snippets.as_ref().unwrap(),
            &concepts[0].chat_snippets
        );
        assert_eq!(
            parsed.concepts[0].code_locations.as_deref(),
            Some(&["src/App.tsx:3".to_string()][..])
        );
    }

    #[test]
    fn test_data_export_omits_excluded_fields() {
        let concepts = vec![concept("Rust", Category::Language, None)];
        let options = ExportOptions::default()
            .with_snippets(false)
            .with_code_locations(false);

        let json = export(&concepts, &options).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let record = &value["concepts"][0];

        assert!(record.get("chatSnippets").is_none());
        assert!(record.get("codeLocations").is_none());
        assert!(record.get("parent").is_none());
        assert!(value.get("exportedAt").is_some());
    }

    #[test]
    fn test_narrative_groups_and_nests() {
        let concepts = vec![
            concept("Observer", Category::Pattern, None),
            concept("useState", Category::Library, Some("React Hooks")),
            concept("React Hooks", Category::Library, None),
            concept("Rust", Category::Language, None),
        ];

        let md = export(&concepts, &ExportOptions::new(ExportFormat::Markdown)).unwrap();

        let languages = md.find("## Languages").unwrap();
        let libraries = md.find("## Libraries").unwrap();
        let patterns = md.find("## Patterns").unwrap();
        assert!(languages < libraries && libraries < patterns);
        assert!(!md.contains("## Architecture"));

        assert!(md.contains("### React Hooks"));
        assert!(md.contains("#### useState"));
        assert!(md.contains("_Part of: React Hooks_"));
        assert!(md.contains("4 concepts"));
    }

    #[test]
    fn test_narrative_heading_depth_is_capped() {
        let names = ["L0", "L1", "L2", "L3", "L4", "L5"];
        let concepts: Vec<Concept> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let parent = i.checked_sub(1).map(|p| names[p]);
                concept(name, Category::Architecture, parent)
            })
            .collect();

        let md = export_narrative(&concepts, &ExportOptions::new(ExportFormat::Markdown));
        assert!(md.contains("\n### L0\n"));
        assert!(md.contains("\n###### L3\n"));
        assert!(md.contains("\n###### L5\n"));
        assert!(!md.contains("#######"));
    }

    #[test]
    fn test_narrative_truncates_snippets_and_locations() {
        let mut rust = concept("Rust", Category::Language, None);
        for i in 0..5 {
            rust.add_snippet(&format!("snippet {i} {}", "y".repeat(300)));
        }
        rust.add_code_locations((0..12).map(|i| format!("src/f{i:02}.rs:1")));

        let md = export_narrative(&[rust], &ExportOptions::new(ExportFormat::Markdown));

        assert!(md.contains("snippet 4"));
        assert!(md.contains("snippet 2"));
        assert!(!md.contains("snippet 1"));
        assert!(md.contains("- …and 2 more"));
        assert!(md.contains("`src/f09.rs:1`"));
        assert!(!md.contains("`src/f10.rs:1`"));
        assert!(md.contains("..."));
    }

    #[test]
    fn test_narrative_respects_include_flags() {
        let mut rust = concept("Rust", Category::Language, None);
        rust.add_snippet("ownership talk");
        rust.add_code_locations(["src/main.rs:1"]);

        let options = ExportOptions::new(ExportFormat::Markdown)
            .with_snippets(false)
            .with_code_locations(false);
        let md = export_narrative(&[rust], &options);

        assert!(!md.contains("ownership talk"));
        assert!(!md.contains("src/main.rs:1"));
    }

    #[test]
    fn test_export_format_parsing() {
        assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("pdf".parse::<ExportFormat>().is_err());

        let format: ExportFormat = serde_json::from_str("\"narrative\"").unwrap();
        assert_eq!(format, ExportFormat::Markdown);
        let format: ExportFormat = serde_json::from_str("\"data\"").unwrap();
        assert_eq!(format, ExportFormat::Json);
        assert_eq!(serde_json::to_string(&ExportFormat::Markdown).unwrap(), "\"markdown\"");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
    }
}
