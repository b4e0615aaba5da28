//! Walking a codebase and locating concept names in it.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Instant;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::ScanOptions;
use crate::error::{Result, ScanError};

/// Matched line text longer than this is truncated.
pub const MAX_LINE_CHARS: usize = 200;

/// A concept to look for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTarget {
    /// Identifier the matches are reported under.
    pub id: String,

    /// Name searched for as a whole word.
    pub name: String,
}

impl ScanTarget {
    /// A target reported under `id` when `name` appears in a file.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One line of a file that mentions a concept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeLocation {
    /// Path relative to the scan root, with `/` separators.
    pub file: String,

    /// 1-based line number.
    pub line: usize,

    /// The trimmed line, truncated to [`MAX_LINE_CHARS`].
    pub text: String,
}

impl fmt::Display for CodeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Counters for a finished scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Files that were read and matched against.
    pub files_scanned: usize,

    /// Candidate files skipped (unreadable, not UTF-8, or too large).
    pub files_skipped: usize,

    /// Total number of locations found.
    pub matches: usize,

    /// Wall time of the scan.
    pub duration_ms: u64,
}

/// Locations per target id, plus counters.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Only targets with at least one match appear here.
    pub locations: HashMap<String, Vec<CodeLocation>>,

    /// Counters for the whole walk.
    pub stats: ScanStats,
}

/// Scan `options.root` for every target and return the locations by id.
pub fn scan(
    targets: &[ScanTarget],
    options: &ScanOptions,
) -> Result<HashMap<String, Vec<CodeLocation>>> {
    Ok(scan_report(targets, options)?.locations)
}

/// Like [`scan`], but also returns the scan counters.
///
/// Files are visited in file-name order and each file is read once. Within a
/// target, locations are ordered by file and then by line.
pub fn scan_report(targets: &[ScanTarget], options: &ScanOptions) -> Result<ScanReport> {
    let start = Instant::now();
    let root = options.root.as_path();
    check_root(root)?;

    let matchers: Vec<NameMatcher> = targets.iter().filter_map(NameMatcher::new).collect();
    let mut report = ScanReport::default();

    let walker = WalkDir::new(root)
        .follow_links(options.follow_symlinks)
        .max_depth(options.max_depth.unwrap_or(usize::MAX))
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !options.is_excluded_name(&entry.file_name().to_string_lossy())
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!("Skipping unreadable entry: {err}");
                continue;
            }
        };

        if !entry.file_type().is_file() || !options.includes_file(entry.path()) {
            continue;
        }

        let Some(content) = read_source(entry.path(), options.max_file_bytes) else {
            report.stats.files_skipped += 1;
            continue;
        };
        report.stats.files_scanned += 1;

        if matchers.is_empty() {
            continue;
        }

        let file = relative_path(root, entry.path());
        for (index, line) in content.lines().enumerate() {
            for matcher in &matchers {
                if !matcher.is_match(line) {
                    continue;
                }
                report
                    .locations
                    .entry(matcher.id.clone())
                    .or_default()
                    .push(CodeLocation {
                        file: file.clone(),
                        line: index + 1,
                        text: line.trim().chars().take(MAX_LINE_CHARS).collect(),
                    });
                report.stats.matches += 1;
            }
        }
    }

    let duration = start.elapsed();
    report.stats.duration_ms = duration.as_millis() as u64;
    info!(
        "Scanned {} files under {} in {:?} (skipped: {}, matches: {}, concepts: {})",
        report.stats.files_scanned,
        root.display(),
        duration,
        report.stats.files_skipped,
        report.stats.matches,
        report.locations.len()
    );

    Ok(report)
}

fn check_root(root: &Path) -> Result<()> {
    let unreadable = |source| ScanError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    };

    let metadata = fs::metadata(root).map_err(unreadable)?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    fs::read_dir(root).map_err(unreadable)?;
    Ok(())
}

fn read_source(path: &Path, max_bytes: u64) -> Option<String> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.len() > max_bytes => {
            debug!(
                "Skipping {} ({} bytes exceeds limit)",
                path.display(),
                metadata.len()
            );
            return None;
        }
        Ok(_) => {}
        Err(err) => {
            debug!("Skipping {}: {err}", path.display());
            return None;
        }
    }

    match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(err) => {
            debug!("Skipping {}: {err}", path.display());
            None
        }
    }
}

fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Case-insensitive whole-word matcher for one name.
///
/// A word boundary is the line edge or any character outside
/// `[A-Za-z0-9_]`, so names ending in punctuation (`C++`, `C#`) still match.
struct NameMatcher {
    id: String,
    regex: Regex,
}

impl NameMatcher {
    fn new(target: &ScanTarget) -> Option<Self> {
        let name = target.name.trim();
        if name.is_empty() {
            debug!("Ignoring scan target {} with an empty name", target.id);
            return None;
        }

        let pattern = format!(
            r"(?i)(?:^|[^A-Za-z0-9_]){}(?:[^A-Za-z0-9_]|$)",
            regex_lite::escape(name)
        );
        match Regex::new(&pattern) {
            Ok(regex) => Some(Self {
                id: target.id.clone(),
                regex,
            }),
            Err(err) => {
                debug!("Ignoring scan target {name}: {err}");
                None
            }
        }
    }

    fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }
}
