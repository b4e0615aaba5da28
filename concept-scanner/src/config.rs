//! Configuration for codebase scans.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Files larger than this are skipped by default (1 MiB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;

/// Source file extensions scanned by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "rs", "ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "go", "java", "kt", "swift", "rb", "php",
    "c", "h", "cpp", "hpp", "cs", "scala", "vue", "svelte",
];

/// Directory and file names skipped by default.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    // Dependencies and build output
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    "vendor",
    "coverage",
    "__pycache__",
    "venv",
    // Version control and tooling
    ".git",
    ".svn",
    ".hg",
    ".next",
];

/// What to scan and what to leave out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Directory to walk.
    pub root: PathBuf,

    /// Lowercase extensions (without the dot) of files to read.
    pub include_extensions: BTreeSet<String>,

    /// Entry names that are skipped together with everything below them.
    pub exclude_names: BTreeSet<String>,

    /// Files larger than this many bytes are skipped.
    pub max_file_bytes: u64,

    /// Maximum depth to recurse (None = unlimited).
    pub max_depth: Option<usize>,

    /// Whether to follow symbolic links.
    pub follow_symlinks: bool,
}

impl ScanOptions {
    /// Options for scanning `root` with the default filters.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include_extensions: DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect(),
            exclude_names: DEFAULT_EXCLUDES.iter().map(ToString::to_string).collect(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_depth: None,
            follow_symlinks: false,
        }
    }

    /// Replace the set of included extensions.
    ///
    /// Extensions are matched case-insensitively and may be given with or
    /// without a leading dot.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.include_extensions = extensions
            .into_iter()
            .filter_map(|e| normalize_extension(e.as_ref()))
            .collect();
        self
    }

    /// Add one included extension.
    pub fn include_extension(mut self, extension: &str) -> Self {
        if let Some(extension) = normalize_extension(extension) {
            self.include_extensions.insert(extension);
        }
        self
    }

    /// Replace the set of excluded names.
    pub fn with_excludes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Add an excluded name.
    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.exclude_names.insert(name.into());
        self
    }

    /// Set the file size limit.
    pub fn with_max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = bytes;
        self
    }

    /// Set the maximum depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Enable following symbolic links.
    pub fn follow_symlinks(mut self) -> Self {
        self.follow_symlinks = true;
        self
    }

    /// Whether an entry with this file name is skipped.
    ///
    /// Hidden entries (leading `.`) are always skipped.
    pub fn is_excluded_name(&self, name: &str) -> bool {
        name.starts_with('.') || self.exclude_names.contains(name)
    }

    /// Whether a file's extension is in the include set.
    pub fn includes_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.include_extensions.contains(&ext.to_ascii_lowercase()))
    }
}

fn normalize_extension(extension: &str) -> Option<String> {
    let extension = extension.trim().trim_start_matches('.');
    if extension.is_empty() {
        None
    } else {
        Some(extension.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let options = ScanOptions::new("/project");

        assert_eq!(options.root, Path::new("/project"));
        assert_eq!(options.include_extensions.len(), DEFAULT_EXTENSIONS.len());
        assert_eq!(options.max_file_bytes, DEFAULT_MAX_FILE_BYTES);
        assert!(options.is_excluded_name("node_modules"));
        assert!(options.is_excluded_name(".env"));
        assert!(!options.is_excluded_name("src"));
    }

    #[test]
    fn test_extension_matching() {
        let options = ScanOptions::new("/project").with_extensions([".RS", "md", " "]);

        let expected: BTreeSet<String> = ["md", "rs"].iter().map(ToString::to_string).collect();
        assert_eq!(options.include_extensions, expected);
        assert!(options.includes_file(Path::new("src/Main.Rs")));
        assert!(options.includes_file(Path::new("README.md")));
        assert!(!options.includes_file(Path::new("index.ts")));
        assert!(!options.includes_file(Path::new("Makefile")));
    }

    #[test]
    fn test_builder() {
        let options = ScanOptions::new("/project")
            .with_excludes(["generated"])
            .exclude("fixtures")
            .include_extension(".toml")
            .with_max_file_bytes(10)
            .with_max_depth(2)
            .follow_symlinks();

        assert!(options.is_excluded_name("generated"));
        assert!(options.is_excluded_name("fixtures"));
        assert!(!options.is_excluded_name("node_modules"));
        assert!(options.includes_file(Path::new("Cargo.toml")));
        assert_eq!(options.max_file_bytes, 10);
        assert_eq!(options.max_depth, Some(2));
        assert!(options.follow_symlinks);
    }
}
