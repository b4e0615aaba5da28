//! Configuration for the concept engine.

use std::path::{Path, PathBuf};

use concept_scanner::{DEFAULT_EXCLUDES, DEFAULT_EXTENSIONS, DEFAULT_MAX_FILE_BYTES, ScanOptions};
use concept_store::{ExportFormat, ExportOptions};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Configuration for the concept engine.
///
/// Every section is optional in TOML; missing values fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding one sub-directory per tenant.
    pub data_dir: PathBuf,

    /// Codebase scan settings.
    pub scan: ScanSettings,

    /// Export defaults.
    pub export: ExportSettings,
}

impl EngineConfig {
    /// Create a configuration storing tenants under `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            scan: ScanSettings::default(),
            export: ExportSettings::default(),
        }
    }

    /// Set the data directory.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Set the scan settings.
    pub fn with_scan(mut self, scan: ScanSettings) -> Self {
        self.scan = scan;
        self
    }

    /// Set the export defaults.
    pub fn with_export(mut self, export: ExportSettings) -> Self {
        self.export = export;
        self
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Read a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(dirs::data_dir().unwrap_or_default().join("concept-forest"))
    }
}

/// Which files a codebase scan reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// File extensions to read, with or without a leading dot.
    pub include_extensions: Vec<String>,

    /// Directory and file names to skip.
    pub exclude_names: Vec<String>,

    /// Files larger than this are skipped.
    pub max_file_bytes: u64,

    /// Whether to follow symbolic links.
    pub follow_symlinks: bool,
}

impl ScanSettings {
    /// Scan options for walking `root` with these settings.
    pub fn options_for(&self, root: impl Into<PathBuf>) -> ScanOptions {
        let options = ScanOptions::new(root)
            .with_extensions(&self.include_extensions)
            .with_excludes(self.exclude_names.iter().cloned())
            .with_max_file_bytes(self.max_file_bytes);

        if self.follow_symlinks {
            options.follow_symlinks()
        } else {
            options
        }
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            include_extensions: DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect(),
            exclude_names: DEFAULT_EXCLUDES.iter().map(ToString::to_string).collect(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            follow_symlinks: false,
        }
    }
}

/// Export defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Format used when a call does not name one.
    pub format: ExportFormat,

    /// Whether exports carry chat snippets.
    pub include_snippets: bool,

    /// Whether exports carry code locations.
    pub include_code_locations: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        let options = ExportOptions::default();
        Self {
            format: options.format,
            include_snippets: options.include_snippets,
            include_code_locations: options.include_code_locations,
        }
    }
}

impl From<ExportSettings> for ExportOptions {
    fn from(settings: ExportSettings) -> Self {
        ExportOptions::new(settings.format)
            .with_snippets(settings.include_snippets)
            .with_code_locations(settings.include_code_locations)
    }
}
