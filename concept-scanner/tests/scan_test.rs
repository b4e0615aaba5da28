//! Integration tests for scanning a project tree.

use std::fs;
use std::path::Path;

use concept_scanner::{CodeLocation, ScanOptions, ScanTarget, scan, scan_report};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn test_two_file_project() {
    init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    write(
        root,
        "A.tsx",
        "import React from 'react';\n\nexport function Counter() {\n  // state\n  const [n, setN] = useState(0);\n  return n;\n}\n",
    );
    write(root, "B.tsx", "export const label = 'no hooks here';\n");

    let found = scan(
        &[ScanTarget::new("use-state", "useState")],
        &ScanOptions::new(root),
    )
    .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(
        found["use-state"],
        vec![CodeLocation {
            file: "A.tsx".to_string(),
            line: 5,
            text: "const [n, setN] = useState(0);".to_string(),
        }]
    );
    assert_eq!(found["use-state"][0].to_string(), "A.tsx:5");
}

#[test]
fn test_realistic_layout() {
    init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    write(root, "src/main.rs", "use tokio::runtime;\n\n#[tokio::main]\nasync fn main() {}\n");
    write(root, "src/server/mod.rs", "// Tokio based server\n");
    write(root, "target/debug/build.rs", "tokio");
    write(root, ".git/hooks/pre-commit.rs", "tokio");
    write(root, "docs/notes.txt", "tokio");
    write(root, "scripts/Build.PY", "import tokio_shim\n");

    let targets = vec![
        ScanTarget::new("tokio", "Tokio"),
        ScanTarget::new("async", "async"),
    ];
    let report = scan_report(&targets, &ScanOptions::new(root)).unwrap();

    let tokio: Vec<String> = report.locations["tokio"]
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        tokio,
        vec!["src/main.rs:1", "src/main.rs:3", "src/server/mod.rs:1"]
    );

    let async_locations: Vec<String> = report.locations["async"]
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(async_locations, vec!["src/main.rs:4"]);

    assert_eq!(report.stats.files_scanned, 3);
    assert_eq!(report.stats.matches, 4);
}

#[test]
fn test_extension_override() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    write(root, "notes.md", "Remember the Builder pattern\n");
    write(root, "lib.rs", "struct Builder;\n");

    let options = ScanOptions::new(root).with_extensions([".md"]);
    let found = scan(&[ScanTarget::new("b", "builder")], &options).unwrap();

    let files: Vec<&str> = found["b"].iter().map(|l| l.file.as_str()).collect();
    assert_eq!(files, vec!["notes.md"]);
}

#[test]
fn test_no_targets_yields_empty_map() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "lib.rs", "fn main() {}\n");

    let report = scan_report(&[], &ScanOptions::new(temp_dir.path())).unwrap();
    assert!(report.locations.is_empty());
    assert_eq!(report.stats.files_scanned, 1);
}
