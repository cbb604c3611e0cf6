//! Architectural Enforcement Integration Tests
//!
//! Source scanners shared by the tests in `tests/`:
//! - No sleep() calls in production code
//! - No blocking I/O inside async functions
//! - No terminal or web dependencies in the core crate
//!
//! These tests are designed to catch violations early in the development cycle.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["danmu/core/src", "danmu/daemon/src", "tui/src"];

/// Workspace root (two levels above this crate)
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// A Rust source file read into lines
pub struct SourceFile {
    pub path: PathBuf,
    pub lines: Vec<String>,
}

impl SourceFile {
    /// Index of the first `#[cfg(test)]` line; everything after it is test code
    pub fn test_boundary(&self) -> usize {
        self.lines
            .iter()
            .position(|l| l.trim().starts_with("#[cfg(test)]"))
            .unwrap_or(self.lines.len())
    }

    /// Borrowed lines, for the context helpers
    pub fn line_refs(&self) -> Vec<&str> {
        self.lines.iter().map(String::as_str).collect()
    }

    /// `path:line - text` for a violation report
    pub fn describe(&self, idx: usize) -> String {
        format!(
            "{}:{} - {}",
            self.path.display(),
            idx + 1,
            self.lines[idx].trim()
        )
    }
}

/// Every `.rs` file under the production directories
pub fn production_sources() -> Vec<SourceFile> {
    let root = workspace_root();
    let mut files = Vec::new();

    for dir in PRODUCTION_DIRS {
        let path = root.join(dir);
        if !path.exists() {
            continue;
        }
        for entry in walkdir::WalkDir::new(&path)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.path().extension().and_then(|s| s.to_str()) != Some("rs") {
                continue;
            }
            if let Ok(content) = fs::read_to_string(entry.path()) {
                files.push(SourceFile {
                    path: entry.path().to_path_buf(),
                    lines: content.lines().map(str::to_string).collect(),
                });
            }
        }
    }

    files
}

/// The part of a line before any `//` comment
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

fn is_fn_line(line: &str) -> bool {
    let line = line
        .trim()
        .trim_start_matches("pub(crate) ")
        .trim_start_matches("pub ");
    line.starts_with("fn ") || line.starts_with("async fn ")
}

/// Check if line is inside an async function
pub fn is_in_async_function(lines: &[&str], current_idx: usize) -> bool {
    for i in (0..current_idx).rev() {
        let line = lines[i].trim();

        if is_fn_line(line) {
            return line.contains("async fn ");
        }

        // Stop at module/impl boundaries
        if line.starts_with("mod ") || (line.starts_with("impl") && line.contains('{')) {
            return false;
        }
    }
    false
}

/// Whether a manifest's `[dependencies]` table names `crate_name`
pub fn manifest_depends_on(manifest: &str, crate_name: &str) -> bool {
    let mut in_deps = false;
    for line in manifest.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_deps = line == "[dependencies]";
            continue;
        }
        if in_deps {
            let name = line.split(['=', '.', ' ']).next().unwrap_or("");
            if name == crate_name {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_async_function_detection() {
        let code = vec![
            "pub async fn load() {",
            "    let contents = std::fs::read_to_string(\"file.txt\")?;",
            "}",
        ];
        assert!(is_in_async_function(&code, 1));
    }

    #[test]
    fn test_sync_function_detection() {
        let code = vec![
            "fn init_logging() {",
            "    std::fs::create_dir_all(&dir)?;",
            "}",
        ];
        assert!(!is_in_async_function(&code, 1));
    }

    #[test]
    fn test_test_boundary() {
        let file = SourceFile {
            path: PathBuf::from("x.rs"),
            lines: vec!["fn a() {}".into(), "#[cfg(test)]".into(), "mod tests {}".into()],
        };
        assert_eq!(file.test_boundary(), 1);
    }

    #[test]
    fn test_manifest_dependency_lookup() {
        let manifest = "[dependencies]\ntokio = \"1\"\nserde.workspace = true\n\n[dev-dependencies]\ntempfile = \"3\"\n";
        assert!(manifest_depends_on(manifest, "tokio"));
        assert!(manifest_depends_on(manifest, "serde"));
        assert!(!manifest_depends_on(manifest, "tempfile"));
        assert!(!manifest_depends_on(manifest, "tokio-test"));
    }

    #[test]
    fn test_production_sources_found() {
        assert!(!production_sources().is_empty());
    }
}
