//! Integration Test: Core Independence
//!
//! `danmu-core` is the headless engine shared by the daemon and every
//! surface. It must not pull in a terminal toolkit or a web framework.

use std::fs;

use architectural_enforcement::{manifest_depends_on, workspace_root};

const SURFACE_CRATES: &[&str] = &["ratatui", "crossterm", "axum", "tower", "hyper"];

#[test]
fn test_core_has_no_surface_dependencies() {
    let manifest = fs::read_to_string(workspace_root().join("danmu/core/Cargo.toml"))
        .expect("core manifest should be readable");

    let offenders: Vec<&str> = SURFACE_CRATES
        .iter()
        .copied()
        .filter(|name| manifest_depends_on(&manifest, name))
        .collect();

    assert!(
        offenders.is_empty(),
        "danmu-core must stay headless, found: {offenders:?}"
    );
}

#[test]
fn test_core_sources_do_not_reference_surfaces() {
    let src = workspace_root().join("danmu/core/src");
    for entry in walkdir::WalkDir::new(&src).into_iter().filter_map(|e| e.ok()) {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("rs") {
            continue;
        }
        let content = fs::read_to_string(entry.path()).unwrap_or_default();
        for name in SURFACE_CRATES {
            assert!(
                !content.contains(&format!("use {name}::")),
                "{} imports {name}",
                entry.path().display()
            );
        }
    }
}
