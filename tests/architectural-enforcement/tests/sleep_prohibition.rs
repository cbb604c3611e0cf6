//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Neither production code nor its unit tests call sleep.
//! Periodic work uses `tokio::time::interval`; time-dependent logic takes a
//! `Clock` so tests can move time with `ManualClock` instead of waiting.

use architectural_enforcement::{code_part, production_sources};

/// Test that no source file contains sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let violations = find_sleep_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Sleep calls found in production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {}", violation);
        }

        eprintln!("\n✅ INSTEAD:");
        eprintln!("  - Periodic tasks: tokio::time::interval() with MissedTickBehavior::Skip");
        eprintln!("  - Waiting for results: channels, oneshot, select!");
        eprintln!("  - Tests: advance a ManualClock");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Find all sleep() calls, test modules included
fn find_sleep_violations() -> Vec<String> {
    let mut violations = Vec::new();

    for file in production_sources() {
        for (idx, line) in file.lines.iter().enumerate() {
            let code = code_part(line);
            if code.contains("::sleep(") || code.contains(".sleep(") {
                violations.push(file.describe(idx));
            }
        }
    }

    violations
}

#[test]
fn test_render_loop_is_driven_by_intervals() {
    let app = production_sources()
        .into_iter()
        .find(|f| f.path.ends_with("tui/src/app.rs"))
        .expect("tui/src/app.rs should exist");

    let intervals = app
        .lines
        .iter()
        .filter(|l| l.contains("tokio::time::interval("))
        .count();
    assert!(intervals >= 2, "poll and frame clocks should be intervals");
}
