//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Async code in the core, daemon and TUI MUST NOT use blocking I/O.
//! **Required**: Use `tokio::fs`, `tokio::net`, `tokio::process`, not `std::fs`, `std::net`, `std::process`
//!
//! Synchronous functions (logging setup before the event loop, for example)
//! and `#[cfg(test)]` modules are exempt.

use architectural_enforcement::{code_part, is_in_async_function, production_sources};

/// Test that async production code does not use blocking I/O
#[test]
fn test_no_blocking_io_in_production_code() {
    let violations = find_blocking_io_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking I/O calls found in production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {}", violation);
        }

        eprintln!("\n❌ FORBIDDEN blocking I/O:");
        eprintln!("  - std::fs::read(), std::fs::write(), std::fs::File");
        eprintln!("  - std::net::TcpStream, std::net::TcpListener");
        eprintln!("  - std::process::Command::output()");
        eprintln!("  - reqwest::blocking::*");
        eprintln!("\n✅ REQUIRED async I/O:");
        eprintln!("  - tokio::fs::read().await, tokio::fs::write().await");
        eprintln!("  - tokio::net::TcpListener::bind().await");
        eprintln!("  - reqwest::Client::get().send().await");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Find all blocking I/O calls in async production code
fn find_blocking_io_violations() -> Vec<String> {
    let mut violations = Vec::new();

    for file in production_sources() {
        let lines = file.line_refs();

        for idx in 0..file.test_boundary() {
            let code = code_part(lines[idx]);

            if code.contains("reqwest::blocking") {
                violations.push(format!("Blocking HTTP client: {}", file.describe(idx)));
                continue;
            }

            // Module-level imports make blocking calls easy to reach from async code
            let blocking_import = code.trim_start().starts_with("use std::fs")
                || code.trim_start().starts_with("use std::net");
            if blocking_import {
                violations.push(format!("Blocking I/O import: {}", file.describe(idx)));
                continue;
            }

            let blocking_call = code.contains("std::fs::")
                || code.contains("std::net::")
                || (code.contains("std::process::Command") && !code.contains("tokio::process"));
            if blocking_call && is_in_async_function(&lines, idx) {
                violations.push(format!("Blocking I/O in async: {}", file.describe(idx)));
            }
        }
    }

    violations
}
