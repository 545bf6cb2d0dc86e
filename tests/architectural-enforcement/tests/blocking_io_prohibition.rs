//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: async code MUST NOT use blocking I/O.
//! **Required**: `tokio::io`, `tokio::fs`, `tokio::net`, `tokio::process`.
//! **Acceptable**: plain functions (config loading and CLI setup run before
//! the runtime starts) and test code.

use architectural_enforcement::{code_part, context_of, production_files, read_source, Context};

/// Test that production code does not use blocking I/O
#[test]
fn test_no_blocking_io_in_production_code() {
    let files = production_files();
    assert!(!files.is_empty(), "no production sources found");

    let violations = find_blocking_io_violations(&files);
    if !violations.is_empty() {
        eprintln!("\nBlocking I/O found in async code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nForbidden in async code:");
        eprintln!("  - std::fs::*, std::net::*");
        eprintln!("  - std::process::Command");
        eprintln!("  - std::io::stdin(), std::io::stdout()");
        eprintln!("\nRequired:");
        eprintln!("  - tokio::io::stdin() with BufReader, tokio::io::stdout()");
        eprintln!("  - tokio::fs, tokio::net, tokio::process");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.",
            violations.len()
        );
    }
}

fn find_blocking_io_violations(files: &[std::path::PathBuf]) -> Vec<String> {
    let mut violations = Vec::new();
    for path in files {
        let Some(content) = read_source(path) else {
            continue;
        };
        let lines: Vec<&str> = content.lines().collect();
        for (idx, line) in lines.iter().enumerate() {
            let code = code_part(line);
            let context = context_of(&lines, idx);
            if let Some(kind) = blocking_kind(code, context) {
                violations.push(format!(
                    "{}:{} - {kind}: {}",
                    path.display(),
                    idx + 1,
                    line.trim()
                ));
            }
        }
    }
    violations
}

/// What kind of blocking I/O `code` performs in `context`, if any
fn blocking_kind(code: &str, context: Context) -> Option<&'static str> {
    match context {
        Context::Test | Context::Sync => None,
        Context::Module => {
            (code.contains("use std::fs") || code.contains("use std::net")).then_some("Blocking import")
        }
        Context::Async => {
            if code.contains("std::fs::") {
                Some("Blocking file I/O")
            } else if code.contains("std::net::") {
                Some("Blocking network I/O")
            } else if code.contains("std::process::Command") {
                Some("Blocking process I/O")
            } else if code.contains("std::io::stdin()") || code.contains("std::io::stdout()") {
                Some("Blocking stdin/stdout")
            } else {
                None
            }
        }
    }
}

#[test]
fn test_blocking_detection() {
    assert_eq!(
        blocking_kind("let s = std::fs::read_to_string(p)?;", Context::Async),
        Some("Blocking file I/O")
    );
    assert_eq!(
        blocking_kind("let s = std::fs::read_to_string(p)?;", Context::Sync),
        None
    );
    assert_eq!(
        blocking_kind("let line = std::io::stdin().read_line(&mut buf);", Context::Async),
        Some("Blocking stdin/stdout")
    );
    assert_eq!(blocking_kind("use std::fs;", Context::Module), Some("Blocking import"));
    assert_eq!(
        blocking_kind("let mut lines = BufReader::new(tokio::io::stdin()).lines();", Context::Async),
        None
    );
}
