//! Architectural Enforcement
//!
//! Shared scanning helpers for the repository-wide static checks in `tests/`:
//! - No sleep calls in production code (wait on timers and I/O instead)
//! - No blocking I/O inside async functions
//!
//! The checks are lexical. They know just enough Rust to tell test code,
//! async functions and plain functions apart, which is all the rules need.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["onboarding/core/src", "onboarding/runner/src"];

/// Where a line of code lives
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Context {
    /// Inside `#[cfg(test)]` code or a test function
    Test,
    /// Inside an `async fn`
    Async,
    /// Inside a plain `fn`
    Sync,
    /// Outside any function (imports, items)
    Module,
}

/// The workspace root, found from this crate's manifest
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// Every `.rs` file under the production directories
#[must_use]
pub fn production_files() -> Vec<PathBuf> {
    let root = workspace_root();
    let mut files = Vec::new();
    for dir in PRODUCTION_DIRS {
        let path = root.join(dir);
        if !path.exists() {
            continue;
        }
        for entry in walkdir::WalkDir::new(&path)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.path().extension().and_then(|s| s.to_str()) == Some("rs") {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files
}

/// Read a file; unreadable files are skipped
#[must_use]
pub fn read_source(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok()
}

/// The part of a line before any `//` comment
#[must_use]
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// If `line` opens a function, whether it is async
///
/// Accepts visibility and `const`/`unsafe` qualifiers in front of `fn`.
#[must_use]
pub fn fn_signature(line: &str) -> Option<bool> {
    let mut rest = line.trim();
    loop {
        let before = rest;
        for prefix in ["pub(crate) ", "pub(super) ", "pub ", "const ", "unsafe "] {
            if let Some(stripped) = rest.strip_prefix(prefix) {
                rest = stripped.trim_start();
            }
        }
        if rest == before {
            break;
        }
    }
    if rest.starts_with("async fn ") {
        Some(true)
    } else if rest.starts_with("fn ") {
        Some(false)
    } else {
        None
    }
}

/// Index of the first line of the file's `#[cfg(test)] mod`, if any
#[must_use]
pub fn test_module_start(lines: &[&str]) -> Option<usize> {
    lines.iter().enumerate().find_map(|(i, line)| {
        if line.trim() != "#[cfg(test)]" {
            return None;
        }
        let next = lines[i + 1..].iter().find(|l| !l.trim().is_empty())?;
        next.trim().starts_with("mod ").then_some(i)
    })
}

fn has_test_attribute(lines: &[&str], fn_idx: usize) -> bool {
    for line in lines[..fn_idx].iter().rev() {
        let line = line.trim();
        if line.starts_with("#[test]") || line.starts_with("#[tokio::test") {
            return true;
        }
        if !(line.starts_with("#[") || line.starts_with("///") || line.is_empty()) {
            return false;
        }
    }
    false
}

/// Classify the line at `idx`
#[must_use]
pub fn context_of(lines: &[&str], idx: usize) -> Context {
    if test_module_start(lines).is_some_and(|start| start <= idx) {
        return Context::Test;
    }
    for i in (0..=idx).rev() {
        let line = lines[i].trim();
        if let Some(is_async) = fn_signature(line) {
            if has_test_attribute(lines, i) {
                return Context::Test;
            }
            return if is_async {
                Context::Async
            } else {
                Context::Sync
            };
        }
        if line.starts_with("mod ") || (line.starts_with("impl") && line.contains('{')) {
            return Context::Module;
        }
    }
    Context::Module
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_signature_forms() {
        assert_eq!(fn_signature("fn main() {"), Some(false));
        assert_eq!(fn_signature("    pub fn new() -> Self {"), Some(false));
        assert_eq!(fn_signature("pub(crate) fn advance_phase<P: Phase>("), Some(false));
        assert_eq!(fn_signature("pub async fn run<H: WizardHooks>("), Some(true));
        assert_eq!(fn_signature("pub const fn host(text: &'static str) -> Self {"), Some(false));
        assert_eq!(fn_signature("let f = |x| x;"), None);
        assert_eq!(fn_signature("// fn commented()"), None);
    }

    #[test]
    fn test_async_context() {
        let code = [
            "pub async fn bad_function() {",
            "    let contents = std::fs::read_to_string(\"file.txt\")?;",
            "}",
        ];
        assert_eq!(context_of(&code, 1), Context::Async);
    }

    #[test]
    fn test_sync_context() {
        let code = [
            "fn main() {",
            "    let contents = std::fs::read_to_string(\"config.toml\")?;",
            "}",
        ];
        assert_eq!(context_of(&code, 1), Context::Sync);
    }

    #[test]
    fn test_test_function_context() {
        let code = [
            "#[tokio::test(start_paused = true)]",
            "async fn test_something() {",
            "    tokio::time::sleep(d).await;",
            "}",
        ];
        assert_eq!(context_of(&code, 2), Context::Test);
    }

    #[test]
    fn test_test_module_context() {
        let code = [
            "pub async fn run() {}",
            "",
            "#[cfg(test)]",
            "mod tests {",
            "    fn helper() { std::thread::sleep(d); }",
            "}",
        ];
        assert_eq!(test_module_start(&code), Some(2));
        assert_eq!(context_of(&code, 4), Context::Test);
        assert_eq!(context_of(&code, 0), Context::Async);
    }

    #[test]
    fn test_module_level_context() {
        let code = ["use std::fs;", "", "impl Foo {", "    const X: u8 = 1;", "}"];
        assert_eq!(context_of(&code, 0), Context::Module);
        assert_eq!(context_of(&code, 3), Context::Module);
    }
}
