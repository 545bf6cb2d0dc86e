//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT call sleep. Screens schedule work on
//! their timer registry; the runtime driver waits with `sleep_until` on the
//! next known deadline or on I/O.
//! **Exceptions**: test code.

use architectural_enforcement::{code_part, context_of, production_files, read_source, Context};

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let files = production_files();
    assert!(!files.is_empty(), "no production sources found");

    let violations = find_sleep_violations(&files);
    if !violations.is_empty() {
        eprintln!("\nSleep calls found in production code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nAcceptable:");
        eprintln!("  - TimerRegistry::schedule / schedule_repeating");
        eprintln!("  - tokio::time::sleep_until on a known deadline");
        eprintln!("  - Test code (#[test], #[tokio::test], #[cfg(test)] modules)");

        panic!(
            "\nFound {} sleep violation(s) in production code.",
            violations.len()
        );
    }
}

fn find_sleep_violations(files: &[std::path::PathBuf]) -> Vec<String> {
    let mut violations = Vec::new();
    for path in files {
        let Some(content) = read_source(path) else {
            continue;
        };
        let lines: Vec<&str> = content.lines().collect();
        for (idx, line) in lines.iter().enumerate() {
            let code = code_part(line);
            if !is_sleep_call(code) {
                continue;
            }
            if context_of(&lines, idx) == Context::Test {
                continue;
            }
            violations.push(format!("{}:{} - {}", path.display(), idx + 1, line.trim()));
        }
    }
    violations
}

/// Any `sleep(` call, qualified or imported bare, but not `sleep_until(`
/// or an identifier that merely ends in `sleep`.
fn is_sleep_call(code: &str) -> bool {
    code.match_indices("sleep(").any(|(at, _)| {
        let before = code[..at].chars().next_back();
        let bare = !before.is_some_and(|c| c.is_alphanumeric() || c == '_');
        bare && !code[..at].trim_end().ends_with("fn")
    })
}

#[test]
fn test_sleep_detection() {
    assert!(is_sleep_call("std::thread::sleep(Duration::from_millis(5));"));
    assert!(is_sleep_call("tokio::time::sleep(delay).await;"));
    assert!(is_sleep_call("clock.sleep(delay)"));
    assert!(is_sleep_call("sleep(Duration::from_millis(5)).await;"));
    assert!(is_sleep_call("let pause = sleep(delay);"));
    assert!(!is_sleep_call("fn sleep(&self) {}"));
    assert!(!is_sleep_call("self.fall_asleep(delay)"));
    assert!(!is_sleep_call("() = sleep_until(epoch + deadline) => {"));
    assert!(!is_sleep_call(code_part("// tokio::time::sleep(d)")));
}
