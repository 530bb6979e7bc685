//! Structural tests for architectural boundary enforcement.
//!
//! These tests scan source files to verify that the layer boundaries hold:
//! `domain` is pure, `application` sees only `domain` and its own ports, and
//! only `infra` talks to the platform.

use std::path::Path;

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Read a file and strip comment lines to avoid false positives.
fn read_non_comment_lines(path: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .filter(|l| {
            let trimmed = l.trim();
            !trimmed.starts_with("//") && !trimmed.starts_with("/*") && !trimmed.starts_with('*')
        })
        .map(String::from)
        .collect()
}

/// Track brace depth and return whether a line is inside a `#[cfg(test)]` block.
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn new() -> Self {
        Self {
            in_test_block: false,
            brace_depth: 0,
            test_block_start_depth: 0,
        }
    }

    /// Process a line and return `true` if it's inside a `#[cfg(test)]` block.
    fn process_line(&mut self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.contains("#[cfg(test)]") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

/// Count non-test, non-comment, non-empty lines in a file.
fn count_non_test_lines(content: &str) -> usize {
    let mut tracker = CfgTestTracker::new();
    content
        .lines()
        .filter(|line| {
            let in_test = tracker.process_line(line);
            let trimmed = line.trim();
            !in_test && !trimmed.is_empty() && !trimmed.starts_with("//")
        })
        .count()
}

// ── No inline JSON branching ──────────────────────────────────────────────────

#[test]
fn no_inline_json_branching_in_commands() {
    let commands_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("src")
        .join("commands");

    let mut violations: Vec<String> = Vec::new();

    for file in collect_rs_files(&commands_dir) {
        let lines = read_non_comment_lines(&file);
        let rel = file
            .strip_prefix(env!("CARGO_MANIFEST_DIR"))
            .unwrap_or(&file)
            .display()
            .to_string();

        for (i, line) in lines.iter().enumerate() {
            let lineno = i + 1;
            if line.contains("json: bool") {
                violations.push(format!(
                    "{rel}:{lineno}: found `json: bool` parameter: {line}"
                ));
            }
            let trimmed = line.trim();
            if trimmed.starts_with("if json") || trimmed.starts_with("if !json") {
                violations.push(format!("{rel}:{lineno}: found inline JSON branch: {line}"));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Found inline JSON branching in commands/; use app.renderer() instead:\n{}",
        violations.join("\n")
    );
}

// ── Layer imports ─────────────────────────────────────────────────────────────

fn forbidden_lines(dir: &Path, forbidden: &[&str]) -> Vec<String> {
    let mut violations = Vec::new();
    for file in collect_rs_files(dir) {
        let rel = file
            .strip_prefix(env!("CARGO_MANIFEST_DIR"))
            .unwrap_or(&file)
            .display()
            .to_string();
        for (i, line) in read_non_comment_lines(&file).iter().enumerate() {
            for needle in forbidden {
                if line.contains(needle) {
                    violations.push(format!("{rel}:{}: `{needle}`: {line}", i + 1));
                }
            }
        }
    }
    violations
}

#[test]
fn application_depends_only_on_domain_and_ports() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("src")
        .join("application");
    let violations = forbidden_lines(
        &dir,
        &["crate::infra", "crate::commands", "crate::output", "crate::app::", "reqwest"],
    );
    assert!(
        violations.is_empty(),
        "application/ must not depend on outer layers:\n{}",
        violations.join("\n")
    );
}

#[test]
fn domain_has_no_io_or_async() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("src").join("domain");
    let violations = forbidden_lines(
        &dir,
        &[
            "crate::application",
            "crate::infra",
            "tokio::",
            "std::fs",
            "reqwest",
            "async fn",
        ],
    );
    assert!(
        violations.is_empty(),
        "domain/ must stay pure:\n{}",
        violations.join("\n")
    );
}

#[test]
fn only_infra_uses_the_http_client() {
    let src_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    let violations: Vec<String> = ["application", "commands", "domain", "output"]
        .iter()
        .flat_map(|sub| forbidden_lines(&src_dir.join(sub), &["reqwest::"]))
        .collect();
    assert!(
        violations.is_empty(),
        "HTTP access belongs in infra/:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_imports_from_commands_or_output() {
    let infra_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("src")
        .join("infra");

    let mut violations: Vec<String> = Vec::new();

    for file in collect_rs_files(&infra_dir) {
        let rel = file
            .strip_prefix(env!("CARGO_MANIFEST_DIR"))
            .unwrap_or(&file)
            .display()
            .to_string();

        let lines = read_non_comment_lines(&file);
        for (i, line) in lines.iter().enumerate() {
            if line.contains("crate::commands") || line.contains("crate::output") {
                violations.push(format!(
                    "{rel}:{}: forbidden import in infra/: {line}",
                    i + 1
                ));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "infra/ must not import from commands/ or output/:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_print_macros_outside_tests() {
    let infra_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("src")
        .join("infra");

    let mut violations: Vec<String> = Vec::new();

    for file in collect_rs_files(&infra_dir) {
        let rel = file
            .strip_prefix(env!("CARGO_MANIFEST_DIR"))
            .unwrap_or(&file)
            .display()
            .to_string();

        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };

        let mut tracker = CfgTestTracker::new();
        for (i, line) in content.lines().enumerate() {
            let in_test = tracker.process_line(line);
            let trimmed = line.trim();
            if in_test || trimmed.starts_with("//") {
                continue;
            }
            if line.contains("println!") || line.contains("eprintln!") {
                violations.push(format!(
                    "{rel}:{}: print macro in infra/ outside #[cfg(test)]: {line}",
                    i + 1
                ));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "infra/ must not use println!/eprintln! outside #[cfg(test)]:\n{}",
        violations.join("\n")
    );
}

// ── Size ──────────────────────────────────────────────────────────────────────

#[test]
fn command_handlers_stay_thin() {
    let commands_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("src")
        .join("commands");

    let mut violations: Vec<String> = Vec::new();
    for file in collect_rs_files(&commands_dir) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let lines = count_non_test_lines(&content);
        if lines > 80 {
            violations.push(format!("{}: {lines} lines", file.display()));
        }
    }

    assert!(
        violations.is_empty(),
        "command handlers should delegate to application services:\n{}",
        violations.join("\n")
    );
}
