//! Architecture enforcement tests.
//!
//! Layering rules that the type system does not enforce on its own:
//!
//! 1. **Single SQL adapter** - only `src/store/dolt.rs` talks SQL; every
//!    other module goes through the `VersionedStore` trait
//! 2. **Lifecycle ownership** - CLI commands never call the store's
//!    `checkout`, `create_branch` or `commit` directly; branch moves and
//!    commits flow through `LifecycleController`
//! 3. **No ambient hooks** - there is no global hook registry; controllers
//!    are passed to engines explicitly

use std::fs;
use std::path::{Path, PathBuf};

fn src_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src")
}

/// All `.rs` files under `dir`, recursively.
fn rust_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).expect("read src dir") {
        let path = entry.expect("dir entry").path();
        if path.is_dir() {
            files.extend(rust_files(&path));
        } else if path.extension().is_some_and(|e| e == "rs") {
            files.push(path);
        }
    }
    files.sort();
    files
}

/// Source with comments and `#[cfg(test)]` modules cut off, so docs and
/// tests may mention anything.
fn production_source(path: &Path) -> String {
    let source = fs::read_to_string(path).expect("read source file");
    let code = match source.find("#[cfg(test)]") {
        Some(idx) => &source[..idx],
        None => source.as_str(),
    };
    code.lines()
        .filter(|line| !line.trim_start().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn relative(path: &Path) -> String {
    path.strip_prefix(src_dir())
        .unwrap_or(path)
        .display()
        .to_string()
}

#[test]
fn sqlx_confined_to_dolt_adapter() {
    let mut violations = Vec::new();
    for file in rust_files(&src_dir()) {
        let rel = relative(&file);
        if rel == "store/dolt.rs" {
            continue;
        }
        if production_source(&file).contains("sqlx") {
            violations.push(rel);
        }
    }
    assert!(
        violations.is_empty(),
        "sqlx used outside src/store/dolt.rs: {:?}",
        violations
    );
}

#[test]
fn commands_do_not_mutate_store_directly() {
    let forbidden = [".checkout(", ".create_branch(", ".commit("];
    let mut violations = Vec::new();
    for file in rust_files(&src_dir().join("cli")) {
        let source = production_source(&file);
        for pattern in forbidden {
            if source.contains(pattern) {
                violations.push(format!("{}: {}", relative(&file), pattern));
            }
        }
    }
    assert!(
        violations.is_empty(),
        "CLI bypasses the lifecycle controller: {:?}",
        violations
    );
}

#[test]
fn run_command_uses_lifecycle_bracket() {
    let source = production_source(&src_dir().join("cli/commands/run.rs"));
    assert!(source.contains("LifecycleController"));
    assert!(source.contains("run_pipeline("));
}

#[test]
fn no_global_hook_registry() {
    let mut violations = Vec::new();
    for file in rust_files(&src_dir()) {
        let source = production_source(&file);
        for pattern in ["static mut", "OnceLock<", "lazy_static!", "thread_local!"] {
            if source.contains(pattern) {
                violations.push(format!("{}: {}", relative(&file), pattern));
            }
        }
    }
    assert!(violations.is_empty(), "global state found: {:?}", violations);
}

#[test]
fn library_does_not_print() {
    let mut violations = Vec::new();
    for file in rust_files(&src_dir()) {
        let rel = relative(&file);
        if rel.starts_with("ui/") || rel == "main.rs" {
            continue;
        }
        let source = production_source(&file);
        for pattern in ["println!", "eprintln!"] {
            if source.contains(pattern) {
                violations.push(format!("{}: {}", rel, pattern));
            }
        }
    }
    assert!(
        violations.is_empty(),
        "printing outside ui::output: {:?}",
        violations
    );
}
