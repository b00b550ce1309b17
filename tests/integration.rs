/// Integration test suite: the library driven against temporary projects on
/// disk, and the compiled `code-graph-refactor` binary driven via subprocess.
///
/// `CARGO_BIN_EXE_code-graph-refactor` is set by Cargo during `cargo test` to
/// point at the binary for the current profile.
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use code_graph_refactor::{Codebase, MoveStrategy, RefactorError, UsageKind, UsageKinds};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_code-graph-refactor"))
}

/// Write `files` under a fresh temporary directory.
fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for (path, text) in files {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("create dirs");
        }
        fs::write(full, text).expect("write fixture");
    }
    dir
}

fn read(dir: &Path, path: &str) -> String {
    fs::read_to_string(dir.join(path)).expect("read file")
}

/// Run a command and assert it exits successfully. Returns stdout.
fn run_success(args: &[&str]) -> String {
    let out = Command::new(binary())
        .args(args)
        .output()
        .expect("failed to invoke code-graph-refactor binary");
    let stdout = String::from_utf8_lossy(&out.stdout).to_string();
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    assert!(
        out.status.success(),
        "command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
        args,
        out.status,
        stdout,
        stderr
    );
    stdout
}

/// Run a command and assert it exits with a non-zero status. Returns stderr.
fn run_failure(args: &[&str]) -> String {
    let out = Command::new(binary())
        .args(args)
        .output()
        .expect("failed to invoke code-graph-refactor binary");
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    assert!(
        !out.status.success(),
        "command {:?} expected to fail but exited successfully\nstderr: {}",
        args,
        stderr
    );
    stderr
}

const A_TS: &str = "export function foo() {}\n";
const B_TS: &str = "import { foo } from './a';\nfoo();\n";

// ---------------------------------------------------------------------------
// Library: end-to-end scenarios on disk
// ---------------------------------------------------------------------------

/// usages, then rename + commit, then move with a back-edge + commit.
#[test]
fn test_usages_rename_move_scenario() {
    let dir = project(&[("a.ts", A_TS), ("b.ts", B_TS)]);
    let root = dir.path();
    let mut cb = Codebase::open(root).unwrap();

    let foo = cb.get_symbol("a.ts::foo").unwrap();
    let usages = cb.usages(foo, UsageKinds::ALL);
    let kinds: Vec<UsageKind> = usages.iter().map(|u| u.kind).collect();
    assert_eq!(kinds, vec![UsageKind::Indirect, UsageKind::Direct]);
    assert!(usages.iter().all(|u| u.path == Path::new("b.ts")));

    cb.rename(foo, "bar").unwrap();
    cb.commit().unwrap();
    assert_eq!(read(root, "a.ts"), "export function bar() {}\n");
    assert_eq!(read(root, "b.ts"), "import { bar } from './a';\nbar();\n");

    let bar = cb.get_symbol("a.ts::bar").unwrap();
    cb.move_to_file(bar, "file_c.ts", false, MoveStrategy::AddBackEdge)
        .unwrap();
    let diff = cb.commit().unwrap();
    assert_eq!(diff.summary.symbols_added, 1);
    assert_eq!(read(root, "file_c.ts"), "export function bar() {}\n");
    assert_eq!(read(root, "a.ts"), "export { bar } from './file_c';\n");
    assert_eq!(read(root, "b.ts"), "import { bar } from './a';\nbar();\n");

    // The rebuilt graph sees the call through the forwarding re-export.
    let moved = cb.get_symbol("file_c.ts::bar").unwrap();
    let callers: Vec<UsageKind> = cb
        .usages(moved, UsageKinds::DIRECT)
        .iter()
        .map(|u| u.kind)
        .collect();
    assert_eq!(callers, vec![UsageKind::Direct]);
}

/// A file edited on disk after analysis aborts the whole commit.
#[test]
fn test_commit_is_all_or_nothing() {
    let dir = project(&[("a.ts", A_TS), ("b.ts", B_TS)]);
    let root = dir.path();
    let mut cb = Codebase::open(root).unwrap();
    let foo = cb.get_symbol("a.ts::foo").unwrap();
    cb.rename(foo, "bar").unwrap();

    fs::write(root.join("b.ts"), "import { foo } from './a';\nfoo();\nfoo();\n").unwrap();
    let err = cb.commit().unwrap_err();
    assert!(matches!(err, RefactorError::StaleSpan { .. }), "got {err:?}");
    assert_eq!(read(root, "a.ts"), A_TS, "no file is written");
    assert!(cb.has_pending_changes());

    cb.discard();
    assert!(!cb.has_pending_changes());
}

/// Mutual imports between two files do not loop the dependency walk.
#[test]
fn test_cross_file_cycle_terminates() {
    let dir = project(&[
        ("a.ts", "import { b } from './b';\nexport function a() { b(); }\n"),
        ("b.ts", "import { a } from './a';\nexport function b() { a(); }\n"),
    ]);
    let cb = Codebase::open(dir.path()).unwrap();
    let a = cb.get_symbol("a.ts::a").unwrap();
    let b = cb.get_symbol("b.ts::b").unwrap();
    let layers = cb.dependencies(a, UsageKinds::ALL, 10).unwrap();
    assert_eq!(layers.len(), 4, "two definitions and two import bindings");
    assert!(layers.contains_key(&b));
}

/// Moving with update-all-imports rewrites importers in nested directories.
#[test]
fn test_move_update_all_imports_nested() {
    let dir = project(&[
        ("src/lib/math.ts", "export function add(a: number, b: number) {\n  return a + b;\n}\n"),
        ("src/app.ts", "import { add } from './lib/math';\nconsole.log(add(1, 2));\n"),
    ]);
    let root = dir.path();
    let mut cb = Codebase::open(root).unwrap();
    let add = cb.get_symbol("add").unwrap();
    cb.move_to_file(add, "src/util/add.ts", false, MoveStrategy::UpdateAllImports)
        .unwrap();
    cb.commit().unwrap();

    assert!(read(root, "src/util/add.ts").contains("export function add(a: number, b: number)"));
    assert_eq!(read(root, "src/lib/math.ts"), "");
    assert_eq!(
        read(root, "src/app.ts"),
        "import { add } from './util/add';\nconsole.log(add(1, 2));\n"
    );
}

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[test]
fn test_cli_index_json() {
    let dir = project(&[("a.ts", A_TS), ("b.ts", B_TS)]);
    let out = run_success(&["index", dir.path().to_str().unwrap(), "--json"]);
    let json: serde_json::Value = serde_json::from_str(&out).expect("valid JSON");
    assert_eq!(json["file_count"], 2);
}

#[test]
fn test_cli_usages() {
    let dir = project(&[("a.ts", A_TS), ("b.ts", B_TS)]);
    let out = run_success(&["usages", "a.ts::foo", dir.path().to_str().unwrap()]);
    assert!(out.contains("indirect b.ts:1"), "stdout: {out}");
    assert!(out.contains("direct b.ts:2"), "stdout: {out}");
    assert!(out.contains("2 usage(s)"));
}

#[test]
fn test_cli_deps_json() {
    let dir = project(&[("a.ts", "export function foo() { bar(); }\nfunction bar() {}\n")]);
    let out = run_success(&["deps", "a.ts::foo", dir.path().to_str().unwrap(), "--json"]);
    let json: serde_json::Value = serde_json::from_str(&out).expect("valid JSON");
    assert_eq!(json["foo a.ts:1"], serde_json::json!(["bar a.ts:2"]), "stdout: {out}");
}

#[test]
fn test_cli_rename_dry_run_writes_nothing() {
    let dir = project(&[("a.ts", A_TS), ("b.ts", B_TS)]);
    let out = run_success(&[
        "rename",
        "foo",
        "bar",
        dir.path().to_str().unwrap(),
        "--dry-run",
    ]);
    assert!(out.contains("--- a/b.ts"));
    assert!(out.contains("+import { bar } from './a';"));
    assert!(out.contains("would change 2 file(s)"));
    assert_eq!(read(dir.path(), "b.ts"), B_TS);
}

#[test]
fn test_cli_move_writes_files() {
    let dir = project(&[("a.ts", A_TS), ("b.ts", B_TS)]);
    run_success(&[
        "move",
        "foo",
        "c.ts",
        dir.path().to_str().unwrap(),
        "--strategy",
        "add-back-edge",
    ]);
    assert_eq!(read(dir.path(), "c.ts"), A_TS);
    assert_eq!(read(dir.path(), "a.ts"), "export { foo } from './c';\n");
}

#[test]
fn test_cli_dead_code() {
    let dir = project(&[
        ("index.ts", "import { used } from './lib';\nused();\n"),
        ("lib.ts", "export function used() {}\nfunction orphan() {}\n"),
    ]);
    let out = run_success(&["dead-code", dir.path().to_str().unwrap()]);
    assert!(out.contains("unused orphan lib.ts:2 function"), "stdout: {out}");
    assert!(!out.contains("unused used"));
}

#[test]
fn test_cli_errors() {
    let dir = project(&[("a.ts", A_TS)]);
    let root = dir.path().to_str().unwrap();
    let stderr = run_failure(&["usages", "nope", root]);
    assert!(stderr.contains("symbol not found: nope"), "stderr: {stderr}");
    let stderr = run_failure(&["rename", "foo", "class", root]);
    assert!(stderr.contains("not a valid identifier"), "stderr: {stderr}");
    let stderr = run_failure(&["deps", "foo", root, "--depth", "0"]);
    assert!(stderr.contains("max_depth must be at least 1"), "stderr: {stderr}");
}
