use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::codebase::{Codebase, SourceFile};
use crate::graph::edge::UsageKinds;
use crate::graph::node::{Symbol, SymbolId, SymbolKind};

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A single unreferenced symbol within a file.
#[derive(Debug, Clone, Serialize)]
pub struct DeadSymbol {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    pub line: usize,
    pub exported: bool,
}

/// Result of dead code analysis.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeadCodeResult {
    /// Files no other file imports or re-exports from, entry points excepted.
    pub unreachable_files: Vec<PathBuf>,
    /// Symbols with no usages of any kind, grouped by file path.
    pub unreferenced_symbols: Vec<(PathBuf, Vec<DeadSymbol>)>,
}

impl DeadCodeResult {
    pub fn symbol_count(&self) -> usize {
        self.unreferenced_symbols.iter().map(|(_, s)| s.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Entry-point detection helpers
// ---------------------------------------------------------------------------

fn is_test_path(path: &Path) -> bool {
    let path_str = path.to_string_lossy();
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    path_str.starts_with("tests/")
        || path_str.contains("/tests/")
        || path_str.starts_with("__tests__/")
        || path_str.contains("/__tests__/")
        || file_name.contains(".test.")
        || file_name.contains(".spec.")
}

/// Barrel files and tests are reached from outside the analysed set.
fn is_entry_point_file(file: &SourceFile) -> bool {
    let stem = file.path.file_stem().and_then(|n| n.to_str()).unwrap_or("");
    stem == "index" || stem == "main" || is_test_path(&file.path)
}

/// Kinds that can meaningfully be dead. Class members are skipped because
/// instance access through `this` or a value is not linked.
fn is_candidate(symbol: &Symbol) -> bool {
    symbol.kind().is_definition() && !symbol.member
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

impl Codebase {
    /// True when nothing but the symbol itself uses `id`.
    pub fn is_unused(&self, id: SymbolId) -> bool {
        self.graph
            .incoming(id, UsageKinds::ALL)
            .iter()
            .all(|(user, _)| *user == id)
    }

    /// Detect unreachable files and unreferenced symbols.
    ///
    /// Exported symbols are reported only with `include_exported`, since
    /// consumers outside the analysed files may use them.
    pub fn find_dead_code(&self, include_exported: bool) -> DeadCodeResult {
        let mut result = DeadCodeResult::default();

        for file in &self.files {
            if !file.is_parsed() || is_entry_point_file(file) {
                continue;
            }
            let ids = file.symbol_ids();
            let reached = self
                .graph
                .files_using(&ids)
                .into_iter()
                .any(|user| user != file.id);
            if !reached {
                result.unreachable_files.push(file.path.clone());
            }
        }

        let mut grouped: BTreeMap<PathBuf, Vec<DeadSymbol>> = BTreeMap::new();
        for file in &self.files {
            if is_test_path(&file.path) {
                continue;
            }
            for &id in &file.declarations {
                let Some(symbol) = self.graph.symbol(id) else {
                    continue;
                };
                if !is_candidate(symbol) || (symbol.exported && !include_exported) {
                    continue;
                }
                if !self.is_unused(id) {
                    continue;
                }
                grouped.entry(file.path.clone()).or_default().push(DeadSymbol {
                    id,
                    name: symbol.qualified_name.clone(),
                    kind: symbol.kind(),
                    line: file.line_col(symbol.name_span.start).line,
                    exported: symbol.exported,
                });
            }
        }
        result.unreferenced_symbols = grouped.into_iter().collect();

        log::debug!(
            "dead code: {} unreachable file(s), {} unreferenced symbol(s)",
            result.unreachable_files.len(),
            result.symbol_count()
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::codebase::Codebase;

    fn project() -> Codebase {
        Codebase::from_sources(
            "/p",
            [
                ("index.ts", "import { used } from './lib';\nused();\n"),
                (
                    "lib.ts",
                    "export function used() { helper(); }\nfunction helper() {}\nfunction orphan() { orphan(); }\nexport function unusedExport() {}\n",
                ),
                ("stray.ts", "const alone = 1;\n"),
                ("lib.test.ts", "function check() {}\n"),
            ],
        )
    }

    // Test 1: self-references do not keep a symbol alive
    #[test]
    fn test_is_unused() {
        let cb = project();
        assert!(cb.is_unused(cb.get_symbol("orphan").unwrap()));
        assert!(!cb.is_unused(cb.get_symbol("helper").unwrap()));
        assert!(!cb.is_unused(cb.get_symbol("used").unwrap()));
    }

    // Test 2: exported symbols only reported on request
    #[test]
    fn test_find_dead_code_symbols() {
        let cb = project();
        let result = cb.find_dead_code(false);
        let names: Vec<(String, Vec<String>)> = result
            .unreferenced_symbols
            .iter()
            .map(|(p, syms)| {
                (
                    p.to_string_lossy().into_owned(),
                    syms.iter().map(|s| s.name.clone()).collect(),
                )
            })
            .collect();
        assert_eq!(
            names,
            vec![
                ("lib.ts".to_string(), vec!["orphan".to_string()]),
                ("stray.ts".to_string(), vec!["alone".to_string()]),
            ]
        );

        let with_exported = cb.find_dead_code(true);
        assert_eq!(with_exported.symbol_count(), 3);
    }

    // Test 3: entry points and test files are never unreachable
    #[test]
    fn test_unreachable_files() {
        let cb = project();
        let result = cb.find_dead_code(false);
        assert_eq!(result.unreachable_files, vec![PathBuf::from("stray.ts")]);
    }
}
