use std::sync::OnceLock;

use tree_sitter::{Node, Query, QueryCursor, StreamingIterator};

use crate::span::Span;

use super::languages::Lang;
use super::{find_child_of_kind, node_text, span_of};

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// How an import specifier binds its local name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportBindingKind {
    /// `import { imported } from '...'` or `import { imported as local } from '...'`
    Named { imported: String },
    /// `import local from '...'`
    Default,
    /// `import * as local from '...'`
    Namespace,
}

/// One local name introduced by an import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub kind: ImportBindingKind,
    /// The local name used in this file.
    pub local: String,
    pub local_span: Span,
    /// The token naming what is imported: `a` in `{ a as b }`. Equal to
    /// `local_span` for non-aliased named, default and namespace imports.
    pub imported_span: Span,
    /// The specifier node (`a as b`, `React`, `* as ns`) for list-item removal.
    pub item_span: Span,
}

/// An ESM import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    /// The raw module specifier string, e.g. `"react"` or `"./utils"`.
    pub module_path: String,
    /// The string literal including its quotes.
    pub source_span: Span,
    pub statement: Span,
    /// Side-effect imports (`import './polyfill'`) have no bindings.
    pub bindings: Vec<ImportBinding>,
    /// The `{ ... }` clause, when present.
    pub named_clause: Option<Span>,
}

/// What a single exported name refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportItemKind {
    /// `export { local as exported }`, `export { local } from '...'` or
    /// `export default local`.
    Named { local: String },
    /// `export * from '...'`
    Wildcard,
    /// `export * as exported from '...'`
    Namespace,
    /// `export default <expression>` with anything but a bare identifier.
    DefaultExpression,
}

/// One exported name of an export statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportItem {
    pub kind: ExportItemKind,
    /// The public name: `b` in `{ a as b }`, `"*"` for wildcards, `"default"`.
    pub exported: String,
    /// The token naming the local (or source-side) binding.
    pub local_span: Option<Span>,
    /// The token naming the public name, when it is written separately.
    pub exported_span: Option<Span>,
    pub item_span: Span,
}

/// A standalone export statement. Inline exports (`export function f`) are
/// flags on the declaration, not entries here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDecl {
    /// Module specifier and its string literal span for re-exports.
    pub source: Option<(String, Span)>,
    pub statement: Span,
    pub items: Vec<ExportItem>,
}

// ---------------------------------------------------------------------------
// Query strings
// ---------------------------------------------------------------------------

/// Tree-sitter query for ESM static imports.
/// Matches `import { X } from 'module'`, `import X from 'module'`,
/// `import * as X from 'module'` and side-effect `import 'module'`.
const IMPORT_QUERY: &str = r#"
    (import_statement
      source: (string) @source) @import
"#;

/// Tree-sitter query for export statements.
const EXPORT_QUERY: &str = r#"
    (export_statement) @export_stmt
"#;

// ---------------------------------------------------------------------------
// Query cache: one set of statics per grammar.
//
// Queries compiled for one grammar cannot be used with another grammar's tree.
// ---------------------------------------------------------------------------

static TS_IMPORT_QUERY: OnceLock<Query> = OnceLock::new();
static TSX_IMPORT_QUERY: OnceLock<Query> = OnceLock::new();
static JS_IMPORT_QUERY: OnceLock<Query> = OnceLock::new();
static TS_EXPORT_QUERY: OnceLock<Query> = OnceLock::new();
static TSX_EXPORT_QUERY: OnceLock<Query> = OnceLock::new();
static JS_EXPORT_QUERY: OnceLock<Query> = OnceLock::new();

fn import_query(lang: Lang) -> &'static Query {
    let cell = match lang {
        Lang::TypeScript => &TS_IMPORT_QUERY,
        Lang::Tsx => &TSX_IMPORT_QUERY,
        Lang::JavaScript => &JS_IMPORT_QUERY,
    };
    cell.get_or_init(|| Query::new(&lang.grammar(), IMPORT_QUERY).expect("invalid import query"))
}

fn export_query(lang: Lang) -> &'static Query {
    let cell = match lang {
        Lang::TypeScript => &TS_EXPORT_QUERY,
        Lang::Tsx => &TSX_EXPORT_QUERY,
        Lang::JavaScript => &JS_EXPORT_QUERY,
    };
    cell.get_or_init(|| Query::new(&lang.grammar(), EXPORT_QUERY).expect("invalid export query"))
}

/// The text inside a string literal node, without quotes.
fn string_contents(string_node: Node, source: &[u8]) -> String {
    match find_child_of_kind(string_node, "string_fragment") {
        Some(frag) => node_text(frag, source).to_owned(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Import extraction
// ---------------------------------------------------------------------------

/// Extract all ESM import statements from a parsed syntax tree.
pub fn extract_imports(root: Node, source: &[u8], lang: Lang) -> Vec<ImportDecl> {
    let query = import_query(lang);
    let source_idx = query
        .capture_index_for_name("source")
        .expect("import query must have @source");
    let import_idx = query
        .capture_index_for_name("import")
        .expect("import query must have @import");

    let mut imports = Vec::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, root, source);

    while let Some(m) = matches.next() {
        let mut import_node: Option<Node> = None;
        let mut source_node: Option<Node> = None;

        for capture in m.captures {
            if capture.index == import_idx {
                import_node = Some(capture.node);
            } else if capture.index == source_idx {
                source_node = Some(capture.node);
            }
        }

        if let (Some(imp), Some(src)) = (import_node, source_node) {
            let mut bindings = Vec::new();
            let mut named_clause = None;
            if let Some(clause) = find_child_of_kind(imp, "import_clause") {
                extract_import_clause(clause, source, &mut bindings, &mut named_clause);
            }
            imports.push(ImportDecl {
                module_path: string_contents(src, source),
                source_span: span_of(src),
                statement: span_of(imp),
                bindings,
                named_clause,
            });
        }
    }

    imports.sort_by_key(|i| i.statement.start);
    imports
}

/// Extract specifiers from an `import_clause` node.
///
/// Handles:
/// - Named: `import { useState, useEffect as UE } from 'react'`
/// - Default: `import React from 'react'`
/// - Namespace: `import * as path from 'path'`
/// - Combined: `import React, { useState } from 'react'`
fn extract_import_clause(
    clause_node: Node,
    source: &[u8],
    bindings: &mut Vec<ImportBinding>,
    named_clause: &mut Option<Span>,
) {
    let mut cursor = clause_node.walk();
    for child in clause_node.named_children(&mut cursor) {
        match child.kind() {
            "identifier" => {
                let span = span_of(child);
                bindings.push(ImportBinding {
                    kind: ImportBindingKind::Default,
                    local: node_text(child, source).to_owned(),
                    local_span: span,
                    imported_span: span,
                    item_span: span,
                });
            }
            "named_imports" => {
                *named_clause = Some(span_of(child));
                extract_named_imports(child, source, bindings);
            }
            "namespace_import" => {
                // `* as ns`: the identifier has no field name, find it by kind.
                if let Some(ident) = find_child_of_kind(child, "identifier") {
                    let span = span_of(ident);
                    bindings.push(ImportBinding {
                        kind: ImportBindingKind::Namespace,
                        local: node_text(ident, source).to_owned(),
                        local_span: span,
                        imported_span: span,
                        item_span: span_of(child),
                    });
                }
            }
            _ => {}
        }
    }
}

/// Extract individual `import_specifier` nodes from a `named_imports` node.
fn extract_named_imports(node: Node, source: &[u8], bindings: &mut Vec<ImportBinding>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "import_specifier" {
            continue;
        }
        // In `import { foo as bar }`: name = "foo" (what was exported), alias = "bar" (local).
        let Some(name_node) = child.child_by_field_name("name") else {
            continue;
        };
        let imported = if name_node.kind() == "string" {
            string_contents(name_node, source)
        } else {
            node_text(name_node, source).to_owned()
        };
        let local_node = child.child_by_field_name("alias").unwrap_or(name_node);
        bindings.push(ImportBinding {
            kind: ImportBindingKind::Named { imported },
            local: node_text(local_node, source).to_owned(),
            local_span: span_of(local_node),
            imported_span: span_of(name_node),
            item_span: span_of(child),
        });
    }
}

// ---------------------------------------------------------------------------
// Export extraction
// ---------------------------------------------------------------------------

/// Extract all standalone export statements from a parsed syntax tree.
pub fn extract_exports(root: Node, source: &[u8], lang: Lang) -> Vec<ExportDecl> {
    let query = export_query(lang);
    let export_stmt_idx = query
        .capture_index_for_name("export_stmt")
        .expect("export query must have @export_stmt");

    let mut exports = Vec::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, root, source);

    while let Some(m) = matches.next() {
        for capture in m.captures {
            if capture.index == export_stmt_idx
                && let Some(info) = classify_export(capture.node, source)
            {
                exports.push(info);
            }
        }
    }

    exports.sort_by_key(|e| e.statement.start);
    exports
}

/// Classify a single `export_statement` node.
fn classify_export(node: Node, source: &[u8]) -> Option<ExportDecl> {
    // Inline export (export function/class/etc.): the declaration pass flags these.
    if node.child_by_field_name("declaration").is_some() {
        return None;
    }

    let statement = span_of(node);
    let from = node
        .child_by_field_name("source")
        .map(|s| (string_contents(s, source), span_of(s)));

    // `export default <value>`
    if let Some(value) = node.child_by_field_name("value") {
        let item = if value.kind() == "identifier" {
            ExportItem {
                kind: ExportItemKind::Named {
                    local: node_text(value, source).to_owned(),
                },
                exported: "default".into(),
                local_span: Some(span_of(value)),
                exported_span: None,
                item_span: span_of(value),
            }
        } else {
            ExportItem {
                kind: ExportItemKind::DefaultExpression,
                exported: "default".into(),
                local_span: None,
                exported_span: None,
                item_span: span_of(value),
            }
        };
        return Some(ExportDecl {
            source: None,
            statement,
            items: vec![item],
        });
    }

    // `export * as ns from './module'`
    if let Some(ns) = find_child_of_kind(node, "namespace_export") {
        let mut cursor = ns.walk();
        let name_node = ns
            .named_children(&mut cursor)
            .find(|c| matches!(c.kind(), "identifier" | "string"))?;
        let exported = if name_node.kind() == "string" {
            string_contents(name_node, source)
        } else {
            node_text(name_node, source).to_owned()
        };
        return Some(ExportDecl {
            source: from,
            statement,
            items: vec![ExportItem {
                kind: ExportItemKind::Namespace,
                exported,
                local_span: None,
                exported_span: Some(span_of(name_node)),
                item_span: span_of(ns),
            }],
        });
    }

    // `export * from './module'`
    let mut cursor = node.walk();
    let star = node.children(&mut cursor).find(|c| c.kind() == "*");
    if let Some(star) = star {
        return Some(ExportDecl {
            source: from,
            statement,
            items: vec![ExportItem {
                kind: ExportItemKind::Wildcard,
                exported: "*".into(),
                local_span: None,
                exported_span: None,
                item_span: span_of(star),
            }],
        });
    }

    // `export { a, b as c }` with or without `from`
    let clause = find_child_of_kind(node, "export_clause")?;
    let mut items = Vec::new();
    let mut cursor = clause.walk();
    for spec in clause.named_children(&mut cursor) {
        if spec.kind() != "export_specifier" {
            continue;
        }
        // The `name` field holds the local (or source-side) name being exported.
        let Some(name_node) = spec.child_by_field_name("name") else {
            continue;
        };
        let alias_node = spec.child_by_field_name("alias");
        let text_of = |n: Node| {
            if n.kind() == "string" {
                string_contents(n, source)
            } else {
                node_text(n, source).to_owned()
            }
        };
        let local = text_of(name_node);
        let exported = alias_node.map(text_of).unwrap_or_else(|| local.clone());
        items.push(ExportItem {
            kind: ExportItemKind::Named { local },
            exported,
            local_span: Some(span_of(name_node)),
            exported_span: alias_node.map(span_of),
            item_span: span_of(spec),
        });
    }

    Some(ExportDecl {
        source: from,
        statement,
        items,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
