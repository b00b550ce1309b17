use indexmap::IndexSet;

use crate::graph::node::{FileId, SymbolId};
use crate::parser::imports::{ExportItemKind, ImportBindingKind};

use super::{Local, ModuleTarget, Resolver};

/// Outcome of looking a public name up in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The terminal definition (or the file's Module symbol for namespaces).
    Found(SymbolId),
    /// The chain ended in a third-party package.
    External(String),
    /// No such public name.
    Missing,
    /// The chain came back to a file it had already passed through.
    Cycle(FileId),
}

impl Resolver<'_> {
    /// Resolve `name` as exported by `file`, following re-export chains to
    /// their terminal definition.
    ///
    /// `visited` is the chain walked so far; a file seen twice ends the walk
    /// with [`Lookup::Cycle`]. Wildcard branches each get their own copy so
    /// a diamond of `export *` statements is not mistaken for a cycle.
    pub fn lookup_export(&self, file: FileId, name: &str, visited: &mut Vec<FileId>) -> Lookup {
        if visited.contains(&file) {
            return Lookup::Cycle(file);
        }
        visited.push(file);
        let source = &self.files[file.0];

        // Inline exports: `export function name`, `export default class X`.
        for &id in &source.declarations {
            if let Some(symbol) = self.graph.symbol(id)
                && symbol.public_name() == Some(name)
            {
                return Lookup::Found(id);
            }
        }

        // Local export statements: `export { a as name }`, `export default a`.
        for (i, decl) in source.syntax.exports.iter().enumerate() {
            if decl.source.is_some() {
                continue;
            }
            for (j, item) in decl.items.iter().enumerate() {
                if item.exported != name {
                    continue;
                }
                match &item.kind {
                    ExportItemKind::Named { local } => {
                        return match self.top_level_local(file, local) {
                            Some(found) => self.follow_local(file, found, visited),
                            None => Lookup::Missing,
                        };
                    }
                    ExportItemKind::DefaultExpression => {
                        return Lookup::Found(source.exports[i][j]);
                    }
                    ExportItemKind::Wildcard | ExportItemKind::Namespace => {}
                }
            }
        }

        // Re-exports: `export { local as name } from`, `export * as name from`.
        for decl in &source.syntax.exports {
            let Some((specifier, _)) = &decl.source else {
                continue;
            };
            for item in &decl.items {
                if item.exported != name {
                    continue;
                }
                let target = self.resolve_module(file, specifier);
                return match (&item.kind, target) {
                    (_, ModuleTarget::External(pkg)) => Lookup::External(pkg),
                    (_, ModuleTarget::Unresolved) => Lookup::Missing,
                    (ExportItemKind::Named { local }, ModuleTarget::File(t)) => {
                        self.lookup_export(t, local, visited)
                    }
                    (ExportItemKind::Namespace, ModuleTarget::File(t)) => {
                        Lookup::Found(self.files[t.0].module)
                    }
                    _ => Lookup::Missing,
                };
            }
        }

        // `export *` never forwards the default export.
        if name == "default" {
            return Lookup::Missing;
        }
        for decl in &source.syntax.exports {
            let Some((specifier, _)) = &decl.source else {
                continue;
            };
            if !decl
                .items
                .iter()
                .any(|item| item.kind == ExportItemKind::Wildcard)
            {
                continue;
            }
            if let ModuleTarget::File(t) = self.resolve_module(file, specifier) {
                let mut branch = visited.clone();
                match self.lookup_export(t, name, &mut branch) {
                    found @ (Lookup::Found(_) | Lookup::External(_)) => return found,
                    Lookup::Missing | Lookup::Cycle(_) => {}
                }
            }
        }

        Lookup::Missing
    }

    /// Follow a top-level local binding of `file` to what it stands for.
    pub(crate) fn follow_local(&self, file: FileId, local: Local, visited: &mut Vec<FileId>) -> Lookup {
        let source = &self.files[file.0];
        match local {
            Local::Declaration(idx) => Lookup::Found(source.declarations[idx]),
            Local::Import { statement, binding } => {
                let decl = &source.syntax.imports[statement];
                match self.resolve_module(file, &decl.module_path) {
                    ModuleTarget::External(pkg) => Lookup::External(pkg),
                    ModuleTarget::Unresolved => Lookup::Missing,
                    ModuleTarget::File(t) => match &decl.bindings[binding].kind {
                        ImportBindingKind::Namespace => Lookup::Found(self.files[t.0].module),
                        ImportBindingKind::Default => self.lookup_export(t, "default", visited),
                        ImportBindingKind::Named { imported } => {
                            self.lookup_export(t, imported, visited)
                        }
                    },
                }
            }
        }
    }

    /// Every public name of `file`, wildcard re-exports expanded transitively
    /// (without their `default`), in first-seen order.
    pub fn public_names(&self, file: FileId) -> Vec<String> {
        let mut names = IndexSet::new();
        let mut visited = Vec::new();
        self.collect_public_names(file, &mut visited, &mut names);
        names.into_iter().collect()
    }

    fn collect_public_names(&self, file: FileId, visited: &mut Vec<FileId>, names: &mut IndexSet<String>) {
        if visited.contains(&file) {
            return;
        }
        visited.push(file);
        let source = &self.files[file.0];

        for &id in &source.declarations {
            if let Some(name) = self.graph.symbol(id).and_then(|s| s.public_name()) {
                names.insert(name.to_owned());
            }
        }
        for decl in &source.syntax.exports {
            for item in &decl.items {
                if item.kind != ExportItemKind::Wildcard {
                    names.insert(item.exported.clone());
                    continue;
                }
                let Some((specifier, _)) = &decl.source else {
                    continue;
                };
                if let ModuleTarget::File(t) = self.resolve_module(file, specifier) {
                    let mut inner = IndexSet::new();
                    self.collect_public_names(t, visited, &mut inner);
                    names.extend(inner.into_iter().filter(|n| n != "default"));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::codebase::Codebase;
    use crate::graph::node::SymbolKind;

    use super::Lookup;

    fn lookup(cb: &Codebase, path: &str, name: &str) -> Lookup {
        let file = cb.file_id(path).expect("file exists");
        cb.resolver().lookup_export(file, name, &mut Vec::new())
    }

    // Test 1: named re-export chains reach the terminal definition
    #[test]
    fn test_reexport_chain() {
        let cb = Codebase::from_sources(
            "/project",
            [
                ("a.ts", "export function foo() {}\n"),
                ("b.ts", "export { foo } from './a';\n"),
                ("index.ts", "export { foo as renamed } from './b';\n"),
            ],
        );
        let Lookup::Found(id) = lookup(&cb, "index.ts", "renamed") else {
            panic!("renamed should resolve");
        };
        let symbol = cb.symbol(id).unwrap();
        assert_eq!(symbol.name, "foo");
        assert_eq!(symbol.kind(), SymbolKind::Function);
        assert_eq!(lookup(&cb, "index.ts", "foo"), Lookup::Missing);
    }

    // Test 2: wildcard re-exports, without default
    #[test]
    fn test_wildcard_lookup_and_names() {
        let cb = Codebase::from_sources(
            "/project",
            [
                ("a.ts", "export const x = 1;\nexport default function main() {}\n"),
                ("index.ts", "export * from './a';\nexport const y = 2;\n"),
            ],
        );
        assert!(matches!(lookup(&cb, "index.ts", "x"), Lookup::Found(_)));
        assert_eq!(lookup(&cb, "index.ts", "default"), Lookup::Missing);
        let file = cb.file_id("index.ts").unwrap();
        assert_eq!(cb.resolver().public_names(file), vec!["y", "x"]);
    }

    // Test 3: a re-export cycle terminates
    #[test]
    fn test_cycle_terminates() {
        let cb = Codebase::from_sources(
            "/project",
            [
                ("a.ts", "export { x } from './b';\n"),
                ("b.ts", "export { x } from './a';\n"),
            ],
        );
        let a = cb.file_id("a.ts").unwrap();
        assert_eq!(lookup(&cb, "a.ts", "x"), Lookup::Cycle(a));

        let cb = Codebase::from_sources(
            "/project",
            [
                ("a.ts", "export * from './b';\n"),
                ("b.ts", "export * from './a';\n"),
            ],
        );
        assert_eq!(lookup(&cb, "a.ts", "x"), Lookup::Missing);
        assert!(cb.resolver().public_names(a).is_empty());
    }

    // Test 4: local export of an imported name is followed
    #[test]
    fn test_local_export_of_import() {
        let cb = Codebase::from_sources(
            "/project",
            [
                ("a.ts", "export class Dog {}\n"),
                ("b.ts", "import { Dog as Pet } from './a';\nexport { Pet };\n"),
                ("c.ts", "import React from 'react';\nexport default React;\n"),
            ],
        );
        let Lookup::Found(id) = lookup(&cb, "b.ts", "Pet") else {
            panic!("Pet should resolve");
        };
        assert_eq!(cb.symbol(id).unwrap().name, "Dog");
        assert_eq!(lookup(&cb, "c.ts", "default"), Lookup::External("react".into()));
    }
}
