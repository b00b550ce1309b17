pub mod exports;
pub mod module_path;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::codebase::SourceFile;
use crate::error::Warning;
use crate::graph::SymbolGraph;
use crate::graph::edge::UsageKind;
use crate::graph::node::{FileId, SymbolId, SymbolKind};
use crate::parser::imports::{ExportItemKind, ImportBindingKind};
use crate::span::Span;

pub use exports::Lookup;
use module_path::{extract_package_name, is_relative, resolve_specifier};

/// Where a module specifier points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleTarget {
    File(FileId),
    /// Third-party package, keyed by package name.
    External(String),
    /// A relative specifier that matches no analysed file.
    Unresolved,
}

/// The far end of a usage edge produced by linking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Symbol(SymbolId),
    /// ExternalModule placeholder, created on demand by the codebase.
    External(String),
}

/// One usage edge discovered while linking a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEdge {
    pub from: SymbolId,
    pub to: Target,
    pub kind: UsageKind,
    pub site: Span,
}

/// Everything linking one file produced.
#[derive(Debug, Default)]
pub struct FileLinks {
    pub edges: Vec<LinkEdge>,
    pub warnings: Vec<Warning>,
    pub stats: ResolveStats,
}

/// Statistics collected while linking.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ResolveStats {
    /// Import/re-export names resolved to a symbol in an analysed file.
    pub resolved: usize,
    /// Names resolved to a third-party package.
    pub external: usize,
    /// Names that matched nothing and fell back to a placeholder.
    pub unresolved: usize,
    /// Re-export chains cut by the cycle guard.
    pub cycles: usize,
}

impl ResolveStats {
    pub fn merge(&mut self, other: ResolveStats) {
        self.resolved += other.resolved;
        self.external += other.external;
        self.unresolved += other.unresolved;
        self.cycles += other.cycles;
    }
}

/// A top-level binding of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Local {
    /// Index into the file's declarations.
    Declaration(usize),
    Import { statement: usize, binding: usize },
}

/// Read-only view over the analysed files used for module resolution and
/// linking. Linking never mutates the graph; the codebase applies the
/// returned edges afterwards, so files can be linked in parallel.
pub struct Resolver<'a> {
    pub(crate) files: &'a [SourceFile],
    pub(crate) by_path: &'a HashMap<PathBuf, FileId>,
    pub(crate) graph: &'a SymbolGraph,
    pub(crate) bare_specifiers_from_root: bool,
}

impl<'a> Resolver<'a> {
    /// Map a module specifier written in `from` to a file or package.
    ///
    /// Relative specifiers resolve against the importer's directory. Bare
    /// specifiers resolve against the project root when that option is on
    /// and a file matches; anything else is a third-party package.
    pub fn resolve_module(&self, from: FileId, specifier: &str) -> ModuleTarget {
        let exists = |p: &Path| self.by_path.contains_key(p);
        if is_relative(specifier) {
            let dir = self.files[from.0].path.parent().unwrap_or(Path::new(""));
            return match resolve_specifier(dir, specifier, exists) {
                Some(path) => ModuleTarget::File(self.by_path[&path]),
                None => ModuleTarget::Unresolved,
            };
        }
        if self.bare_specifiers_from_root
            && let Some(path) = resolve_specifier(Path::new(""), specifier, exists)
        {
            return ModuleTarget::File(self.by_path[&path]);
        }
        ModuleTarget::External(extract_package_name(specifier).to_owned())
    }

    /// A non-member top-level declaration or import binding named `name`.
    pub(crate) fn top_level_local(&self, file: FileId, name: &str) -> Option<Local> {
        let source = &self.files[file.0];
        let decl = source
            .syntax
            .declarations
            .iter()
            .position(|d| d.parent.is_none() && !d.member && d.name == name);
        if let Some(idx) = decl {
            return Some(Local::Declaration(idx));
        }
        source
            .syntax
            .imports
            .iter()
            .enumerate()
            .find_map(|(statement, decl)| {
                decl.bindings
                    .iter()
                    .position(|b| b.local == name)
                    .map(|binding| Local::Import { statement, binding })
            })
    }

    pub(crate) fn local_symbol(&self, file: FileId, local: Local) -> SymbolId {
        let source = &self.files[file.0];
        match local {
            Local::Declaration(idx) => source.declarations[idx],
            Local::Import { statement, binding } => source.imports[statement][binding],
        }
    }

    /// Compute every usage edge that originates in `file`.
    pub fn link_file(&self, file: FileId) -> FileLinks {
        let mut links = FileLinks::default();
        let source = &self.files[file.0];

        // Import bindings -> what they import.
        for (i, decl) in source.syntax.imports.iter().enumerate() {
            let module = self.resolve_module(file, &decl.module_path);
            for (j, binding) in decl.bindings.iter().enumerate() {
                let from = source.imports[i][j];
                let kind = match &binding.kind {
                    ImportBindingKind::Named { imported } if *imported != binding.local => {
                        UsageKind::Aliased
                    }
                    _ => UsageKind::Indirect,
                };
                let lookup = match (&module, &binding.kind) {
                    (ModuleTarget::File(t), ImportBindingKind::Namespace) => {
                        Lookup::Found(self.files[t.0].module)
                    }
                    (ModuleTarget::File(t), ImportBindingKind::Default) => {
                        self.lookup_export(*t, "default", &mut vec![file])
                    }
                    (ModuleTarget::File(t), ImportBindingKind::Named { imported }) => {
                        self.lookup_export(*t, imported, &mut vec![file])
                    }
                    (ModuleTarget::External(pkg), _) => Lookup::External(pkg.clone()),
                    (ModuleTarget::Unresolved, _) => Lookup::Missing,
                };
                let name = match &binding.kind {
                    ImportBindingKind::Named { imported } => Some(imported.as_str()),
                    ImportBindingKind::Default => Some("default"),
                    ImportBindingKind::Namespace => None,
                };
                let target = self.settle(file, &module, &decl.module_path, name, lookup, &mut links);
                // A default import is aliased when its local name differs from the definition's.
                let kind = match (&binding.kind, &target) {
                    (ImportBindingKind::Default, Target::Symbol(id)) => {
                        match self.graph.symbol(*id) {
                            Some(s) if s.name != binding.local => UsageKind::Aliased,
                            _ => UsageKind::Indirect,
                        }
                    }
                    _ => kind,
                };
                links.edges.push(LinkEdge {
                    from,
                    to: target,
                    kind,
                    site: binding.imported_span,
                });
            }
        }

        // Export statements -> what they expose.
        for (i, decl) in source.syntax.exports.iter().enumerate() {
            for (j, item) in decl.items.iter().enumerate() {
                let from = source.exports[i][j];
                let site = item.local_span.or(item.exported_span).unwrap_or(item.item_span);
                let renamed = matches!(&item.kind, ExportItemKind::Named { local } if *local != item.exported);
                let kind = if renamed { UsageKind::Aliased } else { UsageKind::Indirect };

                match (&decl.source, &item.kind) {
                    (_, ExportItemKind::DefaultExpression) => {}
                    (None, ExportItemKind::Named { local }) => {
                        match self.top_level_local(file, local) {
                            Some(found) => links.edges.push(LinkEdge {
                                from,
                                to: Target::Symbol(self.local_symbol(file, found)),
                                kind: if renamed { UsageKind::Aliased } else { UsageKind::Direct },
                                site,
                            }),
                            None => log::debug!(
                                "{}: exported name '{}' is not declared",
                                source.path.display(),
                                local
                            ),
                        }
                    }
                    (None, _) => {}
                    (Some((specifier, _)), item_kind) => {
                        let module = self.resolve_module(file, specifier);
                        let (lookup, name) = match (&module, item_kind) {
                            (ModuleTarget::File(t), ExportItemKind::Named { local }) => {
                                (self.lookup_export(*t, local, &mut vec![file]), Some(local.as_str()))
                            }
                            (ModuleTarget::File(t), _) => (Lookup::Found(self.files[t.0].module), None),
                            (ModuleTarget::External(pkg), _) => (Lookup::External(pkg.clone()), None),
                            (ModuleTarget::Unresolved, _) => (Lookup::Missing, None),
                        };
                        let target = self.settle(file, &module, specifier, name, lookup, &mut links);
                        links.edges.push(LinkEdge {
                            from,
                            to: target,
                            kind,
                            site,
                        });
                    }
                }
            }
        }

        self.link_references(file, &mut links);
        links
    }

    /// Turn a lookup outcome into an edge target, recording warnings and stats.
    fn settle(
        &self,
        file: FileId,
        module: &ModuleTarget,
        specifier: &str,
        name: Option<&str>,
        lookup: Lookup,
        links: &mut FileLinks,
    ) -> Target {
        let path = &self.files[file.0].path;
        match lookup {
            Lookup::Found(id) => {
                links.stats.resolved += 1;
                Target::Symbol(id)
            }
            Lookup::External(pkg) => {
                links.stats.external += 1;
                Target::External(pkg)
            }
            Lookup::Missing => {
                links.stats.unresolved += 1;
                let name = match module {
                    ModuleTarget::File(_) => name.map(str::to_owned),
                    _ => None,
                };
                links.warnings.push(Warning::UnresolvedImport {
                    path: path.clone(),
                    specifier: specifier.to_owned(),
                    name,
                });
                Target::External(specifier.to_owned())
            }
            Lookup::Cycle(at) => {
                links.stats.cycles += 1;
                links.warnings.push(Warning::ReExportCycle {
                    path: path.clone(),
                    cycle_at: self.files[at.0].path.clone(),
                });
                Target::Symbol(self.files[at.0].module)
            }
        }
    }

    /// Same-file references: scope lookup from the innermost owner outwards,
    /// then one Chained hop for `ns.member` and `Class.member` accesses.
    fn link_references(&self, file: FileId, links: &mut FileLinks) {
        let source = &self.files[file.0];
        let decls = &source.syntax.declarations;

        let mut scopes: HashMap<(Option<usize>, &str), usize> = HashMap::new();
        for (idx, decl) in decls.iter().enumerate() {
            if !decl.member {
                scopes.entry((decl.parent, decl.name.as_str())).or_insert(idx);
            }
        }

        for reference in source.syntax.references.iter().filter(|r| !r.shadowed) {
            let from = reference
                .owner
                .map(|i| source.declarations[i])
                .unwrap_or(source.module);

            let mut scope = reference.owner;
            let local = loop {
                if let Some(&idx) = scopes.get(&(scope, reference.name.as_str())) {
                    break Some(Local::Declaration(idx));
                }
                match scope {
                    Some(idx) => scope = decls[idx].parent,
                    None => break self.top_level_local(file, &reference.name),
                }
            };
            let Some(local) = local else {
                continue;
            };

            links.edges.push(LinkEdge {
                from,
                to: Target::Symbol(self.local_symbol(file, local)),
                kind: UsageKind::Direct,
                site: reference.span,
            });

            let Some((property, property_span)) = &reference.member else {
                continue;
            };
            if let Some(member) = self.member_of(file, local, property) {
                links.edges.push(LinkEdge {
                    from,
                    to: Target::Symbol(member),
                    kind: UsageKind::Chained,
                    site: *property_span,
                });
            }
        }
    }

    /// The symbol reached by `local.property`: an export of a namespace
    /// import, or a member of a (possibly imported) class.
    fn member_of(&self, file: FileId, local: Local, property: &str) -> Option<SymbolId> {
        let source = &self.files[file.0];
        if let Local::Import { statement, binding } = local {
            let decl = &source.syntax.imports[statement];
            if decl.bindings[binding].kind == ImportBindingKind::Namespace {
                return match self.resolve_module(file, &decl.module_path) {
                    ModuleTarget::File(t) => match self.lookup_export(t, property, &mut vec![file]) {
                        Lookup::Found(id) => Some(id),
                        _ => None,
                    },
                    _ => None,
                };
            }
        }

        let owner = match self.follow_local(file, local, &mut vec![file]) {
            Lookup::Found(id) => id,
            _ => return None,
        };
        let symbol = self.graph.symbol(owner)?;
        if symbol.kind() != SymbolKind::Class {
            return None;
        }
        let home = &self.files[symbol.file?.0];
        home.declarations.iter().copied().find(|&id| {
            self.graph
                .symbol(id)
                .is_some_and(|m| m.parent == Some(owner) && m.member && m.name == property)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::codebase::Codebase;
    use crate::error::Warning;
    use crate::graph::edge::{UsageKind, UsageKinds};
    use crate::graph::node::SymbolKind;

    use super::ModuleTarget;

    fn deps(cb: &Codebase, query: &str) -> Vec<(String, UsageKind)> {
        let id = cb.get_symbol(query).unwrap_or_else(|| panic!("{query} not found"));
        let mut out: Vec<_> = cb
            .graph()
            .outgoing(id, UsageKinds::ALL)
            .into_iter()
            .map(|(to, e)| (cb.symbol(to).unwrap().qualified_name.clone(), e.kind))
            .collect();
        out.sort();
        out
    }

    // Test 1: module specifiers resolve to files or packages
    #[test]
    fn test_resolve_module() {
        let cb = Codebase::from_sources(
            "/project",
            [
                ("src/a.ts", ""),
                ("src/util/index.ts", ""),
                ("src/b.ts", ""),
            ],
        );
        let b = cb.file_id("src/b.ts").unwrap();
        let r = cb.resolver();
        assert_eq!(r.resolve_module(b, "./a"), ModuleTarget::File(cb.file_id("src/a.ts").unwrap()));
        assert_eq!(
            r.resolve_module(b, "./util"),
            ModuleTarget::File(cb.file_id("src/util/index.ts").unwrap())
        );
        assert_eq!(r.resolve_module(b, "./nope"), ModuleTarget::Unresolved);
        assert_eq!(
            r.resolve_module(b, "@scope/pkg/deep"),
            ModuleTarget::External("@scope/pkg".into())
        );
    }

    // Test 2: import kinds: plain, aliased, default, namespace
    #[test]
    fn test_import_edge_kinds() {
        let cb = Codebase::from_sources(
            "/project",
            [
                ("a.ts", "export function foo() {}\nexport default class Dog {}\n"),
                (
                    "b.ts",
                    "import { foo } from './a';\nimport { foo as f } from './a';\nimport Pet from './a';\nimport * as all from './a';\n",
                ),
            ],
        );
        let kinds: Vec<_> = ["b.ts::foo", "b.ts::f", "b.ts::Pet", "b.ts::all"]
            .iter()
            .map(|q| deps(&cb, q))
            .collect();
        assert_eq!(kinds[0], vec![("foo".into(), UsageKind::Indirect)]);
        assert_eq!(kinds[1], vec![("foo".into(), UsageKind::Aliased)]);
        assert_eq!(kinds[2], vec![("Dog".into(), UsageKind::Aliased)]);
        assert_eq!(kinds[3], vec![("a.ts".into(), UsageKind::Indirect)]);
    }

    // Test 3: references resolve through scopes; members are chained
    #[test]
    fn test_reference_scopes_and_members() {
        let cb = Codebase::from_sources(
            "/project",
            [
                (
                    "a.ts",
                    "export class Dog { bark() {} }\nexport function helper() {}\n",
                ),
                (
                    "b.ts",
                    "import * as ns from './a';\nimport { Dog } from './a';\nconst x = 1;\nfunction run(x: number) { ns.helper(); Dog.bark(); return x; }\n",
                ),
            ],
        );
        let run = deps(&cb, "run");
        assert!(run.contains(&("helper".into(), UsageKind::Chained)));
        assert!(run.contains(&("Dog.bark".into(), UsageKind::Chained)));
        assert!(run.contains(&("ns".into(), UsageKind::Direct)));
        assert!(run.contains(&("Dog".into(), UsageKind::Direct)));
        assert!(
            run.contains(&("run.x".into(), UsageKind::Direct)),
            "parameter shadows the top-level x: {run:?}"
        );
        assert!(!run.contains(&("x".into(), UsageKind::Direct)));
    }

    // Test 4: unresolved imports become placeholders plus warnings
    #[test]
    fn test_unresolved_import_placeholder() {
        let cb = Codebase::from_sources(
            "/project",
            [
                ("a.ts", "export const a = 1;\n"),
                ("b.ts", "import { missing } from './a';\nimport { gone } from './gone';\nimport React from 'react';\n"),
            ],
        );
        let missing = deps(&cb, "b.ts::missing");
        assert_eq!(missing[0].0, "./a");
        let react = cb.get_symbol("b.ts::React").unwrap();
        let (target, _) = cb.graph().outgoing(react, UsageKinds::ALL)[0];
        assert_eq!(cb.symbol(target).unwrap().kind(), SymbolKind::External);

        let warnings: Vec<_> = cb.warnings().iter().map(|w| w.to_string()).collect();
        assert_eq!(
            warnings,
            vec![
                "b.ts: 'missing' is not exported by './a'",
                "b.ts: cannot resolve './gone'",
            ]
        );
        assert!(cb.warnings().iter().all(|w| matches!(w, Warning::UnresolvedImport { .. })));
    }

    // Test 5: local export clauses link to their binding
    #[test]
    fn test_local_export_links() {
        let cb = Codebase::from_sources(
            "/project",
            [("a.ts", "function foo() {}\nexport { foo, foo as bar };\n")],
        );
        let exports: Vec<_> = cb
            .graph()
            .symbols()
            .filter(|(_, s)| s.kind() == SymbolKind::Export)
            .map(|(id, s)| (s.name.clone(), cb.graph().outgoing(id, UsageKinds::ALL)[0].1.kind))
            .collect();
        assert_eq!(
            exports,
            vec![("foo".into(), UsageKind::Direct), ("bar".into(), UsageKind::Aliased)]
        );
    }
}
