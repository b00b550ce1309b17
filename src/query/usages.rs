use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;

use crate::codebase::Codebase;
use crate::graph::edge::{UsageKind, UsageKinds};
use crate::graph::node::{FileId, SymbolId, SymbolKind};
use crate::span::Span;

/// One place where a symbol is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Usage {
    /// The symbol containing the referencing token (a file's Module symbol
    /// for top-level code).
    pub usage_symbol: SymbolId,
    pub usage_name: String,
    pub kind: UsageKind,
    pub file: FileId,
    pub path: PathBuf,
    /// The referencing token.
    pub span: Span,
    /// 1-based.
    pub line: usize,
    /// 0-based byte column.
    pub column: usize,
    /// The import or re-export binding the usage reached the symbol through.
    pub via: Option<SymbolId>,
}

impl Codebase {
    /// Every usage of `id` whose kind is in `types`, in file-then-position order.
    ///
    /// Besides the edges that target `id` directly, usages of the import and
    /// re-export bindings that resolve to `id` are included, so a call
    /// through an import is reported against the definition. Bindings are
    /// followed whatever `types` says; only reported entries are filtered.
    pub fn usages(&self, id: SymbolId, types: UsageKinds) -> Vec<Usage> {
        let mut out = Vec::new();
        let mut visited: HashSet<SymbolId> = HashSet::from([id]);
        let mut stack: Vec<(SymbolId, Option<SymbolId>)> = vec![(id, None)];

        while let Some((target, via)) = stack.pop() {
            for (user, edge) in self.graph.incoming(target, UsageKinds::ALL) {
                let Some(symbol) = self.graph.symbol(user) else {
                    continue;
                };
                if types.contains(edge.kind) {
                    let file = &self.files[edge.file.0];
                    let pos = file.line_col(edge.site.start);
                    out.push(Usage {
                        usage_symbol: user,
                        usage_name: symbol.qualified_name.clone(),
                        kind: edge.kind,
                        file: edge.file,
                        path: file.path.clone(),
                        span: edge.site,
                        line: pos.line,
                        column: pos.col,
                        via,
                    });
                }
                let is_binding = matches!(symbol.kind(), SymbolKind::Import | SymbolKind::Export);
                if is_binding && visited.insert(user) {
                    stack.push((user, Some(user)));
                }
            }
        }

        out.sort_by(|a, b| a.path.cmp(&b.path).then(a.span.start.cmp(&b.span.start)));
        out.dedup_by(|a, b| a.file == b.file && a.span == b.span && a.usage_symbol == b.usage_symbol);
        out
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::codebase::Codebase;
    use crate::graph::edge::{UsageKind, UsageKinds};
    use crate::graph::node::SymbolKind;

    // Test 1: an import plus a call through it
    #[test]
    fn test_usages_through_import() {
        let cb = Codebase::from_sources(
            "/p",
            [
                ("a.ts", "export function foo() {}\n"),
                ("b.ts", "import { foo } from './a';\nfoo();\n"),
            ],
        );
        let foo = cb.get_symbol("foo").unwrap();
        let usages = cb.usages(foo, UsageKinds::ALL);
        assert_eq!(usages.len(), 2);
        assert_eq!(usages[0].kind, UsageKind::Indirect);
        assert_eq!(usages[0].line, 1);
        assert_eq!(usages[1].kind, UsageKind::Direct);
        assert_eq!((usages[1].line, usages[1].column), (2, 0));
        let caller = cb.symbol(usages[1].usage_symbol).unwrap();
        assert_eq!(caller.kind(), SymbolKind::Module);
        assert!(usages[1].via.is_some());

        let direct = cb.usages(foo, UsageKinds::DIRECT);
        assert_eq!(direct.len(), 1, "the call only");
    }

    // Test 2: X is a direct dependency of Y exactly when Y shows up as a
    // non-transitive usage of X
    #[test]
    fn test_inverse_consistency() {
        let cb = Codebase::from_sources(
            "/p",
            [
                ("a.ts", "export class Dog { bark() {} }\nexport function helper(d: Dog) { return d; }\n"),
                ("b.ts", "import * as ns from './a';\nimport { Dog as Pet } from './a';\nexport function run() { ns.helper(); Pet.bark(); }\n"),
            ],
        );
        let mut symbols = Vec::new();
        let mut seen = HashSet::new();
        for (from, to, _) in cb.graph().edges() {
            for id in [from, to] {
                if seen.insert(id) {
                    symbols.push(id);
                }
            }
        }
        let kinds = [
            UsageKind::Direct,
            UsageKind::Chained,
            UsageKind::Indirect,
            UsageKind::Aliased,
        ];
        for &y in &symbols {
            for kind in kinds {
                let types = UsageKinds::from(kind);
                let deps = cb.dependencies(y, types, 1).unwrap();
                for &x in &deps[&y] {
                    assert!(
                        cb.usages(x, types).iter().any(|u| u.usage_symbol == y && u.via.is_none()),
                        "{y} depends on {x} ({kind}) but is not among its usages"
                    );
                }
                for u in cb.usages(y, types).iter().filter(|u| u.via.is_none()) {
                    let deps = cb.dependencies(u.usage_symbol, types, 1).unwrap();
                    assert!(
                        deps[&u.usage_symbol].contains(&y),
                        "{} uses {y} ({kind}) but does not depend on it",
                        u.usage_symbol
                    );
                }
            }
        }
        assert!(symbols.len() > 4);
    }

    // Test 3: re-export chains are followed
    #[test]
    fn test_usages_through_barrel() {
        let cb = Codebase::from_sources(
            "/p",
            [
                ("a.ts", "export const value = 1;\n"),
                ("index.ts", "export * from './a';\n"),
                ("b.ts", "import { value } from './index';\nconsole.log(value);\n"),
            ],
        );
        let value = cb.get_symbol("value").unwrap();
        let paths: Vec<_> = cb
            .usages(value, UsageKinds::ALL)
            .iter()
            .map(|u| u.path.to_string_lossy().into_owned())
            .collect();
        assert_eq!(paths, vec!["b.ts", "b.ts"]);
    }
}
