use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;

use crate::codebase::Codebase;
use crate::error::{RefactorError, Result};
use crate::graph::edge::{UsageEdge, UsageKinds};
use crate::graph::node::SymbolId;

impl Codebase {
    /// Layer-by-layer dependencies of `id`.
    ///
    /// Breadth-first over outgoing edges whose kind is in `types`. Every
    /// symbol expanded at a depth below `max_depth` becomes a key, mapped to
    /// its direct dependencies in file-then-position order of the usage
    /// sites. A visited set keyed by symbol id means each symbol is expanded
    /// once, so cyclic graphs terminate.
    ///
    /// `max_depth == 1` is direct dependencies only; `0` is an error.
    pub fn dependencies(
        &self,
        id: SymbolId,
        types: UsageKinds,
        max_depth: usize,
    ) -> Result<IndexMap<SymbolId, Vec<SymbolId>>> {
        if max_depth == 0 {
            return Err(RefactorError::InvalidDepth(max_depth));
        }
        if !self.graph.contains(id) {
            return Err(RefactorError::SymbolNotFound(id.to_string()));
        }

        let mut layers: IndexMap<SymbolId, Vec<SymbolId>> = IndexMap::new();
        let mut visited: HashSet<SymbolId> = HashSet::from([id]);
        let mut queue: VecDeque<(SymbolId, usize)> = VecDeque::from([(id, 0)]);

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let direct = self.direct_dependencies(current, types);
            for &dep in &direct {
                if visited.insert(dep) {
                    queue.push_back((dep, depth + 1));
                }
            }
            layers.insert(current, direct);
        }

        Ok(layers)
    }

    /// Distinct targets of `id`'s outgoing edges, ordered by usage site.
    pub(crate) fn direct_dependencies(&self, id: SymbolId, types: UsageKinds) -> Vec<SymbolId> {
        let mut edges = self.graph.outgoing(id, types);
        self.sort_by_site(&mut edges);
        let mut seen = HashSet::new();
        edges
            .into_iter()
            .map(|(target, _)| target)
            .filter(|t| seen.insert(*t))
            .collect()
    }

    /// File path, then site offset.
    pub(crate) fn sort_by_site(&self, edges: &mut [(SymbolId, UsageEdge)]) {
        edges.sort_by(|(_, a), (_, b)| {
            self.files[a.file.0]
                .path
                .cmp(&self.files[b.file.0].path)
                .then(a.site.start.cmp(&b.site.start))
        });
    }
}

#[cfg(test)]
mod tests {
    use crate::codebase::Codebase;
    use crate::error::RefactorError;
    use crate::graph::edge::UsageKinds;

    fn names(cb: &Codebase, ids: &[crate::graph::node::SymbolId]) -> Vec<String> {
        ids.iter()
            .map(|&id| cb.symbol(id).unwrap().qualified_name.clone())
            .collect()
    }

    // Test 1: a two-symbol cycle terminates with each node expanded once
    #[test]
    fn test_cycle_terminates() {
        let cb = Codebase::from_sources(
            "/p",
            [("a.ts", "function a() { b(); }\nfunction b() { a(); }\n")],
        );
        let a = cb.get_symbol("a").unwrap();
        let b = cb.get_symbol("b").unwrap();
        let layers = cb.dependencies(a, UsageKinds::DIRECT, 5).unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[&a], vec![b]);
        assert_eq!(layers[&b], vec![a]);
    }

    // Test 2: max_depth bounds the expansion; 0 is rejected
    #[test]
    fn test_depth_limit() {
        let cb = Codebase::from_sources(
            "/p",
            [(
                "a.ts",
                "function c() {}\nfunction b() { c(); }\nfunction a() { b(); c(); }\n",
            )],
        );
        let a = cb.get_symbol("a").unwrap();
        let direct = cb.dependencies(a, UsageKinds::DIRECT, 1).unwrap();
        assert_eq!(direct.len(), 1);
        assert_eq!(names(&cb, &direct[&a]), vec!["b", "c"]);

        let deep = cb.dependencies(a, UsageKinds::DIRECT, 3).unwrap();
        assert_eq!(deep.len(), 3, "a, b and c are all expanded");

        assert!(matches!(
            cb.dependencies(a, UsageKinds::DIRECT, 0),
            Err(RefactorError::InvalidDepth(0))
        ));
    }

    // Test 3: kinds filter the traversal
    #[test]
    fn test_kind_filter() {
        let cb = Codebase::from_sources(
            "/p",
            [
                ("a.ts", "export function foo() {}\n"),
                ("b.ts", "import { foo } from './a';\nexport function run() { foo(); }\n"),
            ],
        );
        let run = cb.get_symbol("run").unwrap();
        let direct_only = cb.dependencies(run, UsageKinds::DIRECT, 2).unwrap();
        let import = cb.get_symbol("b.ts::foo").unwrap();
        assert_eq!(direct_only[&run], vec![import]);
        assert!(direct_only[&import].is_empty(), "the import edge is Indirect");

        let all = cb.dependencies(run, UsageKinds::ALL, 2).unwrap();
        let foo = cb.get_symbol("foo").unwrap();
        assert_eq!(all[&import], vec![foo]);
    }
}
