use std::collections::BTreeMap;

use serde::Serialize;

use crate::codebase::Codebase;
use crate::graph::edge::UsageKind;
use crate::graph::node::SymbolKind;
use crate::resolver::ResolveStats;

/// Aggregated project statistics derived from the symbol graph.
#[derive(Debug, Serialize)]
pub struct ProjectStats {
    pub file_count: usize,
    pub unparsed_files: usize,
    /// Excludes Module and External placeholders.
    pub symbol_count: usize,
    pub symbols_by_kind: BTreeMap<SymbolKind, usize>,
    pub edge_count: usize,
    pub edges_by_kind: BTreeMap<UsageKind, usize>,
    pub external_packages: usize,
    pub warnings: usize,
    pub resolve: ResolveStats,
}

impl Codebase {
    /// Compute project statistics from the current graph.
    pub fn stats(&self) -> ProjectStats {
        let symbols_by_kind: BTreeMap<SymbolKind, usize> =
            self.graph.symbols_by_kind().into_iter().collect();
        let placeholders = |k: SymbolKind| symbols_by_kind.get(&k).copied().unwrap_or(0);
        let external_packages = placeholders(SymbolKind::External);
        let symbol_count =
            self.graph.symbol_count() - placeholders(SymbolKind::Module) - external_packages;

        ProjectStats {
            file_count: self.files.len(),
            unparsed_files: self.files.iter().filter(|f| !f.is_parsed()).count(),
            symbol_count,
            edge_count: self.graph.edge_count(),
            edges_by_kind: self.graph.edges_by_kind().into_iter().collect(),
            external_packages,
            warnings: self.warnings().len(),
            resolve: self.resolve_stats(),
            symbols_by_kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::codebase::Codebase;
    use crate::graph::edge::UsageKind;
    use crate::graph::node::SymbolKind;

    // Test 1: counts cover files, kinds, externals and warnings
    #[test]
    fn test_project_stats() {
        let cb = Codebase::from_sources(
            "/p",
            [
                ("a.ts", "import React from 'react';\nexport function foo() {}\n"),
                ("b.ts", "import { foo } from './a';\nimport { gone } from './gone';\nfoo();\n"),
                ("broken.ts", "function (\n"),
            ],
        );
        let stats = cb.stats();
        assert_eq!(stats.file_count, 3);
        assert_eq!(stats.unparsed_files, 1);
        assert_eq!(stats.symbols_by_kind[&SymbolKind::Function], 1);
        assert_eq!(stats.symbols_by_kind[&SymbolKind::Import], 3);
        assert_eq!(stats.symbols_by_kind[&SymbolKind::Module], 3);
        assert_eq!(stats.symbol_count, 4);
        assert_eq!(stats.external_packages, 2, "react and './gone'");
        assert_eq!(stats.edges_by_kind[&UsageKind::Indirect], 3);
        assert_eq!(stats.warnings, 2, "one parse failure, one unresolved import");
        assert_eq!(stats.resolve.unresolved, 1);
    }
}
