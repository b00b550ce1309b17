use std::collections::{BTreeMap, BTreeSet};

use crate::codebase::Codebase;
use crate::edit::{EditRole, StructuralChange};
use crate::error::{RefactorError, Result};
use crate::graph::edge::{UsageKind, UsageKinds};
use crate::graph::node::{FileId, SymbolId, SymbolKind, SymbolPayload};
use crate::span::{widen_list_item, widen_statement};

use super::{PlanState, RefactorPlan};

impl Codebase {
    /// Queue removal of a declaration together with the import and
    /// re-export specifiers that name it. Remaining call sites are left
    /// alone and reported in the log.
    pub fn remove_symbol(&mut self, id: SymbolId) -> Result<()> {
        let plan = self.plan_remove(id)?;
        self.apply_plan(plan)
    }

    pub fn plan_remove(&self, id: SymbolId) -> Result<RefactorPlan> {
        let symbol = self
            .graph
            .symbol(id)
            .ok_or_else(|| RefactorError::SymbolNotFound(id.to_string()))?;
        if matches!(symbol.kind(), SymbolKind::Module | SymbolKind::External) {
            return Err(RefactorError::SymbolNotFound(format!(
                "{} is not a removable declaration",
                symbol.name
            )));
        }
        let home = symbol
            .file
            .ok_or_else(|| RefactorError::SymbolNotFound(symbol.name.clone()))?;

        let mut plan = RefactorPlan::new(vec![id]);

        // Bindings that only exist to carry this symbol, transitively.
        let mut statements: BTreeMap<(FileId, bool, usize), BTreeSet<usize>> = BTreeMap::new();
        let mut stack = vec![id];
        let mut seen = BTreeSet::from([id]);
        let mut dangling = 0usize;
        while let Some(current) = stack.pop() {
            for (user, edge) in self.graph.incoming(current, UsageKinds::ALL) {
                let Some(us) = self.graph.symbol(user) else {
                    continue;
                };
                let slot = match (&us.payload, edge.kind) {
                    (SymbolPayload::Import { statement_index, .. }, UsageKind::Indirect | UsageKind::Aliased) => {
                        Some((false, *statement_index))
                    }
                    (SymbolPayload::Export { statement_index, .. }, _) => Some((true, *statement_index)),
                    _ => None,
                };
                let Some((export, statement)) = slot else {
                    if !self.is_within(user, id) {
                        dangling += 1;
                    }
                    continue;
                };
                let Some(file) = us.file else {
                    continue;
                };
                let f = &self.files[file.0];
                let list = if export { &f.exports[statement] } else { &f.imports[statement] };
                if let Some(index) = list.iter().position(|&b| b == user) {
                    statements.entry((file, export, statement)).or_default().insert(index);
                }
                if seen.insert(user) {
                    stack.push(user);
                }
            }
        }
        plan.advance(PlanState::DependencyClosureComputed);

        let editable = self.editable(id)?;
        let text = &self.files[home.0].text;
        let span = match editable.role {
            EditRole::Statement => widen_statement(text, editable.span),
            EditRole::ListItem => widen_list_item(text, editable.span),
            EditRole::Token | EditRole::Span => editable.span,
        };
        plan.edit(home, span, "");

        for ((file, export, statement), indices) in statements {
            let total = if export {
                self.files[file.0].exports[statement].len()
            } else {
                self.files[file.0].imports[statement].len()
            };
            let keep: Vec<usize> = (0..total).filter(|i| !indices.contains(i)).collect();
            if export {
                self.rewrite_export(&mut plan, file, statement, &keep);
            } else {
                self.rewrite_import(&mut plan, file, statement, &keep);
            }
        }

        if dangling > 0 {
            log::warn!(
                "removing {} leaves {} usage(s) without a definition",
                symbol.qualified_name,
                dangling
            );
        }
        plan.changes.push(StructuralChange::Remove {
            name: symbol.qualified_name.clone(),
            file: self.files[home.0].path.clone(),
        });
        plan.advance(PlanState::StrategyApplied);
        Ok(plan)
    }

    /// True when `inner` is `outer` or nested inside it.
    fn is_within(&self, inner: SymbolId, outer: SymbolId) -> bool {
        let mut current = Some(inner);
        while let Some(id) = current {
            if id == outer {
                return true;
            }
            current = self.graph.symbol(id).and_then(|s| s.parent);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use crate::codebase::Codebase;

    // Test 1: the declaration and every specifier naming it go
    #[test]
    fn test_remove_symbol_with_imports() {
        let mut cb = Codebase::from_sources(
            "/p",
            [
                ("a.ts", "export function old() {}\n\nexport function keep() {}\n"),
                ("b.ts", "import { old, keep } from './a';\nkeep();\n"),
                ("c.ts", "import { old } from './a';\n"),
                ("index.ts", "export { old } from './a';\n"),
            ],
        );
        let old = cb.get_symbol("a.ts::old").unwrap();
        cb.remove_symbol(old).unwrap();
        let text = |p: &str| cb.pending_text(cb.file_id(p).unwrap());
        assert_eq!(text("a.ts"), "export function keep() {}\n");
        assert_eq!(text("b.ts"), "import { keep } from './a';\nkeep();\n");
        assert_eq!(text("c.ts"), "");
        assert_eq!(text("index.ts"), "");
        assert_eq!(cb.pending().unwrap().log().len(), 1);
    }
}
