use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::codebase::Codebase;
use crate::edit::StructuralChange;
use crate::error::{RefactorError, Result};
use crate::graph::edge::{UsageKind, UsageKinds};
use crate::graph::node::{FileId, SymbolId, SymbolKind, SymbolPayload};
use crate::span::Span;

use super::{PlanFile, PlanState, RefactorPlan};

const RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "enum", "export", "extends", "false", "finally", "for", "function", "if", "import",
    "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw", "true", "try",
    "typeof", "var", "void", "while", "with", "let", "static", "yield", "await", "implements",
    "interface", "package", "private", "protected", "public",
];

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier regex is valid"))
}

/// True for names usable as a JavaScript binding.
pub fn is_valid_identifier(name: &str) -> bool {
    identifier_regex().is_match(name) && !RESERVED.contains(&name)
}

impl Codebase {
    /// Queue a rename of `id` and of every usage token that spells its name.
    ///
    /// Non-aliased import and re-export bindings carry the name into other
    /// files, so their own usages are renamed too. Aliased bindings only have
    /// their imported-name token rewritten.
    pub fn rename(&mut self, id: SymbolId, new_name: &str) -> Result<()> {
        let plan = self.plan_rename(id, new_name)?;
        self.apply_plan(plan)
    }

    pub fn plan_rename(&self, id: SymbolId, new_name: &str) -> Result<RefactorPlan> {
        if !is_valid_identifier(new_name) {
            return Err(RefactorError::InvalidName(new_name.to_owned()));
        }
        let target = self.rename_target(id)?;
        let symbol = self
            .graph
            .symbol(target)
            .ok_or_else(|| RefactorError::SymbolNotFound(id.to_string()))?;
        if symbol.kind() == SymbolKind::Module {
            return Err(RefactorError::SymbolNotFound(format!(
                "{} is a module, not a named symbol",
                symbol.name
            )));
        }
        let old_name = symbol.name.clone();
        let home = symbol
            .file
            .ok_or_else(|| RefactorError::SymbolNotFound(old_name.clone()))?;

        let mut plan = RefactorPlan::new(vec![target]);
        if old_name == new_name {
            plan.advance(PlanState::StrategyApplied);
            return Ok(plan);
        }
        self.check_scope_conflict(target, new_name)?;

        // Every token to rewrite, plus the bindings whose files now see the new name.
        let mut sites: BTreeSet<(FileId, Span)> = BTreeSet::from([(home, symbol.name_span)]);
        let mut carriers: Vec<SymbolId> = Vec::new();
        let mut visited: HashSet<SymbolId> = HashSet::from([target]);
        let mut stack = vec![target];
        while let Some(current) = stack.pop() {
            for (user, edge) in self.graph.incoming(current, UsageKinds::ALL) {
                if self.files[edge.file.0].text.get(edge.site.start..edge.site.end) != Some(old_name.as_str()) {
                    continue;
                }
                sites.insert((edge.file, edge.site));
                let Some(binding) = self.graph.symbol(user) else {
                    continue;
                };
                let carries = match binding.kind() {
                    SymbolKind::Import => edge.kind == UsageKind::Indirect && binding.name == old_name,
                    SymbolKind::Export => {
                        edge.kind != UsageKind::Aliased && binding.name == old_name
                    }
                    _ => false,
                };
                if carries && visited.insert(user) {
                    carriers.push(user);
                    stack.push(user);
                    if let SymbolPayload::Import { .. } = binding.payload {
                        sites.insert((edge.file, binding.name_span));
                    }
                }
            }
        }
        plan.advance(PlanState::DependencyClosureComputed);

        for &carrier in &carriers {
            if let Some(SymbolPayload::Import { .. }) = self.graph.symbol(carrier).map(|s| &s.payload) {
                self.check_file_conflict(carrier, new_name)?;
            }
        }

        for (file, span) in sites {
            // `{ foo }` keeps its key.
            let shorthand = self.files[file.0]
                .syntax
                .references
                .iter()
                .any(|r| r.shorthand && r.span == span);
            if shorthand {
                plan.edit(file, span, format!("{old_name}: {new_name}"));
            } else {
                plan.edit(file, span, new_name);
            }
        }
        let touched: BTreeSet<FileId> = plan
            .edits
            .iter()
            .filter_map(|e| match e.file {
                PlanFile::Existing(f) => Some(f),
                PlanFile::New(_) => None,
            })
            .collect();
        for file in touched {
            plan.changes.push(StructuralChange::Rename {
                from: old_name.clone(),
                to: new_name.to_owned(),
                file: self.files[file.0].path.clone(),
            });
        }
        plan.advance(PlanState::StrategyApplied);
        log::debug!(
            "rename {old_name} -> {new_name}: {} edit(s) via {} binding(s)",
            plan.edits.len(),
            carriers.len()
        );
        Ok(plan)
    }

    /// Bindings rename what they point at; definitions rename themselves.
    fn rename_target(&self, id: SymbolId) -> Result<SymbolId> {
        let symbol = self
            .graph
            .symbol(id)
            .ok_or_else(|| RefactorError::SymbolNotFound(id.to_string()))?;
        match symbol.kind() {
            SymbolKind::Module | SymbolKind::External => Err(RefactorError::SymbolNotFound(format!(
                "{} has no name to rename",
                symbol.name
            ))),
            SymbolKind::Import | SymbolKind::Export => {
                let mut current = id;
                let mut seen = HashSet::from([id]);
                loop {
                    let next = self
                        .graph
                        .outgoing(current, UsageKinds::INDIRECT | UsageKinds::DIRECT)
                        .into_iter()
                        .map(|(t, _)| t)
                        .find(|t| self.graph.symbol(*t).is_some_and(|s| s.file.is_some()));
                    let Some(next) = next else {
                        return Err(RefactorError::SymbolNotFound(format!(
                            "{} does not resolve to a definition",
                            symbol.name
                        )));
                    };
                    let kind = self.graph.symbol(next).map(|s| s.kind());
                    if !matches!(kind, Some(SymbolKind::Import | SymbolKind::Export))
                        || !seen.insert(next)
                    {
                        return Ok(next);
                    }
                    current = next;
                }
            }
            _ => Ok(id),
        }
    }

    /// Another symbol of the same scope already uses `name`.
    fn check_scope_conflict(&self, id: SymbolId, name: &str) -> Result<()> {
        let Some(symbol) = self.graph.symbol(id) else {
            return Ok(());
        };
        let Some(file) = symbol.file else {
            return Ok(());
        };
        let f = &self.files[file.0];
        let clash = f.symbol_ids().into_iter().any(|other| {
            other != id
                && self.graph.symbol(other).is_some_and(|s| {
                    s.name == name
                        && s.parent == symbol.parent
                        && s.member == symbol.member
                        && !matches!(s.kind(), SymbolKind::Module | SymbolKind::Export)
                })
        });
        if clash {
            return Err(RefactorError::NameConflict {
                path: f.path.clone(),
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    /// A file that imports the symbol non-aliased already has a top-level `name`.
    fn check_file_conflict(&self, binding: SymbolId, name: &str) -> Result<()> {
        let Some(file) = self.graph.symbol(binding).and_then(|s| s.file) else {
            return Ok(());
        };
        if self.resolver().top_level_local(file, name).is_some() {
            return Err(RefactorError::NameConflict {
                path: self.files[file.0].path.clone(),
                name: name.to_owned(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::is_valid_identifier;
    use crate::codebase::Codebase;
    use crate::error::RefactorError;

    fn text(cb: &Codebase, path: &str) -> String {
        cb.pending_text(cb.file_id(path).unwrap())
    }

    // Test 1: identifier validation
    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("bar"));
        assert!(is_valid_identifier("$el"));
        assert!(is_valid_identifier("_private1"));
        assert!(!is_valid_identifier("1abc"));
        assert!(!is_valid_identifier("class"));
        assert!(!is_valid_identifier("a-b"));
    }

    // Test 2: definition, import and call sites all change
    #[test]
    fn test_rename_across_files() {
        let mut cb = Codebase::from_sources(
            "/p",
            [
                ("a.ts", "export function foo() {}\nfoo();\n"),
                ("b.ts", "import { foo } from './a';\nfoo();\n"),
                ("c.ts", "import { foo as f } from './a';\nf();\n"),
            ],
        );
        let foo = cb.get_symbol("a.ts::foo").unwrap();
        cb.rename(foo, "bar").unwrap();
        assert_eq!(text(&cb, "a.ts"), "export function bar() {}\nbar();\n");
        assert_eq!(text(&cb, "b.ts"), "import { bar } from './a';\nbar();\n");
        assert_eq!(text(&cb, "c.ts"), "import { bar as f } from './a';\nf();\n");
    }

    // Test 3: renaming through a re-export and a namespace member
    #[test]
    fn test_rename_through_barrel_and_namespace() {
        let mut cb = Codebase::from_sources(
            "/p",
            [
                ("lib.ts", "export const limit = 3;\n"),
                ("index.ts", "export { limit } from './lib';\n"),
                ("use.ts", "import { limit } from './index';\nimport * as lib from './lib';\nconsole.log(limit, lib.limit);\n"),
            ],
        );
        let limit = cb.get_symbol("lib.ts::limit").unwrap();
        cb.rename(limit, "max").unwrap();
        assert_eq!(text(&cb, "index.ts"), "export { max } from './lib';\n");
        assert_eq!(
            text(&cb, "use.ts"),
            "import { max } from './index';\nimport * as lib from './lib';\nconsole.log(max, lib.max);\n"
        );
    }

    // Test 4: conflicts are reported before anything is queued
    #[test]
    fn test_rename_conflicts() {
        let mut cb = Codebase::from_sources(
            "/p",
            [
                ("a.ts", "export function foo() {}\nfunction taken() {}\n"),
                ("b.ts", "import { foo } from './a';\nconst bar = 1;\nfoo(bar);\n"),
            ],
        );
        let foo = cb.get_symbol("a.ts::foo").unwrap();
        assert!(matches!(
            cb.rename(foo, "taken"),
            Err(RefactorError::NameConflict { .. })
        ));
        assert!(matches!(
            cb.rename(foo, "bar"),
            Err(RefactorError::NameConflict { .. })
        ));
        assert!(matches!(cb.rename(foo, "9x"), Err(RefactorError::InvalidName(_))));
        assert!(!cb.has_pending_changes());
    }

    // Test 5: renaming via the import binding renames the definition
    #[test]
    fn test_rename_from_import_binding() {
        let mut cb = Codebase::from_sources(
            "/p",
            [
                ("a.ts", "export class Dog {}\n"),
                ("b.ts", "import { Dog } from './a';\nnew Dog();\n"),
            ],
        );
        let binding = cb.get_symbol("b.ts::Dog").unwrap();
        cb.rename(binding, "Hound").unwrap();
        assert_eq!(text(&cb, "a.ts"), "export class Hound {}\n");
        assert_eq!(text(&cb, "b.ts"), "import { Hound } from './a';\nnew Hound();\n");
    }

    // Test 6: parameters, catch bindings and loop variables of the same name are untouched
    #[test]
    fn test_rename_skips_shadowing_bindings() {
        let src = "function foo() {}\nfoo();\n[1].map(foo => foo + 1);\ntry { foo(); } catch (foo) { console.log(foo); }\nfor (const foo of [1]) { console.log(foo); }\n";
        let mut cb = Codebase::from_sources("/p", [("a.ts", src)]);
        let foo = cb.get_symbol("a.ts::foo").unwrap();
        cb.rename(foo, "bar").unwrap();
        assert_eq!(
            text(&cb, "a.ts"),
            "function bar() {}\nbar();\n[1].map(foo => foo + 1);\ntry { bar(); } catch (foo) { console.log(foo); }\nfor (const foo of [1]) { console.log(foo); }\n"
        );
    }

    // Test 7: shorthand properties keep their key
    #[test]
    fn test_rename_shorthand_property() {
        let mut cb = Codebase::from_sources(
            "/p",
            [
                ("a.ts", "export const foo = 1;\nexport const o = { foo };\n"),
                ("b.ts", "import { foo } from './a';\nexport const p = { foo, n: foo };\n"),
            ],
        );
        let foo = cb.get_symbol("a.ts::foo").unwrap();
        cb.rename(foo, "bar").unwrap();
        assert_eq!(
            text(&cb, "a.ts"),
            "export const bar = 1;\nexport const o = { foo: bar };\n"
        );
        assert_eq!(
            text(&cb, "b.ts"),
            "import { bar } from './a';\nexport const p = { foo: bar, n: bar };\n"
        );
    }
}
