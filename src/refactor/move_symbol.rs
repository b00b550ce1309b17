use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use crate::codebase::Codebase;
use crate::edit::{EditRole, StructuralChange};
use crate::error::{RefactorError, Result};
use crate::graph::edge::{UsageKind, UsageKinds};
use crate::graph::node::{FileId, Symbol, SymbolId, SymbolKind, SymbolPayload};
use crate::parser::imports::{ExportItemKind, ImportBindingKind};
use crate::parser::languages::Lang;
use crate::resolver::ModuleTarget;
use crate::resolver::module_path::{normalize, relative_specifier};
use crate::span::{Span, widen_statement};

use super::{ImportClause, ImportSet, MoveStrategy, PlanState, RefactorPlan};

/// Import or export statement `statement` of a file, binding `index` in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct BindingSlot {
    file: FileId,
    export: bool,
    statement: usize,
    index: usize,
}

/// Where the moved code ends up.
enum Destination {
    Existing(FileId),
    New(PathBuf),
}

/// Edits to module statements, collected per statement so each statement is
/// rewritten at most once.
#[derive(Default)]
struct StatementDrops {
    drops: BTreeMap<(FileId, bool, usize), BTreeSet<usize>>,
}

impl StatementDrops {
    fn drop(&mut self, slot: BindingSlot) {
        self.drops
            .entry((slot.file, slot.export, slot.statement))
            .or_default()
            .insert(slot.index);
    }
}

impl Codebase {
    /// Move `id` (and, with `include_dependencies`, the same-file top-level
    /// symbols it needs) to `dest`, keeping importers consistent with
    /// `strategy`. `dest` may be an analysed file or a new one.
    pub fn move_to_file(
        &mut self,
        id: SymbolId,
        dest: impl AsRef<Path>,
        include_dependencies: bool,
        strategy: MoveStrategy,
    ) -> Result<()> {
        let plan = self.plan_move(id, dest.as_ref(), include_dependencies, strategy)?;
        self.apply_plan(plan)
    }

    pub fn plan_move(
        &self,
        id: SymbolId,
        dest: &Path,
        include_dependencies: bool,
        strategy: MoveStrategy,
    ) -> Result<RefactorPlan> {
        let symbol = self
            .graph
            .symbol(id)
            .ok_or_else(|| RefactorError::SymbolNotFound(id.to_string()))?;
        let unsupported = |reason: &str| RefactorError::UnsupportedMove {
            name: symbol.qualified_name.clone(),
            reason: reason.to_owned(),
        };
        if !symbol.kind().is_definition() || !symbol.is_top_level() || symbol.member {
            return Err(unsupported("only top-level declarations can be moved"));
        }
        let source = symbol.file.ok_or_else(|| unsupported("it has no source file"))?;

        let relative = dest.strip_prefix(self.root()).unwrap_or(dest);
        let dest_path =
            normalize(relative).ok_or_else(|| unsupported("destination is outside the project"))?;
        if Lang::from_path(&dest_path).is_none() {
            return Err(unsupported("destination is not a TypeScript or JavaScript file"));
        }
        let destination = match self.file_id(&dest_path) {
            Some(d) if d == source => return Err(unsupported("it is already in that file")),
            Some(d) if !self.files[d.0].is_parsed() => {
                return Err(unsupported("the destination file did not parse"));
            }
            Some(d) => Destination::Existing(d),
            None if self.is_disk_backed() && self.root().join(&dest_path).exists() => {
                return Err(unsupported("the destination exists but is not an analysed source file"));
            }
            None => Destination::New(dest_path.clone()),
        };
        let dest_id = match &destination {
            Destination::Existing(d) => Some(*d),
            Destination::New(_) => None,
        };

        // Requested -> DependencyClosureComputed
        let moved = if include_dependencies {
            self.move_closure(source, id)
        } else {
            vec![id]
        };
        let mut plan = RefactorPlan::new(moved.clone());
        plan.advance(PlanState::DependencyClosureComputed);

        let moved_set: HashSet<SymbolId> = moved.iter().copied().collect();
        for &m in &moved {
            let editable = self.editable(m)?;
            if editable.role != EditRole::Statement || self.shares_statement(source, m, &moved_set) {
                return Err(RefactorError::UnsupportedMove {
                    name: self.name_of(m),
                    reason: "it shares its statement with other declarations".into(),
                });
            }
            if let Some(d) = dest_id {
                self.check_destination_conflict(d, m)?;
            }
        }
        let subtree = self.subtree_of(source, &moved_set);

        let source_path = self.files[source.0].path.clone();
        let to_dest = relative_specifier(&source_path, &dest_path);
        let to_source = relative_specifier(&dest_path, &source_path);

        // What the moved code needs from the rest of the source file.
        let mut dest_imports = ImportSet::default();
        let mut staying: Vec<SymbolId> = Vec::new();
        let mut drops = StatementDrops::default();
        for &s in &subtree {
            for (target, _) in self.graph.outgoing(s, UsageKinds::ALL) {
                if subtree.contains(&target) {
                    continue;
                }
                let Some(t) = self.graph.symbol(target) else {
                    continue;
                };
                if t.file != Some(source) {
                    continue;
                }
                match t.kind() {
                    SymbolKind::Import => {
                        let Some(slot) = self.binding_slot(target) else {
                            continue;
                        };
                        self.carry_import(slot, &dest_path, dest_id, &mut dest_imports);
                        let only_moved = self
                            .graph
                            .incoming(target, UsageKinds::ALL)
                            .iter()
                            .all(|(user, _)| subtree.contains(user));
                        if only_moved {
                            drops.drop(slot);
                        }
                    }
                    SymbolKind::Export | SymbolKind::Module | SymbolKind::External => {}
                    _ => {
                        let top = self.top_level_of(target);
                        if !moved_set.contains(&top) && !staying.contains(&top) {
                            staying.push(top);
                        }
                    }
                }
            }
        }
        staying.sort_by_key(|&s| self.graph.symbol(s).map(|x| x.span.start));
        let mut export_keywords: BTreeSet<usize> = BTreeSet::new();
        for &s in &staying {
            let Some(st) = self.graph.symbol(s) else {
                continue;
            };
            if dest_id.is_some_and(|d| self.resolver().top_level_local(d, &st.name).is_some()) {
                continue;
            }
            match self.public_name_in(source, s) {
                Some(public) if public == "default" => {
                    dest_imports.clause(&to_source).default = Some(st.name.clone())
                }
                Some(public) if public == st.name => {
                    dest_imports.clause(&to_source).add_named(public)
                }
                Some(public) => dest_imports
                    .clause(&to_source)
                    .add_named(format!("{public} as {}", st.name)),
                None => {
                    export_keywords.insert(st.statement.start);
                    dest_imports.clause(&to_source).add_named(st.name.clone());
                }
            }
        }

        // Who uses the moved symbols from outside the moved code.
        let mut source_needs = ImportClause::default();
        let mut forward: Vec<String> = Vec::new();
        let mut direct_importers: BTreeMap<(FileId, bool, usize), Vec<usize>> = BTreeMap::new();
        let mut must_export: HashSet<SymbolId> = HashSet::new();
        for &m in &moved {
            let Some(ms) = self.graph.symbol(m) else {
                continue;
            };
            for (user, edge) in self.graph.incoming(m, UsageKinds::ALL) {
                if subtree.contains(&user) {
                    continue;
                }
                let Some(us) = self.graph.symbol(user) else {
                    continue;
                };
                let binding = matches!(us.kind(), SymbolKind::Import | SymbolKind::Export);
                if edge.file == source {
                    if let (SymbolKind::Export, Some(slot)) = (us.kind(), self.binding_slot(user)) {
                        // `export { m as pub }` in the source becomes a forward.
                        let item = &self.files[source.0].syntax.exports[slot.statement].items[slot.index];
                        if let ExportItemKind::Named { local } = &item.kind {
                            forward.push(if *local == item.exported || item.exported == "default" {
                                item.exported.clone()
                            } else {
                                format!("{local} as {}", item.exported)
                            });
                        }
                        drops.drop(slot);
                    } else if ms.default_export {
                        source_needs.default = Some(ms.name.clone());
                    } else {
                        source_needs.add_named(ms.name.clone());
                    }
                    must_export.insert(m);
                    continue;
                }
                if !binding || edge.kind == UsageKind::Direct {
                    // `ns.m` through a namespace import of the source.
                    if strategy == MoveStrategy::UpdateAllImports {
                        forward.push(self.forward_name(ms));
                    }
                    must_export.insert(m);
                    continue;
                }
                let Some(slot) = self.binding_slot(user) else {
                    continue;
                };
                if Some(slot.file) == dest_id {
                    drops.drop(slot);
                    continue;
                }
                if strategy == MoveStrategy::AddBackEdge {
                    continue;
                }
                if self.statement_module(slot) == ModuleTarget::File(source) {
                    direct_importers
                        .entry((slot.file, slot.export, slot.statement))
                        .or_default()
                        .push(slot.index);
                } else {
                    // Reached through a barrel that re-exports the source.
                    forward.push(self.forward_name(ms));
                }
                must_export.insert(m);
            }
            if strategy == MoveStrategy::AddBackEdge && ms.exported {
                forward.push(self.forward_name(ms));
            }
        }
        let mut seen = HashSet::new();
        forward.retain(|f| seen.insert(f.clone()));

        // StrategyApplied: build the edits.
        self.plan_importer_updates(&mut plan, &direct_importers, &dest_path, &mut drops);

        for (&(file, export, statement), indices) in &drops.drops {
            let all = if export {
                self.files[file.0].syntax.exports[statement].items.len()
            } else {
                self.files[file.0].syntax.imports[statement].bindings.len()
            };
            let keep: Vec<usize> = (0..all).filter(|i| !indices.contains(i)).collect();
            if export {
                self.rewrite_export(&mut plan, file, statement, &keep);
            } else {
                self.rewrite_import(&mut plan, file, statement, &keep);
            }
        }

        let style = self.style_of(source);
        let mut header: Vec<String> = Vec::new();
        if !forward.is_empty() {
            header.push(style.reexport(&forward, &to_dest));
        }
        if !source_needs.is_empty() {
            header.push(style.import(&source_needs, &to_dest));
        }
        if !header.is_empty() {
            let (at, _) = self.statement_insertion_point(source);
            plan.edit(source, Span::point(at), format!("{}\n", header.join("\n")));
        }
        for at in export_keywords {
            plan.edit(source, Span::point(at), "export ");
        }

        let mut blocks: Vec<String> = Vec::new();
        for &m in &moved {
            let editable = self.editable(m)?;
            let text = &self.files[source.0].text;
            plan.take_block(source, widen_statement(text, editable.span));

            let Some(ms) = self.graph.symbol(m) else {
                continue;
            };
            let split = ms.statement.start.clamp(editable.span.start, editable.span.end);
            let doc = self.virtual_text(source, Span::new(editable.span.start, split));
            let body = self.virtual_text(source, Span::new(split, editable.span.end));
            let keyword = if !ms.exported && must_export.contains(&m) { "export " } else { "" };
            let mut block = format!("{doc}{keyword}{body}");
            if !block.trim_end().ends_with(['}', ';']) && style.semi {
                block.push(';');
            }
            if self.default_exported_by_statement(source, ms) {
                let semi = if style.semi { ";" } else { "" };
                block.push_str(&format!("\nexport default {}{semi}", ms.name));
            }
            blocks.push(block);
            plan.changes.push(StructuralChange::Move {
                name: ms.qualified_name.clone(),
                from: source_path.clone(),
                to: dest_path.clone(),
            });
        }
        let code = format!("{}\n", blocks.join("\n\n"));
        let imports = dest_imports.render(dest_id.map_or(style, |d| self.style_of(d)));

        match destination {
            Destination::New(path) => {
                let mut text = String::new();
                if !imports.is_empty() {
                    text.push_str(&imports.join("\n"));
                    text.push_str("\n\n");
                }
                text.push_str(&code);
                plan.changes.push(StructuralChange::CreateFile { path: path.clone() });
                plan.insert_new(path, text);
            }
            Destination::Existing(d) => {
                let existing = &self.files[d.0].text;
                if !imports.is_empty() {
                    let (at, has_imports) = self.statement_insertion_point(d);
                    let gap = if has_imports || existing.is_empty() { "\n" } else { "\n\n" };
                    plan.edit(d, Span::point(at), format!("{}{gap}", imports.join("\n")));
                }
                let lead = if existing.is_empty() || existing.ends_with("\n\n") {
                    ""
                } else if existing.ends_with('\n') {
                    "\n"
                } else {
                    "\n\n"
                };
                plan.edit(d, Span::point(existing.len()), format!("{lead}{code}"));
            }
        }
        plan.advance(PlanState::StrategyApplied);

        log::debug!(
            "move {} symbol(s) {} -> {} ({:?}): {} edit(s)",
            moved.len(),
            source_path.display(),
            dest_path.display(),
            strategy,
            plan.edits.len()
        );
        Ok(plan)
    }

    /// Destructuring declarations bind several names in one statement.
    fn shares_statement(&self, file: FileId, id: SymbolId, moved: &HashSet<SymbolId>) -> bool {
        let Some(symbol) = self.graph.symbol(id) else {
            return false;
        };
        self.files[file.0].declarations.iter().any(|&other| {
            other != id
                && !moved.contains(&other)
                && self
                    .graph
                    .symbol(other)
                    .is_some_and(|s| s.is_top_level() && s.statement == symbol.statement)
        })
    }

    /// `id` plus every same-file top-level definition it reaches, in source order.
    fn move_closure(&self, file: FileId, id: SymbolId) -> Vec<SymbolId> {
        let mut closure: HashSet<SymbolId> = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            let one = HashSet::from([current]);
            for s in self.subtree_of(file, &one) {
                for (target, _) in self.graph.outgoing(s, UsageKinds::ALL) {
                    let Some(t) = self.graph.symbol(target) else {
                        continue;
                    };
                    if t.file != Some(file) || !t.kind().is_definition() {
                        continue;
                    }
                    let top = self.top_level_of(target);
                    let movable = self
                        .graph
                        .symbol(top)
                        .is_some_and(|x| x.kind().is_definition() && !x.member);
                    if movable && closure.insert(top) {
                        queue.push_back(top);
                    }
                }
            }
        }
        let mut ordered: Vec<SymbolId> = closure.into_iter().collect();
        ordered.sort_by_key(|&s| self.graph.symbol(s).map(|x| x.span.start));
        ordered
    }

    /// The outermost declaration enclosing `id`.
    fn top_level_of(&self, id: SymbolId) -> SymbolId {
        let mut current = id;
        while let Some(parent) = self.graph.symbol(current).and_then(|s| s.parent) {
            current = parent;
        }
        current
    }

    /// Every declaration of `file` nested in (or equal to) one of `roots`.
    fn subtree_of(&self, file: FileId, roots: &HashSet<SymbolId>) -> BTreeSet<SymbolId> {
        self.files[file.0]
            .declarations
            .iter()
            .copied()
            .filter(|&d| roots.contains(&self.top_level_of(d)))
            .collect()
    }

    fn name_of(&self, id: SymbolId) -> String {
        self.graph
            .symbol(id)
            .map(|s| s.qualified_name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    fn binding_slot(&self, id: SymbolId) -> Option<BindingSlot> {
        let symbol = self.graph.symbol(id)?;
        let file = symbol.file?;
        let f = &self.files[file.0];
        let (export, statement, list) = match symbol.payload {
            SymbolPayload::Import { statement_index, .. } => {
                (false, statement_index, f.imports.get(statement_index)?)
            }
            SymbolPayload::Export { statement_index, .. } => {
                (true, statement_index, f.exports.get(statement_index)?)
            }
            _ => return None,
        };
        let index = list.iter().position(|&b| b == id)?;
        Some(BindingSlot {
            file,
            export,
            statement,
            index,
        })
    }

    fn statement_module(&self, slot: BindingSlot) -> ModuleTarget {
        let f = &self.files[slot.file.0];
        let specifier = if slot.export {
            match &f.syntax.exports[slot.statement].source {
                Some((s, _)) => s.as_str(),
                None => return ModuleTarget::File(slot.file),
            }
        } else {
            f.syntax.imports[slot.statement].module_path.as_str()
        };
        self.resolver().resolve_module(slot.file, specifier)
    }

    /// The name `file` exposes `id` under, if any.
    fn public_name_in(&self, file: FileId, id: SymbolId) -> Option<String> {
        let symbol = self.graph.symbol(id)?;
        if let Some(name) = symbol.public_name() {
            return Some(name.to_owned());
        }
        self.files[file.0]
            .syntax
            .exports
            .iter()
            .filter(|e| e.source.is_none())
            .flat_map(|e| e.items.iter())
            .find_map(|item| match &item.kind {
                ExportItemKind::Named { local } if *local == symbol.name => Some(item.exported.clone()),
                _ => None,
            })
    }

    /// `export default name;` in `file`, separate from the declaration.
    fn default_exported_by_statement(&self, file: FileId, symbol: &Symbol) -> bool {
        !symbol.default_export
            && symbol.is_top_level()
            && self.files[file.0]
                .syntax
                .exports
                .iter()
                .filter(|e| e.source.is_none())
                .flat_map(|e| e.items.iter())
                .any(|item| {
                    item.exported == "default"
                        && matches!(&item.kind, ExportItemKind::Named { local } if *local == symbol.name)
                })
    }

    fn forward_name(&self, symbol: &Symbol) -> String {
        if symbol.default_export {
            "default".into()
        } else {
            symbol.name.clone()
        }
    }

    /// Re-create a source import binding in the destination.
    fn carry_import(
        &self,
        slot: BindingSlot,
        dest_path: &Path,
        dest_id: Option<FileId>,
        imports: &mut ImportSet,
    ) {
        let f = &self.files[slot.file.0];
        let decl = &f.syntax.imports[slot.statement];
        let binding = &decl.bindings[slot.index];
        if dest_id.is_some_and(|d| self.resolver().top_level_local(d, &binding.local).is_some()) {
            return;
        }
        let specifier = match self.resolver().resolve_module(slot.file, &decl.module_path) {
            ModuleTarget::File(t) if Some(t) == dest_id => {
                log::debug!("{} is defined in the destination", binding.local);
                return;
            }
            ModuleTarget::File(t) => relative_specifier(dest_path, &self.files[t.0].path),
            ModuleTarget::External(_) => decl.module_path.clone(),
            ModuleTarget::Unresolved => {
                let dir = f.path.parent().unwrap_or(Path::new(""));
                match normalize(&dir.join(&decl.module_path)) {
                    Some(target) => relative_specifier(dest_path, &target),
                    None => decl.module_path.clone(),
                }
            }
        };
        let clause = imports.clause(&specifier);
        match &binding.kind {
            ImportBindingKind::Default => clause.default = Some(binding.local.clone()),
            ImportBindingKind::Namespace => clause.namespace = Some(binding.local.clone()),
            ImportBindingKind::Named { .. } => clause.add_named(
                binding
                    .item_span
                    .slice(&f.text)
                    .unwrap_or(&binding.local)
                    .to_owned(),
            ),
        }
    }

    /// A top-level name in the destination would collide with a moved symbol.
    fn check_destination_conflict(&self, dest: FileId, moved: SymbolId) -> Result<()> {
        let Some(symbol) = self.graph.symbol(moved) else {
            return Ok(());
        };
        let f = &self.files[dest.0];
        let conflict = |name: &str| RefactorError::NameConflict {
            path: f.path.clone(),
            name: name.to_owned(),
        };
        for &d in &f.declarations {
            if let Some(s) = self.graph.symbol(d)
                && s.is_top_level()
                && !s.member
                && s.name == symbol.name
            {
                return Err(conflict(&symbol.name));
            }
        }
        for &b in f.imports.iter().flatten() {
            if let Some(s) = self.graph.symbol(b)
                && s.name == symbol.name
            {
                let same = self
                    .graph
                    .outgoing(b, UsageKinds::ALL)
                    .iter()
                    .any(|(t, _)| *t == moved);
                if !same {
                    return Err(conflict(&symbol.name));
                }
            }
        }
        let is_default = symbol.default_export
            || symbol
                .file
                .is_some_and(|source| self.default_exported_by_statement(source, symbol));
        if is_default
            && f.declarations
                .iter()
                .chain(f.exports.iter().flatten())
                .any(|&d| self.graph.symbol(d).is_some_and(|s| s.public_name() == Some("default")))
        {
            return Err(conflict("default"));
        }
        Ok(())
    }

    /// `UpdateAllImports`: point importers of the source at the destination,
    /// splitting statements that also import names that stay behind.
    fn plan_importer_updates(
        &self,
        plan: &mut RefactorPlan,
        importers: &BTreeMap<(FileId, bool, usize), Vec<usize>>,
        dest_path: &Path,
        drops: &mut StatementDrops,
    ) {
        for (&(file, export, statement), moved) in importers {
            let f = &self.files[file.0];
            let specifier = relative_specifier(&f.path, dest_path);
            let style = self.style_of(file);
            let (source_span, statement_span, total) = if export {
                let decl = &f.syntax.exports[statement];
                let Some((_, span)) = &decl.source else {
                    continue;
                };
                (*span, decl.statement, decl.items.len())
            } else {
                let decl = &f.syntax.imports[statement];
                (decl.source_span, decl.statement, decl.bindings.len())
            };

            if moved.len() == total {
                let quote = f.text[source_span.start..].chars().next().unwrap_or(style.quote);
                plan.edit(file, source_span, format!("{quote}{specifier}{quote}"));
                continue;
            }

            let line = if export {
                let decl = &f.syntax.exports[statement];
                let items: Vec<String> = moved
                    .iter()
                    .filter_map(|&i| decl.items[i].item_span.slice(&f.text).map(str::to_owned))
                    .collect();
                style.reexport(&items, &specifier)
            } else {
                let decl = &f.syntax.imports[statement];
                let mut clause = ImportClause {
                    type_only: f.text[decl.statement.start..decl.statement.end]
                        .starts_with("import type"),
                    ..Default::default()
                };
                for &i in moved {
                    let b = &decl.bindings[i];
                    match b.kind {
                        ImportBindingKind::Default => clause.default = Some(b.local.clone()),
                        _ => clause.add_named(
                            b.item_span.slice(&f.text).unwrap_or(&b.local).to_owned(),
                        ),
                    }
                }
                style.import(&clause, &specifier)
            };
            plan.edit(file, Span::point(statement_span.end), format!("\n{line}"));
            for &index in moved {
                drops.drop(BindingSlot {
                    file,
                    export,
                    statement,
                    index,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::codebase::Codebase;
    use crate::error::{RefactorError, Warning};
    use crate::refactor::{MoveStrategy, PlanState};

    fn text(cb: &Codebase, path: &str) -> String {
        cb.pending_text(cb.file_id(path).unwrap())
    }

    // Test 1: back-edge leaves importers alone and forwards once
    #[test]
    fn test_move_add_back_edge() {
        let mut cb = Codebase::from_sources(
            "/p",
            [
                ("a.ts", "export function bar() {}\n"),
                ("b.ts", "import { bar } from './a';\nbar();\n"),
            ],
        );
        let bar = cb.get_symbol("bar").unwrap();
        cb.move_to_file(bar, "file_c.ts", false, MoveStrategy::AddBackEdge)
            .unwrap();
        assert_eq!(text(&cb, "file_c.ts"), "export function bar() {}\n");
        assert_eq!(text(&cb, "a.ts"), "export { bar } from './file_c';\n");
        assert_eq!(text(&cb, "b.ts"), "import { bar } from './a';\nbar();\n");
    }

    // Test 2: update-all rewrites and splits importer statements
    #[test]
    fn test_move_update_all_imports() {
        let mut cb = Codebase::from_sources(
            "/p",
            [
                ("src/a.ts", "export function foo() {}\n\nexport function keep() {}\n"),
                ("src/b.ts", "import { foo } from './a';\nfoo();\n"),
                ("src/c.ts", "import { foo, keep } from './a';\nfoo(keep);\n"),
            ],
        );
        let foo = cb.get_symbol("foo").unwrap();
        cb.move_to_file(foo, "src/util/foo.ts", false, MoveStrategy::UpdateAllImports)
            .unwrap();
        assert_eq!(text(&cb, "src/util/foo.ts"), "export function foo() {}\n");
        assert_eq!(text(&cb, "src/a.ts"), "export function keep() {}\n");
        assert_eq!(text(&cb, "src/b.ts"), "import { foo } from './util/foo';\nfoo();\n");
        assert_eq!(
            text(&cb, "src/c.ts"),
            "import { keep } from './a';\nimport { foo } from './util/foo';\nfoo(keep);\n"
        );
    }

    // Test 3: dependencies come along and leftovers are imported
    #[test]
    fn test_move_with_dependencies() {
        let mut cb = Codebase::from_sources(
            "/p",
            [(
                "a.ts",
                "import { join } from 'path';\n\nconst SEP = '/';\n\nfunction helper(x: string) {\n  return join(x, SEP);\n}\n\nexport function run() {\n  return helper('a') + shared();\n}\n\nfunction shared() {\n  return 1;\n}\n\nshared();\n",
            )],
        );
        let run = cb.get_symbol("run").unwrap();
        let plan = cb
            .plan_move(run, std::path::Path::new("b.ts"), true, MoveStrategy::UpdateAllImports)
            .unwrap();
        assert_eq!(plan.state(), PlanState::StrategyApplied);
        let names: Vec<_> = plan
            .symbols
            .iter()
            .map(|&s| cb.symbol(s).unwrap().name.clone())
            .collect();
        assert_eq!(names, vec!["SEP", "helper", "run", "shared"]);

        let mut cb = cb;
        cb.apply_plan(plan).unwrap();
        let b = text(&cb, "b.ts");
        assert!(
            b.starts_with("import { join } from 'path';\n\nconst SEP = '/';\n\nfunction helper("),
            "{b}"
        );
        assert!(b.contains("\n\nexport function shared() {"), "{b}");
        let a = text(&cb, "a.ts");
        assert_eq!(a, "import { shared } from './b';\nshared();\n");
    }

    // Test 4: destination conflicts fail before anything is queued
    #[test]
    fn test_move_conflict() {
        let mut cb = Codebase::from_sources(
            "/p",
            [
                ("a.ts", "export function foo() {}\n"),
                ("b.ts", "export const foo = 1;\n"),
            ],
        );
        let foo = cb.get_symbol("a.ts::foo").unwrap();
        assert!(matches!(
            cb.move_to_file(foo, "b.ts", false, MoveStrategy::UpdateAllImports),
            Err(RefactorError::NameConflict { .. })
        ));
        assert!(!cb.has_pending_changes());
    }

    // Test 5: members and imports cannot be moved
    #[test]
    fn test_move_unsupported() {
        let mut cb = Codebase::from_sources(
            "/p",
            [("a.ts", "import { x } from './x';\nclass Dog { bark() {} }\n")],
        );
        let bark = cb.get_symbol("Dog.bark").unwrap();
        let x = cb.get_symbol("a.ts::x").unwrap();
        for id in [bark, x] {
            assert!(matches!(
                cb.move_to_file(id, "b.ts", false, MoveStrategy::AddBackEdge),
                Err(RefactorError::UnsupportedMove { .. })
            ));
        }
    }

    // Test 6: moving into a file that imported the symbol drops that import
    #[test]
    fn test_move_into_importer() {
        let mut cb = Codebase::from_sources(
            "/p",
            [
                ("a.ts", "export function foo() {}\n"),
                ("b.ts", "import { foo } from './a';\n\nfoo();\n"),
            ],
        );
        let foo = cb.get_symbol("a.ts::foo").unwrap();
        cb.move_to_file(foo, "b.ts", false, MoveStrategy::UpdateAllImports)
            .unwrap();
        assert_eq!(text(&cb, "b.ts"), "foo();\n\nexport function foo() {}\n");
        assert_eq!(text(&cb, "a.ts"), "");
    }

    // Test 7: a separate `export default name;` follows the symbol
    #[test]
    fn test_move_keeps_default_export_statement() {
        let mut cb = Codebase::from_sources(
            "/p",
            [
                ("a.ts", "function foo() {}\nexport default foo;\n"),
                ("b.ts", "import foo from './a';\nfoo();\n"),
            ],
        );
        let foo = cb.get_symbol("a.ts::foo").unwrap();
        cb.move_to_file(foo, "c.ts", false, MoveStrategy::UpdateAllImports)
            .unwrap();
        assert_eq!(text(&cb, "c.ts"), "export function foo() {}\nexport default foo;\n");
        assert_eq!(text(&cb, "b.ts"), "import foo from './c';\nfoo();\n");
        assert_eq!(text(&cb, "a.ts"), "export { default } from './c';\n");

        cb.commit().unwrap();
        assert!(
            !cb.warnings()
                .iter()
                .any(|w| matches!(w, Warning::UnresolvedImport { .. })),
            "{:?}",
            cb.warnings()
        );
    }

    // Test 8: a split `import type` statement stays type-only
    #[test]
    fn test_move_split_keeps_import_type() {
        let mut cb = Codebase::from_sources(
            "/p",
            [
                ("a.ts", "export interface Foo {}\nexport interface Keep {}\n"),
                ("b.ts", "import type { Foo, Keep } from './a';\nlet f: Foo;\nlet k: Keep;\n"),
            ],
        );
        let foo = cb.get_symbol("a.ts::Foo").unwrap();
        cb.move_to_file(foo, "c.ts", false, MoveStrategy::UpdateAllImports)
            .unwrap();
        assert_eq!(
            text(&cb, "b.ts"),
            "import type { Keep } from './a';\nimport type { Foo } from './c';\nlet f: Foo;\nlet k: Keep;\n"
        );
    }

    // Test 9: moving a block supersedes pending edits inside it
    #[test]
    fn test_move_carries_pending_edits() {
        let mut cb = Codebase::from_sources(
            "/p",
            [("a.ts", "export function foo() {\n  return 1;\n}\n")],
        );
        let foo = cb.get_symbol("foo").unwrap();
        let body = cb.body_editable(foo).unwrap().unwrap();
        cb.edit(&body, "{\n  return 2;\n}").unwrap();
        cb.move_to_file(foo, "b.ts", false, MoveStrategy::UpdateAllImports)
            .unwrap();
        assert_eq!(text(&cb, "b.ts"), "export function foo() {\n  return 2;\n}\n");
        assert_eq!(text(&cb, "a.ts"), "");
    }
}
