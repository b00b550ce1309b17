//! Structural changes: rename, move and remove.
//!
//! Every operation first builds a [`RefactorPlan`] against the committed
//! text. Validation (name conflicts, unsupported targets) happens while the
//! plan is being built; only a plan that reached [`PlanState::Queued`]
//! touches the pending transaction, and a queue failure rolls the whole plan
//! back.

pub mod move_symbol;
pub mod remove;
pub mod rename;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::codebase::Codebase;
use crate::edit::{Overlap, StructuralChange};
use crate::error::Result;
use crate::graph::node::{FileId, SymbolId};
use crate::parser::imports::{ExportItemKind, ImportBindingKind};
use crate::span::{Span, widen_statement};

/// How importers are kept consistent when a symbol changes files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MoveStrategy {
    /// Rewrite every import of the moved symbols to point at the destination.
    #[default]
    UpdateAllImports,
    /// Leave importers alone; the source file forwards to the destination.
    AddBackEdge,
}

/// Progress of a structural change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanState {
    Requested,
    DependencyClosureComputed,
    StrategyApplied,
    Queued,
}

/// Where a planned edit lands: an analysed file or one the plan creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanFile {
    Existing(FileId),
    New(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEdit {
    pub file: PlanFile,
    pub span: Span,
    pub text: String,
    pub overlap: Overlap,
}

/// A structural change under construction.
#[derive(Debug, Clone)]
pub struct RefactorPlan {
    state: PlanState,
    /// The symbols the change is about, in source order.
    pub symbols: Vec<SymbolId>,
    pub edits: Vec<PlannedEdit>,
    pub changes: Vec<StructuralChange>,
}

impl RefactorPlan {
    pub fn new(symbols: Vec<SymbolId>) -> Self {
        Self {
            state: PlanState::Requested,
            symbols,
            edits: Vec::new(),
            changes: Vec::new(),
        }
    }

    pub fn state(&self) -> PlanState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: PlanState) {
        debug_assert!(next > self.state, "plan states only move forward");
        log::debug!("plan {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    pub(crate) fn edit(&mut self, file: FileId, span: Span, text: impl Into<String>) {
        self.edits.push(PlannedEdit {
            file: PlanFile::Existing(file),
            span,
            text: text.into(),
            overlap: Overlap::Reject,
        });
    }

    /// Remove a block whose text the plan already copied with pending edits
    /// applied; those edits go with it.
    pub(crate) fn take_block(&mut self, file: FileId, span: Span) {
        self.edits.push(PlannedEdit {
            file: PlanFile::Existing(file),
            span,
            text: String::new(),
            overlap: Overlap::Supersede,
        });
    }

    pub(crate) fn insert_new(&mut self, path: PathBuf, text: impl Into<String>) {
        self.edits.push(PlannedEdit {
            file: PlanFile::New(path),
            span: Span::point(0),
            text: text.into(),
            overlap: Overlap::Reject,
        });
    }

    /// Files the plan edits, in first-touch order.
    pub fn files(&self) -> Vec<PlanFile> {
        let mut out: Vec<PlanFile> = Vec::new();
        for edit in &self.edits {
            if !out.contains(&edit.file) {
                out.push(edit.file.clone());
            }
        }
        out
    }
}

impl Codebase {
    /// Queue every edit of a finished plan. Either all of them land in the
    /// pending transaction or none do.
    pub fn apply_plan(&mut self, mut plan: RefactorPlan) -> Result<()> {
        if plan.state < PlanState::StrategyApplied {
            plan.advance(PlanState::StrategyApplied);
        }
        let snapshot = self.pending.clone();
        let first_new = self.files.len();

        let outcome = (|| -> Result<()> {
            for edit in &plan.edits {
                let file = match &edit.file {
                    PlanFile::Existing(id) => *id,
                    PlanFile::New(path) => self.create_file(path),
                };
                self.queue_edit_with(file, edit.span, edit.text.clone(), edit.overlap)?;
            }
            Ok(())
        })();

        if let Err(err) = outcome {
            let created: Vec<FileId> = (first_new..self.files.len()).map(FileId).collect();
            self.pending = snapshot;
            self.drop_created(&created);
            log::debug!("plan rolled back: {err}");
            return Err(err);
        }

        plan.advance(PlanState::Queued);
        let tx = self.transaction();
        for change in plan.changes {
            tx.record(change);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Statement rendering shared by move and remove
    // -----------------------------------------------------------------------

    /// Quote character and semicolon habit of a file, read from its first
    /// module statement.
    pub(crate) fn style_of(&self, file: FileId) -> Style {
        let f = &self.files[file.0];
        let quoted = f
            .syntax
            .imports
            .iter()
            .map(|i| (i.source_span, i.statement))
            .chain(
                f.syntax
                    .exports
                    .iter()
                    .filter_map(|e| e.source.as_ref().map(|s| (s.1, e.statement))),
            )
            .next();
        match quoted {
            Some((source, statement)) => Style {
                quote: f.text[source.start..].chars().next().unwrap_or('\''),
                semi: f.text[..statement.end].trim_end().ends_with(';'),
            },
            None => Style::default(),
        }
    }

    /// Replace import statement `index` of `file` with one that keeps only
    /// the bindings in `keep`; the whole statement goes when none remain.
    pub(crate) fn rewrite_import(
        &self,
        plan: &mut RefactorPlan,
        file: FileId,
        index: usize,
        keep: &[usize],
    ) {
        let f = &self.files[file.0];
        let decl = &f.syntax.imports[index];
        if keep.is_empty() {
            plan.edit(file, widen_statement(&f.text, decl.statement), "");
            return;
        }
        let mut clause = ImportClause::default();
        for &i in keep {
            let b = &decl.bindings[i];
            match &b.kind {
                ImportBindingKind::Default => clause.default = Some(b.local.clone()),
                ImportBindingKind::Namespace => clause.namespace = Some(b.local.clone()),
                ImportBindingKind::Named { .. } => {
                    clause.named.push(b.item_span.slice(&f.text).unwrap_or(&b.local).to_owned())
                }
            }
        }
        let statement = &f.text[decl.statement.start..decl.statement.end];
        let keyword = if statement.starts_with("import type") { "import type" } else { "import" };
        let source = &f.text[decl.source_span.start..decl.source_span.end];
        let semi = if statement.trim_end().ends_with(';') { ";" } else { "" };
        plan.edit(
            file,
            decl.statement,
            format!("{keyword} {} from {source}{semi}", clause.render()),
        );
    }

    /// Replace export statement `index` of `file` with one that keeps only
    /// the items in `keep`; the whole statement goes when none remain.
    pub(crate) fn rewrite_export(
        &self,
        plan: &mut RefactorPlan,
        file: FileId,
        index: usize,
        keep: &[usize],
    ) {
        let f = &self.files[file.0];
        let decl = &f.syntax.exports[index];
        if keep.is_empty() {
            plan.edit(file, widen_statement(&f.text, decl.statement), "");
            return;
        }
        let items: Vec<&str> = keep
            .iter()
            .filter_map(|&i| {
                let item = &decl.items[i];
                match item.kind {
                    ExportItemKind::Named { .. } => item.item_span.slice(&f.text),
                    _ => None,
                }
            })
            .collect();
        let statement = &f.text[decl.statement.start..decl.statement.end];
        let semi = if statement.trim_end().ends_with(';') { ";" } else { "" };
        let from = decl
            .source
            .as_ref()
            .map(|(_, span)| format!(" from {}", &f.text[span.start..span.end]))
            .unwrap_or_default();
        plan.edit(
            file,
            decl.statement,
            format!("export {{ {} }}{from}{semi}", items.join(", ")),
        );
    }

    /// Where new module statements go: the start of the first import, or the
    /// top of the file.
    pub(crate) fn statement_insertion_point(&self, file: FileId) -> (usize, bool) {
        let f = &self.files[file.0];
        match f.syntax.imports.iter().map(|i| i.statement.start).min() {
            Some(start) => (start, true),
            None => (0, false),
        }
    }
}

/// Formatting habits carried into generated statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    pub quote: char,
    pub semi: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self { quote: '\'', semi: true }
    }
}

impl Style {
    pub fn import(&self, clause: &ImportClause, specifier: &str) -> String {
        format!(
            "{} {} from {q}{specifier}{q}{s}",
            if clause.type_only { "import type" } else { "import" },
            clause.render(),
            q = self.quote,
            s = if self.semi { ";" } else { "" }
        )
    }

    pub fn reexport(&self, items: &[String], specifier: &str) -> String {
        format!(
            "export {{ {} }} from {q}{specifier}{q}{s}",
            items.join(", "),
            q = self.quote,
            s = if self.semi { ";" } else { "" }
        )
    }
}

/// The binding list of an import statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportClause {
    pub default: Option<String>,
    pub namespace: Option<String>,
    /// Named items as written: `a`, `a as b`.
    pub named: Vec<String>,
    /// `import type { ... }`
    pub type_only: bool,
}

impl ImportClause {
    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.namespace.is_none() && self.named.is_empty()
    }

    pub fn add_named(&mut self, item: String) {
        if !self.named.contains(&item) {
            self.named.push(item);
        }
    }

    pub fn render(&self) -> String {
        let mut parts = Vec::new();
        if let Some(d) = &self.default {
            parts.push(d.clone());
        }
        if let Some(ns) = &self.namespace {
            parts.push(format!("* as {ns}"));
        }
        if !self.named.is_empty() {
            parts.push(format!("{{ {} }}", self.named.join(", ")));
        }
        parts.join(", ")
    }
}

/// Import clauses for several modules, in first-use order.
#[derive(Debug, Default)]
pub(crate) struct ImportSet {
    clauses: BTreeMap<usize, (String, ImportClause)>,
    order: Vec<String>,
}

impl ImportSet {
    pub(crate) fn clause(&mut self, specifier: &str) -> &mut ImportClause {
        let pos = match self.order.iter().position(|s| s == specifier) {
            Some(pos) => pos,
            None => {
                self.order.push(specifier.to_owned());
                self.order.len() - 1
            }
        };
        &mut self
            .clauses
            .entry(pos)
            .or_insert_with(|| (specifier.to_owned(), ImportClause::default()))
            .1
    }

    /// One statement per module. A namespace import cannot share a
    /// statement with named items, so it gets its own.
    pub(crate) fn render(&self, style: Style) -> Vec<String> {
        let mut out = Vec::new();
        for (specifier, clause) in self.clauses.values() {
            if clause.is_empty() {
                continue;
            }
            if clause.namespace.is_some() && !clause.named.is_empty() {
                let ns = ImportClause {
                    namespace: clause.namespace.clone(),
                    type_only: clause.type_only,
                    ..Default::default()
                };
                let rest = ImportClause {
                    namespace: None,
                    ..clause.clone()
                };
                out.push(style.import(&ns, specifier));
                out.push(style.import(&rest, specifier));
            } else {
                out.push(style.import(clause, specifier));
            }
        }
        out
    }
}
