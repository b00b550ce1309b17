pub mod editable;
pub mod transaction;

pub use editable::{EditRole, Editable};
pub use transaction::{Overlap, PendingTransaction, StructuralChange, TextEdit};

use crate::codebase::Codebase;
use crate::error::{RefactorError, Result};
use crate::graph::node::{FileId, HasBlock, HasValue, Symbol, SymbolId, SymbolKind, SymbolPayload};
use crate::parser::imports::ImportBindingKind;
use crate::span::{Span, widen_list_item, widen_statement};

use transaction::{apply_edits, virtual_slice};

impl Codebase {
    fn source_symbol(&self, id: SymbolId) -> Result<(&Symbol, FileId)> {
        let symbol = self
            .graph
            .symbol(id)
            .ok_or_else(|| RefactorError::SymbolNotFound(id.to_string()))?;
        let file = symbol
            .file
            .ok_or_else(|| RefactorError::SymbolNotFound(format!("{} has no source", symbol.name)))?;
        Ok((symbol, file))
    }

    fn handle(&self, file: FileId, span: Span, role: EditRole) -> Editable {
        Editable::new(file, span, self.files[file.0].generation, role)
    }

    /// The whole declaration of `id`: what `remove()` deletes and what a
    /// move carries. Statements include their doc comment; an import or
    /// export binding is its list item, or the whole statement when it is
    /// the only one.
    pub fn editable(&self, id: SymbolId) -> Result<Editable> {
        let (symbol, file) = self.source_symbol(id)?;
        let f = &self.files[file.0];
        let editable = match &symbol.payload {
            SymbolPayload::Module => self.handle(file, symbol.span, EditRole::Span),
            SymbolPayload::Import { statement_index, .. } => {
                let decl = &f.syntax.imports[*statement_index];
                let index = f.imports[*statement_index]
                    .iter()
                    .position(|&b| b == id)
                    .unwrap_or(0);
                let named = decl
                    .bindings
                    .iter()
                    .filter(|b| matches!(b.kind, ImportBindingKind::Named { .. }))
                    .count();
                let is_named = matches!(decl.bindings[index].kind, ImportBindingKind::Named { .. });
                if decl.bindings.len() == 1 {
                    self.handle(file, decl.statement, EditRole::Statement)
                } else if is_named && named == 1 && index > 0 {
                    // `import React, { only } from`: drop `, { only }`.
                    let clause = decl.named_clause.unwrap_or(symbol.removal);
                    let start = decl.bindings[index - 1].item_span.end;
                    self.handle(file, Span::new(start, clause.end), EditRole::Span)
                } else {
                    self.handle(file, symbol.removal, EditRole::ListItem)
                }
            }
            SymbolPayload::Export { statement_index, .. } => {
                let decl = &f.syntax.exports[*statement_index];
                if decl.items.len() == 1 {
                    self.handle(file, decl.statement, EditRole::Statement)
                } else {
                    self.handle(file, symbol.removal, EditRole::ListItem)
                }
            }
            _ if symbol.role == EditRole::Statement => {
                let start = symbol.doc.map_or(symbol.removal.start, |d| d.start.min(symbol.removal.start));
                self.handle(file, Span::new(start, symbol.removal.end), EditRole::Statement)
            }
            _ => self.handle(file, symbol.removal, symbol.role),
        };
        Ok(editable)
    }

    /// The identifier token that names `id`.
    pub fn name_editable(&self, id: SymbolId) -> Result<Editable> {
        let (symbol, file) = self.source_symbol(id)?;
        if symbol.kind() == SymbolKind::Module {
            return Err(RefactorError::SymbolNotFound(format!(
                "{} has no name token",
                symbol.name
            )));
        }
        Ok(self.handle(file, symbol.name_span, EditRole::Token))
    }

    pub fn doc_editable(&self, id: SymbolId) -> Result<Option<Editable>> {
        let (symbol, file) = self.source_symbol(id)?;
        Ok(symbol.doc.map(|d| self.handle(file, d, EditRole::Span)))
    }

    pub fn body_editable(&self, id: SymbolId) -> Result<Option<Editable>> {
        let (symbol, file) = self.source_symbol(id)?;
        Ok(symbol.block().map(|b| self.handle(file, b, EditRole::Span)))
    }

    pub fn value_editable(&self, id: SymbolId) -> Result<Option<Editable>> {
        let (symbol, file) = self.source_symbol(id)?;
        Ok(symbol.value().map(|v| self.handle(file, v, EditRole::Span)))
    }

    /// An arbitrary range of committed text.
    pub fn span_editable(&self, file: FileId, span: Span) -> Result<Editable> {
        let editable = self.handle(file, span, EditRole::Span);
        self.check(&editable)?;
        Ok(editable)
    }

    /// Reject handles from an older generation or pointing outside the text.
    fn check(&self, target: &Editable) -> Result<()> {
        let Some(f) = self.files.get(target.file.0) else {
            return Err(RefactorError::StaleSpan {
                path: Default::default(),
                span: target.span,
                reason: format!("unknown file {}", target.file.0),
            });
        };
        if target.generation != f.generation {
            return Err(RefactorError::StaleSpan {
                path: f.path.clone(),
                span: target.span,
                reason: format!(
                    "handle is from generation {}, file is at {}",
                    target.generation, f.generation
                ),
            });
        }
        if target.span.slice(&f.text).is_none() {
            return Err(RefactorError::StaleSpan {
                path: f.path.clone(),
                span: target.span,
                reason: "span is outside the file text".into(),
            });
        }
        Ok(())
    }

    pub(crate) fn queue_edit(&mut self, file: FileId, span: Span, text: String) -> Result<()> {
        self.queue_edit_with(file, span, text, Overlap::Reject)
    }

    pub(crate) fn queue_edit_with(
        &mut self,
        file: FileId,
        span: Span,
        text: String,
        overlap: Overlap,
    ) -> Result<()> {
        let f = &self.files[file.0];
        let expected = span
            .slice(&f.text)
            .ok_or_else(|| RefactorError::StaleSpan {
                path: f.path.clone(),
                span,
                reason: "span is outside the file text".into(),
            })?
            .to_owned();
        let path = f.path.clone();
        self.transaction().queue(file, &path, span, text, expected, overlap)
    }

    /// Replace the span's text wholesale.
    pub fn edit(&mut self, target: &Editable, text: impl Into<String>) -> Result<()> {
        self.check(target)?;
        self.queue_edit(target.file, target.span, text.into())
    }

    pub fn insert_before(&mut self, target: &Editable, text: impl Into<String>) -> Result<()> {
        self.check(target)?;
        self.queue_edit(target.file, Span::point(target.span.start), text.into())
    }

    pub fn insert_after(&mut self, target: &Editable, text: impl Into<String>) -> Result<()> {
        self.check(target)?;
        self.queue_edit(target.file, Span::point(target.span.end), text.into())
    }

    /// Delete the span together with the separators that would otherwise be
    /// left dangling: whole lines for statements, one comma for list items.
    pub fn remove(&mut self, target: &Editable) -> Result<()> {
        self.check(target)?;
        let text = &self.files[target.file.0].text;
        let span = match target.role {
            EditRole::Statement => widen_statement(text, target.span),
            EditRole::ListItem => widen_list_item(text, target.span),
            EditRole::Token | EditRole::Span => target.span,
        };
        self.queue_edit(target.file, span, String::new())
    }

    /// The text the span will hold once pending edits are applied.
    pub fn source(&self, target: &Editable) -> Result<String> {
        self.check(target)?;
        Ok(self.virtual_text(target.file, target.span))
    }

    pub(crate) fn virtual_text(&self, file: FileId, span: Span) -> String {
        let edits = self
            .pending
            .as_ref()
            .map(|tx| tx.edits_for(file))
            .unwrap_or(&[]);
        virtual_slice(&self.files[file.0].text, span, edits)
    }

    /// The whole text of `file` with pending edits applied.
    pub fn pending_text(&self, file: FileId) -> String {
        let f = &self.files[file.0];
        match &self.pending {
            Some(tx) => apply_edits(&f.text, tx.edits_for(file)),
            None => f.text.clone(),
        }
    }

    /// Drop the pending transaction. Nothing on disk or in memory changes.
    pub fn discard(&mut self) {
        if let Some(tx) = self.pending.take() {
            log::debug!(
                "discarding {} pending change(s) across {} file(s)",
                tx.log().len(),
                tx.touched_files().len()
            );
            self.drop_created(tx.created());
        }
    }
}
