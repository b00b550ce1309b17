use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{RefactorError, Result};
use crate::graph::node::FileId;
use crate::span::Span;

/// One queued replacement of `span` (in committed text) by `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub span: Span,
    pub text: String,
    /// The committed text under `span` when the edit was queued.
    pub expected: String,
    /// Queue order, used to keep same-offset inserts stable.
    pub seq: u64,
}

impl TextEdit {
    pub fn is_insert(&self) -> bool {
        self.span.is_empty()
    }
}

/// A structural change recorded alongside the text edits, for summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum StructuralChange {
    Rename { from: String, to: String, file: PathBuf },
    Move { name: String, from: PathBuf, to: PathBuf },
    Remove { name: String, file: PathBuf },
    CreateFile { path: PathBuf },
}

/// What happens to pending edits that a new replacement fully contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overlap {
    /// Any overlap is an `OverlappingEdit` error.
    #[default]
    Reject,
    /// Contained edits are dropped. Only for replacements whose text was
    /// read through the pending edits, such as a moved block.
    Supersede,
}

/// The uncommitted batch of edits and structural changes.
///
/// Edits are kept per file, sorted by `(start, seq)` and pairwise
/// non-overlapping. Created lazily by the first mutating call and dropped by
/// `commit()` or `discard()`.
#[derive(Debug, Clone, Default)]
pub struct PendingTransaction {
    edits: BTreeMap<FileId, Vec<TextEdit>>,
    created: Vec<FileId>,
    log: Vec<StructuralChange>,
    next_seq: u64,
}

impl PendingTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.values().all(Vec::is_empty) && self.created.is_empty()
    }

    /// Queue a replacement, enforcing the overlap policy:
    /// - any overlap with a pending edit is an error, including the same span
    /// - under `Overlap::Supersede`, pending edits the new one fully contains
    ///   are dropped instead
    /// - an edit strictly inside a pending replacement is always an error
    /// - zero-width inserts at the same offset keep queue order
    pub fn queue(
        &mut self,
        file: FileId,
        path: &Path,
        span: Span,
        text: String,
        expected: String,
        overlap: Overlap,
    ) -> Result<()> {
        let list = self.edits.entry(file).or_default();

        let mut superseded = Vec::new();
        for (i, existing) in list.iter().enumerate() {
            match classify(existing.span, span) {
                Relation::Disjoint => {}
                Relation::Supersedes if overlap == Overlap::Supersede => superseded.push(i),
                Relation::Supersedes | Relation::Conflict => {
                    return Err(RefactorError::OverlappingEdit {
                        path: path.to_path_buf(),
                        existing: existing.span,
                        new: span,
                    });
                }
            }
        }
        for i in superseded.into_iter().rev() {
            let gone = list.remove(i);
            log::debug!("edit {} superseded by {} in {}", gone.span, span, path.display());
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let edit = TextEdit {
            span,
            text,
            expected,
            seq,
        };
        let at = list.partition_point(|e| (e.span.start, e.seq) <= (edit.span.start, edit.seq));
        list.insert(at, edit);
        Ok(())
    }

    pub fn record(&mut self, change: StructuralChange) {
        self.log.push(change);
    }

    pub fn mark_created(&mut self, file: FileId) {
        if !self.created.contains(&file) {
            self.created.push(file);
        }
    }

    pub fn created(&self) -> &[FileId] {
        &self.created
    }

    pub fn log(&self) -> &[StructuralChange] {
        &self.log
    }

    pub fn edits_for(&self, file: FileId) -> &[TextEdit] {
        self.edits.get(&file).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Files with at least one pending edit, plus files queued for creation.
    pub fn touched_files(&self) -> Vec<FileId> {
        let mut files: Vec<FileId> = self
            .edits
            .iter()
            .filter(|(_, edits)| !edits.is_empty())
            .map(|(&f, _)| f)
            .chain(self.created.iter().copied())
            .collect();
        files.sort();
        files.dedup();
        files
    }
}

enum Relation {
    Disjoint,
    Supersedes,
    Conflict,
}

/// How a new edit at `new` relates to a pending edit at `old`.
fn classify(old: Span, new: Span) -> Relation {
    match (old.is_empty(), new.is_empty()) {
        // Inserts never conflict with each other.
        (true, true) => Relation::Disjoint,
        // New insert: only fatal strictly inside a pending replacement.
        (false, true) => {
            if old.start < new.start && new.start < old.end {
                Relation::Conflict
            } else {
                Relation::Disjoint
            }
        }
        // Pending insert: swallowed when strictly inside the new replacement.
        (true, false) => {
            if new.start < old.start && old.start < new.end {
                Relation::Supersedes
            } else {
                Relation::Disjoint
            }
        }
        (false, false) => {
            if !old.overlaps(new) {
                Relation::Disjoint
            } else if new.contains(old) {
                Relation::Supersedes
            } else {
                Relation::Conflict
            }
        }
    }
}

/// Apply `edits` (spans relative to `base`) and return the new text.
///
/// Edits are applied from the end of the text backwards so earlier offsets
/// stay valid; at one offset, replacements go before inserts and later
/// inserts before earlier ones, which leaves inserts in queue order.
pub fn apply_edits(base: &str, edits: &[TextEdit]) -> String {
    let mut ordered: Vec<&TextEdit> = edits.iter().collect();
    ordered.sort_by(|a, b| {
        b.span
            .start
            .cmp(&a.span.start)
            .then_with(|| a.is_insert().cmp(&b.is_insert()))
            .then_with(|| b.seq.cmp(&a.seq))
    });
    let mut text = base.to_owned();
    for edit in ordered {
        text.replace_range(edit.span.start..edit.span.end, &edit.text);
    }
    text
}

/// The text `span` will hold once `edits` are applied: edits lying inside
/// the span are applied, inserts on its boundaries are not (unless the span
/// itself is empty).
pub fn virtual_slice(base: &str, span: Span, edits: &[TextEdit]) -> String {
    let inside: Vec<TextEdit> = edits
        .iter()
        .filter(|e| {
            if span.is_empty() {
                e.span == span
            } else if e.is_insert() {
                span.start < e.span.start && e.span.start < span.end
            } else {
                span.contains(e.span)
            }
        })
        .map(|e| TextEdit {
            span: Span::new(e.span.start - span.start, e.span.end - span.start),
            ..e.clone()
        })
        .collect();
    apply_edits(&base[span.start..span.end], &inside)
}
