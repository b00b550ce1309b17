//! Turning a pending transaction into new file contents: verification,
//! unified diffs, atomic disk writes and the incremental rebuild.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use similar::{ChangeTag, TextDiff};

use crate::codebase::{Codebase, display_path};
use crate::edit::StructuralChange;
use crate::edit::transaction::apply_edits;
use crate::error::{RefactorError, Result};
use crate::graph::node::FileId;
use crate::span::Span;

/// The textual change to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDiff {
    pub path: PathBuf,
    pub created: bool,
    pub insertions: usize,
    pub deletions: usize,
    /// `a/<path>` / `b/<path>` unified diff with three lines of context.
    pub unified: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub files_changed: usize,
    pub symbols_added: usize,
    pub symbols_removed: usize,
    pub symbols_renamed: usize,
}

/// What `commit()` wrote, or what `preview()` would write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diff {
    pub files: Vec<FileDiff>,
    pub changes: Vec<StructuralChange>,
    pub summary: DiffSummary,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// All file diffs concatenated, as `git diff` would print them.
    pub fn unified(&self) -> String {
        self.files.iter().map(|f| f.unified.as_str()).collect()
    }

    fn build(staged: &[Staged], changes: &[StructuralChange]) -> Self {
        let files: Vec<FileDiff> = staged.iter().map(Staged::diff).collect();

        let mut renames: Vec<(&str, &str)> = changes
            .iter()
            .filter_map(|c| match c {
                StructuralChange::Rename { from, to, .. } => Some((from.as_str(), to.as_str())),
                _ => None,
            })
            .collect();
        renames.sort();
        renames.dedup();

        let summary = DiffSummary {
            files_changed: files.len(),
            symbols_added: changes
                .iter()
                .filter(|c| matches!(c, StructuralChange::Move { .. }))
                .count(),
            symbols_removed: changes
                .iter()
                .filter(|c| matches!(c, StructuralChange::Remove { .. }))
                .count(),
            symbols_renamed: renames.len(),
        };
        Diff {
            files,
            changes: changes.to_vec(),
            summary,
        }
    }
}

/// One file's verified before/after text.
struct Staged {
    file: FileId,
    path: PathBuf,
    old: String,
    new: String,
    created: bool,
}

impl Staged {
    fn diff(&self) -> FileDiff {
        let name = display_path(&self.path);
        let diff = TextDiff::from_lines(&self.old, &self.new);
        let mut insertions = 0;
        let mut deletions = 0;
        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => insertions += 1,
                ChangeTag::Delete => deletions += 1,
                ChangeTag::Equal => {}
            }
        }
        let unified = diff
            .unified_diff()
            .context_radius(3)
            .header(&format!("a/{name}"), &format!("b/{name}"))
            .to_string();
        FileDiff {
            path: self.path.clone(),
            created: self.created,
            insertions,
            deletions,
            unified,
        }
    }
}

impl Codebase {
    /// Verify, write and re-analyse every pending change.
    ///
    /// If any edit no longer matches the text it was computed against, or a
    /// disk file drifted since it was analysed, nothing is written and the
    /// transaction stays pending. Disk writes go through sibling temp files
    /// and are persisted together; a failure part-way restores what was
    /// already replaced.
    pub fn commit(&mut self) -> Result<Diff> {
        let Some(tx) = self.pending.as_ref() else {
            return Ok(Diff::default());
        };
        let staged = self.stage()?;
        let diff = Diff::build(&staged, tx.log());

        if self.is_disk_backed() {
            self.write_all(&staged)?;
        }

        self.pending = None;
        let touched: Vec<FileId> = staged.iter().map(|s| s.file).collect();
        for s in staged {
            self.set_text(s.file, s.new);
        }
        self.rebuild(&touched);
        log::info!(
            "committed {} file(s): +{} -{} line(s)",
            diff.summary.files_changed,
            diff.files.iter().map(|f| f.insertions).sum::<usize>(),
            diff.files.iter().map(|f| f.deletions).sum::<usize>()
        );
        Ok(diff)
    }

    /// The diff `commit()` would produce, without writing or rebuilding.
    pub fn preview(&self) -> Result<Diff> {
        let Some(tx) = self.pending.as_ref() else {
            return Ok(Diff::default());
        };
        let staged = self.stage()?;
        Ok(Diff::build(&staged, tx.log()))
    }

    fn stage(&self) -> Result<Vec<Staged>> {
        let Some(tx) = self.pending.as_ref() else {
            return Ok(Vec::new());
        };
        let mut staged = Vec::new();
        for file in tx.touched_files() {
            let f = &self.files[file.0];
            let edits = tx.edits_for(file);
            for edit in edits {
                if f.text.get(edit.span.start..edit.span.end) != Some(edit.expected.as_str()) {
                    return Err(RefactorError::StaleSpan {
                        path: f.path.clone(),
                        span: edit.span,
                        reason: "text under the edit changed since it was queued".into(),
                    });
                }
            }
            let created = tx.created().contains(&file);
            if self.is_disk_backed() {
                self.check_disk(&f.path, &f.text, created)?;
            }
            let new = apply_edits(&f.text, edits);
            if new == f.text && !created {
                continue;
            }
            staged.push(Staged {
                file,
                path: f.path.clone(),
                old: f.text.clone(),
                new,
                created,
            });
        }
        Ok(staged)
    }

    /// The disk copy must still be the text the graph was built from.
    fn check_disk(&self, path: &Path, analysed: &str, created: bool) -> Result<()> {
        let full = self.root().join(path);
        let whole = Span::new(0, analysed.len());
        let stale = |reason: &str| RefactorError::StaleSpan {
            path: path.to_path_buf(),
            span: whole,
            reason: reason.to_owned(),
        };
        if created {
            if full.exists() {
                return Err(stale("file was created on disk after the move was queued"));
            }
            return Ok(());
        }
        match std::fs::read_to_string(&full) {
            Ok(text) if text == analysed => Ok(()),
            Ok(_) => Err(stale("file changed on disk since it was analysed")),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(stale("file was deleted on disk since it was analysed"))
            }
            Err(err) => Err(RefactorError::io(full, err)),
        }
    }

    fn write_all(&self, staged: &[Staged]) -> Result<()> {
        let mut temps = Vec::with_capacity(staged.len());
        for s in staged {
            let target = self.root().join(&s.path);
            let dir = target
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.root().to_path_buf());
            std::fs::create_dir_all(&dir).map_err(|e| RefactorError::io(&dir, e))?;
            let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| RefactorError::io(&dir, e))?;
            tmp.write_all(s.new.as_bytes())
                .and_then(|_| tmp.as_file().flush())
                .map_err(|e| RefactorError::io(&target, e))?;
            temps.push((tmp, target, s));
        }

        let mut persisted: Vec<(PathBuf, Option<&str>)> = Vec::with_capacity(temps.len());
        for (tmp, target, s) in temps {
            if let Err(err) = tmp.persist(&target) {
                restore(&persisted);
                return Err(RefactorError::io(target, err.error));
            }
            log::debug!("wrote {}", target.display());
            persisted.push((target, (!s.created).then_some(s.old.as_str())));
        }
        Ok(())
    }
}

/// Put back files replaced before a failed persist; remove created ones.
fn restore(persisted: &[(PathBuf, Option<&str>)]) {
    for (path, old) in persisted.iter().rev() {
        let result = match old {
            Some(text) => std::fs::write(path, text),
            None => std::fs::remove_file(path),
        };
        if let Err(err) = result {
            log::warn!("could not restore {}: {}", path.display(), err);
        }
    }
}
