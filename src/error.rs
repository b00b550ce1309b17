//! Error and warning types for graph construction and code mutation.
//!
//! Resolution-time problems (parse failures, unresolved imports, re-export
//! cycles) degrade gracefully into [`Warning`]s stored on the codebase.
//! Mutation-time problems are returned as [`RefactorError`] from the call that
//! introduced them; only [`RefactorError::StaleSpan`] is raised by `commit()`.

use std::path::PathBuf;

use thiserror::Error;

use crate::span::Span;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, RefactorError>;

/// The syntax adapter could not produce a usable tree for a file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to parse {}: {reason}", .path.display())]
pub struct ParseError {
    pub path: PathBuf,
    pub reason: String,
}

/// Every fallible engine operation returns one of these.
#[derive(Error, Debug)]
pub enum RefactorError {
    /// Syntax adapter failure surfaced through an API that needs a parsed file.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// An import target could not be matched to any file or symbol.
    #[error("unresolved import '{specifier}' in {}", .path.display())]
    UnresolvedImport { path: PathBuf, specifier: String },

    /// Two queued edits target partially overlapping ranges of the same file.
    #[error("edit {new} overlaps pending edit {existing} in {}", .path.display())]
    OverlappingEdit {
        path: PathBuf,
        existing: Span,
        new: Span,
    },

    /// A rename or move would leave two symbols with the same name in one scope.
    #[error("'{name}' already exists in {}", .path.display())]
    NameConflict { path: PathBuf, name: String },

    /// A queued edit no longer matches the text it was computed against.
    #[error("stale span {span} in {}: {reason}", .path.display())]
    StaleSpan {
        path: PathBuf,
        span: Span,
        reason: String,
    },

    /// `dependencies()` was asked for zero hops.
    #[error("max_depth must be at least 1, got {0}")]
    InvalidDepth(usize),

    /// The requested identifier is not a valid JavaScript/TypeScript name.
    #[error("'{0}' is not a valid identifier")]
    InvalidName(String),

    /// A symbol search pattern is not a valid regular expression.
    #[error("invalid symbol pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The symbol kind or position cannot be moved (parameters, members, imports...).
    #[error("cannot move {name}: {reason}")]
    UnsupportedMove { name: String, reason: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RefactorError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A non-fatal problem found while building or re-linking the graph.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// The file could not be parsed and contributes no symbols.
    Parse { path: PathBuf, reason: String },
    /// An import (or one of its names) resolved to an `ExternalModule` placeholder.
    UnresolvedImport {
        path: PathBuf,
        specifier: String,
        name: Option<String>,
    },
    /// A re-export chain looped back on itself and was cut at `cycle_at`.
    ReExportCycle { path: PathBuf, cycle_at: PathBuf },
}

impl Warning {
    /// The file the warning was raised for.
    pub fn path(&self) -> &PathBuf {
        match self {
            Warning::Parse { path, .. }
            | Warning::UnresolvedImport { path, .. }
            | Warning::ReExportCycle { path, .. } => path,
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::Parse { path, reason } => {
                write!(f, "{}: parse error: {}", path.display(), reason)
            }
            Warning::UnresolvedImport {
                path,
                specifier,
                name: Some(name),
            } => write!(
                f,
                "{}: '{}' is not exported by '{}'",
                path.display(),
                name,
                specifier
            ),
            Warning::UnresolvedImport {
                path,
                specifier,
                name: None,
            } => write!(f, "{}: cannot resolve '{}'", path.display(), specifier),
            Warning::ReExportCycle { path, cycle_at } => write!(
                f,
                "{}: re-export cycle through {}",
                path.display(),
                cycle_at.display()
            ),
        }
    }
}
