use serde::Serialize;

use crate::graph::node::FileId;
use crate::span::Span;

/// How a span behaves when it is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditRole {
    /// A whole statement or member: removal takes its lines.
    Statement,
    /// One element of a comma-separated list: removal takes one comma.
    ListItem,
    /// An identifier or literal token: removed verbatim.
    Token,
    /// Arbitrary text range: removed verbatim.
    Span,
}

/// A handle on a range of committed text that can be edited through the
/// codebase.
///
/// The generation pins the handle to the file text it was computed from;
/// once a commit rewrites the file, the handle is stale and every edit
/// through it is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Editable {
    pub file: FileId,
    pub span: Span,
    pub generation: u64,
    pub role: EditRole,
}

impl Editable {
    pub fn new(file: FileId, span: Span, generation: u64, role: EditRole) -> Self {
        Self {
            file,
            span,
            generation,
            role,
        }
    }

    /// Zero-width handle at the start of this one.
    pub fn start(&self) -> Self {
        Self {
            span: Span::point(self.span.start),
            role: EditRole::Span,
            ..*self
        }
    }

    /// Zero-width handle at the end of this one.
    pub fn end(&self) -> Self {
        Self {
            span: Span::point(self.span.end),
            role: EditRole::Span,
            ..*self
        }
    }
}
