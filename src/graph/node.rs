use std::fmt;

use petgraph::stable_graph::NodeIndex;
use serde::{Serialize, Serializer};

use crate::edit::EditRole;
use crate::parser::imports::{ExportItemKind, ImportBindingKind};
use crate::span::Span;

/// Handle of a symbol in the arena. Stable across unrelated insertions and
/// removals; invalid once the owning file is re-parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub(crate) NodeIndex);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0.index()
    }
}

impl Serialize for SymbolId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0.index() as u64)
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0.index())
    }
}

/// Index of a file in the codebase. Files are never removed, so ids are
/// stable for the lifetime of a [`crate::codebase::Codebase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileId(pub usize);

/// The kind of symbol extracted from source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// A function declaration or a const bound to an arrow/function expression.
    Function,
    Class,
    /// `const`/`let`/`var` bindings and class fields.
    Variable,
    /// One local name bound by an import statement.
    Import,
    /// One public name of a standalone export statement.
    Export,
    Parameter,
    TypeAlias,
    Interface,
    Enum,
    /// A class method or object literal method.
    Method,
    /// Placeholder for a file's top-level scope.
    Module,
    /// Placeholder for an import target outside the analysed files.
    External,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Variable => "variable",
            SymbolKind::Import => "import",
            SymbolKind::Export => "export",
            SymbolKind::Parameter => "parameter",
            SymbolKind::TypeAlias => "type",
            SymbolKind::Interface => "interface",
            SymbolKind::Enum => "enum",
            SymbolKind::Method => "method",
            SymbolKind::Module => "module",
            SymbolKind::External => "external",
        }
    }

    /// Inverse of [`SymbolKind::as_str`], case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        let kind = match s.trim().to_ascii_lowercase().as_str() {
            "function" => SymbolKind::Function,
            "class" => SymbolKind::Class,
            "variable" | "var" | "const" => SymbolKind::Variable,
            "import" => SymbolKind::Import,
            "export" => SymbolKind::Export,
            "parameter" | "param" => SymbolKind::Parameter,
            "type" | "typealias" => SymbolKind::TypeAlias,
            "interface" => SymbolKind::Interface,
            "enum" => SymbolKind::Enum,
            "method" => SymbolKind::Method,
            _ => return None,
        };
        Some(kind)
    }

    /// Kinds that define something, as opposed to binding or forwarding it.
    pub fn is_definition(self) -> bool {
        !matches!(
            self,
            SymbolKind::Import
                | SymbolKind::Export
                | SymbolKind::Parameter
                | SymbolKind::Module
                | SymbolKind::External
        )
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific data carried by a [`Symbol`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolPayload {
    Function { body: Option<Span>, value: Option<Span> },
    Method { body: Option<Span> },
    Class { body: Option<Span> },
    Variable { value: Option<Span> },
    Parameter,
    TypeAlias { value: Option<Span> },
    Interface { body: Option<Span> },
    Enum { body: Option<Span> },
    Import {
        module_path: String,
        binding: ImportBindingKind,
        /// Index of the import statement within its file.
        statement_index: usize,
        /// Token naming what is imported (`a` in `{ a as b }`).
        imported_span: Span,
    },
    Export {
        module_path: Option<String>,
        item: ExportItemKind,
        statement_index: usize,
        /// Token naming the local or source-side binding.
        local_span: Option<Span>,
    },
    Module,
    External { package: String },
}

/// A named code entity owned by exactly one file (or by the codebase, for
/// external placeholders).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    /// Dotted for nested members: `Dog.bark`, `handler.event`.
    pub qualified_name: String,
    /// `None` only for [`SymbolKind::External`].
    pub file: Option<FileId>,
    pub parent: Option<SymbolId>,
    pub span: Span,
    pub name_span: Span,
    /// The statement holding the declaration, including any `export` keyword.
    pub statement: Span,
    pub removal: Span,
    pub role: EditRole,
    pub doc: Option<Span>,
    pub exported: bool,
    pub default_export: bool,
    pub member: bool,
    pub payload: SymbolPayload,
}

impl Symbol {
    pub fn kind(&self) -> SymbolKind {
        match self.payload {
            SymbolPayload::Function { .. } => SymbolKind::Function,
            SymbolPayload::Method { .. } => SymbolKind::Method,
            SymbolPayload::Class { .. } => SymbolKind::Class,
            SymbolPayload::Variable { .. } => SymbolKind::Variable,
            SymbolPayload::Parameter => SymbolKind::Parameter,
            SymbolPayload::TypeAlias { .. } => SymbolKind::TypeAlias,
            SymbolPayload::Interface { .. } => SymbolKind::Interface,
            SymbolPayload::Enum { .. } => SymbolKind::Enum,
            SymbolPayload::Import { .. } => SymbolKind::Import,
            SymbolPayload::Export { .. } => SymbolKind::Export,
            SymbolPayload::Module => SymbolKind::Module,
            SymbolPayload::External { .. } => SymbolKind::External,
        }
    }

    /// The public name this symbol is reachable under from other files.
    pub fn public_name(&self) -> Option<&str> {
        if !self.exported || self.parent.is_some() {
            return None;
        }
        Some(if self.default_export { "default" } else { &self.name })
    }

    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }
}

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// Anything with a name token that a rename can rewrite.
pub trait HasName {
    fn name(&self) -> &str;
    /// `None` for placeholders that have no source text.
    fn name_span(&self) -> Option<Span>;
}

/// Symbols with a braced body (functions, methods, classes, interfaces, enums).
pub trait HasBlock {
    fn block(&self) -> Option<Span>;
}

/// Symbols bound to an initializer (variables, arrow-function consts, type aliases).
pub trait HasValue {
    fn value(&self) -> Option<Span>;
}

impl HasName for Symbol {
    fn name(&self) -> &str {
        &self.name
    }

    fn name_span(&self) -> Option<Span> {
        match self.payload {
            SymbolPayload::Module | SymbolPayload::External { .. } => None,
            _ => Some(self.name_span),
        }
    }
}

impl HasBlock for Symbol {
    fn block(&self) -> Option<Span> {
        match self.payload {
            SymbolPayload::Function { body, .. }
            | SymbolPayload::Method { body }
            | SymbolPayload::Class { body }
            | SymbolPayload::Interface { body }
            | SymbolPayload::Enum { body } => body,
            _ => None,
        }
    }
}

impl HasValue for Symbol {
    fn value(&self) -> Option<Span> {
        match self.payload {
            SymbolPayload::Function { value, .. }
            | SymbolPayload::Variable { value }
            | SymbolPayload::TypeAlias { value } => value,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(payload: SymbolPayload) -> Symbol {
        Symbol {
            name: "foo".into(),
            qualified_name: "foo".into(),
            file: Some(FileId(0)),
            parent: None,
            span: Span::new(0, 20),
            name_span: Span::new(9, 12),
            statement: Span::new(0, 20),
            removal: Span::new(0, 20),
            role: EditRole::Statement,
            doc: None,
            exported: true,
            default_export: false,
            member: false,
            payload,
        }
    }

    #[test]
    fn test_capabilities_follow_payload() {
        let f = symbol(SymbolPayload::Function {
            body: Some(Span::new(15, 20)),
            value: None,
        });
        assert_eq!(f.kind(), SymbolKind::Function);
        assert_eq!(f.block(), Some(Span::new(15, 20)));
        assert_eq!(f.value(), None);
        assert_eq!(f.name_span(), Some(Span::new(9, 12)));

        let m = symbol(SymbolPayload::Module);
        assert_eq!(m.name_span(), None, "placeholders have no name token");
        assert!(!m.kind().is_definition());
    }

    #[test]
    fn test_public_name() {
        let mut f = symbol(SymbolPayload::Function {
            body: None,
            value: None,
        });
        assert_eq!(f.public_name(), Some("foo"));
        f.default_export = true;
        assert_eq!(f.public_name(), Some("default"));
        f.exported = false;
        assert_eq!(f.public_name(), None);
    }

    #[test]
    fn test_kind_parse_round_trips_names() {
        assert_eq!(SymbolKind::parse("Function"), Some(SymbolKind::Function));
        assert_eq!(SymbolKind::parse("type"), Some(SymbolKind::TypeAlias));
        assert_eq!(SymbolKind::parse(SymbolKind::Enum.as_str()), Some(SymbolKind::Enum));
        assert_eq!(SymbolKind::parse("module"), None);
    }
}
