pub mod imports;
pub mod languages;
pub mod references;
pub mod symbols;

use std::cell::RefCell;
use std::path::Path;

use tree_sitter::{Node, Parser, Tree};

use crate::error::ParseError;
use crate::span::Span;

use imports::{ExportDecl, ImportDecl, extract_exports, extract_imports};
use languages::Lang;
use references::{Reference, extract_references};
use symbols::{Declaration, extract_declarations};

// Thread-local Parser instances: one per rayon worker thread, no lock contention.
// Each Parser is initialised once per thread with the appropriate grammar.
thread_local! {
    static PARSER_TS: RefCell<Parser> = RefCell::new(parser_for(Lang::TypeScript));
    static PARSER_TSX: RefCell<Parser> = RefCell::new(parser_for(Lang::Tsx));
    static PARSER_JS: RefCell<Parser> = RefCell::new(parser_for(Lang::JavaScript));
}

fn parser_for(lang: Lang) -> Parser {
    let mut p = Parser::new();
    p.set_language(&lang.grammar())
        .expect("bundled grammar is ABI-compatible with tree-sitter");
    p
}

/// A concrete syntax tree handed over by a [`SyntaxAdapter`].
pub struct SyntaxTree {
    pub tree: Tree,
    pub lang: Lang,
}

/// The seam between the engine and whatever produces concrete syntax trees.
///
/// An adapter either returns a clean tree or a [`ParseError`]; the engine never
/// builds symbols from a partial tree. Adapters are shared across rayon
/// workers, hence `Send + Sync`.
pub trait SyntaxAdapter: Send + Sync {
    fn parse(&self, path: &Path, text: &str) -> Result<SyntaxTree, ParseError>;
}

/// Default adapter backed by the bundled tree-sitter TypeScript/JavaScript grammars.
///
/// Trees containing `ERROR` or `MISSING` nodes are rejected with the position
/// of the first offending node.
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeSitterAdapter;

impl SyntaxAdapter for TreeSitterAdapter {
    fn parse(&self, path: &Path, text: &str) -> Result<SyntaxTree, ParseError> {
        let lang = Lang::from_path(path).ok_or_else(|| ParseError {
            path: path.to_path_buf(),
            reason: "unsupported file extension".into(),
        })?;

        let source = text.as_bytes();
        let tree = match lang {
            Lang::TypeScript => PARSER_TS.with(|p| p.borrow_mut().parse(source, None)),
            Lang::Tsx => PARSER_TSX.with(|p| p.borrow_mut().parse(source, None)),
            Lang::JavaScript => PARSER_JS.with(|p| p.borrow_mut().parse(source, None)),
        };
        let tree = tree.ok_or_else(|| ParseError {
            path: path.to_path_buf(),
            reason: "parser returned no tree".into(),
        })?;

        let root = tree.root_node();
        if root.has_error() {
            let reason = match first_error(root) {
                Some(node) => {
                    let pos = node.start_position();
                    let what = if node.is_missing() {
                        format!("missing {}", node.kind())
                    } else {
                        "syntax error".to_owned()
                    };
                    format!("{what} at {}:{}", pos.row + 1, pos.column + 1)
                }
                None => "syntax error".to_owned(),
            };
            return Err(ParseError {
                path: path.to_path_buf(),
                reason,
            });
        }

        Ok(SyntaxTree { tree, lang })
    }
}

/// Depth-first search for the first `ERROR` or `MISSING` node.
fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error(child) {
            return Some(found);
        }
    }
    None
}

/// Whether the syntax adapter accepted the file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ParseStatus {
    Parsed,
    Unparsed { reason: String },
}

/// Everything the resolver needs to know about one file, extracted once per parse.
///
/// The tree-sitter `Tree` is NOT retained; only these facts are cached on the
/// file, so an untouched file can be re-linked after a commit without parsing
/// it again.
#[derive(Debug, Clone, Default)]
pub struct FileSyntax {
    /// Declarations in source order. `parent` indices point into this vector.
    pub declarations: Vec<Declaration>,
    pub imports: Vec<ImportDecl>,
    pub exports: Vec<ExportDecl>,
    pub references: Vec<Reference>,
}

impl FileSyntax {
    pub fn extract(tree: &SyntaxTree, text: &str) -> Self {
        let source = text.as_bytes();
        let root = tree.tree.root_node();
        let declarations = extract_declarations(root, source);
        let imports = extract_imports(root, source, tree.lang);
        let exports = extract_exports(root, source, tree.lang);
        let references = extract_references(root, source, &declarations, &imports);
        Self {
            declarations,
            imports,
            exports,
            references,
        }
    }
}

/// Parse one file through `adapter` and extract its syntax facts.
///
/// Adapter failures never propagate: the file degrades to
/// [`ParseStatus::Unparsed`] with empty facts.
pub fn analyse(adapter: &dyn SyntaxAdapter, path: &Path, text: &str) -> (ParseStatus, FileSyntax) {
    match adapter.parse(path, text) {
        Ok(tree) => (ParseStatus::Parsed, FileSyntax::extract(&tree, text)),
        Err(err) => (
            ParseStatus::Unparsed { reason: err.reason },
            FileSyntax::default(),
        ),
    }
}

// ---------------------------------------------------------------------------
// Helper utilities shared by the extraction passes
// ---------------------------------------------------------------------------

/// Extract the UTF-8 text of a node from the original source bytes.
pub(crate) fn node_text<'a>(node: Node<'a>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

pub(crate) fn span_of(node: Node) -> Span {
    let range = node.byte_range();
    Span::new(range.start, range.end)
}

/// Find the first direct child of `node` with the given kind.
pub(crate) fn find_child_of_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|c| c.kind() == kind)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn parse(path: &str, src: &str) -> FileSyntax {
        let tree = TreeSitterAdapter
            .parse(Path::new(path), src)
            .expect("test source should parse");
        FileSyntax::extract(&tree, src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_tree_is_parsed() {
        let (status, facts) = analyse(&TreeSitterAdapter, Path::new("a.ts"), "export function foo() {}\n");
        assert_eq!(status, ParseStatus::Parsed);
        assert_eq!(facts.declarations.len(), 1);
    }

    #[test]
    fn test_error_tree_degrades_to_unparsed() {
        let (status, facts) = analyse(&TreeSitterAdapter, Path::new("bad.ts"), "function (( {\n");
        match status {
            ParseStatus::Unparsed { reason } => assert!(!reason.is_empty()),
            other => panic!("expected Unparsed, got {other:?}"),
        }
        assert!(facts.declarations.is_empty(), "no symbols from a broken tree");
    }

    #[test]
    fn test_unsupported_extension_is_a_parse_error() {
        let err = TreeSitterAdapter
            .parse(Path::new("notes.md"), "# hi")
            .err()
            .expect("markdown is not supported");
        assert_eq!(err.reason, "unsupported file extension");
    }

    #[test]
    fn test_custom_adapter_failure() {
        struct Refuse;
        impl SyntaxAdapter for Refuse {
            fn parse(&self, path: &Path, _text: &str) -> Result<SyntaxTree, ParseError> {
                Err(ParseError {
                    path: path.to_path_buf(),
                    reason: "refused".into(),
                })
            }
        }
        let (status, _) = analyse(&Refuse, Path::new("a.ts"), "const x = 1;");
        assert_eq!(
            status,
            ParseStatus::Unparsed {
                reason: "refused".into()
            }
        );
    }
}
