use std::collections::{HashMap, HashSet};

use tree_sitter::Node;

use crate::graph::node::SymbolKind;
use crate::span::Span;

use super::imports::ImportDecl;
use super::symbols::{Declaration, collect_pattern_bindings};
use super::{node_text, span_of};

/// An occurrence of a name that is not itself a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub span: Span,
    /// Innermost enclosing declaration (index into the file's declarations);
    /// `None` means the file's top-level scope.
    pub owner: Option<usize>,
    /// The property accessed right after the name: `bark` in `Dog.bark()`.
    pub member: Option<(String, Span)>,
    /// A callback parameter, catch parameter or loop variable of the same
    /// name is in scope, so the name does not reach file-level symbols.
    pub shadowed: bool,
    /// `{ name }` in an object literal: the token is both key and value.
    pub shorthand: bool,
}

/// Node kinds that name something in expression or type position.
const REFERENCE_KINDS: &[&str] = &["identifier", "type_identifier", "shorthand_property_identifier"];

/// Collect every name occurrence that is not a declaration name.
///
/// Import and export clauses are skipped; the resolver links those through
/// their own binding symbols.
pub fn extract_references(
    root: Node,
    source: &[u8],
    declarations: &[Declaration],
    imports: &[ImportDecl],
) -> Vec<Reference> {
    let mut declared: HashSet<Span> = declarations.iter().map(|d| d.name_span).collect();
    declared.extend(
        imports
            .iter()
            .flat_map(|i| i.bindings.iter().map(|b| b.local_span)),
    );

    // Declaration node span -> owning declaration. Parameters never own code.
    let mut owners: HashMap<Span, usize> = HashMap::new();
    for (idx, decl) in declarations.iter().enumerate() {
        if decl.kind != SymbolKind::Parameter {
            owners.entry(decl.span).or_insert(idx);
        }
    }

    let mut walker = Walker {
        source,
        declared: &declared,
        owners: &owners,
        shadows: Vec::new(),
        out: Vec::new(),
    };
    walker.walk(root, None);
    walker.out
}

struct Walker<'a> {
    source: &'a [u8],
    declared: &'a HashSet<Span>,
    owners: &'a HashMap<Span, usize>,
    /// Names bound by enclosing scopes that have no declaration record.
    shadows: Vec<String>,
    out: Vec<Reference>,
}

impl Walker<'_> {
    fn walk(&mut self, node: Node, owner: Option<usize>) {
        match node.kind() {
            "import_statement" | "export_clause" | "namespace_export" | "comment" => return,
            _ => {}
        }

        let owner = self.owners.get(&span_of(node)).copied().or(owner);
        let depth = self.shadows.len();
        let bound = unrecorded_bindings(node, self.source, self.declared);
        self.shadows.extend(bound);

        if REFERENCE_KINDS.contains(&node.kind())
            && !self.declared.contains(&span_of(node))
            && !is_binding_position(node)
        {
            let name = node_text(node, self.source).to_owned();
            self.out.push(Reference {
                shadowed: self.shadows.contains(&name),
                shorthand: node.kind() == "shorthand_property_identifier",
                span: span_of(node),
                owner,
                member: member_of(node, self.source),
                name,
            });
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.walk(child, owner);
        }
        self.shadows.truncate(depth);
    }
}

/// Names `node` binds for its own subtree that the declaration pass does not
/// record: parameters of file-scope callbacks, catch parameters and
/// `for (const x of ...)` variables.
fn unrecorded_bindings(node: Node, source: &[u8], declared: &HashSet<Span>) -> Vec<String> {
    let mut binders = Vec::new();
    match node.kind() {
        "arrow_function" | "function_expression" | "generator_function" => {
            if let Some(single) = node.child_by_field_name("parameter") {
                binders.push(single);
            } else if let Some(params) = node.child_by_field_name("parameters") {
                let mut cursor = params.walk();
                binders.extend(params.named_children(&mut cursor));
            }
        }
        "catch_clause" => binders.extend(node.child_by_field_name("parameter")),
        "for_in_statement" if node.child_by_field_name("kind").is_some() => {
            binders.extend(node.child_by_field_name("left"));
        }
        _ => return Vec::new(),
    }
    let mut names = Vec::new();
    for binder in binders {
        collect_pattern_bindings(binder, &mut names);
    }
    names
        .into_iter()
        .filter(|n| !declared.contains(&span_of(*n)))
        .map(|n| node_text(n, source).to_owned())
        .collect()
}

/// True for identifiers that bind rather than use a name but are not
/// recorded as declarations (parameters of file-scope callbacks, catch
/// parameters, loop variables, generic parameters).
fn is_binding_position(node: Node) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    let is_field = |field: &str| parent.child_by_field_name(field) == Some(node);
    match parent.kind() {
        "formal_parameters" | "type_parameter" => true,
        "required_parameter" | "optional_parameter" => is_field("pattern"),
        "arrow_function" => is_field("parameter"),
        "catch_clause" => is_field("parameter"),
        "for_in_statement" => {
            is_field("left") && parent.child_by_field_name("kind").is_some()
        }
        "export_statement" => is_field("value"),
        "nested_type_identifier" => is_field("name"),
        _ => false,
    }
}

/// The property accessed directly on `node`, for `x.y` and `ns.Type`.
fn member_of(node: Node, source: &[u8]) -> Option<(String, Span)> {
    let parent = node.parent()?;
    let property = match parent.kind() {
        "member_expression" if parent.child_by_field_name("object") == Some(node) => {
            parent.child_by_field_name("property")?
        }
        "nested_type_identifier" if parent.child_by_field_name("module") == Some(node) => {
            parent.child_by_field_name("name")?
        }
        _ => return None,
    };
    Some((node_text(property, source).to_owned(), span_of(property)))
}
