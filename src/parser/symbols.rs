use tree_sitter::Node;

use crate::edit::EditRole;
use crate::graph::node::SymbolKind;
use crate::span::Span;

use super::{node_text, span_of};

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A named declaration found in a file.
///
/// Spans are byte ranges into the file text. `parent` is an index into the
/// same `Vec<Declaration>` and always points at an earlier entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub kind: SymbolKind,
    pub parent: Option<usize>,
    /// The declaration node itself (function, class, declarator, method, parameter...).
    pub span: Span,
    /// The identifier token that introduces the name.
    pub name_span: Span,
    /// The statement that carries the declaration, including any `export` keyword.
    pub statement: Span,
    /// What `remove()` deletes, before widening.
    pub removal: Span,
    pub role: EditRole,
    /// Contiguous comments directly above the statement.
    pub doc: Option<Span>,
    pub body: Option<Span>,
    pub value: Option<Span>,
    pub exported: bool,
    pub default_export: bool,
    /// Class members and object-literal methods are only reachable through
    /// their owner (`Dog.bark`), never by a bare name.
    pub member: bool,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

struct Collector<'a> {
    source: &'a [u8],
    out: Vec<Declaration>,
}

/// Extract every named declaration from a parsed tree, in source order.
///
/// Handles:
/// - `function` / generator declarations (+ their parameters)
/// - `const` / `let` / `var` declarators, including destructuring patterns
/// - classes (incl. abstract), methods and fields
/// - interfaces, type aliases and enums
/// - declarations nested in function bodies (parent = enclosing declaration)
pub fn extract_declarations(root: Node, source: &[u8]) -> Vec<Declaration> {
    let mut collector = Collector {
        source,
        out: Vec::new(),
    };
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        collector.visit(child, None);
    }
    collector.out
}

impl<'a> Collector<'a> {
    fn visit(&mut self, node: Node, parent: Option<usize>) {
        match node.kind() {
            // Import bindings are recorded by the import pass.
            "import_statement" | "comment" => {}
            "function_declaration" | "generator_function_declaration" => {
                self.declare_function(node, parent);
            }
            "class_declaration" | "abstract_class_declaration" => {
                self.declare_class(node, parent);
            }
            "lexical_declaration" | "variable_declaration" => {
                self.declare_variables(node, parent);
            }
            "interface_declaration" => self.declare_simple(node, parent, SymbolKind::Interface),
            "type_alias_declaration" => self.declare_simple(node, parent, SymbolKind::TypeAlias),
            "enum_declaration" => self.declare_simple(node, parent, SymbolKind::Enum),
            "method_definition" | "method_signature" | "abstract_method_signature" => {
                self.declare_method(node, parent);
            }
            "public_field_definition" | "field_definition" => self.declare_field(node, parent),
            "arrow_function" | "function_expression" | "function" | "generator_function" => {
                // Anonymous callable: its parameters and nested declarations
                // belong to whatever encloses it. At file scope nothing does,
                // and its locals must not leak into the module namespace.
                if parent.is_some() {
                    self.declare_callable_parts(node, parent);
                }
            }
            _ => self.visit_children(node, parent),
        }
    }

    fn visit_children(&mut self, node: Node, parent: Option<usize>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.visit(child, parent);
        }
    }

    fn push(&mut self, decl: Declaration) -> usize {
        self.out.push(decl);
        self.out.len() - 1
    }

    fn base(&self, node: Node, name_node: Node, kind: SymbolKind, parent: Option<usize>) -> Declaration {
        let statement_node = statement_of(node);
        let (exported, default_export) = export_flags(statement_node, self.source);
        let statement = span_of(statement_node);
        Declaration {
            name: node_text(name_node, self.source).to_owned(),
            kind,
            parent,
            span: span_of(node),
            name_span: span_of(name_node),
            statement,
            removal: statement,
            role: EditRole::Statement,
            doc: doc_span(statement_node, self.source),
            body: None,
            value: None,
            exported,
            default_export,
            member: false,
        }
    }

    fn declare_function(&mut self, node: Node, parent: Option<usize>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            self.declare_callable_parts(node, parent);
            return;
        };
        let mut decl = self.base(node, name_node, SymbolKind::Function, parent);
        decl.body = node.child_by_field_name("body").map(span_of);
        let idx = self.push(decl);
        self.declare_callable_parts(node, Some(idx));
    }

    /// Parameters and body of any callable node, owned by `owner`.
    fn declare_callable_parts(&mut self, node: Node, owner: Option<usize>) {
        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            for param in params.named_children(&mut cursor) {
                if param.kind() == "comment" {
                    continue;
                }
                self.declare_parameter(param, owner);
            }
        } else if let Some(single) = node.child_by_field_name("parameter") {
            // `x => ...`
            self.declare_parameter(single, owner);
        }
        if let Some(body) = node.child_by_field_name("body") {
            if body.kind() == "statement_block" {
                self.visit_children(body, owner);
            } else {
                // Expression body of an arrow function.
                self.visit(body, owner);
            }
        }
    }

    fn declare_parameter(&mut self, param: Node, owner: Option<usize>) {
        if owner.is_none() {
            return;
        }
        let mut bindings = Vec::new();
        collect_pattern_bindings(param, &mut bindings);
        let span = span_of(param);
        let mut last = owner;
        for name_node in bindings {
            last = Some(self.push(Declaration {
                name: node_text(name_node, self.source).to_owned(),
                kind: SymbolKind::Parameter,
                parent: owner,
                span,
                name_span: span_of(name_node),
                statement: span,
                removal: span,
                role: EditRole::ListItem,
                doc: None,
                body: None,
                value: None,
                exported: false,
                default_export: false,
                member: false,
            }));
        }
        // Default values may contain callables with their own declarations.
        let default = param
            .child_by_field_name("value")
            .or_else(|| param.child_by_field_name("right"));
        if let Some(value) = default {
            self.visit(value, last);
        }
    }

    fn declare_class(&mut self, node: Node, parent: Option<usize>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            self.visit_children(node, parent);
            return;
        };
        let mut decl = self.base(node, name_node, SymbolKind::Class, parent);
        let body = node.child_by_field_name("body");
        decl.body = body.map(span_of);
        let idx = self.push(decl);
        if let Some(body) = body {
            self.visit_children(body, Some(idx));
        }
    }

    fn declare_method(&mut self, node: Node, parent: Option<usize>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        if name_node.kind() == "computed_property_name" {
            self.declare_callable_parts(node, parent);
            return;
        }
        let span = span_of(node);
        let idx = self.push(Declaration {
            name: node_text(name_node, self.source).to_owned(),
            kind: SymbolKind::Method,
            parent,
            span,
            name_span: span_of(name_node),
            statement: span,
            removal: span,
            role: EditRole::Statement,
            doc: doc_span(node, self.source),
            body: node.child_by_field_name("body").map(span_of),
            value: None,
            exported: false,
            default_export: false,
            member: true,
        });
        self.declare_callable_parts(node, Some(idx));
    }

    fn declare_field(&mut self, node: Node, parent: Option<usize>) {
        let name_node = node
            .child_by_field_name("name")
            .or_else(|| node.child_by_field_name("property"));
        let Some(name_node) = name_node else {
            return;
        };
        if name_node.kind() == "computed_property_name" {
            return;
        }
        let span = span_of(node);
        let value = node.child_by_field_name("value");
        let idx = self.push(Declaration {
            name: node_text(name_node, self.source).to_owned(),
            kind: SymbolKind::Variable,
            parent,
            span,
            name_span: span_of(name_node),
            statement: span,
            removal: span,
            role: EditRole::Statement,
            doc: doc_span(node, self.source),
            body: None,
            value: value.map(span_of),
            exported: false,
            default_export: false,
            member: true,
        });
        if let Some(value) = value {
            self.visit(value, Some(idx));
        }
    }

    fn declare_simple(&mut self, node: Node, parent: Option<usize>, kind: SymbolKind) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let mut decl = self.base(node, name_node, kind, parent);
        decl.body = node
            .child_by_field_name("body")
            .or_else(|| node.child_by_field_name("value"))
            .map(span_of);
        self.push(decl);
    }

    fn declare_variables(&mut self, node: Node, parent: Option<usize>) {
        let mut cursor = node.walk();
        let declarators: Vec<Node> = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "variable_declarator")
            .collect();
        let shared = declarators.len() > 1;

        for declarator in declarators {
            let Some(name_node) = declarator.child_by_field_name("name") else {
                continue;
            };
            let value = declarator.child_by_field_name("value");

            if name_node.kind() == "identifier" {
                let kind = match value {
                    Some(v) if is_function_value(v) => SymbolKind::Function,
                    _ => SymbolKind::Variable,
                };
                let mut decl = self.base(declarator, name_node, kind, parent);
                decl.value = value.map(span_of);
                if let Some(v) = value.filter(|v| is_function_value(*v)) {
                    decl.body = v.child_by_field_name("body").map(span_of);
                }
                if shared {
                    decl.removal = span_of(declarator);
                    decl.role = EditRole::ListItem;
                }
                let idx = self.push(decl);
                match value {
                    Some(v) if is_function_value(v) => self.declare_callable_parts(v, Some(idx)),
                    Some(v) => self.visit(v, Some(idx)),
                    None => {}
                }
                continue;
            }

            // Destructuring: one Variable per bound identifier.
            let mut bindings = Vec::new();
            collect_pattern_bindings(name_node, &mut bindings);
            let first = self.out.len();
            for binding in bindings {
                let mut decl = self.base(declarator, binding, SymbolKind::Variable, parent);
                decl.value = value.map(span_of);
                if shared {
                    decl.removal = span_of(declarator);
                    decl.role = EditRole::ListItem;
                }
                self.push(decl);
            }
            if let Some(v) = value {
                let owner = (self.out.len() > first).then_some(first).or(parent);
                self.visit(v, owner);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helper utilities
// ---------------------------------------------------------------------------

/// Return true if `node` is an arrow function or a function expression.
fn is_function_value(node: Node) -> bool {
    matches!(
        node.kind(),
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

/// The statement a declaration node belongs to: the declaration itself, its
/// `lexical_declaration` (for declarators), wrapped by an `export_statement`
/// when exported.
fn statement_of(node: Node) -> Node {
    let mut stmt = node;
    if node.kind() == "variable_declarator"
        && let Some(p) = node.parent()
    {
        stmt = p;
    }
    match stmt.parent() {
        Some(p) if p.kind() == "export_statement" => p,
        _ => stmt,
    }
}

/// Returns `(is_exported, is_default)` for a statement node.
fn export_flags(statement: Node, source: &[u8]) -> (bool, bool) {
    if statement.kind() != "export_statement" {
        return (false, false);
    }
    let mut cursor = statement.walk();
    let is_default = statement
        .children(&mut cursor)
        .any(|c| !c.is_named() && node_text(c, source) == "default");
    (true, is_default)
}

/// Contiguous `comment` siblings directly above `node`, stopping at a blank line.
fn doc_span(node: Node, source: &[u8]) -> Option<Span> {
    let mut comments: Vec<Node> = Vec::new();
    let mut boundary = node.start_byte();
    let mut current = node.prev_sibling();
    while let Some(prev) = current {
        if prev.kind() != "comment" {
            break;
        }
        let gap = &source[prev.end_byte()..boundary];
        if gap.iter().filter(|&&b| b == b'\n').count() > 1
            || gap.iter().any(|b| !b.is_ascii_whitespace())
        {
            break;
        }
        comments.push(prev);
        boundary = prev.start_byte();
        current = prev.prev_sibling();
    }
    // Trailing comments on the previous statement's line are not documentation.
    while let Some(&first) = comments.last() {
        if starts_line(first.start_byte(), source) {
            break;
        }
        comments.pop();
    }
    let first = comments.last()?;
    let last = comments.first()?;
    Some(Span::new(first.start_byte(), last.end_byte()))
}

fn starts_line(offset: usize, source: &[u8]) -> bool {
    source[..offset]
        .iter()
        .rev()
        .take_while(|&&b| b != b'\n')
        .all(|b| b.is_ascii_whitespace())
}

/// Identifier nodes bound by a parameter or destructuring pattern.
pub(super) fn collect_pattern_bindings<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    match node.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => out.push(node),
        "required_parameter" | "optional_parameter" => {
            if let Some(pattern) = node.child_by_field_name("pattern") {
                collect_pattern_bindings(pattern, out);
            }
        }
        "assignment_pattern" | "object_assignment_pattern" => {
            if let Some(left) = node.child_by_field_name("left") {
                collect_pattern_bindings(left, out);
            }
        }
        "pair_pattern" => {
            if let Some(value) = node.child_by_field_name("value") {
                collect_pattern_bindings(value, out);
            }
        }
        "rest_pattern" | "object_pattern" | "array_pattern" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                collect_pattern_bindings(child, out);
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
