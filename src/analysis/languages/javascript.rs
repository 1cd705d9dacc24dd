//! JavaScript and TypeScript rule tables.
//!
//! Both languages share one analyzer; they differ only in the order grammar
//! variants are tried, so JavaScript files using TypeScript syntax (and the
//! reverse) still get a syntax tree.

use tree_sitter::Node;

use crate::analysis::extract::is_excluded_constant_name;
use crate::analysis::{
    Ancestors, ContextFrame, GrammarVariant, Language, LanguageAnalyzer, ParsedFile, RefMatch,
    Symbol, SymbolKind, SymbolSeed, UsageKind,
};

const CLASS_KINDS: &[&str] = &["class_declaration", "abstract_class_declaration", "class"];

const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "arrow_function",
    "method_definition",
];

/// Nodes whose `name` field declares the name it holds.
const DECLARING_KINDS: &[&str] = &[
    "class_declaration",
    "abstract_class_declaration",
    "class",
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "method_definition",
    "variable_declarator",
    "interface_declaration",
    "type_alias_declaration",
    "enum_declaration",
    "export_specifier",
];

const GLOBAL_OBJECTS: &[&str] = &["window", "global", "globalThis"];

const IMPORT_QUERY: &str = r#"
(import_specifier name: (identifier) @name)
(import_clause (identifier) @name)
(namespace_import (identifier) @name)
"#;

/// Node kinds the JavaScript rule table distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsNode {
    Class,
    Function,
    Method,
    Lexical,
    Assignment,
    Export,
    Interface,
    Other,
}

impl JsNode {
    fn classify(kind: &str) -> Self {
        match kind {
            "class_declaration" | "abstract_class_declaration" => JsNode::Class,
            "function_declaration" | "generator_function_declaration" => JsNode::Function,
            "method_definition" => JsNode::Method,
            "lexical_declaration" => JsNode::Lexical,
            "assignment_expression" => JsNode::Assignment,
            "export_statement" => JsNode::Export,
            "interface_declaration" => JsNode::Interface,
            _ => JsNode::Other,
        }
    }
}

pub struct JavaScriptAnalyzer {
    language: Language,
}

impl JavaScriptAnalyzer {
    pub fn new() -> Self {
        Self {
            language: Language::JavaScript,
        }
    }

    /// The same rules, trying the TypeScript grammars first.
    pub fn typescript() -> Self {
        Self {
            language: Language::TypeScript,
        }
    }

    fn base_class(&self, class: Node, parsed: &ParsedFile) -> Option<String> {
        if let Some(superclass) = class.child_by_field_name("superclass") {
            return Some(parsed.node_text(superclass).to_string());
        }

        let mut cursor = class.walk();
        let heritage = class
            .named_children(&mut cursor)
            .find(|n| n.kind() == "class_heritage")?;

        let mut cursor = heritage.walk();
        let mut clauses = heritage.named_children(&mut cursor);
        let first = clauses.next()?;
        match first.kind() {
            "extends_clause" => first
                .child_by_field_name("value")
                .or_else(|| first.named_child(0))
                .map(|n| parsed.node_text(n).to_string()),
            "implements_clause" => None,
            _ => Some(parsed.node_text(first).to_string()),
        }
    }

    /// Name of a class node, falling back to the declarator it is assigned to.
    fn class_name(&self, class: Node, outer: Option<Node>, parsed: &ParsedFile) -> Option<String> {
        class
            .child_by_field_name("name")
            .map(|n| parsed.node_text(n).to_string())
            .or_else(|| {
                outer
                    .filter(|o| o.kind() == "variable_declarator")
                    .and_then(|o| parsed.field_text(o, "name"))
                    .map(str::to_string)
            })
    }

    /// Names declared by a declaration node wrapped in an export.
    fn declared_names(&self, declaration: Node, parsed: &ParsedFile) -> Vec<String> {
        match declaration.kind() {
            "lexical_declaration" | "variable_declaration" => {
                let mut cursor = declaration.walk();
                declaration
                    .named_children(&mut cursor)
                    .filter(|n| n.kind() == "variable_declarator")
                    .filter_map(|d| d.child_by_field_name("name"))
                    .filter(|n| n.kind() == "identifier")
                    .map(|n| parsed.node_text(n).to_string())
                    .collect()
            }
            _ => declaration
                .child_by_field_name("name")
                .map(|n| vec![parsed.node_text(n).to_string()])
                .unwrap_or_default(),
        }
    }

    fn export_seeds(&self, node: Node, parsed: &ParsedFile, out: &mut Vec<SymbolSeed>) {
        if let Some(declaration) = node.child_by_field_name("declaration") {
            for name in self.declared_names(declaration, parsed) {
                out.push(SymbolSeed::new(name, SymbolKind::Export, node));
            }
            return;
        }

        if let Some(value) = node.child_by_field_name("value") {
            if value.kind() == "identifier" {
                out.push(SymbolSeed::new(parsed.node_text(value), SymbolKind::Export, node));
            } else if let Some(name) = value.child_by_field_name("name") {
                out.push(SymbolSeed::new(parsed.node_text(name), SymbolKind::Export, node));
            }
            return;
        }

        let mut cursor = node.walk();
        for clause in node.named_children(&mut cursor).filter(|n| n.kind() == "export_clause") {
            let mut inner = clause.walk();
            for spec in clause.named_children(&mut inner).filter(|n| n.kind() == "export_specifier") {
                if let Some(name) = spec.child_by_field_name("name") {
                    out.push(SymbolSeed::new(parsed.node_text(name), SymbolKind::Export, node));
                }
            }
        }
    }

    fn lexical_seeds(
        &self,
        node: Node,
        ancestors: Ancestors<'_, '_>,
        parsed: &ParsedFile,
        out: &mut Vec<SymbolSeed>,
    ) {
        let is_const = node.child(0).is_some_and(|c| c.kind() == "const");
        if !is_const || ancestors.any_of(FUNCTION_KINDS) {
            return;
        }

        let mut cursor = node.walk();
        let declarators: Vec<Node> = node
            .named_children(&mut cursor)
            .filter(|n| n.kind() == "variable_declarator")
            .collect();
        let single = declarators.len() == 1;

        for declarator in declarators {
            let Some(name_node) = declarator.child_by_field_name("name") else {
                continue;
            };
            if name_node.kind() != "identifier" {
                continue;
            }
            let name = parsed.node_text(name_node);
            let span = if single { node } else { declarator };
            let is_function = declarator.child_by_field_name("value").is_some_and(|v| {
                matches!(v.kind(), "arrow_function" | "function_expression" | "function" | "generator_function")
            });

            if is_function {
                out.push(SymbolSeed::new(name, SymbolKind::Function, span));
            } else if !is_excluded_constant_name(name) {
                out.push(SymbolSeed::new(name, SymbolKind::Constant, span));
            }
        }
    }

    fn global_seed(
        &self,
        node: Node,
        ancestors: Ancestors<'_, '_>,
        parsed: &ParsedFile,
        out: &mut Vec<SymbolSeed>,
    ) {
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        if !is_global_member(left, parsed) {
            return;
        }
        if let Some(property) = left.child_by_field_name("property") {
            let span = ancestors
                .parent()
                .filter(|p| p.kind() == "expression_statement")
                .unwrap_or(node);
            out.push(SymbolSeed::new(parsed.node_text(property), SymbolKind::Global, span));
        }
    }
}

impl Default for JavaScriptAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn field_is(parent: Node, field: &str, node: Node) -> bool {
    parent.child_by_field_name(field) == Some(node)
}

/// `window.x`, `global.x` or `globalThis.x`.
fn is_global_member(node: Node, parsed: &ParsedFile) -> bool {
    node.kind() == "member_expression"
        && node.child_by_field_name("object").is_some_and(|o| {
            o.kind() == "identifier" && GLOBAL_OBJECTS.contains(&parsed.node_text(o))
        })
}

impl LanguageAnalyzer for JavaScriptAnalyzer {
    fn language(&self) -> Language {
        self.language
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        match self.language {
            Language::TypeScript => &["ts", "tsx", "mts", "cts"],
            _ => &["js", "jsx", "mjs", "cjs"],
        }
    }

    fn grammar_variants(&self) -> Vec<GrammarVariant> {
        let javascript = GrammarVariant::new("javascript", tree_sitter_javascript::LANGUAGE);
        let typescript = GrammarVariant::new("typescript", tree_sitter_typescript::LANGUAGE_TYPESCRIPT);
        let tsx = GrammarVariant::new("tsx", tree_sitter_typescript::LANGUAGE_TSX);
        match self.language {
            Language::TypeScript => vec![typescript, tsx, javascript],
            _ => vec![javascript, typescript, tsx],
        }
    }

    fn symbols_at<'t>(
        &self,
        node: Node<'t>,
        ancestors: Ancestors<'_, 't>,
        parsed: &ParsedFile,
        out: &mut Vec<SymbolSeed>,
    ) {
        match JsNode::classify(node.kind()) {
            JsNode::Class => {
                if let Some(name) = parsed.field_text(node, "name") {
                    out.push(
                        SymbolSeed::new(name, SymbolKind::Class, node)
                            .with_extends(self.base_class(node, parsed)),
                    );
                }
            }
            JsNode::Function => {
                if let Some(name) = parsed.field_text(node, "name") {
                    out.push(SymbolSeed::new(name, SymbolKind::Function, node));
                }
            }
            JsNode::Method => {
                if let Some(name) = parsed.field_text(node, "name") {
                    let chain: Vec<Node> = ancestors.iter().collect();
                    let parent = chain
                        .iter()
                        .position(|n| CLASS_KINDS.contains(&n.kind()))
                        .and_then(|i| self.class_name(chain[i], chain.get(i + 1).copied(), parsed));
                    out.push(SymbolSeed::new(name, SymbolKind::Method, node).with_parent(parent));
                }
            }
            JsNode::Lexical => self.lexical_seeds(node, ancestors, parsed, out),
            JsNode::Assignment => self.global_seed(node, ancestors, parsed, out),
            JsNode::Export => self.export_seeds(node, parsed, out),
            JsNode::Interface => {
                if let Some(name) = parsed.field_text(node, "name") {
                    out.push(SymbolSeed::new(name, SymbolKind::Interface, node));
                }
            }
            JsNode::Other => {}
        }
    }

    fn is_scope_boundary(&self, node: Node) -> bool {
        CLASS_KINDS.contains(&node.kind()) || FUNCTION_KINDS.contains(&node.kind())
    }

    fn is_name_node(&self, kind: &str) -> bool {
        matches!(
            kind,
            "identifier"
                | "property_identifier"
                | "type_identifier"
                | "shorthand_property_identifier"
                | "shorthand_property_identifier_pattern"
        )
    }

    fn classify_reference<'t>(
        &self,
        node: Node<'t>,
        ancestors: Ancestors<'_, 't>,
        parsed: &ParsedFile,
        _target: &Symbol,
    ) -> RefMatch {
        let Some(parent) = ancestors.parent() else {
            return RefMatch::Use(UsageKind::PlainReference);
        };
        let grandparent = ancestors.grandparent();

        if DECLARING_KINDS.contains(&parent.kind()) && field_is(parent, "name", node) {
            return RefMatch::Declaration;
        }

        match parent.kind() {
            "call_expression" if field_is(parent, "function", node) => {
                RefMatch::Use(UsageKind::Call)
            }
            "new_expression" if field_is(parent, "constructor", node) => {
                RefMatch::Use(UsageKind::Instantiation)
            }
            "member_expression" if field_is(parent, "property", node) => match grandparent {
                Some(g)
                    if g.kind() == "assignment_expression"
                        && field_is(g, "left", parent)
                        && is_global_member(parent, parsed) =>
                {
                    RefMatch::Declaration
                }
                Some(g) if g.kind() == "call_expression" && field_is(g, "function", parent) => {
                    RefMatch::Use(UsageKind::Call)
                }
                Some(g) if g.kind() == "new_expression" && field_is(g, "constructor", parent) => {
                    RefMatch::Use(UsageKind::Instantiation)
                }
                Some(g) if matches!(g.kind(), "class_heritage" | "extends_clause") => {
                    RefMatch::Use(UsageKind::Inheritance)
                }
                _ => RefMatch::Use(UsageKind::PlainReference),
            },
            "class_heritage" | "extends_clause" | "implements_clause" | "extends_type_clause" => {
                RefMatch::Use(UsageKind::Inheritance)
            }
            "import_specifier" | "import_clause" | "namespace_import" => {
                RefMatch::Use(UsageKind::Import)
            }
            "pair" if field_is(parent, "key", node) => RefMatch::Ignore,
            "generic_type" if grandparent.is_some_and(|g| g.kind() == "extends_clause") => {
                RefMatch::Use(UsageKind::Inheritance)
            }
            _ => RefMatch::Use(UsageKind::PlainReference),
        }
    }

    fn context_frame(&self, node: Node, outer: Option<Node>, parsed: &ParsedFile) -> Option<ContextFrame> {
        let kind = node.kind();
        if CLASS_KINDS.contains(&kind) {
            return self.class_name(node, outer, parsed).map(ContextFrame::Class);
        }
        if !FUNCTION_KINDS.contains(&kind) {
            return None;
        }

        if let Some(name) = parsed.field_text(node, "name") {
            return Some(ContextFrame::Function(name.to_string()));
        }

        let outer = outer?;
        let name = match outer.kind() {
            "variable_declarator" => parsed.field_text(outer, "name"),
            "pair" => parsed.field_text(outer, "key"),
            "assignment_expression" => outer.child_by_field_name("left").map(|left| {
                left.child_by_field_name("property")
                    .map(|p| parsed.node_text(p))
                    .unwrap_or_else(|| parsed.node_text(left))
            }),
            _ => None,
        }?;
        Some(ContextFrame::Function(name.to_string()))
    }

    fn import_query(&self) -> Option<&'static str> {
        Some(IMPORT_QUERY)
    }
}
