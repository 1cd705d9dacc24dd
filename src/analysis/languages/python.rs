//! Python rule table.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use tree_sitter::Node;

use crate::analysis::extract::is_excluded_constant_name;
use crate::analysis::{
    Ancestors, ContextFrame, GrammarVariant, Language, LanguageAnalyzer, ParsedFile, RefMatch,
    Symbol, SymbolKind, SymbolSeed, UsageKind,
};

const SCOPE_KINDS: &[&str] = &["class_definition", "function_definition"];

const IMPORT_QUERY: &str = r#"
(import_from_statement name: (dotted_name (identifier) @name))
(import_from_statement name: (aliased_import name: (dotted_name (identifier) @name)))
"#;

lazy_static! {
    static ref CONSTANT_NAME: Regex = Regex::new(r"^[A-Z][A-Z_0-9]*$").unwrap();
}

/// Node kinds the Python rule table distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PyNode {
    Module,
    Class,
    Function,
    Other,
}

impl PyNode {
    fn classify(kind: &str) -> Self {
        match kind {
            "module" => PyNode::Module,
            "class_definition" => PyNode::Class,
            "function_definition" => PyNode::Function,
            _ => PyNode::Other,
        }
    }
}

pub struct PythonAnalyzer;

impl PythonAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Decorators belong to the definition they decorate.
    fn span_of<'t>(node: Node<'t>, ancestors: Ancestors<'_, 't>) -> Node<'t> {
        ancestors
            .parent()
            .filter(|p| p.kind() == "decorated_definition")
            .unwrap_or(node)
    }

    fn base_class(class: Node, parsed: &ParsedFile) -> Option<String> {
        let superclasses = class.child_by_field_name("superclasses")?;
        let mut cursor = superclasses.walk();
        let first = superclasses
            .named_children(&mut cursor)
            .find(|n| n.kind() != "keyword_argument" && n.kind() != "comment");
        first.map(|n| parsed.node_text(n).to_string())
    }

    /// Constants and globals of a module, from one pass over the tree.
    ///
    /// A name listed in a `global` statement is reported at its module-level
    /// assignments; a name no module-level statement assigns is reported at
    /// the first `global` statement listing it.
    fn module_seeds(module: Node, parsed: &ParsedFile, out: &mut Vec<SymbolSeed>) {
        let mut scan = ModuleScan::default();
        scan.visit(module, None, false, parsed);

        let global_names: HashSet<&str> = scan.globals.iter().map(|(g, _)| g.as_str()).collect();
        let mut assigned = HashSet::new();
        for (name, span) in &scan.assignments {
            if global_names.contains(name.as_str()) {
                assigned.insert(name.as_str());
                out.push(SymbolSeed::new(name, SymbolKind::Global, *span));
            } else if CONSTANT_NAME.is_match(name) && !is_excluded_constant_name(name) {
                out.push(SymbolSeed::new(name, SymbolKind::Constant, *span));
            }
        }
        for (name, statement) in &scan.globals {
            if !assigned.contains(name.as_str()) {
                out.push(SymbolSeed::new(name, SymbolKind::Global, *statement));
            }
        }
    }
}

/// Module-wide facts gathered by [`PythonAnalyzer::module_seeds`].
#[derive(Default)]
struct ModuleScan<'t> {
    /// Names in `global` statements, with the first statement naming each.
    globals: Vec<(String, Node<'t>)>,
    /// Assignments to a plain name outside any class or function.
    assignments: Vec<(String, Node<'t>)>,
}

impl<'t> ModuleScan<'t> {
    fn visit(&mut self, node: Node<'t>, parent: Option<Node<'t>>, nested: bool, parsed: &ParsedFile) {
        match node.kind() {
            "global_statement" => {
                let mut cursor = node.walk();
                for ident in node.named_children(&mut cursor).filter(|n| n.kind() == "identifier") {
                    let name = parsed.node_text(ident);
                    if !self.globals.iter().any(|(g, _)| g == name) {
                        self.globals.push((name.to_string(), node));
                    }
                }
            }
            "assignment" if !nested => {
                if let Some(left) = node.child_by_field_name("left").filter(|l| l.kind() == "identifier") {
                    let span = parent.filter(|p| p.kind() == "expression_statement").unwrap_or(node);
                    self.assignments.push((parsed.node_text(left).to_string(), span));
                }
            }
            _ => {}
        }

        let nested = nested || SCOPE_KINDS.contains(&node.kind());
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.visit(child, Some(node), nested, parsed);
        }
    }
}

impl Default for PythonAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for PythonAnalyzer {
    fn language(&self) -> Language {
        Language::Python
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["py", "pyw"]
    }

    fn grammar_variants(&self) -> Vec<GrammarVariant> {
        vec![GrammarVariant::new("python", tree_sitter_python::LANGUAGE)]
    }

    fn symbols_at<'t>(
        &self,
        node: Node<'t>,
        ancestors: Ancestors<'_, 't>,
        parsed: &ParsedFile,
        out: &mut Vec<SymbolSeed>,
    ) {
        match PyNode::classify(node.kind()) {
            PyNode::Class => {
                if let Some(name) = parsed.field_text(node, "name") {
                    out.push(
                        SymbolSeed::new(name, SymbolKind::Class, Self::span_of(node, ancestors))
                            .with_extends(Self::base_class(node, parsed)),
                    );
                }
            }
            PyNode::Function => {
                let Some(name) = parsed.field_text(node, "name") else {
                    return;
                };
                let span = Self::span_of(node, ancestors);
                match ancestors.nearest(SCOPE_KINDS) {
                    Some(class) if class.kind() == "class_definition" => {
                        let parent = parsed.field_text(class, "name").map(str::to_string);
                        out.push(SymbolSeed::new(name, SymbolKind::Method, span).with_parent(parent));
                    }
                    _ => out.push(SymbolSeed::new(name, SymbolKind::Function, span)),
                }
            }
            PyNode::Module => Self::module_seeds(node, parsed, out),
            PyNode::Other => {}
        }
    }

    fn is_scope_boundary(&self, node: Node) -> bool {
        SCOPE_KINDS.contains(&node.kind())
    }

    fn is_name_node(&self, kind: &str) -> bool {
        kind == "identifier"
    }

    fn classify_reference<'t>(
        &self,
        node: Node<'t>,
        ancestors: Ancestors<'_, 't>,
        _parsed: &ParsedFile,
        target: &Symbol,
    ) -> RefMatch {
        let Some(parent) = ancestors.parent() else {
            return RefMatch::Use(UsageKind::PlainReference);
        };
        let grandparent = ancestors.grandparent();
        let call_usage = if target.kind.is_constructible() {
            UsageKind::Instantiation
        } else {
            UsageKind::Call
        };
        let is_superclass_list = |list: Option<Node>, owner: Option<Node>| {
            list.is_some_and(|l| l.kind() == "argument_list")
                && owner.is_some_and(|o| o.kind() == "class_definition" && o.child_by_field_name("superclasses") == list)
        };

        match parent.kind() {
            "function_definition" | "class_definition"
                if parent.child_by_field_name("name") == Some(node) =>
            {
                RefMatch::Declaration
            }
            "assignment" if parent.child_by_field_name("left") == Some(node) => {
                let module_level = !ancestors.any_of(SCOPE_KINDS);
                if module_level && matches!(target.kind, SymbolKind::Constant | SymbolKind::Global) {
                    RefMatch::Declaration
                } else {
                    RefMatch::Use(UsageKind::PlainReference)
                }
            }
            "call" if parent.child_by_field_name("function") == Some(node) => RefMatch::Use(call_usage),
            "attribute" if parent.child_by_field_name("attribute") == Some(node) => {
                let great = ancestors.iter().nth(2);
                match grandparent {
                    Some(g) if g.kind() == "call" && g.child_by_field_name("function") == Some(parent) => {
                        RefMatch::Use(call_usage)
                    }
                    g if is_superclass_list(g, great) => RefMatch::Use(UsageKind::Inheritance),
                    _ => RefMatch::Use(UsageKind::PlainReference),
                }
            }
            "argument_list" if is_superclass_list(Some(parent), grandparent) => {
                RefMatch::Use(UsageKind::Inheritance)
            }
            "dotted_name"
                if grandparent.is_some_and(|g| {
                    matches!(g.kind(), "import_from_statement" | "import_statement" | "aliased_import")
                }) =>
            {
                RefMatch::Use(UsageKind::Import)
            }
            "keyword_argument" if parent.child_by_field_name("name") == Some(node) => RefMatch::Ignore,
            "global_statement" if target.kind == SymbolKind::Global => RefMatch::Declaration,
            "global_statement" | "nonlocal_statement" => RefMatch::Ignore,
            _ => RefMatch::Use(UsageKind::PlainReference),
        }
    }

    fn context_frame(&self, node: Node, _outer: Option<Node>, parsed: &ParsedFile) -> Option<ContextFrame> {
        let name = || parsed.field_text(node, "name").map(str::to_string);
        match PyNode::classify(node.kind()) {
            PyNode::Function => name().map(ContextFrame::Function),
            PyNode::Class => name().map(ContextFrame::Class),
            _ => None,
        }
    }

    fn import_query(&self) -> Option<&'static str> {
        Some(IMPORT_QUERY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::parse::{parse_source, DEFAULT_ERROR_TOLERANCE};
    use crate::analysis::{extract_symbols, find_references, ExtractionQuery, SourceModel};

    fn parse_py(source: &str) -> ParsedFile {
        match parse_source(&PythonAnalyzer::new(), "test.py", source.as_bytes(), DEFAULT_ERROR_TOLERANCE) {
            SourceModel::Syntax(parsed) => parsed,
            SourceModel::Heuristic(raw) => panic!("unexpected heuristic fallback: {}", raw.reason),
        }
    }

    fn extract(source: &str) -> Vec<Symbol> {
        extract_symbols(&PythonAnalyzer::new(), &parse_py(source), &ExtractionQuery::all())
    }

    #[test]
    fn test_classes_methods_and_functions() {
        let source = "\
class Calculator(Base):
    def add(self, a, b):
        return a + b

    @staticmethod
    def zero():
        return 0


def helper():
    def inner():
        pass
    return inner
";
        let symbols = extract(source);
        let summary: Vec<_> = symbols.iter().map(|s| (s.name.as_str(), s.kind)).collect();
        assert_eq!(
            summary,
            vec![
                ("Calculator", SymbolKind::Class),
                ("add", SymbolKind::Method),
                ("zero", SymbolKind::Method),
                ("helper", SymbolKind::Function),
            ]
        );
        assert_eq!(symbols[0].extends.as_deref(), Some("Base"));
        assert_eq!(symbols[1].parent.as_deref(), Some("Calculator"));
        // The decorator is part of the method's span.
        assert_eq!(symbols[2].start_line, 5);
    }

    #[test]
    fn test_constants_and_globals() {
        let source = "\
MAX_RETRIES = 3
timeout = 10
X = 1
_HIDDEN = 2
counter = 0

def bump():
    global counter
    LIMIT = 5
    counter += 1
";
        let symbols = extract(source);
        let summary: Vec<_> = symbols
            .iter()
            .filter(|s| s.kind != SymbolKind::Function)
            .map(|s| (s.name.as_str(), s.kind))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("MAX_RETRIES", SymbolKind::Constant),
                ("X", SymbolKind::Constant),
                ("counter", SymbolKind::Global),
            ]
        );
    }

    #[test]
    fn test_global_statement_without_module_assignment() {
        let symbols = extract("def setup():\n    global registry\n    registry = {}\n");
        let summary: Vec<_> = symbols.iter().map(|s| (s.name.as_str(), s.kind, s.start_line)).collect();
        assert_eq!(
            summary,
            vec![("setup", SymbolKind::Function, 1), ("registry", SymbolKind::Global, 2)]
        );
    }

    #[test]
    fn test_global_statement_line_is_not_a_reference() {
        let source = "def setup():\n    global registry\n    registry = {}\n\nsetup()\nprint(registry)\n";
        let parsed = parse_py(source);
        let analyzer = PythonAnalyzer::new();
        let symbols = extract_symbols(&analyzer, &parsed, &ExtractionQuery::all());
        let refs = find_references(&analyzer, &parsed, &symbols);

        let summary: Vec<_> = refs
            .iter()
            .map(|r| (r.symbol.as_str(), r.line, r.usage, r.context.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("registry", 3, UsageKind::PlainReference, Some("setup")),
                ("setup", 5, UsageKind::Call, None),
                ("registry", 6, UsageKind::PlainReference, None),
            ]
        );
    }

    #[test]
    fn test_reference_usages() {
        let definitions = extract("class Calculator:\n    def add(self, a, b):\n        return a + b\n");
        let usage = parse_py(
            "\
from calc import Calculator

class Scientific(Calculator):
    def run(self):
        calc = Calculator()
        return calc.add(1, 2)
",
        );
        let refs = find_references(&PythonAnalyzer::new(), &usage, &definitions);
        let summary: Vec<_> = refs
            .iter()
            .map(|r| (r.symbol.as_str(), r.line, r.usage, r.context.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Calculator", 1, UsageKind::Import, None),
                ("Calculator", 3, UsageKind::Inheritance, None),
                ("Calculator", 5, UsageKind::Instantiation, Some("Scientific.run")),
                ("add", 6, UsageKind::Call, Some("Scientific.run")),
            ]
        );
    }

    #[test]
    fn test_declaring_lines_are_excluded() {
        let source = "MAX = 3\n\ndef grow(n):\n    return n + MAX\n\ngrow(MAX)\n";
        let parsed = parse_py(source);
        let analyzer = PythonAnalyzer::new();
        let symbols = extract_symbols(&analyzer, &parsed, &ExtractionQuery::all());
        let refs = find_references(&analyzer, &parsed, &symbols);

        let lines: Vec<_> = refs.iter().map(|r| (r.symbol.as_str(), r.line)).collect();
        assert_eq!(lines, vec![("MAX", 4), ("MAX", 6), ("grow", 6)]);
    }

    #[test]
    fn test_keyword_arguments_are_not_references() {
        let definitions = extract("def size():\n    return 1\n");
        let usage = parse_py("render(size=3)\n");
        let refs = find_references(&PythonAnalyzer::new(), &usage, &definitions);
        assert!(refs.is_empty());
    }
}
