//! R rule table.
//!
//! The R grammar names binary operator operands `lhs` and `rhs`. Assignment
//! arrows point either way, so the assigned name is whichever side the
//! arrow points at.

use lazy_static::lazy_static;
use regex::Regex;
use tree_sitter::Node;

use crate::analysis::extract::is_excluded_constant_name;
use crate::analysis::{
    Ancestors, ContextFrame, GrammarVariant, Language, LanguageAnalyzer, ParsedFile, RefMatch,
    Symbol, SymbolKind, SymbolSeed, UsageKind,
};

lazy_static! {
    static ref CONSTANT_NAME: Regex = Regex::new(r"^[A-Z][A-Z_0-9.]*$").unwrap();
}

/// Node kinds the R rule table distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RNode {
    BinaryOperator,
    Call,
    FunctionDefinition,
    Other,
}

impl RNode {
    fn classify(kind: &str) -> Self {
        match kind {
            "binary_operator" => RNode::BinaryOperator,
            "call" => RNode::Call,
            "function_definition" => RNode::FunctionDefinition,
            _ => RNode::Other,
        }
    }
}

/// An assignment through one of R's arrows or `=`.
struct Assignment<'t> {
    name: Node<'t>,
    value: Node<'t>,
    superassign: bool,
}

fn assignment<'t>(node: Node<'t>) -> Option<Assignment<'t>> {
    if node.kind() != "binary_operator" {
        return None;
    }
    let operator = node.child_by_field_name("operator")?.kind();
    let lhs = node.child_by_field_name("lhs")?;
    let rhs = node.child_by_field_name("rhs")?;
    let (name, value, superassign) = match operator {
        "<-" | "=" | ":=" => (lhs, rhs, false),
        "<<-" => (lhs, rhs, true),
        "->" => (rhs, lhs, false),
        "->>" => (rhs, lhs, true),
        _ => return None,
    };
    Some(Assignment {
        name,
        value,
        superassign,
    })
}

/// Name assigned by an `assign("name", value)` call.
fn assign_call_name<'p>(node: Node, parsed: &'p ParsedFile) -> Option<&'p str> {
    let function = node.child_by_field_name("function")?;
    if parsed.node_text(function) != "assign" {
        return None;
    }
    let arguments = node.child_by_field_name("arguments")?;
    let mut cursor = arguments.walk();
    let first = arguments
        .named_children(&mut cursor)
        .find(|n| n.kind() == "argument")?;
    let value = first.child_by_field_name("value")?;
    if value.kind() != "string" {
        return None;
    }
    Some(parsed.node_text(value).trim_matches(|c| c == '"' || c == '\''))
}

pub struct RAnalyzer;

impl RAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for RAnalyzer {
    fn language(&self) -> Language {
        Language::R
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["r", "R"]
    }

    fn grammar_variants(&self) -> Vec<GrammarVariant> {
        vec![GrammarVariant::new("r", tree_sitter_r::LANGUAGE)]
    }

    fn symbols_at<'t>(
        &self,
        node: Node<'t>,
        ancestors: Ancestors<'_, 't>,
        parsed: &ParsedFile,
        out: &mut Vec<SymbolSeed>,
    ) {
        match RNode::classify(node.kind()) {
            RNode::BinaryOperator => {
                let Some(assign) = assignment(node) else {
                    return;
                };
                if assign.name.kind() != "identifier" {
                    return;
                }
                let name = parsed.node_text(assign.name);

                if assign.value.kind() == "function_definition" {
                    out.push(SymbolSeed::new(name, SymbolKind::Function, node));
                } else if assign.superassign {
                    out.push(SymbolSeed::new(name, SymbolKind::Global, node));
                } else if CONSTANT_NAME.is_match(name)
                    && !is_excluded_constant_name(name)
                    && !ancestors.any_of(&["function_definition"])
                {
                    out.push(SymbolSeed::new(name, SymbolKind::Constant, node));
                }
            }
            RNode::Call => {
                if let Some(name) = assign_call_name(node, parsed) {
                    out.push(SymbolSeed::new(name, SymbolKind::Global, node));
                }
            }
            RNode::FunctionDefinition | RNode::Other => {}
        }
    }

    fn is_scope_boundary(&self, node: Node) -> bool {
        node.kind() == "function_definition"
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
        let call_usage = if target.kind.is_constructible() {
            UsageKind::Instantiation
        } else {
            UsageKind::Call
        };

        if let Some(assign) = assignment(parent).filter(|a| a.name == node) {
            let top_level = !ancestors.any_of(&["function_definition"]);
            return if top_level || assign.superassign {
                RefMatch::Declaration
            } else {
                RefMatch::Use(UsageKind::PlainReference)
            };
        }

        match parent.kind() {
            "call" if parent.child_by_field_name("function") == Some(node) => {
                RefMatch::Use(call_usage)
            }
            "namespace_operator" if parent.child_by_field_name("rhs") == Some(node) => {
                match ancestors.grandparent() {
                    Some(g) if g.kind() == "call" && g.child_by_field_name("function") == Some(parent) => {
                        RefMatch::Use(call_usage)
                    }
                    _ => RefMatch::Use(UsageKind::PlainReference),
                }
            }
            "argument" if parent.child_by_field_name("name") == Some(node) => RefMatch::Ignore,
            "parameter" if parent.child_by_field_name("name") == Some(node) => RefMatch::Ignore,
            _ => RefMatch::Use(UsageKind::PlainReference),
        }
    }

    fn context_frame(&self, node: Node, outer: Option<Node>, parsed: &ParsedFile) -> Option<ContextFrame> {
        if RNode::classify(node.kind()) != RNode::FunctionDefinition {
            return None;
        }
        let assign = outer.and_then(assignment).filter(|a| a.value == node)?;
        Some(ContextFrame::Function(parsed.node_text(assign.name).to_string()))
    }
}
