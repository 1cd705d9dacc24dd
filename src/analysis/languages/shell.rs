//! Bash rule table.

use tree_sitter::Node;

use crate::analysis::extract::is_excluded_constant_name;
use crate::analysis::{
    Ancestors, ContextFrame, GrammarVariant, Language, LanguageAnalyzer, ParsedFile, RefMatch,
    Symbol, SymbolKind, SymbolSeed, UsageKind,
};

/// Node kinds the shell rule table distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShNode {
    Function,
    Declaration,
    Other,
}

impl ShNode {
    fn classify(kind: &str) -> Self {
        match kind {
            "function_definition" => ShNode::Function,
            "declaration_command" => ShNode::Declaration,
            _ => ShNode::Other,
        }
    }
}

/// What a declaration command makes of the names it declares.
fn declared_kind(node: Node, parsed: &ParsedFile) -> Option<SymbolKind> {
    let keyword = node.child(0).map(|c| c.kind())?;
    let mut cursor = node.walk();
    let flags: Vec<&str> = node
        .named_children(&mut cursor)
        .filter(|n| n.kind() == "word")
        .map(|n| parsed.node_text(n))
        .filter(|t| t.starts_with('-'))
        .collect();
    let has_flag = |flag: char| flags.iter().any(|f| f.contains(flag));

    match keyword {
        "readonly" => Some(SymbolKind::Constant),
        "export" => Some(SymbolKind::Global),
        "declare" | "typeset" if has_flag('r') => Some(SymbolKind::Constant),
        "declare" | "typeset" if has_flag('x') || has_flag('g') => Some(SymbolKind::Global),
        _ => None,
    }
}

pub struct ShellAnalyzer;

impl ShellAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ShellAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for ShellAnalyzer {
    fn language(&self) -> Language {
        Language::Shell
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["sh", "bash", "zsh"]
    }

    fn grammar_variants(&self) -> Vec<GrammarVariant> {
        vec![GrammarVariant::new("bash", tree_sitter_bash::LANGUAGE)]
    }

    fn symbols_at<'t>(
        &self,
        node: Node<'t>,
        ancestors: Ancestors<'_, 't>,
        parsed: &ParsedFile,
        out: &mut Vec<SymbolSeed>,
    ) {
        match ShNode::classify(node.kind()) {
            ShNode::Function => {
                if let Some(name) = parsed.field_text(node, "name") {
                    out.push(SymbolSeed::new(name, SymbolKind::Function, node));
                }
            }
            ShNode::Declaration => {
                let Some(kind) = declared_kind(node, parsed) else {
                    return;
                };
                if kind == SymbolKind::Constant && ancestors.any_of(&["function_definition"]) {
                    return;
                }

                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    let name_node = match child.kind() {
                        "variable_assignment" => child.child_by_field_name("name"),
                        "variable_name" => Some(child),
                        _ => None,
                    };
                    let Some(name) = name_node.map(|n| parsed.node_text(n)) else {
                        continue;
                    };
                    if kind == SymbolKind::Constant && is_excluded_constant_name(name) {
                        continue;
                    }
                    out.push(SymbolSeed::new(name, kind, node));
                }
            }
            ShNode::Other => {}
        }
    }

    fn is_scope_boundary(&self, node: Node) -> bool {
        node.kind() == "function_definition"
    }

    fn is_name_node(&self, kind: &str) -> bool {
        matches!(kind, "word" | "variable_name")
    }

    fn classify_reference<'t>(
        &self,
        node: Node<'t>,
        ancestors: Ancestors<'_, 't>,
        _parsed: &ParsedFile,
        _target: &Symbol,
    ) -> RefMatch {
        let Some(parent) = ancestors.parent() else {
            return RefMatch::Ignore;
        };

        match (node.kind(), parent.kind()) {
            (_, "function_definition") if parent.child_by_field_name("name") == Some(node) => {
                RefMatch::Declaration
            }
            ("word", "command_name") => RefMatch::Use(UsageKind::Call),
            // Plain words are arguments and string fragments.
            ("word", _) => RefMatch::Ignore,
            (_, "declaration_command") => RefMatch::Declaration,
            (_, "variable_assignment") if parent.child_by_field_name("name") == Some(node) => {
                match ancestors.grandparent() {
                    Some(g) if g.kind() == "declaration_command" => RefMatch::Declaration,
                    _ => RefMatch::Use(UsageKind::PlainReference),
                }
            }
            _ => RefMatch::Use(UsageKind::PlainReference),
        }
    }

    fn context_frame(&self, node: Node, _outer: Option<Node>, parsed: &ParsedFile) -> Option<ContextFrame> {
        match ShNode::classify(node.kind()) {
            ShNode::Function => parsed
                .field_text(node, "name")
                .map(|name| ContextFrame::Function(name.to_string())),
            _ => None,
        }
    }
}
