//! PowerShell rule table.
//!
//! PowerShell identifiers compare case-insensitively; the reference driver
//! folds case for this language, and the rules here compare keywords and
//! cmdlet names the same way.

use lazy_static::lazy_static;
use regex::Regex;
use tree_sitter::Node;

use crate::analysis::extract::is_excluded_constant_name;
use crate::analysis::{
    Ancestors, ContextFrame, GrammarVariant, Language, LanguageAnalyzer, ParsedFile, RefMatch,
    Symbol, SymbolKind, SymbolSeed, UsageKind,
};

const SCOPE_KINDS: &[&str] = &[
    "function_statement",
    "class_statement",
    "class_method_definition",
    "method_definition",
];

const METHOD_KINDS: &[&str] = &["class_method_definition", "method_definition"];

const SCOPE_PREFIXES: &[&str] = &["global:", "script:", "local:", "private:", "env:"];

lazy_static! {
    static ref READ_ONLY_OPTION: Regex =
        Regex::new(r#"(?i)-Option\s+['"]?[\w,\s]*\b(ReadOnly|Constant)\b"#).unwrap();
    static ref NAME_ARGUMENT: Regex = Regex::new(r#"(?i)-Name\s+['"]?([A-Za-z_][\w]*)"#).unwrap();
}

/// Node kinds the PowerShell rule table distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PsNode {
    Function,
    Class,
    Method,
    Command,
    Assignment,
    Other,
}

impl PsNode {
    fn classify(kind: &str) -> Self {
        match kind {
            "function_statement" => PsNode::Function,
            "class_statement" => PsNode::Class,
            "class_method_definition" | "method_definition" => PsNode::Method,
            "command" => PsNode::Command,
            "assignment_expression" => PsNode::Assignment,
            _ => PsNode::Other,
        }
    }
}

fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|n| n.kind() == kind);
    found
}

fn children_of_kind<'t>(node: Node<'t>, kind: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).filter(|n| n.kind() == kind).collect()
}

/// `$global:Name` → `Name`; `${Name}` → `Name`.
fn variable_name(text: &str) -> &str {
    let bare = text.trim_start_matches('$').trim_start_matches('{').trim_end_matches('}');
    SCOPE_PREFIXES
        .iter()
        .find_map(|p| {
            bare.get(..p.len())
                .filter(|head| head.eq_ignore_ascii_case(p))
                .map(|_| &bare[p.len()..])
        })
        .unwrap_or(bare)
}

/// Whether a variable is explicitly scoped global or script-wide.
fn is_global_variable(text: &str) -> bool {
    let bare = text.trim_start_matches('$').trim_start_matches('{');
    ["global:", "script:"].iter().any(|p| {
        bare.get(..p.len()).is_some_and(|head| head.eq_ignore_ascii_case(p))
    })
}

pub struct PowerShellAnalyzer;

impl PowerShellAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn function_name<'p>(node: Node, parsed: &'p ParsedFile) -> Option<&'p str> {
        parsed
            .field_text(node, "name")
            .or_else(|| child_of_kind(node, "function_name").map(|n| parsed.node_text(n)))
    }

    fn class_name<'p>(node: Node, parsed: &'p ParsedFile) -> Option<&'p str> {
        parsed
            .field_text(node, "name")
            .or_else(|| child_of_kind(node, "simple_name").map(|n| parsed.node_text(n)))
    }

    fn base_class(node: Node, parsed: &ParsedFile) -> Option<String> {
        node.child_by_field_name("base_class")
            .or_else(|| children_of_kind(node, "simple_name").into_iter().nth(1))
            .map(|n| parsed.node_text(n).to_string())
    }

    fn method_name<'p>(node: Node, parsed: &'p ParsedFile) -> Option<&'p str> {
        parsed
            .field_text(node, "name")
            .or_else(|| child_of_kind(node, "simple_name").map(|n| parsed.node_text(n)))
    }

    fn command_name<'p>(node: Node, parsed: &'p ParsedFile) -> Option<&'p str> {
        node.child_by_field_name("command_name")
            .or_else(|| child_of_kind(node, "command_name"))
            .map(|n| parsed.node_text(n))
    }

    /// Name declared read-only by a `Set-Variable`/`New-Variable` command.
    fn read_only_variable(node: Node, parsed: &ParsedFile) -> Option<String> {
        let command = Self::command_name(node, parsed)?;
        let declares = command.eq_ignore_ascii_case("Set-Variable")
            || command.eq_ignore_ascii_case("New-Variable");
        let text = parsed.node_text(node);
        if !declares || !READ_ONLY_OPTION.is_match(text) {
            return None;
        }

        if let Some(caps) = NAME_ARGUMENT.captures(text) {
            return Some(caps[1].to_string());
        }
        // Positional form: the first argument that is not a flag or a flag's value.
        let mut tokens = text.split_whitespace().skip(1);
        while let Some(token) = tokens.next() {
            if token.starts_with('-') {
                tokens.next();
                continue;
            }
            return Some(token.trim_matches(|c| c == '"' || c == '\'').to_string());
        }
        None
    }

    fn is_variable_declarer(command: &str) -> bool {
        ["Set-Variable", "New-Variable"]
            .iter()
            .any(|c| command.eq_ignore_ascii_case(c))
    }
}

impl Default for PowerShellAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for PowerShellAnalyzer {
    fn language(&self) -> Language {
        Language::PowerShell
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["ps1", "psm1", "psd1"]
    }

    fn grammar_variants(&self) -> Vec<GrammarVariant> {
        vec![GrammarVariant::new("powershell", tree_sitter_powershell::LANGUAGE)]
    }

    fn symbols_at<'t>(
        &self,
        node: Node<'t>,
        ancestors: Ancestors<'_, 't>,
        parsed: &ParsedFile,
        out: &mut Vec<SymbolSeed>,
    ) {
        match PsNode::classify(node.kind()) {
            PsNode::Function => {
                if let Some(name) = Self::function_name(node, parsed) {
                    out.push(SymbolSeed::new(name, SymbolKind::Function, node));
                }
            }
            PsNode::Class => {
                if let Some(name) = Self::class_name(node, parsed) {
                    out.push(
                        SymbolSeed::new(name, SymbolKind::Class, node)
                            .with_extends(Self::base_class(node, parsed)),
                    );
                }
            }
            PsNode::Method => {
                if let Some(name) = Self::method_name(node, parsed) {
                    let parent = ancestors
                        .nearest(&["class_statement"])
                        .and_then(|c| Self::class_name(c, parsed))
                        .map(str::to_string);
                    out.push(SymbolSeed::new(name, SymbolKind::Method, node).with_parent(parent));
                }
            }
            PsNode::Command => {
                if ancestors.any_of(SCOPE_KINDS) {
                    return;
                }
                if let Some(name) = Self::read_only_variable(node, parsed) {
                    if !is_excluded_constant_name(&name) {
                        out.push(SymbolSeed::new(name, SymbolKind::Constant, node));
                    }
                }
            }
            PsNode::Assignment => {
                let Some(left) = node.named_child(0) else {
                    return;
                };
                let text = parsed.node_text(left).trim();
                if text.starts_with('$') && is_global_variable(text) {
                    out.push(SymbolSeed::new(variable_name(text), SymbolKind::Global, node));
                }
            }
            PsNode::Other => {}
        }
    }

    fn is_scope_boundary(&self, node: Node) -> bool {
        SCOPE_KINDS.contains(&node.kind())
    }

    fn is_name_node(&self, kind: &str) -> bool {
        matches!(
            kind,
            "function_name"
                | "command_name"
                | "simple_name"
                | "variable"
                | "type_name"
                | "type_identifier"
                | "generic_token"
        )
    }

    fn name_of<'p>(&self, node: Node, parsed: &'p ParsedFile) -> &'p str {
        let text = parsed.node_text(node);
        match node.kind() {
            "variable" => variable_name(text),
            "generic_token" => text.trim_matches(|c| c == '"' || c == '\''),
            _ => text,
        }
    }

    fn classify_reference<'t>(
        &self,
        node: Node<'t>,
        ancestors: Ancestors<'_, 't>,
        parsed: &ParsedFile,
        target: &Symbol,
    ) -> RefMatch {
        let parent = ancestors.parent();
        let parent_kind = parent.map(|p| p.kind()).unwrap_or_default();
        let top_level = !ancestors.any_of(SCOPE_KINDS);

        match node.kind() {
            "function_name" => RefMatch::Declaration,
            "command_name" => RefMatch::Use(UsageKind::Call),
            "simple_name" => match (parent_kind, parent) {
                ("class_statement", Some(class)) => {
                    if child_of_kind(class, "simple_name") == Some(node) {
                        RefMatch::Declaration
                    } else {
                        RefMatch::Use(UsageKind::Inheritance)
                    }
                }
                (kind, _) if METHOD_KINDS.contains(&kind) => RefMatch::Declaration,
                ("member_name", _) => match ancestors.grandparent().map(|g| g.kind()) {
                    Some("invokation_expression") => RefMatch::Use(UsageKind::Call),
                    _ => RefMatch::Use(UsageKind::PlainReference),
                },
                _ => RefMatch::Use(UsageKind::PlainReference),
            },
            "type_name" | "type_identifier" => {
                let constructs = ancestors.iter().take(6).any(|a| {
                    a.kind() == "invokation_expression"
                        && child_of_kind(a, "member_name")
                            .is_some_and(|m| parsed.node_text(m).eq_ignore_ascii_case("new"))
                });
                if constructs {
                    RefMatch::Use(UsageKind::Instantiation)
                } else if ancestors.any_of(&["class_statement"]) && !ancestors.any_of(METHOD_KINDS) {
                    RefMatch::Use(UsageKind::Inheritance)
                } else {
                    RefMatch::Use(UsageKind::PlainReference)
                }
            }
            "generic_token" => {
                let command = ancestors
                    .nearest(&["command"])
                    .and_then(|c| Self::command_name(c, parsed));
                match command {
                    Some(c) if c.eq_ignore_ascii_case("New-Object") => {
                        RefMatch::Use(UsageKind::Instantiation)
                    }
                    Some(c) if Self::is_variable_declarer(c) && top_level => RefMatch::Declaration,
                    _ => RefMatch::Ignore,
                }
            }
            "variable" => {
                let assigned = ancestors
                    .nearest(&["assignment_expression"])
                    .and_then(|a| child_of_kind(a, "left_assignment_expression").or_else(|| a.named_child(0)))
                    .is_some_and(|l| l.start_byte() <= node.start_byte() && node.end_byte() <= l.end_byte());
                let declares = matches!(target.kind, SymbolKind::Global | SymbolKind::Constant);
                if assigned && declares && (top_level || is_global_variable(parsed.node_text(node))) {
                    RefMatch::Declaration
                } else {
                    RefMatch::Use(UsageKind::PlainReference)
                }
            }
            _ => RefMatch::Use(UsageKind::PlainReference),
        }
    }

    fn context_frame(&self, node: Node, _outer: Option<Node>, parsed: &ParsedFile) -> Option<ContextFrame> {
        match PsNode::classify(node.kind()) {
            PsNode::Function => Self::function_name(node, parsed)
                .map(|n| ContextFrame::Function(n.to_string())),
            PsNode::Method => Self::method_name(node, parsed)
                .map(|n| ContextFrame::Function(n.to_string())),
            PsNode::Class => Self::class_name(node, parsed).map(|n| ContextFrame::Class(n.to_string())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::parse::{parse_source, DEFAULT_ERROR_TOLERANCE};
    use crate::analysis::{extract_symbols, find_references, ExtractionQuery, SourceModel};

    fn parse_ps(source: &str) -> ParsedFile {
        match parse_source(&PowerShellAnalyzer::new(), "build.ps1", source.as_bytes(), DEFAULT_ERROR_TOLERANCE) {
            SourceModel::Syntax(parsed) => parsed,
            SourceModel::Heuristic(raw) => panic!("unexpected heuristic fallback: {}", raw.reason),
        }
    }

    #[test]
    fn test_variable_name_strips_scope() {
        assert_eq!(variable_name("$global:Config"), "Config");
        assert_eq!(variable_name("$Script:cache"), "cache");
        assert_eq!(variable_name("${Name}"), "Name");
        assert_eq!(variable_name("$plain"), "plain");
        assert!(is_global_variable("$GLOBAL:Config"));
        assert!(!is_global_variable("$local:x"));
    }

    #[test]
    fn test_functions_are_symbols() {
        let source = "function Get-Greeting {\n    param($Name)\n    \"Hello $Name\"\n}\n\nfunction Invoke-Build {\n    Get-Greeting -Name 'x'\n}\n";
        let parsed = parse_ps(source);
        let analyzer = PowerShellAnalyzer::new();
        let symbols = extract_symbols(&analyzer, &parsed, &ExtractionQuery::for_kinds(&[SymbolKind::Function]));

        let names: Vec<_> = symbols.iter().map(|s| (s.name.as_str(), s.start_line)).collect();
        assert_eq!(names, vec![("Get-Greeting", 1), ("Invoke-Build", 6)]);
    }

    #[test]
    fn test_command_call_is_case_insensitive() {
        let analyzer = PowerShellAnalyzer::new();
        let definitions = extract_symbols(
            &analyzer,
            &parse_ps("function Get-Greeting {\n    'hi'\n}\n"),
            &ExtractionQuery::all(),
        );
        let usage = parse_ps("function Invoke-Build {\n    get-greeting\n}\n");
        let refs = find_references(&analyzer, &usage, &definitions);

        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].symbol, "Get-Greeting");
        assert_eq!(refs[0].line, 2);
        assert_eq!(refs[0].usage, UsageKind::Call);
        assert_eq!(refs[0].context.as_deref(), Some("Invoke-Build"));
    }

    #[test]
    fn test_class_with_base_and_methods() {
        let source = "class Circle : Shape {\n    [double] Area() {\n        return 1\n    }\n}\n";
        let symbols = extract_symbols(&PowerShellAnalyzer::new(), &parse_ps(source), &ExtractionQuery::all());

        let class = symbols
            .iter()
            .find(|s| s.kind == SymbolKind::Class)
            .expect("class should be extracted");
        assert_eq!(class.name, "Circle");
        assert_eq!(class.extends.as_deref(), Some("Shape"));
        assert_eq!((class.start_line, class.end_line), (1, 5));

        let method = symbols
            .iter()
            .find(|s| s.kind == SymbolKind::Method)
            .expect("method should survive inside its class");
        assert_eq!(method.name, "Area");
        assert_eq!(method.parent.as_deref(), Some("Circle"));
        assert_eq!(method.start_line, 2);
    }

    #[test]
    fn test_read_only_constants_and_scoped_globals() {
        let source = "Set-Variable -Name MAX_SIZE -Value 100 -Option ReadOnly\n$global:AppConfig = @{}\n$script:Cache = 0\n$local = 1\n";
        let symbols = extract_symbols(&PowerShellAnalyzer::new(), &parse_ps(source), &ExtractionQuery::all());

        let summary: Vec<_> = symbols.iter().map(|s| (s.name.as_str(), s.kind, s.start_line)).collect();
        assert_eq!(
            summary,
            vec![
                ("MAX_SIZE", SymbolKind::Constant, 1),
                ("AppConfig", SymbolKind::Global, 2),
                ("Cache", SymbolKind::Global, 3),
            ]
        );
    }

    #[test]
    fn test_global_and_constant_declaring_lines_are_excluded() {
        let source = "$global:AppConfig = @{}\nSet-Variable -Name MAX_SIZE -Value 10 -Option ReadOnly\nWrite-Host $AppConfig $MAX_SIZE\n";
        let parsed = parse_ps(source);
        let analyzer = PowerShellAnalyzer::new();
        let symbols = extract_symbols(&analyzer, &parsed, &ExtractionQuery::all());
        assert!(symbols.iter().any(|s| s.name == "AppConfig" && s.kind == SymbolKind::Global && s.start_line == 1));
        assert!(symbols.iter().any(|s| s.name == "MAX_SIZE" && s.kind == SymbolKind::Constant && s.start_line == 2));

        let refs = find_references(&analyzer, &parsed, &symbols);
        let found: Vec<_> = refs.iter().map(|r| (r.symbol.as_str(), r.line, r.usage)).collect();
        assert_eq!(
            found,
            vec![
                ("AppConfig", 3, UsageKind::PlainReference),
                ("MAX_SIZE", 3, UsageKind::PlainReference),
            ]
        );
    }

    #[test]
    fn test_instantiation_and_inheritance_references() {
        let analyzer = PowerShellAnalyzer::new();
        let definitions = extract_symbols(
            &analyzer,
            &parse_ps("class Shape {\n}\n"),
            &ExtractionQuery::for_kinds(&[SymbolKind::Class]),
        );
        let usage = parse_ps("$a = [Shape]::new()\n$b = New-Object Shape\nclass Square : Shape {\n}\n");
        let refs = find_references(&analyzer, &usage, &definitions);

        let found: Vec<_> = refs.iter().map(|r| (r.symbol.as_str(), r.line, r.usage)).collect();
        assert_eq!(
            found,
            vec![
                ("Shape", 1, UsageKind::Instantiation),
                ("Shape", 2, UsageKind::Instantiation),
                ("Shape", 3, UsageKind::Inheritance),
            ]
        );
    }
}
