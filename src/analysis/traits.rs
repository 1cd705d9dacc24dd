//! Core traits for language analysis.

use tree_sitter::Node;

use super::{Ancestors, Language, Symbol, SymbolKind, UsageKind};

/// Holds a parsed tree-sitter tree and associated metadata.
///
/// This is kept separate from the extracted symbols so one parse can serve
/// both extraction and reference matching.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: tree_sitter::Tree,
    /// The original source code (kept for node text extraction).
    pub source: Vec<u8>,
    /// The file path (for error reporting).
    pub path: String,
    pub language: Language,
    /// Name of the grammar variant that produced the tree.
    pub grammar: &'static str,
    /// True when the tree contains error nodes that were tolerated.
    pub recovered: bool,
}

impl ParsedFile {
    /// Get the source code as a string slice.
    pub fn source_str(&self) -> &str {
        std::str::from_utf8(&self.source).unwrap_or("")
    }

    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }

    /// Text of the named field child, if present.
    pub fn field_text(&self, node: Node, field: &str) -> Option<&str> {
        node.child_by_field_name(field).map(|n| self.node_text(n))
    }
}

/// One grammar configuration to try when parsing.
#[derive(Clone)]
pub struct GrammarVariant {
    pub name: &'static str,
    pub language: tree_sitter::Language,
}

impl GrammarVariant {
    pub fn new(name: &'static str, language: impl Into<tree_sitter::Language>) -> Self {
        Self {
            name,
            language: language.into(),
        }
    }
}

/// A symbol as emitted by a rule table, before the driver adds language and scope.
#[derive(Debug, Clone)]
pub struct SymbolSeed {
    pub name: String,
    pub kind: SymbolKind,
    pub start_line: usize,
    pub end_line: usize,
    pub start_byte: usize,
    pub end_byte: usize,
    pub parent: Option<String>,
    pub extends: Option<String>,
}

impl SymbolSeed {
    /// Seed spanning `node`.
    pub fn new(name: impl Into<String>, kind: SymbolKind, node: Node) -> Self {
        Self {
            name: name.into(),
            kind,
            start_line: node.start_position().row + 1,
            end_line: node.end_position().row + 1,
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            parent: None,
            extends: None,
        }
    }

    pub fn with_parent(mut self, parent: Option<String>) -> Self {
        self.parent = parent;
        self
    }

    pub fn with_extends(mut self, extends: Option<String>) -> Self {
        self.extends = extends;
        self
    }

    /// Finish the seed into a symbol.
    pub fn into_symbol(self, language: Language, top_level: bool) -> Symbol {
        Symbol {
            name: self.name,
            kind: self.kind,
            start_line: self.start_line,
            end_line: self.end_line,
            language,
            parent: self.parent,
            extends: self.extends,
            start_byte: self.start_byte,
            end_byte: self.end_byte,
            top_level,
        }
    }
}

/// Verdict of a rule table for a name node that equals a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefMatch {
    /// The node is the declaring occurrence of the name.
    Declaration,
    /// The node uses the name.
    Use(UsageKind),
    /// The node only looks like the name (e.g. a string or keyword argument).
    Ignore,
}

/// A frame contributing to a reference's containing context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextFrame {
    Function(String),
    Class(String),
}

/// Language-specific rule table.
///
/// Each language implements this trait with an exhaustive match over its own
/// node-kind enum. The shared drivers in `extract` and `references` do the
/// walking, pruning and filtering.
///
/// # Thread Safety
///
/// Note: tree_sitter::Parser is not Sync, so parsers are created per call
/// from the variants returned here.
pub trait LanguageAnalyzer: Send + Sync {
    /// The language this analyzer was configured for.
    fn language(&self) -> Language;

    /// Returns file extensions this analyzer handles (without dot).
    fn file_extensions(&self) -> &'static [&'static str];

    /// Grammar configurations in the order they should be tried.
    fn grammar_variants(&self) -> Vec<GrammarVariant>;

    /// Emit the symbols declared by `node`, if any.
    fn symbols_at<'t>(
        &self,
        node: Node<'t>,
        ancestors: Ancestors<'_, 't>,
        parsed: &ParsedFile,
        out: &mut Vec<SymbolSeed>,
    );

    /// Whether `node` opens a class or function scope.
    fn is_scope_boundary(&self, node: Node) -> bool;

    /// Whether nodes of this kind carry a name that can refer to a symbol.
    fn is_name_node(&self, kind: &str) -> bool;

    /// The name carried by a name node. Defaults to the node's text.
    fn name_of<'p>(&self, node: Node, parsed: &'p ParsedFile) -> &'p str {
        parsed.node_text(node)
    }

    /// Classify a name node whose text equals `target`'s name.
    fn classify_reference<'t>(
        &self,
        node: Node<'t>,
        ancestors: Ancestors<'_, 't>,
        parsed: &ParsedFile,
        target: &Symbol,
    ) -> RefMatch;

    /// What `node` contributes to a containing context, if anything.
    /// `outer` is the node enclosing `node`.
    fn context_frame(&self, node: Node, outer: Option<Node>, parsed: &ParsedFile)
        -> Option<ContextFrame>;

    /// Tree-sitter query whose `@name` captures are import bindings.
    fn import_query(&self) -> Option<&'static str> {
        None
    }

    /// Check if this analyzer handles the given file extension.
    fn handles_extension(&self, ext: &str) -> bool {
        self.file_extensions().contains(&ext)
    }
}
