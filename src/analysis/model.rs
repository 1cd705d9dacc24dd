//! The language-agnostic symbol model shared by extractors and matchers.

use std::fmt;
use std::path::Path;

use phf::phf_map;
use serde::{Deserialize, Serialize};

/// Languages with a rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
    Shell,
    PowerShell,
    R,
}

/// File extension (without dot) to language.
static EXTENSIONS: phf::Map<&'static str, Language> = phf_map! {
    "js" => Language::JavaScript,
    "jsx" => Language::JavaScript,
    "mjs" => Language::JavaScript,
    "cjs" => Language::JavaScript,
    "ts" => Language::TypeScript,
    "tsx" => Language::TypeScript,
    "mts" => Language::TypeScript,
    "cts" => Language::TypeScript,
    "py" => Language::Python,
    "pyw" => Language::Python,
    "sh" => Language::Shell,
    "bash" => Language::Shell,
    "zsh" => Language::Shell,
    "ps1" => Language::PowerShell,
    "psm1" => Language::PowerShell,
    "psd1" => Language::PowerShell,
    "r" => Language::R,
    "R" => Language::R,
};

impl Language {
    /// Language identifier used on the wire and in config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Shell => "shell",
            Language::PowerShell => "powershell",
            Language::R => "r",
        }
    }

    /// Parse a language identifier (as produced by `as_str`, plus common aliases).
    pub fn from_id(id: &str) -> Option<Self> {
        match id.to_ascii_lowercase().as_str() {
            "javascript" | "js" => Some(Language::JavaScript),
            "typescript" | "ts" => Some(Language::TypeScript),
            "python" | "py" => Some(Language::Python),
            "shell" | "bash" | "sh" => Some(Language::Shell),
            "powershell" | "ps1" | "pwsh" => Some(Language::PowerShell),
            "r" => Some(Language::R),
            _ => None,
        }
    }

    /// Resolve a language from a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        EXTENSIONS
            .get(ext)
            .or_else(|| EXTENSIONS.get(ext.to_ascii_lowercase().as_str()))
            .copied()
    }

    /// Resolve a language from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Languages that share a rule table and therefore reference each other.
    pub fn family(&self) -> Language {
        match self {
            Language::TypeScript => Language::JavaScript,
            other => *other,
        }
    }

    /// Whether identifiers in this language compare case-insensitively.
    pub fn case_insensitive(&self) -> bool {
        matches!(self, Language::PowerShell)
    }

    /// All known languages.
    pub fn all() -> &'static [Language] {
        &[
            Language::JavaScript,
            Language::TypeScript,
            Language::Python,
            Language::Shell,
            Language::PowerShell,
            Language::R,
        ]
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of named code element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Class,
    Function,
    Method,
    Constant,
    Global,
    Export,
    Interface,
    Field,
    Constructor,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Constant => "constant",
            SymbolKind::Global => "global",
            SymbolKind::Export => "export",
            SymbolKind::Interface => "interface",
            SymbolKind::Field => "field",
            SymbolKind::Constructor => "constructor",
        }
    }

    /// Parse a kind name. Case-insensitive; plural forms are accepted.
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        Self::lookup(&lower)
            .or_else(|| lower.strip_suffix("es").and_then(Self::lookup))
            .or_else(|| lower.strip_suffix('s').and_then(Self::lookup))
    }

    fn lookup(name: &str) -> Option<Self> {
        match name {
            "class" => Some(SymbolKind::Class),
            "function" | "func" => Some(SymbolKind::Function),
            "method" => Some(SymbolKind::Method),
            "constant" | "const" => Some(SymbolKind::Constant),
            "global" => Some(SymbolKind::Global),
            "export" => Some(SymbolKind::Export),
            "interface" => Some(SymbolKind::Interface),
            "field" => Some(SymbolKind::Field),
            "constructor" => Some(SymbolKind::Constructor),
            _ => None,
        }
    }

    /// Kinds kept by containment pruning even when nested in another symbol.
    ///
    /// A global binds at module scope wherever its declaring statement sits.
    pub fn survives_containment(&self) -> bool {
        matches!(self, SymbolKind::Method | SymbolKind::Export | SymbolKind::Global)
    }

    /// Whether a call to a symbol of this kind constructs an object.
    pub fn is_constructible(&self) -> bool {
        matches!(self, SymbolKind::Class)
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named, typed code element with a source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// First line of the declaration (1-indexed).
    pub start_line: usize,
    /// Last line of the declaration (1-indexed, inclusive).
    pub end_line: usize,
    pub language: Language,
    /// Enclosing class for methods.
    pub parent: Option<String>,
    /// Base class, when the declaration names one.
    pub extends: Option<String>,
    /// Byte span, used for containment pruning.
    pub start_byte: usize,
    pub end_byte: usize,
    /// Not nested inside any class or function.
    pub top_level: bool,
}

impl Symbol {
    /// Grouping identity across snapshots.
    pub fn identity(&self) -> SymbolIdentity {
        SymbolIdentity {
            name: self.name.clone(),
            kind: self.kind,
        }
    }

    /// Name without any `Parent.` prefix added by context preservation.
    pub fn bare_name(&self) -> &str {
        match &self.parent {
            Some(parent) => self
                .name
                .strip_prefix(parent.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
                .unwrap_or(&self.name),
            None => &self.name,
        }
    }

    /// Number of lines the declaration spans.
    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    /// Whether this symbol's byte span lies inside `other`'s.
    pub fn is_contained_in(&self, other: &Symbol) -> bool {
        let same_span = self.start_byte == other.start_byte && self.end_byte == other.end_byte;
        !same_span && other.start_byte <= self.start_byte && self.end_byte <= other.end_byte
    }

    /// Source text of the declaration, cut from `source` by line span.
    pub fn content<'a>(&self, source: &'a str) -> String {
        source
            .lines()
            .skip(self.start_line.saturating_sub(1))
            .take(self.line_count())
            .collect::<Vec<&'a str>>()
            .join("\n")
    }
}

/// `(name, kind)` pair used to group one symbol across history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolIdentity {
    pub name: String,
    pub kind: SymbolKind,
}

impl fmt::Display for SymbolIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// How a reference uses its symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UsageKind {
    #[serde(rename = "call")]
    Call,
    #[serde(rename = "instantiation")]
    Instantiation,
    #[serde(rename = "import")]
    Import,
    #[serde(rename = "inheritance")]
    Inheritance,
    #[serde(rename = "reference")]
    PlainReference,
}

impl UsageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageKind::Call => "call",
            UsageKind::Instantiation => "instantiation",
            UsageKind::Import => "import",
            UsageKind::Inheritance => "inheritance",
            UsageKind::PlainReference => "reference",
        }
    }
}

impl fmt::Display for UsageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A use (never the declaration) of a named symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub symbol: String,
    pub line: usize,
    /// `Class.method` or `function` enclosing the use; absent at module level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub usage: UsageKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(name: &str, start: usize, end: usize) -> Symbol {
        Symbol {
            name: name.to_string(),
            kind: SymbolKind::Function,
            start_line: 1,
            end_line: 1,
            language: Language::JavaScript,
            parent: None,
            extends: None,
            start_byte: start,
            end_byte: end,
            top_level: true,
        }
    }

    #[test]
    fn test_language_from_extension() {
        assert_eq!(Language::from_extension("js"), Some(Language::JavaScript));
        assert_eq!(Language::from_extension("R"), Some(Language::R));
        assert_eq!(Language::from_extension("PS1"), Some(Language::PowerShell));
        assert_eq!(Language::from_extension("go"), None);
        assert_eq!(Language::TypeScript.family(), Language::JavaScript);
    }

    #[test]
    fn test_kind_parse_accepts_plurals() {
        assert_eq!(SymbolKind::parse("Classes"), Some(SymbolKind::Class));
        assert_eq!(SymbolKind::parse("methods"), Some(SymbolKind::Method));
        assert_eq!(SymbolKind::parse("CONSTANT"), Some(SymbolKind::Constant));
        assert_eq!(SymbolKind::parse("globals"), Some(SymbolKind::Global));
        assert_eq!(SymbolKind::parse("widget"), None);
    }

    #[test]
    fn test_containment() {
        let outer = symbol("outer", 0, 100);
        let inner = symbol("inner", 10, 20);
        let twin = symbol("twin", 0, 100);
        assert!(inner.is_contained_in(&outer));
        assert!(!outer.is_contained_in(&inner));
        assert!(!twin.is_contained_in(&outer));
    }

    #[test]
    fn test_bare_name_strips_parent() {
        let mut s = symbol("Foo.bar", 0, 1);
        s.parent = Some("Foo".to_string());
        assert_eq!(s.bare_name(), "bar");
    }

    #[test]
    fn test_content_by_lines() {
        let mut s = symbol("f", 0, 1);
        s.start_line = 2;
        s.end_line = 3;
        assert_eq!(s.content("a\nb\nc\nd"), "b\nc");
        assert_eq!(s.line_count(), 2);
    }
}
