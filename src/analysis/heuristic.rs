//! Best-effort regex extraction for sources no grammar could parse.
//!
//! Fidelity is lower than the syntax-tree path: declarations are recognized
//! line by line, block ends are found by brace depth or indentation, and
//! references are whole-word matches classified by the surrounding text.

use lazy_static::lazy_static;
use regex::Regex;

use super::extract::{finalize, is_excluded_constant_name};
use super::{ExtractionQuery, Language, RawSource, Reference, Symbol, SymbolKind, UsageKind};

lazy_static! {
    static ref JS_CLASS: Regex = Regex::new(
        r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][\w$]*)(?:\s+extends\s+([A-Za-z_$][\w$.]*))?"
    ).unwrap();
    static ref JS_FUNCTION: Regex = Regex::new(
        r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*\("
    ).unwrap();
    static ref JS_ARROW: Regex = Regex::new(
        r"^(?:export\s+)?const\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*=>|[A-Za-z_$][\w$]*\s*=>)"
    ).unwrap();
    static ref JS_CONST: Regex = Regex::new(
        r"^(?:export\s+)?const\s+([A-Za-z_$][\w$]*)\s*="
    ).unwrap();
    static ref JS_GLOBAL: Regex = Regex::new(
        r"^\s*(?:window|global|globalThis)\.([A-Za-z_$][\w$]*)\s*="
    ).unwrap();
    static ref JS_METHOD: Regex = Regex::new(
        r"^\s+(?:(?:static|async|get|set|public|private|protected|readonly)\s+)*#?([A-Za-z_$][\w$]*)\s*\([^)]*\)\s*(?::\s*[^{]+)?\{"
    ).unwrap();

    static ref PY_CLASS: Regex = Regex::new(r"^\s*class\s+([A-Za-z_]\w*)\s*(?:\(\s*([A-Za-z_][\w.]*))?").unwrap();
    static ref PY_DEF: Regex = Regex::new(r"^\s*(?:async\s+)?def\s+([A-Za-z_]\w*)\s*\(").unwrap();
    static ref PY_CONST: Regex = Regex::new(r"^([A-Z][A-Z_0-9]*)\s*(?::[^=]+)?=[^=]").unwrap();
    static ref PY_GLOBAL: Regex = Regex::new(r"^\s*global\s+(.+)$").unwrap();

    static ref SH_FUNCTION: Regex = Regex::new(
        r"^\s*(?:function\s+([\w.:-]+)(?:\s*\(\s*\))?|([\w.:-]+)\s*\(\s*\))"
    ).unwrap();
    static ref SH_READONLY: Regex = Regex::new(
        r"^\s*(?:readonly|declare\s+-\w*r\w*|typeset\s+-\w*r\w*)\s+(?:-\w+\s+)*([A-Za-z_]\w*)"
    ).unwrap();
    static ref SH_EXPORT: Regex = Regex::new(r"^\s*export\s+(?:-\w+\s+)*([A-Za-z_]\w*)").unwrap();

    static ref PS_FUNCTION: Regex = Regex::new(r"(?i)^\s*(?:function|filter|workflow)\s+([\w-]+)").unwrap();
    static ref PS_CLASS: Regex = Regex::new(r"(?i)^\s*class\s+(\w+)(?:\s*:\s*(\w+))?").unwrap();
    static ref PS_METHOD: Regex = Regex::new(r"^\s+(?:\[[^\]]*\]\s*)*(\w+)\s*\([^)]*\)\s*\{").unwrap();
    static ref PS_READONLY: Regex = Regex::new(
        r"(?i)^\s*(?:Set|New)-Variable\b.*-Option\s+(?:ReadOnly|Constant)"
    ).unwrap();
    static ref PS_VAR_NAME: Regex = Regex::new(r#"(?i)-Name\s+['"]?([\w]+)"#).unwrap();
    static ref PS_GLOBAL: Regex = Regex::new(r"(?i)^\s*\$(?:global|script):(\w+)\s*=").unwrap();

    static ref R_FUNCTION: Regex = Regex::new(r"^\s*([A-Za-z.][\w.]*)\s*(?:<-|=)\s*function\b").unwrap();
    static ref R_CONST: Regex = Regex::new(r"^([A-Z][A-Z_0-9.]*)\s*(?:<-|=)").unwrap();
    static ref R_SUPER: Regex = Regex::new(r"^\s*([A-Za-z.][\w.]*)\s*<<-").unwrap();
    static ref R_ASSIGN: Regex = Regex::new(r#"\bassign\(\s*["']([\w.]+)["']"#).unwrap();

    static ref IMPORT_LINE: Regex = Regex::new(
        r"^\s*(?:import\b|from\s+\S+\s+import\b|using\s+module\b|Import-Module\b|library\(|require\(|source\b|\.\s+\S)"
    ).unwrap();
}

/// Keywords that look like method headers to `JS_METHOD`/`PS_METHOD`.
const CONTROL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "function", "return", "foreach", "elseif", "until",
];

#[derive(Clone, Copy, PartialEq, Eq)]
enum Blocks {
    Braces,
    Indentation,
}

fn block_style(language: Language) -> Blocks {
    match language {
        Language::Python => Blocks::Indentation,
        _ => Blocks::Braces,
    }
}

struct Lines<'a> {
    lines: Vec<&'a str>,
    offsets: Vec<usize>,
    total: usize,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        let mut offsets = Vec::new();
        let mut lines = Vec::new();
        let mut offset = 0;
        for line in text.split('\n') {
            offsets.push(offset);
            lines.push(line.strip_suffix('\r').unwrap_or(line));
            offset += line.len() + 1;
        }
        Self {
            lines,
            offsets,
            total: text.len(),
        }
    }

    /// Last line (0-indexed) of the block opened on `start`.
    fn block_end(&self, start: usize, style: Blocks) -> usize {
        match style {
            Blocks::Braces => {
                let mut depth: i64 = 0;
                let mut opened = false;
                for (i, line) in self.lines.iter().enumerate().skip(start) {
                    for c in line.chars() {
                        match c {
                            '{' => {
                                depth += 1;
                                opened = true;
                            }
                            '}' => depth -= 1,
                            _ => {}
                        }
                    }
                    if opened && depth <= 0 {
                        return i;
                    }
                    if !opened && i > start {
                        return start;
                    }
                }
                self.lines.len().saturating_sub(1)
            }
            Blocks::Indentation => {
                let indent = indentation(self.lines[start]);
                let mut end = start;
                for (i, line) in self.lines.iter().enumerate().skip(start + 1) {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if indentation(line) <= indent {
                        break;
                    }
                    end = i;
                }
                end
            }
        }
    }

    fn seed(&self, name: &str, kind: SymbolKind, language: Language, start: usize, end: usize) -> Symbol {
        let end_byte = self
            .offsets
            .get(end + 1)
            .map(|o| o.saturating_sub(1))
            .unwrap_or(self.total);
        Symbol {
            name: name.to_string(),
            kind,
            start_line: start + 1,
            end_line: end + 1,
            language,
            parent: None,
            extends: None,
            start_byte: self.offsets[start],
            end_byte,
            top_level: true,
        }
    }
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Innermost open class containing line `i`.
fn open_class(classes: &[(String, usize, usize)], i: usize) -> Option<&(String, usize, usize)> {
    classes.iter().rev().find(|(_, start, end)| *start < i && i <= *end)
}

/// Extract symbols from raw text and apply `query`.
pub fn extract_symbols(raw: &RawSource, query: &ExtractionQuery) -> Vec<Symbol> {
    finalize(collect(raw), query)
}

/// Collect every recognizable declaration.
pub fn collect(raw: &RawSource) -> Vec<Symbol> {
    let lines = Lines::new(&raw.text);
    let style = block_style(raw.language);
    let language = raw.language;
    let mut symbols = Vec::new();
    // (name, start, end) of classes seen so far, 0-indexed lines
    let mut classes: Vec<(String, usize, usize)> = Vec::new();
    // (start, end) of functions seen so far
    let mut functions: Vec<(usize, usize)> = Vec::new();

    for (i, line) in lines.lines.iter().enumerate() {
        let nested = open_class(&classes, i).is_some()
            || functions.iter().any(|(start, end)| *start < i && i <= *end);
        let mut emit = |name: &str, kind: SymbolKind, end: usize, parent: Option<String>, extends: Option<String>| {
            let mut s = lines.seed(name, kind, language, i, end);
            s.parent = parent;
            s.extends = extends;
            s.top_level = !nested;
            symbols.push(s);
        };

        match language {
            Language::JavaScript | Language::TypeScript => {
                if let Some(c) = JS_CLASS.captures(line) {
                    let end = lines.block_end(i, style);
                    emit(&c[1], SymbolKind::Class, end, None, c.get(2).map(|m| m.as_str().to_string()));
                    classes.push((c[1].to_string(), i, end));
                } else if let Some(c) = JS_FUNCTION.captures(line).or_else(|| JS_ARROW.captures(line)) {
                    let end = lines.block_end(i, style);
                    emit(&c[1], SymbolKind::Function, end, None, None);
                    functions.push((i, end));
                } else if let Some(c) = JS_CONST.captures(line) {
                    if !is_excluded_constant_name(&c[1]) {
                        emit(&c[1], SymbolKind::Constant, i, None, None);
                    }
                } else if let Some(c) = JS_GLOBAL.captures(line) {
                    emit(&c[1], SymbolKind::Global, i, None, None);
                } else if let Some(class) = open_class(&classes, i) {
                    if let Some(c) = JS_METHOD.captures(line) {
                        if !CONTROL_KEYWORDS.contains(&&c[1]) {
                            let end = lines.block_end(i, style);
                            emit(&c[1], SymbolKind::Method, end, Some(class.0.clone()), None);
                        }
                    }
                }
            }
            Language::Python => {
                if let Some(c) = PY_CLASS.captures(line) {
                    let end = lines.block_end(i, style);
                    emit(&c[1], SymbolKind::Class, end, None, c.get(2).map(|m| m.as_str().to_string()));
                    classes.push((c[1].to_string(), i, end));
                } else if let Some(c) = PY_DEF.captures(line) {
                    let end = lines.block_end(i, style);
                    let class = open_class(&classes, i).map(|c| c.0.clone());
                    let kind = if class.is_some() { SymbolKind::Method } else { SymbolKind::Function };
                    emit(&c[1], kind, end, class, None);
                    functions.push((i, end));
                } else if let Some(c) = PY_CONST.captures(line) {
                    if !is_excluded_constant_name(&c[1]) {
                        emit(&c[1], SymbolKind::Constant, i, None, None);
                    }
                } else if let Some(c) = PY_GLOBAL.captures(line) {
                    for name in c[1].split(',').map(str::trim).filter(|n| !n.is_empty()) {
                        emit(name, SymbolKind::Global, i, None, None);
                    }
                }
            }
            Language::Shell => {
                if let Some(c) = SH_FUNCTION.captures(line) {
                    if let Some(name) = c.get(1).or_else(|| c.get(2)) {
                        let end = lines.block_end(i, style);
                        emit(name.as_str(), SymbolKind::Function, end, None, None);
                        functions.push((i, end));
                    }
                } else if let Some(c) = SH_READONLY.captures(line) {
                    if !nested && !is_excluded_constant_name(&c[1]) {
                        emit(&c[1], SymbolKind::Constant, i, None, None);
                    }
                } else if let Some(c) = SH_EXPORT.captures(line) {
                    emit(&c[1], SymbolKind::Global, i, None, None);
                }
            }
            Language::PowerShell => {
                if let Some(c) = PS_CLASS.captures(line) {
                    let end = lines.block_end(i, style);
                    emit(&c[1], SymbolKind::Class, end, None, c.get(2).map(|m| m.as_str().to_string()));
                    classes.push((c[1].to_string(), i, end));
                } else if let Some(c) = PS_FUNCTION.captures(line) {
                    let end = lines.block_end(i, style);
                    emit(&c[1], SymbolKind::Function, end, None, None);
                    functions.push((i, end));
                } else if PS_READONLY.is_match(line) {
                    if let Some(c) = PS_VAR_NAME.captures(line) {
                        if !nested && !is_excluded_constant_name(&c[1]) {
                            emit(&c[1], SymbolKind::Constant, i, None, None);
                        }
                    }
                } else if let Some(c) = PS_GLOBAL.captures(line) {
                    emit(&c[1], SymbolKind::Global, i, None, None);
                } else if let Some(class) = open_class(&classes, i) {
                    if let Some(c) = PS_METHOD.captures(line) {
                        if !CONTROL_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(&c[1])) {
                            let end = lines.block_end(i, style);
                            emit(&c[1], SymbolKind::Method, end, Some(class.0.clone()), None);
                        }
                    }
                }
            }
            Language::R => {
                if let Some(c) = R_FUNCTION.captures(line) {
                    let end = lines.block_end(i, style);
                    emit(&c[1], SymbolKind::Function, end, None, None);
                    functions.push((i, end));
                } else if let Some(c) = R_SUPER.captures(line) {
                    emit(&c[1], SymbolKind::Global, i, None, None);
                } else if let Some(c) = R_ASSIGN.captures(line) {
                    emit(&c[1], SymbolKind::Global, i, None, None);
                } else if let Some(c) = R_CONST.captures(line) {
                    if !is_excluded_constant_name(&c[1]) {
                        emit(&c[1], SymbolKind::Constant, i, None, None);
                    }
                }
            }
        }
    }

    symbols
}

/// Whole-word references to `symbols` in raw text.
pub fn find_references(raw: &RawSource, symbols: &[Symbol]) -> Vec<Reference> {
    let declared = collect(raw);
    let lines = Lines::new(&raw.text);
    let case_flag = if raw.language.case_insensitive() { "(?i)" } else { "" };
    let mut references = Vec::new();

    let mut names: Vec<(&str, SymbolKind)> = symbols.iter().map(|s| (s.bare_name(), s.kind)).collect();
    names.sort();
    names.dedup_by(|a, b| a.0 == b.0);

    for (name, kind) in names {
        let pattern = format!(r"{}(?:^|[^\w$])({})(?:[^\w$]|$)", case_flag, regex::escape(name));
        let Ok(word) = Regex::new(&pattern) else {
            continue;
        };
        let declaring_lines: Vec<usize> = declared
            .iter()
            .filter(|d| names_equal(d.bare_name(), name, raw.language))
            .map(|d| d.start_line)
            .collect();

        for (i, line) in lines.lines.iter().enumerate() {
            let line_no = i + 1;
            if declaring_lines.contains(&line_no) {
                continue;
            }
            let Some(m) = word.captures(line).and_then(|c| c.get(1)) else {
                continue;
            };
            let before = line[..m.start()].trim_end().to_ascii_lowercase();
            let after = line[m.end()..].trim_start();
            let class_header = line.trim_start().to_ascii_lowercase().starts_with("class");

            let usage = if IMPORT_LINE.is_match(line) {
                UsageKind::Import
            } else if before.ends_with("new") || before.ends_with("new-object") {
                UsageKind::Instantiation
            } else if before.ends_with("extends") || (class_header && (before.ends_with('(') || before.ends_with(':'))) {
                UsageKind::Inheritance
            } else if after.starts_with('(') {
                if kind.is_constructible() {
                    UsageKind::Instantiation
                } else {
                    UsageKind::Call
                }
            } else {
                UsageKind::PlainReference
            };

            references.push(Reference {
                symbol: name.to_string(),
                line: line_no,
                context: enclosing(&declared, line_no),
                usage,
            });
        }
    }

    references.sort_by(|a, b| (a.line, &a.symbol).cmp(&(b.line, &b.symbol)));
    references
}

fn names_equal(a: &str, b: &str, language: Language) -> bool {
    if language.case_insensitive() {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}

/// Innermost function or method whose span covers `line`.
fn enclosing(declared: &[Symbol], line: usize) -> Option<String> {
    declared
        .iter()
        .filter(|s| matches!(s.kind, SymbolKind::Function | SymbolKind::Method))
        .filter(|s| s.start_line < line && line <= s.end_line)
        .max_by_key(|s| s.start_line)
        .map(|s| match &s.parent {
            Some(parent) => format!("{}.{}", parent, s.name),
            None => s.name.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(language: Language, text: &str) -> RawSource {
        RawSource {
            path: "broken".to_string(),
            language,
            text: text.to_string(),
            reason: "test".to_string(),
        }
    }

    #[test]
    fn test_javascript_class_and_methods() {
        let source = raw(
            Language::JavaScript,
            "class Calculator extends Base {\n  add(a, b) {\n    return a + b;\n  }\n}\nconst MAX_RETRIES = 5;\nconst i = 0;\n",
        );
        let symbols = extract_symbols(&source, &ExtractionQuery::all());
        let names: Vec<_> = symbols.iter().map(|s| (s.name.as_str(), s.kind)).collect();
        assert_eq!(
            names,
            vec![
                ("Calculator", SymbolKind::Class),
                ("add", SymbolKind::Method),
                ("MAX_RETRIES", SymbolKind::Constant),
            ]
        );
        assert_eq!(symbols[0].extends.as_deref(), Some("Base"));
        assert_eq!(symbols[0].end_line, 5);
        assert_eq!(symbols[1].parent.as_deref(), Some("Calculator"));
    }

    #[test]
    fn test_python_indentation_blocks() {
        let source = raw(
            Language::Python,
            "class Shape(Base):\n    def area(self):\n        return 0\n\ndef helper():\n    pass\nMAX_SIZE = 10\n",
        );
        let symbols = extract_symbols(&source, &ExtractionQuery::all());
        let class = symbols.iter().find(|s| s.name == "Shape").unwrap();
        assert_eq!(class.end_line, 3);
        assert!(symbols.iter().any(|s| s.name == "area" && s.kind == SymbolKind::Method));
        assert!(symbols.iter().any(|s| s.name == "helper" && s.kind == SymbolKind::Function));
        assert!(symbols.iter().any(|s| s.name == "MAX_SIZE" && s.kind == SymbolKind::Constant));
    }

    #[test]
    fn test_references_skip_declaration_line() {
        let source = raw(
            Language::JavaScript,
            "function add(a, b) {\n  return a + b;\n}\nconst total = add(1, 2);\n",
        );
        let symbols = extract_symbols(&source, &ExtractionQuery::all());
        let target: Vec<_> = symbols.into_iter().filter(|s| s.name == "add").collect();
        let refs = find_references(&source, &target);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].line, 4);
        assert_eq!(refs[0].usage, UsageKind::Call);
    }
}
