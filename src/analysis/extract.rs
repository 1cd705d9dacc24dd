//! Symbol extraction driver shared by every language.
//!
//! The walk is a pure function of the tree and the query: the accumulator is
//! threaded through the recursion and returned, so files can be extracted in
//! parallel without any shared state.

use tree_sitter::Node;

use super::{Ancestors, ExtractionQuery, LanguageAnalyzer, ParsedFile, Symbol, SymbolKind, SymbolSeed};

/// Names that look like loop or scratch variables rather than constants.
const LOOP_NAMES: &[&str] = &["i", "j", "k", "idx", "index", "temp", "tmp"];

/// Whether `name` is too noisy to report as a constant.
///
/// Excludes single lowercase letters, loop variable names, names starting
/// with `_`, and names of at most two characters that are not fully uppercase.
pub fn is_excluded_constant_name(name: &str) -> bool {
    if name.is_empty() || name.starts_with('_') {
        return true;
    }
    if LOOP_NAMES.iter().any(|n| n.eq_ignore_ascii_case(name)) {
        return true;
    }
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_lowercase() {
            return true;
        }
    }
    name.chars().count() <= 2 && name.chars().any(|c| !c.is_uppercase())
}

/// Extract symbols from a parsed file and apply `query`.
pub fn extract_symbols(
    analyzer: &dyn LanguageAnalyzer,
    parsed: &ParsedFile,
    query: &ExtractionQuery,
) -> Vec<Symbol> {
    let raw = collect(analyzer, parsed);
    finalize(raw, query)
}

/// Walk the whole tree and collect every symbol, unfiltered.
pub fn collect(analyzer: &dyn LanguageAnalyzer, parsed: &ParsedFile) -> Vec<Symbol> {
    let language = parsed.language;
    let mut seeds = Vec::new();
    walk(analyzer, parsed.tree.root_node(), Ancestors::root(), parsed, &mut seeds);

    seeds
        .into_iter()
        .map(|(seed, top_level)| seed.into_symbol(language, top_level))
        .collect()
}

fn walk<'t>(
    analyzer: &dyn LanguageAnalyzer,
    node: Node<'t>,
    ancestors: Ancestors<'_, 't>,
    parsed: &ParsedFile,
    out: &mut Vec<(SymbolSeed, bool)>,
) {
    let mut here = Vec::new();
    analyzer.symbols_at(node, ancestors, parsed, &mut here);
    if !here.is_empty() {
        let top_level = !ancestors.iter().any(|a| analyzer.is_scope_boundary(a));
        out.extend(here.into_iter().map(|seed| (seed, top_level)));
    }

    ancestors.with(node, |inner| {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            walk(analyzer, child, inner, parsed, out);
        }
    });
}

/// Sort, prune contained symbols, apply the query.
pub fn finalize(mut symbols: Vec<Symbol>, query: &ExtractionQuery) -> Vec<Symbol> {
    symbols.sort_by(|a, b| {
        (a.start_line, a.start_byte, a.end_byte)
            .cmp(&(b.start_line, b.start_byte, b.end_byte))
            .then_with(|| a.kind.cmp(&b.kind))
            .then_with(|| a.name.cmp(&b.name))
    });
    symbols.dedup_by(|a, b| a.kind == b.kind && a.name == b.name && a.start_byte == b.start_byte);

    let kept = prune_contained(symbols);

    kept.into_iter()
        .filter(|s| query.matches(s))
        .map(|mut s| {
            if query.preserve_context && s.kind == SymbolKind::Method {
                if let Some(parent) = &s.parent {
                    s.name = format!("{}.{}", parent, s.name);
                }
            }
            s
        })
        .collect()
}

/// Drop symbols nested in another symbol, except methods, exports and globals.
///
/// An export wraps its declaration, so nesting inside an export does not
/// count as containment.
fn prune_contained(symbols: Vec<Symbol>) -> Vec<Symbol> {
    let keep: Vec<bool> = symbols
        .iter()
        .map(|s| {
            s.kind.survives_containment()
                || !symbols
                    .iter()
                    .any(|other| other.kind != SymbolKind::Export && s.is_contained_in(other))
        })
        .collect();

    symbols
        .into_iter()
        .zip(keep)
        .filter_map(|(s, keep)| keep.then_some(s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Language;

    fn sym(name: &str, kind: SymbolKind, start: usize, end: usize) -> Symbol {
        Symbol {
            name: name.to_string(),
            kind,
            start_line: start + 1,
            end_line: end + 1,
            language: Language::Python,
            parent: None,
            extends: None,
            start_byte: start * 10,
            end_byte: end * 10,
            top_level: true,
        }
    }

    #[test]
    fn test_constant_exclusion_predicate() {
        for name in ["i", "x", "idx", "TMP", "Index", "_private", "ab", "aB", ""] {
            assert!(is_excluded_constant_name(name), "{name} should be excluded");
        }
        for name in ["MAX_RETRIES", "X", "AB", "timeout", "Config"] {
            assert!(!is_excluded_constant_name(name), "{name} should be kept");
        }
    }

    #[test]
    fn test_nested_function_is_pruned() {
        let symbols = vec![
            sym("outer", SymbolKind::Function, 0, 10),
            sym("inner", SymbolKind::Function, 2, 4),
        ];
        let kept = finalize(symbols, &ExtractionQuery::all());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "outer");
    }

    #[test]
    fn test_methods_and_exported_declarations_survive() {
        let mut method = sym("bar", SymbolKind::Method, 2, 4);
        method.parent = Some("Foo".to_string());
        let symbols = vec![
            sym("Foo", SymbolKind::Export, 0, 10),
            sym("Foo", SymbolKind::Class, 1, 10),
            method,
        ];
        let kept = finalize(symbols, &ExtractionQuery::all());
        let kinds: Vec<_> = kept.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SymbolKind::Export, SymbolKind::Class, SymbolKind::Method]);
    }

    #[test]
    fn test_nested_global_survives_but_nested_constant_does_not() {
        let symbols = vec![
            sym("setup", SymbolKind::Function, 0, 10),
            sym("registry", SymbolKind::Global, 2, 2),
            sym("LIMIT", SymbolKind::Constant, 3, 3),
        ];
        let kept = finalize(symbols, &ExtractionQuery::all());
        let names: Vec<_> = kept.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["setup", "registry"]);
    }

    #[test]
    fn test_preserve_context_renames_methods() {
        let mut method = sym("bar", SymbolKind::Method, 2, 4);
        method.parent = Some("Foo".to_string());
        let query = ExtractionQuery::for_kinds(&[SymbolKind::Method]).with_preserve_context(true);
        let kept = finalize(vec![sym("Foo", SymbolKind::Class, 0, 10), method], &query);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "Foo.bar");
    }
}
