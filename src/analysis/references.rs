//! Reference matching driver shared by every language.
//!
//! One walk over the tree. Every name node whose text equals a target symbol
//! is handed to the language's rule table, which decides between a use, the
//! declaring occurrence, or noise. Declaring occurrences are never reported.

use std::collections::{BTreeSet, HashMap, HashSet};

use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Query, QueryCursor};

use super::{Ancestors, ContextFrame, LanguageAnalyzer, ParsedFile, RefMatch, Reference, Symbol, UsageKind};

/// Targets indexed by the name they are matched on.
struct Targets<'a> {
    by_name: HashMap<String, Vec<&'a Symbol>>,
    case_insensitive: bool,
}

impl<'a> Targets<'a> {
    fn new(symbols: &'a [Symbol], case_insensitive: bool) -> Self {
        let mut by_name: HashMap<String, Vec<&'a Symbol>> = HashMap::new();
        for symbol in symbols {
            let key = Self::key(symbol.bare_name(), case_insensitive);
            let entry = by_name.entry(key).or_default();
            if !entry.iter().any(|s| s.bare_name() == symbol.bare_name() && s.kind == symbol.kind) {
                entry.push(symbol);
            }
        }
        Self {
            by_name,
            case_insensitive,
        }
    }

    fn key(name: &str, case_insensitive: bool) -> String {
        if case_insensitive {
            name.to_ascii_lowercase()
        } else {
            name.to_string()
        }
    }

    fn get(&self, name: &str) -> Option<&Vec<&'a Symbol>> {
        self.by_name.get(&Self::key(name, self.case_insensitive))
    }
}

/// A use found during the walk, before declaration-line filtering.
struct Hit {
    symbol: String,
    line: usize,
    context: Option<String>,
    usage: UsageKind,
}

struct WalkState {
    imports: HashSet<usize>,
    hits: Vec<Hit>,
    /// (symbol, line) pairs where a declaring occurrence was seen.
    declared: HashSet<(String, usize)>,
}

/// Find every use of `symbols` in a parsed file.
pub fn find_references(
    analyzer: &dyn LanguageAnalyzer,
    parsed: &ParsedFile,
    symbols: &[Symbol],
) -> Vec<Reference> {
    if symbols.is_empty() {
        return Vec::new();
    }

    let targets = Targets::new(symbols, parsed.language.case_insensitive());
    let mut state = WalkState {
        imports: import_bindings(analyzer, parsed),
        hits: Vec::new(),
        declared: HashSet::new(),
    };

    walk(analyzer, parsed.tree.root_node(), Ancestors::root(), parsed, &targets, &mut state);

    let mut seen = BTreeSet::new();
    let mut references: Vec<Reference> = state
        .hits
        .into_iter()
        .filter(|hit| !state.declared.contains(&(hit.symbol.clone(), hit.line)))
        .filter(|hit| seen.insert((hit.symbol.clone(), hit.line, hit.usage)))
        .map(|hit| Reference {
            symbol: hit.symbol,
            line: hit.line,
            context: hit.context,
            usage: hit.usage,
        })
        .collect();

    references.sort_by(|a, b| (a.line, &a.symbol, a.usage).cmp(&(b.line, &b.symbol, b.usage)));
    references
}

fn walk<'t>(
    analyzer: &dyn LanguageAnalyzer,
    node: Node<'t>,
    ancestors: Ancestors<'_, 't>,
    parsed: &ParsedFile,
    targets: &Targets,
    state: &mut WalkState,
) {
    if analyzer.is_name_node(node.kind()) {
        let name = analyzer.name_of(node, parsed);
        if let Some(candidates) = targets.get(name) {
            let line = node.start_position().row + 1;
            for target in candidates {
                let symbol = target.bare_name().to_string();
                let verdict = if state.imports.contains(&node.id()) {
                    RefMatch::Use(UsageKind::Import)
                } else {
                    analyzer.classify_reference(node, ancestors, parsed, target)
                };
                match verdict {
                    RefMatch::Declaration => {
                        state.declared.insert((symbol, line));
                    }
                    RefMatch::Use(usage) => state.hits.push(Hit {
                        symbol,
                        line,
                        context: containing_context(analyzer, ancestors, parsed),
                        usage,
                    }),
                    RefMatch::Ignore => {}
                }
            }
        }
    }

    ancestors.with(node, |inner| {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            walk(analyzer, child, inner, parsed, targets, state);
        }
    });
}

/// Resolve the enclosing `Class.method` or `function` for a use.
///
/// The first enclosing named function supplies the name; a class further
/// out qualifies it. Uses outside any function have no context.
pub fn containing_context(
    analyzer: &dyn LanguageAnalyzer,
    ancestors: Ancestors<'_, '_>,
    parsed: &ParsedFile,
) -> Option<String> {
    let chain: Vec<Node> = ancestors.iter().collect();
    let mut function = None;

    for (i, node) in chain.iter().enumerate() {
        match analyzer.context_frame(*node, chain.get(i + 1).copied(), parsed) {
            Some(ContextFrame::Function(name)) if function.is_none() => function = Some(name),
            Some(ContextFrame::Class(class)) => {
                return function.map(|f| format!("{}.{}", class, f));
            }
            _ => {}
        }
    }

    function
}

/// Node ids of import bindings, found with the language's import query.
fn import_bindings(analyzer: &dyn LanguageAnalyzer, parsed: &ParsedFile) -> HashSet<usize> {
    let mut ids = HashSet::new();
    let Some(source) = analyzer.import_query() else {
        return ids;
    };

    let Some(variant) = analyzer
        .grammar_variants()
        .into_iter()
        .find(|v| v.name == parsed.grammar)
    else {
        return ids;
    };
    let query = match Query::new(&variant.language, source) {
        Ok(q) => q,
        Err(e) => {
            tracing::debug!(path = %parsed.path, grammar = parsed.grammar, error = %e, "import query not applicable");
            return ids;
        }
    };

    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);
    while let Some(m) = matches.next() {
        for capture in m.captures {
            if query.capture_names()[capture.index as usize] == "name" {
                ids.insert(capture.node.id());
            }
        }
    }
    ids
}
