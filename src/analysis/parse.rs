//! Parsing with an ordered fallback chain.
//!
//! 1. Every grammar variant is tried in order; the first tree without
//!    syntax errors wins.
//! 2. Otherwise the least damaged recovered tree is accepted when its share
//!    of error bytes is within the configured tolerance.
//! 3. Otherwise the file degrades to the regex heuristic model. Files are
//!    never silently dropped.

use tree_sitter::{Node, Parser};

use super::{GrammarVariant, Language, LanguageAnalyzer, ParsedFile};
use crate::error::{Error, Result};

/// Default share of error bytes a recovered tree may contain.
pub const DEFAULT_ERROR_TOLERANCE: f64 = 0.25;

/// Source text for which no grammar produced a usable tree.
#[derive(Debug, Clone)]
pub struct RawSource {
    pub path: String,
    pub language: Language,
    pub text: String,
    /// Why the syntax model was abandoned.
    pub reason: String,
}

/// The best model of a source file the fallback chain could produce.
pub enum SourceModel {
    Syntax(ParsedFile),
    Heuristic(RawSource),
}

impl SourceModel {
    pub fn is_heuristic(&self) -> bool {
        matches!(self, SourceModel::Heuristic(_))
    }
}

/// Parse `source`, walking the fallback chain.
pub fn parse_source(
    analyzer: &dyn LanguageAnalyzer,
    path: &str,
    source: &[u8],
    tolerance: f64,
) -> SourceModel {
    let language = analyzer.language();
    let variants = analyzer.grammar_variants();

    let outcome = variants
        .iter()
        .fold(Err(Vec::new()), |acc, variant| {
            acc.or_else(|mut damaged: Vec<(f64, ParsedFile)>| {
                match parse_variant(variant, path, language, source) {
                    Ok(parsed) if !parsed.tree.root_node().has_error() => Ok(parsed),
                    Ok(mut parsed) => {
                        parsed.recovered = true;
                        damaged.push((error_share(&parsed), parsed));
                        Err(damaged)
                    }
                    Err(e) => {
                        tracing::debug!(path, grammar = variant.name, error = %e, "grammar variant failed");
                        Err(damaged)
                    }
                }
            })
        })
        .or_else(|damaged| least_damaged(damaged, path, tolerance));

    match outcome {
        Ok(parsed) => {
            if parsed.recovered {
                tracing::debug!(path, grammar = parsed.grammar, "accepted recovered syntax tree");
            }
            SourceModel::Syntax(parsed)
        }
        Err(e) => {
            tracing::warn!(path, error = %e, "falling back to heuristic extraction");
            SourceModel::Heuristic(RawSource {
                path: path.to_string(),
                language,
                text: String::from_utf8_lossy(source).into_owned(),
                reason: e.to_string(),
            })
        }
    }
}

fn parse_variant(
    variant: &GrammarVariant,
    path: &str,
    language: Language,
    source: &[u8],
) -> Result<ParsedFile> {
    let failed = |reason: String| Error::Parse {
        path: path.to_string(),
        reason,
    };
    let mut parser = Parser::new();
    parser
        .set_language(&variant.language)
        .map_err(|e| failed(format!("{}: {}", variant.name, e)))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| failed(format!("{}: parser produced no tree", variant.name)))?;

    Ok(ParsedFile {
        tree,
        source: source.to_vec(),
        path: path.to_string(),
        language,
        grammar: variant.name,
        recovered: false,
    })
}

fn least_damaged(damaged: Vec<(f64, ParsedFile)>, path: &str, tolerance: f64) -> Result<ParsedFile> {
    let failed = |reason: String| Error::Parse {
        path: path.to_string(),
        reason,
    };
    let best = damaged
        .into_iter()
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .ok_or_else(|| failed("no grammar variant produced a tree".to_string()))?;

    if best.0 <= tolerance {
        Ok(best.1)
    } else {
        Err(failed(format!(
            "syntax errors cover {:.0}% of the file (tolerance {:.0}%)",
            best.0 * 100.0,
            tolerance * 100.0
        )))
    }
}

/// Share of source bytes covered by ERROR or MISSING nodes.
pub fn error_share(parsed: &ParsedFile) -> f64 {
    let root = parsed.tree.root_node();
    let total = root.end_byte().saturating_sub(root.start_byte()).max(1);
    (error_bytes(root) as f64 / total as f64).min(1.0)
}

fn error_bytes(node: Node) -> usize {
    if node.is_error() {
        return node.end_byte() - node.start_byte();
    }
    if node.is_missing() {
        return 1;
    }
    if !node.has_error() {
        return 0;
    }
    let mut cursor = node.walk();
    let total = node.children(&mut cursor).map(error_bytes).sum();
    total
}
