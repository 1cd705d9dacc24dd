//! AST-backed symbol analysis.
//!
//! Source files are parsed with tree-sitter and walked once per question:
//! which named elements does this file declare, and where does this file use
//! a given set of them.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌──────────────┐   ┌─────────────┐
//! │ Source bytes │──▶│ parse_source  │──▶│ extract      │──▶│ [Symbol]    │
//! └──────────────┘   │ (variants,    │   │ references   │   │ [Reference] │
//!                    │  heuristic)   │   └──────────────┘   └─────────────┘
//!                    └───────────────┘          ▲
//!                                               │
//!                                     ┌───────────────────┐
//!                                     │ LanguageAnalyzer  │
//!                                     │ (rule tables)     │
//!                                     └───────────────────┘
//! ```
//!
//! The drivers in `extract` and `references` own the walk. Each language
//! only answers questions about a single node and its ancestors.
//!
//! # Adding a New Language
//!
//! 1. Create a new module in `src/analysis/languages/`
//! 2. Implement `LanguageAnalyzer` over a node-kind enum for that grammar
//! 3. Add the language to `Language` and its extensions
//! 4. Register the analyzer in `languages/mod.rs`

mod ancestors;
mod context;
pub mod extract;
pub mod heuristic;
mod languages;
mod model;
pub mod parse;
mod query;
pub mod references;
mod traits;

pub use ancestors::{AncestorIter, Ancestors};
pub use context::{AnalysisContext, FileSymbols, ProjectReference};
pub use extract::extract_symbols;
pub use languages::{
    analyzer_for_path, get_analyzer, register_analyzers, registered_extensions,
    JavaScriptAnalyzer, PowerShellAnalyzer, PythonAnalyzer, RAnalyzer, ShellAnalyzer,
};
pub use model::{Language, Reference, Symbol, SymbolIdentity, SymbolKind, UsageKind};
pub use parse::{parse_source, RawSource, SourceModel, DEFAULT_ERROR_TOLERANCE};
pub use query::{ExtractionQuery, FiltersWire, QueryWire, ScopeFilter};
pub use references::find_references;
pub use traits::{
    ContextFrame, GrammarVariant, LanguageAnalyzer, ParsedFile, RefMatch, SymbolSeed,
};

/// Extract symbols from whichever model the fallback chain produced.
pub fn extract_from_model(model: &SourceModel, query: &ExtractionQuery) -> Vec<Symbol> {
    match model {
        SourceModel::Syntax(parsed) => {
            extract_symbols(get_analyzer(parsed.language), parsed, query)
        }
        SourceModel::Heuristic(raw) => heuristic::extract_symbols(raw, query),
    }
}

/// Find references in whichever model the fallback chain produced.
pub fn references_in_model(model: &SourceModel, symbols: &[Symbol]) -> Vec<Reference> {
    match model {
        SourceModel::Syntax(parsed) => {
            find_references(get_analyzer(parsed.language), parsed, symbols)
        }
        SourceModel::Heuristic(raw) => heuristic::find_references(raw, symbols),
    }
}
