//! Codelineage - symbol lineage across source history.
//!
//! Codelineage answers two questions about a source tree: how did a named
//! code element change over the project's commit history, and where across
//! the codebase is it used.
//!
//! # Architecture
//!
//! The codebase uses tree-sitter for AST-based analysis:
//!
//! - `analysis`: Symbol extraction and reference matching per language
//! - `diff`: Greedy and minimal-hunk line diffs
//! - `history`: Commit history of a file, via the git CLI
//! - `evolution`: Deduplicated version chains and compressed views
//! - `config`: YAML configuration
//! - `report`: Output formatting (text, JSON)
//!
//! # Adding a New Language
//!
//! See `src/analysis/languages/` for examples. Implement `LanguageAnalyzer`
//! trait and register in `languages/mod.rs`.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod evolution;
pub mod history;
pub mod report;

pub use analysis::{
    register_analyzers, AnalysisContext, ExtractionQuery, Language, LanguageAnalyzer, Reference,
    Symbol, SymbolKind, UsageKind,
};
pub use config::Config;
pub use error::{Error, Result};
pub use evolution::{CompressedView, Timeline, VersionChain};
pub use history::{GitCli, HistoryProvider, Snapshot};

/// Initialize all subsystems.
///
/// Call this once at startup.
pub fn init() {
    register_analyzers();
}
