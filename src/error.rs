//! Error taxonomy for the analysis core.
//!
//! Every variant is scoped to one unit of work (a file, a snapshot, a
//! symbol identity). Callers that fan out over many units log the failure
//! and keep going; nothing here is meant to abort a whole run.

use thiserror::Error;

/// Result type alias for codelineage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by extraction, reference matching and history loading.
#[derive(Error, Debug)]
pub enum Error {
    /// No analyzer exists for the file's language. Fatal for that file only.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// A grammar could not be loaded or produced no tree at all.
    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    /// Git could not produce content for a commit/path pair.
    #[error("no content for {path} at {commit}")]
    MissingSnapshot { commit: String, path: String },

    /// Symbol extraction or reference matching failed for one file.
    #[error("extraction failed for {path}: {reason}")]
    Extraction { path: String, reason: String },

    /// An extraction query could not be decoded.
    #[error("invalid extraction query: {0}")]
    Query(String),

    /// The git command failed or produced output we could not read.
    #[error("git error: {0}")]
    Git(String),

    /// The configuration file is malformed.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error only invalidates a single snapshot of a chain.
    pub fn is_missing_snapshot(&self) -> bool {
        matches!(self, Error::MissingSnapshot { .. })
    }
}
