//! File history: which commits touched a file, and its content at each.
//!
//! The evolution engine never talks to git directly. It consumes
//! [`Snapshot`]s produced through a [`HistoryProvider`], so tests and
//! embedders can supply history from anywhere.

mod git;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use git::GitCli;

/// Metadata of one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitInfo {
    pub commit_id: String,
    pub author: String,
    /// Author time, seconds since the Unix epoch.
    pub timestamp: i64,
    pub message: String,
}

impl CommitInfo {
    /// First eight characters of the commit id.
    pub fn short_id(&self) -> &str {
        self.commit_id.get(..8).unwrap_or(&self.commit_id)
    }
}

/// A commit that touched the file, with the file's path at that commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRevision {
    pub commit: CommitInfo,
    pub path: String,
}

/// One file's content at one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(flatten)]
    pub commit: CommitInfo,
    pub path: String,
    pub content: String,
}

/// Source of file history.
pub trait HistoryProvider: Send + Sync {
    /// Commits that touched `path`, newest first, following renames.
    fn history(&self, path: &str) -> Result<Vec<FileRevision>>;

    /// Content of `path` at `commit`.
    ///
    /// Fails with [`Error::MissingSnapshot`] when the commit has no such file.
    fn content_at(&self, commit: &str, path: &str) -> Result<String>;
}

/// Load a file's snapshots in chronological order.
///
/// `max_commits` keeps only the most recent commits. Snapshots git cannot
/// produce are logged and skipped.
pub fn collect_snapshots(
    provider: &dyn HistoryProvider,
    path: &str,
    max_commits: Option<usize>,
) -> Result<Vec<Snapshot>> {
    let mut revisions = provider.history(path)?;
    if let Some(max) = max_commits {
        revisions.truncate(max);
    }
    revisions.reverse();

    let mut snapshots = Vec::with_capacity(revisions.len());
    for revision in revisions {
        match provider.content_at(&revision.commit.commit_id, &revision.path) {
            Ok(content) => snapshots.push(Snapshot {
                commit: revision.commit,
                path: revision.path,
                content,
            }),
            Err(e) if e.is_missing_snapshot() => {
                tracing::warn!(commit = revision.commit.short_id(), path = %revision.path, "skipping missing snapshot");
            }
            Err(e) => return Err(e),
        }
    }

    tracing::debug!(path, snapshots = snapshots.len(), "collected snapshots");
    Ok(snapshots)
}

/// History held in memory, for embedding and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryHistory {
    /// Revisions per path, oldest first.
    revisions: HashMap<String, Vec<FileRevision>>,
    contents: HashMap<(String, String), String>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a commit of `path`. Commits must be added oldest first.
    /// `None` content records a commit whose file cannot be read.
    pub fn commit(&mut self, path: &str, commit: CommitInfo, content: Option<&str>) -> &mut Self {
        if let Some(content) = content {
            self.contents
                .insert((commit.commit_id.clone(), path.to_string()), content.to_string());
        }
        self.revisions.entry(path.to_string()).or_default().push(FileRevision {
            commit,
            path: path.to_string(),
        });
        self
    }
}

impl HistoryProvider for InMemoryHistory {
    fn history(&self, path: &str) -> Result<Vec<FileRevision>> {
        let mut revisions = self.revisions.get(path).cloned().unwrap_or_default();
        revisions.reverse();
        Ok(revisions)
    }

    fn content_at(&self, commit: &str, path: &str) -> Result<String> {
        self.contents
            .get(&(commit.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| Error::MissingSnapshot {
                commit: commit.to_string(),
                path: path.to_string(),
            })
    }
}
