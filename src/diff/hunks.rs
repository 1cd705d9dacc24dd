//! Minimal-hunk line diff.
//!
//! Uses the `similar` crate's Myers implementation with zero context lines,
//! then walks each hunk body with running old/new line counters to address
//! every added and deleted line.

use serde::{Deserialize, Serialize};
use similar::{Algorithm, DiffTag, TextDiff};

/// How lines are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhitespaceMode {
    /// Lines must match byte for byte.
    #[default]
    Exact,
    /// Lines match when they are equal after removing all whitespace.
    Ignore,
}

impl WhitespaceMode {
    fn key(self, line: &str) -> String {
        match self {
            WhitespaceMode::Exact => line.to_string(),
            WhitespaceMode::Ignore => line.split_whitespace().collect(),
        }
    }
}

/// A line in a hunk body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkLine {
    Context(String),
    Removed(String),
    Added(String),
}

/// A contiguous change. Starts are 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    /// Unified-diff style header.
    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_count, self.new_start, self.new_count
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Add,
    Delete,
}

/// One added or deleted line, addressed in its own transition's numbering:
/// deletions by old line, additions by new line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineChange {
    pub kind: ChangeKind,
    pub line: usize,
    pub content: String,
}

/// Compute zero-context hunks between two texts.
///
/// In [`WhitespaceMode::Ignore`] lines are aligned on their whitespace-free
/// form, but hunk bodies carry the original text.
pub fn hunks(old: &str, new: &str, mode: WhitespaceMode) -> Vec<Hunk> {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let old_keys: Vec<String> = old_lines.iter().map(|l| mode.key(l)).collect();
    let new_keys: Vec<String> = new_lines.iter().map(|l| mode.key(l)).collect();
    let old_refs: Vec<&str> = old_keys.iter().map(String::as_str).collect();
    let new_refs: Vec<&str> = new_keys.iter().map(String::as_str).collect();

    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_slices(&old_refs, &new_refs);

    diff.grouped_ops(0)
        .into_iter()
        .filter_map(|group| {
            let first = group.first()?;
            let last = group.last()?;
            let old_range = first.old_range().start..last.old_range().end;
            let new_range = first.new_range().start..last.new_range().end;

            let mut lines = Vec::new();
            for op in &group {
                let (tag, old_ops, new_ops) = op.as_tag_tuple();
                match tag {
                    DiffTag::Equal => lines.extend(
                        old_ops.map(|i| HunkLine::Context(old_lines[i].to_string())),
                    ),
                    DiffTag::Delete => lines.extend(
                        old_ops.map(|i| HunkLine::Removed(old_lines[i].to_string())),
                    ),
                    DiffTag::Insert => lines.extend(
                        new_ops.map(|i| HunkLine::Added(new_lines[i].to_string())),
                    ),
                    DiffTag::Replace => {
                        lines.extend(old_ops.map(|i| HunkLine::Removed(old_lines[i].to_string())));
                        lines.extend(new_ops.map(|i| HunkLine::Added(new_lines[i].to_string())));
                    }
                }
            }

            let changed = lines.iter().any(|l| !matches!(l, HunkLine::Context(_)));
            changed.then(|| Hunk {
                old_start: old_range.start + 1,
                old_count: old_range.len(),
                new_start: new_range.start + 1,
                new_count: new_range.len(),
                lines,
            })
        })
        .collect()
}

/// Address every added and deleted line of `hunks`.
pub fn line_changes(hunks: &[Hunk]) -> Vec<LineChange> {
    let mut changes = Vec::new();
    for hunk in hunks {
        let mut old_line = hunk.old_start;
        let mut new_line = hunk.new_start;
        for line in &hunk.lines {
            match line {
                HunkLine::Removed(content) => {
                    changes.push(LineChange {
                        kind: ChangeKind::Delete,
                        line: old_line,
                        content: content.clone(),
                    });
                    old_line += 1;
                }
                HunkLine::Added(content) => {
                    changes.push(LineChange {
                        kind: ChangeKind::Add,
                        line: new_line,
                        content: content.clone(),
                    });
                    new_line += 1;
                }
                HunkLine::Context(_) => {
                    old_line += 1;
                    new_line += 1;
                }
            }
        }
    }
    changes
}

/// Hunks and line addressing in one step.
pub fn line_diff(old: &str, new: &str, mode: WhitespaceMode) -> Vec<LineChange> {
    line_changes(&hunks(old, new, mode))
}
