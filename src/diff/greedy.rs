//! Bounded-lookahead line diff.
//!
//! A cheap local alignment: at each step the nearest identical line within
//! [`LOOKAHEAD`] lines wins. It is not a minimum edit script; use
//! [`super::hunks`] when minimality matters.

use serde::Serialize;

/// How far ahead either side is searched for a matching line.
pub const LOOKAHEAD: usize = 5;

/// One step of a greedy diff. Line numbers are 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DiffOp {
    #[serde(rename_all = "camelCase")]
    Unchanged {
        old_line: usize,
        new_line: usize,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Added { new_line: usize, text: String },
    #[serde(rename_all = "camelCase")]
    Removed { old_line: usize, text: String },
    #[serde(rename_all = "camelCase")]
    Modified {
        old_line: usize,
        new_line: usize,
        old: String,
        new: String,
    },
}

impl DiffOp {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, DiffOp::Unchanged { .. })
    }
}

/// Diff two line sequences with two cursors and a bounded lookahead.
pub fn greedy_diff<S: AsRef<str>>(old: &[S], new: &[S]) -> Vec<DiffOp> {
    let old: Vec<&str> = old.iter().map(AsRef::as_ref).collect();
    let new: Vec<&str> = new.iter().map(AsRef::as_ref).collect();
    let mut ops = Vec::with_capacity(old.len().max(new.len()));
    let (mut i, mut j) = (0, 0);

    let unchanged = |i: usize, j: usize| DiffOp::Unchanged {
        old_line: i + 1,
        new_line: j + 1,
        text: old[i].to_string(),
    };

    while i < old.len() && j < new.len() {
        if old[i] == new[j] {
            ops.push(unchanged(i, j));
            i += 1;
            j += 1;
            continue;
        }

        if let Some(k) = find_ahead(&new, j, old[i]) {
            ops.extend((j..k).map(|n| DiffOp::Added {
                new_line: n + 1,
                text: new[n].to_string(),
            }));
            ops.push(unchanged(i, k));
            i += 1;
            j = k + 1;
        } else if let Some(k) = find_ahead(&old, i, new[j]) {
            ops.extend((i..k).map(|o| DiffOp::Removed {
                old_line: o + 1,
                text: old[o].to_string(),
            }));
            ops.push(unchanged(k, j));
            i = k + 1;
            j += 1;
        } else {
            ops.push(DiffOp::Modified {
                old_line: i + 1,
                new_line: j + 1,
                old: old[i].to_string(),
                new: new[j].to_string(),
            });
            i += 1;
            j += 1;
        }
    }

    ops.extend((i..old.len()).map(|o| DiffOp::Removed {
        old_line: o + 1,
        text: old[o].to_string(),
    }));
    ops.extend((j..new.len()).map(|n| DiffOp::Added {
        new_line: n + 1,
        text: new[n].to_string(),
    }));
    ops
}

/// Diff two texts line by line with [`greedy_diff`].
pub fn greedy_diff_text(old: &str, new: &str) -> Vec<DiffOp> {
    let old: Vec<&str> = old.lines().collect();
    let new: Vec<&str> = new.lines().collect();
    greedy_diff(&old, &new)
}

/// Index of `needle` in `lines[from + 1..=from + LOOKAHEAD]`.
fn find_ahead(lines: &[&str], from: usize, needle: &str) -> Option<usize> {
    let end = (from + LOOKAHEAD + 1).min(lines.len());
    (from + 1..end).find(|&k| lines[k] == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(ops: &[DiffOp]) -> String {
        ops.iter()
            .map(|op| match op {
                DiffOp::Unchanged { .. } => '=',
                DiffOp::Added { .. } => '+',
                DiffOp::Removed { .. } => '-',
                DiffOp::Modified { .. } => '~',
            })
            .collect()
    }

    #[test]
    fn test_identical() {
        let ops = greedy_diff(&["a", "b"], &["a", "b"]);
        assert_eq!(kinds(&ops), "==");
    }

    #[test]
    fn test_insertion_within_lookahead() {
        let ops = greedy_diff(&["a", "b"], &["x", "y", "a", "b"]);
        assert_eq!(kinds(&ops), "++==");
        assert_eq!(
            ops[2],
            DiffOp::Unchanged {
                old_line: 1,
                new_line: 3,
                text: "a".to_string()
            }
        );
    }

    #[test]
    fn test_removal_within_lookahead() {
        let ops = greedy_diff(&["a", "x", "b"], &["a", "b"]);
        assert_eq!(kinds(&ops), "=-=");
        assert_eq!(
            ops[1],
            DiffOp::Removed {
                old_line: 2,
                text: "x".to_string()
            }
        );
    }

    #[test]
    fn test_modification() {
        let ops = greedy_diff(&["a", "b", "c"], &["a", "B", "c"]);
        assert_eq!(kinds(&ops), "=~=");
    }

    #[test]
    fn test_lookahead_is_bounded() {
        // The match sits six lines ahead, out of reach.
        let old = ["a", "b"];
        let new = ["1", "2", "3", "4", "5", "6", "a", "b"];
        let ops = greedy_diff(&old, &new);
        assert_eq!(kinds(&ops), "~~++++++");
    }

    #[test]
    fn test_tails() {
        assert_eq!(kinds(&greedy_diff(&["a", "b", "c"], &["a"])), "=--");
        assert_eq!(kinds(&greedy_diff::<&str>(&[], &["a", "b"])), "++");
    }
}
