//! Compressed view: the final version of a symbol annotated with every
//! historical line change.
//!
//! Changes are bucketed by the line number their own transition reported.
//! They are not remapped into the final version's numbering, so changes
//! from different transitions may share a bucket while referring to
//! different historical lines.

use std::collections::BTreeMap;

use serde::Serialize;

use super::VersionChain;
use crate::diff::LineChange;

/// A line change tagged with the transition that made it (0-based,
/// chronological).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaggedChange {
    #[serde(flatten)]
    pub change: LineChange,
    pub transition: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressedView {
    pub final_lines: Vec<String>,
    pub changes_by_line: BTreeMap<usize, Vec<TaggedChange>>,
    pub transition_count: usize,
}

/// One rendered line of a [`CompressedView`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row<'a> {
    pub line: usize,
    /// Final text at this line, if the final version reaches it.
    pub text: Option<&'a str>,
    pub changes: &'a [TaggedChange],
}

impl CompressedView {
    pub fn compose(chain: &VersionChain) -> Self {
        let final_lines = chain
            .final_version()
            .map(|v| v.content.lines().map(str::to_string).collect())
            .unwrap_or_default();

        let mut changes_by_line: BTreeMap<usize, Vec<TaggedChange>> = BTreeMap::new();
        for (transition, diff) in chain.transitions.iter().enumerate() {
            for change in &diff.changes {
                changes_by_line
                    .entry(change.line)
                    .or_default()
                    .push(TaggedChange {
                        change: change.clone(),
                        transition,
                    });
            }
        }

        Self {
            final_lines,
            changes_by_line,
            transition_count: chain.transition_count(),
        }
    }

    /// Highest line the view covers: the final length or the highest line
    /// any transition touched, whichever is larger.
    pub fn span(&self) -> usize {
        let touched = self.changes_by_line.keys().next_back().copied().unwrap_or(0);
        self.final_lines.len().max(touched)
    }

    /// Every final line, then every changed line past the end of the final
    /// version, in line order.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        (1..=self.span()).filter_map(move |line| {
            let text = self.final_lines.get(line - 1).map(String::as_str);
            let changes = self
                .changes_by_line
                .get(&line)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            (text.is_some() || !changes.is_empty()).then_some(Row { line, text, changes })
        })
    }

    pub fn changes_at(&self, line: usize) -> &[TaggedChange] {
        self.changes_by_line.get(&line).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{SymbolIdentity, SymbolKind};
    use crate::diff::ChangeKind;
    use crate::evolution::{build_chain, Version};
    use crate::history::CommitInfo;

    fn numbered(count: usize) -> String {
        (1..=count).map(|n| format!("line {n}")).collect::<Vec<_>>().join("\n")
    }

    fn version(id: &str, content: String) -> Version {
        Version {
            commit: CommitInfo {
                commit_id: id.to_string(),
                author: "dev".to_string(),
                timestamp: 0,
                message: String::new(),
            },
            path: "big.py".to_string(),
            start_line: 1,
            end_line: content.lines().count(),
            content,
        }
    }

    fn chain(contents: Vec<String>) -> VersionChain {
        let identity = SymbolIdentity {
            name: "big".to_string(),
            kind: SymbolKind::Function,
        };
        let versions = contents
            .into_iter()
            .enumerate()
            .map(|(i, c)| version(&format!("c{i}"), c))
            .collect();
        build_chain(identity, versions).unwrap()
    }

    #[test]
    fn test_span_covers_touched_lines_past_final_length() {
        let view = CompressedView::compose(&chain(vec![numbered(500), numbered(22)]));

        assert_eq!(view.final_lines.len(), 22);
        assert_eq!(view.span(), 500);
        assert!(!view.changes_at(500).is_empty());
        assert_eq!(view.rows().last().map(|r| r.line), Some(500));
    }

    #[test]
    fn test_early_deletion_survives_later_shrink() {
        let mut middle = numbered(700);
        middle.push_str("\nappended");
        let view = CompressedView::compose(&chain(vec![numbered(700), middle, numbered(22)]));

        assert_eq!(view.transition_count, 2);
        let at_650 = view.changes_at(650);
        assert_eq!(at_650.len(), 1);
        assert_eq!(at_650[0].change.kind, ChangeKind::Delete);
        assert_eq!(at_650[0].change.content, "line 650");
        assert_eq!(at_650[0].transition, 1);

        let at_701 = view.changes_at(701);
        assert_eq!(at_701.len(), 2);
        assert_eq!(at_701[0].transition, 0);
        assert_eq!(at_701[0].change.kind, ChangeKind::Add);
    }

    #[test]
    fn test_rows_skip_untouched_lines_past_final() {
        let view = CompressedView::compose(&chain(vec![
            "a\nb\nc\nd".to_string(),
            "a\nb".to_string(),
        ]));
        let rows: Vec<_> = view.rows().map(|r| (r.line, r.text, r.changes.len())).collect();
        assert_eq!(
            rows,
            vec![(1, Some("a"), 0), (2, Some("b"), 0), (3, None, 1), (4, None, 1)]
        );
    }

    #[test]
    fn test_single_version_has_no_changes() {
        let view = CompressedView::compose(&chain(vec!["a\nb".to_string()]));
        assert_eq!(view.transition_count, 0);
        assert!(view.changes_by_line.is_empty());
        assert_eq!(view.span(), 2);
    }
}
