//! Version chains: the deduplicated history of one symbol.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;

use crate::analysis::{
    extract_from_model, get_analyzer, parse_source, ExtractionQuery, Language, SymbolIdentity,
};
use crate::diff::{greedy_diff_text, line_diff, DiffOp, LineChange, WhitespaceMode};
use crate::history::{CommitInfo, Snapshot};

/// A symbol's text at one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub commit: CommitInfo,
    /// File path at that commit.
    pub path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
}

/// Line changes between two retained versions, addressed in the segment
/// texts' own line numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDiff {
    pub from_commit: String,
    pub to_commit: String,
    pub changes: Vec<LineChange>,
}

/// Retained versions of one symbol in chronological order, and the diff
/// that led to each version after the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionChain {
    pub identity: SymbolIdentity,
    pub versions: Vec<Version>,
    /// `transitions[i]` leads from `versions[i]` to `versions[i + 1]`.
    pub transitions: Vec<LineDiff>,
}

impl VersionChain {
    /// The most recent retained version.
    pub fn final_version(&self) -> Option<&Version> {
        self.versions.last()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Versions most recent first, each with the transition that produced it.
    pub fn newest_first(&self) -> impl Iterator<Item = (&Version, Option<&LineDiff>)> {
        self.versions
            .iter()
            .enumerate()
            .rev()
            .map(move |(i, v)| (v, i.checked_sub(1).and_then(|t| self.transitions.get(t))))
    }

    /// Resolve a version selector: a commit id prefix, or a 1-based
    /// chronological index.
    pub fn find_version(&self, selector: &str) -> Option<usize> {
        let selector = selector.trim();
        if selector.is_empty() {
            return None;
        }
        self.versions
            .iter()
            .position(|v| v.commit.commit_id.starts_with(selector))
            .or_else(|| {
                selector
                    .parse::<usize>()
                    .ok()
                    .filter(|&n| n >= 1 && n <= self.versions.len())
                    .map(|n| n - 1)
            })
    }
}

/// Build a chain from one identity's versions in chronological order.
///
/// The first version is always kept. A later version is dropped when it
/// differs from the last kept one only in whitespace; comparison continues
/// against that same kept version.
pub fn build_chain(identity: SymbolIdentity, candidates: Vec<Version>) -> Option<VersionChain> {
    let mut candidates = candidates.into_iter();
    let first = candidates.next()?;
    let mut versions = vec![first];
    let mut transitions = Vec::new();

    for candidate in candidates {
        let Some(anchor) = versions.last() else { break };
        let changes = line_diff(&anchor.content, &candidate.content, WhitespaceMode::Ignore);
        if changes.is_empty() {
            tracing::trace!(symbol = %identity, commit = candidate.commit.short_id(), "no change");
            continue;
        }
        transitions.push(LineDiff {
            from_commit: anchor.commit.commit_id.clone(),
            to_commit: candidate.commit.commit_id.clone(),
            changes,
        });
        versions.push(candidate);
    }

    Some(VersionChain {
        identity,
        versions,
        transitions,
    })
}

/// Two-way greedy comparison of retained versions `from` and `to`
/// (0-based). `None` when either index is out of range.
pub fn compare(chain: &VersionChain, from: usize, to: usize) -> Option<Vec<DiffOp>> {
    let old = chain.versions.get(from)?;
    let new = chain.versions.get(to)?;
    Some(greedy_diff_text(&old.content, &new.content))
}

/// Every symbol of one file traced across its history.
#[derive(Debug, Clone, Serialize)]
pub struct Timeline {
    pub path: String,
    pub language: Language,
    /// Number of snapshots examined.
    pub snapshots: usize,
    /// Sorted by identity.
    pub chains: Vec<VersionChain>,
}

impl Timeline {
    /// Extract every snapshot and build one chain per symbol identity.
    ///
    /// `snapshots` must be chronological. Extraction runs per snapshot and
    /// chain building per identity, both on the rayon pool.
    pub fn build(
        language: Language,
        path: &str,
        snapshots: &[Snapshot],
        query: &ExtractionQuery,
        tolerance: f64,
    ) -> Self {
        let analyzer = get_analyzer(language);

        let extracted: Vec<Vec<(SymbolIdentity, Version)>> = snapshots
            .par_iter()
            .map(|snapshot| {
                let model = parse_source(analyzer, &snapshot.path, snapshot.content.as_bytes(), tolerance);
                if model.is_heuristic() {
                    tracing::debug!(commit = snapshot.commit.short_id(), "heuristic extraction");
                }
                extract_from_model(&model, query)
                    .into_iter()
                    .map(|symbol| {
                        let version = Version {
                            commit: snapshot.commit.clone(),
                            path: snapshot.path.clone(),
                            start_line: symbol.start_line,
                            end_line: symbol.end_line,
                            content: symbol.content(&snapshot.content),
                        };
                        (symbol.identity(), version)
                    })
                    .collect()
            })
            .collect();

        let mut grouped: BTreeMap<SymbolIdentity, Vec<Version>> = BTreeMap::new();
        for symbols in extracted {
            let mut seen = Vec::new();
            for (identity, version) in symbols {
                // Repeated declarations within one snapshot: the first wins.
                if seen.contains(&identity) {
                    continue;
                }
                seen.push(identity.clone());
                grouped.entry(identity).or_default().push(version);
            }
        }

        let chains: Vec<VersionChain> = grouped
            .into_par_iter()
            .filter_map(|(identity, versions)| build_chain(identity, versions))
            .collect();

        tracing::debug!(path, chains = chains.len(), snapshots = snapshots.len(), "built timeline");

        Timeline {
            path: path.to_string(),
            language,
            snapshots: snapshots.len(),
            chains,
        }
    }

    /// Chains whose symbol is called `name`.
    pub fn chains_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a VersionChain> {
        self.chains.iter().filter(move |c| c.identity.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SymbolKind;
    use crate::diff::ChangeKind;

    fn commit(id: &str) -> CommitInfo {
        CommitInfo {
            commit_id: id.to_string(),
            author: "dev".to_string(),
            timestamp: 0,
            message: String::new(),
        }
    }

    fn version(id: &str, content: &str) -> Version {
        Version {
            commit: commit(id),
            path: "calc.py".to_string(),
            start_line: 1,
            end_line: content.lines().count(),
            content: content.to_string(),
        }
    }

    fn identity() -> SymbolIdentity {
        SymbolIdentity {
            name: "add".to_string(),
            kind: SymbolKind::Function,
        }
    }

    #[test]
    fn test_whitespace_only_versions_are_dropped() {
        let chain = build_chain(
            identity(),
            vec![
                version("c1", "def add(a, b):\n    return a + b"),
                version("c2", "def add(a, b):   \n    return a + b  "),
                version("c3", "def add(a, b):\n    log(a, b)\n    return a + b"),
            ],
        )
        .unwrap();

        let ids: Vec<_> = chain.versions.iter().map(|v| v.commit.commit_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c3"]);
        assert_eq!(chain.transitions.len(), 1);
        assert_eq!(chain.transitions[0].from_commit, "c1");
        assert_eq!(chain.transitions[0].changes.len(), 1);
        assert_eq!(chain.transitions[0].changes[0].kind, ChangeKind::Add);
        assert_eq!(chain.transitions[0].changes[0].line, 2);
    }

    #[test]
    fn test_comparison_anchors_on_last_retained() {
        // c3 matches c1 after c2 was dropped, so it is dropped too.
        let chain = build_chain(
            identity(),
            vec![
                version("c1", "x = 1"),
                version("c2", "x = 1 "),
                version("c3", "x  =  1"),
                version("c4", "x = 2"),
            ],
        )
        .unwrap();
        assert_eq!(chain.versions.len(), 2);
        assert_eq!(chain.transitions[0].from_commit, "c1");
        assert_eq!(chain.transitions[0].to_commit, "c4");
    }

    #[test]
    fn test_adjacent_retained_versions_differ() {
        let contents = ["a", "a ", "b", " b", "c", "c", "a"];
        let candidates = contents
            .iter()
            .enumerate()
            .map(|(i, c)| version(&format!("c{i}"), c))
            .collect();
        let chain = build_chain(identity(), candidates).unwrap();

        assert_eq!(chain.versions[0].commit.commit_id, "c0");
        assert_eq!(chain.transitions.len(), chain.versions.len() - 1);
        for pair in chain.versions.windows(2) {
            assert!(!line_diff(&pair[0].content, &pair[1].content, WhitespaceMode::Ignore).is_empty());
        }
    }

    #[test]
    fn test_empty_candidates() {
        assert!(build_chain(identity(), Vec::new()).is_none());
    }

    #[test]
    fn test_newest_first_pairs_transitions() {
        let chain = build_chain(identity(), vec![version("c1", "a"), version("c2", "b")]).unwrap();
        let order: Vec<_> = chain
            .newest_first()
            .map(|(v, t)| (v.commit.commit_id.as_str(), t.map(|t| t.from_commit.as_str())))
            .collect();
        assert_eq!(order, vec![("c2", Some("c1")), ("c1", None)]);
    }

    #[test]
    fn test_find_version_and_compare() {
        let chain = build_chain(
            identity(),
            vec![version("abc123", "a\nb"), version("def456", "a\nB")],
        )
        .unwrap();
        assert_eq!(chain.find_version("def"), Some(1));
        assert_eq!(chain.find_version("1"), Some(0));
        assert_eq!(chain.find_version("3"), None);

        let ops = compare(&chain, 0, 1).unwrap();
        assert!(ops[0].is_unchanged());
        assert!(matches!(ops[1], DiffOp::Modified { .. }));
        assert!(compare(&chain, 0, 5).is_none());
    }

    #[test]
    fn test_timeline_groups_by_identity() {
        let snapshot = |id: &str, content: &str| Snapshot {
            commit: commit(id),
            path: "calc.py".to_string(),
            content: content.to_string(),
        };
        let snapshots = vec![
            snapshot("c1", "def add(a, b):\n    return a + b\n"),
            snapshot("c2", "def add(a, b):\n    return a + b\n\ndef sub(a, b):\n    return a - b\n"),
            snapshot("c3", "def add(a, b):\n    return b + a\n\ndef sub(a, b):\n    return a - b\n"),
        ];
        let timeline = Timeline::build(
            Language::Python,
            "calc.py",
            &snapshots,
            &ExtractionQuery::all(),
            1.0,
        );

        assert_eq!(timeline.snapshots, 3);
        let add = timeline.chains_named("add").next().unwrap();
        let ids: Vec<_> = add.versions.iter().map(|v| v.commit.commit_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c3"]);

        let sub = timeline.chains_named("sub").next().unwrap();
        assert_eq!(sub.versions.len(), 1);
        assert_eq!(sub.versions[0].commit.commit_id, "c2");
        assert_eq!(sub.versions[0].start_line, 4);
    }
}
