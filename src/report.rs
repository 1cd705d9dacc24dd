//! Output formatting for codelineage results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::Serialize;

use crate::analysis::{FileSymbols, ProjectReference, Symbol, SymbolIdentity};
use crate::config::MAX_SHADES;
use crate::diff::{ChangeKind, DiffOp, LineChange};
use crate::evolution::{CompressedView, Timeline, VersionChain};

// =============================================================================
// Shade buckets
// =============================================================================

/// Cosmetic bucket in `1..=shades` for a 0-based transition index, so older
/// transitions render lighter than newer ones.
pub fn shade_bucket(transition: usize, transition_count: usize, shades: usize) -> usize {
    let shades = shades.clamp(1, MAX_SHADES);
    let bucket = 1 + transition * shades / transition_count.max(1);
    bucket.clamp(1, shades)
}

/// Light to dark blue, one entry per bucket.
const SHADE_PALETTE: [(u8, u8, u8); MAX_SHADES] = [
    (198, 219, 239),
    (170, 201, 230),
    (140, 182, 220),
    (110, 162, 210),
    (85, 142, 200),
    (62, 120, 188),
    (44, 100, 172),
    (30, 80, 152),
    (20, 60, 130),
];

fn shaded(text: &str, bucket: usize) -> ColoredString {
    let (r, g, b) = SHADE_PALETTE[bucket.clamp(1, MAX_SHADES) - 1];
    text.truecolor(r, g, b)
}

// =============================================================================
// JSON Format
// =============================================================================

/// One extracted symbol on the wire.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    pub line_count: usize,
}

impl SymbolRecord {
    pub fn new(symbol: &Symbol, source: &str) -> Self {
        Self {
            kind: symbol.kind.as_str().to_string(),
            name: symbol.name.clone(),
            start_line: symbol.start_line,
            end_line: symbol.end_line,
            content: symbol.content(source),
            parent: symbol.parent.clone(),
            extends: symbol.extends.clone(),
            line_count: symbol.line_count(),
        }
    }
}

pub fn symbol_records(file: &FileSymbols) -> Vec<SymbolRecord> {
    file.symbols
        .iter()
        .map(|s| SymbolRecord::new(s, &file.source))
        .collect()
}

/// One retained version on the wire.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub commit_id: String,
    pub author: String,
    pub timestamp: i64,
    pub message: String,
    pub path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    /// Changes that produced this version; absent on the first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<Vec<LineChange>>,
    /// Shade bucket of the transition that produced this version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shade: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainRecord {
    #[serde(flatten)]
    pub identity: SymbolIdentity,
    pub version_count: usize,
    pub versions: Vec<VersionRecord>,
    pub compressed: CompressedView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineReport {
    pub version: String,
    pub path: String,
    pub language: String,
    pub snapshots: usize,
    pub newest_first: bool,
    pub symbols: Vec<ChainRecord>,
}

pub fn chain_record(chain: &VersionChain, newest_first: bool, shades: usize) -> ChainRecord {
    let count = chain.transition_count();
    let mut versions: Vec<VersionRecord> = chain
        .versions
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let transition = i.checked_sub(1);
            VersionRecord {
                commit_id: v.commit.commit_id.clone(),
                author: v.commit.author.clone(),
                timestamp: v.commit.timestamp,
                message: v.commit.message.clone(),
                path: v.path.clone(),
                start_line: v.start_line,
                end_line: v.end_line,
                content: v.content.clone(),
                changes: transition
                    .and_then(|t| chain.transitions.get(t))
                    .map(|d| d.changes.clone()),
                shade: transition.map(|t| shade_bucket(t, count, shades)),
            }
        })
        .collect();
    if newest_first {
        versions.reverse();
    }

    ChainRecord {
        identity: chain.identity.clone(),
        version_count: chain.versions.len(),
        versions,
        compressed: CompressedView::compose(chain),
    }
}

pub fn timeline_report(timeline: &Timeline, newest_first: bool, shades: usize) -> TimelineReport {
    TimelineReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        path: timeline.path.clone(),
        language: timeline.language.as_str().to_string(),
        snapshots: timeline.snapshots,
        newest_first,
        symbols: timeline
            .chains
            .iter()
            .map(|c| chain_record(c, newest_first, shades))
            .collect(),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompareReport<'a> {
    #[serde(flatten)]
    identity: &'a SymbolIdentity,
    from_commit: &'a str,
    to_commit: &'a str,
    ops: &'a [DiffOp],
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn write_symbols_json(file: &FileSymbols) -> anyhow::Result<()> {
    print_json(&symbol_records(file))
}

pub fn write_references_json(references: &[ProjectReference]) -> anyhow::Result<()> {
    print_json(&references)
}

pub fn write_timeline_json(timeline: &Timeline, newest_first: bool, shades: usize) -> anyhow::Result<()> {
    print_json(&timeline_report(timeline, newest_first, shades))
}

pub fn write_compare_json(
    chain: &VersionChain,
    from: usize,
    to: usize,
    ops: &[DiffOp],
) -> anyhow::Result<()> {
    let (Some(old), Some(new)) = (chain.versions.get(from), chain.versions.get(to)) else {
        anyhow::bail!("version out of range");
    };
    print_json(&CompareReport {
        identity: &chain.identity,
        from_commit: &old.commit.commit_id,
        to_commit: &new.commit.commit_id,
        ops,
    })
}

// =============================================================================
// Compressed view text
// =============================================================================

/// One printable line of a compressed view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedLine {
    pub line: usize,
    /// `' '` for final content, `'+'` or `'-'` for historical changes.
    pub marker: char,
    pub text: String,
    pub shade: Option<usize>,
}

impl CompressedLine {
    pub fn plain(&self) -> String {
        format!("L{}: {} {}", self.line, self.marker, self.text)
    }
}

/// Flatten a compressed view: each line's final text, then the changes
/// bucketed at that line in transition order.
pub fn compressed_lines(view: &CompressedView, shades: usize) -> Vec<CompressedLine> {
    let mut out = Vec::new();
    for row in view.rows() {
        if let Some(text) = row.text {
            out.push(CompressedLine {
                line: row.line,
                marker: ' ',
                text: text.to_string(),
                shade: None,
            });
        }
        for tagged in row.changes {
            out.push(CompressedLine {
                line: row.line,
                marker: match tagged.change.kind {
                    ChangeKind::Add => '+',
                    ChangeKind::Delete => '-',
                },
                text: tagged.change.content.clone(),
                shade: Some(shade_bucket(tagged.transition, view.transition_count, shades)),
            });
        }
    }
    out
}

/// Plain-text compressed view, one `L<n>: <marker> <text>` line each.
pub fn render_compressed(view: &CompressedView, shades: usize) -> String {
    compressed_lines(view, shades)
        .iter()
        .map(CompressedLine::plain)
        .collect::<Vec<_>>()
        .join("\n")
}

// =============================================================================
// Pretty Format
// =============================================================================

fn write_header(title: &str, path: &str) {
    println!();
    print!("  ");
    print!("{}", "codelineage".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();
    print!("  {}", format!("{:<10}", title).dimmed());
    println!("{}", path);
    println!();
}

pub fn write_symbols_pretty(file: &FileSymbols) {
    write_header("Symbols:", &file.path);
    if file.heuristic {
        println!("  {}", "(best-effort extraction, parse failed)".yellow());
        println!();
    }

    if file.symbols.is_empty() {
        println!("  {}", "No symbols found".dimmed());
        println!();
        return;
    }

    println!("  {} ({}):", "Symbols".bold(), file.symbols.len());
    println!();
    for symbol in &file.symbols {
        print!("    {:<10}", symbol.kind.as_str().dimmed());
        print!("{}", symbol.name.blue());
        print!("{}", format!(":{}-{}", symbol.start_line, symbol.end_line).dimmed());
        if let Some(ref base) = symbol.extends {
            print!("  {}", format!("extends {}", base).dimmed());
        }
        println!();
    }
    println!();
}

pub fn write_references_pretty(target: &str, references: &[ProjectReference]) {
    write_header("Target:", target);

    if references.is_empty() {
        println!("  {}", "No references found".dimmed());
        println!();
        return;
    }

    println!("  {} ({}):", "References".bold(), references.len());
    let mut current_file: Option<&str> = None;
    for r in references {
        if current_file != Some(r.file.as_str()) {
            println!();
            println!("    {}", r.file.blue());
            current_file = Some(r.file.as_str());
        }
        print!("      {:<6}", format!("{}", r.reference.line).dimmed());
        print!("{:<14}", r.reference.usage.as_str());
        print!("{}", r.reference.symbol.bold());
        if let Some(ref context) = r.reference.context {
            print!("  {}", format!("in {}", context).dimmed());
        }
        println!();
    }
    println!();
}

pub fn write_timeline_pretty(timeline: &Timeline, newest_first: bool, shades: usize) {
    write_header("History:", &timeline.path);
    println!(
        "  {}",
        format!(
            "{} snapshots, {} symbols",
            timeline.snapshots,
            timeline.chains.len()
        )
        .dimmed()
    );
    println!();

    for chain in &timeline.chains {
        write_chain_pretty(chain, newest_first, shades);
    }
}

fn write_chain_pretty(chain: &VersionChain, newest_first: bool, shades: usize) {
    let plural = if chain.versions.len() != 1 { "s" } else { "" };
    println!(
        "  {} {}  {}",
        chain.identity.kind.as_str().dimmed(),
        chain.identity.name.bold(),
        format!("({} version{})", chain.versions.len(), plural).dimmed()
    );

    let record = chain_record(chain, newest_first, shades);
    for v in &record.versions {
        let id = v.commit_id.get(..8).unwrap_or(&v.commit_id);
        let tag = match v.shade {
            Some(bucket) => shaded(id, bucket),
            None => id.normal(),
        };
        print!("    {}  ", tag);
        print!("{:<16}", v.author.dimmed());
        print!("{}", v.message);
        if let Some(ref changes) = v.changes {
            let added = changes.iter().filter(|c| c.kind == ChangeKind::Add).count();
            let deleted = changes.len() - added;
            print!("  {}", format!("+{}", added).green());
            print!(" {}", format!("-{}", deleted).red());
        }
        println!();
    }
    println!();

    for line in compressed_lines(&record.compressed, shades) {
        let prefix = format!("    L{:<5}", format!("{}:", line.line));
        match (line.marker, line.shade) {
            ('+', Some(bucket)) => println!("{}{}", prefix.dimmed(), shaded(&format!("+ {}", line.text), bucket)),
            ('-', Some(bucket)) => println!("{}{}", prefix.dimmed(), shaded(&format!("- {}", line.text), bucket).strikethrough()),
            _ => println!("{}  {}", prefix.dimmed(), line.text),
        }
    }
    println!();
}

pub fn write_compare_pretty(chain: &VersionChain, from: usize, to: usize, ops: &[DiffOp]) {
    let label = |i: usize| {
        chain
            .versions
            .get(i)
            .map(|v| v.commit.short_id().to_string())
            .unwrap_or_default()
    };
    write_header("Compare:", &chain.identity.to_string());
    println!("  {} {} {}", label(from).dimmed(), "→".dimmed(), label(to));
    println!();

    for op in ops {
        match op {
            DiffOp::Unchanged { new_line, text, .. } => {
                println!("    {:>5}   {}", new_line, text);
            }
            DiffOp::Added { new_line, text } => {
                println!("    {:>5} {}", new_line, format!("+ {}", text).green());
            }
            DiffOp::Removed { old_line, text } => {
                println!("    {:>5} {}", format!("({})", old_line).dimmed(), format!("- {}", text).red());
            }
            DiffOp::Modified { new_line, old, new, .. } => {
                println!("    {:>5} {}", "", format!("- {}", old).red());
                println!("    {:>5} {}", new_line, format!("+ {}", new).green());
            }
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SymbolKind;
    use crate::evolution::{build_chain, Version};
    use crate::history::CommitInfo;

    fn version(id: &str, content: &str) -> Version {
        Version {
            commit: CommitInfo {
                commit_id: id.to_string(),
                author: "dev".to_string(),
                timestamp: 1,
                message: format!("commit {id}"),
            },
            path: "a.py".to_string(),
            start_line: 1,
            end_line: content.lines().count(),
            content: content.to_string(),
        }
    }

    fn sample_chain() -> VersionChain {
        build_chain(
            SymbolIdentity {
                name: "f".to_string(),
                kind: SymbolKind::Function,
            },
            vec![
                version("c1", "def f():\n    a()\n    b()"),
                version("c2", "def f():\n    b()"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_shade_bucket_range() {
        assert_eq!(shade_bucket(0, 0, 9), 1);
        assert_eq!(shade_bucket(0, 3, 9), 1);
        assert_eq!(shade_bucket(2, 3, 9), 7);
        for t in 0..50 {
            let b = shade_bucket(t, 50, 9);
            assert!((1..=9).contains(&b));
        }
        assert_eq!(shade_bucket(5, 3, 9), 9);
        assert_eq!(shade_bucket(1, 2, 40), 5);
    }

    #[test]
    fn test_render_compressed() {
        let view = CompressedView::compose(&sample_chain());
        let text = render_compressed(&view, 9);
        assert_eq!(text, "L1:   def f():\nL2:       b()\nL2: -     a()");
    }

    #[test]
    fn test_chain_record_ordering() {
        let chain = sample_chain();
        let record = chain_record(&chain, true, 9);
        assert_eq!(record.versions[0].commit_id, "c2");
        assert!(record.versions[0].changes.is_some());
        assert_eq!(record.versions[0].shade, Some(1));
        assert!(record.versions[1].changes.is_none());

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["name"], "f");
        assert_eq!(json["kind"], "function");
        assert_eq!(json["versionCount"], 2);
        assert_eq!(json["versions"][0]["changes"][0]["kind"], "delete");
        assert_eq!(json["compressed"]["changesByLine"]["2"][0]["transition"], 0);

        let chronological = chain_record(&chain, false, 9);
        assert_eq!(chronological.versions[0].commit_id, "c1");
    }
}
