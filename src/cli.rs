//! Command-line interface for codelineage.

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analysis::{AnalysisContext, ExtractionQuery, Symbol};
use crate::config::Config;
use crate::error::Error;
use crate::evolution::{self, Timeline};
use crate::history::{self, GitCli};
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Trace how code elements changed over history and where they are used.
///
/// Codelineage extracts classes, functions, methods, constants and other
/// named elements from JavaScript, TypeScript, Python, shell, PowerShell and
/// R sources, follows each one through the file's git history, and finds
/// its uses across a project.
#[derive(Parser)]
#[command(name = "codelineage")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the symbols a file declares
    Symbols(SymbolsArgs),
    /// Find uses of a file's symbols across a project
    #[command(visible_alias = "refs")]
    References(ReferencesArgs),
    /// Trace every symbol of a file through its git history
    #[command(visible_alias = "history")]
    Evolution(EvolutionArgs),
    /// Compare two historical versions of one symbol
    Compare(CompareArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}

/// Options shared by every command.
#[derive(Parser)]
pub struct CommonArgs {
    /// Extraction query as JSON, or @file to read it from a file
    #[arg(short, long)]
    pub query: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    /// Path to configuration YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Parser)]
pub struct SymbolsArgs {
    /// Source file to analyze
    pub file: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Parser)]
pub struct ReferencesArgs {
    /// Source file declaring the target symbols
    pub file: PathBuf,

    /// Project directory to scan
    pub project: PathBuf,

    /// Only look for symbols with this name
    #[arg(short, long)]
    pub symbol: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Parser)]
pub struct EvolutionArgs {
    /// Tracked source file
    pub file: PathBuf,

    /// Only examine the most recent N commits
    #[arg(short = 'n', long)]
    pub max_commits: Option<usize>,

    /// List versions oldest first
    #[arg(long)]
    pub oldest_first: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Parser)]
pub struct CompareArgs {
    /// Tracked source file
    pub file: PathBuf,

    /// Symbol name
    pub symbol: String,

    /// Older version: commit id prefix or 1-based version number
    pub from: String,

    /// Newer version: commit id prefix or 1-based version number
    pub to: String,

    /// Only examine the most recent N commits
    #[arg(short = 'n', long)]
    pub max_commits: Option<usize>,

    #[command(flatten)]
    pub common: CommonArgs,
}

fn load_config(common: &CommonArgs) -> anyhow::Result<Config> {
    let cwd = std::env::current_dir()?;
    Ok(Config::load(common.config.as_deref(), &cwd)?)
}

fn load_query(common: &CommonArgs) -> anyhow::Result<ExtractionQuery> {
    let Some(raw) = common.query.as_deref() else {
        return Ok(ExtractionQuery::all());
    };
    let json = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)?,
        None => raw.to_string(),
    };
    Ok(ExtractionQuery::from_json(&json)?)
}

fn resolve_file(path: &Path) -> anyhow::Result<PathBuf> {
    path.canonicalize()
        .map_err(|e| anyhow::anyhow!("cannot access {}: {}", path.display(), e))
}

fn spinner(message: &str, format: OutputFormat) -> ProgressBar {
    if format == OutputFormat::Json {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner().with_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Run the symbols command.
pub fn run_symbols(args: &SymbolsArgs) -> anyhow::Result<i32> {
    let config = load_config(&args.common)?;
    let query = load_query(&args.common)?;
    let file = resolve_file(&args.file)?;
    let base = file.parent().unwrap_or(Path::new(".")).to_path_buf();

    let ctx = AnalysisContext::new(base, config)?;
    let symbols = ctx.extract_file(&file, &query)?;

    match args.common.format {
        OutputFormat::Json => report::write_symbols_json(&symbols)?,
        OutputFormat::Pretty => report::write_symbols_pretty(&symbols),
    }
    Ok(EXIT_SUCCESS)
}

/// Run the references command.
pub fn run_references(args: &ReferencesArgs) -> anyhow::Result<i32> {
    let config = load_config(&args.common)?;
    let query = load_query(&args.common)?;
    let file = resolve_file(&args.file)?;
    let project = resolve_file(&args.project)?;

    let ctx = AnalysisContext::new(&project, config)?;
    let declared = ctx.extract_file(&file, &query)?;
    let targets: Vec<Symbol> = declared
        .symbols
        .into_iter()
        .filter(|s| match &args.symbol {
            Some(name) => s.name == *name || s.bare_name() == name,
            None => true,
        })
        .collect();

    if targets.is_empty() {
        eprintln!("Warning: no matching symbols in {}", args.file.display());
        return Ok(EXIT_FAILED);
    }

    let total = ctx.project_files(declared.language).len();
    let pb = if args.common.format == OutputFormat::Json {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    };

    let references = ctx.find_project_references(&targets, declared.language, |_| pb.inc(1));
    pb.finish_and_clear();

    match args.common.format {
        OutputFormat::Json => report::write_references_json(&references)?,
        OutputFormat::Pretty => {
            report::write_references_pretty(&args.file.to_string_lossy(), &references)
        }
    }
    Ok(EXIT_SUCCESS)
}

/// Load history and build the timeline shared by evolution and compare.
fn build_timeline(
    file: &Path,
    config: &Config,
    query: &ExtractionQuery,
    max_commits: Option<usize>,
    format: OutputFormat,
) -> anyhow::Result<Timeline> {
    let language = config
        .language_for(file)
        .ok_or_else(|| Error::UnsupportedLanguage(file.display().to_string()))?;
    let git = GitCli::discover(file)?;
    let rel_path = git.relative_path(file)?;

    let pb = spinner("Reading history", format);
    let snapshots = history::collect_snapshots(&git, &rel_path, max_commits.or(config.max_commits));
    pb.set_message("Extracting symbols");
    let timeline = snapshots.map(|snapshots| {
        Timeline::build(language, &rel_path, &snapshots, query, config.error_tolerance())
    });
    pb.finish_and_clear();

    let timeline = timeline?;
    if timeline.snapshots == 0 {
        anyhow::bail!("no history for {}", rel_path);
    }
    Ok(timeline)
}

/// Run the evolution command.
pub fn run_evolution(args: &EvolutionArgs) -> anyhow::Result<i32> {
    let config = load_config(&args.common)?;
    let query = load_query(&args.common)?;
    let file = resolve_file(&args.file)?;

    let timeline = build_timeline(&file, &config, &query, args.max_commits, args.common.format)?;
    let newest_first = !args.oldest_first && config.newest_first();

    match args.common.format {
        OutputFormat::Json => report::write_timeline_json(&timeline, newest_first, config.shades())?,
        OutputFormat::Pretty => report::write_timeline_pretty(&timeline, newest_first, config.shades()),
    }
    Ok(EXIT_SUCCESS)
}

/// Run the compare command.
pub fn run_compare(args: &CompareArgs) -> anyhow::Result<i32> {
    let config = load_config(&args.common)?;
    let query = load_query(&args.common)?;
    let file = resolve_file(&args.file)?;

    let timeline = build_timeline(&file, &config, &query, args.max_commits, args.common.format)?;
    let Some(chain) = timeline.chains_named(&args.symbol).next() else {
        eprintln!("Error: symbol {:?} not found in the history of {}", args.symbol, timeline.path);
        return Ok(EXIT_FAILED);
    };

    let (Some(from), Some(to)) = (chain.find_version(&args.from), chain.find_version(&args.to)) else {
        eprintln!(
            "Error: unknown version; {} has {} retained versions",
            chain.identity,
            chain.versions.len()
        );
        return Ok(EXIT_FAILED);
    };

    let ops = evolution::compare(chain, from, to)
        .ok_or_else(|| anyhow::anyhow!("version out of range"))?;

    match args.common.format {
        OutputFormat::Json => report::write_compare_json(chain, from, to, &ops)?,
        OutputFormat::Pretty => report::write_compare_pretty(chain, from, to, &ops),
    }
    Ok(EXIT_SUCCESS)
}
