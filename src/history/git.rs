//! History from the `git` command line.
//!
//! ## Log format
//!
//! `git log --follow --name-only` with a custom format. Every record starts
//! with a `\x1e` byte and a `\x1f`-separated header, followed by the path of
//! the file at that commit:
//!
//! ```text
//! \x1eHASH\x1fAUTHOR\x1fTIMESTAMP\x1fSUBJECT
//!
//! src/calc.py
//! ```

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use super::{CommitInfo, FileRevision, HistoryProvider};
use crate::error::{Error, Result};

const RECORD_SEPARATOR: char = '\x1e';
const FIELD_SEPARATOR: char = '\x1f';
const LOG_FORMAT: &str = "--format=%x1e%H%x1f%an%x1f%at%x1f%s";

/// History provider backed by the `git` binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_root: PathBuf,
}

impl GitCli {
    pub fn new<P: AsRef<Path>>(repo_root: P) -> Self {
        Self {
            repo_root: repo_root.as_ref().to_path_buf(),
        }
    }

    /// Find the repository containing `path`.
    pub fn discover(path: &Path) -> Result<Self> {
        let dir = if path.is_dir() {
            path
        } else {
            path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."))
        };
        let output = run_git(dir, &["rev-parse", "--show-toplevel"])?;
        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(Self::new(root))
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// `path` relative to the repository root, with forward slashes.
    pub fn relative_path(&self, path: &Path) -> Result<String> {
        let abs = path.canonicalize()?;
        let root = self.repo_root.canonicalize()?;
        let rel = abs.strip_prefix(&root).map_err(|_| {
            Error::Git(format!("{} is outside {}", abs.display(), root.display()))
        })?;
        Ok(rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"))
    }
}

impl HistoryProvider for GitCli {
    fn history(&self, path: &str) -> Result<Vec<FileRevision>> {
        let output = run_git(
            &self.repo_root,
            &["log", "--follow", "--name-only", LOG_FORMAT, "--", path],
        )?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_log(&stdout, path))
    }

    fn content_at(&self, commit: &str, path: &str) -> Result<String> {
        let spec = format!("{}:{}", commit, path);
        let output = Command::new("git")
            .args(["show", &spec])
            .current_dir(&self.repo_root)
            .output()?;

        if !output.status.success() {
            tracing::debug!(
                commit,
                path,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "git show failed"
            );
            return Err(Error::MissingSnapshot {
                commit: commit.to_string(),
                path: path.to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn run_git(dir: &Path, args: &[&str]) -> Result<Output> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| Error::Git(format!("failed to run git: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Git(format!("git {} failed: {}", args.join(" "), stderr.trim())));
    }
    Ok(output)
}

/// Parse the custom log format. Records without a path fall back to
/// `default_path`; malformed records are skipped.
pub(crate) fn parse_log(output: &str, default_path: &str) -> Vec<FileRevision> {
    output
        .split(RECORD_SEPARATOR)
        .filter(|record| !record.trim().is_empty())
        .filter_map(|record| {
            let mut lines = record.lines();
            let header = lines.next()?;
            let mut fields = header.split(FIELD_SEPARATOR);
            let commit_id = fields.next()?.trim().to_string();
            let author = fields.next()?.to_string();
            let timestamp = fields.next()?.trim().parse().ok()?;
            let message = fields.collect::<Vec<_>>().join(" ");

            let path = lines
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .last()
                .unwrap_or(default_path)
                .to_string();

            Some(FileRevision {
                commit: CommitInfo {
                    commit_id,
                    author,
                    timestamp,
                    message,
                },
                path,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_follows_renames() {
        let output = "\x1ebbbb\x1fAda\x1f1700000100\x1fRename calc\n\nsrc/calc.py\n\
                      \x1eaaaa\x1fGrace\x1f1700000000\x1fAdd calc\n\nlib/calc.py\n";
        let revisions = parse_log(output, "src/calc.py");

        assert_eq!(revisions.len(), 2);
        assert_eq!(revisions[0].commit.commit_id, "bbbb");
        assert_eq!(revisions[0].path, "src/calc.py");
        assert_eq!(revisions[1].commit.author, "Grace");
        assert_eq!(revisions[1].commit.timestamp, 1_700_000_000);
        assert_eq!(revisions[1].commit.message, "Add calc");
        assert_eq!(revisions[1].path, "lib/calc.py");
    }

    #[test]
    fn test_parse_log_skips_malformed_records() {
        let output = "\x1ecccc\x1fAda\x1fnot-a-time\x1fBroken\n\nsrc/a.py\n\
                      \x1edddd\x1fAda\x1f5\x1fFine\n";
        let revisions = parse_log(output, "src/a.py");

        assert_eq!(revisions.len(), 1);
        assert_eq!(revisions[0].commit.commit_id, "dddd");
        assert_eq!(revisions[0].path, "src/a.py");
    }
}
