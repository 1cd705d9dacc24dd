//! Configuration file schema for codelineage.
//!
//! Configuration is optional. It is read from `codelineage.yaml` in the
//! working directory, or from the user config directory when the working
//! directory has none.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::analysis::{Language, DEFAULT_ERROR_TOLERANCE};
use crate::error::{Error, Result};

/// File name looked up in the working directory and the user config dir.
pub const CONFIG_FILE_NAME: &str = "codelineage.yaml";

/// Largest shade index used when coloring transitions.
pub const MAX_SHADES: usize = 9;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Glob patterns for paths to skip during project scans (e.g. "**/vendor/**").
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    /// Whether to scan dotfiles and dot-directories (default: false)
    #[serde(default)]
    pub include_hidden: Option<bool>,
    /// Cap on the number of commits read per file (default: unlimited)
    #[serde(default)]
    pub max_commits: Option<usize>,
    /// Extra extension → language mappings, e.g. `{ "jsm": "javascript" }`.
    #[serde(default)]
    pub extensions: BTreeMap<String, String>,
    #[serde(default)]
    pub parse: Option<ParseConfig>,
    #[serde(default)]
    pub report: Option<ReportConfig>,
}

/// Parser fallback settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ParseConfig {
    /// Share of error bytes a recovered tree may contain (default: 0.25)
    #[serde(default)]
    pub error_tolerance: Option<f64>,
}

/// Report rendering settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ReportConfig {
    /// Number of shade buckets, 1 to 9 (default: 9)
    #[serde(default)]
    pub shades: Option<usize>,
    /// List versions most recent first (default: true)
    #[serde(default)]
    pub newest_first: Option<bool>,
}

impl Config {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::parse_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse a configuration from YAML text.
    pub fn parse_str(content: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Find the configuration file for `dir`, if any.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        let local = dir.join(CONFIG_FILE_NAME);
        if local.is_file() {
            return Some(local);
        }
        ProjectDirs::from("", "", "codelineage")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .filter(|p| p.is_file())
    }

    /// Load the explicit file if given, else the discovered one, else defaults.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        match explicit.map(Path::to_path_buf).or_else(|| Self::discover(dir)) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading configuration");
                Self::parse_file(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Check patterns and mappings. Called on every parse.
    pub fn validate(&self) -> Result<()> {
        for pattern in &self.excluded_paths {
            Glob::new(pattern).map_err(|e| {
                Error::Config(format!("invalid excluded_paths pattern {:?}: {}", pattern, e))
            })?;
        }
        for (ext, language) in &self.extensions {
            if Language::from_id(language).is_none() {
                return Err(Error::Config(format!(
                    "extension {:?} maps to unknown language {:?}",
                    ext, language
                )));
            }
        }
        if let Some(tolerance) = self.parse.as_ref().and_then(|p| p.error_tolerance) {
            if !(0.0..=1.0).contains(&tolerance) {
                return Err(Error::Config(format!(
                    "parse.error_tolerance must be within 0..1, got {}",
                    tolerance
                )));
            }
        }
        Ok(())
    }

    /// Compile `excluded_paths` into one matcher.
    pub fn excluded_matcher(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.excluded_paths {
            let glob = Glob::new(pattern).map_err(|e| Error::Config(e.to_string()))?;
            builder.add(glob);
        }
        builder.build().map_err(|e| Error::Config(e.to_string()))
    }

    /// Returns whether hidden files are scanned (defaults to false).
    pub fn should_include_hidden(&self) -> bool {
        self.include_hidden.unwrap_or(false)
    }

    /// The parse error tolerance (defaults to 0.25).
    pub fn error_tolerance(&self) -> f64 {
        self.parse
            .as_ref()
            .and_then(|p| p.error_tolerance)
            .unwrap_or(DEFAULT_ERROR_TOLERANCE)
    }

    /// Number of shade buckets, clamped to 1..=9.
    pub fn shades(&self) -> usize {
        self.report
            .as_ref()
            .and_then(|r| r.shades)
            .unwrap_or(MAX_SHADES)
            .clamp(1, MAX_SHADES)
    }

    /// Whether versions are listed newest first (defaults to true).
    pub fn newest_first(&self) -> bool {
        self.report
            .as_ref()
            .and_then(|r| r.newest_first)
            .unwrap_or(true)
    }

    /// Resolve a file's language, honoring configured extension overrides.
    pub fn language_for(&self, path: &Path) -> Option<Language> {
        let ext = path.extension().and_then(|e| e.to_str())?;
        self.extensions
            .get(ext)
            .and_then(|id| Language::from_id(id))
            .or_else(|| Language::from_extension(ext))
    }
}
