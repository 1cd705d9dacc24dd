//! Analysis context for files and projects.
//!
//! The AnalysisContext provides:
//! - Language resolution honoring configured extension overrides
//! - Parsing through the fallback chain with the configured tolerance
//! - Project-wide reference scans over same-language files

use std::fs;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use rayon::prelude::*;
use serde::Serialize;
use walkdir::WalkDir;

use super::{
    extract_from_model, get_analyzer, parse_source, references_in_model, ExtractionQuery,
    Language, Reference, SourceModel, Symbol,
};
use crate::config::Config;
use crate::error::{Error, Result};

/// Directories never worth scanning for references.
const SKIPPED_DIRS: &[&str] = &["node_modules", "vendor", "__pycache__", "target", "dist"];

/// Symbols extracted from one file.
#[derive(Debug, Clone)]
pub struct FileSymbols {
    /// Path relative to the context's base directory.
    pub path: String,
    pub language: Language,
    pub symbols: Vec<Symbol>,
    /// Full source text, for rendering symbol content.
    pub source: String,
    /// True when the regex heuristic produced the symbols.
    pub heuristic: bool,
}

/// A reference found during a project scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectReference {
    pub file: String,
    #[serde(flatten)]
    pub reference: Reference,
}

/// Analysis context for a project directory.
pub struct AnalysisContext {
    /// Base directory for relative path resolution.
    base_dir: PathBuf,
    config: Config,
    excluded: GlobSet,
}

impl AnalysisContext {
    /// Create a new analysis context.
    pub fn new<P: AsRef<Path>>(base_dir: P, config: Config) -> Result<Self> {
        let excluded = config.excluded_matcher()?;
        Ok(Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            config,
            excluded,
        })
    }

    /// Get the base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.base_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string()
    }

    /// Resolve a file's language or fail with `UnsupportedLanguage`.
    pub fn language_of(&self, path: &Path) -> Result<Language> {
        self.config
            .language_for(path)
            .ok_or_else(|| Error::UnsupportedLanguage(path.display().to_string()))
    }

    /// Parse source text through the fallback chain.
    pub fn model_for(&self, language: Language, path: &str, source: &[u8]) -> SourceModel {
        parse_source(get_analyzer(language), path, source, self.config.error_tolerance())
    }

    /// Extract symbols from in-memory source text.
    pub fn extract_source(
        &self,
        language: Language,
        path: &str,
        source: &str,
        query: &ExtractionQuery,
    ) -> Vec<Symbol> {
        let model = self.model_for(language, path, source.as_bytes());
        extract_from_model(&model, query)
    }

    /// Read and extract one file.
    pub fn extract_file<P: AsRef<Path>>(&self, path: P, query: &ExtractionQuery) -> Result<FileSymbols> {
        let abs_path = self.absolute(path.as_ref());
        let language = self.language_of(&abs_path)?;
        let rel_path = self.relative(&abs_path);
        let source = fs::read_to_string(&abs_path).map_err(|e| Error::Extraction {
            path: rel_path.clone(),
            reason: e.to_string(),
        })?;

        let model = self.model_for(language, &rel_path, source.as_bytes());
        let symbols = extract_from_model(&model, query);
        tracing::debug!(path = %rel_path, count = symbols.len(), "extracted symbols");

        Ok(FileSymbols {
            path: rel_path,
            language,
            symbols,
            source,
            heuristic: model.is_heuristic(),
        })
    }

    /// Find uses of `symbols` in one file.
    pub fn find_references_in<P: AsRef<Path>>(&self, path: P, symbols: &[Symbol]) -> Result<Vec<Reference>> {
        let abs_path = self.absolute(path.as_ref());
        let language = self.language_of(&abs_path)?;
        let rel_path = self.relative(&abs_path);
        let source = fs::read(&abs_path).map_err(|e| Error::Extraction {
            path: rel_path.clone(),
            reason: e.to_string(),
        })?;
        let model = self.model_for(language, &rel_path, &source);
        Ok(references_in_model(&model, symbols))
    }

    /// Files under the base directory in the same language family.
    pub fn project_files(&self, family: Language) -> Vec<PathBuf> {
        let include_hidden = self.config.should_include_hidden();
        let base_dir = &self.base_dir;

        WalkDir::new(base_dir)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 {
                    return true;
                }
                let name = e.file_name().to_string_lossy();
                // Skip hidden entries unless configured
                if !include_hidden && name.starts_with('.') {
                    return false;
                }
                !(e.file_type().is_dir() && SKIPPED_DIRS.contains(&name.as_ref()))
            })
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| !self.excluded.is_match(p.strip_prefix(base_dir).unwrap_or(p)))
            .filter(|p| {
                self.config
                    .language_for(p)
                    .is_some_and(|l| l.family() == family.family())
            })
            .collect()
    }

    /// Find uses of `symbols` across every same-language file in the project.
    ///
    /// Files are processed in parallel. A file that cannot be read is logged
    /// and skipped. `on_file` is called once per file processed.
    pub fn find_project_references<F>(
        &self,
        symbols: &[Symbol],
        language: Language,
        on_file: F,
    ) -> Vec<ProjectReference>
    where
        F: Fn(&Path) + Sync,
    {
        let files = self.project_files(language);
        tracing::debug!(files = files.len(), "scanning project for references");

        let mut found: Vec<ProjectReference> = files
            .par_iter()
            .flat_map_iter(|path| {
                let result = self.find_references_in(path, symbols);
                on_file(path);
                let file = self.relative(path);
                match result {
                    Ok(refs) => refs
                        .into_iter()
                        .map(|reference| ProjectReference {
                            file: file.clone(),
                            reference,
                        })
                        .collect(),
                    Err(e) => {
                        tracing::warn!(path = %file, error = %e, "skipping file");
                        Vec::new()
                    }
                }
            })
            .collect();

        found.sort_by(|a, b| {
            (&a.file, a.reference.line, &a.reference.symbol)
                .cmp(&(&b.file, b.reference.line, &b.reference.symbol))
        });
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{SymbolKind, UsageKind};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_extract_file() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("calc.py");
        fs::write(
            &file_path,
            "class Calculator:\n    def add(self, a, b):\n        return a + b\n",
        )
        .unwrap();

        let ctx = AnalysisContext::new(temp.path(), Config::default()).unwrap();
        let file = ctx.extract_file(&file_path, &ExtractionQuery::all()).unwrap();

        assert_eq!(file.path, "calc.py");
        assert_eq!(file.language, Language::Python);
        assert!(!file.heuristic);
        assert_eq!(file.symbols.len(), 2);
    }

    #[test]
    fn test_unsupported_language() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("notes.txt");
        fs::write(&file_path, "hello").unwrap();

        let ctx = AnalysisContext::new(temp.path(), Config::default()).unwrap();
        let err = ctx.extract_file(&file_path, &ExtractionQuery::all()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedLanguage(_)));
    }

    #[test]
    fn test_project_references() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("calc.js"),
            "class Calculator {\n  add(a, b) { return a + b; }\n}\n",
        )
        .unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        fs::write(
            temp.path().join("src/main.js"),
            "const calc = new Calculator();\ncalc.add(5, 3);\n",
        )
        .unwrap();
        fs::write(temp.path().join("src/main.py"), "calc.add(1, 2)\n").unwrap();
        fs::create_dir_all(temp.path().join("node_modules/x")).unwrap();
        fs::write(temp.path().join("node_modules/x/index.js"), "add(1);\n").unwrap();

        let ctx = AnalysisContext::new(temp.path(), Config::default()).unwrap();
        let defs = ctx
            .extract_file("calc.js", &ExtractionQuery::for_kinds(&[SymbolKind::Method]))
            .unwrap();
        let refs = ctx.find_project_references(&defs.symbols, Language::JavaScript, |_| {});

        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].file, Path::new("src").join("main.js").to_string_lossy());
        assert_eq!(refs[0].reference.line, 2);
        assert_eq!(refs[0].reference.usage, UsageKind::Call);
    }

    #[test]
    fn test_excluded_paths() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("gen")).unwrap();
        fs::write(temp.path().join("gen/out.py"), "X = 1\n").unwrap();
        fs::write(temp.path().join("app.py"), "X = 1\n").unwrap();

        let config = Config::parse_str("excluded_paths: [\"gen/**\"]").unwrap();
        let ctx = AnalysisContext::new(temp.path(), config).unwrap();
        let files = ctx.project_files(Language::Python);

        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("app.py"));
    }
}
