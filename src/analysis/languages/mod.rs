//! Language-specific analyzer implementations.

mod javascript;
mod powershell;
mod python;
mod r;
mod shell;

pub use javascript::JavaScriptAnalyzer;
pub use powershell::PowerShellAnalyzer;
pub use python::PythonAnalyzer;
pub use r::RAnalyzer;
pub use shell::ShellAnalyzer;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::OnceCell;

use super::{Language, LanguageAnalyzer};

/// Static storage for JavaScript analyzer.
static JAVASCRIPT_ANALYZER: OnceCell<JavaScriptAnalyzer> = OnceCell::new();

/// Static storage for TypeScript analyzer.
static TYPESCRIPT_ANALYZER: OnceCell<JavaScriptAnalyzer> = OnceCell::new();

/// Static storage for Python analyzer.
static PYTHON_ANALYZER: OnceCell<PythonAnalyzer> = OnceCell::new();

/// Static storage for shell analyzer.
static SHELL_ANALYZER: OnceCell<ShellAnalyzer> = OnceCell::new();

/// Static storage for PowerShell analyzer.
static POWERSHELL_ANALYZER: OnceCell<PowerShellAnalyzer> = OnceCell::new();

/// Static storage for R analyzer.
static R_ANALYZER: OnceCell<RAnalyzer> = OnceCell::new();

/// Whether analyzers have been registered.
static REGISTERED: AtomicBool = AtomicBool::new(false);

/// Register all available language analyzers.
///
/// Idempotent. [`get_analyzer`] calls it on first use.
pub fn register_analyzers() {
    if REGISTERED.swap(true, Ordering::SeqCst) {
        return;
    }

    JAVASCRIPT_ANALYZER.get_or_init(JavaScriptAnalyzer::new);
    TYPESCRIPT_ANALYZER.get_or_init(JavaScriptAnalyzer::typescript);
    PYTHON_ANALYZER.get_or_init(PythonAnalyzer::new);
    SHELL_ANALYZER.get_or_init(ShellAnalyzer::new);
    POWERSHELL_ANALYZER.get_or_init(PowerShellAnalyzer::new);
    R_ANALYZER.get_or_init(RAnalyzer::new);
}

/// Get the analyzer for a language.
pub fn get_analyzer(language: Language) -> &'static dyn LanguageAnalyzer {
    match language {
        Language::JavaScript => JAVASCRIPT_ANALYZER.get_or_init(JavaScriptAnalyzer::new),
        Language::TypeScript => TYPESCRIPT_ANALYZER.get_or_init(JavaScriptAnalyzer::typescript),
        Language::Python => PYTHON_ANALYZER.get_or_init(PythonAnalyzer::new),
        Language::Shell => SHELL_ANALYZER.get_or_init(ShellAnalyzer::new),
        Language::PowerShell => POWERSHELL_ANALYZER.get_or_init(PowerShellAnalyzer::new),
        Language::R => R_ANALYZER.get_or_init(RAnalyzer::new),
    }
}

/// Get the analyzer for a file, by extension.
///
/// Returns None when the extension is not recognised.
pub fn analyzer_for_path(path: &Path) -> Option<&'static dyn LanguageAnalyzer> {
    Language::from_path(path).map(get_analyzer)
}

/// Get all registered file extensions.
pub fn registered_extensions() -> Vec<&'static str> {
    register_analyzers();
    Language::all()
        .iter()
        .flat_map(|l| get_analyzer(*l).file_extensions().iter().copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_language_has_an_analyzer() {
        for language in Language::all() {
            let analyzer = get_analyzer(*language);
            assert_eq!(analyzer.language(), *language);
            assert!(!analyzer.grammar_variants().is_empty());
        }
    }

    #[test]
    fn test_extensions_route_to_analyzers() {
        let cases = [
            ("app.js", Language::JavaScript),
            ("app.tsx", Language::TypeScript),
            ("tool.py", Language::Python),
            ("run.sh", Language::Shell),
            ("Deploy.PS1", Language::PowerShell),
            ("model.R", Language::R),
        ];
        for (path, language) in cases {
            let analyzer = analyzer_for_path(Path::new(path)).expect(path);
            assert_eq!(analyzer.language(), language, "{path}");
        }
        assert!(analyzer_for_path(Path::new("notes.txt")).is_none());
    }

    #[test]
    fn test_registered_extensions_cover_known_languages() {
        let extensions = registered_extensions();
        for ext in ["js", "ts", "py", "sh", "ps1", "r"] {
            assert!(extensions.contains(&ext), "{ext} missing");
        }
    }
}
