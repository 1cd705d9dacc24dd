//! Tests for the JSON wire shapes.
//!
//! These tests pin the field names and optional-field behavior that
//! downstream report renderers depend on.

use std::path::PathBuf;

use codelineage::analysis::{AnalysisContext, ExtractionQuery, Language, ProjectReference};
use codelineage::config::Config;
use codelineage::report::{self, SymbolRecord};
use serde_json::Value;

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn context() -> AnalysisContext {
    codelineage::init();
    AnalysisContext::new(testdata_path(), Config::default()).expect("context should build")
}

#[test]
fn test_symbol_list_shape() {
    let ctx = context();
    let source = "class Foo { bar() {} }";
    let query = ExtractionQuery::from_json(
        r#"{"Elements": ["class", "method"], "PreserveContext": true}"#,
    )
    .unwrap();
    let symbols = ctx.extract_source(Language::JavaScript, "foo.js", source, &query);
    let records: Vec<SymbolRecord> = symbols
        .iter()
        .map(|s| SymbolRecord::new(s, source))
        .collect();
    let json = serde_json::to_value(&records).unwrap();

    assert_eq!(json[0]["name"], "Foo");
    assert_eq!(json[0]["type"], "class");
    assert_eq!(json[0]["startLine"], 1);
    assert_eq!(json[0]["endLine"], 1);
    assert_eq!(json[0]["lineCount"], 1);
    assert_eq!(json[0]["content"], source);
    assert!(json[0].get("parent").is_none());

    assert_eq!(json[1]["name"], "Foo.bar");
    assert_eq!(json[1]["type"], "method");
    assert_eq!(json[1]["parent"], "Foo");
}

#[test]
fn test_symbol_records_from_fixture() {
    let ctx = context();
    let file = ctx
        .extract_file("python/shapes.py", &ExtractionQuery::for_kinds(&[codelineage::SymbolKind::Class]))
        .unwrap();
    let json = serde_json::to_value(report::symbol_records(&file)).unwrap();

    let circle = &json[1];
    assert_eq!(circle["name"], "Circle");
    assert_eq!(circle["extends"], "Shape");
    assert_eq!(circle["startLine"], 12);
    assert_eq!(circle["endLine"], 17);
    assert_eq!(circle["lineCount"], 6);
    assert!(circle["content"].as_str().unwrap().starts_with("class Circle(Shape):"));
}

#[test]
fn test_reference_list_shape() {
    let ctx = context();
    let targets = ctx
        .extract_file("project/calculator.js", &ExtractionQuery::all())
        .unwrap()
        .symbols;
    let refs: Vec<ProjectReference> = ctx
        .find_project_references(&targets, Language::JavaScript, |_| {})
        .into_iter()
        .filter(|r| r.file.ends_with("app.js"))
        .collect();
    let json: Value = serde_json::to_value(&refs).unwrap();

    assert_eq!(json[0]["symbol"], "Calculator");
    assert_eq!(json[0]["usage"], "instantiation");
    assert_eq!(json[0]["line"], 1);
    assert!(json[0].get("context").is_none());
    assert_eq!(json[1]["symbol"], "add");
    assert_eq!(json[1]["usage"], "call");
}

#[test]
fn test_config_fixture_drives_report_options() {
    let config = Config::parse_file(testdata_path().join("codelineage.yaml")).unwrap();
    assert_eq!(config.shades(), 5);
    assert!(config.newest_first());
    assert_eq!(config.max_commits, Some(50));
    assert!((config.error_tolerance() - 0.3).abs() < f64::EPSILON);
    assert_eq!(
        config.language_for(std::path::Path::new("widget.jsm")),
        Some(Language::JavaScript)
    );
    assert_eq!(report::shade_bucket(4, 5, config.shades()), 5);
}
