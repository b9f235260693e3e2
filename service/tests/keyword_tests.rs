//! Keyword cells as seen through discovery

mod helpers;

use helpers::{item_config, open, records};
use pretty_assertions::assert_eq;
use tablegen_service::keyword::{apply_keywords, tokenize};
use tablegen_service::prelude::*;

fn keyword_sheet(keywords: &[&str]) -> MemoryProvider {
    MemoryProvider::new().sheet(
        "Unit",
        &[
            &["Units"],
            &["Id", "Speed", "Path"],
            &["int", "float", "int[][]"],
            keywords,
            &["1", "", "1/2;3"],
        ],
    )
}

#[test]
fn test_dollar_prefix_and_case_are_ignored() {
    let tokens = tokenize("$KEY $Default(2.5)");
    let keywords: Vec<&str> = tokens.iter().map(|t| t.keyword.as_str()).collect();
    assert_eq!(keywords, vec!["key", "default"]);
    assert_eq!(tokens[1].param.as_deref(), Some("2.5"));
}

#[test]
fn test_table_kind_keywords() {
    let config = item_config();
    let source = open(keyword_sheet(&["$struct nodata", "", ""]), &config);

    let unit = source.schema().get("Unit").unwrap();
    assert_eq!(unit.kind(), TableKind::Struct);
    assert!(!unit.has_data());
}

#[test]
fn test_enum_wins_over_struct() {
    let mut table = TableSchema::new("Color", &ParameterScope::new());
    let mut field = FieldSchema::new("Name", 1);
    apply_keywords("struct enum", &mut table, &mut field).unwrap();
    assert_eq!(table.kind(), TableKind::Enum);
    assert!(!table.has_data());
}

#[test]
fn test_default_and_separator_overrides_reach_conversion() {
    let config = item_config();
    let source = open(keyword_sheet(&["key", "default(2.5)", "arr_sep(; /)"]), &config);

    let rows = records(&source, &config, "Unit").unwrap();
    assert_eq!(rows[0].get("Speed"), Some(&Value::Float(2.5)));
    assert_eq!(
        rows[0].get("Path"),
        Some(&Value::Array(vec![
            Value::Array(vec![Value::Int(1), Value::Int(2)]),
            Value::Array(vec![Value::Int(3)]),
        ]))
    );
}

#[test]
fn test_default_null_is_zero() {
    let config = item_config();
    let source = open(keyword_sheet(&["", "default(null)", "arr_sep(; /)"]), &config);

    let speed = source.schema().get("Unit").unwrap().field("Speed").unwrap();
    assert_eq!(speed.default_value, Some(Value::Float(0.0)));
}

#[test]
fn test_invalid_default_is_config_error() {
    let config = item_config();
    let mut source = GridTableSource::new(
        keyword_sheet(&["", "default(fast)", ""]),
        &config,
        ParameterScope::new(),
    );

    let err = source.open().unwrap_err();
    assert!(err.is_config(), "{err}");
}

#[test]
fn test_malformed_index_is_config_error() {
    let config = item_config();
    let mut source = GridTableSource::new(
        keyword_sheet(&["index(one)", "", ""]),
        &config,
        ParameterScope::new(),
    );

    assert!(source.open().unwrap_err().is_config());
}
