//! Discovery and conversion over real workbooks written with rust_xlsxwriter

mod helpers;

use helpers::{records, write_workbook};
use pretty_assertions::assert_eq;
use rust_xlsxwriter::Workbook;
use std::fs;
use std::path::Path;
use tablegen_service::prelude::*;
use tempfile::TempDir;

const ITEM_ROWS: &[&[&str]] = &[
    &["Items sold in the shop"],
    &["Id", "Name", "Price", "Tags"],
    &["int", "string", "float", "string[]"],
    &["key", "", "", "client"],
    &["Identifier", "Display name", "", ""],
    &["1001", "Sword", "12.5", "sword|fire"],
    &["1002", "42", "3", ""],
];

fn config_for(dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.input.directory = dir.to_path_buf();
    config.input.file_exclude_pattern = Some("/backup/".to_string());
    config
}

fn write_fixture(dir: &Path) {
    write_workbook(&dir.join("items.xlsx"), &[("Item", ITEM_ROWS)]);
    // Neither of these is a readable workbook; discovery must not open them
    fs::write(dir.join("~$items.xlsx"), b"lock").unwrap();
    fs::create_dir_all(dir.join("backup")).unwrap();
    fs::write(dir.join("backup").join("old.xlsx"), b"not a workbook").unwrap();
}

fn workbook_source(config: &PipelineConfig) -> GridTableSource<WorkbookProvider> {
    let mut source = GridTableSource::new(
        WorkbookProvider::new(&config.input),
        config,
        ParameterScope::new(),
    );
    source.open().unwrap();
    source
}

#[test]
fn test_discovers_schema_from_default_layout() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path());
    let config = config_for(dir.path());
    let source = workbook_source(&config);

    let item = source.schema().get("Item").unwrap();
    assert_eq!(item.description.as_deref(), Some("Items sold in the shop"));
    assert_eq!(item.fields.len(), 4);
    assert_eq!(item.field("Id").unwrap().description.as_deref(), Some("Identifier"));
    assert!(item.field("Tags").unwrap().tags.contains("client"));
}

#[test]
fn test_typed_cells_convert_to_field_types() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path());
    let config = config_for(dir.path());
    let source = workbook_source(&config);

    let rows = records(&source, &config, "Item").unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("Id"), Some(&Value::Int(1001)));
    assert_eq!(rows[0].get("Price"), Some(&Value::Float(12.5)));
    assert_eq!(
        rows[0].get("Tags"),
        Some(&Value::Array(vec![Value::from("sword"), Value::from("fire")]))
    );
    // Numeric cell in a string column
    assert_eq!(rows[1].get("Name"), Some(&Value::from("42")));
    assert_eq!(rows[1].get("Tags"), Some(&Value::Array(Vec::new())));
}

#[test]
fn test_hidden_sheets_are_not_tables() {
    let dir = TempDir::new().unwrap();
    let mut workbook = Workbook::new();
    let visible = workbook.add_worksheet();
    visible.set_name("Hero").unwrap();
    for (column, text) in [(0, "Id"), (1, "Name")] {
        visible.write_string(1, column, text).unwrap();
    }
    let hidden = workbook.add_worksheet();
    hidden.set_name("Scratch").unwrap();
    hidden.set_hidden(true);
    hidden.write_string(1, 0, "Id").unwrap();
    workbook.save(dir.path().join("heroes.xlsx")).unwrap();

    let config = config_for(dir.path());
    let source = workbook_source(&config);

    let names: Vec<&str> = source.schema().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Hero"]);
}

#[test]
fn test_sheets_from_several_files_are_ordered_by_path() {
    let dir = TempDir::new().unwrap();
    let monster: &[&[&str]] = &[&[""], &["Id"], &["int"]];
    write_workbook(&dir.path().join("b.xlsx"), &[("Monster", monster)]);
    write_workbook(&dir.path().join("a.xlsx"), &[("Item", ITEM_ROWS)]);
    let config = config_for(dir.path());
    let source = workbook_source(&config);

    let tables: Vec<(&str, usize)> = source
        .schema()
        .iter()
        .map(|t| (t.name.as_str(), t.origin_index))
        .collect();
    assert_eq!(tables, vec![("Item", 0), ("Monster", 0)]);
}

#[test]
fn test_missing_directory_is_config_error() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir.path().join("missing"));
    let mut source = GridTableSource::new(
        WorkbookProvider::new(&config.input),
        &config,
        ParameterScope::new(),
    );

    assert!(source.open().unwrap_err().is_config());
}

#[test]
fn test_csv_provider_reads_file_stem_tables() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("Skill.csv"),
        "Skills,,\nId,Name,Cost\nint,string,uint16\nkey,,\n,,\n7,Blink,30\n",
    )
    .unwrap();
    let mut config = config_for(dir.path());
    config.input.provider = ProviderKind::Csv;
    let mut source = GridTableSource::new(
        CsvProvider::new(&config.input),
        &config,
        ParameterScope::new(),
    );
    source.open().unwrap();

    let rows = records(&source, &config, "Skill").unwrap();
    assert_eq!(
        rows,
        vec![Record::new("Skill")
            .with("Id", 7_i64)
            .with("Name", "Blink")
            .with("Cost", Value::UInt(30))]
    );
}
