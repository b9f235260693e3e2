//! Serialized data artifacts

mod helpers;

use helpers::{item_config, open};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tablegen_service::prelude::*;
use tempfile::TempDir;

fn shop_sheets() -> MemoryProvider {
    MemoryProvider::new()
        .sheet(
            "Reward",
            &[&["Rewards"], &["Kind", "Amount"], &["string", "int"], &["struct nodata", ""]],
        )
        .sheet(
            "Rarity",
            &[
                &["Rarities"],
                &["Name", "Value"],
                &["string", "int"],
                &["enum", ""],
                &["Common", "1"],
                &["Very Rare", "5"],
            ],
        )
        .sheet(
            "Item",
            &[
                &["Items"],
                &["Id", "Name", "Rarity", "Main"],
                &["int", "string", "Rarity", "Reward"],
                &["key", "", "", ""],
                &["1001", "Sword", "Very Rare", "gold:5"],
                &["1002", "Shield", "1", ""],
            ],
        )
}

fn sink_config(dir: &Path) -> PipelineConfig {
    let mut config = item_config();
    config.code.output_dir = dir.join("generated");
    config.code.temp_dir = dir.join("tmp");
    config.code.compiler = String::new();
    config.output.path = dir.join("data");
    config
}

fn write(config: &PipelineConfig, model: Option<TypeModel>) -> Result<Vec<PathBuf>> {
    let source = open(shop_sheets(), config);
    let mut sink = JsonTableSink::new(config);
    if let Some(model) = model {
        sink = sink.with_model(model);
    }
    sink.open(&source)?;
    sink.write_all(&source)
}

fn generate(config: &PipelineConfig) -> GeneratedCode {
    let source = open(shop_sheets(), config);
    CodeGenerator::new(&config.code).unwrap().generate(&source).unwrap()
}

#[test]
fn test_json_rows_bind_through_manifest() {
    let dir = TempDir::new().unwrap();
    let config = sink_config(dir.path());
    generate(&config);

    let written = write(&config, None).unwrap();
    assert_eq!(written, vec![config.output.path.join("Item.json")]);

    let text = fs::read_to_string(&written[0]).unwrap();
    assert!(text.ends_with("]\n"));
    let rows: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        rows,
        json!([
            {"Id": 1001, "Name": "Sword", "Rarity": "VeryRare", "Main": {"Kind": "gold", "Amount": 5}},
            {"Id": 1002, "Name": "Shield", "Rarity": "Common", "Main": {"Kind": "", "Amount": 0}},
        ])
    );
}

#[test]
fn test_enum_and_nodata_tables_are_not_written() {
    let dir = TempDir::new().unwrap();
    let config = sink_config(dir.path());
    let model = generate(&config).model;

    write(&config, Some(model)).unwrap();
    assert!(!config.output.path.join("Reward.json").exists());
    assert!(!config.output.path.join("Rarity.json").exists());
}

#[test]
fn test_yaml_output() {
    let dir = TempDir::new().unwrap();
    let mut config = sink_config(dir.path());
    config.output.format = OutputFormat::Yaml;
    let model = generate(&config).model;

    let written = write(&config, Some(model)).unwrap();
    assert_eq!(written, vec![config.output.path.join("Item.yaml")]);
    let rows: serde_yaml::Value = serde_yaml::from_str(&fs::read_to_string(&written[0]).unwrap()).unwrap();
    assert_eq!(rows[0]["Id"], serde_yaml::Value::from(1001));
    assert_eq!(rows[0]["Rarity"], serde_yaml::Value::from("VeryRare"));
    assert_eq!(rows[0]["Main"]["Kind"], serde_yaml::Value::from("gold"));
}

#[test]
fn test_missing_manifest_is_binding_error() {
    let dir = TempDir::new().unwrap();
    let config = sink_config(dir.path());

    let err = write(&config, None).unwrap_err();
    assert!(matches!(err, TableGenError::SchemaBindingError { .. }), "{err}");
}

#[test]
fn test_stale_artifacts_of_own_format_are_removed() {
    let dir = TempDir::new().unwrap();
    let config = sink_config(dir.path());
    let model = generate(&config).model;
    let out = &config.output.path;
    fs::create_dir_all(out).unwrap();
    fs::write(out.join("Retired.json"), "[]\n").unwrap();
    fs::write(out.join("tables.types.json"), "{}\n").unwrap();
    fs::write(out.join("Retired.yaml"), "[]\n").unwrap();

    write(&config, Some(model)).unwrap();
    assert!(!out.join("Retired.json").exists());
    assert!(out.join("tables.types.json").exists());
    assert!(out.join("Retired.yaml").exists());
    assert!(out.join("Item.json").exists());
}

#[test]
fn test_compact_json() {
    let dir = TempDir::new().unwrap();
    let mut config = sink_config(dir.path());
    config.output.pretty = false;
    let model = generate(&config).model;

    let written = write(&config, Some(model)).unwrap();
    let text = fs::read_to_string(&written[0]).unwrap();
    assert_eq!(text.lines().count(), 1);
    assert!(text.starts_with(r#"[{"Id":1001,"#));
}
