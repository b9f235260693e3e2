//! Shared fixtures for the integration tests

#![allow(dead_code)]

use rust_xlsxwriter::Workbook;
use std::path::Path;
use tablegen_service::generator::document;
use tablegen_service::prelude::*;

/// Rows: 2 names, 3 types, 4 keywords, data from 5
pub fn item_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.input.rows = vec![
        RowRole::at(RowKind::FieldName, 2),
        RowRole::at(RowKind::FieldType, 3),
        RowRole::at(RowKind::Keyword, 4),
        RowRole::at(RowKind::Data, 5),
    ];
    config
}

/// The `Item` table: `Id:int` (key) and `Tags:string[]`, one data row
pub fn item_sheet(provider: MemoryProvider) -> MemoryProvider {
    provider.sheet(
        "Item",
        &[
            &["Items"],
            &["Id", "Tags"],
            &["int", "string[]"],
            &["key", ""],
            &["1001", "sword|fire"],
        ],
    )
}

/// Discovered source over in-memory sheets
pub fn open(provider: MemoryProvider, config: &PipelineConfig) -> GridTableSource<MemoryProvider> {
    let mut source = GridTableSource::new(provider, config, ParameterScope::new());
    source.open().expect("discovery succeeds");
    source
}

/// Bind every table against a freshly built type model
pub fn catalog(source: &dyn TableSource, config: &PipelineConfig) -> TypeCatalog {
    let model = document::build(source, &config.code).expect("type model").model;
    TypeCatalog::bind(source.schema(), model, &config.code).expect("binding")
}

/// Convert every row of a table with the default engine
pub fn records(source: &dyn TableSource, config: &PipelineConfig, table: &str) -> Result<Vec<Record>> {
    let catalog = catalog(source, config);
    let mut binder = MemberBinder::new();
    let separators = Separators::from_config(&config.input);
    let engine = ConversionEngine::new();
    let schema = source
        .schema()
        .get(table)
        .ok_or_else(|| TableGenError::discovery(format!("no table {table}")))?;
    let mut ctx = ConversionContext::new(source.schema(), &catalog, &mut binder, &separators);
    load_records(source, schema, &engine, &mut ctx)
}

/// Write a workbook with one sheet per `(name, rows)`; cells that parse as
/// numbers are written as numbers
pub fn write_workbook(path: &Path, sheets: &[(&str, &[&[&str]])]) {
    let mut workbook = Workbook::new();
    for (name, rows) in sheets {
        let sheet = workbook.add_worksheet();
        sheet.set_name(*name).expect("sheet name");
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                let (r, c) = (u32::try_from(r).unwrap(), u16::try_from(c).unwrap());
                match cell.parse::<f64>() {
                    Ok(number) => sheet.write_number(r, c, number).map(|_| ()),
                    Err(_) => sheet.write_string(r, c, *cell).map(|_| ()),
                }
                .expect("cell write");
            }
        }
    }
    workbook.save(path).expect("workbook save");
}
