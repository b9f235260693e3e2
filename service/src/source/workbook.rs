//! Spreadsheet workbooks through calamine (xlsx, xlsm, xlsb, xls, ods)

use super::grid::{Sheet, SheetProvider, SheetRef};
use super::{scan_files, PatternCache};
use calamine::{open_workbook_auto, Data, Range, Reader, SheetVisible, Sheets};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tablegen_core::config::InputConfig;
use tablegen_core::prelude::*;
use tracing::{debug, info};

type Workbook = Sheets<BufReader<File>>;

/// Visible sheets of every workbook under the input directory
pub struct WorkbookProvider {
    input: InputConfig,
    patterns: PatternCache,
    open: HashMap<PathBuf, Workbook>,
}

impl WorkbookProvider {
    #[must_use]
    pub fn new(input: &InputConfig) -> Self {
        Self {
            input: input.clone(),
            patterns: PatternCache::new(),
            open: HashMap::new(),
        }
    }

    fn workbook(&mut self, path: &Path) -> Result<&mut Workbook> {
        if !self.open.contains_key(path) {
            let workbook = open_workbook_auto(path)
                .map_err(|e| TableGenError::backend(path, format!("failed to open workbook: {e}")))?;
            self.open.insert(path.to_path_buf(), workbook);
        }
        self.open
            .get_mut(path)
            .ok_or_else(|| TableGenError::backend(path, "workbook not open"))
    }
}

impl SheetProvider for WorkbookProvider {
    fn sheets(&mut self) -> Result<Vec<SheetRef>> {
        let files = scan_files(
            &self.input.directory,
            self.input.include_pattern(),
            self.input.file_exclude_pattern.as_deref(),
            &mut self.patterns,
        )?;

        let mut sheets = Vec::new();
        for file in files {
            info!("load file {}", file.display());
            let workbook = self.workbook(&file)?;
            for (index, meta) in workbook.sheets_metadata().iter().enumerate() {
                if meta.visible != SheetVisible::Visible {
                    debug!("skip hidden sheet '{}'", meta.name);
                    continue;
                }
                sheets.push(SheetRef {
                    file: file.clone(),
                    name: meta.name.clone(),
                    index,
                });
            }
        }
        Ok(sheets)
    }

    fn load(&mut self, sheet: &SheetRef) -> Result<Sheet> {
        debug!("load sheet <{}>", sheet.name);
        let range = self
            .workbook(&sheet.file)?
            .worksheet_range(&sheet.name)
            .map_err(|e| {
                TableGenError::backend(&sheet.file, format!("failed to read sheet '{}': {e}", sheet.name))
            })?;
        Ok(range_to_sheet(&range))
    }

    fn close(&mut self) {
        self.open.clear();
    }
}

/// Place a used range at its absolute position in the sheet
fn range_to_sheet(range: &Range<Data>) -> Sheet {
    let Some((start_row, start_column)) = range.start() else {
        return Sheet::default();
    };
    let (start_row, start_column) = (start_row as usize, start_column as usize);

    let mut rows = vec![Vec::new(); start_row];
    for cells in range.rows() {
        let mut row = vec![Value::Null; start_column];
        row.extend(cells.iter().map(data_to_value));
        rows.push(row);
    }
    Sheet::from_rows(rows)
}

fn data_to_value(data: &Data) -> Value {
    match data {
        Data::Int(i) => Value::Int(*i),
        Data::Float(f) => Value::Float(*f),
        Data::String(s) => Value::String(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => Value::Float(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(e) => Value::String(format!("{e:?}")),
        Data::Empty => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_keeps_absolute_positions() {
        let mut range = Range::new((1, 2), (2, 3));
        range.set_value((1, 2), Data::String("Id".to_string()));
        range.set_value((2, 3), Data::Int(7));
        let sheet = range_to_sheet(&range);
        assert_eq!(sheet.text(2, 3), "Id");
        assert_eq!(sheet.cell(3, 4), &Value::Int(7));
        assert!(sheet.cell(1, 1).is_null());
    }

    #[test]
    fn test_data_to_value() {
        assert_eq!(data_to_value(&Data::Empty), Value::Null);
        assert_eq!(data_to_value(&Data::Float(1.5)), Value::Float(1.5));
        assert_eq!(data_to_value(&Data::Bool(true)), Value::Bool(true));
    }
}
