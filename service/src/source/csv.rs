//! Delimited text files, one table per file named after the file stem

use super::grid::{Sheet, SheetProvider, SheetRef};
use super::{scan_files, PatternCache};
use csv::ReaderBuilder;
use tablegen_core::config::InputConfig;
use tablegen_core::prelude::*;
use tracing::info;

/// Reads every matching `.csv` file as a single sheet
pub struct CsvProvider {
    input: InputConfig,
    patterns: PatternCache,
    delimiter: u8,
}

impl CsvProvider {
    #[must_use]
    pub fn new(input: &InputConfig) -> Self {
        Self {
            input: input.clone(),
            patterns: PatternCache::new(),
            delimiter: b',',
        }
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

impl SheetProvider for CsvProvider {
    fn sheets(&mut self) -> Result<Vec<SheetRef>> {
        let files = scan_files(
            &self.input.directory,
            self.input.include_pattern(),
            self.input.file_exclude_pattern.as_deref(),
            &mut self.patterns,
        )?;
        Ok(files
            .into_iter()
            .map(|file| {
                let name = file
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default();
                SheetRef { file, name, index: 0 }
            })
            .collect())
    }

    fn load(&mut self, sheet: &SheetRef) -> Result<Sheet> {
        info!("load file {}", sheet.file.display());
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_path(&sheet.file)
            .map_err(|e| TableGenError::backend(&sheet.file, e.to_string()))?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| TableGenError::backend(&sheet.file, e.to_string()))?;
            rows.push(
                record
                    .iter()
                    .map(|cell| if cell.is_empty() { Value::Null } else { Value::from(cell) })
                    .collect(),
            );
        }
        Ok(Sheet::from_rows(rows))
    }
}
