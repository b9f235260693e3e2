//! In-memory sheets, for embedding and tests

use super::grid::{Sheet, SheetProvider, SheetRef};
use std::path::PathBuf;
use tablegen_core::prelude::*;

/// Sheets held in memory, listed in insertion order
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    sheets: Vec<(String, Sheet)>,
}

impl MemoryProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sheet of text cells; empty strings become empty cells
    #[must_use]
    pub fn sheet(mut self, name: impl Into<String>, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| if cell.is_empty() { Value::Null } else { Value::from(*cell) })
                    .collect()
            })
            .collect();
        self.sheets.push((name.into(), Sheet::from_rows(rows)));
        self
    }

    /// Add a prepared grid
    #[must_use]
    pub fn grid(mut self, name: impl Into<String>, sheet: Sheet) -> Self {
        self.sheets.push((name.into(), sheet));
        self
    }
}

impl SheetProvider for MemoryProvider {
    fn sheets(&mut self) -> Result<Vec<SheetRef>> {
        Ok(self
            .sheets
            .iter()
            .enumerate()
            .map(|(index, (name, _))| SheetRef {
                file: PathBuf::from("memory"),
                name: name.clone(),
                index,
            })
            .collect())
    }

    fn load(&mut self, sheet: &SheetRef) -> Result<Sheet> {
        self.sheets
            .get(sheet.index)
            .filter(|(name, _)| *name == sheet.name)
            .map(|(_, grid)| grid.clone())
            .ok_or_else(|| TableGenError::backend("memory", format!("no sheet '{}'", sheet.name)))
    }
}
