//! Table sources
//!
//! A [`TableSource`] discovers the schema of every table it can see, once,
//! and then streams raw rows in schema column order. The grid-based source
//! in [`grid`] implements discovery for any back-end that can present a
//! sheet as a 1-based cell grid; [`workbook`], [`csv`] and [`memory`]
//! provide such grids.

pub mod csv;
pub mod grid;
pub mod memory;
pub mod resolve;
pub mod workbook;

pub use grid::{GridTableSource, Sheet, SheetProvider, SheetRef};
pub use memory::MemoryProvider;
pub use resolve::TypeResolver;
pub use workbook::WorkbookProvider;

pub use self::csv::CsvProvider;

use crate::binder::BoundMember;
use crate::convert::{ConversionContext, ConversionEngine};
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tablegen_core::prelude::*;
use tracing::debug;
use walkdir::WalkDir;

/// One physical data row, cells aligned to the table's fields
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based physical row
    pub index: usize,
    pub cells: Vec<Value>,
}

/// Lazy, single pass row sequence
pub type RowIter<'a> = Box<dyn Iterator<Item = RawRow> + 'a>;

/// The seam between the engine and a concrete tabular back-end
pub trait TableSource {
    /// Discover the schema; repeated calls are no-ops
    fn open(&mut self) -> Result<()>;

    /// Release back-end resources
    fn close(&mut self) -> Result<()>;

    fn is_opened(&self) -> bool;

    /// Discovered tables, in discovery order
    fn schema(&self) -> &SchemaSet;

    /// Rows of a table from its data row up to the first empty row
    fn read_rows(&self, table: &str) -> Result<RowIter<'_>>;
}

/// Convert every row of a table into records of its bound type
pub fn load_records(
    source: &dyn TableSource,
    table: &TableSchema,
    engine: &ConversionEngine,
    ctx: &mut ConversionContext<'_>,
) -> Result<Vec<Record>> {
    let descriptor = ctx
        .catalog()
        .descriptor(&table.name)
        .ok_or_else(|| TableGenError::SchemaBindingError {
            table: table.name.clone(),
        })?;
    let members = ctx.binder().members(descriptor);

    // Column position of every bound member, or none for synthetic members
    let columns: Vec<(&BoundMember, Option<usize>)> = members
        .values()
        .map(|member| {
            let position = table
                .fields
                .iter()
                .position(|field| field.name == member.name);
            (member, position)
        })
        .collect();

    let mut records = Vec::new();
    for row in source.read_rows(&table.name)? {
        let mut record = Record::new(descriptor.full_name());
        for (member, position) in &columns {
            let value = match position {
                Some(position) => {
                    let field = &table.fields[*position];
                    let raw = row.cells.get(*position).unwrap_or(&grid::NULL_CELL);
                    engine
                        .change_type_or_default(ctx, field, raw, &member.value_type)
                        .map_err(|e| match e {
                            TableGenError::CoercionError { .. } => TableGenError::ConversionError {
                                table: table.name.clone(),
                                row: row.index,
                                column: field.name.clone(),
                                column_index: field.source_column_index,
                                value: raw.to_text(),
                                target: member.value_type.to_string(),
                                message: e.to_string(),
                            },
                            // Separator overflow and binding failures keep their category
                            other => other,
                        })?
                }
                None => engine.zero_value(ctx, &member.value_type)?,
            };
            record.set(member.name.clone(), value);
        }
        records.push(record);
    }
    Ok(records)
}

/// Files under `directory` whose path matches `include` and not `exclude`,
/// sorted by path. Office lock files (`~$name.xlsx`) are skipped.
pub fn scan_files(
    directory: &Path,
    include: &str,
    exclude: Option<&str>,
    patterns: &mut PatternCache,
) -> Result<Vec<PathBuf>> {
    let directory = if directory.as_os_str().is_empty() {
        Path::new(".")
    } else {
        directory
    };
    if !directory.is_dir() {
        return Err(TableGenError::config(format!(
            "input directory not found: {}",
            directory.display()
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(directory).sort_by_file_name() {
        let entry = entry.map_err(|e| TableGenError::backend(directory, e.to_string()))?;
        if !entry.file_type().is_file() || entry.file_name().to_string_lossy().starts_with("~$") {
            continue;
        }
        let path = entry.path().to_string_lossy().replace('\\', "/");
        if !include.is_empty() && !patterns.get(include)?.is_match(&path) {
            continue;
        }
        if let Some(exclude) = exclude.filter(|p| !p.is_empty()) {
            if patterns.get(exclude)?.is_match(&path) {
                continue;
            }
        }
        files.push(entry.into_path());
    }
    debug!("{} input files under {}", files.len(), directory.display());
    Ok(files)
}

/// Case-insensitive regexes compiled once per run
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: HashMap<String, Regex>,
}

impl PatternCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, pattern: &str) -> Result<&Regex> {
        if !self.compiled.contains_key(pattern) {
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| TableGenError::config(format!("invalid pattern '{pattern}': {e}")))?;
            self.compiled.insert(pattern.to_string(), regex);
        }
        self.compiled
            .get(pattern)
            .ok_or_else(|| TableGenError::config(format!("pattern '{pattern}' not compiled")))
    }

    /// Apply a value pattern: the `result` group of the first match, or the
    /// empty string without a match. No pattern returns the text unchanged.
    pub fn extract(&mut self, text: &str, pattern: Option<&str>) -> Result<String> {
        let Some(pattern) = pattern.filter(|p| !p.is_empty()) else {
            return Ok(text.to_string());
        };
        let regex = self.get(pattern)?;
        Ok(regex
            .captures(text)
            .and_then(|caps| caps.name("result"))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}
