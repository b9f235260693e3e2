//! Schema discovery over cell grids
//!
//! Every visible sheet is a candidate table. Its label is matched against
//! the table name pattern, row roles are located (fixed index, or the first
//! label-column cell matching the role pattern), and each column from
//! `1 + offset_column` becomes a field unless it is unnamed, excluded or
//! filtered out by tags.

use super::resolve::TypeResolver;
use super::{PatternCache, RawRow, RowIter, TableSource};
use crate::convert::coerce_primitive;
use crate::keyword::apply_keywords;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tablegen_core::config::InputConfig;
use tablegen_core::prelude::*;
use tablegen_core::utils::sanitize_identifier;
use tracing::{debug, info, warn};

pub(crate) static NULL_CELL: Value = Value::Null;

/// A sheet as a 1-based grid of cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    rows: Vec<Vec<Value>>,
}

impl Sheet {
    /// Grid from rows; row 0 of the vector is physical row 1
    #[must_use]
    pub fn from_rows(rows: Vec<Vec<Value>>) -> Self {
        Self { rows }
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Cell at a 1-based position; null outside the grid
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> &Value {
        if row == 0 || column == 0 {
            return &NULL_CELL;
        }
        self.rows
            .get(row - 1)
            .and_then(|cells| cells.get(column - 1))
            .unwrap_or(&NULL_CELL)
    }

    /// Trimmed display text of a cell
    #[must_use]
    pub fn text(&self, row: usize, column: usize) -> String {
        self.cell(row, column).to_text().trim().to_string()
    }
}

/// Where a sheet lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRef {
    /// File the sheet was found in
    pub file: PathBuf,
    /// Sheet label, the candidate table name
    pub name: String,
    /// Position of the sheet inside its file
    pub index: usize,
}

/// Back-end that can list visible sheets and load them as grids
pub trait SheetProvider {
    /// Visible sheets, in a stable order
    fn sheets(&mut self) -> Result<Vec<SheetRef>>;

    fn load(&mut self, sheet: &SheetRef) -> Result<Sheet>;

    /// Release open files
    fn close(&mut self) {}
}

struct LoadedTable {
    sheet: Arc<Sheet>,
    data_row: usize,
}

/// Resolved physical rows of one table
#[derive(Debug, Default)]
struct ResolvedRows {
    rows: HashMap<RowKind, usize>,
}

impl ResolvedRows {
    fn get(&self, kind: RowKind) -> Option<usize> {
        self.rows.get(&kind).copied()
    }
}

/// [`TableSource`] implementing discovery on top of a [`SheetProvider`]
pub struct GridTableSource<P> {
    provider: P,
    input: InputConfig,
    resolver: TypeResolver,
    root: ParameterScope,
    patterns: PatternCache,
    schema: SchemaSet,
    tables: HashMap<String, LoadedTable>,
    opened: bool,
}

impl<P: SheetProvider> GridTableSource<P> {
    /// Source over a provider; `root` seeds every table's parameters
    #[must_use]
    pub fn new(provider: P, config: &PipelineConfig, root: ParameterScope) -> Self {
        Self {
            provider,
            input: config.input.clone(),
            resolver: TypeResolver::new(&config.type_mappings),
            root,
            patterns: PatternCache::new(),
            schema: SchemaSet::new(),
            tables: HashMap::new(),
            opened: false,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn discover(&mut self) -> Result<()> {
        if self.input.find_row(RowKind::FieldName).is_none() {
            return Err(TableGenError::config("missing field name row config"));
        }

        for sheet_ref in self.provider.sheets()? {
            let sheet = self.provider.load(&sheet_ref)?;
            let Some((table, data_row)) = self.discover_table(&sheet_ref, &sheet)? else {
                continue;
            };
            info!(
                "table '{}' from {} ({} fields, data row {data_row})",
                table.name,
                sheet_ref.file.display(),
                table.fields.len()
            );
            let key = table.name.to_lowercase();
            self.schema.insert(table)?;
            self.tables.insert(
                key,
                LoadedTable {
                    sheet: Arc::new(sheet),
                    data_row,
                },
            );
        }

        self.resolve_types()?;
        for table in &self.schema {
            table.validate_serialization_indices()?;
        }
        Ok(())
    }

    fn discover_table(&mut self, sheet_ref: &SheetRef, sheet: &Sheet) -> Result<Option<(TableSchema, usize)>> {
        let label = sheet_ref.name.trim();
        let mut description = None;
        let name = match self.input.table_name_pattern.as_deref().filter(|p| !p.is_empty()) {
            Some(pattern) => {
                let regex = self.patterns.get(pattern)?;
                let Some(result) = regex.captures(label).and_then(|caps| {
                    description = caps.name("desc").map(|m| m.as_str().trim().to_string());
                    caps.name("result").map(|m| m.as_str().to_string())
                }) else {
                    info!("skip sheet '{label}': name does not match table name pattern '{pattern}'");
                    return Ok(None);
                };
                result
            }
            None => label.to_string(),
        };
        let name = sanitize_identifier(name.trim());
        if name.is_empty() {
            return Ok(None);
        }

        let rows = self.resolve_rows(sheet)?;
        let Some(name_row) = rows.get(RowKind::FieldName) else {
            warn!("skip sheet '{label}': not found field name row");
            return Ok(None);
        };

        let mut table = TableSchema::new(name, &self.root);
        table.origin_index = sheet_ref.index;
        table.description = description;
        if let Some(row) = rows.get(RowKind::TableDescription) {
            if let Some(text) = first_non_empty(sheet, row, 1 + self.input.offset_column) {
                table.description = Some(text);
            }
        }

        let data_row = rows
            .get(RowKind::Data)
            .unwrap_or_else(|| rows.rows.values().copied().max().unwrap_or(0) + 1);

        let include = InputConfig::tag_list(self.input.tag_include.as_deref());
        let exclude = InputConfig::tag_list(self.input.tag_exclude.as_deref());

        let mut fields: Vec<FieldSchema> = Vec::new();
        for column in (1 + self.input.offset_column)..=sheet.column_count() {
            let raw_name = sheet.text(name_row, column);
            if raw_name.is_empty() {
                continue;
            }
            let field_name = self.extract(&raw_name, RowKind::FieldName)?;
            if field_name.is_empty() {
                continue;
            }
            if let Some(row) = rows.get(RowKind::Exclude) {
                if sheet.cell(row, column).is_empty() {
                    continue;
                }
            }

            let mut field = FieldSchema::new(field_name, column);
            field.schema_order_index = fields.len();
            field.serialization_index = fields.len();

            if let Some(row) = rows.get(RowKind::FieldType) {
                let declared = self.extract(&sheet.text(row, column), RowKind::FieldType)?;
                if !declared.is_empty() {
                    field.declared_type_name = declared;
                }
            }
            field.resolved_type = self.resolver.resolve_builtin(&field.declared_type_name);

            if let Some(row) = rows.get(RowKind::Keyword) {
                let keywords = self.extract(&sheet.text(row, column), RowKind::Keyword)?;
                apply_keywords(&keywords, &mut table, &mut field)?;
            }
            if field.flags.contains(FieldFlags::EXCLUDE) {
                debug!("{}.{}: excluded by keyword", table.name, field.name);
                continue;
            }
            if !include.iter().all(|tag| field.tags.contains(tag))
                || exclude.iter().any(|tag| field.tags.contains(tag))
            {
                debug!("{}.{}: filtered by tags {:?}", table.name, field.name, field.tags);
                continue;
            }

            if let Some(row) = rows.get(RowKind::FieldSummary) {
                let summary = self.extract(&sheet.text(row, column), RowKind::FieldSummary)?;
                if !summary.is_empty() {
                    field.description = Some(summary);
                }
            }
            if let Some(row) = rows.get(RowKind::DefaultValue) {
                let text = self.extract(&sheet.text(row, column), RowKind::DefaultValue)?;
                if let (false, Some(primitive)) = (
                    text.is_empty(),
                    field.resolved_type.as_ref().and_then(TypeRef::as_primitive),
                ) {
                    field.default_value = Some(coerce_primitive(&Value::from(text), primitive)?);
                }
            }

            fields.push(field);
        }

        if fields.is_empty() {
            warn!("skip table '{}': field count is 0", table.name);
            return Ok(None);
        }
        table.fields = fields;
        Ok(Some((table, data_row)))
    }

    fn resolve_rows(&mut self, sheet: &Sheet) -> Result<ResolvedRows> {
        let mut resolved = ResolvedRows::default();
        let roles = self.input.rows.clone();
        for role in &roles {
            if resolved.rows.contains_key(&role.kind) {
                continue;
            }
            let row = match (role.fixed_index(), role.pattern.as_deref()) {
                (Some(index), _) => Some(index),
                (None, Some(pattern)) if !pattern.is_empty() => {
                    let regex = self.patterns.get(pattern)?;
                    (1 + self.input.offset_row..=sheet.row_count())
                        .find(|&row| regex.is_match(&sheet.text(row, self.input.label_column)))
                }
                _ => None,
            };
            if let Some(row) = row {
                resolved.rows.insert(role.kind, row);
            }
        }
        Ok(resolved)
    }

    fn extract(&mut self, text: &str, kind: RowKind) -> Result<String> {
        let pattern = self
            .input
            .find_row(kind)
            .and_then(|role| role.value_pattern.clone());
        Ok(self.patterns.extract(text, pattern.as_deref())?.trim().to_string())
    }

    fn resolve_types(&mut self) -> Result<()> {
        let lookup = TypeResolver::table_lookup(&self.schema);
        for table in self.schema.iter_mut() {
            for field in &mut table.fields {
                let resolved = self.resolver.resolve(&field.declared_type_name, &lookup).map_err(|e| {
                    TableGenError::config(format!("table '{}' field '{}': {e}", table.name, field.name))
                })?;
                field.resolved_type = Some(resolved);
            }
        }
        Ok(())
    }
}

fn first_non_empty(sheet: &Sheet, row: usize, from_column: usize) -> Option<String> {
    (from_column..=sheet.column_count())
        .map(|column| sheet.text(row, column))
        .find(|text| !text.is_empty())
}

impl<P: SheetProvider> TableSource for GridTableSource<P> {
    fn open(&mut self) -> Result<()> {
        if self.opened {
            return Ok(());
        }
        self.discover()?;
        self.opened = true;
        info!("discovered {} tables", self.schema.len());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.tables.clear();
        self.schema = SchemaSet::new();
        self.opened = false;
        self.provider.close();
        Ok(())
    }

    fn is_opened(&self) -> bool {
        self.opened
    }

    fn schema(&self) -> &SchemaSet {
        &self.schema
    }

    fn read_rows(&self, table: &str) -> Result<RowIter<'_>> {
        let schema = self
            .schema
            .get(table)
            .ok_or_else(|| TableGenError::discovery(format!("unknown table '{table}'")))?;
        let loaded = self.tables.get(&schema.name.to_lowercase()).ok_or_else(|| {
            TableGenError::discovery_in(&schema.name, "table source is closed")
        })?;
        let sheet = Arc::clone(&loaded.sheet);
        let columns: Vec<usize> = schema.fields.iter().map(|f| f.source_column_index).collect();

        let rows = (loaded.data_row..=sheet.row_count())
            .map(move |row| RawRow {
                index: row,
                cells: columns.iter().map(|&column| sheet.cell(row, column).clone()).collect(),
            })
            .take_while(|row| !row.cells.iter().all(Value::is_empty));
        Ok(Box::new(rows))
    }
}
