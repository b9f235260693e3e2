use super::TableSink;
use crate::binder::{MemberBinder, TypeCatalog};
use crate::convert::{ConversionContext, ConversionEngine, Separators};
use crate::generator::write_if_changed;
use crate::source::{load_records, TableSource};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tablegen_core::config::{CodeConfig, OutputConfig};
use tablegen_core::prelude::*;
use tracing::{debug, info};

/// Writes `<Table>.json` or `<Table>.yaml` per data table
pub struct JsonTableSink {
    output: OutputConfig,
    code: CodeConfig,
    separators: Separators,
    engine: ConversionEngine,
    binder: MemberBinder,
    model: Option<TypeModel>,
    catalog: Option<TypeCatalog>,
}

impl JsonTableSink {
    #[must_use]
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            output: config.output.clone(),
            code: config.code.clone(),
            separators: Separators::from_config(&config.input),
            engine: ConversionEngine::new(),
            binder: MemberBinder::new(),
            model: None,
            catalog: None,
        }
    }

    /// Bind against a model generated earlier in this run instead of the
    /// manifest on disk
    #[must_use]
    pub fn with_model(mut self, model: TypeModel) -> Self {
        self.model = Some(model);
        self
    }

    /// Replace the conversion chain
    #[must_use]
    pub fn with_engine(mut self, engine: ConversionEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn binder_mut(&mut self) -> &mut MemberBinder {
        &mut self.binder
    }

    fn artifact_path(&self, table: &TableSchema) -> PathBuf {
        self.output
            .path
            .join(format!("{}.{}", table.name, self.output.format.extension()))
    }

    fn load_model(&self, schema: &SchemaSet) -> Result<TypeModel> {
        if let Some(model) = &self.model {
            return Ok(model.clone());
        }
        let path = self
            .code
            .output_dir
            .join(TypeModel::manifest_name(&self.code.assembly_name));
        if !path.exists() {
            let table = schema.iter().next().map_or_else(String::new, |t| t.name.clone());
            info!("type manifest {} not found, generate code first", path.display());
            return Err(TableGenError::SchemaBindingError { table });
        }
        debug!("bind against {}", path.display());
        TypeModel::load(&path)
    }

    fn serialize(&self, records: &[Record]) -> Result<String> {
        match self.output.format {
            OutputFormat::Json => {
                let mut text = if self.output.pretty {
                    serde_json::to_string_pretty(records)?
                } else {
                    serde_json::to_string(records)?
                };
                text.push('\n');
                Ok(text)
            }
            OutputFormat::Yaml => Ok(serde_yaml::to_string(records)?),
        }
    }

    /// Remove artifacts of this sink's format that this run will not write
    fn remove_stale(&self, keep: &HashSet<PathBuf>) -> Result<()> {
        let extension = self.output.format.extension();
        let Ok(entries) = fs::read_dir(&self.output.path) else {
            return Ok(());
        };
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || keep.contains(&path) || !has_extension(&path, extension) {
                continue;
            }
            if path.to_string_lossy().ends_with(".types.json") {
                continue;
            }
            fs::remove_file(&path)?;
            info!("remove stale {}", path.display());
        }
        Ok(())
    }

    fn writable<'s>(source: &'s dyn TableSource) -> impl Iterator<Item = &'s TableSchema> {
        source
            .schema()
            .iter()
            .filter(|table| table.has_data() && !table.is_enum())
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

impl TableSink for JsonTableSink {
    fn open(&mut self, source: &dyn TableSource) -> Result<()> {
        let model = self.load_model(source.schema())?;
        self.catalog = Some(TypeCatalog::bind(source.schema(), model, &self.code)?);

        fs::create_dir_all(&self.output.path)?;
        let keep = Self::writable(source)
            .map(|table| self.artifact_path(table))
            .collect();
        self.remove_stale(&keep)
    }

    fn write_all(&mut self, source: &dyn TableSource) -> Result<Vec<PathBuf>> {
        if self.catalog.is_none() {
            self.open(source)?;
        }
        let Some(catalog) = self.catalog.as_ref() else {
            return Ok(Vec::new());
        };

        let mut written = Vec::new();
        for table in Self::writable(source) {
            let records = {
                let mut ctx = ConversionContext::new(
                    source.schema(),
                    catalog,
                    &mut self.binder,
                    &self.separators,
                );
                load_records(source, table, &self.engine, &mut ctx)?
            };
            let path = self.artifact_path(table);
            write_if_changed(&path, self.serialize(&records)?.as_bytes())?;
            info!("write {} rows of {} to {}", records.len(), table.name, path.display());
            written.push(path);
        }
        Ok(written)
    }
}
