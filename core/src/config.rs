//! Pipeline configuration
//!
//! A build run is driven by one [`PipelineConfig`] document loaded from
//! YAML, JSON or TOML. Every section is `#[serde(default)]` so a minimal
//! file only names what differs from the defaults.

use crate::error::{Result, TableGenError};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "tablegen.yaml";

/// Root configuration for one build run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Where tables are read from and how their rows are laid out
    pub input: InputConfig,
    /// Where serialized table data goes
    pub output: OutputConfig,
    /// Code generation settings
    pub code: CodeConfig,
    /// Declared type name overrides
    pub type_mappings: Vec<TypeMapping>,
}

/// Tabular back-end used to enumerate sheets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Spreadsheet workbooks read through calamine
    #[default]
    Workbook,
    /// One CSV file per table
    Csv,
}

/// Input settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub provider: ProviderKind,
    /// Root directory, searched recursively
    pub directory: PathBuf,
    /// Regex over file paths; defaults depend on the provider
    pub file_include_pattern: Option<String>,
    pub file_exclude_pattern: Option<String>,
    /// Regex over table labels with a `result` group and optional `desc` group
    pub table_name_pattern: Option<String>,
    pub offset_row: usize,
    pub offset_column: usize,
    /// Column whose cells role patterns are matched against
    pub label_column: usize,
    pub rows: Vec<RowRole>,
    /// Comma separated tags a field must all carry
    pub tag_include: Option<String>,
    /// Comma separated tags that drop a field
    pub tag_exclude: Option<String>,
    /// Array separators, outermost first
    #[serde(deserialize_with = "separator_list")]
    pub array_separators: Vec<String>,
    /// Object separators, outermost first
    #[serde(deserialize_with = "separator_list")]
    pub object_separators: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            directory: PathBuf::from("."),
            file_include_pattern: None,
            file_exclude_pattern: None,
            table_name_pattern: None,
            offset_row: 0,
            offset_column: 0,
            label_column: 1,
            rows: RowRole::defaults(),
            tag_include: None,
            tag_exclude: None,
            array_separators: split_separators(DEFAULT_ARRAY_SEPARATORS),
            object_separators: split_separators(DEFAULT_OBJECT_SEPARATORS),
        }
    }
}

/// Default array separators, one per depth
pub const DEFAULT_ARRAY_SEPARATORS: &str = "| !";

/// Default object separators, one per depth
pub const DEFAULT_OBJECT_SEPARATORS: &str = ": ,";

/// Split a space separated separator list
#[must_use]
pub fn split_separators(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

fn separator_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Separators {
        Joined(String),
        List(Vec<String>),
    }

    Ok(match Separators::deserialize(deserializer)? {
        Separators::Joined(text) => split_separators(&text),
        Separators::List(list) => list,
    })
}

impl InputConfig {
    /// File include pattern, falling back to the provider's default
    #[must_use]
    pub fn include_pattern(&self) -> &str {
        match (&self.file_include_pattern, self.provider) {
            (Some(pattern), _) => pattern,
            (None, ProviderKind::Workbook) => r"\.(xlsx|xlsm|xlsb|xls|ods)$",
            (None, ProviderKind::Csv) => r"\.csv$",
        }
    }

    /// First configured role of the given kind
    #[must_use]
    pub fn find_row(&self, kind: RowKind) -> Option<&RowRole> {
        self.rows.iter().find(|row| row.kind == kind)
    }

    /// Lowercased tags from a comma separated list
    #[must_use]
    pub fn tag_list(list: Option<&str>) -> Vec<String> {
        list.map(|text| {
            text.split(',')
                .map(|tag| tag.trim().to_lowercase())
                .filter(|tag| !tag.is_empty())
                .collect()
        })
        .unwrap_or_default()
    }
}

/// What a physical row means inside a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    TableDescription,
    FieldName,
    FieldType,
    FieldSummary,
    Keyword,
    Data,
    /// Deprecated: per-column default values, superseded by `default(..)`
    DefaultValue,
    /// Deprecated: a column is kept only when this row's cell is non-empty
    Exclude,
}

/// A row role, located by fixed index or by label pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRole {
    pub kind: RowKind,
    /// 1-based physical row; wins over `pattern` when set
    #[serde(default)]
    pub index: Option<usize>,
    /// Regex matched against the label column
    #[serde(default)]
    pub pattern: Option<String>,
    /// Regex with a `result` group extracting the value from each cell
    #[serde(default)]
    pub value_pattern: Option<String>,
}

impl RowRole {
    /// Role at a fixed row
    #[must_use]
    pub fn at(kind: RowKind, index: usize) -> Self {
        Self {
            kind,
            index: Some(index),
            pattern: None,
            value_pattern: None,
        }
    }

    /// Role found by matching the label column
    #[must_use]
    pub fn matching(kind: RowKind, pattern: impl Into<String>) -> Self {
        Self {
            kind,
            index: None,
            pattern: Some(pattern.into()),
            value_pattern: None,
        }
    }

    /// Attach a value pattern
    #[must_use]
    pub fn with_value_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.value_pattern = Some(pattern.into());
        self
    }

    /// Fixed index when positive
    #[must_use]
    pub fn fixed_index(&self) -> Option<usize> {
        self.index.filter(|index| *index > 0)
    }

    fn defaults() -> Vec<Self> {
        vec![
            Self::at(RowKind::TableDescription, 1),
            Self::at(RowKind::FieldName, 2),
            Self::at(RowKind::FieldType, 3),
            Self::at(RowKind::Keyword, 4),
            Self::at(RowKind::FieldSummary, 5),
        ]
    }
}

/// Serialized artifact format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl OutputFormat {
    /// File extension without the dot
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
            format: OutputFormat::Json,
            pretty: true,
        }
    }
}

/// Layout of generated source files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeLayout {
    /// One bundled source file compiled into a library artifact
    #[default]
    Bundle,
    /// One source file per type plus a module index
    PerType,
    /// `PerType` plus a crate manifest created once
    PerTypeWithManifest,
}

/// Code generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeConfig {
    pub output_dir: PathBuf,
    /// Module (crate) name of the generated code
    pub assembly_name: String,
    pub namespace: Option<String>,
    /// Type name template, `{TableName}` is replaced per table
    pub type_name_template: String,
    pub format: CodeLayout,
    /// Handlebars template overriding the built-in type template
    pub template_path: Option<PathBuf>,
    /// Handlebars template overriding the built-in module index template
    pub index_template_path: Option<PathBuf>,
    pub generate_indexer: bool,
    /// Scratch directory for bundled sources and compiler output
    pub temp_dir: PathBuf,
    /// Compiler executable used for the bundle layout
    pub compiler: String,
    pub edition: String,
    /// Extra compiler arguments such as `--extern name=path` or `-L dir`
    pub references: Vec<String>,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("generated"),
            assembly_name: "tables".to_string(),
            namespace: None,
            type_name_template: "{TableName}".to_string(),
            format: CodeLayout::Bundle,
            template_path: None,
            index_template_path: None,
            generate_indexer: false,
            temp_dir: PathBuf::from("target/tablegen"),
            compiler: "rustc".to_string(),
            edition: "2021".to_string(),
            references: Vec::new(),
        }
    }
}

/// Maps a type name written in a sheet onto a code type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMapping {
    /// Type used in generated code
    pub name: String,
    /// Type name as written in the sheet
    pub mapping: String,
}

impl PipelineConfig {
    /// Load, substitute environment references and validate a config file.
    ///
    /// The format is chosen by extension: `.yaml`/`.yml`, `.json` or `.toml`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TableGenError::config(format!(
                "failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        let content = substitute_env_vars(&content);

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let config: Self = match extension.as_deref() {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| TableGenError::config(format!("invalid JSON config: {e}")))?,
            Some("toml") => toml::from_str(&content)
                .map_err(|e| TableGenError::config(format!("invalid TOML config: {e}")))?,
            Some("yaml" | "yml") | None => serde_yaml::from_str(&content)
                .map_err(|e| TableGenError::config(format!("invalid YAML config: {e}")))?,
            Some(other) => {
                return Err(TableGenError::config(format!(
                    "unsupported config format '.{other}'"
                )));
            }
        };

        config.validate()?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Check the invariants discovery relies on
    pub fn validate(&self) -> Result<()> {
        if self.input.find_row(RowKind::FieldName).is_none() {
            return Err(TableGenError::config("missing field name row config"));
        }
        for row in &self.input.rows {
            if row.fixed_index().is_none() && row.pattern.as_deref().map_or(true, str::is_empty) {
                return Err(TableGenError::config(format!(
                    "row role {:?} needs an index or a pattern",
                    row.kind
                )));
            }
        }
        if self.input.label_column == 0 {
            return Err(TableGenError::config("label column is 1-based"));
        }
        if self.input.array_separators.is_empty() || self.input.object_separators.is_empty() {
            return Err(TableGenError::config("separator lists must not be empty"));
        }
        if !self.code.type_name_template.contains("{TableName}") {
            tracing::warn!(
                "type name template '{}' has no {{TableName}} placeholder, all tables share one type name",
                self.code.type_name_template
            );
        }
        Ok(())
    }
}

static ENV_VAR: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"\$\{([^}:]+)(?::(-)?([^}]*))?\}").expect("Valid env var regex pattern")
});

/// Replace `${VAR}` and `${VAR:-default}` with environment values
fn substitute_env_vars(content: &str) -> String {
    ENV_VAR
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(3).map_or("", |m| m.as_str());

            env::var(var_name).unwrap_or_else(|_| default_value.to_string())
        })
        .to_string()
}
