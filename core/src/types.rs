//! Schema and value model
//!
//! Discovery builds one [`SchemaSet`] per run. Generators read it to emit
//! types, and sinks read it together with converted [`Value`]s to write
//! table data.

use crate::error::{Result, TableGenError};
use crate::parameters::ParameterScope;
use bitflags::bitflags;
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

bitflags! {
    /// Table kind and behaviour flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TableFlags: u8 {
        const CLASS = 1;
        const STRUCT = 1 << 1;
        const ENUM = 1 << 2;
        /// Schema only, no data artifact is written
        const NO_DATA = 1 << 3;
    }
}

bitflags! {
    /// Per-field flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct FieldFlags: u8 {
        const KEY = 1;
        const EXCLUDE = 1 << 1;
    }
}

/// Shape of the type generated for a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// Referenced by other tables as an optional value
    Class,
    /// Referenced by other tables by value
    Struct,
    Enum,
}

/// Built-in scalar types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Bool,
    String,
}

impl PrimitiveType {
    /// Look up a declared type name, case-insensitively
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let primitive = match name.trim().to_ascii_lowercase().as_str() {
            "int8" | "sbyte" => Self::Int8,
            "int16" | "short" => Self::Int16,
            "int32" | "int" => Self::Int32,
            "int64" | "long" => Self::Int64,
            "uint8" | "byte" => Self::UInt8,
            "uint16" | "ushort" => Self::UInt16,
            "uint32" | "uint" => Self::UInt32,
            "uint64" | "ulong" => Self::UInt64,
            "float32" | "float" => Self::Float32,
            "float64" | "double" => Self::Float64,
            "bool" | "boolean" => Self::Bool,
            "string" => Self::String,
            _ => return None,
        };
        Some(primitive)
    }

    /// Canonical schema name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Bool => "bool",
            Self::String => "string",
        }
    }

    /// Rust spelling of the type
    #[must_use]
    pub fn rust_type(self) -> &'static str {
        match self {
            Self::Int8 => "i8",
            Self::Int16 => "i16",
            Self::Int32 => "i32",
            Self::Int64 => "i64",
            Self::UInt8 => "u8",
            Self::UInt16 => "u16",
            Self::UInt32 => "u32",
            Self::UInt64 => "u64",
            Self::Float32 => "f32",
            Self::Float64 => "f64",
            Self::Bool => "bool",
            Self::String => "String",
        }
    }

    #[must_use]
    pub fn is_signed(self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    #[must_use]
    pub fn is_unsigned(self) -> bool {
        matches!(self, Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64)
    }

    #[must_use]
    pub fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// Whether generated code can use the type as a hash map key
    #[must_use]
    pub fn is_hashable(self) -> bool {
        !self.is_float()
    }

    /// Value of `Default::default()` for the type
    #[must_use]
    pub fn zero(self) -> Value {
        match self {
            p if p.is_signed() => Value::Int(0),
            p if p.is_unsigned() => Value::UInt(0),
            p if p.is_float() => Value::Float(0.0),
            Self::Bool => Value::Bool(false),
            _ => Value::String(String::new()),
        }
    }
}

/// A resolved field type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum TypeRef {
    Primitive(PrimitiveType),
    Array(Box<TypeRef>),
    /// Another discovered Class or Struct table, by table name
    Table(String),
    /// A discovered Enum table, by table name
    Enum(String),
    /// A mapped type the generator emits verbatim
    External(String),
}

impl TypeRef {
    #[must_use]
    pub fn array_of(element: TypeRef) -> Self {
        Self::Array(Box::new(element))
    }

    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(_))
    }

    /// Primitive type, if any
    #[must_use]
    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self {
            Self::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// Element type when this is an array
    #[must_use]
    pub fn element(&self) -> Option<&TypeRef> {
        match self {
            Self::Array(element) => Some(element),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => f.write_str(p.name()),
            Self::Array(element) => write!(f, "{element}[]"),
            Self::Table(name) | Self::Enum(name) | Self::External(name) => f.write_str(name),
        }
    }
}

/// One discovered column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSchema {
    pub name: String,
    /// Type name after type mappings, as written otherwise
    pub declared_type_name: String,
    /// Filled in once every table of the run is known
    pub resolved_type: Option<TypeRef>,
    pub description: Option<String>,
    /// 1-based physical column
    pub source_column_index: usize,
    /// Position among the table's surviving fields
    pub schema_order_index: usize,
    /// Position inside a delimited composite cell
    pub serialization_index: usize,
    /// `Some(Value::Null)` is an explicit `default(null)`
    pub default_value: Option<Value>,
    pub flags: FieldFlags,
    pub array_separators: Vec<String>,
    pub object_separators: Vec<String>,
    pub tags: BTreeSet<String>,
}

impl FieldSchema {
    #[must_use]
    pub fn new(name: impl Into<String>, source_column_index: usize) -> Self {
        Self {
            name: name.into(),
            declared_type_name: PrimitiveType::String.name().to_string(),
            resolved_type: None,
            description: None,
            source_column_index,
            schema_order_index: 0,
            serialization_index: 0,
            default_value: None,
            flags: FieldFlags::empty(),
            array_separators: Vec::new(),
            object_separators: Vec::new(),
            tags: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn has_default(&self) -> bool {
        self.default_value.is_some()
    }

    #[must_use]
    pub fn is_key(&self) -> bool {
        self.flags.contains(FieldFlags::KEY)
    }

    /// Resolved type, or a configuration error naming the field
    pub fn value_type(&self) -> Result<&TypeRef> {
        self.resolved_type.as_ref().ok_or_else(|| {
            TableGenError::config(format!(
                "field '{}' has unresolved type '{}'",
                self.name, self.declared_type_name
            ))
        })
    }
}

/// One discovered table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSchema {
    /// Sanitized identifier
    pub name: String,
    pub description: Option<String>,
    /// Position of the sheet inside its workbook
    pub origin_index: usize,
    pub fields: Vec<FieldSchema>,
    pub flags: TableFlags,
    #[serde(skip)]
    pub parameters: ParameterScope,
}

impl TableSchema {
    #[must_use]
    pub fn new(name: impl Into<String>, parent: &ParameterScope) -> Self {
        let name = name.into();
        let mut parameters = parent.child();
        parameters.set("TableName", name.clone());
        Self {
            name,
            description: None,
            origin_index: 0,
            fields: Vec::new(),
            flags: TableFlags::empty(),
            parameters,
        }
    }

    /// Generated type shape; Class unless flagged otherwise
    #[must_use]
    pub fn kind(&self) -> TableKind {
        if self.flags.contains(TableFlags::ENUM) {
            TableKind::Enum
        } else if self.flags.contains(TableFlags::STRUCT) {
            TableKind::Struct
        } else {
            TableKind::Class
        }
    }

    #[must_use]
    pub fn is_enum(&self) -> bool {
        self.kind() == TableKind::Enum
    }

    /// Whether a data artifact is written for the table
    #[must_use]
    pub fn has_data(&self) -> bool {
        !self.flags.contains(TableFlags::NO_DATA) && !self.is_enum()
    }

    /// Field by name, case-insensitively
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields
            .iter()
            .find(|field| field.name.eq_ignore_ascii_case(name))
    }

    /// First key field
    #[must_use]
    pub fn key_field(&self) -> Option<&FieldSchema> {
        self.fields.iter().find(|field| field.is_key())
    }

    /// Fields ordered by ascending serialization index
    #[must_use]
    pub fn fields_by_serialization(&self) -> Vec<&FieldSchema> {
        let mut fields: Vec<&FieldSchema> = self.fields.iter().collect();
        fields.sort_by_key(|field| field.serialization_index);
        fields
    }

    /// Serialization indices must be exactly `0..fields.len()`.
    ///
    /// Composite cells are decoded positionally, so a gap or a collision
    /// would silently assign parts to the wrong member.
    pub fn validate_serialization_indices(&self) -> Result<()> {
        let mut seen = vec![false; self.fields.len()];
        for field in &self.fields {
            match seen.get_mut(field.serialization_index) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    let indices: Vec<usize> =
                        self.fields.iter().map(|f| f.serialization_index).collect();
                    return Err(TableGenError::config(format!(
                        "table '{}': serialization indices must be unique and dense, found {indices:?} at field '{}'",
                        self.name, field.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// All tables discovered in one run, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SchemaSet {
    tables: Vec<TableSchema>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl SchemaSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table; names are unique case-insensitively
    pub fn insert(&mut self, table: TableSchema) -> Result<()> {
        let key = table.name.to_lowercase();
        if self.index.contains_key(&key) {
            return Err(TableGenError::discovery_in(
                table.name,
                "duplicate table name",
            ));
        }
        self.index.insert(key, self.tables.len());
        self.tables.push(table);
        Ok(())
    }

    /// Table by name, case-insensitively
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TableSchema> {
        self.index
            .get(&name.to_lowercase())
            .map(|&position| &self.tables[position])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TableSchema> {
        self.tables.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, TableSchema> {
        self.tables.iter_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl<'a> IntoIterator for &'a SchemaSet {
    type Item = &'a TableSchema;
    type IntoIter = std::slice::Iter<'a, TableSchema>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.iter()
    }
}

/// A raw cell or a converted value
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Record(Record),
    Enum(EnumValue),
}

impl Value {
    /// Cell text to value; empty text is null
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        if text.is_empty() {
            Self::Null
        } else {
            Self::String(text.to_string())
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Null, or a string with no visible characters
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Display form used for string coercion and diagnostics
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Record(record) => write!(f, "{record}"),
            Self::Enum(value) => f.write_str(&value.name),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::String(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::String(text)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

/// An instance of a generated type, member values keyed by binding name
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    type_name: String,
    fields: IndexMap<String, Value>,
}

impl Record {
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Builder-style [`Record::set`]
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.fields.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.type_name)?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{name}: {value}")?;
        }
        f.write_str(" }")
    }
}

/// A variant of a generated enum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub type_name: String,
    pub name: String,
}

impl EnumValue {
    #[must_use]
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
        }
    }
}

impl Serialize for EnumValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}
