//! Generated type model
//!
//! Code generation describes every type it emits as a [`TypeDescriptor`].
//! The model is the contract between generated code and the data writer:
//! it is cached for the rest of a run and persisted next to the generated
//! sources so a later data-only run can bind against it.

use crate::error::{Result, TableGenError};
use crate::types::{TableKind, TypeRef};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// All generated types of one module
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeModel {
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub types: Vec<TypeDescriptor>,
}

impl TypeModel {
    /// Manifest file name for a module
    #[must_use]
    pub fn manifest_name(module: &str) -> String {
        format!("{module}.types.json")
    }

    /// Resolve a name by case-insensitive full name, then simple name
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types
            .iter()
            .find(|ty| ty.full_name().eq_ignore_ascii_case(name))
            .or_else(|| {
                let simple = name.rsplit("::").next().unwrap_or(name);
                self.types
                    .iter()
                    .find(|ty| ty.name.eq_ignore_ascii_case(simple))
            })
    }

    /// Descriptor generated from a table
    #[must_use]
    pub fn for_table(&self, table: &str) -> Option<&TypeDescriptor> {
        self.types
            .iter()
            .find(|ty| ty.table.eq_ignore_ascii_case(table))
    }

    /// Pretty JSON used for the manifest
    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Read a manifest written by a previous generation
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            TableGenError::serialization(format!(
                "invalid type manifest {}: {e}",
                path.display()
            ))
        })
    }
}

/// One generated type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Type identifier in generated code
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Table the type was generated from
    pub table: String,
    pub kind: TableKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub members: Vec<MemberDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<EnumVariant>,
}

impl TypeDescriptor {
    /// `namespace::Name`, or the bare name without a namespace
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.namespace {
            Some(namespace) if !namespace.is_empty() => format!("{namespace}::{}", self.name),
            _ => self.name.clone(),
        }
    }

    /// Variant by label or identifier, case-insensitively
    #[must_use]
    pub fn variant(&self, name: &str) -> Option<&EnumVariant> {
        let name = name.trim();
        self.variants
            .iter()
            .find(|v| v.label.eq_ignore_ascii_case(name) || v.name.eq_ignore_ascii_case(name))
    }
}

/// How a member is accessed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemberKind {
    Field,
    Property { readable: bool, writable: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// One member of a generated type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDescriptor {
    /// Member identifier in generated code
    pub name: String,
    /// Serialized name; columns bind by this name when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
    pub kind: MemberKind,
    #[serde(default)]
    pub visibility: Visibility,
    /// Produced by the compiler rather than declared
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub synthesized: bool,
    pub value_type: TypeRef,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub key: bool,
    #[serde(default)]
    pub serialization_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MemberDescriptor {
    /// A public field
    #[must_use]
    pub fn field(name: impl Into<String>, value_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            rename: None,
            kind: MemberKind::Field,
            visibility: Visibility::Public,
            synthesized: false,
            value_type,
            key: false,
            serialization_index: 0,
            description: None,
        }
    }

    #[must_use]
    pub fn renamed(mut self, rename: impl Into<String>) -> Self {
        self.rename = Some(rename.into());
        self
    }

    /// Name a column binds to
    #[must_use]
    pub fn binding_name(&self) -> &str {
        self.rename.as_deref().unwrap_or(&self.name)
    }
}

/// One variant of a generated enum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumVariant {
    /// Variant identifier in generated code
    pub name: String,
    /// Name as written in the enum table
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
