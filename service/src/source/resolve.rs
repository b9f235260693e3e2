//! Declared type name resolution

use std::collections::HashMap;
use tablegen_core::prelude::*;
use tablegen_core::utils::sanitize_identifier;

/// Table names visible to resolution, keyed by lowercase name
pub type TableLookup = HashMap<String, (String, TableKind)>;

/// Resolves declared type names such as `int`, `Reward[]` or `vec3`
#[derive(Debug, Clone, Default)]
pub struct TypeResolver {
    /// lowercase sheet name → code name
    mappings: HashMap<String, String>,
}

impl TypeResolver {
    #[must_use]
    pub fn new(mappings: &[TypeMapping]) -> Self {
        Self {
            mappings: mappings
                .iter()
                .map(|m| (m.mapping.trim().to_lowercase(), m.name.trim().to_string()))
                .collect(),
        }
    }

    /// Lookup of every table in a schema
    #[must_use]
    pub fn table_lookup(schema: &SchemaSet) -> TableLookup {
        schema
            .iter()
            .map(|table| (table.name.to_lowercase(), (table.name.clone(), table.kind())))
            .collect()
    }

    /// Resolve without knowing the tables: primitives, mapped primitives
    /// and arrays of them. `None` means "needs the table pass".
    #[must_use]
    pub fn resolve_builtin(&self, declared: &str) -> Option<TypeRef> {
        self.resolve_in(declared, None).ok().flatten()
    }

    /// Resolve against the discovered tables
    pub fn resolve(&self, declared: &str, tables: &TableLookup) -> Result<TypeRef> {
        self.resolve_in(declared, Some(tables))?.ok_or_else(|| {
            TableGenError::config(format!("not found type '{declared}'"))
        })
    }

    fn resolve_in(&self, declared: &str, tables: Option<&TableLookup>) -> Result<Option<TypeRef>> {
        let declared = declared.trim();
        if declared.is_empty() {
            return Ok(Some(TypeRef::Primitive(PrimitiveType::String)));
        }
        if let Some(element) = declared.strip_suffix("[]") {
            return Ok(self.resolve_in(element, tables)?.map(TypeRef::array_of));
        }

        let (name, mapped) = match self.mappings.get(&declared.to_lowercase()) {
            Some(name) => (name.as_str(), true),
            None => (declared, false),
        };
        if let Some(primitive) = PrimitiveType::from_name(name) {
            return Ok(Some(TypeRef::Primitive(primitive)));
        }

        let Some(tables) = tables else {
            return Ok(None);
        };
        if let Some((table, kind)) = tables.get(&sanitize_identifier(name).to_lowercase()) {
            return Ok(Some(match kind {
                TableKind::Enum => TypeRef::Enum(table.clone()),
                TableKind::Class | TableKind::Struct => TypeRef::Table(table.clone()),
            }));
        }
        if mapped {
            return Ok(Some(TypeRef::External(name.to_string())));
        }
        Err(TableGenError::config(format!(
            "not found type '{declared}', declare a table with that name or add a type mapping"
        )))
    }
}
