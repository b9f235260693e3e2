//! Schema → type model and render documents
//!
//! Tables become types and fields become members. Enum tables are the
//! exception: their rows are read as `Name`/`Value`/`Description` triples
//! and become the variants of a fieldless enum.

use crate::convert::coerce_primitive;
use crate::source::TableSource;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tablegen_core::config::CodeConfig;
use tablegen_core::prelude::*;
use tablegen_core::utils::{is_valid_identifier, to_pascal_case, to_snake_case};

/// Render input for one type
#[derive(Debug, Clone, Serialize)]
pub struct TypeDocument {
    pub name: String,
    pub table: String,
    pub is_enum: bool,
    pub doc: Vec<String>,
    pub members: Vec<MemberDocument>,
    pub variants: Vec<VariantDocument>,
    /// Any variant declares an explicit value
    pub repr: bool,
    pub index: Option<IndexDocument>,
    /// First type of the run
    pub first: bool,
    pub module: String,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberDocument {
    pub ident: String,
    pub rename: String,
    pub rust_type: String,
    pub doc: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariantDocument {
    pub ident: String,
    pub label: String,
    pub has_value: bool,
    pub value: i64,
    pub doc: Vec<String>,
}

/// Key lookup emitted when indexers are enabled
#[derive(Debug, Clone, Serialize)]
pub struct IndexDocument {
    pub method: String,
    pub ident: String,
    pub column: String,
    pub key_type: String,
}

/// Everything generation needs: the model and one document per type
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    pub model: TypeModel,
    pub types: Vec<TypeDocument>,
}

/// Build the type model and render documents for a discovered schema
pub fn build(source: &dyn TableSource, code: &CodeConfig) -> Result<SchemaDocument> {
    let schema = source.schema();
    let namespace = code.namespace.clone().filter(|ns| !ns.is_empty());

    let mut type_names: HashMap<String, String> = HashMap::new();
    let mut seen = HashSet::new();
    for table in schema {
        let name = table.parameters.format(&code.type_name_template)?;
        if !is_valid_identifier(&name) {
            return Err(TableGenError::generation(format!(
                "table '{}': type name '{name}' is not a valid identifier",
                table.name
            )));
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(TableGenError::generation(format!(
                "table '{}': type name '{name}' is already used by another table",
                table.name
            )));
        }
        type_names.insert(table.name.to_lowercase(), name);
    }

    let mut model = TypeModel {
        module: code.assembly_name.clone(),
        namespace: namespace.clone(),
        types: Vec::new(),
    };
    let mut types = Vec::new();

    for table in schema {
        let name = type_names
            .get(&table.name.to_lowercase())
            .cloned()
            .unwrap_or_else(|| table.name.clone());
        let mut document = TypeDocument {
            name: name.clone(),
            table: table.name.clone(),
            is_enum: table.is_enum(),
            doc: doc_lines(table.description.as_deref()),
            members: Vec::new(),
            variants: Vec::new(),
            repr: false,
            index: None,
            first: types.is_empty(),
            module: code.assembly_name.clone(),
            namespace: namespace.clone(),
        };
        let mut descriptor = TypeDescriptor {
            name,
            namespace: namespace.clone(),
            table: table.name.clone(),
            kind: table.kind(),
            description: table.description.clone(),
            members: Vec::new(),
            variants: Vec::new(),
        };

        if table.is_enum() {
            descriptor.variants = enum_variants(source, table)?;
            document.repr = descriptor.variants.iter().any(|v| v.value.is_some());
            document.variants = descriptor
                .variants
                .iter()
                .map(|variant| VariantDocument {
                    ident: variant.name.clone(),
                    label: variant.label.clone(),
                    has_value: variant.value.is_some(),
                    value: variant.value.unwrap_or_default(),
                    doc: doc_lines(variant.description.as_deref()),
                })
                .collect();
        } else {
            let mut idents = HashSet::new();
            for field in &table.fields {
                let ident = to_snake_case(&field.name);
                if !idents.insert(ident.clone()) {
                    return Err(TableGenError::generation(format!(
                        "table '{}': columns collide on member '{ident}'",
                        table.name
                    )));
                }
                let value_type = field.value_type()?.clone();
                let rust_type = rust_type(&value_type, schema, &type_names, true)?;
                document.members.push(MemberDocument {
                    ident: ident.clone(),
                    rename: field.name.clone(),
                    rust_type,
                    doc: doc_lines(field.description.as_deref()),
                });

                let mut member = MemberDescriptor::field(ident, value_type).renamed(field.name.clone());
                member.key = field.is_key();
                member.serialization_index = field.serialization_index;
                member.description = field.description.clone();
                descriptor.members.push(member);
            }

            if code.generate_indexer {
                document.index = index_document(table, &document.members)?;
            }
        }

        model.types.push(descriptor);
        types.push(document);
    }

    Ok(SchemaDocument { model, types })
}

fn doc_lines(text: Option<&str>) -> Vec<String> {
    text.map(|text| {
        text.lines()
            .map(|line| line.trim_end().to_string())
            .filter(|line| !line.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// Rust spelling of a value type. Class references are optional and boxed
/// at the top level so self-referencing tables stay sized.
fn rust_type(
    ty: &TypeRef,
    schema: &SchemaSet,
    type_names: &HashMap<String, String>,
    top: bool,
) -> Result<String> {
    let name_of = |table: &str| {
        type_names
            .get(&table.to_lowercase())
            .cloned()
            .ok_or_else(|| TableGenError::generation(format!("unknown table type '{table}'")))
    };
    Ok(match ty {
        TypeRef::Primitive(primitive) => primitive.rust_type().to_string(),
        TypeRef::Array(element) => format!("Vec<{}>", rust_type(element, schema, type_names, false)?),
        TypeRef::Enum(table) => name_of(table)?,
        TypeRef::Table(table) => {
            let name = name_of(table)?;
            match schema.get(table).map(TableSchema::kind) {
                Some(TableKind::Class) if top => format!("Option<Box<{name}>>"),
                _ => name,
            }
        }
        TypeRef::External(path) => path.clone(),
    })
}

fn index_document(table: &TableSchema, members: &[MemberDocument]) -> Result<Option<IndexDocument>> {
    let Some(key) = table.key_field() else {
        return Ok(None);
    };
    let hashable = match key.value_type()? {
        TypeRef::Primitive(primitive) => primitive.is_hashable(),
        TypeRef::Enum(_) => true,
        _ => false,
    };
    if !hashable {
        tracing::warn!("table '{}': key '{}' is not hashable, no indexer", table.name, key.name);
        return Ok(None);
    }
    let Some(member) = members.iter().find(|m| m.rename == key.name) else {
        return Ok(None);
    };
    Ok(Some(IndexDocument {
        method: format!("index_by_{}", member.ident.trim_start_matches("r#")),
        ident: member.ident.clone(),
        column: key.name.clone(),
        key_type: member.rust_type.clone(),
    }))
}

/// Variants of an enum table, read from its rows
fn enum_variants(source: &dyn TableSource, table: &TableSchema) -> Result<Vec<EnumVariant>> {
    let column = |name: &str| {
        table
            .fields
            .iter()
            .position(|field| field.name.eq_ignore_ascii_case(name))
    };
    let (Some(name_column), Some(value_column)) = (column("Name"), column("Value")) else {
        return Err(TableGenError::generation(format!(
            "enum table '{}' needs 'Name' and 'Value' columns",
            table.name
        )));
    };
    let description_column = column("Description");

    let mut variants: Vec<EnumVariant> = Vec::new();
    for row in source.read_rows(&table.name)? {
        let cell = |position: usize| row.cells.get(position).cloned().unwrap_or_default();
        let label = cell(name_column).to_text().trim().to_string();
        if label.is_empty() {
            continue;
        }
        let ident = to_pascal_case(&label);
        if variants.iter().any(|v| v.name == ident) {
            return Err(TableGenError::generation(format!(
                "enum table '{}': duplicate variant '{ident}' at row {}",
                table.name, row.index
            )));
        }

        let raw = cell(value_column);
        let value = if raw.is_empty() {
            None
        } else {
            match coerce_primitive(&raw, PrimitiveType::Int64) {
                Ok(Value::Int(number)) => Some(number),
                _ => {
                    return Err(TableGenError::ConversionError {
                        table: table.name.clone(),
                        row: row.index,
                        column: table.fields[value_column].name.clone(),
                        column_index: table.fields[value_column].source_column_index,
                        value: raw.to_text(),
                        target: PrimitiveType::Int64.name().to_string(),
                        message: "enum values are integers".to_string(),
                    });
                }
            }
        };
        let description = description_column
            .map(|position| cell(position).to_text().trim().to_string())
            .filter(|text| !text.is_empty());

        variants.push(EnumVariant {
            name: ident,
            label,
            value,
            description,
        });
    }

    if variants.is_empty() {
        return Err(TableGenError::generation(format!(
            "enum table '{}' has no rows",
            table.name
        )));
    }
    Ok(variants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn schema_with(kind: TableFlags) -> SchemaSet {
        let scope = ParameterScope::default();
        let mut schema = SchemaSet::new();
        let mut table = TableSchema::new("Node", &scope);
        table.flags = kind;
        schema.insert(table).unwrap();
        schema
    }

    fn names() -> HashMap<String, String> {
        HashMap::from([("node".to_string(), "Node".to_string())])
    }

    #[test]
    fn test_rust_types() {
        let class = schema_with(TableFlags::CLASS);
        let node = TypeRef::Table("Node".into());
        assert_eq!(rust_type(&node, &class, &names(), true).unwrap(), "Option<Box<Node>>");
        assert_eq!(
            rust_type(&TypeRef::array_of(node.clone()), &class, &names(), true).unwrap(),
            "Vec<Node>"
        );

        let structs = schema_with(TableFlags::STRUCT);
        assert_eq!(rust_type(&node, &structs, &names(), true).unwrap(), "Node");
        assert_eq!(
            rust_type(
                &TypeRef::array_of(TypeRef::Primitive(PrimitiveType::Float32)),
                &structs,
                &names(),
                true
            )
            .unwrap(),
            "Vec<f32>"
        );
        assert_eq!(
            rust_type(&TypeRef::External("glam::Vec3".into()), &structs, &names(), true).unwrap(),
            "glam::Vec3"
        );
    }

    #[test]
    fn test_doc_lines_drop_blank_lines() {
        assert_eq!(doc_lines(Some("first\n\n second  ")), vec!["first", " second"]);
        assert!(doc_lines(None).is_empty());
    }
}
