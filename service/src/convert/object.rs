use super::{ConversionContext, ConversionEngine, Converter, ScopeKind};
use tablegen_core::prelude::*;

/// Decodes a record of another table's type out of separator-delimited
/// text, assigning parts to members by ascending serialization index
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectConverter;

impl Converter for ObjectConverter {
    fn name(&self) -> &'static str {
        "object"
    }

    fn priority(&self) -> i32 {
        -5
    }

    fn convert(
        &self,
        engine: &ConversionEngine,
        ctx: &mut ConversionContext<'_>,
        field: &FieldSchema,
        value: &Value,
        target: &TypeRef,
    ) -> Result<Option<Value>> {
        let TypeRef::Table(table_name) = target else {
            return Ok(None);
        };
        let Some(table) = ctx.schema().get(table_name) else {
            return Ok(None);
        };
        let Some(descriptor) = ctx.catalog().descriptor(&table.name) else {
            return Ok(None);
        };

        let text = match value {
            // Class members are optional; array elements are always present
            v if v.is_empty() => {
                let value = if table.kind() == TableKind::Class
                    && ctx.current_scope() != Some(ScopeKind::Array)
                {
                    Value::Null
                } else {
                    Value::Record(engine.instantiate(ctx, table)?)
                };
                return Ok(Some(value));
            }
            Value::Record(_) => return Ok(Some(value.clone())),
            Value::String(text) => text,
            _ => return Ok(None),
        };

        let mut record = engine.instantiate(ctx, table)?;
        let members = ctx.binder().members(descriptor);
        let ordered = table.fields_by_serialization();

        ctx.with_scope(ScopeKind::Object, |ctx| {
            let separator = ctx.separator(field)?.to_string();
            let parts: Vec<&str> = text.split(separator.as_str()).collect();
            if parts.len() > ordered.len() {
                return Err(TableGenError::coercion_with_context(
                    text.as_str(),
                    table.name.as_str(),
                    format!(
                        "{} parts for {} members, separator '{separator}'",
                        parts.len(),
                        ordered.len()
                    ),
                ));
            }

            for (part, column) in parts.into_iter().zip(ordered) {
                if part.is_empty() {
                    continue;
                }
                let Some(member) = members.get(&column.name) else {
                    continue;
                };
                let converted = engine.change_type(ctx, field, &Value::from(part), &member.value_type)?;
                record.set(member.name.clone(), converted);
            }
            Ok(())
        })?;

        Ok(Some(Value::Record(record)))
    }
}
