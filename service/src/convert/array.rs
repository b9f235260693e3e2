use super::{ConversionContext, ConversionEngine, Converter, ScopeKind};
use tablegen_core::prelude::*;

/// Decodes arrays out of separator-delimited text
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayConverter;

impl Converter for ArrayConverter {
    fn name(&self) -> &'static str {
        "array"
    }

    fn priority(&self) -> i32 {
        -10
    }

    fn convert(
        &self,
        engine: &ConversionEngine,
        ctx: &mut ConversionContext<'_>,
        field: &FieldSchema,
        value: &Value,
        target: &TypeRef,
    ) -> Result<Option<Value>> {
        let TypeRef::Array(element) = target else {
            return Ok(None);
        };
        if value.is_empty() {
            return Ok(Some(Value::Array(Vec::new())));
        }

        let items = match value {
            Value::String(text) => ctx.with_scope(ScopeKind::Array, |ctx| {
                let separator = ctx.separator(field)?.to_string();
                let mut items = Vec::new();
                for part in text.split(separator.as_str()) {
                    items.push(engine.change_type(ctx, field, &Value::from(part), element)?);
                }
                Ok(items)
            })?,
            Value::Array(values) => {
                let mut items = Vec::with_capacity(values.len());
                for item in values {
                    items.push(engine.change_type(ctx, field, item, element)?);
                }
                items
            }
            // Spreadsheets hand numbers and dates over as typed cells
            scalar => vec![engine.change_type(ctx, field, scalar, element)?],
        };
        Ok(Some(Value::Array(items)))
    }
}
