use super::{ConversionContext, ConversionEngine, Converter};
use tablegen_core::prelude::*;

/// Last converter of every chain: zero values, pass-through, enum names and
/// primitive coercion
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConverter;

impl Converter for DefaultConverter {
    fn name(&self) -> &'static str {
        "default"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn convert(
        &self,
        engine: &ConversionEngine,
        ctx: &mut ConversionContext<'_>,
        _field: &FieldSchema,
        value: &Value,
        target: &TypeRef,
    ) -> Result<Option<Value>> {
        if value.is_empty() {
            return engine.zero_value(ctx, target).map(Some);
        }
        let converted = match (target, value) {
            (TypeRef::Primitive(primitive), _) => coerce_primitive(value, *primitive)?,
            (TypeRef::Enum(table), _) => parse_enum(ctx, table, value)?,
            (TypeRef::Table(_), Value::Record(_))
            | (TypeRef::Array(_), Value::Array(_))
            | (TypeRef::External(_), _) => value.clone(),
            _ => return Err(TableGenError::coercion(value.to_text(), target.to_string())),
        };
        Ok(Some(converted))
    }
}

fn parse_enum(ctx: &ConversionContext<'_>, table: &str, value: &Value) -> Result<Value> {
    let descriptor = ctx
        .catalog()
        .descriptor(table)
        .ok_or_else(|| TableGenError::SchemaBindingError {
            table: table.to_string(),
        })?;
    let variant = match value {
        Value::Enum(e) => descriptor.variant(&e.name),
        Value::String(text) => descriptor.variant(text).or_else(|| {
            let number: i64 = text.trim().parse().ok()?;
            descriptor.variants.iter().find(|v| v.value == Some(number))
        }),
        other => integral(other)
            .and_then(|number| i64::try_from(number).ok())
            .and_then(|number| descriptor.variants.iter().find(|v| v.value == Some(number))),
    };
    variant
        .map(|v| Value::Enum(EnumValue::new(descriptor.full_name(), v.name.clone())))
        .ok_or_else(|| {
            TableGenError::coercion_with_context(
                value.to_text(),
                descriptor.name.as_str(),
                "no such enum variant",
            )
        })
}

/// Best-effort conversion of a scalar into a primitive type.
///
/// Floats become integers only when they have no fractional part, integers
/// are range checked against the target width, and anything converts to a
/// string through its display form.
pub fn coerce_primitive(value: &Value, target: PrimitiveType) -> Result<Value> {
    if value.is_empty() {
        return Ok(target.zero());
    }
    let fail = || TableGenError::coercion(value.to_text(), target.name());

    if target.is_signed() || target.is_unsigned() {
        let number = integral(value).ok_or_else(fail)?;
        let in_range = match target {
            PrimitiveType::Int8 => i8::try_from(number).is_ok(),
            PrimitiveType::Int16 => i16::try_from(number).is_ok(),
            PrimitiveType::Int32 => i32::try_from(number).is_ok(),
            PrimitiveType::Int64 => i64::try_from(number).is_ok(),
            PrimitiveType::UInt8 => u8::try_from(number).is_ok(),
            PrimitiveType::UInt16 => u16::try_from(number).is_ok(),
            PrimitiveType::UInt32 => u32::try_from(number).is_ok(),
            _ => u64::try_from(number).is_ok(),
        };
        if !in_range {
            return Err(TableGenError::coercion_with_context(
                value.to_text(),
                target.name(),
                "out of range",
            ));
        }
        return Ok(if target.is_signed() {
            Value::Int(i64::try_from(number).map_err(|_| fail())?)
        } else {
            Value::UInt(u64::try_from(number).map_err(|_| fail())?)
        });
    }

    match target {
        PrimitiveType::Float32 | PrimitiveType::Float64 => {
            let number = match value {
                Value::Int(i) => *i as f64,
                Value::UInt(u) => *u as f64,
                Value::Float(x) => *x,
                Value::Bool(b) => f64::from(u8::from(*b)),
                Value::String(s) => s.trim().parse().map_err(|_| fail())?,
                _ => return Err(fail()),
            };
            if target == PrimitiveType::Float32 {
                // Widen through the shortest f32 text so 0.1 stays 0.1
                let narrow = (number as f32).to_string();
                return narrow.parse().map(Value::Float).map_err(|_| fail());
            }
            Ok(Value::Float(number))
        }
        PrimitiveType::Bool => match value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::Int(i) => Ok(Value::Bool(*i != 0)),
            Value::UInt(u) => Ok(Value::Bool(*u != 0)),
            Value::Float(x) => Ok(Value::Bool(*x != 0.0)),
            Value::String(s) => parse_bool(s).map(Value::Bool).ok_or_else(fail),
            _ => Err(fail()),
        },
        _ => match value {
            Value::Array(_) | Value::Record(_) => Err(fail()),
            other => Ok(Value::String(other.to_text())),
        },
    }
}

fn integral(value: &Value) -> Option<i128> {
    match value {
        Value::Int(i) => Some(i128::from(*i)),
        Value::UInt(u) => Some(i128::from(*u)),
        Value::Bool(b) => Some(i128::from(u8::from(*b))),
        Value::Float(x) => float_to_integral(*x),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i128>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(float_to_integral))
        }
        _ => None,
    }
}

fn float_to_integral(x: f64) -> Option<i128> {
    (x.is_finite() && x.fract() == 0.0).then(|| x as i128)
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_from_text_and_floats() {
        assert_eq!(coerce_primitive(&Value::from(" 42 "), PrimitiveType::Int32).unwrap(), Value::Int(42));
        assert_eq!(coerce_primitive(&Value::Float(1001.0), PrimitiveType::Int32).unwrap(), Value::Int(1001));
        assert_eq!(coerce_primitive(&Value::from("1e3"), PrimitiveType::Int32).unwrap(), Value::Int(1000));
        assert_eq!(coerce_primitive(&Value::from("7"), PrimitiveType::UInt8).unwrap(), Value::UInt(7));
    }

    #[test]
    fn test_fractional_values_are_not_integers() {
        assert!(coerce_primitive(&Value::Float(2.5), PrimitiveType::Int32).is_err());
        assert!(coerce_primitive(&Value::from("2.7"), PrimitiveType::Int64).is_err());
        assert!(coerce_primitive(&Value::from("-0.5"), PrimitiveType::UInt16).is_err());
    }

    #[test]
    fn test_float32_keeps_its_short_decimal() {
        assert_eq!(coerce_primitive(&Value::from("0.1"), PrimitiveType::Float32).unwrap(), Value::Float(0.1));
        assert_eq!(coerce_primitive(&Value::Float(1.0e-7), PrimitiveType::Float32).unwrap(), Value::Float(1.0e-7));
        assert_eq!(coerce_primitive(&Value::from("0.1"), PrimitiveType::Float64).unwrap(), Value::Float(0.1));
    }

    #[test]
    fn test_out_of_range_is_rejected() {
        assert!(coerce_primitive(&Value::Int(300), PrimitiveType::UInt8).is_err());
        assert!(coerce_primitive(&Value::Int(-1), PrimitiveType::UInt32).is_err());
        assert!(coerce_primitive(&Value::from("abc"), PrimitiveType::Int64).is_err());
    }

    #[test]
    fn test_empty_becomes_zero() {
        assert_eq!(coerce_primitive(&Value::Null, PrimitiveType::Int16).unwrap(), Value::Int(0));
        assert_eq!(coerce_primitive(&Value::from("  "), PrimitiveType::Bool).unwrap(), Value::Bool(false));
        assert_eq!(coerce_primitive(&Value::Null, PrimitiveType::String).unwrap(), Value::from(""));
    }

    #[test]
    fn test_bool_and_string_forms() {
        assert_eq!(coerce_primitive(&Value::from("TRUE"), PrimitiveType::Bool).unwrap(), Value::Bool(true));
        assert_eq!(coerce_primitive(&Value::Int(0), PrimitiveType::Bool).unwrap(), Value::Bool(false));
        assert_eq!(coerce_primitive(&Value::Float(1001.0), PrimitiveType::String).unwrap(), Value::from("1001"));
        assert_eq!(coerce_primitive(&Value::Float(0.5), PrimitiveType::Float32).unwrap(), Value::Float(0.5));
    }
}
