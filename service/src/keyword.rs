//! Keyword interpreter
//!
//! A keyword cell holds whitespace separated tokens of the form
//! `$?keyword(param)?`, for example `key index(2) arr_sep(; /)`. Tokens set
//! table flags, field flags and per-field overrides. Unknown tokens are
//! ignored so newer sheets still build with older tools.

use crate::convert::coerce_primitive;
use regex::Regex;
use tablegen_core::prelude::*;
use tracing::debug;

static TOKEN: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"\$?(?P<keyword>[^(\s]+)\s*(?:\((?P<param>.*?)\))?")
        .expect("Valid keyword token regex pattern")
});

/// One parsed token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordToken {
    /// Lowercased keyword
    pub keyword: String,
    pub param: Option<String>,
}

/// Split a keyword cell into tokens
#[must_use]
pub fn tokenize(text: &str) -> Vec<KeywordToken> {
    TOKEN
        .captures_iter(text)
        .filter_map(|caps| {
            let keyword = caps.name("keyword")?.as_str().to_lowercase();
            let param = caps.name("param").map(|m| m.as_str().to_string());
            Some(KeywordToken { keyword, param })
        })
        .collect()
}

/// Apply every token of a keyword cell to a table and one of its fields.
///
/// `field.resolved_type` is consulted for `default(..)`: primitive fields get
/// their default coerced now, other fields keep the raw text for the
/// conversion engine.
pub fn apply_keywords(text: &str, table: &mut TableSchema, field: &mut FieldSchema) -> Result<()> {
    for token in tokenize(text) {
        let param = token.param.as_deref().unwrap_or_default();
        match token.keyword.as_str() {
            "enum" => table.flags |= TableFlags::ENUM,
            "class" => table.flags |= TableFlags::CLASS,
            "struct" => table.flags |= TableFlags::STRUCT,
            "nodata" => table.flags |= TableFlags::NO_DATA,
            "key" => field.flags |= FieldFlags::KEY,
            "exclude" => field.flags |= FieldFlags::EXCLUDE,
            "arr_sep" => field.array_separators = split_list(param),
            "obj_sep" => field.object_separators = split_list(param),
            "index" => {
                field.serialization_index = param.trim().parse().map_err(|_| {
                    TableGenError::config(format!(
                        "table '{}' field '{}': index keyword expects a number, got '{param}'",
                        table.name, field.name
                    ))
                })?;
            }
            "client" | "server" => {
                field.tags.insert(token.keyword.clone());
            }
            "tag" => {
                let tag = param.trim().to_lowercase();
                if !tag.is_empty() {
                    field.tags.insert(tag);
                }
            }
            "default" => field.default_value = Some(parse_default(param, field)?),
            other => debug!("ignoring unknown keyword '{other}' on {}.{}", table.name, field.name),
        }
    }
    Ok(())
}

fn split_list(param: &str) -> Vec<String> {
    param.split_whitespace().map(str::to_string).collect()
}

fn parse_default(param: &str, field: &FieldSchema) -> Result<Value> {
    let primitive = field.resolved_type.as_ref().and_then(TypeRef::as_primitive);
    if param.trim().eq_ignore_ascii_case("null") {
        return Ok(primitive.map_or(Value::Null, PrimitiveType::zero));
    }
    match primitive {
        Some(primitive) => coerce_primitive(&Value::from_text(param), primitive).map_err(|e| {
            TableGenError::config(format!("field '{}': invalid default value: {e}", field.name))
        }),
        None => Ok(Value::from_text(param)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fixture(type_ref: Option<TypeRef>) -> (TableSchema, FieldSchema) {
        let table = TableSchema::new("Item", &ParameterScope::default());
        let mut field = FieldSchema::new("Count", 1);
        field.resolved_type = type_ref;
        (table, field)
    }

    #[test]
    fn test_tokenize_with_params() {
        let tokens = tokenize("$Key index(2)  arr_sep(; /) unknown");
        assert_eq!(
            tokens,
            vec![
                KeywordToken { keyword: "key".into(), param: None },
                KeywordToken { keyword: "index".into(), param: Some("2".into()) },
                KeywordToken { keyword: "arr_sep".into(), param: Some("; /".into()) },
                KeywordToken { keyword: "unknown".into(), param: None },
            ]
        );
    }

    #[test]
    fn test_flags_and_overrides() {
        let (mut table, mut field) = fixture(None);
        apply_keywords("struct nodata key index(3) obj_sep(= ;) tag(Editor) client", &mut table, &mut field)
            .unwrap();
        assert!(table.flags.contains(TableFlags::STRUCT | TableFlags::NO_DATA));
        assert!(field.is_key());
        assert_eq!(field.serialization_index, 3);
        assert_eq!(field.object_separators, vec!["=", ";"]);
        assert!(field.tags.contains("editor"));
        assert!(field.tags.contains("client"));
    }

    #[test]
    fn test_default_is_coerced_for_primitives() {
        let (mut table, mut field) = fixture(Some(TypeRef::Primitive(PrimitiveType::Int32)));
        apply_keywords("default(42)", &mut table, &mut field).unwrap();
        assert_eq!(field.default_value, Some(Value::Int(42)));

        apply_keywords("default(null)", &mut table, &mut field).unwrap();
        assert_eq!(field.default_value, Some(Value::Int(0)));
    }

    #[test]
    fn test_default_kept_raw_for_composites() {
        let (mut table, mut field) = fixture(None);
        apply_keywords("default(a:1)", &mut table, &mut field).unwrap();
        assert_eq!(field.default_value, Some(Value::from("a:1")));
    }

    #[test]
    fn test_bad_index_is_config_error() {
        let (mut table, mut field) = fixture(None);
        let err = apply_keywords("index(first)", &mut table, &mut field).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_unknown_tokens_are_ignored() {
        let (mut table, mut field) = fixture(None);
        apply_keywords("localized(zh) exclude", &mut table, &mut field).unwrap();
        assert!(field.flags.contains(FieldFlags::EXCLUDE));
    }
}
