//! Cell conversion through discovery, binding and the converter chain

mod helpers;

use helpers::{item_config, item_sheet, open, records};
use pretty_assertions::assert_eq;
use tablegen_service::prelude::*;

fn reward(kind: &str, amount: i64) -> Value {
    Value::Record(Record::new("Reward").with("Kind", kind).with("Amount", amount))
}

/// `Reward` struct (schema only) plus `Loot` referencing it
fn loot_provider(loot_rows: &[&[&str]]) -> MemoryProvider {
    let header: &[&[&str]] = &[
        &["Loot"],
        &["Id", "Rewards", "Grid", "Main", "Level"],
        &["int", "Reward[]", "int[][]", "Reward", "uint8"],
        &["key", "", "", "", "default(3)"],
    ];
    let mut rows = header.to_vec();
    rows.extend_from_slice(loot_rows);
    MemoryProvider::new()
        .sheet(
            "Reward",
            &[
                &["Rewards"],
                &["Kind", "Amount"],
                &["string", "int"],
                &["struct nodata", ""],
            ],
        )
        .sheet("Loot", &rows)
}

#[test]
fn test_primitive_and_array_cells() {
    let config = item_config();
    let source = open(item_sheet(MemoryProvider::new()), &config);

    let rows = records(&source, &config, "Item").unwrap();
    assert_eq!(
        rows,
        vec![Record::new("Item").with("Id", 1001_i64).with(
            "Tags",
            Value::Array(vec![Value::from("sword"), Value::from("fire")])
        )]
    );
}

#[test]
fn test_nested_arrays_and_records() {
    let config = item_config();
    let source = open(
        loot_provider(&[&["1", "gold:10|gem:2", "1!2|3!4", "xp:5", "7"]]),
        &config,
    );

    let rows = records(&source, &config, "Loot").unwrap();
    let row = &rows[0];
    assert_eq!(row.get("Id"), Some(&Value::Int(1)));
    assert_eq!(
        row.get("Rewards"),
        Some(&Value::Array(vec![reward("gold", 10), reward("gem", 2)]))
    );
    assert_eq!(
        row.get("Grid"),
        Some(&Value::Array(vec![
            Value::Array(vec![Value::Int(1), Value::Int(2)]),
            Value::Array(vec![Value::Int(3), Value::Int(4)]),
        ]))
    );
    assert_eq!(row.get("Main"), Some(&reward("xp", 5)));
    assert_eq!(row.get("Level"), Some(&Value::UInt(7)));
}

#[test]
fn test_empty_cells_take_defaults_and_zero_values() {
    let config = item_config();
    let source = open(loot_provider(&[&["2", "", "", "", ""]]), &config);

    let rows = records(&source, &config, "Loot").unwrap();
    let row = &rows[0];
    assert_eq!(row.get("Rewards"), Some(&Value::Array(Vec::new())));
    assert_eq!(row.get("Grid"), Some(&Value::Array(Vec::new())));
    assert_eq!(row.get("Main"), Some(&reward("", 0)));
    assert_eq!(row.get("Level"), Some(&Value::UInt(3)));
}

#[test]
fn test_short_composite_leaves_trailing_members_at_zero() {
    let config = item_config();
    let source = open(loot_provider(&[&["3", "gold", "", "xp", ""]]), &config);

    let rows = records(&source, &config, "Loot").unwrap();
    assert_eq!(rows[0].get("Rewards"), Some(&Value::Array(vec![reward("gold", 0)])));
    assert_eq!(rows[0].get("Main"), Some(&reward("xp", 0)));
}

#[test]
fn test_too_many_parts_is_conversion_error() {
    let config = item_config();
    let source = open(loot_provider(&[&["4", "", "", "xp:5:9", ""]]), &config);

    let err = records(&source, &config, "Loot").unwrap_err();
    match err {
        TableGenError::ConversionError { table, row, column, column_index, value, .. } => {
            assert_eq!(table, "Loot");
            assert_eq!(row, 5);
            assert_eq!(column, "Main");
            assert_eq!(column_index, 4);
            assert_eq!(value, "xp:5:9");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_bad_integer_reports_cell_coordinates() {
    let config = item_config();
    let source = open(loot_provider(&[&["1", "", "", "", ""], &["x2", "", "", "", ""]]), &config);

    let err = records(&source, &config, "Loot").unwrap_err();
    let text = err.to_string();
    assert!(text.contains("[Loot]"), "{text}");
    assert!(text.contains("row: <6>"), "{text}");
    assert!(text.contains("column: <Id>"), "{text}");
    assert!(text.contains("value: <x2>"), "{text}");
}

#[test]
fn test_out_of_range_integer_is_rejected() {
    let config = item_config();
    let source = open(loot_provider(&[&["1", "", "", "", "300"]]), &config);

    let err = records(&source, &config, "Loot").unwrap_err();
    assert!(matches!(err, TableGenError::ConversionError { ref column, .. } if column == "Level"));
}

#[test]
fn test_fractional_integer_is_rejected() {
    let config = item_config();
    let provider = MemoryProvider::new().sheet(
        "Stock",
        &[&["Stock"], &["Id", "Count"], &["int", "int"], &["key", ""], &["1", "2.7"]],
    );
    let source = open(provider, &config);

    let err = records(&source, &config, "Stock").unwrap_err();
    match err {
        TableGenError::ConversionError { column, value, .. } => {
            assert_eq!((column.as_str(), value.as_str()), ("Count", "2.7"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_member_defaults_ignore_enclosing_separators() {
    let config = item_config();
    let provider = MemoryProvider::new()
        .sheet(
            "Reward",
            &[
                &["Rewards"],
                &["Kind", "Ids"],
                &["string", "int[]"],
                &["struct nodata", "default(1|2)"],
            ],
        )
        .sheet(
            "Loot",
            &[
                &["Loot"],
                &["Id", "Main", "Many"],
                &["int", "Reward", "Reward[]"],
                &["key", "", ""],
                &["1", "gold", "gold|gem"],
            ],
        );
    let source = open(provider, &config);

    let rows = records(&source, &config, "Loot").unwrap();
    let ids = Value::Array(vec![Value::Int(1), Value::Int(2)]);
    let seeded = |kind: &str| Value::Record(Record::new("Reward").with("Kind", kind).with("Ids", ids.clone()));
    assert_eq!(rows[0].get("Main"), Some(&seeded("gold")));
    assert_eq!(
        rows[0].get("Many"),
        Some(&Value::Array(vec![seeded("gold"), seeded("gem")]))
    );
}

#[test]
fn test_nesting_deeper_than_separators_is_config_error() {
    let config = item_config();
    let provider = MemoryProvider::new().sheet(
        "Cube",
        &[
            &["Cubes"],
            &["Id", "Cells"],
            &["int", "int[][][]"],
            &["", ""],
            &["1", "7"],
        ],
    );
    let source = open(provider, &config);

    let err = records(&source, &config, "Cube").unwrap_err();
    assert!(err.is_config(), "{err}");
    assert!(err.to_string().contains("separator depth overflow"), "{err}");
}

#[test]
fn test_field_separator_override() {
    let config = item_config();
    let provider = MemoryProvider::new().sheet(
        "Path",
        &[
            &["Paths"],
            &["Id", "Points"],
            &["int", "int[][]"],
            &["", "arr_sep(; ,)"],
            &["1", "1,2;3,4"],
        ],
    );
    let source = open(provider, &config);

    let rows = records(&source, &config, "Path").unwrap();
    assert_eq!(
        rows[0].get("Points"),
        Some(&Value::Array(vec![
            Value::Array(vec![Value::Int(1), Value::Int(2)]),
            Value::Array(vec![Value::Int(3), Value::Int(4)]),
        ]))
    );
}

#[test]
fn test_enum_cells_by_label_value_and_default() {
    let config = item_config();
    let provider = MemoryProvider::new()
        .sheet(
            "Rarity",
            &[
                &["Rarities"],
                &["Name", "Value", "Description"],
                &["string", "int", "string"],
                &["enum", "", ""],
                &["Common", "1", "Everywhere"],
                &["Very Rare", "5", ""],
            ],
        )
        .sheet(
            "Gem",
            &[
                &["Gems"],
                &["Id", "Rarity"],
                &["int", "Rarity"],
                &["key", ""],
                &["1", "very rare"],
                &["2", "5"],
                &["3", ""],
            ],
        );
    let source = open(provider, &config);

    let rows = records(&source, &config, "Gem").unwrap();
    let rarities: Vec<&Value> = rows.iter().filter_map(|row| row.get("Rarity")).collect();
    assert_eq!(
        rarities,
        vec![
            &Value::Enum(EnumValue::new("Rarity", "VeryRare")),
            &Value::Enum(EnumValue::new("Rarity", "VeryRare")),
            &Value::Enum(EnumValue::new("Rarity", "Common")),
        ]
    );
}

#[test]
fn test_unknown_enum_label_is_conversion_error() {
    let config = item_config();
    let provider = MemoryProvider::new()
        .sheet(
            "Rarity",
            &[&["Rarities"], &["Name", "Value"], &["string", "int"], &["enum", ""], &["Common", "1"]],
        )
        .sheet(
            "Gem",
            &[&["Gems"], &["Id", "Rarity"], &["int", "Rarity"], &["", ""], &["1", "Mythic"]],
        );
    let source = open(provider, &config);

    let err = records(&source, &config, "Gem").unwrap_err();
    assert!(err.to_string().contains("Mythic"), "{err}");
}

#[test]
fn test_custom_converter_runs_before_builtins() {
    struct Upper;
    impl Converter for Upper {
        fn name(&self) -> &'static str {
            "upper"
        }

        fn priority(&self) -> i32 {
            -100
        }

        fn convert(
            &self,
            _engine: &ConversionEngine,
            _ctx: &mut ConversionContext<'_>,
            _field: &FieldSchema,
            value: &Value,
            target: &TypeRef,
        ) -> Result<Option<Value>> {
            Ok(match (target, value) {
                (TypeRef::Primitive(PrimitiveType::String), Value::String(text)) => {
                    Some(Value::from(text.to_uppercase()))
                }
                _ => None,
            })
        }
    }

    let mut engine = ConversionEngine::new();
    engine.register(Box::new(Upper));
    assert_eq!(engine.converter_names(), vec!["upper", "array", "object", "default"]);

    let config = item_config();
    let source = open(item_sheet(MemoryProvider::new()), &config);
    let catalog = helpers::catalog(&source, &config);
    let mut binder = MemberBinder::new();
    let separators = Separators::from_config(&config.input);
    let table = source.schema().get("Item").unwrap();
    let mut ctx = ConversionContext::new(source.schema(), &catalog, &mut binder, &separators);

    let rows = load_records(&source, table, &engine, &mut ctx).unwrap();
    assert_eq!(
        rows[0].get("Tags"),
        Some(&Value::Array(vec![Value::from("SWORD"), Value::from("FIRE")]))
    );
}

#[test]
fn test_class_references_are_optional_outside_arrays() {
    let config = item_config();
    let provider = item_sheet(MemoryProvider::new()).sheet(
        "Shop",
        &[
            &["Shops"],
            &["Id", "Featured", "Stock"],
            &["int", "Item", "Item[]"],
            &["key", "", ""],
            &["1", "", ""],
            &["2", "1002", "1003:a!b|"],
        ],
    );
    let source = open(provider, &config);

    let rows = records(&source, &config, "Shop").unwrap();
    assert_eq!(rows[0].get("Featured"), Some(&Value::Null));
    assert_eq!(rows[0].get("Stock"), Some(&Value::Array(Vec::new())));

    let item = |id: i64, tags: &[&str]| {
        Value::Record(Record::new("Item").with("Id", id).with(
            "Tags",
            Value::Array(tags.iter().map(|tag| Value::from(*tag)).collect()),
        ))
    };
    assert_eq!(rows[1].get("Featured"), Some(&item(1002, &[])));
    assert_eq!(
        rows[1].get("Stock"),
        Some(&Value::Array(vec![item(1003, &["a", "b"]), item(0, &[])]))
    );
}
