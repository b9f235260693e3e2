//! Conversion engine
//!
//! Raw cells are coerced into typed [`Value`]s by an ordered chain of
//! [`Converter`]s; the first converter that accepts a value wins. Nested
//! arrays and records are decoded out of flat cell text with separators
//! chosen by nesting depth: the array separator list is indexed by array
//! depth and the object separator list by object depth, each counted from
//! the outermost scope.
//!
//! With the default separators `| !` and `: ,`, a `Reward[]` cell reads
//! `gold:10|gem:2`, and an `int32[][]` cell reads `1!2|3!4`.

mod array;
mod default;
mod object;

pub use array::ArrayConverter;
pub use default::{coerce_primitive, DefaultConverter};
pub use object::ObjectConverter;

use crate::binder::{MemberBinder, TypeCatalog};
use tablegen_core::config::InputConfig;
use tablegen_core::prelude::*;

/// Default and configured separator lists, outermost depth first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Separators {
    pub array: Vec<String>,
    pub object: Vec<String>,
}

impl Separators {
    #[must_use]
    pub fn from_config(input: &InputConfig) -> Self {
        Self {
            array: input.array_separators.clone(),
            object: input.object_separators.clone(),
        }
    }
}

impl Default for Separators {
    fn default() -> Self {
        Self::from_config(&InputConfig::default())
    }
}

/// Kind of an open nesting scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Array,
    Object,
}

/// Per-conversion state: what the converters may look up, and the stack of
/// open array and object scopes.
///
/// Scopes are only opened through [`ConversionContext::with_scope`], so
/// enter and exit always pair up in LIFO order, error paths included. A
/// context must not be shared between two conversions in flight.
pub struct ConversionContext<'a> {
    schema: &'a SchemaSet,
    catalog: &'a TypeCatalog,
    binder: &'a mut MemberBinder,
    separators: &'a Separators,
    scopes: Vec<ScopeKind>,
    array_depth: usize,
    object_depth: usize,
    instantiating: usize,
}

/// Nested default instances deeper than this are treated as recursive types
const MAX_INSTANCE_DEPTH: usize = 64;

impl<'a> ConversionContext<'a> {
    pub fn new(
        schema: &'a SchemaSet,
        catalog: &'a TypeCatalog,
        binder: &'a mut MemberBinder,
        separators: &'a Separators,
    ) -> Self {
        Self {
            schema,
            catalog,
            binder,
            separators,
            scopes: Vec::new(),
            array_depth: 0,
            object_depth: 0,
            instantiating: 0,
        }
    }

    #[must_use]
    pub fn schema(&self) -> &'a SchemaSet {
        self.schema
    }

    #[must_use]
    pub fn catalog(&self) -> &'a TypeCatalog {
        self.catalog
    }

    pub fn binder(&mut self) -> &mut MemberBinder {
        &mut *self.binder
    }

    #[must_use]
    pub fn array_depth(&self) -> usize {
        self.array_depth
    }

    #[must_use]
    pub fn object_depth(&self) -> usize {
        self.object_depth
    }

    /// Innermost open scope
    #[must_use]
    pub fn current_scope(&self) -> Option<ScopeKind> {
        self.scopes.last().copied()
    }

    /// Run `f` inside a new scope of the given kind
    pub fn with_scope<T>(
        &mut self,
        kind: ScopeKind,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.scopes.push(kind);
        match kind {
            ScopeKind::Array => self.array_depth += 1,
            ScopeKind::Object => self.object_depth += 1,
        }

        let result = f(self);

        let closed = self.scopes.pop();
        debug_assert_eq!(closed, Some(kind), "conversion scopes must nest");
        match kind {
            ScopeKind::Array => self.array_depth -= 1,
            ScopeKind::Object => self.object_depth -= 1,
        }
        result
    }

    /// Separator for the innermost open scope.
    ///
    /// The field's own override list wins when non-empty. Running past the
    /// end of the list is a configuration error: the sheet nests deeper
    /// than its separators allow.
    pub fn separator<'s>(&'s self, field: &'s FieldSchema) -> Result<&'s str> {
        let kind = self.current_scope().ok_or_else(|| {
            TableGenError::config(format!(
                "field '{}': separator requested outside an array or object scope",
                field.name
            ))
        })?;
        let (depth, overrides, defaults) = match kind {
            ScopeKind::Array => (self.array_depth, &field.array_separators, &self.separators.array),
            ScopeKind::Object => (
                self.object_depth,
                &field.object_separators,
                &self.separators.object,
            ),
        };
        let list = if overrides.is_empty() { defaults } else { overrides };
        let index = depth.saturating_sub(1);
        list.get(index).map(String::as_str).ok_or_else(|| {
            TableGenError::config(format!(
                "separator depth overflow, field: {}, {kind:?} depth: {depth}, separators: {list:?}",
                field.name
            ))
        })
    }

    /// Run `f` with no scope open, as for a top-level cell. Column defaults
    /// are written for the column itself, not for where the record nests.
    pub fn detached<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let scopes = std::mem::take(&mut self.scopes);
        let depths = (self.array_depth, self.object_depth);
        self.array_depth = 0;
        self.object_depth = 0;

        let result = f(self);

        self.scopes = scopes;
        (self.array_depth, self.object_depth) = depths;
        result
    }

    fn enter_instance(&mut self, type_name: &str) -> Result<()> {
        self.instantiating += 1;
        if self.instantiating > MAX_INSTANCE_DEPTH {
            self.instantiating -= 1;
            return Err(TableGenError::config(format!(
                "type '{type_name}' contains itself by value"
            )));
        }
        Ok(())
    }

    fn exit_instance(&mut self) {
        self.instantiating -= 1;
    }
}

/// One step of the conversion chain
pub trait Converter {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Lower runs first
    fn priority(&self) -> i32;

    /// Convert `value` into `target`, or return `Ok(None)` to pass it on
    fn convert(
        &self,
        engine: &ConversionEngine,
        ctx: &mut ConversionContext<'_>,
        field: &FieldSchema,
        value: &Value,
        target: &TypeRef,
    ) -> Result<Option<Value>>;
}

/// Ordered converter chain with a fixed fallback converter at the end
pub struct ConversionEngine {
    converters: Vec<Box<dyn Converter>>,
    fallback: DefaultConverter,
}

impl ConversionEngine {
    /// Engine with the built-in array and object converters
    #[must_use]
    pub fn new() -> Self {
        let mut engine = Self::empty();
        engine.register(Box::new(ArrayConverter));
        engine.register(Box::new(ObjectConverter));
        engine
    }

    /// Engine with only the fallback converter
    #[must_use]
    pub fn empty() -> Self {
        Self {
            converters: Vec::new(),
            fallback: DefaultConverter,
        }
    }

    /// Add a converter, keeping the chain sorted by priority.
    ///
    /// Converters with equal priority run in registration order. The
    /// fallback converter always runs last.
    pub fn register(&mut self, converter: Box<dyn Converter>) {
        let priority = converter.priority();
        let position = self
            .converters
            .iter()
            .position(|c| c.priority() > priority)
            .unwrap_or(self.converters.len());
        self.converters.insert(position, converter);
    }

    /// Names of the chain in run order
    #[must_use]
    pub fn converter_names(&self) -> Vec<&'static str> {
        self.converters
            .iter()
            .map(|c| c.name())
            .chain(std::iter::once(self.fallback.name()))
            .collect()
    }

    /// Convert a value; empty input yields the target's zero value
    pub fn change_type(
        &self,
        ctx: &mut ConversionContext<'_>,
        field: &FieldSchema,
        value: &Value,
        target: &TypeRef,
    ) -> Result<Value> {
        for converter in &self.converters {
            if let Some(result) = converter.convert(self, ctx, field, value, target)? {
                return Ok(result);
            }
        }
        self.fallback
            .convert(self, ctx, field, value, target)?
            .ok_or_else(|| TableGenError::coercion(value.to_text(), target.to_string()))
    }

    /// Convert a cell, substituting the field's default when it is empty
    pub fn change_type_or_default(
        &self,
        ctx: &mut ConversionContext<'_>,
        field: &FieldSchema,
        value: &Value,
        target: &TypeRef,
    ) -> Result<Value> {
        match (&field.default_value, value.is_empty()) {
            (Some(default), true) => self.change_type(ctx, field, default, target),
            _ => self.change_type(ctx, field, value, target),
        }
    }

    /// `Default::default()` of the generated type
    pub fn zero_value(&self, ctx: &mut ConversionContext<'_>, target: &TypeRef) -> Result<Value> {
        Ok(match target {
            TypeRef::Primitive(primitive) => primitive.zero(),
            TypeRef::Array(_) => Value::Array(Vec::new()),
            TypeRef::Enum(table) => ctx
                .catalog()
                .descriptor(table)
                .and_then(|ty| ty.variants.first().map(|v| (ty.full_name(), v.name.clone())))
                .map_or(Value::Null, |(type_name, name)| {
                    Value::Enum(EnumValue::new(type_name, name))
                }),
            TypeRef::Table(table) => match ctx.schema().get(table) {
                Some(schema) if schema.kind() == TableKind::Struct => {
                    Value::Record(self.instantiate(ctx, schema)?)
                }
                _ => Value::Null,
            },
            TypeRef::External(_) => Value::Null,
        })
    }

    /// New record of a table's type with every member at its zero value,
    /// then overwritten by column defaults
    pub fn instantiate(
        &self,
        ctx: &mut ConversionContext<'_>,
        table: &TableSchema,
    ) -> Result<Record> {
        let descriptor = ctx
            .catalog()
            .descriptor(&table.name)
            .ok_or_else(|| TableGenError::SchemaBindingError {
                table: table.name.clone(),
            })?;
        let members = ctx.binder().members(descriptor);

        ctx.enter_instance(&descriptor.name)?;
        let result = (|| -> Result<Record> {
            let mut record = Record::new(descriptor.full_name());
            for member in members.values() {
                let value = match table.field(&member.name) {
                    Some(column) if column.has_default() => ctx.detached(|ctx| {
                        self.change_type_or_default(ctx, column, &Value::Null, &member.value_type)
                    })?,
                    _ => self.zero_value(ctx, &member.value_type)?,
                };
                record.set(member.name.clone(), value);
            }
            Ok(record)
        })();
        ctx.exit_instance();
        result
    }
}

impl Default for ConversionEngine {
    fn default() -> Self {
        Self::new()
    }
}
