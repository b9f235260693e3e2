//! Member binding
//!
//! Maps each discovered table onto its generated type, and each column onto
//! a settable member of that type. Member maps are built once per type from
//! the generated [`TypeModel`] and cached for the run.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use tablegen_core::config::CodeConfig;
use tablegen_core::prelude::*;
use tracing::debug;

/// A member a column can be written to
#[derive(Debug, Clone, PartialEq)]
pub struct BoundMember {
    /// Name the column binds by (rename, or the member name)
    pub name: String,
    /// Member identifier in generated code
    pub member: String,
    pub value_type: TypeRef,
    pub serialization_index: usize,
}

impl BoundMember {
    fn from_descriptor(member: &MemberDescriptor) -> Self {
        Self {
            name: member.binding_name().to_string(),
            member: member.name.clone(),
            value_type: member.value_type.clone(),
            serialization_index: member.serialization_index,
        }
    }
}

/// Binding name → member, in declaration order
pub type MemberMap = IndexMap<String, BoundMember>;

/// Contributes members the type model does not declare.
///
/// Providers run after the declared members are collected and before the
/// map is cached.
pub trait MemberProvider {
    fn provide(&self, ty: &TypeDescriptor, members: &mut MemberMap);
}

/// Cached member maps per type
#[derive(Default)]
pub struct MemberBinder {
    cache: HashMap<String, Arc<MemberMap>>,
    providers: Vec<Box<dyn MemberProvider>>,
}

impl MemberBinder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_provider(&mut self, provider: Box<dyn MemberProvider>) {
        self.providers.push(provider);
    }

    /// Whether a member can receive column values.
    ///
    /// Public members are eligible by default; private ones only with an
    /// explicit rename. Properties need both accessors, and
    /// compiler-synthesized members never bind.
    #[must_use]
    pub fn is_eligible(member: &MemberDescriptor) -> bool {
        if member.synthesized {
            return false;
        }
        if member.visibility == Visibility::Private && member.rename.is_none() {
            return false;
        }
        match member.kind {
            MemberKind::Field => true,
            MemberKind::Property { readable, writable } => readable && writable,
        }
    }

    /// Members of a type, built on first use
    pub fn members(&mut self, ty: &TypeDescriptor) -> Arc<MemberMap> {
        let key = ty.full_name();
        if let Some(members) = self.cache.get(&key) {
            return Arc::clone(members);
        }

        let mut members: MemberMap = ty
            .members
            .iter()
            .filter(|member| Self::is_eligible(member))
            .map(|member| {
                let bound = BoundMember::from_descriptor(member);
                (bound.name.clone(), bound)
            })
            .collect();
        for provider in &self.providers {
            provider.provide(ty, &mut members);
        }
        debug!("bound {} members of {key}", members.len());

        let members = Arc::new(members);
        self.cache.insert(key, Arc::clone(&members));
        members
    }

    /// Number of cached types
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

/// Tables bound to their generated types
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    model: TypeModel,
    by_table: HashMap<String, usize>,
}

impl TypeCatalog {
    /// Resolve every table's type name in the model.
    ///
    /// The type name comes from the type name template; it is matched by
    /// case-insensitive full name first, then by simple name. A table
    /// without a type means the generated code is stale.
    pub fn bind(schema: &SchemaSet, model: TypeModel, code: &CodeConfig) -> Result<Self> {
        let mut by_table = HashMap::new();
        for table in schema {
            let type_name = table.parameters.format(&code.type_name_template)?;
            let full_name = match code.namespace.as_deref() {
                Some(namespace) if !namespace.is_empty() => format!("{namespace}::{type_name}"),
                _ => type_name,
            };
            let position = model
                .find(&full_name)
                .and_then(|ty| model.types.iter().position(|t| std::ptr::eq(t, ty)))
                .ok_or_else(|| TableGenError::SchemaBindingError {
                    table: table.name.clone(),
                })?;
            by_table.insert(table.name.to_lowercase(), position);
        }
        Ok(Self { model, by_table })
    }

    /// Descriptor of a table's type
    #[must_use]
    pub fn descriptor(&self, table: &str) -> Option<&TypeDescriptor> {
        self.by_table
            .get(&table.to_lowercase())
            .and_then(|&position| self.model.types.get(position))
    }

    #[must_use]
    pub fn model(&self) -> &TypeModel {
        &self.model
    }
}
