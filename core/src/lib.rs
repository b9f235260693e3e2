//! # tablegen core
//!
//! Shared types for compiling spreadsheet tables into generated Rust types
//! and serialized data.
//!
//! This crate holds everything the engine and its collaborators agree on:
//! the configuration document, the discovered schema, converted values, the
//! generated type model and the error taxonomy.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(missing_docs)] // Documentation is covered by module-level docs

/// Error types for build runs
pub mod error;

/// Pipeline configuration document
pub mod config;

/// Schema and value model
pub mod types;

/// Generated type model shared by the generator and the data writer
pub mod model;

/// Hierarchical template parameters
pub mod parameters;

/// Naming helpers
pub mod utils;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use error::{Result, TableGenError};
pub use model::{TypeDescriptor, TypeModel};
pub use parameters::ParameterScope;
pub use types::{FieldSchema, SchemaSet, TableSchema, TypeRef, Value};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        CodeConfig, CodeLayout, InputConfig, OutputConfig, OutputFormat, PipelineConfig,
        ProviderKind, RowKind, RowRole, TypeMapping,
    };
    pub use crate::error::{Result, TableGenError};
    pub use crate::model::{
        EnumVariant, MemberDescriptor, MemberKind, TypeDescriptor, TypeModel, Visibility,
    };
    pub use crate::parameters::ParameterScope;
    pub use crate::types::{
        EnumValue, FieldFlags, FieldSchema, PrimitiveType, Record, SchemaSet, TableFlags,
        TableKind, TableSchema, TypeRef, Value,
    };
}
