//! Prelude module for the tablegen service
//!
//! This module re-exports commonly used types and functions for convenient import.

// Re-export core types
pub use tablegen_core::prelude::*;

// Orchestration
pub use crate::pipeline::{BuildOptions, BuildReport, PhaseTiming, Pipeline};

// Sources
pub use crate::source::{
    load_records, CsvProvider, GridTableSource, MemoryProvider, RawRow, Sheet, SheetProvider,
    SheetRef, TableSource, WorkbookProvider,
};

// Conversion and binding
pub use crate::binder::{BoundMember, MemberBinder, MemberMap, MemberProvider, TypeCatalog};
pub use crate::convert::{ConversionContext, ConversionEngine, Converter, ScopeKind, Separators};

// Output
pub use crate::generator::{CodeGenerator, GeneratedCode};
pub use crate::sink::{JsonTableSink, TableSink};
