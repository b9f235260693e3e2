//! # tablegen service
//!
//! Compiles spreadsheet-authored tables into generated Rust types and
//! matching data files.
//!
//! ## Overview
//!
//! Designers edit tables in workbooks; each visible sheet is a table whose
//! leading rows describe the schema (field names, types, keywords,
//! summaries) and whose remaining rows are data. A build:
//!
//! 1. discovers the schema of every sheet ([`source`], [`keyword`])
//! 2. optionally generates Rust types for it ([`generator`])
//! 3. optionally converts every data row into typed records and writes one
//!    JSON or YAML file per table ([`convert`], [`binder`], [`sink`])
//!
//! [`pipeline::Pipeline`] sequences the phases; [`cli`] is the process
//! entry point used by the `tablegen` binary.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tablegen_service::prelude::*;
//! use std::path::Path;
//!
//! fn main() -> Result<()> {
//!     let pipeline = Pipeline::from_file(Path::new("tablegen.yaml"))?;
//!     let report = pipeline.run(BuildOptions { build_code: true, build_data: true })?;
//!     println!("{} tables, {} data files", report.tables.len(), report.written.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Sheet layout
//!
//! With the default row roles a sheet reads:
//!
//! | row | content |
//! |-----|---------|
//! | 1 | table description |
//! | 2 | field names |
//! | 3 | field types (`int`, `string[]`, `Reward`, ...) |
//! | 4 | keywords (`key`, `exclude`, `arr_sep(;)`, ...) |
//! | 5 | field summaries |
//! | 6.. | data, up to the first empty row |

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

/// Keyword annotations on schema cells
pub mod keyword;

/// Cell value conversion
pub mod convert;

/// Table discovery and row streaming
pub mod source;

/// Table to generated type binding
pub mod binder;

/// Code generation
pub mod generator;

/// Data writers
pub mod sink;

/// Build orchestration
pub mod pipeline;

/// Command-line interface
pub mod cli;

/// Prelude module for convenient imports
pub mod prelude;

pub use pipeline::{BuildOptions, BuildReport, Pipeline};
pub use tablegen_core::{Result, TableGenError};
