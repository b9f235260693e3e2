//! Table sinks
//!
//! A sink binds every discovered table to its generated type, then loads
//! and serializes the rows of each data table.

mod json;

pub use json::JsonTableSink;

use crate::source::TableSource;
use std::path::PathBuf;
use tablegen_core::prelude::*;

pub trait TableSink {
    /// Bind tables to generated types; unbound tables are fatal
    fn open(&mut self, source: &dyn TableSource) -> Result<()>;

    /// Write one artifact per data table, in discovery order.
    ///
    /// `NoData` and enum tables are skipped. Returns the artifact paths.
    fn write_all(&mut self, source: &dyn TableSource) -> Result<Vec<PathBuf>>;
}
