//! Command-line interface for the `tablegen` binary.
//!
//! `tablegen [--code] [--data] [--config <path>] [-v|--verbose] [-q|--quiet]`
//!
//! The single-dash forms `-code`, `-data` and `-config=<path>` used by
//! existing build scripts are accepted too.

use crate::pipeline::{BuildOptions, Pipeline};
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;
use tablegen_core::config::DEFAULT_CONFIG_FILE;
use tablegen_core::error::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Compile spreadsheet tables into Rust types and data files
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "tablegen", author, version, about, long_about = None)]
pub struct Cli {
    /// Generate code from the discovered schema
    #[arg(long)]
    pub code: bool,

    /// Write data files for every data table
    #[arg(long)]
    pub data: bool,

    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Log per-field discovery detail
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Parse arguments after rewriting legacy single-dash flags
    pub fn parse_from_legacy<I, T>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_args(args))
    }

    #[must_use]
    pub fn options(&self) -> BuildOptions {
        BuildOptions {
            build_code: self.code,
            build_data: self.data,
        }
    }

    /// Default filter directive; `RUST_LOG` overrides it
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

/// Rewrite `-code`, `-data` and `-config=<path>` into their long forms
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg: OsString| match arg.to_str() {
            Some("-code") => OsString::from("--code"),
            Some("-data") => OsString::from("--data"),
            Some(text) if text.starts_with("-config=") => {
                OsString::from(format!("--config={}", &text["-config=".len()..]))
            }
            Some("-config") => OsString::from("--config"),
            _ => arg,
        })
        .collect()
}

/// Install the stdout subscriber
pub fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    // A subscriber may already be installed by an embedding process
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Run one build as described by the arguments
pub fn run(cli: &Cli) -> Result<()> {
    let pipeline = Pipeline::from_file(&cli.config)?;
    let report = pipeline.run(cli.options())?;

    if !cli.code && !cli.data {
        info!("discovered {} tables; pass --code and/or --data to build", report.tables.len());
    }
    if let Some(generated) = &report.generated {
        info!("code: {} types, {} files changed", generated.model.types.len(), generated.written.len());
    }
    if cli.data {
        info!("data: {} files", report.written.len());
    }
    Ok(())
}
