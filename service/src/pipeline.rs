//! Build orchestration
//!
//! One run: open the table source (schema discovery is mandatory), then
//! optionally generate code, then optionally write data. Each phase is
//! timed and logged. The source is closed at the end of the run whether or
//! not a phase failed.

use crate::generator::{CodeGenerator, GeneratedCode};
use crate::sink::{JsonTableSink, TableSink};
use crate::source::{CsvProvider, GridTableSource, TableSource, WorkbookProvider};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tablegen_core::prelude::*;
use tracing::info;

/// Which steps to run after discovery
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub build_code: bool,
    pub build_data: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTiming {
    pub phase: &'static str,
    pub elapsed: Duration,
}

/// What a run did
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Discovered table names, in discovery order
    pub tables: Vec<String>,
    pub generated: Option<GeneratedCode>,
    pub written: Vec<PathBuf>,
    pub timings: Vec<PhaseTiming>,
}

impl BuildReport {
    #[must_use]
    pub fn elapsed(&self, phase: &str) -> Option<Duration> {
        self.timings
            .iter()
            .find(|timing| timing.phase == phase)
            .map(|timing| timing.elapsed)
    }

    #[must_use]
    pub fn total(&self) -> Duration {
        self.timings.iter().map(|timing| timing.elapsed).sum()
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    root: ParameterScope,
}

impl Pipeline {
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        let mut root = ParameterScope::new();
        root.set("AssemblyName", config.code.assembly_name.clone());
        root.set("Namespace", config.code.namespace.clone().unwrap_or_default());
        Self { config, root }
    }

    /// Load, validate and wrap a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(PipelineConfig::load(path)?))
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Parameters every table scope inherits
    pub fn root_parameters_mut(&mut self) -> &mut ParameterScope {
        &mut self.root
    }

    /// Table source for the configured provider
    #[must_use]
    pub fn source(&self) -> Box<dyn TableSource> {
        match self.config.input.provider {
            ProviderKind::Workbook => Box::new(GridTableSource::new(
                WorkbookProvider::new(&self.config.input),
                &self.config,
                self.root.clone(),
            )),
            ProviderKind::Csv => Box::new(GridTableSource::new(
                CsvProvider::new(&self.config.input),
                &self.config,
                self.root.clone(),
            )),
        }
    }

    /// Run against the configured provider
    pub fn run(&self, options: BuildOptions) -> Result<BuildReport> {
        let mut source = self.source();
        self.run_with(source.as_mut(), options)
    }

    /// Run against any source
    pub fn run_with(&self, source: &mut dyn TableSource, options: BuildOptions) -> Result<BuildReport> {
        let mut report = BuildReport::default();
        let result = self.run_phases(source, options, &mut report);
        let closed = source.close();
        result?;
        closed?;

        info!(
            "build finished in {:.2}s",
            report.total().as_secs_f64()
        );
        Ok(report)
    }

    fn run_phases(
        &self,
        source: &mut dyn TableSource,
        options: BuildOptions,
        report: &mut BuildReport,
    ) -> Result<()> {
        timed(report, "schema discovery", || source.open())?;
        report.tables = source.schema().iter().map(|table| table.name.clone()).collect();
        info!("tables: {}", report.tables.join(", "));

        let source: &dyn TableSource = source;
        if options.build_code {
            let generated = timed(report, "code generation", || {
                CodeGenerator::new(&self.config.code)?.generate(source)
            })?;
            report.generated = Some(generated);
        }

        if options.build_data {
            let model = report.generated.as_ref().map(|generated| generated.model.clone());
            let written = timed(report, "data writing", || {
                let mut sink = JsonTableSink::new(&self.config);
                if let Some(model) = model {
                    sink = sink.with_model(model);
                }
                sink.open(source)?;
                sink.write_all(source)
            })?;
            report.written = written;
        }
        Ok(())
    }
}

fn timed<T>(report: &mut BuildReport, phase: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let start = Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    info!("{phase} finished in {:.2}s", elapsed.as_secs_f64());
    report.timings.push(PhaseTiming { phase, elapsed });
    result
}
