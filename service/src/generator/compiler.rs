//! Compiling bundled sources with an external compiler

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tablegen_core::config::CodeConfig;
use tablegen_core::prelude::*;
use tracing::{debug, info, warn};

/// One line of `--error-format=json` output
#[derive(Debug, Deserialize)]
struct Diagnostic {
    #[serde(rename = "$message_type", default)]
    message_type: Option<String>,
    level: String,
    message: String,
    #[serde(default)]
    rendered: Option<String>,
}

/// Invokes the configured compiler to turn a source file into a library
#[derive(Debug, Clone)]
pub struct Compiler {
    program: String,
    edition: String,
    references: Vec<String>,
}

impl Compiler {
    #[must_use]
    pub fn new(code: &CodeConfig) -> Self {
        Self {
            program: code.compiler.clone(),
            edition: code.edition.clone(),
            references: code.references.clone(),
        }
    }

    /// Arguments for one compilation: a fixed minimal set, then the
    /// configured references
    #[must_use]
    pub fn arguments(&self, source: &Path, crate_name: &str, output: &Path) -> Vec<String> {
        let mut args = vec![
            "--crate-type".to_string(),
            "rlib".to_string(),
            "--edition".to_string(),
            self.edition.clone(),
            "--crate-name".to_string(),
            crate_name.to_string(),
            "--error-format=json".to_string(),
            "--cap-lints".to_string(),
            "warn".to_string(),
            "-o".to_string(),
            output.display().to_string(),
        ];
        args.extend(self.references.iter().cloned());
        args.push(source.display().to_string());
        args
    }

    /// Compile `source` into `<out_dir>/lib<crate_name>.rlib`.
    ///
    /// Error-level diagnostics fail the compilation and are returned
    /// verbatim; warnings are logged.
    pub fn compile(&self, source: &Path, crate_name: &str, out_dir: &Path) -> Result<PathBuf> {
        let output = out_dir.join(format!("lib{crate_name}.rlib"));
        let args = self.arguments(source, crate_name, &output);
        info!("compile {} with {}", source.display(), self.program);
        debug!("{} {}", self.program, args.join(" "));

        let result = Command::new(&self.program).args(&args).output().map_err(|e| {
            TableGenError::generation(format!("failed to run compiler '{}': {e}", self.program))
        })?;
        let stderr = String::from_utf8_lossy(&result.stderr);
        let (errors, warnings) = parse_diagnostics(&stderr);
        for warning in &warnings {
            warn!("{warning}");
        }

        if !errors.is_empty() || !result.status.success() {
            let diagnostics = if errors.is_empty() {
                vec![stderr.trim().to_string()]
            } else {
                errors
            };
            return Err(TableGenError::CodeGenerationError {
                message: format!("compiling {} failed", source.display()),
                diagnostics,
            });
        }
        Ok(output)
    }
}

/// Split compiler output into error and warning texts. Lines that are not
/// JSON diagnostics are ignored.
#[must_use]
pub fn parse_diagnostics(output: &str) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    for line in output.lines().filter(|line| line.starts_with('{')) {
        let Ok(diagnostic) = serde_json::from_str::<Diagnostic>(line) else {
            continue;
        };
        if diagnostic.message_type.as_deref().is_some_and(|t| t != "diagnostic") {
            continue;
        }
        let text = diagnostic
            .rendered
            .unwrap_or(diagnostic.message)
            .trim_end()
            .to_string();
        match diagnostic.level.as_str() {
            "error" | "error: internal compiler error" => errors.push(text),
            "warning" => warnings.push(text),
            _ => {}
        }
    }
    (errors, warnings)
}
