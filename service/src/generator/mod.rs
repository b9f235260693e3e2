//! Code generation from discovered schema
//!
//! The schema is turned into a [`TypeModel`] plus one render document per
//! type, rendered through Handlebars templates and written in one of three
//! layouts:
//!
//! - [`CodeLayout::Bundle`]: one `<assembly>.rs`, compiled into
//!   `lib<assembly>.rlib` when a compiler is configured
//! - [`CodeLayout::PerType`]: one file per type plus a `mod.rs`
//! - [`CodeLayout::PerTypeWithManifest`]: as `PerType`, plus a `Cargo.toml`
//!   written once
//!
//! Files are only rewritten when their content changes, and generated
//! files the current run no longer produces are removed. The model is
//! always written as `<assembly>.types.json` for later data-only runs.

pub mod compiler;
pub mod document;
pub mod template;
pub mod writer;

pub use compiler::Compiler;
pub use document::{SchemaDocument, TypeDocument};
pub use template::TemplateSet;
pub use writer::{write_if_changed, ScratchDir};

use crate::source::TableSource;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use tablegen_core::config::CodeConfig;
use tablegen_core::prelude::*;
use tablegen_core::utils::{is_valid_identifier, to_snake_case};
use template::{IndexDocument, ManifestDocument};
use tracing::info;

const PER_TYPE_HEADER: &str = "// @generated by tablegen. Do not edit.\n\n#[allow(unused_imports)]\nuse super::*;\n\n";

/// Result of one generation pass
#[derive(Debug, Clone)]
pub struct GeneratedCode {
    pub model: TypeModel,
    /// Every file the pass produced, changed or not
    pub files: Vec<PathBuf>,
    /// Files whose content changed
    pub written: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    /// Compiled library, Bundle layout with a compiler only
    pub artifact: Option<PathBuf>,
}

/// Renders and writes the generated sources for a schema
pub struct CodeGenerator {
    code: CodeConfig,
    templates: TemplateSet,
    compiler: Compiler,
}

impl CodeGenerator {
    pub fn new(code: &CodeConfig) -> Result<Self> {
        Ok(Self {
            code: code.clone(),
            templates: TemplateSet::new(code)?,
            compiler: Compiler::new(code),
        })
    }

    /// Identifier of the generated crate or module
    #[must_use]
    pub fn crate_name(&self) -> String {
        to_snake_case(&self.code.assembly_name)
            .trim_start_matches("r#")
            .to_string()
    }

    pub fn generate(&self, source: &dyn TableSource) -> Result<GeneratedCode> {
        let document = document::build(source, &self.code)?;
        let out_dir = &self.code.output_dir;
        fs::create_dir_all(out_dir)?;

        let mut output = GeneratedCode {
            model: document.model.clone(),
            files: Vec::new(),
            written: Vec::new(),
            removed: Vec::new(),
            artifact: None,
        };

        match self.code.format {
            CodeLayout::Bundle => self.write_bundle(&document, &mut output)?,
            CodeLayout::PerType | CodeLayout::PerTypeWithManifest => {
                self.write_per_type(&document, &mut output)?;
            }
        }

        let manifest = out_dir.join(TypeModel::manifest_name(&self.code.assembly_name));
        emit(manifest, document.model.to_json()?.as_bytes(), &mut output)?;

        let mut keep: HashSet<PathBuf> = output.files.iter().cloned().collect();
        keep.extend(output.artifact.iter().cloned());
        output.removed = writer::remove_stale(out_dir, &[".rs", ".rlib"], &keep)?;

        info!(
            "generated {} types into {} ({} files changed, {} removed)",
            output.model.types.len(),
            out_dir.display(),
            output.written.len(),
            output.removed.len()
        );
        Ok(output)
    }

    fn write_bundle(&self, document: &SchemaDocument, output: &mut GeneratedCode) -> Result<()> {
        let namespace = match self.code.namespace.as_deref().filter(|ns| !ns.is_empty()) {
            Some(namespace) => namespace
                .split("::")
                .map(|segment| {
                    if is_valid_identifier(segment) {
                        Ok(segment.to_string())
                    } else {
                        Err(TableGenError::generation(format!(
                            "namespace segment '{segment}' is not an identifier"
                        )))
                    }
                })
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        let sources = document
            .types
            .iter()
            .map(|ty| self.templates.render_type(ty))
            .collect::<Result<Vec<_>>>()?;

        let crate_name = self.crate_name();
        let content = self.templates.render_index(&IndexDocument {
            module: &self.code.assembly_name,
            bundle: true,
            namespace,
            sources,
            files: Vec::new(),
        })?;
        let path = self.code.output_dir.join(format!("{crate_name}.rs"));
        let changed = emit(path.clone(), content.as_bytes(), output)?;

        if self.code.compiler.trim().is_empty() {
            return Ok(());
        }
        let artifact = self.code.output_dir.join(format!("lib{crate_name}.rlib"));
        if changed || !artifact.exists() {
            let scratch = ScratchDir::create(&self.code.temp_dir.join(&crate_name))?;
            let compiled = self.compiler.compile(&path, &crate_name, scratch.path())?;
            if write_if_changed(&artifact, &fs::read(&compiled)?)? {
                output.written.push(artifact.clone());
            }
        } else {
            info!("{} is up to date", artifact.display());
        }
        output.artifact = Some(artifact);
        Ok(())
    }

    fn write_per_type(&self, document: &SchemaDocument, output: &mut GeneratedCode) -> Result<()> {
        let mut stems = Vec::new();
        let mut files: HashMap<String, &str> = HashMap::new();
        for ty in &document.types {
            let stem = to_snake_case(&ty.name);
            let file = stem.trim_start_matches("r#");
            if file == "mod" {
                return Err(TableGenError::generation(format!(
                    "type '{}' would overwrite the module index mod.rs",
                    ty.name
                )));
            }
            if let Some(other) = files.insert(file.to_string(), &ty.name) {
                return Err(TableGenError::generation(format!(
                    "types '{other}' and '{}' both map to {file}.rs",
                    ty.name
                )));
            }
        }

        for ty in &document.types {
            let stem = to_snake_case(&ty.name);
            let file = stem.trim_start_matches("r#");
            let content = format!("{PER_TYPE_HEADER}{}", self.templates.render_type(ty)?);
            emit(self.code.output_dir.join(format!("{file}.rs")), content.as_bytes(), output)?;
            stems.push(stem);
        }

        let index = self.templates.render_index(&IndexDocument {
            module: &self.code.assembly_name,
            bundle: false,
            namespace: Vec::new(),
            sources: Vec::new(),
            files: stems,
        })?;
        emit(self.code.output_dir.join("mod.rs"), index.as_bytes(), output)?;

        if self.code.format == CodeLayout::PerTypeWithManifest {
            let crate_name = self.crate_name();
            let manifest = self.templates.render_manifest(&ManifestDocument {
                crate_name: &crate_name,
                edition: &self.code.edition,
            })?;
            let path = self.code.output_dir.join("Cargo.toml");
            if writer::write_if_absent(&path, manifest.as_bytes())? {
                output.written.push(path);
            }
        }
        Ok(())
    }
}

fn emit(path: PathBuf, content: &[u8], output: &mut GeneratedCode) -> Result<bool> {
    let changed = write_if_changed(&path, content)?;
    if changed {
        output.written.push(path.clone());
    }
    output.files.push(path);
    Ok(changed)
}
