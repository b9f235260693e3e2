//! Handlebars templates for generated sources

use super::document::TypeDocument;
use handlebars::{
    no_escape, Context, Handlebars, Helper, HelperResult, Output, RenderContext,
};
use serde::Serialize;
use std::path::Path;
use tablegen_core::config::CodeConfig;
use tablegen_core::prelude::*;
use tablegen_core::utils::{to_pascal_case, to_snake_case};

const TYPE_TEMPLATE: &str = include_str!("../../templates/rust.hbs");
const INDEX_TEMPLATE: &str = include_str!("../../templates/index.hbs");
const MANIFEST_TEMPLATE: &str = include_str!("../../templates/manifest.hbs");

/// Module file input: bundled sources, or the per-type file stems
#[derive(Debug, Clone, Serialize)]
pub struct IndexDocument<'a> {
    pub module: &'a str,
    pub bundle: bool,
    /// Namespace path segments wrapping bundled types
    pub namespace: Vec<String>,
    pub sources: Vec<String>,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestDocument<'a> {
    pub crate_name: &'a str,
    pub edition: &'a str,
}

/// Registered type, index and manifest templates
pub struct TemplateSet {
    registry: Handlebars<'static>,
}

impl TemplateSet {
    /// Built-in templates, with the type and index templates replaced by
    /// `code.template_path` / `code.index_template_path` when set
    pub fn new(code: &CodeConfig) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(no_escape);
        registry.register_helper("snake", Box::new(snake_helper));
        registry.register_helper("pascal", Box::new(pascal_helper));

        let type_template = load_template(code.template_path.as_deref(), TYPE_TEMPLATE)?;
        let index_template = load_template(code.index_template_path.as_deref(), INDEX_TEMPLATE)?;
        for (name, source) in [
            ("type", type_template.as_str()),
            ("index", index_template.as_str()),
            ("manifest", MANIFEST_TEMPLATE),
        ] {
            registry
                .register_template_string(name, source)
                .map_err(|e| TableGenError::template(format!("template '{name}': {e}")))?;
        }
        Ok(Self { registry })
    }

    pub fn render_type(&self, document: &TypeDocument) -> Result<String> {
        self.render("type", document)
    }

    pub fn render_index(&self, document: &IndexDocument<'_>) -> Result<String> {
        self.render("index", document)
    }

    pub fn render_manifest(&self, document: &ManifestDocument<'_>) -> Result<String> {
        self.render("manifest", document)
    }

    fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String> {
        self.registry
            .render(name, data)
            .map_err(|e| TableGenError::template(format!("render '{name}': {e}")))
    }
}

fn load_template(path: Option<&Path>, builtin: &str) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            TableGenError::template(format!("failed to read template {}: {e}", path.display()))
        }),
        None => Ok(builtin.to_string()),
    }
}

fn snake_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let param = h.param(0).and_then(|v| v.value().as_str()).unwrap_or("");
    out.write(&to_snake_case(param))?;
    Ok(())
}

fn pascal_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let param = h.param(0).and_then(|v| v.value().as_str()).unwrap_or("");
    out.write(&to_pascal_case(param))?;
    Ok(())
}
