//! Hierarchical template parameters
//!
//! A run seeds a root scope (module name, namespace); each table gets a
//! child scope holding `TableName`. Lookups walk up to the root.

use crate::error::{Result, TableGenError};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::Arc;

static PLACEHOLDER: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Valid placeholder regex pattern")
});

/// Named string parameters with an optional parent scope
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterScope {
    values: IndexMap<String, String>,
    parent: Option<Arc<ParameterScope>>,
}

impl ParameterScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A new empty scope whose lookups fall back to this one
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            values: IndexMap::new(),
            parent: Some(Arc::new(self.clone())),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder-style [`ParameterScope::set`]
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(value) => Some(value),
            None => self.parent.as_ref().and_then(|parent| parent.get(name)),
        }
    }

    /// Replace `{Name}` placeholders; `{{` and `}}` are literal braces.
    ///
    /// Unknown names are configuration errors.
    pub fn format(&self, template: &str) -> Result<String> {
        let mut output = String::with_capacity(template.len());
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(template) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            output.push_str(&template[last..whole.start()]);
            match caps.get(1) {
                Some(name) => {
                    let value = self.get(name.as_str()).ok_or_else(|| {
                        TableGenError::config(format!(
                            "unknown parameter '{}' in template '{template}'",
                            name.as_str()
                        ))
                    })?;
                    output.push_str(value);
                }
                None => output.push_str(&whole.as_str()[..1]),
            }
            last = whole.end();
        }
        output.push_str(&template[last..]);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_scope_falls_back_to_parent() {
        let root = ParameterScope::new().with("Namespace", "game");
        let mut table = root.child();
        table.set("TableName", "Item");
        assert_eq!(table.get("Namespace"), Some("game"));
        assert_eq!(table.get("TableName"), Some("Item"));
        assert_eq!(root.get("TableName"), None);
    }

    #[test]
    fn test_format_replaces_placeholders() {
        let scope = ParameterScope::new().with("TableName", "Item");
        assert_eq!(scope.format("{TableName}Data").unwrap(), "ItemData");
        assert_eq!(scope.format("{{{TableName}}}").unwrap(), "{Item}");
        assert!(scope.format("{Missing}").unwrap_err().is_config());
    }
}
