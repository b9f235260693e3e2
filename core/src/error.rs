//! Error types for table compilation
//!
//! Every fatal condition of a build run maps onto one variant of
//! [`TableGenError`]. Benign conditions (a sheet whose label does not match
//! the table pattern, a table with no surviving fields) are not errors at
//! all; sources log them and move on.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for tablegen operations
#[derive(Error, Debug)]
pub enum TableGenError {
    /// Invalid or incomplete pipeline configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Schema discovery failed in a way that invalidates the whole run
    #[error("Schema discovery failed{}: {message}", table_suffix(.table.as_deref()))]
    SchemaDiscoveryError {
        /// Table being discovered, when known
        table: Option<String>,
        /// Error message
        message: String,
    },

    /// A cell could not be converted into its field's type
    #[error(
        "Conversion failed. table: [{table}], row: <{row}>, column: <{column}>, index: <{column_index}>, value: <{value}>, type: <{target}>: {message}"
    )]
    ConversionError {
        /// Table name
        table: String,
        /// 1-based physical row
        row: usize,
        /// Field name
        column: String,
        /// 1-based physical column
        column_index: usize,
        /// Raw cell text
        value: String,
        /// Target type
        target: String,
        /// Underlying failure
        message: String,
    },

    /// Value coercion failure without cell coordinates
    #[error("Type coercion failed: cannot convert '{value}' to {target}{}", context_suffix(.context.as_deref()))]
    CoercionError {
        /// Raw value
        value: String,
        /// Target type
        target: String,
        /// Additional context
        context: Option<String>,
    },

    /// Code generation or compilation failed
    #[error("Code generation failed: {message}{}", diagnostics_suffix(.diagnostics))]
    CodeGenerationError {
        /// Error message
        message: String,
        /// Compiler diagnostics at error severity, verbatim
        diagnostics: Vec<String>,
    },

    /// Template registration or rendering errors
    #[error("Template error: {0}")]
    TemplateError(String),

    /// A discovered table has no generated type to bind against
    #[error("No generated type found for table '{table}', try to build code first")]
    SchemaBindingError {
        /// Table name
        table: String,
    },

    /// Tabular back-end failures
    #[error("Failed to read '{}': {message}", .path.display())]
    SourceError {
        /// File being read
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

fn table_suffix(table: Option<&str>) -> String {
    table.map(|t| format!(" for table '{t}'")).unwrap_or_default()
}

fn context_suffix(context: Option<&str>) -> String {
    context.map(|c| format!(" ({c})")).unwrap_or_default()
}

fn diagnostics_suffix(diagnostics: &[String]) -> String {
    if diagnostics.is_empty() {
        String::new()
    } else {
        format!("\n{}", diagnostics.join("\n"))
    }
}

/// Result type alias for tablegen operations
pub type Result<T> = std::result::Result<T, TableGenError>;

impl TableGenError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create a new schema discovery error
    #[must_use]
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::SchemaDiscoveryError {
            table: None,
            message: message.into(),
        }
    }

    /// Create a new schema discovery error scoped to a table
    #[must_use]
    pub fn discovery_in(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaDiscoveryError {
            table: Some(table.into()),
            message: message.into(),
        }
    }

    /// Create a new coercion error
    #[must_use]
    pub fn coercion(value: impl Into<String>, target: impl Into<String>) -> Self {
        Self::CoercionError {
            value: value.into(),
            target: target.into(),
            context: None,
        }
    }

    /// Create a new coercion error with context
    #[must_use]
    pub fn coercion_with_context(
        value: impl Into<String>,
        target: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::CoercionError {
            value: value.into(),
            target: target.into(),
            context: Some(context.into()),
        }
    }

    /// Create a new code generation error
    #[must_use]
    pub fn generation(message: impl Into<String>) -> Self {
        Self::CodeGenerationError {
            message: message.into(),
            diagnostics: Vec::new(),
        }
    }

    /// Create a new template error
    #[must_use]
    pub fn template(message: impl Into<String>) -> Self {
        Self::TemplateError(message.into())
    }

    /// Create a new serialization error
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError(message.into())
    }

    /// Create a new back-end error for a file
    #[must_use]
    pub fn backend(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::SourceError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether the error is a configuration error
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::ConfigError(_))
    }
}

impl From<serde_json::Error> for TableGenError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for TableGenError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<regex::Error> for TableGenError {
    fn from(err: regex::Error) -> Self {
        Self::ConfigError(format!("invalid pattern: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_error_carries_coordinates() {
        let err = TableGenError::ConversionError {
            table: "Item".to_string(),
            row: 5,
            column: "Id".to_string(),
            column_index: 1,
            value: "abc".to_string(),
            target: "int32".to_string(),
            message: "invalid digit".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("[Item]"));
        assert!(text.contains("row: <5>"));
        assert!(text.contains("column: <Id>"));
        assert!(text.contains("value: <abc>"));
    }

    #[test]
    fn test_generation_error_lists_diagnostics() {
        let err = TableGenError::CodeGenerationError {
            message: "compile failed".to_string(),
            diagnostics: vec!["error[E0412]: cannot find type `Foo`".to_string()],
        };
        assert!(err.to_string().contains("E0412"));
    }

    #[test]
    fn test_discovery_error_names_table() {
        let err = TableGenError::discovery_in("Item", "duplicate table name");
        assert_eq!(
            err.to_string(),
            "Schema discovery failed for table 'Item': duplicate table name"
        );
    }
}
