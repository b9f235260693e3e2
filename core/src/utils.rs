//! Naming helpers shared by discovery and code generation

use convert_case::{Case, Casing};

/// Rust keywords that need a raw identifier
const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub",
    "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final", "gen",
    "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// Replace every character outside `[A-Za-z0-9_]` with `_`, and prefix a
/// leading digit with `_`
#[must_use]
pub fn sanitize_identifier(name: &str) -> String {
    let mut result: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, '_');
    }
    result
}

/// Whether a string is a valid identifier as produced by [`sanitize_identifier`]
#[must_use]
pub fn is_valid_identifier(s: &str) -> bool {
    let Some(first) = s.chars().next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Escape a Rust keyword as a raw identifier
#[must_use]
pub fn escape_keyword(ident: &str) -> String {
    match ident {
        "self" | "Self" | "super" | "crate" => format!("{ident}_"),
        _ if RUST_KEYWORDS.contains(&ident) => format!("r#{ident}"),
        _ => ident.to_string(),
    }
}

/// snake_case field or module identifier
#[must_use]
pub fn to_snake_case(name: &str) -> String {
    let snake = sanitize_identifier(name).to_case(Case::Snake);
    let snake = if snake.is_empty() { "_".to_string() } else { snake };
    escape_keyword(&sanitize_identifier(&snake))
}

/// PascalCase type or variant identifier
#[must_use]
pub fn to_pascal_case(name: &str) -> String {
    let pascal = sanitize_identifier(name).to_case(Case::Pascal);
    let pascal = if pascal.is_empty() { "_".to_string() } else { pascal };
    escape_keyword(&sanitize_identifier(&pascal))
}
