//! Type expression parsing
//!
//! Field types are compact expressions: scalar names (with common
//! aliases), declared type names, `T[]` for arrays, `T?` for nullable,
//! and `T|null` as an alternate spelling of `T?`. Unions with more than
//! one non-null alternative have no schema representation and are
//! rejected outright.

use annofly_core::{ScalarKind, SchemaType};

use crate::error::LoadError;

/// Parse a type expression into a schema type
///
/// `path` names the owning field (as `Type.field`) for error reporting.
/// Object references come back unresolved; the resolver checks that
/// they point at declared types.
pub fn parse_type_expr(expr: &str, path: &str) -> Result<SchemaType, LoadError> {
    let trimmed = expr.trim();
    let arms: Vec<&str> = trimmed.split('|').map(|a| a.trim()).collect();
    if arms.len() > 1 {
        let value_arms: Vec<&str> = arms
            .iter()
            .copied()
            .filter(|a| !a.eq_ignore_ascii_case("null"))
            .collect();
        if value_arms.len() != 1 {
            return Err(LoadError::UnsupportedType {
                path: path.to_string(),
                reason: format!(
                    "union '{}' must have exactly one non-null alternative",
                    trimmed
                ),
            });
        }
        let inner = parse_suffixed(value_arms[0], path)?;
        if inner.is_nullable() {
            return Err(nested_nullable(path, trimmed));
        }
        return Ok(SchemaType::nullable(inner));
    }
    parse_suffixed(trimmed, path)
}

/// Map a scalar name or one of its aliases to a kind
pub fn scalar_kind(name: &str) -> Option<ScalarKind> {
    match name.to_lowercase().as_str() {
        "string" | "str" | "text" => Some(ScalarKind::String),
        "int" | "integer" | "bigint" => Some(ScalarKind::Int),
        "float" | "double" | "number" => Some(ScalarKind::Float),
        "bool" | "boolean" => Some(ScalarKind::Bool),
        _ => None,
    }
}

fn parse_suffixed(expr: &str, path: &str) -> Result<SchemaType, LoadError> {
    let base_end = expr
        .find(|c: char| c == '[' || c == '?')
        .unwrap_or(expr.len());
    let (base, suffixes) = expr.split_at(base_end);
    let mut ty = parse_base(base.trim(), path, expr)?;

    let mut rest = suffixes;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("[]") {
            ty = SchemaType::array(ty);
            rest = after.trim_start();
        } else if let Some(after) = rest.strip_prefix('?') {
            if ty.is_nullable() {
                return Err(nested_nullable(path, expr));
            }
            ty = SchemaType::nullable(ty);
            rest = after.trim_start();
        } else {
            return Err(LoadError::Syntax {
                location: path.to_string(),
                message: format!("malformed type expression '{}'", expr),
            });
        }
    }
    Ok(ty)
}

fn parse_base(base: &str, path: &str, expr: &str) -> Result<SchemaType, LoadError> {
    if base.is_empty() {
        return Err(LoadError::Syntax {
            location: path.to_string(),
            message: format!("type expression '{}' has no base type", expr),
        });
    }
    if let Some(kind) = scalar_kind(base) {
        return Ok(SchemaType::scalar(kind));
    }
    if base.eq_ignore_ascii_case("null") {
        return Err(LoadError::UnsupportedType {
            path: path.to_string(),
            reason: "'null' is not a standalone type".to_string(),
        });
    }
    if !is_identifier(base) {
        return Err(LoadError::Syntax {
            location: path.to_string(),
            message: format!("invalid type name '{}'", base),
        });
    }
    Ok(SchemaType::object(base))
}

fn nested_nullable(path: &str, expr: &str) -> LoadError {
    LoadError::UnsupportedType {
        path: path.to_string(),
        reason: format!("'{}' nests nullable inside nullable", expr),
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
