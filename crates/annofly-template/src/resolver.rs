//! Template resolution
//!
//! Turns a parsed template file into an immutable schema: validates type
//! references, selects the root, derives the required flag per field,
//! pins down the attribute bag, and compiles patterns. Resolution is
//! fail-fast; only inapplicable constraints and the root fallback are
//! downgraded to warnings.

use annofly_core::{
    paths, ConstraintSet, FieldSpec, ObjectType, ScalarKind, SchemaType, TemplateSchema, UiHint,
};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::error::LoadError;
use crate::template::{FieldDecl, TemplateFile, TypeDecl};
use crate::typeexpr::{parse_type_expr, scalar_kind};

/// Bag keys the resolver acts on; anything else is ignored with a log line
const RECOGNIZED_ATTRS: &[&str] = &[
    "annotate",
    "ui",
    "min_length",
    "max_length",
    "pattern",
    "min",
    "max",
    "enum",
];

/// Resolves template files into schemas
pub struct TemplateResolver;

impl TemplateResolver {
    /// Resolve template source text
    pub fn resolve(source: &str) -> Result<TemplateSchema, LoadError> {
        let file = TemplateFile::from_str(source)?;
        Self::resolve_file(&file)
    }

    /// Resolve an already-parsed template file
    pub fn resolve_file(file: &TemplateFile) -> Result<TemplateSchema, LoadError> {
        check_duplicate_types(file)?;

        let declared: HashSet<&str> = file.types.iter().map(|t| t.name.as_str()).collect();
        let mut objects = IndexMap::new();
        let mut patterns = HashMap::new();
        let mut warnings = Vec::new();

        for decl in &file.types {
            if scalar_kind(&decl.name).is_some() {
                return Err(LoadError::UnsupportedType {
                    path: decl.name.clone(),
                    reason: "type name shadows a built-in scalar".to_string(),
                });
            }
            let object = resolve_type(decl, &declared, &mut patterns, &mut warnings)?;
            objects.insert(decl.name.clone(), object);
        }

        let root = select_root(file, &objects, &mut warnings)?;

        Ok(TemplateSchema {
            name: file.template.clone(),
            version: file.version.clone(),
            root,
            objects,
            patterns,
            warnings,
        })
    }
}

fn check_duplicate_types(file: &TemplateFile) -> Result<(), LoadError> {
    let mut seen = HashSet::new();
    for decl in &file.types {
        if !seen.insert(decl.name.as_str()) {
            return Err(LoadError::DuplicateType {
                name: decl.name.clone(),
            });
        }
    }
    Ok(())
}

fn resolve_type(
    decl: &TypeDecl,
    declared: &HashSet<&str>,
    patterns: &mut HashMap<String, Regex>,
    warnings: &mut Vec<String>,
) -> Result<ObjectType, LoadError> {
    let mut fields = Vec::with_capacity(decl.fields.len());
    let mut seen = HashSet::new();

    for field in &decl.fields {
        let path = paths::join(&decl.name, &field.name);
        if !seen.insert(field.name.as_str()) {
            return Err(LoadError::UnsupportedType {
                path,
                reason: "duplicate field name".to_string(),
            });
        }

        let field_type = parse_type_expr(&field.type_expr, &path)?;
        check_references(&field_type, declared, &path)?;

        let annotate = field.is_annotation_target();
        if annotate && !is_leaf_target(&field_type) {
            return Err(LoadError::UnsupportedType {
                path,
                reason: "annotation targets must be scalars or arrays of scalars".to_string(),
            });
        }

        if let Some(default) = &field.default {
            if !default_fits(default, &field_type) {
                return Err(LoadError::UnsupportedType {
                    path,
                    reason: format!("default value does not fit type {}", field_type),
                });
            }
        }

        let constraints = extract_constraints(field, &field_type, &path, patterns, warnings)?;
        let required = !field_type.is_nullable() && field.default.is_none();

        fields.push(FieldSpec {
            name: field.name.clone(),
            field_type,
            required,
            description: field.description.clone(),
            annotate,
            default: field.default.clone(),
            constraints,
        });
    }

    Ok(ObjectType {
        name: decl.name.clone(),
        description: decl.description.clone(),
        fields,
    })
}

fn check_references(
    ty: &SchemaType,
    declared: &HashSet<&str>,
    path: &str,
) -> Result<(), LoadError> {
    match ty {
        SchemaType::Scalar { .. } => Ok(()),
        SchemaType::Object { name } => {
            if declared.contains(name.as_str()) {
                Ok(())
            } else {
                Err(LoadError::UnknownType {
                    path: path.to_string(),
                    name: name.clone(),
                })
            }
        }
        SchemaType::Array { element } => check_references(element, declared, path),
        SchemaType::Nullable { inner } => check_references(inner, declared, path),
    }
}

/// Whether a type is a valid annotation target: a scalar or an array of
/// scalars, ignoring nullable wrappers
fn is_leaf_target(ty: &SchemaType) -> bool {
    match ty.unwrap_nullable() {
        SchemaType::Scalar { .. } => true,
        SchemaType::Array { element } => {
            matches!(element.unwrap_nullable(), SchemaType::Scalar { .. })
        }
        _ => false,
    }
}

/// Shallow type check for declared defaults
///
/// Object member checking is left to validation time.
fn default_fits(value: &Value, ty: &SchemaType) -> bool {
    match ty {
        SchemaType::Nullable { inner } => value.is_null() || default_fits(value, inner),
        SchemaType::Scalar { kind } => match kind {
            ScalarKind::String => value.is_string(),
            ScalarKind::Int => value.as_i64().is_some(),
            ScalarKind::Float => value.is_number(),
            ScalarKind::Bool => value.is_boolean(),
        },
        SchemaType::Array { element } => value
            .as_array()
            .map_or(false, |items| items.iter().all(|v| default_fits(v, element))),
        SchemaType::Object { .. } => value.is_object(),
    }
}

fn extract_constraints(
    field: &FieldDecl,
    field_type: &SchemaType,
    path: &str,
    patterns: &mut HashMap<String, Regex>,
    warnings: &mut Vec<String>,
) -> Result<ConstraintSet, LoadError> {
    for key in field.attrs.keys() {
        if !RECOGNIZED_ATTRS.contains(&key.as_str()) {
            debug!(field = %path, key = %key, "ignoring unrecognized field attribute");
        }
    }

    let kind = leaf_scalar_kind(field_type);
    let mut constraints = ConstraintSet::default();

    if let Some(value) = field.attr("min_length") {
        match value.as_u64() {
            Some(n) if kind == Some(ScalarKind::String) => {
                constraints = constraints.with_min_length(n as usize);
            }
            Some(_) => warn_inapplicable(warnings, path, "min_length", "string"),
            None => return Err(bad_attr(path, "min_length", "a non-negative integer")),
        }
    }

    if let Some(value) = field.attr("max_length") {
        match value.as_u64() {
            Some(n) if kind == Some(ScalarKind::String) => {
                constraints = constraints.with_max_length(n as usize);
            }
            Some(_) => warn_inapplicable(warnings, path, "max_length", "string"),
            None => return Err(bad_attr(path, "max_length", "a non-negative integer")),
        }
    }

    if let Some(value) = field.attr("pattern") {
        match value.as_str() {
            Some(p) if kind == Some(ScalarKind::String) => {
                let regex = Regex::new(p).map_err(|e| LoadError::UnsupportedType {
                    path: path.to_string(),
                    reason: format!("invalid pattern: {}", e),
                })?;
                patterns.entry(p.to_string()).or_insert(regex);
                constraints = constraints.with_pattern(p);
            }
            Some(_) => warn_inapplicable(warnings, path, "pattern", "string"),
            None => return Err(bad_attr(path, "pattern", "a string")),
        }
    }

    if let Some(value) = field.attr("min") {
        match value.as_f64() {
            Some(n) if is_numeric(kind) => constraints = constraints.with_min(n),
            Some(_) => warn_inapplicable(warnings, path, "min", "numeric"),
            None => return Err(bad_attr(path, "min", "a number")),
        }
    }

    if let Some(value) = field.attr("max") {
        match value.as_f64() {
            Some(n) if is_numeric(kind) => constraints = constraints.with_max(n),
            Some(_) => warn_inapplicable(warnings, path, "max", "numeric"),
            None => return Err(bad_attr(path, "max", "a number")),
        }
    }

    if let Some(value) = field.attr("enum") {
        match value.as_array() {
            Some(values) if kind.is_some() => {
                if values.is_empty() {
                    return Err(bad_attr(path, "enum", "a non-empty array"));
                }
                constraints = constraints.with_enum_values(values.clone());
            }
            Some(_) => warn_inapplicable(warnings, path, "enum", "scalar"),
            None => return Err(bad_attr(path, "enum", "an array")),
        }
    }

    if let Some(value) = field.attr("ui") {
        match value.as_str().and_then(UiHint::parse) {
            Some(hint) => constraints = constraints.with_ui(hint),
            None => {
                let message = format!("{}: unrecognized ui hint {}", path, value);
                warn!(field = %path, "{}", message);
                warnings.push(message);
            }
        }
    }

    if let (Some(lo), Some(hi)) = (constraints.min, constraints.max) {
        if lo > hi {
            let message = format!("{}: min {} exceeds max {}", path, lo, hi);
            warn!(field = %path, "{}", message);
            warnings.push(message);
        }
    }
    if let (Some(lo), Some(hi)) = (constraints.min_length, constraints.max_length) {
        if lo > hi {
            let message = format!("{}: min_length {} exceeds max_length {}", path, lo, hi);
            warn!(field = %path, "{}", message);
            warnings.push(message);
        }
    }

    Ok(constraints)
}

/// Scalar kind of the innermost leaf, looking through nullables and arrays
///
/// Constraints on an array-of-scalar field apply to each element.
fn leaf_scalar_kind(ty: &SchemaType) -> Option<ScalarKind> {
    match ty.unwrap_nullable() {
        SchemaType::Scalar { kind } => Some(*kind),
        SchemaType::Array { element } => leaf_scalar_kind(element),
        _ => None,
    }
}

fn is_numeric(kind: Option<ScalarKind>) -> bool {
    matches!(kind, Some(ScalarKind::Int) | Some(ScalarKind::Float))
}

fn bad_attr(path: &str, key: &str, wanted: &str) -> LoadError {
    LoadError::UnsupportedType {
        path: path.to_string(),
        reason: format!("'{}' must be {}", key, wanted),
    }
}

fn warn_inapplicable(warnings: &mut Vec<String>, path: &str, key: &str, wanted: &str) {
    let message = format!(
        "{}: '{}' applies only to {} fields, ignoring",
        path, key, wanted
    );
    warn!(field = %path, "{}", message);
    warnings.push(message);
}

/// Pick the root type
///
/// A single marked type wins. With none marked, a single type that no
/// other type references is accepted with a warning. Anything else is
/// an error: the caller must disambiguate in the template.
fn select_root(
    file: &TemplateFile,
    objects: &IndexMap<String, ObjectType>,
    warnings: &mut Vec<String>,
) -> Result<String, LoadError> {
    let marked: Vec<&str> = file.marked_roots().iter().map(|t| t.name.as_str()).collect();
    match marked.len() {
        1 => return Ok(marked[0].to_string()),
        0 => {}
        _ => return Err(ambiguous(&marked)),
    }

    let referenced = referenced_names(objects);
    let candidates: Vec<&str> = file
        .types
        .iter()
        .map(|t| t.name.as_str())
        .filter(|name| !referenced.contains(*name))
        .collect();

    match candidates.len() {
        0 => Err(LoadError::NoRoot),
        1 => {
            let root = candidates[0];
            let message = format!(
                "no type is marked root; using the only unreferenced type '{}'",
                root
            );
            warn!(template = %file.template, root = %root, "root fallback");
            warnings.push(message);
            Ok(root.to_string())
        }
        _ => Err(ambiguous(&candidates)),
    }
}

fn ambiguous(candidates: &[&str]) -> LoadError {
    let mut candidates: Vec<String> = candidates.iter().map(|s| s.to_string()).collect();
    // Sort for deterministic output
    candidates.sort();
    LoadError::AmbiguousRoot { candidates }
}

/// Type names referenced from the fields of any other type
///
/// Self-references do not count, so a type that only mentions itself can
/// still be the fallback root.
fn referenced_names(objects: &IndexMap<String, ObjectType>) -> HashSet<String> {
    let mut referenced = HashSet::new();
    for (owner, object) in objects {
        for field in &object.fields {
            collect_references(&field.field_type, owner, &mut referenced);
        }
    }
    referenced
}

fn collect_references(ty: &SchemaType, owner: &str, out: &mut HashSet<String>) {
    match ty {
        SchemaType::Object { name } => {
            if name != owner {
                out.insert(name.clone());
            }
        }
        SchemaType::Array { element } => collect_references(element, owner, out),
        SchemaType::Nullable { inner } => collect_references(inner, owner, out),
        SchemaType::Scalar { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(source: &str) -> Result<TemplateSchema, LoadError> {
        TemplateResolver::resolve(source)
    }

    const BASIC: &str = r#"{
        "template": "article-review",
        "version": "3",
        "types": [
            {
                "name": "Review",
                "root": true,
                "fields": [
                    { "name": "title", "type": "string", "annotate": true, "min_length": 5, "max_length": 200 },
                    { "name": "url", "type": "string?" },
                    { "name": "status", "type": "string", "default": "draft", "enum": ["draft", "final"] },
                    { "name": "sections", "type": "Section[]" }
                ]
            },
            {
                "name": "Section",
                "fields": [
                    { "name": "score", "type": "int", "annotate": true, "min": 0, "max": 10 }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_resolve_basic_template() {
        let schema = resolve(BASIC).unwrap();
        assert_eq!(schema.name, "article-review");
        assert_eq!(schema.version, "3");
        assert_eq!(schema.root, "Review");
        assert_eq!(schema.type_names(), vec!["Review", "Section"]);
        assert!(schema.warnings.is_empty());

        let review = schema.root_object();
        let title = review.find_field("title").unwrap();
        assert!(title.required);
        assert!(title.annotate);
        assert_eq!(title.constraints.min_length, Some(5));
        assert_eq!(title.constraints.max_length, Some(200));

        let url = review.find_field("url").unwrap();
        assert!(!url.required);
        assert!(url.field_type.is_nullable());

        let status = review.find_field("status").unwrap();
        assert!(!status.required);
        assert_eq!(status.default, Some(serde_json::json!("draft")));
        assert_eq!(
            status.constraints.enum_values.as_ref().map(|v| v.len()),
            Some(2)
        );

        let score = schema.object("Section").unwrap().find_field("score").unwrap();
        assert_eq!(score.constraints.min, Some(0.0));
        assert_eq!(score.constraints.max, Some(10.0));
    }

    #[test]
    fn test_fallback_root_warns() {
        let source = r#"{
            "template": "t",
            "types": [
                { "name": "Doc", "fields": [ { "name": "part", "type": "Part" } ] },
                { "name": "Part", "fields": [ { "name": "x", "type": "int" } ] }
            ]
        }"#;
        let schema = resolve(source).unwrap();
        assert_eq!(schema.root, "Doc");
        assert_eq!(schema.warnings.len(), 1);
        assert!(schema.warnings[0].contains("Doc"));
    }

    #[test]
    fn test_two_marked_roots_is_ambiguous() {
        let source = r#"{
            "template": "t",
            "types": [
                { "name": "B", "root": true, "fields": [] },
                { "name": "A", "root": true, "fields": [] }
            ]
        }"#;
        match resolve(source).unwrap_err() {
            LoadError::AmbiguousRoot { candidates } => {
                assert_eq!(candidates, vec!["A".to_string(), "B".to_string()]);
            }
            other => panic!("expected ambiguous root, got {:?}", other),
        }
    }

    #[test]
    fn test_two_unreferenced_types_is_ambiguous() {
        let source = r#"{
            "template": "t",
            "types": [
                { "name": "A", "fields": [ { "name": "x", "type": "int" } ] },
                { "name": "B", "fields": [ { "name": "y", "type": "int" } ] }
            ]
        }"#;
        assert!(matches!(
            resolve(source).unwrap_err(),
            LoadError::AmbiguousRoot { .. }
        ));
    }

    #[test]
    fn test_mutual_references_have_no_root() {
        let source = r#"{
            "template": "t",
            "types": [
                { "name": "A", "fields": [ { "name": "b", "type": "B?" } ] },
                { "name": "B", "fields": [ { "name": "a", "type": "A?" } ] }
            ]
        }"#;
        assert_eq!(resolve(source).unwrap_err(), LoadError::NoRoot);
    }

    #[test]
    fn test_self_reference_can_be_fallback_root() {
        let source = r#"{
            "template": "t",
            "types": [
                {
                    "name": "Section",
                    "fields": [
                        { "name": "heading", "type": "string" },
                        { "name": "subsections", "type": "Section[]" }
                    ]
                }
            ]
        }"#;
        let schema = resolve(source).unwrap();
        assert_eq!(schema.root, "Section");
        assert_eq!(schema.warnings.len(), 1);
    }

    #[test]
    fn test_unknown_type_reference() {
        let source = r#"{
            "template": "t",
            "types": [
                { "name": "A", "root": true, "fields": [ { "name": "b", "type": "Missing[]" } ] }
            ]
        }"#;
        match resolve(source).unwrap_err() {
            LoadError::UnknownType { path, name } => {
                assert_eq!(path, "A.b");
                assert_eq!(name, "Missing");
            }
            other => panic!("expected unknown type, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_type_and_field() {
        let dup_type = r#"{
            "template": "t",
            "types": [
                { "name": "A", "root": true, "fields": [] },
                { "name": "A", "fields": [] }
            ]
        }"#;
        assert!(matches!(
            resolve(dup_type).unwrap_err(),
            LoadError::DuplicateType { .. }
        ));

        let dup_field = r#"{
            "template": "t",
            "types": [
                {
                    "name": "A",
                    "root": true,
                    "fields": [
                        { "name": "x", "type": "int" },
                        { "name": "x", "type": "string" }
                    ]
                }
            ]
        }"#;
        assert!(matches!(
            resolve(dup_field).unwrap_err(),
            LoadError::UnsupportedType { .. }
        ));
    }

    #[test]
    fn test_annotate_on_container_is_rejected() {
        let source = r#"{
            "template": "t",
            "types": [
                { "name": "A", "root": true, "fields": [ { "name": "s", "type": "S", "annotate": true } ] },
                { "name": "S", "fields": [ { "name": "x", "type": "int" } ] }
            ]
        }"#;
        assert!(matches!(
            resolve(source).unwrap_err(),
            LoadError::UnsupportedType { .. }
        ));
    }

    #[test]
    fn test_annotate_on_scalar_array_is_allowed() {
        let source = r#"{
            "template": "t",
            "types": [
                { "name": "A", "root": true, "fields": [ { "name": "tags", "type": "string[]", "annotate": true } ] }
            ]
        }"#;
        let schema = resolve(source).unwrap();
        assert!(schema.root_object().find_field("tags").unwrap().annotate);
    }

    #[test]
    fn test_scalar_shadowing_type_name_is_rejected() {
        let source = r#"{
            "template": "t",
            "types": [
                { "name": "string", "root": true, "fields": [] }
            ]
        }"#;
        assert!(matches!(
            resolve(source).unwrap_err(),
            LoadError::UnsupportedType { .. }
        ));
    }

    #[test]
    fn test_default_must_fit_type() {
        let source = r#"{
            "template": "t",
            "types": [
                { "name": "A", "root": true, "fields": [ { "name": "n", "type": "int", "default": "five" } ] }
            ]
        }"#;
        assert!(matches!(
            resolve(source).unwrap_err(),
            LoadError::UnsupportedType { .. }
        ));

        let nullable = r#"{
            "template": "t",
            "types": [
                { "name": "A", "root": true, "fields": [ { "name": "n", "type": "int?", "default": null } ] }
            ]
        }"#;
        assert!(resolve(nullable).is_ok());
    }

    #[test]
    fn test_inapplicable_constraint_warns_and_drops() {
        let source = r#"{
            "template": "t",
            "types": [
                { "name": "A", "root": true, "fields": [ { "name": "n", "type": "int", "min_length": 3 } ] }
            ]
        }"#;
        let schema = resolve(source).unwrap();
        let field = schema.root_object().find_field("n").unwrap();
        assert!(field.constraints.min_length.is_none());
        assert_eq!(schema.warnings.len(), 1);
        assert!(schema.warnings[0].contains("min_length"));
    }

    #[test]
    fn test_malformed_constraint_value_is_an_error() {
        let source = r#"{
            "template": "t",
            "types": [
                { "name": "A", "root": true, "fields": [ { "name": "s", "type": "string", "min_length": "five" } ] }
            ]
        }"#;
        assert!(matches!(
            resolve(source).unwrap_err(),
            LoadError::UnsupportedType { .. }
        ));
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let source = r#"{
            "template": "t",
            "types": [
                { "name": "A", "root": true, "fields": [ { "name": "s", "type": "string", "pattern": "[" } ] }
            ]
        }"#;
        assert!(matches!(
            resolve(source).unwrap_err(),
            LoadError::UnsupportedType { .. }
        ));
    }

    #[test]
    fn test_pattern_is_compiled_into_the_schema() {
        let source = r#"{
            "template": "t",
            "types": [
                { "name": "A", "root": true, "fields": [ { "name": "s", "type": "string", "pattern": "^v[0-9]+$" } ] }
            ]
        }"#;
        let schema = resolve(source).unwrap();
        assert!(schema.pattern("^v[0-9]+$").unwrap().is_match("v3"));
    }

    #[test]
    fn test_unrecognized_ui_hint_warns() {
        let source = r#"{
            "template": "t",
            "types": [
                { "name": "A", "root": true, "fields": [ { "name": "s", "type": "string", "ui": "dropdown" } ] }
            ]
        }"#;
        let schema = resolve(source).unwrap();
        assert!(schema.root_object().find_field("s").unwrap().constraints.ui.is_none());
        assert_eq!(schema.warnings.len(), 1);
    }

    #[test]
    fn test_inverted_bounds_warn() {
        let source = r#"{
            "template": "t",
            "types": [
                { "name": "A", "root": true, "fields": [ { "name": "n", "type": "int", "min": 10, "max": 1 } ] }
            ]
        }"#;
        let schema = resolve(source).unwrap();
        assert_eq!(schema.warnings.len(), 1);
        assert!(schema.warnings[0].contains("min 10 exceeds max 1"));
    }
}
