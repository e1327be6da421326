//! Partial validation
//!
//! Gives per-field feedback while a record is still being assembled.
//! The edited values are merged into a synthesized record (placeholders
//! standing in for everything untouched), the whole candidate runs
//! through the document validator, and only errors that trace back to
//! an edited path survive. Placeholder noise never reaches the caller.

use annofly_core::paths::{self, PathSegment};
use annofly_core::{
    AnnotationField, ErrorKind, FieldSpec, FieldValidation, ObjectType, ScalarKind, SchemaType,
    TemplateSchema, ValidationError,
};
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::document_validator::DocumentValidator;

/// Validates edited annotation values in isolation
pub struct PartialValidator<'a> {
    schema: &'a TemplateSchema,
    catalog: &'a [AnnotationField],
}

/// One edit, rescoped as synthesis descends
struct ScopedEdit<'e> {
    segments: &'e [PathSegment],
    value: &'e Value,
}

impl<'a> PartialValidator<'a> {
    pub fn new(schema: &'a TemplateSchema, catalog: &'a [AnnotationField]) -> Self {
        Self { schema, catalog }
    }

    /// Validate edited paths, returning one verdict per path
    ///
    /// Values for paths that cross arrays must arrive as lists nested to
    /// the path's `[]` depth; their outer lengths fix the cardinality of
    /// the synthesized arrays.
    pub fn validate(&self, edits: &IndexMap<String, Value>) -> IndexMap<String, FieldValidation> {
        let mut verdicts: IndexMap<String, FieldValidation> = edits
            .keys()
            .map(|path| (path.clone(), FieldValidation::Valid))
            .collect();

        // Unknown paths and mis-shaped values fail before any synthesis
        let mut usable: Vec<(String, Vec<PathSegment>, &Value)> = Vec::new();
        for (path, value) in edits {
            if !self.catalog.iter().any(|f| &f.path == path) {
                let error = ValidationError::new(
                    ErrorKind::UnknownField,
                    path,
                    format!(
                        "'{}' is not an annotation field of template '{}'",
                        path, self.schema.name
                    ),
                );
                verdicts.insert(path.clone(), FieldValidation::Invalid { errors: vec![error] });
                continue;
            }
            let segments = paths::segments(path);
            let depth = segments
                .iter()
                .filter(|s| matches!(s, PathSegment::AnyIndex))
                .count();
            if let Err(error) = check_list_depth(value, depth, path) {
                verdicts.insert(path.clone(), FieldValidation::Invalid { errors: vec![error] });
                continue;
            }
            usable.push((path.clone(), segments, value));
        }

        if usable.is_empty() {
            return verdicts;
        }

        let scoped: Vec<ScopedEdit> = usable
            .iter()
            .map(|(_, segments, value)| ScopedEdit { segments, value })
            .collect();
        let mut type_stack = vec![self.schema.root.clone()];
        let candidate = Value::Object(self.synthesize_object(
            self.schema.root_object(),
            &scoped,
            &mut type_stack,
        ));

        let outcome = DocumentValidator::new(self.schema).validate(&candidate);

        // Attribute each error to the edited path it falls under; errors
        // from placeholders land outside every edited path and drop out
        for error in outcome.errors() {
            let collapsed = paths::collapse_indices(&error.path);
            for (path, _, _) in &usable {
                if paths::is_within(&collapsed, path) {
                    match verdicts.get_mut(path.as_str()) {
                        Some(FieldValidation::Invalid { errors }) => errors.push(error.clone()),
                        Some(slot) => {
                            *slot = FieldValidation::Invalid {
                                errors: vec![error.clone()],
                            };
                        }
                        None => {}
                    }
                    break;
                }
            }
        }

        verdicts
    }

    fn synthesize_object<'e>(
        &self,
        object: &ObjectType,
        edits: &[ScopedEdit<'e>],
        type_stack: &mut Vec<String>,
    ) -> Map<String, Value> {
        let mut record = Map::new();
        for field in &object.fields {
            let mut scoped = Vec::new();
            for edit in edits {
                if let Some((PathSegment::Field(name), rest)) = edit.segments.split_first() {
                    if name == &field.name {
                        scoped.push(ScopedEdit {
                            segments: rest,
                            value: edit.value,
                        });
                    }
                }
            }
            if let Some(value) = self.synthesize_field(field, &scoped, type_stack) {
                record.insert(field.name.clone(), value);
            }
        }
        record
    }

    fn synthesize_field<'e>(
        &self,
        field: &FieldSpec,
        edits: &[ScopedEdit<'e>],
        type_stack: &mut Vec<String>,
    ) -> Option<Value> {
        // A direct edit supplies the value outright
        if let Some(edit) = edits.iter().find(|e| e.segments.is_empty()) {
            return Some(edit.value.clone());
        }
        if edits.is_empty() {
            if let Some(default) = &field.default {
                return Some(default.clone());
            }
            if field.field_type.is_nullable() {
                return Some(Value::Null);
            }
            return Some(self.placeholder(field.field_type.unwrap_nullable(), type_stack));
        }
        // Edits live beneath this field: materialize the container
        self.synthesize_container(field.field_type.unwrap_nullable(), edits, type_stack)
    }

    fn synthesize_container<'e>(
        &self,
        ty: &SchemaType,
        edits: &[ScopedEdit<'e>],
        type_stack: &mut Vec<String>,
    ) -> Option<Value> {
        match ty {
            SchemaType::Object { name } => {
                if type_stack.iter().any(|n| n == name) {
                    return Some(Value::Object(Map::new()));
                }
                let object = self
                    .schema
                    .object(name)
                    .expect("type references checked at load");
                type_stack.push(name.clone());
                let record = self.synthesize_object(object, edits, type_stack);
                type_stack.pop();
                Some(Value::Object(record))
            }
            SchemaType::Array { element } => {
                // The longest edited outer list fixes the element count;
                // shorter edits leave placeholder elements behind
                let mut lists: Vec<(&'e [PathSegment], &'e Vec<Value>)> = Vec::new();
                let mut length = 0usize;
                for edit in edits {
                    if let Some((PathSegment::AnyIndex, rest)) = edit.segments.split_first() {
                        if let Some(items) = edit.value.as_array() {
                            length = length.max(items.len());
                            lists.push((rest, items));
                        }
                    }
                }
                let element_type = element.unwrap_nullable();
                let mut items_out = Vec::with_capacity(length);
                for i in 0..length {
                    let element_edits: Vec<ScopedEdit<'e>> = lists
                        .iter()
                        .filter_map(|&(rest, items)| {
                            let item = items.get(i)?;
                            // A null slot means no value for this element
                            if item.is_null() {
                                return None;
                            }
                            Some(ScopedEdit {
                                segments: rest,
                                value: item,
                            })
                        })
                        .collect();
                    items_out.push(self.synthesize_element(element_type, &element_edits, type_stack));
                }
                Some(Value::Array(items_out))
            }
            // Catalog paths never continue past a scalar
            SchemaType::Scalar { .. } | SchemaType::Nullable { .. } => None,
        }
    }

    fn synthesize_element<'e>(
        &self,
        element_type: &SchemaType,
        edits: &[ScopedEdit<'e>],
        type_stack: &mut Vec<String>,
    ) -> Value {
        if let Some(edit) = edits.iter().find(|e| e.segments.is_empty()) {
            return edit.value.clone();
        }
        if edits.is_empty() {
            return self.placeholder(element_type, type_stack);
        }
        self.synthesize_container(element_type, edits, type_stack)
            .unwrap_or(Value::Null)
    }

    /// Placeholder least likely to violate constraints: declared defaults
    /// are used where available, nullables become null, required scalars
    /// get the neutral value for their kind, arrays stay empty, and
    /// required objects fill in recursively
    fn placeholder(&self, ty: &SchemaType, type_stack: &mut Vec<String>) -> Value {
        match ty {
            SchemaType::Scalar { kind } => scalar_placeholder(*kind),
            SchemaType::Array { .. } => Value::Array(Vec::new()),
            SchemaType::Nullable { .. } => Value::Null,
            SchemaType::Object { name } => {
                if type_stack.iter().any(|n| n == name) {
                    return Value::Object(Map::new());
                }
                let object = self
                    .schema
                    .object(name)
                    .expect("type references checked at load");
                type_stack.push(name.clone());
                let record = self.synthesize_object(object, &[], type_stack);
                type_stack.pop();
                Value::Object(record)
            }
        }
    }
}

/// Check that a value nests as lists to the path's array depth
fn check_list_depth(value: &Value, depth: usize, path: &str) -> Result<(), ValidationError> {
    if depth == 0 {
        return Ok(());
    }
    match value.as_array() {
        Some(items) => {
            for item in items {
                if !item.is_null() {
                    check_list_depth(item, depth - 1, path)?;
                }
            }
            Ok(())
        }
        None => Err(ValidationError::new(
            ErrorKind::TypeMismatch,
            path,
            format!("expected {} nested list level(s) for '{}'", depth, path),
        )),
    }
}

fn scalar_placeholder(kind: ScalarKind) -> Value {
    match kind {
        ScalarKind::String => Value::String(String::new()),
        ScalarKind::Int => Value::from(0),
        ScalarKind::Float => Value::from(0.0),
        ScalarKind::Bool => Value::Bool(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_builder::CatalogBuilder;
    use annofly_core::ConstraintSet;
    use serde_json::json;

    fn create_test_schema() -> TemplateSchema {
        let review = ObjectType::from_fields(
            "Review",
            vec![
                FieldSpec::new("title", SchemaType::scalar(ScalarKind::String))
                    .with_annotate(true)
                    .with_constraints(ConstraintSet::new().with_min_length(5)),
                FieldSpec::new(
                    "rating",
                    SchemaType::nullable(SchemaType::scalar(ScalarKind::Float)),
                )
                .with_annotate(true)
                .with_constraints(ConstraintSet::new().with_min(0.0).with_max(5.0)),
                FieldSpec::new("author", SchemaType::object("Author")),
                FieldSpec::new("sections", SchemaType::array(SchemaType::object("Section"))),
                FieldSpec::new("tags", SchemaType::array(SchemaType::scalar(ScalarKind::String)))
                    .with_annotate(true)
                    .with_constraints(ConstraintSet::new().with_min_length(2)),
            ],
        );
        let author = ObjectType::from_fields(
            "Author",
            vec![FieldSpec::new("name", SchemaType::scalar(ScalarKind::String))
                .with_annotate(true)],
        );
        let section = ObjectType::from_fields(
            "Section",
            vec![
                FieldSpec::new("heading", SchemaType::scalar(ScalarKind::String)),
                FieldSpec::new("score", SchemaType::scalar(ScalarKind::Int))
                    .with_annotate(true)
                    .with_constraints(ConstraintSet::new().with_min(0.0).with_max(10.0)),
                FieldSpec::new(
                    "comment",
                    SchemaType::nullable(SchemaType::scalar(ScalarKind::String)),
                )
                .with_annotate(true),
            ],
        );
        TemplateSchema::from_objects("review", "Review", vec![review, author, section])
    }

    fn validate(edits: IndexMap<String, Value>) -> IndexMap<String, FieldValidation> {
        let schema = create_test_schema();
        let catalog = CatalogBuilder::build(&schema);
        PartialValidator::new(&schema, &catalog).validate(&edits)
    }

    fn edits_of(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
        pairs
            .iter()
            .map(|(path, value)| (path.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_placeholders_do_not_interfere() {
        // title and author.name are required elsewhere; editing rating
        // alone must not surface their absence
        let verdicts = validate(edits_of(&[("rating", json!(4.5))]));
        assert_eq!(verdicts.len(), 1);
        assert!(verdicts["rating"].is_valid());
    }

    #[test]
    fn test_edited_violation_surfaces() {
        let verdicts = validate(edits_of(&[("title", json!("hi"))]));
        let errors = verdicts["title"].errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::LengthViolation);
        assert_eq!(errors[0].path, "title");
    }

    #[test]
    fn test_unknown_path_is_invalid() {
        let verdicts = validate(edits_of(&[("headline", json!("x"))]));
        let errors = verdicts["headline"].errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::UnknownField);
    }

    #[test]
    fn test_array_path_requires_nested_lists() {
        let verdicts = validate(edits_of(&[("sections[].score", json!(7))]));
        let errors = verdicts["sections[].score"].errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_array_edit_reports_literal_indices() {
        let verdicts = validate(edits_of(&[("sections[].score", json!([3, 12]))]));
        let errors = verdicts["sections[].score"].errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "sections[1].score");
        assert_eq!(errors[0].kind, ErrorKind::OutOfRange);
    }

    #[test]
    fn test_scalar_array_target_checks_elements() {
        let verdicts = validate(edits_of(&[("tags", json!(["ok", "x"]))]));
        let errors = verdicts["tags"].errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "tags[1]");
        assert_eq!(errors[0].kind, ErrorKind::LengthViolation);
    }

    #[test]
    fn test_multiple_edits_get_independent_verdicts() {
        let verdicts = validate(edits_of(&[
            ("title", json!("A proper title")),
            ("rating", json!(9.0)),
            ("author.name", json!("Sam")),
        ]));
        assert!(verdicts["title"].is_valid());
        assert!(!verdicts["rating"].is_valid());
        assert_eq!(verdicts["rating"].errors()[0].kind, ErrorKind::OutOfRange);
        assert!(verdicts["author.name"].is_valid());
    }

    #[test]
    fn test_verdict_order_matches_edits() {
        let verdicts = validate(edits_of(&[
            ("rating", json!(1.0)),
            ("bogus", json!(1)),
            ("title", json!("Fine title")),
        ]));
        let keys: Vec<&str> = verdicts.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["rating", "bogus", "title"]);
    }

    #[test]
    fn test_ragged_array_edits_use_longest_length() {
        let verdicts = validate(edits_of(&[
            ("sections[].score", json!([3, 7])),
            ("sections[].comment", json!(["good"])),
        ]));
        assert!(verdicts["sections[].score"].is_valid());
        assert!(verdicts["sections[].comment"].is_valid());
    }

    #[test]
    fn test_null_slot_means_no_edit_for_that_element() {
        let verdicts = validate(edits_of(&[("sections[].comment", json!([null, "fix"]))]));
        assert!(verdicts["sections[].comment"].is_valid());
    }

    #[test]
    fn test_empty_edits_return_empty_verdicts() {
        let verdicts = validate(IndexMap::new());
        assert!(verdicts.is_empty());
    }

    #[test]
    fn test_cyclic_schema_terminates() {
        let section = ObjectType::from_fields(
            "Section",
            vec![
                FieldSpec::new("heading", SchemaType::scalar(ScalarKind::String))
                    .with_annotate(true),
                FieldSpec::new(
                    "subsections",
                    SchemaType::array(SchemaType::object("Section")),
                ),
            ],
        );
        let schema = TemplateSchema::from_objects("doc", "Section", vec![section]);
        let catalog = CatalogBuilder::build(&schema);

        let edits = edits_of(&[("heading", json!("Intro"))]);
        let verdicts = PartialValidator::new(&schema, &catalog).validate(&edits);
        assert!(verdicts["heading"].is_valid());
    }
}
