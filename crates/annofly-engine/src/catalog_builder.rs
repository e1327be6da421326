//! Field catalog construction
//!
//! Flattens a resolved schema into the ordered list of annotation
//! targets. Object members join with `.`, array crossings append `[]`.
//! The walk is depth-first in declaration order, and that order is part
//! of the contract: annotation front ends render forms straight from it.

use annofly_core::{paths, AnnotationField, ObjectType, SchemaType, TemplateSchema};

/// Builds flattened annotation-field catalogs
pub struct CatalogBuilder;

impl CatalogBuilder {
    /// Build the catalog for a schema's root type
    pub fn build(schema: &TemplateSchema) -> Vec<AnnotationField> {
        let mut fields = Vec::new();
        let mut stack = vec![schema.root.clone()];
        walk_object(schema, schema.root_object(), "", false, &mut stack, &mut fields);
        fields
    }
}

fn walk_object(
    schema: &TemplateSchema,
    object: &ObjectType,
    prefix: &str,
    forced_optional: bool,
    stack: &mut Vec<String>,
    out: &mut Vec<AnnotationField>,
) {
    for field in &object.fields {
        let path = paths::join(prefix, &field.name);
        let optional = forced_optional || !field.required;

        if field.annotate {
            // The resolver guarantees targets are leaves, so no descent
            out.push(AnnotationField {
                path,
                field_type: field.field_type.clone(),
                required: !optional,
                description: field.description.clone(),
                constraints: field.constraints.clone(),
            });
            continue;
        }

        walk_type(
            schema,
            field.field_type.unwrap_nullable(),
            &path,
            optional,
            stack,
            out,
        );
    }
}

fn walk_type(
    schema: &TemplateSchema,
    ty: &SchemaType,
    path: &str,
    forced_optional: bool,
    stack: &mut Vec<String>,
    out: &mut Vec<AnnotationField>,
) {
    match ty {
        SchemaType::Object { name } => {
            // A type already on the walk stack would recurse forever;
            // its reappearance contributes nothing
            if stack.iter().any(|n| n == name) {
                return;
            }
            let object = schema
                .object(name)
                .expect("type references checked at load");
            stack.push(name.clone());
            walk_object(schema, object, path, forced_optional, stack, out);
            stack.pop();
        }
        SchemaType::Array { element } => {
            walk_type(
                schema,
                element.unwrap_nullable(),
                &paths::array(path),
                forced_optional,
                stack,
                out,
            );
        }
        SchemaType::Nullable { inner } => {
            walk_type(schema, inner, path, true, stack, out);
        }
        SchemaType::Scalar { .. } => {}
    }
}
