//! Document validation
//!
//! Checks a JSON document against a resolved schema, accumulating every
//! violation rather than stopping at the first. Errors are located by
//! paths with literal array indices (`sections[1].score`). When the
//! document is clean the normalized value is returned, with lossless
//! string coercions already applied.

use annofly_core::{
    paths, ConstraintSet, ErrorKind, ObjectType, ScalarKind, SchemaType, TemplateSchema,
    ValidationError, ValidationOutcome,
};
use serde_json::{Map, Number, Value};

/// Validates documents against one schema
pub struct DocumentValidator<'a> {
    schema: &'a TemplateSchema,
}

impl<'a> DocumentValidator<'a> {
    /// Create a validator borrowing the schema read-only
    pub fn new(schema: &'a TemplateSchema) -> Self {
        Self { schema }
    }

    /// Validate a document against the schema's root type
    pub fn validate(&self, document: &Value) -> ValidationOutcome {
        let mut errors = Vec::new();
        let normalized = match document.as_object() {
            Some(map) => {
                Value::Object(self.check_object(self.schema.root_object(), map, "", &mut errors))
            }
            None => {
                errors.push(type_mismatch(paths::ROOT, "object", document));
                Value::Null
            }
        };
        if errors.is_empty() {
            ValidationOutcome::valid(normalized)
        } else {
            ValidationOutcome::invalid(errors)
        }
    }

    fn check_object(
        &self,
        object: &ObjectType,
        value: &Map<String, Value>,
        prefix: &str,
        errors: &mut Vec<ValidationError>,
    ) -> Map<String, Value> {
        let mut normalized = Map::new();

        for field in &object.fields {
            let path = paths::join(prefix, &field.name);
            match value.get(&field.name) {
                None => {
                    if field.required {
                        errors.push(ValidationError::new(
                            ErrorKind::Required,
                            &path,
                            format!("required field '{}' is missing", field.name),
                        ));
                    }
                }
                Some(Value::Null) => {
                    if field.field_type.is_nullable() {
                        normalized.insert(field.name.clone(), Value::Null);
                    } else if field.required {
                        errors.push(ValidationError::new(
                            ErrorKind::Required,
                            &path,
                            format!("required field '{}' is null", field.name),
                        ));
                    } else {
                        // Optional through a default, but null is not in
                        // the declared type
                        errors.push(type_mismatch(
                            &path,
                            &field.field_type.to_string(),
                            &Value::Null,
                        ));
                    }
                }
                Some(v) => {
                    let checked =
                        self.check_value(&field.field_type, &field.constraints, v, &path, errors);
                    normalized.insert(field.name.clone(), checked);
                }
            }
        }

        // Undeclared members are reported after the declared fields;
        // serde_json maps iterate in sorted key order, which keeps the
        // sequence deterministic
        for key in value.keys() {
            if object.find_field(key).is_none() {
                let path = paths::join(prefix, key);
                errors.push(ValidationError::new(
                    ErrorKind::UnknownField,
                    &path,
                    format!("field '{}' is not declared in type '{}'", key, object.name),
                ));
            }
        }

        normalized
    }

    fn check_value(
        &self,
        ty: &SchemaType,
        constraints: &ConstraintSet,
        value: &Value,
        path: &str,
        errors: &mut Vec<ValidationError>,
    ) -> Value {
        match ty {
            SchemaType::Nullable { inner } => {
                if value.is_null() {
                    Value::Null
                } else {
                    self.check_value(inner, constraints, value, path, errors)
                }
            }
            SchemaType::Scalar { kind } => match coerce_scalar(*kind, value) {
                Some(normalized) => {
                    self.check_constraints(constraints, &normalized, path, errors);
                    normalized
                }
                None => {
                    errors.push(type_mismatch(path, &kind.to_string(), value));
                    value.clone()
                }
            },
            SchemaType::Object { name } => match value.as_object() {
                Some(map) => {
                    let object = self
                        .schema
                        .object(name)
                        .expect("type references checked at load");
                    Value::Object(self.check_object(object, map, path, errors))
                }
                None => {
                    errors.push(type_mismatch(path, name, value));
                    value.clone()
                }
            },
            SchemaType::Array { element } => match value.as_array() {
                Some(items) => {
                    let mut normalized = Vec::with_capacity(items.len());
                    for (i, item) in items.iter().enumerate() {
                        let item_path = paths::indexed(path, i);
                        normalized.push(
                            self.check_value(element, constraints, item, &item_path, errors),
                        );
                    }
                    Value::Array(normalized)
                }
                None => {
                    errors.push(type_mismatch(path, &ty.to_string(), value));
                    value.clone()
                }
            },
        }
    }

    /// Constraint checks over an already-coerced scalar
    fn check_constraints(
        &self,
        constraints: &ConstraintSet,
        value: &Value,
        path: &str,
        errors: &mut Vec<ValidationError>,
    ) {
        if let Some(s) = value.as_str() {
            let length = s.chars().count();
            if let Some(min) = constraints.min_length {
                if length < min {
                    errors.push(ValidationError::new(
                        ErrorKind::LengthViolation,
                        path,
                        format!("length {} is below the minimum of {}", length, min),
                    ));
                }
            }
            if let Some(max) = constraints.max_length {
                if length > max {
                    errors.push(ValidationError::new(
                        ErrorKind::LengthViolation,
                        path,
                        format!("length {} exceeds the maximum of {}", length, max),
                    ));
                }
            }
            if let Some(pattern) = &constraints.pattern {
                // The resolver compiled every declared pattern; a miss
                // here means the schema was built by hand without one
                if let Some(regex) = self.schema.pattern(pattern) {
                    if !regex.is_match(s) {
                        errors.push(ValidationError::new(
                            ErrorKind::PatternViolation,
                            path,
                            format!("value does not match pattern '{}'", pattern),
                        ));
                    }
                }
            }
        }

        if let Some(n) = value.as_f64() {
            if let Some(min) = constraints.min {
                if n < min {
                    errors.push(ValidationError::new(
                        ErrorKind::OutOfRange,
                        path,
                        format!("value {} is below the minimum of {}", n, min),
                    ));
                }
            }
            if let Some(max) = constraints.max {
                if n > max {
                    errors.push(ValidationError::new(
                        ErrorKind::OutOfRange,
                        path,
                        format!("value {} exceeds the maximum of {}", n, max),
                    ));
                }
            }
        }

        if let Some(allowed) = &constraints.enum_values {
            if !enum_contains(allowed, value) {
                errors.push(ValidationError::new(
                    ErrorKind::NotInEnum,
                    path,
                    format!("value {} is not in the allowed set", value),
                ));
            }
        }
    }
}

fn type_mismatch(path: &str, expected: &str, actual: &Value) -> ValidationError {
    ValidationError::new(
        ErrorKind::TypeMismatch,
        path,
        format!("expected {}, found {}", expected, json_type_name(actual)),
    )
    .with_comparison(expected, json_type_name(actual))
}

/// Human-readable JSON type of a value
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) => {
            if n.is_f64() {
                "float"
            } else {
                "int"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Coerce a value to the canonical representation of a scalar kind
///
/// Annotation values often arrive as strings from form inputs, so
/// lossless parses are accepted: numeric strings for int/float, "true"
/// and "false" for bool, and int widening for float. Nothing lossy
/// passes; 5.5 is not an int and 42 is not a string.
fn coerce_scalar(kind: ScalarKind, value: &Value) -> Option<Value> {
    match kind {
        ScalarKind::String => value.as_str().map(|s| Value::String(s.to_string())),
        ScalarKind::Bool => match value {
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::String(s) => match s.trim() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        },
        ScalarKind::Int => match value {
            Value::Number(n) => n.as_i64().map(Value::from),
            Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
            _ => None,
        },
        ScalarKind::Float => match value {
            Value::Number(n) => n.as_f64().and_then(Number::from_f64).map(Value::Number),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .and_then(Number::from_f64)
                .map(Value::Number),
            _ => None,
        },
    }
}

/// Enum membership with numeric equality across int/float spellings
fn enum_contains(allowed: &[Value], value: &Value) -> bool {
    allowed.iter().any(|candidate| {
        if candidate == value {
            return true;
        }
        match (candidate.as_f64(), value.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    })
}
