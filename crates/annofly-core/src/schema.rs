//! Schema type definitions for annotation templates
//!
//! A resolved template is a set of named object types plus the name of the
//! root type. Field types form a small closed algebra: scalars, references
//! to named objects, arrays, and a single nullable wrapper. The resolver
//! guarantees that nullables never nest and that every object reference
//! points at a declared type.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::constraint::ConstraintSet;

/// Scalar value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    String,
    Int,
    Float,
    Bool,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::String => write!(f, "string"),
            ScalarKind::Int => write!(f, "int"),
            ScalarKind::Float => write!(f, "float"),
            ScalarKind::Bool => write!(f, "bool"),
        }
    }
}

/// The type of a field
///
/// Object variants carry the referenced type's name; the owning
/// [`TemplateSchema`] holds the actual definitions so that cyclic
/// references stay representable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SchemaType {
    /// Scalar leaf value
    Scalar { kind: ScalarKind },

    /// Reference to a named object type
    Object { name: String },

    /// Array of a single element type
    Array { element: Box<SchemaType> },

    /// Value that may also be null
    ///
    /// Never nests directly inside another Nullable.
    Nullable { inner: Box<SchemaType> },
}

impl SchemaType {
    /// A scalar type
    pub fn scalar(kind: ScalarKind) -> Self {
        SchemaType::Scalar { kind }
    }

    /// A reference to a named object type
    pub fn object(name: impl Into<String>) -> Self {
        SchemaType::Object { name: name.into() }
    }

    /// An array of the given element type
    pub fn array(element: SchemaType) -> Self {
        SchemaType::Array {
            element: Box::new(element),
        }
    }

    /// A nullable wrapper around the given type
    pub fn nullable(inner: SchemaType) -> Self {
        SchemaType::Nullable {
            inner: Box::new(inner),
        }
    }

    /// Whether null is an accepted value
    pub fn is_nullable(&self) -> bool {
        matches!(self, SchemaType::Nullable { .. })
    }

    /// Strip the nullable wrapper, if any
    pub fn unwrap_nullable(&self) -> &SchemaType {
        match self {
            SchemaType::Nullable { inner } => inner,
            other => other,
        }
    }

    /// The scalar kind at this type, looking through a nullable wrapper
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self.unwrap_nullable() {
            SchemaType::Scalar { kind } => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaType::Scalar { kind } => write!(f, "{}", kind),
            SchemaType::Object { name } => write!(f, "{}", name),
            SchemaType::Array { element } => write!(f, "{}[]", element),
            SchemaType::Nullable { inner } => write!(f, "{}?", inner),
        }
    }
}

/// One field of an object type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name as it appears in documents
    pub name: String,

    /// Declared type
    #[serde(rename = "type")]
    pub field_type: SchemaType,

    /// Whether a non-null value must be present
    ///
    /// Derived at load time: false when the type is nullable or a
    /// default is declared, true otherwise.
    pub required: bool,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Whether annotators supply this field's value
    #[serde(default)]
    pub annotate: bool,

    /// Declared default value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Constraints applied to the field's values
    #[serde(default, skip_serializing_if = "ConstraintSet::is_empty")]
    pub constraints: ConstraintSet,
}

impl FieldSpec {
    /// Create a field with the required flag derived from its type
    pub fn new(name: impl Into<String>, field_type: SchemaType) -> Self {
        let required = !field_type.is_nullable();
        Self {
            name: name.into(),
            field_type,
            required,
            description: String::new(),
            annotate: false,
            default: None,
            constraints: ConstraintSet::default(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Mark or unmark the field as an annotation target
    pub fn with_annotate(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    /// Declare a default value, which also makes the field optional
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self.required = false;
        self
    }

    /// Attach constraints
    pub fn with_constraints(mut self, constraints: ConstraintSet) -> Self {
        self.constraints = constraints;
        self
    }
}

/// A named object type with ordered fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectType {
    /// Type name, unique within a template
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Fields in declaration order
    pub fields: Vec<FieldSpec>,
}

impl ObjectType {
    /// Create an empty object type
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            fields: Vec::new(),
        }
    }

    /// Create an object type from a list of fields
    pub fn from_fields(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            fields,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Find a field by name
    pub fn find_field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of all fields, in declaration order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

/// One flattened annotation target derived from a schema
///
/// Catalogs are rebuilt whenever the owning schema is reloaded and are
/// never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationField {
    /// Flattened path, e.g. `sections[].notes.score`
    pub path: String,

    /// Declared field type
    #[serde(rename = "type")]
    pub field_type: SchemaType,

    /// Whether a value must be supplied
    ///
    /// False when the field itself is optional or any ancestor on the
    /// path is nullable.
    pub required: bool,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Constraints carried over from the field declaration
    #[serde(default, skip_serializing_if = "ConstraintSet::is_empty")]
    pub constraints: ConstraintSet,
}

/// A fully resolved template: the object type table plus the root name
///
/// Immutable once resolved; engine operations borrow it read-only, which
/// is what makes cached schemas safe to share across threads.
#[derive(Debug, Clone)]
pub struct TemplateSchema {
    /// Template name
    pub name: String,

    /// Authoring version label
    pub version: String,

    /// Name of the root object type
    pub root: String,

    /// Object types in declaration order
    pub objects: IndexMap<String, ObjectType>,

    /// Compiled patterns, keyed by their source text
    pub patterns: HashMap<String, Regex>,

    /// Non-fatal messages produced while resolving
    pub warnings: Vec<String>,
}

impl TemplateSchema {
    /// Create an empty schema with the given root name
    pub fn new(name: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "1".to_string(),
            root: root.into(),
            objects: IndexMap::new(),
            patterns: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Create a schema from a list of object types
    pub fn from_objects(
        name: impl Into<String>,
        root: impl Into<String>,
        objects: Vec<ObjectType>,
    ) -> Self {
        let mut schema = Self::new(name, root);
        for object in objects {
            schema.objects.insert(object.name.clone(), object);
        }
        schema
    }

    /// Set the version label
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Look up an object type by name
    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        self.objects.get(name)
    }

    /// The root object type
    pub fn root_object(&self) -> &ObjectType {
        self.objects
            .get(&self.root)
            .expect("root type present in the object table")
    }

    /// Names of all object types, in declaration order
    pub fn type_names(&self) -> Vec<&str> {
        self.objects.keys().map(|k| k.as_str()).collect()
    }

    /// Compile and store a pattern so validators can look it up later
    pub fn compile_pattern(&mut self, pattern: &str) -> Result<(), regex::Error> {
        if !self.patterns.contains_key(pattern) {
            self.patterns.insert(pattern.to_string(), Regex::new(pattern)?);
        }
        Ok(())
    }

    /// Look up a compiled pattern by its source text
    pub fn pattern(&self, pattern: &str) -> Option<&Regex> {
        self.patterns.get(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_schema() -> TemplateSchema {
        let review = ObjectType::from_fields(
            "Review",
            vec![
                FieldSpec::new("title", SchemaType::scalar(ScalarKind::String)),
                FieldSpec::new(
                    "sections",
                    SchemaType::array(SchemaType::object("Section")),
                ),
            ],
        );
        let section = ObjectType::from_fields(
            "Section",
            vec![FieldSpec::new(
                "score",
                SchemaType::scalar(ScalarKind::Int),
            )],
        );
        TemplateSchema::from_objects("review", "Review", vec![review, section])
    }

    #[test]
    fn test_type_display() {
        assert_eq!(SchemaType::scalar(ScalarKind::String).to_string(), "string");
        assert_eq!(SchemaType::object("Section").to_string(), "Section");
        assert_eq!(
            SchemaType::array(SchemaType::object("Section")).to_string(),
            "Section[]"
        );
        assert_eq!(
            SchemaType::nullable(SchemaType::scalar(ScalarKind::Int)).to_string(),
            "int?"
        );
        assert_eq!(
            SchemaType::array(SchemaType::nullable(SchemaType::scalar(ScalarKind::Float)))
                .to_string(),
            "float?[]"
        );
    }

    #[test]
    fn test_unwrap_nullable() {
        let ty = SchemaType::nullable(SchemaType::scalar(ScalarKind::Bool));
        assert!(ty.is_nullable());
        assert_eq!(
            ty.unwrap_nullable(),
            &SchemaType::scalar(ScalarKind::Bool)
        );
        assert_eq!(ty.scalar_kind(), Some(ScalarKind::Bool));

        let plain = SchemaType::scalar(ScalarKind::Int);
        assert_eq!(plain.unwrap_nullable(), &plain);
    }

    #[test]
    fn test_required_derivation() {
        let required = FieldSpec::new("title", SchemaType::scalar(ScalarKind::String));
        assert!(required.required);

        let nullable = FieldSpec::new(
            "url",
            SchemaType::nullable(SchemaType::scalar(ScalarKind::String)),
        );
        assert!(!nullable.required);

        let defaulted = FieldSpec::new("status", SchemaType::scalar(ScalarKind::String))
            .with_default(json!("draft"));
        assert!(!defaulted.required);
        assert_eq!(defaulted.default, Some(json!("draft")));
    }

    #[test]
    fn test_schema_lookups() {
        let schema = create_test_schema();
        assert_eq!(schema.type_names(), vec!["Review", "Section"]);
        assert_eq!(schema.root_object().name, "Review");
        assert!(schema.object("Section").is_some());
        assert!(schema.object("Missing").is_none());

        let review = schema.root_object();
        assert_eq!(review.field_names(), vec!["title", "sections"]);
        assert!(review.find_field("title").is_some());
        assert!(review.find_field("missing").is_none());
    }

    #[test]
    fn test_pattern_table() {
        let mut schema = create_test_schema();
        schema.compile_pattern("^v[0-9]+$").unwrap();
        assert!(schema.pattern("^v[0-9]+$").unwrap().is_match("v12"));
        assert!(schema.pattern("unknown").is_none());
        assert!(schema.compile_pattern("[").is_err());
    }
}
