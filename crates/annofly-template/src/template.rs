//! Template file parsing
//!
//! The authoring format is JSON: a named template with a list of type
//! declarations, each field carrying a type expression plus an open
//! attribute bag. Parsing keeps the bag verbatim; the resolver decides
//! which keys mean anything.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::LoadError;

/// Top-level template document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateFile {
    /// Template name
    pub template: String,

    /// Authoring version label
    #[serde(default = "default_version")]
    pub version: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Type declarations, in authoring order
    pub types: Vec<TypeDecl>,
}

fn default_version() -> String {
    "1".to_string()
}

impl TemplateFile {
    /// Load a template from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let contents = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_str(&contents)
    }

    /// Parse a template from JSON text
    pub fn from_str(json: &str) -> Result<Self, LoadError> {
        serde_json::from_str(json).map_err(|e| LoadError::Syntax {
            location: format!("{}:{}", e.line(), e.column()),
            message: e.to_string(),
        })
    }

    /// Find a type declaration by name
    pub fn find_type(&self, name: &str) -> Option<&TypeDecl> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Names of all declared types, in authoring order
    pub fn type_names(&self) -> Vec<&str> {
        self.types.iter().map(|t| t.name.as_str()).collect()
    }

    /// Types explicitly marked as root
    pub fn marked_roots(&self) -> Vec<&TypeDecl> {
        self.types.iter().filter(|t| t.root).collect()
    }
}

/// One declared object type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    /// Type name, referenced from field type expressions
    pub name: String,

    /// Whether this type is the document root
    #[serde(default)]
    pub root: bool,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Field declarations, in authoring order
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

/// One declared field
///
/// Everything beyond name, type, description, and default lands in the
/// attribute bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    /// Field name
    pub name: String,

    /// Type expression, e.g. `"string"`, `"Section[]"`, `"int?"`
    #[serde(rename = "type")]
    pub type_expr: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Declared default value; its presence makes the field optional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Open attribute bag (annotation marker, UI hint, constraints)
    #[serde(flatten)]
    pub attrs: Map<String, Value>,
}

impl FieldDecl {
    /// Fetch a bag attribute by key
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    /// Whether the field is marked as an annotation target
    ///
    /// Anything other than a literal `true` means it is not.
    pub fn is_annotation_target(&self) -> bool {
        matches!(self.attr("annotate"), Some(Value::Bool(true)))
    }
}
