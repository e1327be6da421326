//! Schema registry
//!
//! Caches resolved templates and their derived catalogs, keyed by
//! content identity of the source text. Resolution is pure, so two
//! threads racing on the same miss may both resolve; the first insert
//! wins and the duplicate work is discarded.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let registry = SchemaRegistry::new();
//! let loaded = registry.load(source)?;
//! let outcome = loaded.validate(&document);
//! ```

use annofly_core::{
    AnnotationField, BatchReport, FieldValidation, SourceId, TemplateSchema, ValidationOutcome,
};
use annofly_template::{LoadError, TemplateResolver};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::annotation_extractor::AnnotationExtractor;
use crate::batch_validator::BatchValidator;
use crate::catalog_builder::CatalogBuilder;
use crate::document_validator::DocumentValidator;
use crate::partial_validator::PartialValidator;

/// A resolved schema with its derived catalog
///
/// Built together and shared immutably; reloading a changed source
/// produces a fresh instance under a new identity.
#[derive(Debug)]
pub struct LoadedTemplate {
    /// Content identity of the source text
    pub source_id: SourceId,

    /// Resolved schema
    pub schema: TemplateSchema,

    /// Flattened annotation targets, in declaration order
    pub catalog: Vec<AnnotationField>,
}

impl LoadedTemplate {
    /// Resolve source text and derive the catalog
    pub fn load(source: &str) -> Result<Self, LoadError> {
        let schema = TemplateResolver::resolve(source)?;
        let catalog = CatalogBuilder::build(&schema);
        Ok(Self {
            source_id: SourceId::of(source),
            schema,
            catalog,
        })
    }

    /// Validate a document against the schema
    pub fn validate(&self, document: &Value) -> ValidationOutcome {
        DocumentValidator::new(&self.schema).validate(document)
    }

    /// Validate edited annotation values in isolation
    pub fn validate_partial(
        &self,
        edits: &IndexMap<String, Value>,
    ) -> IndexMap<String, FieldValidation> {
        PartialValidator::new(&self.schema, &self.catalog).validate(edits)
    }

    /// Extract annotation values from a validated document
    pub fn extract(&self, document: &Value) -> IndexMap<String, Value> {
        AnnotationExtractor::new(&self.catalog).extract(document)
    }

    /// The annotation-field catalog
    pub fn catalog(&self) -> &[AnnotationField] {
        &self.catalog
    }

    /// Validate line-delimited records
    pub fn validate_jsonl(&self, input: &str) -> BatchReport {
        BatchValidator::new(&self.schema).validate_jsonl(input)
    }

    /// Validate a JSON array of records
    pub fn validate_array(&self, input: &str) -> BatchReport {
        BatchValidator::new(&self.schema).validate_array(input)
    }
}

/// Thread-safe cache of loaded templates
pub struct SchemaRegistry {
    entries: Arc<RwLock<HashMap<SourceId, Arc<LoadedTemplate>>>>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Load a template through the cache
    ///
    /// Misses resolve outside the lock; when another caller inserted the
    /// same source meanwhile, their entry wins.
    pub fn load(&self, source: &str) -> Result<Arc<LoadedTemplate>, LoadError> {
        let source_id = SourceId::of(source);

        if let Ok(entries) = self.entries.read() {
            if let Some(entry) = entries.get(&source_id) {
                debug!(source = %source_id.short(), "registry hit");
                return Ok(Arc::clone(entry));
            }
        }

        debug!(source = %source_id.short(), "registry miss, resolving");
        let loaded = Arc::new(LoadedTemplate::load(source)?);

        if let Ok(mut entries) = self.entries.write() {
            return Ok(Arc::clone(entries.entry(source_id).or_insert(loaded)));
        }
        Ok(loaded)
    }

    /// Look up an already-loaded template by identity
    pub fn get(&self, source_id: &SourceId) -> Option<Arc<LoadedTemplate>> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(source_id).map(Arc::clone))
    }

    /// Drop one cached template
    pub fn evict(&self, source_id: &SourceId) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(source_id);
        }
    }

    /// Drop every cached template
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    /// Number of cached templates
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"{
        "template": "t",
        "types": [
            { "name": "Doc", "root": true, "fields": [ { "name": "x", "type": "int" } ] }
        ]
    }"#;

    #[test]
    fn test_load_caches_by_content() {
        let registry = SchemaRegistry::new();
        assert!(registry.is_empty());

        let first = registry.load(SOURCE).unwrap();
        let second = registry.load(SOURCE).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);

        // Same content from a "different file" still hits
        let copy = String::from(SOURCE);
        let third = registry.load(&copy).unwrap();
        assert!(Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn test_distinct_sources_get_distinct_entries() {
        let registry = SchemaRegistry::new();
        let a = registry.load(SOURCE).unwrap();
        let b = registry
            .load(&SOURCE.replace("\"x\"", "\"y\""))
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_ne!(a.source_id, b.source_id);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_get_and_evict() {
        let registry = SchemaRegistry::new();
        let loaded = registry.load(SOURCE).unwrap();
        assert!(registry.get(&loaded.source_id).is_some());

        registry.evict(&loaded.source_id);
        assert!(registry.get(&loaded.source_id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_load_error_is_not_cached() {
        let registry = SchemaRegistry::new();
        let err = registry.load("{ not json").unwrap_err();
        assert!(matches!(err, LoadError::Syntax { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_loaded_template_operations() {
        let registry = SchemaRegistry::new();
        let loaded = registry.load(SOURCE).unwrap();
        assert_eq!(loaded.schema.root, "Doc");
        assert!(loaded.catalog().is_empty());
        assert!(loaded.validate(&serde_json::json!({ "x": 1 })).is_valid());
    }
}
