//! Annotation extraction
//!
//! Collects the values of annotation targets from a validated document,
//! keyed by flattened catalog path. Each array crossing on a path fans
//! the result out into one more list level, so a leaf under k arrays
//! comes back k lists deep and positions always line up with the source
//! arrays.

use annofly_core::paths::{self, PathSegment};
use annofly_core::AnnotationField;
use indexmap::IndexMap;
use serde_json::Value;

/// Extracts annotation values using a prebuilt catalog
pub struct AnnotationExtractor<'a> {
    catalog: &'a [AnnotationField],
}

impl<'a> AnnotationExtractor<'a> {
    pub fn new(catalog: &'a [AnnotationField]) -> Self {
        Self { catalog }
    }

    /// Extract annotation values, in catalog order
    ///
    /// A missing or null optional target produces no entry at the top
    /// level. Inside arrays the slot becomes null instead, so sibling
    /// positions stay aligned.
    pub fn extract(&self, document: &Value) -> IndexMap<String, Value> {
        let mut values = IndexMap::new();
        for field in self.catalog {
            let segments = paths::segments(&field.path);
            if let Some(value) = collect(document, &segments) {
                values.insert(field.path.clone(), value);
            }
        }
        values
    }
}

/// Walk one catalog path through the document
fn collect(value: &Value, segments: &[PathSegment]) -> Option<Value> {
    let Some((first, rest)) = segments.split_first() else {
        return Some(value.clone());
    };
    match first {
        PathSegment::Field(name) => {
            let member = value.as_object()?.get(name)?;
            if member.is_null() {
                return None;
            }
            collect(member, rest)
        }
        PathSegment::AnyIndex => {
            let items = value.as_array()?;
            let collected = items
                .iter()
                .map(|item| collect(item, rest).unwrap_or(Value::Null))
                .collect();
            Some(Value::Array(collected))
        }
        PathSegment::Index(i) => collect(value.as_array()?.get(*i)?, rest),
    }
}
