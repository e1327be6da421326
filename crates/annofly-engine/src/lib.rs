//! Annofly engine
//!
//! Operations that run against a resolved template schema:
//! - Field catalog building (flattened annotation targets)
//! - Document validation (error-accumulating, path-located)
//! - Annotation extraction (values keyed by flattened path)
//! - Partial validation (per-field feedback on incomplete records)
//! - Batch validation (JSONL and array inputs, per-record outcomes)
//! - Schema registry (cached resolution keyed by source identity)

pub mod annotation_extractor;
pub mod batch_validator;
pub mod catalog_builder;
pub mod document_validator;
pub mod partial_validator;
pub mod registry;

pub use annotation_extractor::AnnotationExtractor;
pub use batch_validator::{BatchValidator, RawRecord};
pub use catalog_builder::CatalogBuilder;
pub use document_validator::DocumentValidator;
pub use partial_validator::PartialValidator;
pub use registry::{LoadedTemplate, SchemaRegistry};
