//! Annofly core types
//!
//! This crate provides the foundational types shared across the annofly
//! workspace:
//! - Schema model (object types, field types, resolved templates)
//! - Field constraints and UI hints
//! - Flattened path handling
//! - Validation errors and outcomes
//! - Batch reports
//! - Source identity for schema caching
//! - Configuration

pub mod config;
pub mod constraint;
pub mod diagnostic;
pub mod paths;
pub mod report;
pub mod schema;
pub mod source;

pub use config::{BatchConfig, Config, ConfigError, TemplatesConfig};
pub use constraint::{ConstraintSet, UiHint};
pub use diagnostic::{ErrorKind, FieldValidation, ValidationError, ValidationOutcome};
pub use report::{BatchReport, BatchSummary, RecordPosition, RecordResult, ReportVersion};
pub use schema::{
    AnnotationField, FieldSpec, ObjectType, ScalarKind, SchemaType, TemplateSchema,
};
pub use source::SourceId;
