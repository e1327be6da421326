//! Template parsing and resolution
//!
//! This crate turns authored template JSON into resolved schemas:
//! - Template file parsing with open per-field attribute bags
//! - Type expression parsing (`"string"`, `"Section[]"`, `"int?"`)
//! - Root selection, reference checking, and constraint extraction

pub mod error;
pub mod resolver;
pub mod template;
pub mod typeexpr;

pub use error::LoadError;
pub use resolver::TemplateResolver;
pub use template::{FieldDecl, TemplateFile, TypeDecl};
pub use typeexpr::parse_type_expr;
