//! Template loading errors
//!
//! A load failure blocks every subsequent operation on that source, so
//! resolution stops at the first problem and reports it alone. This is
//! the opposite of document validation, which accumulates.

use thiserror::Error;

/// Errors that prevent a template source from resolving to a schema
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    /// Malformed source text
    #[error("syntax error at {location}: {message}")]
    Syntax { location: String, message: String },

    /// No type is marked as root and no fallback candidate exists
    #[error("no root type: mark one type with \"root\": true")]
    NoRoot,

    /// More than one type could be the root
    #[error("ambiguous root: candidate types {}", .candidates.join(", "))]
    AmbiguousRoot { candidates: Vec<String> },

    /// Two type declarations share a name
    #[error("duplicate type declaration '{name}'")]
    DuplicateType { name: String },

    /// A field references a type that is not declared
    #[error("unknown type '{name}' referenced at {path}")]
    UnknownType { path: String, name: String },

    /// A declaration the engine cannot represent
    #[error("unsupported declaration at {path}: {reason}")]
    UnsupportedType { path: String, reason: String },

    /// Could not read the template file
    #[error("failed to read template file {path}: {message}")]
    Io { path: String, message: String },
}
