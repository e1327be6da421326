//! Validation errors and outcomes
//!
//! Validation never stops at the first problem: every violation in a
//! document is collected, each located by a path with literal array
//! indices. Error kinds are part of the stable output format.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Validation error kinds (stable identifiers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Value's type does not match the declared field type
    TypeMismatch,

    /// Required field is missing or null
    Required,

    /// Numeric value outside the declared min/max bounds
    OutOfRange,

    /// String length outside the declared length bounds
    LengthViolation,

    /// String does not match the declared pattern
    PatternViolation,

    /// Value is not a member of the declared enum
    NotInEnum,

    /// Field present in the document but not declared in the schema
    UnknownField,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TypeMismatch => "TYPE_MISMATCH",
            ErrorKind::Required => "REQUIRED",
            ErrorKind::OutOfRange => "OUT_OF_RANGE",
            ErrorKind::LengthViolation => "LENGTH_VIOLATION",
            ErrorKind::PatternViolation => "PATTERN_VIOLATION",
            ErrorKind::NotInEnum => "NOT_IN_ENUM",
            ErrorKind::UnknownField => "UNKNOWN_FIELD",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single path-located validation error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Error kind
    pub kind: ErrorKind,

    /// Location in the document, with literal array indices
    pub path: String,

    /// Human-readable message
    pub message: String,

    /// What the schema expected, when a comparison applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,

    /// What the document contained
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(kind: ErrorKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    /// Attach expected/actual details
    pub fn with_comparison(
        mut self,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.path, self.message)
    }
}

/// Result of validating one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ValidationOutcome {
    /// Document matches the schema; carries the normalized value
    Valid { value: Value },

    /// One or more violations, in depth-first declaration order
    Invalid { errors: Vec<ValidationError> },
}

impl ValidationOutcome {
    pub fn valid(value: Value) -> Self {
        ValidationOutcome::Valid { value }
    }

    pub fn invalid(errors: Vec<ValidationError>) -> Self {
        ValidationOutcome::Invalid { errors }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid { .. })
    }

    /// The accumulated errors; empty for a valid outcome
    pub fn errors(&self) -> &[ValidationError] {
        match self {
            ValidationOutcome::Valid { .. } => &[],
            ValidationOutcome::Invalid { errors } => errors,
        }
    }

    pub fn error_count(&self) -> usize {
        self.errors().len()
    }
}

/// Verdict for one edited path from partial validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FieldValidation {
    /// The edited value passes every check that applies to it
    Valid,

    /// Violations attributable to the edited value
    Invalid { errors: Vec<ValidationError> },
}

impl FieldValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, FieldValidation::Valid)
    }

    pub fn errors(&self) -> &[ValidationError] {
        match self {
            FieldValidation::Valid => &[],
            FieldValidation::Invalid { errors } => errors,
        }
    }
}
