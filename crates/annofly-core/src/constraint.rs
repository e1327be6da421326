//! Field constraints
//!
//! A constraint set is an open bag of optional limits; absence means
//! unconstrained. Template authors write these as plain keys next to the
//! field declaration, and the resolver keeps only the ones that apply to
//! the field's scalar kind.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Rendering hint for annotation front ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiHint {
    Text,
    Textarea,
    Number,
    Slider,
    Select,
    Checkbox,
}

impl UiHint {
    /// Parse a hint name as written in template files
    pub fn parse(name: &str) -> Option<UiHint> {
        match name {
            "text" => Some(UiHint::Text),
            "textarea" => Some(UiHint::Textarea),
            "number" => Some(UiHint::Number),
            "slider" => Some(UiHint::Slider),
            "select" => Some(UiHint::Select),
            "checkbox" => Some(UiHint::Checkbox),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UiHint::Text => "text",
            UiHint::Textarea => "textarea",
            UiHint::Number => "number",
            UiHint::Slider => "slider",
            UiHint::Select => "select",
            UiHint::Checkbox => "checkbox",
        }
    }
}

impl fmt::Display for UiHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Limits applied to a field's values
///
/// Length and pattern constraints apply to string fields, min/max to
/// numeric fields, enum membership to any scalar. For array-of-scalar
/// fields each element is checked individually.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSet {
    /// Minimum string length, in characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    /// Maximum string length, in characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    /// Regular expression the whole string must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Inclusive numeric lower bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    /// Inclusive numeric upper bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    /// Closed set of accepted values
    #[serde(
        default,
        rename = "enum",
        skip_serializing_if = "Option::is_none"
    )]
    pub enum_values: Option<Vec<Value>>,

    /// Rendering hint for annotation front ends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<UiHint>,
}

impl ConstraintSet {
    /// An empty constraint set
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_enum_values(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }

    pub fn with_ui(mut self, ui: UiHint) -> Self {
        self.ui = Some(ui);
        self
    }

    /// Whether no constraint is set
    pub fn is_empty(&self) -> bool {
        self.min_length.is_none()
            && self.max_length.is_none()
            && self.pattern.is_none()
            && self.min.is_none()
            && self.max.is_none()
            && self.enum_values.is_none()
            && self.ui.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_and_is_empty() {
        assert!(ConstraintSet::new().is_empty());

        let constraints = ConstraintSet::new()
            .with_min_length(5)
            .with_max_length(200)
            .with_pattern("^[a-z]+$")
            .with_ui(UiHint::Textarea);
        assert!(!constraints.is_empty());
        assert_eq!(constraints.min_length, Some(5));
        assert_eq!(constraints.max_length, Some(200));
        assert_eq!(constraints.pattern.as_deref(), Some("^[a-z]+$"));
        assert_eq!(constraints.ui, Some(UiHint::Textarea));
    }

    #[test]
    fn test_ui_hint_parsing() {
        assert_eq!(UiHint::parse("slider"), Some(UiHint::Slider));
        assert_eq!(UiHint::parse("dropdown"), None);
        assert_eq!(UiHint::Slider.as_str(), "slider");
    }

    #[test]
    fn test_serialization_omits_unset_limits() {
        let constraints = ConstraintSet::new()
            .with_min(0.0)
            .with_max(10.0)
            .with_enum_values(vec![json!(1), json!(2)]);
        let text = serde_json::to_string(&constraints).unwrap();
        assert!(text.contains("\"min\""));
        assert!(text.contains("\"enum\""));
        assert!(!text.contains("min_length"));
        assert!(!text.contains("pattern"));

        let back: ConstraintSet = serde_json::from_str(&text).unwrap();
        assert_eq!(back, constraints);
    }
}
