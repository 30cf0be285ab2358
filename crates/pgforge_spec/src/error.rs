//! Error types for request reading and validation.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::RequestField;

/// Result type alias for spec operations.
pub type SpecResult<T> = Result<T, SpecError>;

/// Errors that can occur while reading or validating a generation request.
#[derive(Error, Debug)]
pub enum SpecError {
    #[error("Request validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Invalid validation limits: {0}")]
    InvalidLimits(String),

    #[error("Unsupported request file format: {0}")]
    UnsupportedRequestFormat(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SpecError {
    /// Field errors carried by a validation failure, if any.
    pub fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            SpecError::Validation(errors) => Some(errors.as_slice()),
            _ => None,
        }
    }
}

/// Why a single field was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationReason {
    #[error("field is required")]
    Missing,

    /// The payload carried a value of the wrong JSON type.
    #[error("{0}")]
    InvalidType(String),

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    #[error("value {value} is out of range (expected {min}..={max})")]
    OutOfRange { value: i64, min: i64, max: i64 },
}

impl ValidationReason {
    /// Stable machine-readable kind, used in structured error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationReason::Missing => "missing",
            ValidationReason::InvalidType(_) => "invalid_type",
            ValidationReason::InvalidFormat(_) => "invalid_format",
            ValidationReason::UnsupportedValue(_) => "unsupported_value",
            ValidationReason::OutOfRange { .. } => "out_of_range",
        }
    }
}

/// A rejected field together with the reason.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {reason}")]
pub struct FieldError {
    pub field: RequestField,
    pub reason: ValidationReason,
}

impl FieldError {
    pub fn new(field: RequestField, reason: ValidationReason) -> Self {
        Self { field, reason }
    }
}

/// All field errors found in one request, one per offending field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn as_slice(&self) -> &[FieldError] {
        &self.errors
    }

    /// Look up the error reported for a field.
    pub fn get(&self, field: RequestField) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field == field)
    }

    pub fn contains(&self, field: RequestField) -> bool {
        self.get(field).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.errors.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}
