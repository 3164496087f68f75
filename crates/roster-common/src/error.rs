//! Error types shared across the roster workspace

use thiserror::Error;

/// Result type alias for validation checks
pub type ValidationResult<T = ()> = std::result::Result<T, ValidationError>;

/// A record or query failed validation before reaching storage.
///
/// Validation failures are surfaced to the caller as-is and never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required and cannot be empty")]
    Required { field: String },

    #[error("{field} must be at most {max_length} characters")]
    TooLong { field: String, max_length: usize },

    #[error("{field} is not a valid email address: '{value}'")]
    InvalidEmail { field: String, value: String },

    #[error("Unknown field '{field}' for {kind}")]
    UnknownField { kind: String, field: String },

    #[error("{field} expects a {expected} value")]
    TypeMismatch { field: String, expected: String },

    #[error("id must not be set when creating a {kind}")]
    UnexpectedId { kind: String },

    #[error("Expected a {expected} record, got {actual}")]
    KindMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Create a required-field error
    pub fn required(field: impl Into<String>) -> Self {
        Self::Required {
            field: field.into(),
        }
    }

    /// Create an unknown-field error
    pub fn unknown_field(kind: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            kind: kind.into(),
            field: field.into(),
        }
    }

    /// Create a type-mismatch error
    pub fn type_mismatch(field: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            expected: expected.into(),
        }
    }

    /// Name of the offending field, when the error concerns a single field
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Required { field }
            | Self::TooLong { field, .. }
            | Self::InvalidEmail { field, .. }
            | Self::UnknownField { field, .. }
            | Self::TypeMismatch { field, .. } => Some(field),
            Self::UnexpectedId { .. } | Self::KindMismatch { .. } => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ValidationError::required("firstName").to_string(),
            "firstName is required and cannot be empty"
        );
        assert_eq!(
            ValidationError::unknown_field("student", "age").to_string(),
            "Unknown field 'age' for student"
        );
    }

    #[test]
    fn test_field_accessor() {
        assert_eq!(ValidationError::required("email").field(), Some("email"));
        assert_eq!(
            ValidationError::UnexpectedId {
                kind: "employee".to_string()
            }
            .field(),
            None
        );
    }
}
