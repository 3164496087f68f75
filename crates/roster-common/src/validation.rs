//! Field validation utilities
//!
//! Checks applied to entity fields before a record is handed to a store.
//!
//! # Examples
//!
//! ```rust
//! use roster_common::validation::{validate_email, validate_name};
//!
//! validate_name("lastName", "Singh", 45).unwrap();
//! validate_email("email", "code.nikhil20@gmail.com").unwrap();
//! ```

use crate::error::{ValidationError, ValidationResult};

/// Validate a required name-like text field
///
/// # Rules
/// - Must not be empty (after trimming whitespace)
/// - Must not exceed `max_length` characters
pub fn validate_name(field: &str, value: &str, max_length: usize) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max_length {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max_length,
        });
    }

    Ok(())
}

/// Validate an email address
///
/// This is a shape check only: exactly one `@`, a non-empty local part, and a
/// domain containing no whitespace.
pub fn validate_email(field: &str, value: &str) -> ValidationResult {
    if is_valid_email(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

/// Validate an optional email field
pub fn validate_optional_email(field: &str, value: Option<&str>) -> ValidationResult {
    match value {
        Some(email) => validate_email(field, email),
        None => Ok(()),
    }
}

#[inline]
pub fn is_valid_email(value: &str) -> bool {
    let mut parts = value.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !domain.is_empty()
                && !value.chars().any(char::is_whitespace)
        },
        _ => false,
    }
}
