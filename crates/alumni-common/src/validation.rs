//! Input validation utilities.
//!
//! Centralized validation helpers used across API routes.

use validator::Validate;

use crate::error::AlumniError;

/// Validate a request body, returning an AlumniError::Validation on failure.
pub fn validate_request<T: Validate>(body: &T) -> Result<(), AlumniError> {
    body.validate().map_err(|e| AlumniError::Validation {
        message: format_validation_errors(e),
    })
}

/// Format validation errors into a human-readable string.
fn format_validation_errors(errors: validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for '{field}'"))
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Trim `text` and check it is non-empty and at most `max` characters.
pub fn require_text(field: &str, text: &str, max: usize) -> Result<String, AlumniError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AlumniError::validation(format!(
            "{field} cannot be empty or whitespace only"
        )));
    }
    if trimmed.chars().count() > max {
        return Err(AlumniError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}
