//! Validation Utilities

use validator::{Validate, ValidationErrors};

use super::error::RealtimeError;

/// Field-level validation failure
#[derive(Debug)]
struct FieldError {
    field: String,
    message: String,
}

/// Convert validation errors to a protocol validation error
pub fn validation_error(errors: ValidationErrors) -> RealtimeError {
    let mut field_errors: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| FieldError {
                field: field.to_string(),
                message: e
                    .message
                    .clone()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            })
        })
        .collect();

    // HashMap iteration order is not stable
    field_errors.sort_by(|a, b| a.field.cmp(&b.field));

    let message = field_errors
        .first()
        .map(|e| format!("{}: {}", e.field, e.message))
        .unwrap_or_else(|| "Validation failed".into());

    RealtimeError::Validation(message)
}

/// Run `validator` rules on a value, mapping failures to `RealtimeError::Validation`.
pub fn validate<T: Validate>(value: &T) -> Result<(), RealtimeError> {
    value.validate().map_err(validation_error)
}
