//! Validation Utilities

use validator::{Validate, ValidationErrors};

use super::error::AppError;

/// Convert validation errors to AppError
///
/// Only the first failing field is reported; the message falls back to the
/// validator code when no custom message was declared.
pub fn validation_error(errors: ValidationErrors) -> AppError {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    let message = fields
        .into_iter()
        .find_map(|(field, errs)| {
            errs.first().map(|e| {
                let detail = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{}: {}", field, detail)
            })
        })
        .unwrap_or_else(|| "Validation failed".into());

    AppError::Validation(message)
}

/// Validate a request DTO, mapping failures to [`AppError::Validation`].
pub fn validate<T: Validate>(value: &T) -> Result<(), AppError> {
    value.validate().map_err(validation_error)
}

/// Parse a path or query identifier, reporting the field name on failure.
pub fn parse_id(raw: &str, field: &str) -> Result<i64, AppError> {
    super::snowflake::from_string(raw).map_err(|_| AppError::invalid_format(field))
}
