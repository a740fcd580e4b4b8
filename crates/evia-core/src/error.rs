//! Error types module
//!
//! This module provides the core error types used throughout Evia.
//! All errors are unified under the `AppError` enum which covers validation,
//! authentication, ownership, persistence and upstream (AI / storage) failures.
//! Each variant describes its own HTTP presentation through [`ErrorMetadata`].

use serde::Serialize;
use sqlx::Error as SqlxError;
use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "DATABASE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from the caller
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// One failed field in a validated request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub tag: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("AI service error: {0}")]
    Ai(String),

    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut errors: Vec<FieldError> = err
            .field_errors()
            .into_iter()
            .flat_map(|(field, failures)| {
                let field = field.to_string();
                failures.iter().map(move |failure| FieldError {
                    field: field.clone(),
                    tag: failure.code.to_string(),
                    message: field_message(&field, failure),
                })
            })
            .collect();
        errors.sort_by(|a, b| a.field.cmp(&b.field));

        AppError::Validation {
            message: "Validation failed".to_string(),
            errors,
        }
    }
}

/// Human-readable message for one failed validation rule.
fn field_message(field: &str, failure: &validator::ValidationError) -> String {
    if let Some(message) = &failure.message {
        return message.to_string();
    }

    let param = |name: &str| {
        failure
            .params
            .get(name)
            .map(|v| v.to_string())
            .unwrap_or_default()
    };

    match &*failure.code {
        "required" => format!("The {} field is required", field),
        "email" => "This is not a valid email".to_string(),
        "eqfield" | "must_match" => {
            if field == "password_confirmation" {
                "The password confirmation does not match".to_string()
            } else {
                "The field does not match".to_string()
            }
        }
        "length" => {
            let actual = failure
                .params
                .get("value")
                .and_then(|v| v.as_str())
                .map(|v| v.chars().count() as u64);
            let min = failure.params.get("min").and_then(|v| v.as_u64());
            match (actual, min) {
                (Some(len), Some(min)) if len < min => format!(
                    "The {} field must be at least {} characters",
                    field,
                    param("min")
                ),
                _ => format!(
                    "The {} field must be at most {} characters",
                    field,
                    param("max")
                ),
            }
        }
        _ => format!("The {} field is invalid", field),
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, sensitive, log_level).
/// client_message stays per-variant for dynamic content.
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, bool, LogLevel) {
    match err {
        AppError::Database(_) => (500, "DATABASE_ERROR", true, true, LogLevel::Error),
        AppError::Storage(_) => (500, "STORAGE_ERROR", true, true, LogLevel::Error),
        AppError::Ai(_) => (500, "AI_SERVICE_ERROR", true, true, LogLevel::Error),
        AppError::Validation { .. } => (400, "VALIDATION_ERROR", false, false, LogLevel::Debug),
        AppError::InvalidInput(_) => (400, "INVALID_INPUT", false, false, LogLevel::Debug),
        AppError::BadRequest(_) => (400, "BAD_REQUEST", false, false, LogLevel::Debug),
        AppError::NotFound(_) => (404, "NOT_FOUND", false, false, LogLevel::Debug),
        AppError::Forbidden(_) => (403, "FORBIDDEN", false, false, LogLevel::Warn),
        AppError::Conflict(_) => (409, "CONFLICT", false, false, LogLevel::Debug),
        AppError::PayloadTooLarge(_) => (413, "PAYLOAD_TOO_LARGE", false, false, LogLevel::Debug),
        AppError::Unauthorized(_) => (401, "UNAUTHORIZED", false, false, LogLevel::Debug),
        AppError::Internal(_) => (500, "INTERNAL_ERROR", true, true, LogLevel::Error),
        AppError::InternalWithSource { .. } => (500, "INTERNAL_ERROR", true, true, LogLevel::Error),
    }
}

impl AppError {
    /// Field-level failures, present only for validation errors.
    pub fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            AppError::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_)
            | AppError::Storage(_)
            | AppError::Ai(_)
            | AppError::Internal(_)
            | AppError::InternalWithSource { .. } => "Internal Server Error".to_string(),
            AppError::Validation { ref message, .. } => message.clone(),
            AppError::InvalidInput(ref msg)
            | AppError::BadRequest(ref msg)
            | AppError::NotFound(ref msg)
            | AppError::Forbidden(ref msg)
            | AppError::Conflict(ref msg)
            | AppError::PayloadTooLarge(ref msg)
            | AppError::Unauthorized(ref msg) => msg.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Signup {
        #[validate(email)]
        email: String,
        #[validate(length(min = 8, max = 255))]
        password: String,
        #[validate(must_match(other = "password"))]
        password_confirmation: String,
        #[validate(length(min = 1, code = "required"))]
        nickname: String,
    }

    #[test]
    fn test_error_metadata_database() {
        let err = AppError::from(sqlx::Error::PoolClosed);
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Internal Server Error");
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_forbidden() {
        let err = AppError::Forbidden("You are not authorized to access this complaint".into());
        assert_eq!(err.http_status_code(), 403);
        assert_eq!(err.error_code(), "FORBIDDEN");
        assert!(!err.is_sensitive());
        assert_eq!(
            err.client_message(),
            "You are not authorized to access this complaint"
        );
    }

    #[test]
    fn test_upstream_failures_hide_details() {
        let err = AppError::Storage("bucket evia-images: AccessDenied".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert!(err.is_sensitive());
        assert!(!err.client_message().contains("AccessDenied"));
    }

    #[test]
    fn test_conflict_is_409() {
        let err = AppError::Conflict("Invalid Credentials".to_string());
        assert_eq!(err.http_status_code(), 409);
        assert_eq!(err.client_message(), "Invalid Credentials");
    }

    #[test]
    fn test_validation_errors_are_mapped_per_field() {
        let signup = Signup {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            password_confirmation: "different".to_string(),
            nickname: String::new(),
        };

        let err = AppError::from(signup.validate().unwrap_err());
        assert_eq!(err.http_status_code(), 400);
        let errors = err.field_errors().unwrap();

        let message_for = |field: &str| {
            errors
                .iter()
                .find(|e| e.field == field)
                .map(|e| e.message.clone())
                .unwrap()
        };

        assert_eq!(message_for("email"), "This is not a valid email");
        assert_eq!(
            message_for("password"),
            "The password field must be at least 8 characters"
        );
        assert_eq!(
            message_for("password_confirmation"),
            "The password confirmation does not match"
        );
        assert_eq!(message_for("nickname"), "The nickname field is required");
    }
}
