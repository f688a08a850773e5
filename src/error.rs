//! Error types for CircDesk

use thiserror::Error;

/// Main application error type.
///
/// Every variant is recoverable at the desk layer: operations surface their
/// failure as a notice on the operator's screen and leave local state
/// unchanged so the action can be retried.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or rejected session token; the operator must provide a fresh one.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A local guard failed; no request was sent.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The backend answered with a non-success status.
    #[error("Request failed{}: {message}", status_suffix(.status))]
    RequestFailed {
        status: Option<u16>,
        /// Backend-provided message when the response body carried one.
        message: String,
    },

    /// Connection-level failure before any backend answer.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered but the payload could not be interpreted.
    #[error("Unusable payload: {0}")]
    Payload(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" ({})", code),
        None => String::new(),
    }
}

impl AppError {
    /// Whether the operator should be sent back to the login step.
    pub fn requires_login(&self) -> bool {
        matches!(self, AppError::Authentication(_))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut parts: Vec<String> = Vec::new();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                match &error.message {
                    Some(message) => parts.push(format!("{}: {}", field, message)),
                    None => parts.push(format!("{}: invalid", field)),
                }
            }
        }
        parts.sort();
        AppError::Validation(parts.join("; "))
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_failed_includes_status() {
        let err = AppError::RequestFailed {
            status: Some(502),
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "Request failed (502): bad gateway");
    }

    #[test]
    fn request_failed_without_status() {
        let err = AppError::RequestFailed {
            status: None,
            message: "no response".to_string(),
        };
        assert_eq!(err.to_string(), "Request failed: no response");
    }

    #[test]
    fn only_authentication_requires_login() {
        assert!(AppError::Authentication("expired".into()).requires_login());
        assert!(!AppError::NotFound("gone".into()).requires_login());
        assert!(!AppError::Validation("bad".into()).requires_login());
    }
}
