//! Error types for the mailer domain.

use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

/// Result type for mailer operations.
pub type MailerResult<T> = Result<T, MailerError>;

/// Every way a send or listing request can fail.
#[derive(Debug, Error)]
pub enum MailerError {
    /// The sender could not be built at startup. Fatal to sending, not to the process.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed client input.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No template registered under this name.
    #[error("Email template \"{0}\" not found")]
    TemplateNotFound(String),

    /// The template exists but has no renderable body.
    #[error("Email template \"{name}\" is not usable: {reason}")]
    InvalidTemplate { name: String, reason: String },

    /// The template exists but its source could not be read or compiled.
    #[error("Failed to load email template \"{name}\": {reason}")]
    TemplateLoad { name: String, reason: String },

    /// The template loaded but rendering failed.
    #[error("Failed to render email template \"{name}\": {reason}")]
    Render { name: String, reason: String },

    /// The provider answered but declined the message.
    #[error("{message}")]
    Rejected {
        message: String,
        detail: Option<String>,
    },

    /// The transport raised an exception outside the normal outcome path.
    #[error("Email provider error: {0}")]
    Provider(String),

    /// The templates directory could not be read.
    #[error("Failed to read templates directory: {0}")]
    TemplateListing(String),

    /// Anything else.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl From<serde_json::Error> for MailerError {
    fn from(err: serde_json::Error) -> Self {
        MailerError::Unexpected(format!("JSON serialization error: {}", err))
    }
}

impl From<reqwest::Error> for MailerError {
    fn from(err: reqwest::Error) -> Self {
        MailerError::Provider(err.to_string())
    }
}

/// Convert MailerError to AppError for the standard `{error, detail?}` body.
impl From<MailerError> for AppError {
    fn from(err: MailerError) -> Self {
        match err {
            MailerError::Configuration(reason) => {
                AppError::internal_with_detail("Email service is not configured.", reason)
            }
            MailerError::BadRequest(msg) => AppError::BadRequest(msg),
            err @ MailerError::TemplateNotFound(_) => AppError::NotFound(err.to_string()),
            MailerError::InvalidTemplate { name, reason } => AppError::BadRequest(format!(
                "No default email template exported from \"{}\": {}",
                name, reason
            )),
            MailerError::TemplateLoad { reason, .. } => {
                AppError::internal_with_detail("Failed to load email template", reason)
            }
            MailerError::Render { reason, .. } => {
                AppError::internal_with_detail("Failed to render email template", reason)
            }
            MailerError::Rejected { message, detail } => {
                AppError::InternalServerError { message, detail }
            }
            MailerError::Provider(reason) => {
                AppError::internal_with_detail("Failed to send email", reason)
            }
            MailerError::TemplateListing(reason) => {
                tracing::error!(error = %reason, "Error reading templates directory");
                AppError::internal("Failed to retrieve templates")
            }
            MailerError::Unexpected(reason) => {
                tracing::error!(error = %reason, "Unexpected error while processing email");
                AppError::internal("Failed to send email")
            }
        }
    }
}

impl IntoResponse for MailerError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn status_of(err: MailerError) -> StatusCode {
        AppError::from(err).status()
    }

    #[test]
    fn test_template_errors_map_to_distinct_statuses() {
        assert_eq!(
            status_of(MailerError::TemplateNotFound("Missing".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(MailerError::InvalidTemplate {
                name: "Empty".into(),
                reason: "no body".into()
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(MailerError::TemplateLoad {
                name: "Broken".into(),
                reason: "unclosed block".into()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_configuration_error_message() {
        let app_error = AppError::from(MailerError::Configuration("EMAIL_FROM is not set".into()));
        match app_error {
            AppError::InternalServerError { message, detail } => {
                assert_eq!(message, "Email service is not configured.");
                assert_eq!(detail.as_deref(), Some("EMAIL_FROM is not set"));
            }
            other => panic!("unexpected mapping: {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_error_is_reported_generically() {
        let app_error = AppError::from(MailerError::Unexpected("secret internals".into()));
        match app_error {
            AppError::InternalServerError { message, detail } => {
                assert_eq!(message, "Failed to send email");
                assert!(detail.is_none());
            }
            other => panic!("unexpected mapping: {:?}", other),
        }
    }

    #[test]
    fn test_rejection_keeps_provider_message_and_detail() {
        let app_error = AppError::from(MailerError::Rejected {
            message: "Invalid `to` field".into(),
            detail: Some("validation_error".into()),
        });
        match app_error {
            AppError::InternalServerError { message, detail } => {
                assert_eq!(message, "Invalid `to` field");
                assert_eq!(detail.as_deref(), Some("validation_error"));
            }
            other => panic!("unexpected mapping: {:?}", other),
        }
    }

    #[test]
    fn test_not_found_message_names_template() {
        let err = MailerError::TemplateNotFound("WelcomeEmail".into());
        assert_eq!(err.to_string(), "Email template \"WelcomeEmail\" not found");
    }
}
