use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::validation::FieldErrors;

/// The only text an applicant sees for a rejected CAPTCHA; the reason is logged.
pub const GATING_REJECTED_MESSAGE: &str =
    "There was a problem with your submission, please try again.";

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Local, field-scoped validation failure. Never reaches the network.
    Validation(FieldErrors),
    /// The bot-gating provider could not produce a token.
    GatingUnavailable(String),
    /// The CAPTCHA service rejected the token or its score.
    GatingRejected(String),
    /// The credit backend answered with a non-zero error code or a non-2xx status.
    BackendError(String),
    /// Network or response-parsing failure talking to a collaborator.
    TransportError(String),
    /// A named page or template does not exist.
    TemplateMissing(String),
    /// The email batch (or part of it) was not accepted.
    DispatchError(String),
    /// Bad request error (malformed body, invalid input).
    BadRequest(String),
    /// Resource not found error.
    NotFound(String),
    /// Internal server error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// The innermost error, skipping any context wrappers.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Message that is safe to show to the applicant.
    ///
    /// Backend and gating messages are passed through; internal details are not.
    pub fn user_message(&self) -> Option<String> {
        match self.root() {
            AppError::Validation(errors) => errors.values().next().cloned(),
            AppError::GatingRejected(_) => Some(GATING_REJECTED_MESSAGE.to_string()),
            AppError::GatingUnavailable(msg)
            | AppError::BackendError(msg)
            | AppError::BadRequest(msg) => Some(msg.clone()),
            AppError::TemplateMissing(_) | AppError::NotFound(_) => None,
            AppError::TransportError(_)
            | AppError::DispatchError(_)
            | AppError::InternalError(_) => None,
            AppError::WithContext { .. } => None,
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(errors) => {
                let fields: Vec<&str> = errors.keys().map(|k| k.as_str()).collect();
                write!(f, "Validation failed: {}", fields.join(", "))
            }
            AppError::GatingUnavailable(msg) => write!(f, "Gating unavailable: {}", msg),
            AppError::GatingRejected(msg) => write!(f, "Gating rejected: {}", msg),
            AppError::BackendError(msg) => write!(f, "Backend error: {}", msg),
            AppError::TransportError(msg) => write!(f, "Transport error: {}", msg),
            AppError::TemplateMissing(name) => write!(f, "Template missing: {}", name),
            AppError::DispatchError(msg) => write!(f, "Dispatch error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Every failure is rendered as `{"success": false, "message": ...}` so the
    /// widget can surface one message and return to an editable form.
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(errors) => {
                tracing::warn!("Rejected submission with invalid fields: {}", self);
                let message = errors
                    .values()
                    .next()
                    .cloned()
                    .unwrap_or_else(|| "Invalid submission".to_string());
                (StatusCode::BAD_REQUEST, message)
            }
            AppError::GatingUnavailable(msg) => {
                tracing::warn!("Gating unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            AppError::GatingRejected(msg) => {
                tracing::warn!("Gating rejected: {}", msg);
                (StatusCode::FORBIDDEN, GATING_REJECTED_MESSAGE.to_string())
            }
            AppError::BackendError(msg) => {
                tracing::error!("Backend error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::TransportError(msg) => {
                tracing::error!("Transport error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "External service error".to_string(),
                )
            }
            AppError::TemplateMissing(name) => {
                (StatusCode::NOT_FOUND, format!("Page '{}' not found", name))
            }
            AppError::DispatchError(msg) => {
                tracing::error!("Email dispatch error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "Failed to send notification emails".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::WithContext { source, context } => {
                // Log full context chain for debugging
                tracing::error!("Error with context: {} -> {}", context, source);
                // Delegate to underlying error's response
                return source.as_ref().clone().into_response();
            }
        };

        let body = Json(json!({
            "success": false,
            "message": message,
        }));

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    /// Converts a `reqwest::Error` into an `AppError`.
    fn from(err: reqwest::Error) -> Self {
        AppError::TransportError(err.to_string())
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}
