use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Application error type, backed by `thiserror` for ergonomic conversions.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail already in use")]
    EmailAlreadyExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    // Token verified, but no active session matches (token, device fingerprint).
    #[error("No active session for this device")]
    SessionRejected,

    #[error("A customer with this e-mail already exists")]
    DuplicateCustomer,

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Invalid or expired reset code")]
    InvalidResetCode,

    #[error("Not found")]
    NotFound,

    #[error("Missing required configuration: {0}")]
    ConfigError(String),

    // Database errors (sqlx)
    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    // Catch-all for anything unexpected; `anyhow::Error` keeps the context.
    #[error("Internal server error")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Return every validation detail, field by field.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "One or more fields are invalid.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::EmailAlreadyExists => {
                (StatusCode::CONFLICT, "This e-mail is already in use.".to_string())
            }
            AppError::DuplicateCustomer => (
                StatusCode::CONFLICT,
                "A customer with this e-mail already exists.".to_string(),
            ),
            // Same message for unknown e-mail and wrong password (no enumeration).
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid e-mail or password.".to_string())
            }
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Authentication token invalid or missing.".to_string(),
            ),
            AppError::TokenExpired => {
                (StatusCode::UNAUTHORIZED, "Authentication token expired.".to_string())
            }
            AppError::SessionRejected => (
                StatusCode::UNAUTHORIZED,
                "No active session for this device. Please log in again.".to_string(),
            ),
            AppError::InvalidDocument(ref msg) | AppError::InvalidUpload(ref msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::InvalidResetCode => {
                (StatusCode::BAD_REQUEST, "Invalid or expired reset code.".to_string())
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, "Resource not found.".to_string()),

            // Everything else (DatabaseError, InternalServerError, ...) becomes a 500.
            // `tracing` logs the detailed message `thiserror` gives us.
            ref e => {
                tracing::error!("Internal server error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred.".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
