// src/error.rs
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    SqlxMigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to process password")]
    PasswordHashingError,

    #[error("Failed to sign token: {0}")]
    TokenSigningError(String),

    // --- Client errors ---
    #[error("{0}")]
    Validation(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Access token required")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    // The token was valid but its user has since been deleted
    #[error("User not found")]
    StaleToken,

    /// Covers both "does not exist" and "not yours".
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Unexpected internal error")]
    InternalServerError,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::MissingToken => StatusCode::UNAUTHORIZED,
            AppError::InvalidToken | AppError::StaleToken => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SqlxError(_)
            | AppError::SqlxMigrateError(_)
            | AppError::IoError(_)
            | AppError::Config(_)
            | AppError::PasswordHashingError
            | AppError::TokenSigningError(_)
            | AppError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client. Internal details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            AppError::SqlxError(_) | AppError::SqlxMigrateError(_) => "Database error".to_string(),
            AppError::IoError(_) => "File storage error".to_string(),
            AppError::Config(_) | AppError::PasswordHashingError | AppError::TokenSigningError(_) => {
                "Server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        // Body limit overruns also land here
        tracing::warn!("Rejected multipart body: {}", err);
        AppError::Validation(format!("Invalid upload: {}", err.body_text()))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!("Rejected JSON body: {}", rejection);
        AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        tracing::warn!("Rejected multipart request: {}", rejection);
        AppError::Validation(format!("Invalid upload: {}", rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {:?}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }

        (status, Json(json!({ "error": self.user_message() }))).into_response()
    }
}

pub type AppResult<T = ()> = Result<T, AppError>;
