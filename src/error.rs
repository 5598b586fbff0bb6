//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::DomainError;
use crate::payment::PaymentError;
use crate::storage::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Wallet not found for user {0}")]
    WalletNotFound(Uuid),

    #[error("Course not found: {0}")]
    CourseNotFound(Uuid),

    #[error("Review not found: {0}")]
    ReviewNotFound(Uuid),

    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("Already enrolled in this course")]
    AlreadyEnrolled,

    #[error("Course already reviewed")]
    AlreadyReviewed,

    #[error("Not enrolled in this course")]
    NotEnrolled,

    #[error("Resource belongs to another user")]
    NotYourResource,

    #[error("Invalid payment callback: {0}")]
    InvalidCallback(String),

    #[error("Missing required header: {0}")]
    MissingHeader(String),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Server errors (5xx)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::WalletNotFound(id) => AppError::WalletNotFound(id),
            StoreError::CourseNotFound(id) => AppError::CourseNotFound(id),
            StoreError::ReviewNotFound(id) => AppError::ReviewNotFound(id),
            StoreError::UserNotFound(id) => AppError::UserNotFound(id),
            StoreError::AlreadyEnrolled => AppError::AlreadyEnrolled,
            StoreError::AlreadyReviewed => AppError::AlreadyReviewed,
            StoreError::Domain(e) => AppError::Domain(e),
            StoreError::Database(e) => AppError::Database(e),
            StoreError::Unavailable(msg) => AppError::Internal(msg),
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::InvalidCallback(msg) => AppError::InvalidCallback(msg),
            PaymentError::Store(e) => e.into(),
        }
    }
}

impl From<crate::domain::AmountError> for AppError {
    fn from(err: crate::domain::AmountError) -> Self {
        AppError::Domain(err.into())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    /// Status and stable machine-readable code
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            AppError::WalletNotFound(_) => (StatusCode::NOT_FOUND, "wallet_not_found"),
            AppError::CourseNotFound(_) => (StatusCode::NOT_FOUND, "course_not_found"),
            AppError::ReviewNotFound(_) => (StatusCode::NOT_FOUND, "review_not_found"),
            AppError::UserNotFound(_) => (StatusCode::NOT_FOUND, "user_not_found"),
            AppError::AlreadyEnrolled => (StatusCode::CONFLICT, "already_enrolled"),
            AppError::AlreadyReviewed => (StatusCode::CONFLICT, "already_reviewed"),
            AppError::NotEnrolled => (StatusCode::BAD_REQUEST, "not_enrolled"),
            AppError::NotYourResource => (StatusCode::FORBIDDEN, "not_your_resource"),
            AppError::InvalidCallback(_) => (StatusCode::BAD_REQUEST, "invalid_callback"),
            AppError::MissingHeader(_) => (StatusCode::BAD_REQUEST, "missing_header"),

            AppError::Domain(domain_err) => match domain_err {
                DomainError::InsufficientFunds { .. } => {
                    (StatusCode::BAD_REQUEST, "insufficient_funds")
                }
                DomainError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "invalid_amount"),
                DomainError::InvalidScore(_)
                | DomainError::SelfTransfer
                | DomainError::OwnCourse => (StatusCode::BAD_REQUEST, "invalid_request"),
                DomainError::EmptyAggregate | DomainError::InconsistentAggregate { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
                }
            },

            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            AppError::InvalidRequest(msg)
            | AppError::InvalidCallback(msg)
            | AppError::MissingHeader(msg) => Some(msg.clone()),
            AppError::WalletNotFound(id)
            | AppError::CourseNotFound(id)
            | AppError::ReviewNotFound(id)
            | AppError::UserNotFound(id) => Some(id.to_string()),
            AppError::Domain(e) if e.is_client_error() => Some(e.to_string()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        // 500 Internal Server Error
        match &self {
            AppError::Database(e) => tracing::error!("Database error: {:?}", e),
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
            AppError::Config(e) => tracing::error!("Config error: {:?}", e),
            AppError::Domain(e) if !e.is_client_error() => {
                tracing::error!("Domain invariant violated: {}", e)
            }
            _ => {}
        }

        let details = self.details();
        let error = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
