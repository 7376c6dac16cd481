//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`; the body is always `{"error": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, CatalogError, CustomerError, PurchaseError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication or authorization failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Purchase workflow failed.
    #[error("Purchase error: {0}")]
    Purchase(#[from] PurchaseError),

    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Customer administration failed.
    #[error("Customer error: {0}")]
    Customer(#[from] CustomerError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(_)
                | AuthError::Validation(_)
                | AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials
                | AuthError::InvalidToken(_)
                | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
                AuthError::AccountDisabled | AuthError::Forbidden => StatusCode::FORBIDDEN,
                AuthError::DuplicateEmail => StatusCode::CONFLICT,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Purchase(err) => match err {
                PurchaseError::Unauthenticated => StatusCode::UNAUTHORIZED,
                PurchaseError::AccountDisabled => StatusCode::FORBIDDEN,
                PurchaseError::MovieNotFound | PurchaseError::ResourceNotFound => {
                    StatusCode::NOT_FOUND
                }
                PurchaseError::InvalidQuantity => StatusCode::BAD_REQUEST,
                PurchaseError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Catalog(err) => match err {
                CatalogError::NotFound => StatusCode::NOT_FOUND,
                CatalogError::Invalid(_) | CatalogError::InvalidUpload(_) => {
                    StatusCode::BAD_REQUEST
                }
                CatalogError::Storage(e) if e.is_remote() => StatusCode::BAD_GATEWAY,
                CatalogError::Storage(_) | CatalogError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Customer(err) => match err {
                CustomerError::NotFound => StatusCode::NOT_FOUND,
                CustomerError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Message safe to show the client.
    fn public_message(&self) -> String {
        match self.status() {
            StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_string(),
            StatusCode::BAD_GATEWAY => "Storage service error".to_string(),
            _ => match self {
                Self::Auth(AuthError::InvalidToken(_)) => "Invalid or expired token".to_string(),
                Self::Auth(err) => err.to_string(),
                Self::Purchase(err) => err.to_string(),
                Self::Catalog(err) => err.to_string(),
                Self::Customer(err) => err.to_string(),
                Self::BadRequest(msg) => msg.clone(),
                Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Associate subsequent Sentry events with a customer.
pub fn set_sentry_user(customer_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(customer_id.to_string()),
            ..Default::default()
        }));
    });
}
