//! Authentication error types.

use thiserror::Error;

use super::token::TokenError;
use crate::db::RepositoryError;

/// Errors that can occur during authentication and authorization.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] marquee_core::EmailError),

    /// A registration field failed validation.
    #[error("{0}")]
    Validation(String),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Unknown email or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Token signature, format or expiry check failed.
    #[error("invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    /// No usable identity is bound to the request.
    #[error("authentication required")]
    Unauthenticated,

    /// The account has been disabled.
    #[error("account is disabled")]
    AccountDisabled,

    /// The identity lacks a required role.
    #[error("insufficient permissions")]
    Forbidden,

    /// Email already registered.
    #[error("email is already registered")]
    DuplicateEmail,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
