//! Account error types.

use thiserror::Error;

use crate::auth::{PasswordError, TokenError};
use crate::db::RepositoryError;
use crate::error::AppError;

/// Errors that can occur during registration and login.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] shopkeep_core::EmailError),

    /// A required field was empty.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Username or email is taken.
    #[error("username or email already exists")]
    AlreadyExists,

    /// Unknown email or wrong password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Password hashing failed.
    #[error("{0}")]
    Password(#[from] PasswordError),

    /// Token signing failed.
    #[error("{0}")]
    Token(#[from] TokenError),

    /// The blocking hash task panicked or was cancelled.
    #[error("hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for AccountError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(_) => Self::AlreadyExists,
            other => Self::Repository(other),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InvalidEmail(_) | AccountError::MissingField(_) => {
                Self::Validation(err.to_string())
            }
            AccountError::AlreadyExists => Self::Conflict(err.to_string()),
            AccountError::InvalidCredentials => Self::Unauthenticated(err.to_string()),
            AccountError::Repository(e) => e.into(),
            AccountError::Password(_) | AccountError::Token(_) | AccountError::Task(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}
