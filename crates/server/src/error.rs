//! Unified error handling for the HTTP API.
//!
//! Every failure reaches the client as `{"error": <kind>, "message": <text>}`.
//! Storage details are logged and sent to Sentry but never returned.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use shopkeep_core::ProductId;

use crate::db::RepositoryError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or invalid input.
    #[error("{0}")]
    Validation(String),

    /// No usable credential.
    #[error("{0}")]
    Unauthenticated(String),

    /// The caller's role may not do this.
    #[error("{0}")]
    Forbidden(String),

    /// Resource not found, or not visible to the caller.
    #[error("{0}")]
    NotFound(String),

    /// A uniqueness rule would be broken.
    #[error("{0}")]
    Conflict(String),

    /// Not enough stock to fill an order line.
    #[error("insufficient stock for {name} (product {product_id})")]
    InsufficientStock { product_id: ProductId, name: String },

    /// Storage failed.
    #[error("storage error: {0}")]
    Storage(RepositoryError),

    /// A storage call exceeded its deadline.
    #[error("{0} timed out")]
    Timeout(&'static str),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("not found".to_string()),
            RepositoryError::Conflict(what) => Self::Conflict(what),
            RepositoryError::Timeout(what) => Self::Timeout(what),
            other @ (RepositoryError::Database(_) | RepositoryError::DataCorruption(_)) => {
                Self::Storage(other)
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl AppError {
    /// Stable machine-readable kind, sent as the `error` field.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::Unauthenticated(_) => "Unauthenticated",
            Self::Forbidden(_) => "Forbidden",
            Self::NotFound(_) => "NotFound",
            Self::Conflict(_) => "Conflict",
            Self::InsufficientStock { .. } => "InsufficientStock",
            Self::Storage(_) => "StorageError",
            Self::Timeout(_) => "Timeout",
            Self::Internal(_) => "InternalError",
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(self, Self::Storage(_) | Self::Internal(_) | Self::Timeout(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "request failed"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Storage(_) | Self::Internal(_) => "internal server error".to_string(),
            _ => self.to_string(),
        };

        let body = Json(json!({ "error": self.kind(), "message": message }));
        (self.status(), body).into_response()
    }
}

/// Set the Sentry user context for the current request.
pub fn set_sentry_user(user_id: i32, role: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
        scope.set_tag("role", role);
    });
}
