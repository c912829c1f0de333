//! Registration and login handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use shopkeep_core::{Role, UserId};

use super::ApiJson;
use crate::error::AppError;
use crate::services::{AccountService, Registration};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user_id: UserId,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
}

/// Create a staff account.
///
/// # Errors
///
/// Returns `ValidationError` for empty fields or a malformed email, and
/// `Conflict` when the username or email is taken.
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let user = AccountService::new(state.stores().users.as_ref(), state.store_timeout())
        .register(
            Registration {
                username: body.username,
                email: body.email,
                password: body.password,
            },
            Role::Staff,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully",
            user_id: user.id,
            role: user.role,
        }),
    ))
}

/// Exchange email and password for a bearer token.
///
/// # Errors
///
/// Returns `Unauthenticated` for any credential mismatch.
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let token = AccountService::new(state.stores().users.as_ref(), state.store_timeout())
        .login(state.tokens(), &body.email, &body.password)
        .await?;

    Ok(Json(LoginResponse {
        message: "Login successful",
        token,
    }))
}
