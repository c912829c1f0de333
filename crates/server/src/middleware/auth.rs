//! Bearer token extractors.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use shopkeep_core::Principal;

use crate::auth::{TokenError, TokenService};
use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

/// Extractor that requires a valid staff or admin token.
///
/// Rejects with `401 Unauthenticated` when the `Authorization: Bearer` header
/// is missing or the token does not validate.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireStaff(principal): RequireStaff) -> impl IntoResponse {
///     format!("acting as {}", principal.role())
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireStaff(pub Principal);

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(TokenService::extract_from_header)
            .ok_or_else(|| AppError::Unauthenticated("missing bearer token".to_string()))?;

        let principal = state.tokens().validate(token).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            AppError::Unauthenticated(
                match e {
                    TokenError::Expired => "token expired",
                    _ => "invalid token",
                }
                .to_string(),
            )
        })?;

        if let Some(user_id) = principal.owner() {
            set_sentry_user(user_id.as_i32(), principal.role().as_str());
        }
        Ok(Self(principal))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::Request;
    use secrecy::SecretString;
    use shopkeep_core::{Role, UserId};

    use super::*;
    use crate::config::OrderConfig;
    use crate::db::{MemoryStore, Stores};
    use crate::services::RandomTrackingCodes;

    fn state() -> AppState {
        AppState::from_parts(
            OrderConfig::default(),
            Stores::memory(MemoryStore::new()),
            TokenService::new(
                &SecretString::from("t8#Lq2!Vz9$Wm4^Rk7&Hp1*Nx6@Bc3%Y"),
                Duration::from_secs(60),
            ),
            Arc::new(RandomTrackingCodes::new("TH")),
        )
    }

    async fn extract(state: &AppState, header: Option<&str>) -> Result<RequireStaff, AppError> {
        let mut builder = Request::builder().uri("/api/order");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        RequireStaff::from_request_parts(&mut parts, state).await
    }

    #[tokio::test]
    async fn test_valid_token() {
        let state = state();
        let token = state.tokens().issue(UserId::new(5), Role::Admin).unwrap();
        let RequireStaff(principal) = extract(&state, Some(&format!("Bearer {token}")))
            .await
            .unwrap();
        assert_eq!(principal, Principal::Admin(UserId::new(5)));
    }

    #[tokio::test]
    async fn test_missing_or_garbage_token() {
        let state = state();
        for header in [None, Some("Bearer not-a-jwt"), Some("Basic abc")] {
            let err = extract(&state, header).await.unwrap_err();
            assert_eq!(err.kind(), "Unauthenticated");
        }
    }
}
