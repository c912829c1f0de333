//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                 - Liveness
//! GET    /health/ready           - Store readiness
//!
//! GET    /api/ping               - Ping
//!
//! # Auth
//! POST   /api/auth/register      - Create a staff account
//! POST   /api/auth/login         - Exchange credentials for a token
//!
//! # Products
//! GET    /api/product            - Whole catalog (public)
//! POST   /api/product            - Create product (staff)
//! PUT    /api/product?id=        - Partial update (owner or admin)
//! DELETE /api/product?id=        - Delete (owner or admin)
//!
//! # Orders
//! POST   /api/order              - Place order (staff)
//! GET    /api/order              - Role-scoped listing (staff)
//! PUT    /api/order?id=          - Status, note, tracking number (staff)
//! DELETE /api/order?id=          - Delete (owner or admin)
//! POST   /api/public/order       - Place order anonymously
//!
//! # Customers
//! GET    /api/customer           - All customers (staff)
//! ```

pub mod auth;
pub mod customers;
pub mod orders;
pub mod products;

use axum::{
    Json, Router,
    extract::{FromRequest, FromRequestParts, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

/// JSON body extractor whose rejections use the API error shape.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query extractor whose rejections use the API error shape.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// `?id=` query parameter of update and delete routes.
#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

impl IdQuery {
    /// Parse the id, naming `what` in validation errors.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the id is missing or not a positive integer.
    pub fn parse<T: From<i32>>(&self, what: &str) -> Result<T, AppError> {
        let raw = self
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::Validation(format!("Missing {what} ID")))?;
        raw.parse::<i32>()
            .ok()
            .filter(|id| *id > 0)
            .map(T::from)
            .ok_or_else(|| AppError::Validation(format!("Invalid {what} ID")))
    }
}

/// Body of responses that only confirm an action.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    #[must_use]
    pub const fn new(message: &'static str) -> Json<Self> {
        Json(Self { message })
    }
}

/// Build the `/api` router.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .route("/ping", get(ping))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route(
            "/product",
            get(products::list)
                .post(products::create)
                .put(products::update)
                .delete(products::delete),
        )
        .route(
            "/order",
            get(orders::list)
                .post(orders::place)
                .put(orders::update)
                .delete(orders::delete),
        )
        .route("/public/order", post(orders::place_public))
        .route("/customer", get(customers::list));

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api)
}

async fn ping() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "pong" }))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store does not answer in time.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    let ping = tokio::time::timeout(state.store_timeout(), state.stores().ping()).await;
    match ping {
        Ok(Ok(())) => StatusCode::OK,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
        Err(_) => {
            tracing::warn!("readiness check timed out");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
