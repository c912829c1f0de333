//! Customer handlers.

use axum::{Json, extract::State};

use crate::error::AppError;
use crate::middleware::RequireStaff;
use crate::models::Customer;
use crate::services::deadline::with_deadline;
use crate::state::AppState;

/// List every customer, newest first. Customers are shared by all staff.
///
/// # Errors
///
/// Returns `StorageError` or `Timeout` if the store fails.
#[tracing::instrument(skip(state))]
pub async fn list(
    RequireStaff(principal): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<Customer>>, AppError> {
    let customers = with_deadline(
        state.store_timeout(),
        "list customers",
        state.stores().customers.list_all(),
    )
    .await?;
    Ok(Json(customers))
}
