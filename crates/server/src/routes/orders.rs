//! Order handlers for staff and the public storefront.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use shopkeep_core::{Email, OrderId, OrderStatus, Principal, ProductId, TrackingNumber};

use super::{ApiJson, ApiQuery, IdQuery, MessageResponse};
use crate::error::AppError;
use crate::middleware::RequireStaff;
use crate::models::{CustomerProfile, MAX_COUNT, Order, OrderUpdate};
use crate::services::{LineRequest, OrderPlacement, OrderService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderItemRequest>,
    pub customer_fullname: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub customer_address: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    pub status: String,
    pub note: Option<String>,
    pub tracking_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub message: &'static str,
    pub order: Order,
}

fn required(value: &str, field: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

impl PlaceOrderRequest {
    /// Validate the body into a customer profile and order lines.
    fn validate(self) -> Result<(CustomerProfile, Vec<LineRequest>), AppError> {
        if self.items.is_empty() {
            return Err(AppError::Validation(
                "order must contain at least one item".to_string(),
            ));
        }
        let lines = self
            .items
            .iter()
            .map(|item| {
                u32::try_from(item.quantity)
                    .ok()
                    .filter(|q| (1..=MAX_COUNT).contains(q))
                    .map(|quantity| LineRequest {
                        product_id: item.product_id,
                        quantity,
                    })
                    .ok_or_else(|| {
                        AppError::Validation(format!(
                            "quantity for product {} must be between 1 and {MAX_COUNT}",
                            item.product_id
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let email = Email::parse(&self.customer_email)
            .map_err(|e| AppError::Validation(format!("customer_email: {e}")))?;
        let profile = CustomerProfile {
            full_name: required(&self.customer_fullname, "customer_fullname")?,
            email,
            phone: required(&self.customer_phone, "customer_phone")?,
            address: required(&self.customer_address, "customer_address")?,
        };
        Ok((profile, lines))
    }
}

impl UpdateOrderRequest {
    fn into_update(self) -> Result<OrderUpdate, AppError> {
        let status = self
            .status
            .trim()
            .parse::<OrderStatus>()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let tracking_number = self
            .tracking_number
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(TrackingNumber::parse)
            .transpose()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        Ok(OrderUpdate {
            status,
            note: self.note,
            tracking_number,
        })
    }
}

async fn place_as(
    state: &AppState,
    principal: &Principal,
    body: PlaceOrderRequest,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    let (profile, lines) = body.validate()?;
    let order = OrderPlacement::new(state.stores(), state.orders_config(), state.tracking())
        .place(principal, &profile, &lines)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            message: "Order placed successfully",
            order,
        }),
    ))
}

/// Place an order as a staff member.
///
/// # Errors
///
/// Returns `ValidationError` for a malformed body, `NotFound` for an unknown
/// product and `InsufficientStock` when stock runs short.
#[tracing::instrument(skip(state, body))]
pub async fn place(
    RequireStaff(principal): RequireStaff,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    place_as(&state, &principal, body).await
}

/// Place an order without credentials. The order has no owner.
///
/// # Errors
///
/// Same as [`place`].
#[tracing::instrument(skip(state, body))]
pub async fn place_public(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    place_as(&state, &Principal::Public, body).await
}

/// List the orders visible to the caller.
///
/// # Errors
///
/// Returns `StorageError` or `Timeout` if the store fails.
#[tracing::instrument(skip(state))]
pub async fn list(
    RequireStaff(principal): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = OrderService::new(state.stores().orders.as_ref(), state.store_timeout())
        .list(&principal)
        .await?;
    Ok(Json(orders))
}

/// Update an order's status, note and tracking number.
///
/// # Errors
///
/// Returns `Forbidden` when the order is completed or cancelled, `NotFound`
/// when it does not exist and `ValidationError` for an unknown status.
#[tracing::instrument(skip(state, body))]
pub async fn update(
    RequireStaff(principal): RequireStaff,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IdQuery>,
    ApiJson(body): ApiJson<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    let id: OrderId = query.parse("order")?;
    let changes = body.into_update()?;
    let order = OrderService::new(state.stores().orders.as_ref(), state.store_timeout())
        .update(id, &changes, &principal)
        .await?;
    Ok(Json(OrderResponse {
        message: "Order updated successfully",
        order,
    }))
}

/// Delete an order.
///
/// # Errors
///
/// Returns `NotFound` when the order is missing or not the caller's.
#[tracing::instrument(skip(state))]
pub async fn delete(
    RequireStaff(principal): RequireStaff,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IdQuery>,
) -> Result<Json<MessageResponse>, AppError> {
    let id: OrderId = query.parse("order")?;
    OrderService::new(state.stores().orders.as_ref(), state.store_timeout())
        .delete(id, &principal)
        .await?;
    Ok(MessageResponse::new("Order deleted successfully"))
}
