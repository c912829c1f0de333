//! Product catalog handlers.

use axum::{Json, extract::State, http::StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopkeep_core::{Money, ProductId};

use super::{ApiJson, ApiQuery, IdQuery, MessageResponse};
use crate::error::AppError;
use crate::middleware::RequireStaff;
use crate::models::{MAX_COUNT, Product, ProductDraft, ProductUpdate};
use crate::services::CatalogService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub product_name: String,
    pub sku: String,
    pub price: Decimal,
    pub stock: i64,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub product_name: Option<String>,
    pub sku: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub total: usize,
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub message: &'static str,
    pub product: Product,
}

fn required_text(value: &str, field: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn parse_price(price: Decimal) -> Result<Money, AppError> {
    Money::new(price).map_err(|e| AppError::Validation(format!("price: {e}")))
}

fn parse_stock(stock: i64) -> Result<u32, AppError> {
    u32::try_from(stock)
        .ok()
        .filter(|s| *s <= MAX_COUNT)
        .ok_or_else(|| AppError::Validation(format!("stock must be between 0 and {MAX_COUNT}")))
}

impl CreateProductRequest {
    fn into_draft(self) -> Result<ProductDraft, AppError> {
        Ok(ProductDraft {
            name: required_text(&self.product_name, "product_name")?,
            sku: required_text(&self.sku, "sku")?,
            price: parse_price(self.price)?,
            stock: parse_stock(self.stock)?,
            is_active: self.is_active.unwrap_or(true),
        })
    }
}

impl UpdateProductRequest {
    fn into_update(self) -> Result<ProductUpdate, AppError> {
        Ok(ProductUpdate {
            name: self
                .product_name
                .map(|n| required_text(&n, "product_name"))
                .transpose()?,
            sku: self.sku.map(|s| required_text(&s, "sku")).transpose()?,
            price: self.price.map(parse_price).transpose()?,
            stock: self.stock.map(parse_stock).transpose()?,
            is_active: self.is_active,
        })
    }
}

/// List the whole catalog.
///
/// # Errors
///
/// Returns `StorageError` or `Timeout` if the store fails.
pub async fn list(State(state): State<AppState>) -> Result<Json<ProductListResponse>, AppError> {
    let products = CatalogService::new(state.stores().products.as_ref(), state.store_timeout())
        .list()
        .await?;
    Ok(Json(ProductListResponse {
        total: products.len(),
        products,
    }))
}

/// Create a product owned by the caller.
///
/// # Errors
///
/// Returns `ValidationError` for bad fields and `Conflict` for a taken SKU.
#[tracing::instrument(skip(state, body))]
pub async fn create(
    RequireStaff(principal): RequireStaff,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    let product = CatalogService::new(state.stores().products.as_ref(), state.store_timeout())
        .create(&principal, body.into_draft()?)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ProductResponse {
            message: "Product created successfully",
            product,
        }),
    ))
}

/// Apply a partial update to a product.
///
/// # Errors
///
/// Returns `ValidationError` for an empty or invalid body, `NotFound` when
/// the product is missing or belongs to another staff member, and
/// `Conflict` for a taken SKU.
#[tracing::instrument(skip(state, body))]
pub async fn update(
    RequireStaff(principal): RequireStaff,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IdQuery>,
    ApiJson(body): ApiJson<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, AppError> {
    let id: ProductId = query.parse("product")?;
    let changes = body.into_update()?;
    let product = CatalogService::new(state.stores().products.as_ref(), state.store_timeout())
        .update(id, &changes, &principal)
        .await?;
    Ok(Json(ProductResponse {
        message: "Product updated successfully",
        product,
    }))
}

/// Delete a product.
///
/// # Errors
///
/// Returns `NotFound` when the product is missing or belongs to another
/// staff member.
#[tracing::instrument(skip(state))]
pub async fn delete(
    RequireStaff(principal): RequireStaff,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IdQuery>,
) -> Result<Json<MessageResponse>, AppError> {
    let id: ProductId = query.parse("product")?;
    CatalogService::new(state.stores().products.as_ref(), state.store_timeout())
        .delete(id, &principal)
        .await?;
    Ok(MessageResponse::new("Product deleted successfully"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn create_request(stock: i64, price: Decimal) -> CreateProductRequest {
        CreateProductRequest {
            product_name: " Mango jam ".to_string(),
            sku: "SKU1".to_string(),
            price,
            stock,
            is_active: None,
        }
    }

    #[test]
    fn test_create_request_validation() {
        let product = create_request(10, Decimal::new(999, 2)).into_draft().unwrap();
        assert_eq!(product.name, "Mango jam");
        assert!(product.is_active);

        assert!(create_request(-1, Decimal::ONE).into_draft().is_err());
        assert!(create_request(1, Decimal::new(-5, 0)).into_draft().is_err());
        assert!(create_request(1, Decimal::new(1001, 3)).into_draft().is_err());
    }

    #[test]
    fn test_price_above_the_cap_is_rejected() {
        let cap = Decimal::new(999_999_999_999, 2);
        assert!(create_request(1, cap).into_draft().is_ok());

        for price in [Decimal::new(1_000_000_000_000, 2), Decimal::MAX] {
            let err = create_request(1, price).into_draft().unwrap_err();
            assert_eq!(err.kind(), "ValidationError");
        }
    }

    #[test]
    fn test_update_request_keeps_absent_fields_unset() {
        let update = UpdateProductRequest {
            stock: Some(4),
            ..UpdateProductRequest::default()
        }
        .into_update()
        .unwrap();
        assert_eq!(update.stock, Some(4));
        assert!(update.name.is_none() && update.price.is_none() && update.sku.is_none());

        let blank = UpdateProductRequest {
            sku: Some("  ".to_string()),
            ..UpdateProductRequest::default()
        };
        assert!(blank.into_update().is_err());
    }
}
