//! Catalog products.

use chrono::{DateTime, Utc};
use serde::Serialize;

use shopkeep_core::{Money, ProductId, UserId};

/// A product in the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    /// The account that created the product and may change it.
    pub created_by: UserId,
    pub name: String,
    /// Globally unique stock keeping unit.
    pub sku: String,
    pub price: Money,
    pub stock: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Validated product fields from a request, before an owner is assigned.
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub sku: String,
    pub price: Money,
    pub stock: u32,
    pub is_active: bool,
}

impl ProductDraft {
    #[must_use]
    pub fn owned_by(self, owner: UserId) -> NewProduct {
        NewProduct {
            created_by: owner,
            name: self.name,
            sku: self.sku,
            price: self.price,
            stock: self.stock,
            is_active: self.is_active,
        }
    }
}

/// Data for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub created_by: UserId,
    pub name: String,
    pub sku: String,
    pub price: Money,
    pub stock: u32,
    pub is_active: bool,
}

/// A partial product update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<u32>,
    pub is_active: Option<bool>,
}

impl ProductUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.sku.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.is_active.is_none()
    }

    /// Apply the supplied fields to `product`.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name.clone_from(name);
        }
        if let Some(sku) = &self.sku {
            product.sku.clone_from(sku);
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(is_active) = self.is_active {
            product.is_active = is_active;
        }
    }
}
