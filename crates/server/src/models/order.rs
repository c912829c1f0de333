//! Orders and their line items.

use chrono::{DateTime, Utc};
use serde::Serialize;

use shopkeep_core::{
    CustomerId, Money, MoneyError, OrderId, OrderStatus, ProductId, TrackingNumber, UserId,
};

/// One line of an order, with the unit price captured at placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderItem {
    /// Unit price times quantity.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::TooLarge` if the line exceeds `Money::MAX`.
    pub fn line_total(&self) -> Result<Money, MoneyError> {
        self.unit_price.line_total(self.quantity)
    }
}

/// A stored order.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    /// `None` for orders placed through the public endpoint.
    pub created_by: Option<UserId>,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub items: Vec<OrderItem>,
    pub tracking_number: Option<TrackingNumber>,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

/// An order assembled for insertion.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: CustomerId,
    pub created_by: Option<UserId>,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub items: Vec<OrderItem>,
    pub tracking_number: Option<TrackingNumber>,
    pub note: String,
}

/// Fields changed by an order update. `status` is always written.
#[derive(Debug, Clone)]
pub struct OrderUpdate {
    pub status: OrderStatus,
    pub note: Option<String>,
    pub tracking_number: Option<TrackingNumber>,
}

impl OrderUpdate {
    /// Apply the update to `order`.
    pub fn apply_to(&self, order: &mut Order) {
        order.status = self.status;
        if let Some(note) = &self.note {
            order.note.clone_from(note);
        }
        if let Some(tracking_number) = &self.tracking_number {
            order.tracking_number = Some(tracking_number.clone());
        }
    }
}
