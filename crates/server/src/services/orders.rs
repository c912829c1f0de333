//! Order assembly and role-scoped order management.

use std::time::Duration;

use thiserror::Error;

use shopkeep_core::{
    CustomerId, MoneyError, OrderId, OrderStatus, Principal, ProductId, TrackingNumber,
    TrackingNumberError,
};

use super::deadline::with_deadline;
use super::inventory::{Availability, LedgerError};
use crate::db::{OrderStore, OwnerScope, RepositoryError};
use crate::error::AppError;
use crate::models::{NewOrder, Order, OrderUpdate};

/// Errors from placing or managing orders.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The public principal tried a staff-only operation.
    #[error("staff or admin role required")]
    Forbidden,

    #[error("order is {0} and can no longer be changed")]
    Terminal(OrderStatus),

    #[error("order not found")]
    NotFound,

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("insufficient stock for {name}")]
    InsufficientStock { product_id: ProductId, name: String },

    #[error("order total: {0}")]
    Amount(MoneyError),

    #[error("could not generate a tracking number: {0}")]
    Tracking(#[from] TrackingNumberError),

    #[error("no unused tracking number after {0} attempts")]
    TrackingExhausted(u32),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<LedgerError> for OrderError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::ProductNotFound(id) => Self::ProductNotFound(id),
            LedgerError::InsufficientStock { product_id, name } => {
                Self::InsufficientStock { product_id, name }
            }
            LedgerError::Amount(e) => Self::Amount(e),
            LedgerError::Repository(e) => Self::Repository(e),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Forbidden | OrderError::Terminal(_) => Self::Forbidden(err.to_string()),
            OrderError::NotFound => Self::NotFound("Order not found".to_string()),
            OrderError::ProductNotFound(_) => Self::NotFound("Product not found".to_string()),
            OrderError::Amount(_) => Self::Validation(err.to_string()),
            OrderError::InsufficientStock { product_id, name } => {
                Self::InsufficientStock { product_id, name }
            }
            OrderError::Tracking(_) | OrderError::TrackingExhausted(_) => {
                Self::Internal(err.to_string())
            }
            OrderError::Repository(e) => e.into(),
        }
    }
}

/// Assemble a new order from validated lines.
///
/// The order starts `Pending`. Staff and admin placements own the order;
/// public placements leave it unowned.
#[must_use]
pub fn assemble_order(
    availability: Availability,
    customer_id: CustomerId,
    principal: &Principal,
    note: &str,
    tracking_number: Option<TrackingNumber>,
) -> NewOrder {
    NewOrder {
        customer_id,
        created_by: principal.owner(),
        status: OrderStatus::Pending,
        total_amount: availability.total,
        items: availability.lines,
        tracking_number,
        note: note.to_string(),
    }
}

/// Listing, updating and deleting orders on behalf of a principal.
pub struct OrderService<'a> {
    orders: &'a dyn OrderStore,
    timeout: Duration,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(orders: &'a dyn OrderStore, timeout: Duration) -> Self {
        Self { orders, timeout }
    }

    /// Orders visible to `principal`: all for admins, own and unowned for staff.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Forbidden` for the public principal.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, principal: &Principal) -> Result<Vec<Order>, OrderError> {
        let scope = OwnerScope::for_listing(principal).ok_or(OrderError::Forbidden)?;
        Ok(with_deadline(self.timeout, "list orders", self.orders.find_all(scope)).await?)
    }

    /// Change status, and optionally note and tracking number.
    ///
    /// Any staff member may update any order that is not terminal. When the
    /// conditional write matches nothing, a point read tells a missing order
    /// from a terminal one.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Terminal` for completed or cancelled orders,
    /// `OrderError::NotFound` for a missing order and `OrderError::Forbidden`
    /// for the public principal.
    #[tracing::instrument(skip(self, changes), fields(status = %changes.status))]
    pub async fn update(
        &self,
        id: OrderId,
        changes: &OrderUpdate,
        principal: &Principal,
    ) -> Result<Order, OrderError> {
        if matches!(principal, Principal::Public) {
            return Err(OrderError::Forbidden);
        }

        let updated =
            with_deadline(self.timeout, "update order", self.orders.update(id, changes)).await?;
        if let Some(order) = updated {
            tracing::info!(order_id = %order.id, status = %order.status, "order updated");
            return Ok(order);
        }

        // Terminal orders never leave that state, so a stored order here is one.
        let current = with_deadline(self.timeout, "find order", self.orders.find_by_id(id)).await?;
        match current {
            Some(order) => Err(OrderError::Terminal(order.status)),
            None => Err(OrderError::NotFound),
        }
    }

    /// Delete an order. Staff may only delete orders they placed.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` when the order is missing or not the
    /// caller's to delete.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: OrderId, principal: &Principal) -> Result<(), OrderError> {
        let scope = OwnerScope::for_mutation(principal).ok_or(OrderError::Forbidden)?;
        with_deadline(self.timeout, "delete order", self.orders.delete(id, scope))
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => OrderError::NotFound,
                other => OrderError::Repository(other),
            })?;
        tracing::info!(order_id = %id, "order deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use shopkeep_core::{Money, UserId};

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::OrderItem;

    const ADMIN: Principal = Principal::Admin(UserId::new(1));
    const STAFF: Principal = Principal::Staff(UserId::new(2));
    const OTHER: Principal = Principal::Staff(UserId::new(3));

    fn new_order(created_by: Option<UserId>, status: OrderStatus) -> NewOrder {
        let unit_price = Money::new(Decimal::new(250, 2)).unwrap();
        NewOrder {
            customer_id: CustomerId::new(1),
            created_by,
            status,
            total_amount: unit_price.line_total(2).unwrap(),
            items: vec![OrderItem {
                product_id: ProductId::new(1),
                quantity: 2,
                unit_price,
            }],
            tracking_number: None,
            note: "In progress".to_string(),
        }
    }

    async fn seed(store: &MemoryStore, created_by: Option<UserId>, status: OrderStatus) -> OrderId {
        OrderStore::insert(store, &new_order(created_by, status))
            .await
            .unwrap()
            .id
    }

    fn set_status(status: OrderStatus) -> OrderUpdate {
        OrderUpdate {
            status,
            note: None,
            tracking_number: None,
        }
    }

    #[tokio::test]
    async fn test_listing_is_role_scoped() {
        let store = MemoryStore::new();
        let own = seed(&store, STAFF.owner(), OrderStatus::Pending).await;
        let public = seed(&store, None, OrderStatus::Pending).await;
        let foreign = seed(&store, OTHER.owner(), OrderStatus::Pending).await;
        let service = OrderService::new(&store, Duration::from_secs(5));

        let mut staff_ids: Vec<_> = service
            .list(&STAFF)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        staff_ids.sort();
        assert_eq!(staff_ids, vec![own, public]);

        assert_eq!(service.list(&ADMIN).await.unwrap().len(), 3);
        assert!(!staff_ids.contains(&foreign));
        assert!(matches!(
            service.list(&Principal::Public).await,
            Err(OrderError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_terminal_order_is_immutable() {
        let store = MemoryStore::new();
        let id = seed(&store, STAFF.owner(), OrderStatus::Completed).await;
        let service = OrderService::new(&store, Duration::from_secs(5));

        let mut changes = set_status(OrderStatus::Processing);
        changes.note = Some("reopen".to_string());
        let result = service.update(id, &changes, &ADMIN).await;
        assert!(matches!(
            result,
            Err(OrderError::Terminal(OrderStatus::Completed))
        ));

        let stored = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Completed);
        assert_eq!(stored.note, "In progress");
    }

    #[tokio::test]
    async fn test_any_staff_may_update() {
        let store = MemoryStore::new();
        let id = seed(&store, STAFF.owner(), OrderStatus::Pending).await;
        let service = OrderService::new(&store, Duration::from_secs(5));

        let order = service
            .update(id, &set_status(OrderStatus::Shipped), &OTHER)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);

        let missing = service
            .update(OrderId::new(999), &set_status(OrderStatus::Shipped), &OTHER)
            .await;
        assert!(matches!(missing, Err(OrderError::NotFound)));
    }

    #[tokio::test]
    async fn test_staff_cannot_delete_unowned_or_foreign() {
        let store = MemoryStore::new();
        let public = seed(&store, None, OrderStatus::Pending).await;
        let foreign = seed(&store, OTHER.owner(), OrderStatus::Pending).await;
        let own = seed(&store, STAFF.owner(), OrderStatus::Pending).await;
        let service = OrderService::new(&store, Duration::from_secs(5));

        for id in [public, foreign] {
            assert!(matches!(
                service.delete(id, &STAFF).await,
                Err(OrderError::NotFound)
            ));
        }
        service.delete(own, &STAFF).await.unwrap();
        service.delete(public, &ADMIN).await.unwrap();
        assert_eq!(store.order_count(), 1);
    }

    #[tokio::test]
    async fn test_update_reads_back_to_explain_a_miss() {
        let store = MemoryStore::new();
        let cancelled = seed(&store, None, OrderStatus::Cancelled).await;
        let service = OrderService::new(&store, Duration::from_secs(5));
        let ship = set_status(OrderStatus::Shipped);

        assert!(OrderStore::update(&store, cancelled, &ship).await.unwrap().is_none());
        assert!(matches!(
            service.update(cancelled, &ship, &STAFF).await,
            Err(OrderError::Terminal(OrderStatus::Cancelled))
        ));

        OrderStore::delete(&store, cancelled, OwnerScope::Any)
            .await
            .unwrap();
        assert!(matches!(
            service.update(cancelled, &ship, &STAFF).await,
            Err(OrderError::NotFound)
        ));
    }

    #[test]
    fn test_error_kinds() {
        let err: AppError = OrderError::Terminal(OrderStatus::Cancelled).into();
        assert_eq!(err.kind(), "Forbidden");
        let err: AppError = OrderError::ProductNotFound(ProductId::new(1)).into();
        assert_eq!(err.kind(), "NotFound");
        let err: AppError = OrderError::Amount(MoneyError::TooLarge).into();
        assert_eq!(err.kind(), "ValidationError");
        let err: AppError = OrderError::Repository(RepositoryError::Timeout("debit stock")).into();
        assert_eq!(err.kind(), "Timeout");
    }
}
