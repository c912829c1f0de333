//! Order placement.
//!
//! Placement runs as a saga over independent store calls:
//!
//! 1. validate every line against live stock and snapshot prices
//! 2. resolve the customer by email
//! 3. insert the order as `Pending`
//! 4. debit stock line by line with conditional decrements
//!
//! If a debit misses or fails in storage, the lines already debited are
//! credited back and the order is moved to `Cancelled` with a note saying
//! why. A line whose debit failed in storage is credited only when its debit
//! record shows it was applied. Compensation steps have their own deadlines;
//! their failures are logged and do not replace the error returned to the
//! caller.

use shopkeep_core::{CustomerId, OrderStatus, Principal, ProductId};

use super::customers::CustomerResolver;
use super::deadline::with_deadline;
use super::inventory::{Availability, DebitFailure, DebitOutcome, InventoryLedger, LineRequest};
use super::orders::{OrderError, assemble_order};
use super::tracking::TrackingCodeGenerator;
use crate::config::OrderConfig;
use crate::db::{RepositoryError, Stores};
use crate::models::{CustomerProfile, NewOrder, Order, OrderItem, OrderUpdate};

/// Attempts at finding an unused tracking number before giving up.
pub const MAX_TRACKING_ATTEMPTS: u32 = 5;

/// Places orders for staff and public callers.
pub struct OrderPlacement<'a> {
    stores: &'a Stores,
    config: &'a OrderConfig,
    tracking: &'a dyn TrackingCodeGenerator,
}

impl<'a> OrderPlacement<'a> {
    #[must_use]
    pub const fn new(
        stores: &'a Stores,
        config: &'a OrderConfig,
        tracking: &'a dyn TrackingCodeGenerator,
    ) -> Self {
        Self {
            stores,
            config,
            tracking,
        }
    }

    /// Place an order.
    ///
    /// Staff and admin placements own the order and get a tracking number;
    /// public placements get neither.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::ProductNotFound`, `OrderError::InsufficientStock`
    /// or `OrderError::Amount` when validation or a debit fails, and
    /// `OrderError::Repository` for storage failures. Nothing is written when
    /// validation fails.
    #[tracing::instrument(skip_all, fields(role = %principal.role(), lines = lines.len()))]
    pub async fn place(
        &self,
        principal: &Principal,
        profile: &CustomerProfile,
        lines: &[LineRequest],
    ) -> Result<Order, OrderError> {
        let timeout = self.config.store_timeout;
        let ledger = InventoryLedger::new(self.stores.products.as_ref(), timeout);

        let availability = ledger.check_availability(lines).await?;
        let customer_id = CustomerResolver::new(self.stores.customers.as_ref(), timeout)
            .resolve_or_create(profile)
            .await?;
        let order = self.insert(availability.clone(), customer_id, principal).await?;

        match ledger.debit(order.id, &order.items).await {
            DebitOutcome::Applied => {
                tracing::info!(
                    order_id = %order.id,
                    total = %order.total_amount,
                    "order placed"
                );
                Ok(order)
            }
            DebitOutcome::PartialFailure {
                applied,
                failed,
                cause,
            } => {
                self.compensate(&ledger, &order, &applied, failed, &cause).await;
                Err(match cause {
                    DebitFailure::Unavailable => OrderError::InsufficientStock {
                        product_id: failed,
                        name: availability.name_of(failed),
                    },
                    DebitFailure::Repository(e) => OrderError::Repository(e),
                })
            }
        }
    }

    /// Insert the order, regenerating the tracking number on collision.
    async fn insert(
        &self,
        availability: Availability,
        customer_id: CustomerId,
        principal: &Principal,
    ) -> Result<Order, OrderError> {
        let note = &self.config.default_note;
        if matches!(principal, Principal::Public) {
            let order = assemble_order(availability, customer_id, principal, note, None);
            return Ok(self.insert_once(&order).await?);
        }

        let mut order: NewOrder = assemble_order(availability, customer_id, principal, note, None);
        for attempt in 1..=MAX_TRACKING_ATTEMPTS {
            order.tracking_number = Some(self.tracking.generate()?);
            match self.insert_once(&order).await {
                Ok(created) => return Ok(created),
                Err(RepositoryError::Conflict(_)) => {
                    tracing::debug!(attempt, "tracking number collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        tracing::error!(
            attempts = MAX_TRACKING_ATTEMPTS,
            "no unused tracking number found"
        );
        Err(OrderError::TrackingExhausted(MAX_TRACKING_ATTEMPTS))
    }

    async fn insert_once(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        with_deadline(
            self.config.store_timeout,
            "insert order",
            self.stores.orders.insert(order),
        )
        .await
    }

    /// Undo a partially debited placement.
    async fn compensate(
        &self,
        ledger: &InventoryLedger<'_>,
        order: &Order,
        applied: &[OrderItem],
        failed: ProductId,
        cause: &DebitFailure,
    ) {
        tracing::warn!(
            order_id = %order.id,
            failed_product = %failed,
            credited_lines = applied.len(),
            %cause,
            "compensating failed placement"
        );

        if let Err(e) = ledger.credit(applied).await {
            tracing::error!(order_id = %order.id, error = %e, "stock credit failed during compensation");
            sentry::capture_error(&e);
        }

        let reason = match cause {
            DebitFailure::Unavailable => "was no longer available",
            DebitFailure::Repository(_) => "could not be reserved",
        };
        let cancel = OrderUpdate {
            status: OrderStatus::Cancelled,
            note: Some(format!("Cancelled: stock for product {failed} {reason}")),
            tracking_number: None,
        };
        match with_deadline(
            self.config.store_timeout,
            "cancel order",
            self.stores.orders.update(order.id, &cancel),
        )
        .await
        {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::warn!(order_id = %order.id, "order already terminal or gone, not cancelled");
            }
            Err(e) => {
                tracing::error!(order_id = %order.id, error = %e, "order cancel failed during compensation");
                sentry::capture_error(&e);
            }
        }
    }
}
