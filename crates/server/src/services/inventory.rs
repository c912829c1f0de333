//! Stock validation and adjustment for order placement.
//!
//! Validation reads every requested product before anything is written and
//! snapshots its current price. Debits then go through the store's
//! conditional decrement one line at a time, stopping at the first miss so
//! the caller can undo what was applied. Each debit is recorded against its
//! order in the same write, so a debit whose outcome was lost to a storage
//! error or deadline can be looked up before compensating.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

use shopkeep_core::{Money, MoneyError, OrderId, ProductId};

use super::deadline::with_deadline;
use crate::db::{ProductStore, RepositoryError};
use crate::models::OrderItem;

/// A requested order line, before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Validated lines with their price snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    pub lines: Vec<OrderItem>,
    pub total: Money,
    /// Product names at validation time, for error messages.
    names: HashMap<ProductId, String>,
}

impl Availability {
    /// Name of a validated product, falling back to its id.
    #[must_use]
    pub fn name_of(&self, id: ProductId) -> String {
        self.names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("product {id}"))
    }
}

/// Why a set of lines cannot be placed.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The product is missing or inactive.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("insufficient stock for {name}")]
    InsufficientStock { product_id: ProductId, name: String },

    /// A line total or the order total does not fit in `Money`.
    #[error("order total: {0}")]
    Amount(#[from] MoneyError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Why a single debit did not apply.
#[derive(Debug, Error)]
pub enum DebitFailure {
    /// The conditional decrement matched nothing.
    #[error("stock no longer available")]
    Unavailable,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result of applying debits.
#[derive(Debug)]
pub enum DebitOutcome {
    /// Every line was debited.
    Applied,
    /// Debiting stopped at `failed`; `applied` lists the lines already taken.
    ///
    /// When `cause` is a storage error, `applied` also holds the failed line
    /// if its debit record shows it went through.
    PartialFailure {
        applied: Vec<OrderItem>,
        failed: ProductId,
        cause: DebitFailure,
    },
}

/// Fold repeated products into one line, summing quantities.
///
/// First-seen order is kept. A sum past `u32::MAX` saturates, which no
/// stock level can satisfy.
#[must_use]
pub fn merge_lines(requests: &[LineRequest]) -> Vec<LineRequest> {
    let mut merged: Vec<LineRequest> = Vec::with_capacity(requests.len());
    for request in requests {
        match merged
            .iter_mut()
            .find(|line| line.product_id == request.product_id)
        {
            Some(line) => line.quantity = line.quantity.saturating_add(request.quantity),
            None => merged.push(*request),
        }
    }
    merged
}

/// Inventory operations over a product store.
pub struct InventoryLedger<'a> {
    products: &'a dyn ProductStore,
    timeout: Duration,
}

impl<'a> InventoryLedger<'a> {
    #[must_use]
    pub const fn new(products: &'a dyn ProductStore, timeout: Duration) -> Self {
        Self { products, timeout }
    }

    /// Check every line against live stock and snapshot unit prices.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ProductNotFound` for a missing or inactive
    /// product, `LedgerError::InsufficientStock` when a line asks for more
    /// than is in stock, `LedgerError::Amount` when the total is larger than
    /// `Money` can hold, or `LedgerError::Repository` on storage failure.
    #[tracing::instrument(skip_all, fields(lines = requests.len()))]
    pub async fn check_availability(
        &self,
        requests: &[LineRequest],
    ) -> Result<Availability, LedgerError> {
        let mut lines = Vec::with_capacity(requests.len());
        let mut names = HashMap::with_capacity(requests.len());
        for request in merge_lines(requests) {
            let product = with_deadline(
                self.timeout,
                "find product",
                self.products.find_active(request.product_id),
            )
            .await?
            .ok_or(LedgerError::ProductNotFound(request.product_id))?;

            if request.quantity > product.stock {
                return Err(LedgerError::InsufficientStock {
                    product_id: product.id,
                    name: product.name,
                });
            }

            lines.push(OrderItem {
                product_id: product.id,
                quantity: request.quantity,
                unit_price: product.price,
            });
            names.insert(product.id, product.name);
        }

        let total = Money::total(lines.iter().map(OrderItem::line_total))?;
        Ok(Availability {
            lines,
            total,
            names,
        })
    }

    /// Take stock for each line of `order` with a conditional decrement.
    ///
    /// Stops at the first line that cannot be debited. A line that fails
    /// with a storage error is looked up in the debit records so the outcome
    /// reports it as applied when it was.
    #[tracing::instrument(skip_all, fields(order_id = %order, lines = items.len()))]
    pub async fn debit(&self, order: OrderId, items: &[OrderItem]) -> DebitOutcome {
        let mut applied = Vec::with_capacity(items.len());
        for item in items {
            let result = with_deadline(
                self.timeout,
                "debit stock",
                self.products
                    .debit_if_available(order, item.product_id, item.quantity),
            )
            .await;

            let cause = match result {
                Ok(true) => {
                    applied.push(item.clone());
                    continue;
                }
                Ok(false) => DebitFailure::Unavailable,
                Err(e) => {
                    if self.was_recorded(order, item).await {
                        applied.push(item.clone());
                    }
                    DebitFailure::Repository(e)
                }
            };

            tracing::warn!(product_id = %item.product_id, %cause, "debit failed");
            return DebitOutcome::PartialFailure {
                applied,
                failed: item.product_id,
                cause,
            };
        }
        DebitOutcome::Applied
    }

    /// Whether the debit of `item` for `order` went through.
    ///
    /// An unanswerable lookup counts as not applied and is reported, since
    /// crediting stock that was never taken would oversell.
    async fn was_recorded(&self, order: OrderId, item: &OrderItem) -> bool {
        let lookup = with_deadline(
            self.timeout,
            "find debit",
            self.products.debit_recorded(order, item.product_id),
        )
        .await;

        match lookup {
            Ok(recorded) => {
                tracing::info!(product_id = %item.product_id, recorded, "checked debit record");
                recorded
            }
            Err(e) => {
                tracing::error!(
                    order_id = %order,
                    product_id = %item.product_id,
                    quantity = item.quantity,
                    error = %e,
                    "debit outcome unknown, stock may need a manual credit"
                );
                sentry::capture_error(&e);
                false
            }
        }
    }

    /// Return stock for each line.
    ///
    /// Every line is attempted; the first error is returned after the rest
    /// have been tried.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if any credit failed.
    #[tracing::instrument(skip_all, fields(lines = items.len()))]
    pub async fn credit(&self, items: &[OrderItem]) -> Result<(), RepositoryError> {
        let mut first_error = None;
        for item in items {
            let result = with_deadline(
                self.timeout,
                "credit stock",
                self.products
                    .adjust_stock(item.product_id, i64::from(item.quantity)),
            )
            .await;

            if let Err(e) = result {
                tracing::error!(product_id = %item.product_id, error = %e, "credit failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use shopkeep_core::UserId;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{NewProduct, ProductUpdate};

    async fn product(store: &MemoryStore, sku: &str, cents: i64, stock: u32) -> ProductId {
        ProductStore::insert(
            store,
            &NewProduct {
                created_by: UserId::new(1),
                name: format!("Product {sku}"),
                sku: sku.to_string(),
                price: Money::new(Decimal::new(cents, 2)).unwrap(),
                stock,
                is_active: true,
            },
        )
        .await
        .unwrap()
        .id
    }

    fn line(product_id: ProductId, quantity: u32) -> LineRequest {
        LineRequest {
            product_id,
            quantity,
        }
    }

    #[test]
    fn test_merge_lines_sums_duplicates() {
        let a = ProductId::new(1);
        let b = ProductId::new(2);
        let merged = merge_lines(&[line(a, 2), line(b, 1), line(a, 3)]);
        assert_eq!(merged, vec![line(a, 5), line(b, 1)]);
    }

    #[test]
    fn test_merge_lines_saturates() {
        let a = ProductId::new(1);
        let merged = merge_lines(&[line(a, u32::MAX), line(a, 1)]);
        assert_eq!(merged, vec![line(a, u32::MAX)]);
    }

    #[tokio::test]
    async fn test_check_availability_snapshots_prices() {
        let store = MemoryStore::new();
        let jam = product(&store, "JAM", 999, 10).await;
        let tea = product(&store, "TEA", 150, 4).await;
        let ledger = InventoryLedger::new(&store, Duration::from_secs(5));

        let availability = ledger
            .check_availability(&[line(jam, 3), line(tea, 4)])
            .await
            .unwrap();
        assert_eq!(availability.lines.len(), 2);
        assert_eq!(availability.total.to_string(), "35.97");
        assert_eq!(availability.lines[0].unit_price.to_string(), "9.99");
        assert_eq!(availability.name_of(tea), "Product TEA");
    }

    #[tokio::test]
    async fn test_check_availability_counts_merged_quantity() {
        let store = MemoryStore::new();
        let jam = product(&store, "JAM", 999, 5).await;
        let ledger = InventoryLedger::new(&store, Duration::from_secs(5));

        let result = ledger.check_availability(&[line(jam, 3), line(jam, 3)]).await;
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientStock { product_id, .. }) if product_id == jam
        ));
    }

    #[tokio::test]
    async fn test_overflowing_total_is_rejected_before_any_write() {
        let store = MemoryStore::new();
        let gold = product(&store, "GOLD", 999_999_999_999, 5).await;
        let bar = product(&store, "BAR", 100, 5).await;
        let ledger = InventoryLedger::new(&store, Duration::from_secs(5));

        let line_overflow = ledger.check_availability(&[line(gold, 2)]).await;
        assert!(matches!(
            line_overflow,
            Err(LedgerError::Amount(MoneyError::TooLarge))
        ));

        let sum_overflow = ledger.check_availability(&[line(gold, 1), line(bar, 1)]).await;
        assert!(matches!(
            sum_overflow,
            Err(LedgerError::Amount(MoneyError::TooLarge))
        ));
        assert_eq!(store.product(gold).unwrap().stock, 5);
        assert_eq!(store.product(bar).unwrap().stock, 5);

        let at_cap = ledger.check_availability(&[line(gold, 1)]).await.unwrap();
        assert_eq!(at_cap.total, Money::MAX);
    }

    #[tokio::test]
    async fn test_inactive_product_is_not_found() {
        let store = MemoryStore::new();
        let jam = product(&store, "JAM", 999, 5).await;
        ProductStore::update(
            &store,
            jam,
            &ProductUpdate {
                is_active: Some(false),
                ..ProductUpdate::default()
            },
            crate::db::OwnerScope::Any,
        )
        .await
        .unwrap();
        let ledger = InventoryLedger::new(&store, Duration::from_secs(5));

        let result = ledger.check_availability(&[line(jam, 1)]).await;
        assert!(matches!(result, Err(LedgerError::ProductNotFound(id)) if id == jam));
    }

    #[tokio::test]
    async fn test_debit_stops_at_first_miss() {
        let store = MemoryStore::new();
        let jam = product(&store, "JAM", 999, 5).await;
        let tea = product(&store, "TEA", 150, 1).await;
        let ledger = InventoryLedger::new(&store, Duration::from_secs(5));
        let order = OrderId::new(7);
        let price = Money::ZERO;
        let items = vec![
            OrderItem {
                product_id: jam,
                quantity: 2,
                unit_price: price,
            },
            OrderItem {
                product_id: tea,
                quantity: 2,
                unit_price: price,
            },
        ];

        match ledger.debit(order, &items).await {
            DebitOutcome::PartialFailure {
                applied,
                failed,
                cause,
            } => {
                assert_eq!(applied, vec![items[0].clone()]);
                assert_eq!(failed, tea);
                assert!(matches!(cause, DebitFailure::Unavailable));
            }
            DebitOutcome::Applied => panic!("expected partial failure"),
        }
        assert_eq!(store.product(jam).unwrap().stock, 3);
        assert_eq!(store.product(tea).unwrap().stock, 1);
        assert!(store.debit_recorded(order, jam).await.unwrap());
        assert!(!store.debit_recorded(order, tea).await.unwrap());

        ledger.credit(&[items[0].clone()]).await.unwrap();
        assert_eq!(store.product(jam).unwrap().stock, 5);
    }
}
