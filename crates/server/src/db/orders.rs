//! Order repository for `PostgreSQL`.
//!
//! An order and its items are written in one transaction. Status changes go
//! through a conditional `UPDATE` that refuses terminal orders.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use shopkeep_core::{CustomerId, Money, OrderId, OrderStatus, ProductId, TrackingNumber, UserId};

use super::{OrderStore, OwnerScope, RepositoryError, db_count, domain_count};
use crate::models::{NewOrder, Order, OrderItem, OrderUpdate};

const ORDER_COLUMNS: &str =
    "id, customer_id, created_by, status, total_amount, tracking_number, note, created_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    customer_id: CustomerId,
    created_by: Option<UserId>,
    status: String,
    total_amount: Money,
    tracking_number: Option<TrackingNumber>,
    note: String,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let status = self.status.parse::<OrderStatus>().map_err(|e| {
            RepositoryError::DataCorruption(format!("order {}: {e}", self.id))
        })?;

        Ok(Order {
            id: self.id,
            customer_id: self.customer_id,
            created_by: self.created_by,
            status,
            total_amount: self.total_amount,
            items,
            tracking_number: self.tracking_number,
            note: self.note,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_id: OrderId,
    product_id: ProductId,
    quantity: i32,
    unit_price: Money,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: row.product_id,
            quantity: domain_count(row.quantity, "quantity")?,
            unit_price: row.unit_price,
        })
    }
}

/// Bind values for an owner scope: `(owner, include_unclaimed)`.
const fn scope_params(scope: OwnerScope) -> (Option<UserId>, bool) {
    match scope {
        OwnerScope::Any => (None, false),
        OwnerScope::OwnedBy(id) => (Some(id), false),
        OwnerScope::OwnedOrUnclaimed(id) => (Some(id), true),
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load the items of the given orders, grouped by order, in line order.
    async fn items_for(
        &self,
        order_ids: &[i32],
    ) -> Result<HashMap<OrderId, Vec<OrderItem>>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT order_id, product_id, quantity, unit_price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, line_no
            ",
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let order_id = row.order_id;
            grouped.entry(order_id).or_default().push(row.try_into()?);
        }
        Ok(grouped)
    }

    async fn with_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        let ids: Vec<i32> = rows.iter().map(|row| row.id.as_i32()).collect();
        let mut items = self.items_for(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let order_items = items.remove(&row.id).unwrap_or_default();
                row.into_order(order_items)
            })
            .collect()
    }
}

#[async_trait]
impl OrderStore for PgOrderRepository {
    async fn insert(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO orders (customer_id, created_by, status, total_amount, tracking_number, note)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order.customer_id)
        .bind(order.created_by)
        .bind(order.status.as_str())
        .bind(order.total_amount)
        .bind(order.tracking_number.as_ref())
        .bind(&order.note)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "tracking number already in use"))?;

        let mut line_nos = Vec::with_capacity(order.items.len());
        let mut product_ids = Vec::with_capacity(order.items.len());
        let mut quantities = Vec::with_capacity(order.items.len());
        let mut unit_prices: Vec<Decimal> = Vec::with_capacity(order.items.len());
        for (line_no, item) in (1_i32..).zip(&order.items) {
            line_nos.push(line_no);
            product_ids.push(item.product_id.as_i32());
            quantities.push(db_count(item.quantity)?);
            unit_prices.push(item.unit_price.amount());
        }

        sqlx::query(
            r"
            INSERT INTO order_items (order_id, line_no, product_id, quantity, unit_price)
            SELECT $1, line_no, product_id, quantity, unit_price
            FROM UNNEST($2::INTEGER[], $3::INTEGER[], $4::INTEGER[], $5::NUMERIC[])
                AS t(line_no, product_id, quantity, unit_price)
            ",
        )
        .bind(row.id)
        .bind(&line_nos)
        .bind(&product_ids)
        .bind(&quantities)
        .bind(&unit_prices)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        row.into_order(order.items.clone())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.with_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_all(&self, scope: OwnerScope) -> Result<Vec<Order>, RepositoryError> {
        let (owner, include_unclaimed) = scope_params(scope);
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE $1::INTEGER IS NULL OR created_by = $1 OR ($2 AND created_by IS NULL)
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(owner)
        .bind(include_unclaimed)
        .fetch_all(&self.pool)
        .await?;

        self.with_items(rows).await
    }

    async fn update(
        &self,
        id: OrderId,
        changes: &OrderUpdate,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE orders SET
                status = $2,
                note = COALESCE($3, note),
                tracking_number = COALESCE($4, tracking_number)
            WHERE id = $1 AND status NOT IN ('Completed', 'Cancelled')
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(changes.status.as_str())
        .bind(changes.note.as_deref())
        .bind(changes.tracking_number.as_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "tracking number already in use"))?;

        match row {
            Some(row) => Ok(self.with_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: OrderId, scope: OwnerScope) -> Result<(), RepositoryError> {
        let (owner, include_unclaimed) = scope_params(scope);
        let result = sqlx::query(
            r"
            DELETE FROM orders
            WHERE id = $1
              AND ($2::INTEGER IS NULL OR created_by = $2 OR ($3 AND created_by IS NULL))
            ",
        )
        .bind(id)
        .bind(owner)
        .bind(include_unclaimed)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
