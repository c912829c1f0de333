//! Product repository for `PostgreSQL`.
//!
//! Stock changes are single statements so concurrent orders never
//! read-modify-write the same row. A debit writes its `stock_debits` record
//! in the same statement as the decrement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use shopkeep_core::{Money, OrderId, ProductId, UserId};

use super::{OwnerScope, ProductStore, RepositoryError, db_count, domain_count};
use crate::models::{NewProduct, Product, ProductUpdate};

const PRODUCT_COLUMNS: &str = "id, created_by, name, sku, price, stock, is_active, created_at";

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    created_by: UserId,
    name: String,
    sku: String,
    price: Money,
    stock: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            created_by: row.created_by,
            name: row.name,
            sku: row.sku,
            price: row.price,
            stock: domain_count(row.stock, "stock")?,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

/// Products always have a creator, so the unclaimed half of a listing scope
/// never matches.
const fn owner_filter(scope: OwnerScope) -> Option<UserId> {
    match scope {
        OwnerScope::Any => None,
        OwnerScope::OwnedBy(id) | OwnerScope::OwnedOrUnclaimed(id) => Some(id),
    }
}

/// Repository for product database operations.
#[derive(Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for PgProductRepository {
    async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_active(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND is_active"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn exists_by_sku(&self, sku: &str) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE sku = $1)")
            .bind(sku)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn insert(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO products (created_by, name, sku, price, stock, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(product.created_by)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(product.price)
        .bind(db_count(product.stock)?)
        .bind(product.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "SKU already exists"))?;

        row.try_into()
    }

    async fn update(
        &self,
        id: ProductId,
        changes: &ProductUpdate,
        scope: OwnerScope,
    ) -> Result<Product, RepositoryError> {
        let stock = changes.stock.map(db_count).transpose()?;
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE products SET
                name = COALESCE($3, name),
                sku = COALESCE($4, sku),
                price = COALESCE($5, price),
                stock = COALESCE($6, stock),
                is_active = COALESCE($7, is_active)
            WHERE id = $1 AND ($2::INTEGER IS NULL OR created_by = $2)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(owner_filter(scope))
        .bind(changes.name.as_deref())
        .bind(changes.sku.as_deref())
        .bind(changes.price)
        .bind(stock)
        .bind(changes.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "SKU already exists"))?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    async fn delete(&self, id: ProductId, scope: OwnerScope) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM products WHERE id = $1 AND ($2::INTEGER IS NULL OR created_by = $2)",
        )
        .bind(id)
        .bind(owner_filter(scope))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn adjust_stock(&self, id: ProductId, delta: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE products SET stock = stock + $2 WHERE id = $1")
            .bind(id)
            .bind(delta)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_constraint(e, "stock cannot go below zero"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn debit_if_available(
        &self,
        order: OrderId,
        id: ProductId,
        quantity: u32,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            WITH debited AS (
                UPDATE products SET stock = stock - $3
                WHERE id = $2 AND is_active AND stock >= $3
                RETURNING id
            )
            INSERT INTO stock_debits (order_id, product_id, quantity)
            SELECT $1, id, $3 FROM debited
            ",
        )
        .bind(order)
        .bind(id)
        .bind(db_count(quantity)?)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            RepositoryError::from_constraint(e, "stock already debited for this order line")
        })?;

        Ok(result.rows_affected() == 1)
    }

    async fn debit_recorded(&self, order: OrderId, id: ProductId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Blocks until an in-flight debit on this row commits or rolls back.
        sqlx::query("SELECT id FROM products WHERE id = $1 FOR SHARE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let recorded: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM stock_debits WHERE order_id = $1 AND product_id = $2)",
        )
        .bind(order)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(recorded)
    }
}
