//! Persistence for accounts, customers, products and orders.
//!
//! # Tables
//!
//! - `users` - Staff and admin accounts (unique username and email)
//! - `customers` - Customers, deduplicated by a unique email index
//! - `products` - Catalog with unique SKU and `CHECK (stock >= 0)`
//! - `orders` - Orders, with a partial unique index on `tracking_number`
//! - `order_items` - Line items with snapshot unit prices
//! - `stock_debits` - Stock taken for each order line, written with the debit
//!
//! Each table is reached through a store trait so handlers and services can
//! run against `PostgreSQL` or the in-memory [`MemoryStore`].
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p shopkeep-cli -- migrate
//! ```

pub mod customers;
pub mod memory;
pub mod orders;
pub mod products;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use shopkeep_core::{Email, OrderId, Principal, ProductId, UserId};

use crate::models::{
    Customer, CustomerProfile, NewOrder, NewProduct, NewUser, Order, OrderUpdate, Product,
    ProductUpdate, User,
};

pub use customers::PgCustomerRepository;
pub use memory::MemoryStore;
pub use orders::PgOrderRepository;
pub use products::PgProductRepository;
pub use users::PgUserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The storage call did not finish before its deadline.
    #[error("{0} timed out")]
    Timeout(&'static str),
}

impl RepositoryError {
    /// Map a sqlx error, turning constraint violations into `Conflict`.
    pub(crate) fn from_constraint(e: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && (db_err.is_unique_violation() || db_err.is_check_violation())
        {
            return Self::Conflict(what.to_string());
        }
        Self::Database(e)
    }
}

/// Convert a count for an `INTEGER` column.
pub(crate) fn db_count(value: u32) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::Conflict(format!("{value} exceeds the storable range")))
}

/// Convert a count read from an `INTEGER` column.
pub(crate) fn domain_count(value: i32, column: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {column} in database")))
}

/// Which rows an operation may touch, derived from the acting principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerScope {
    /// Every row.
    Any,
    /// Rows created by this user.
    OwnedBy(UserId),
    /// Rows created by this user or by nobody.
    OwnedOrUnclaimed(UserId),
}

impl OwnerScope {
    /// Scope for reading order listings.
    ///
    /// Staff see their own orders plus public ones. Returns `None` for the
    /// public principal, which may not list.
    #[must_use]
    pub const fn for_listing(principal: &Principal) -> Option<Self> {
        match principal {
            Principal::Admin(_) => Some(Self::Any),
            Principal::Staff(id) => Some(Self::OwnedOrUnclaimed(*id)),
            Principal::Public => None,
        }
    }

    /// Scope for changing or deleting records.
    ///
    /// Staff may only touch what they created. Returns `None` for the public
    /// principal.
    #[must_use]
    pub const fn for_mutation(principal: &Principal) -> Option<Self> {
        match principal {
            Principal::Admin(_) => Some(Self::Any),
            Principal::Staff(id) => Some(Self::OwnedBy(*id)),
            Principal::Public => None,
        }
    }

    /// Whether a record with the given owner falls inside the scope.
    #[must_use]
    pub fn admits(self, owner: Option<UserId>) -> bool {
        match self {
            Self::Any => true,
            Self::OwnedBy(id) => owner == Some(id),
            Self::OwnedOrUnclaimed(id) => owner.is_none_or(|owner| owner == id),
        }
    }
}

/// Account storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert an account. Duplicate username or email yields `Conflict`.
    async fn insert(&self, user: &NewUser) -> Result<User, RepositoryError>;

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Whether any account has the `Admin` role.
    async fn admin_exists(&self) -> Result<bool, RepositoryError>;
}

/// Customer storage, keyed by a unique email.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn find_by_email(&self, email: &Email) -> Result<Option<Customer>, RepositoryError>;

    /// Insert a customer. An existing email yields `Conflict`.
    async fn insert(&self, profile: &CustomerProfile) -> Result<Customer, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<Customer>, RepositoryError>;
}

/// Product storage.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// The whole catalog, active or not.
    async fn list_all(&self) -> Result<Vec<Product>, RepositoryError>;

    /// A product that can currently be ordered.
    async fn find_active(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    async fn exists_by_sku(&self, sku: &str) -> Result<bool, RepositoryError>;

    /// Insert a product. A taken SKU yields `Conflict`.
    async fn insert(&self, product: &NewProduct) -> Result<Product, RepositoryError>;

    /// Apply a partial update to a product inside `scope`.
    ///
    /// Returns `NotFound` when the product is missing or outside the scope,
    /// and `Conflict` when the new SKU is taken.
    async fn update(
        &self,
        id: ProductId,
        changes: &ProductUpdate,
        scope: OwnerScope,
    ) -> Result<Product, RepositoryError>;

    /// Delete a product inside `scope`, or return `NotFound`.
    async fn delete(&self, id: ProductId, scope: OwnerScope) -> Result<(), RepositoryError>;

    /// Atomically add `delta` to the stock level.
    ///
    /// No lower bound is checked here; the `stock >= 0` constraint rejects a
    /// change that would go negative with `Conflict`.
    async fn adjust_stock(&self, id: ProductId, delta: i64) -> Result<(), RepositoryError>;

    /// Atomically remove `quantity` units for `order` if at least that many
    /// are in stock, recording the debit in the same write.
    ///
    /// Returns `false` without changing anything when stock is short or the
    /// product is gone or inactive.
    async fn debit_if_available(
        &self,
        order: OrderId,
        id: ProductId,
        quantity: u32,
    ) -> Result<bool, RepositoryError>;

    /// Whether a debit of product `id` for `order` has been recorded.
    ///
    /// Waits out any write still holding the product row, so a debit whose
    /// caller stopped waiting is seen once it commits.
    async fn debit_recorded(&self, order: OrderId, id: ProductId) -> Result<bool, RepositoryError>;
}

/// Order storage.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert an order and its items atomically.
    ///
    /// A tracking number already in use yields `Conflict`.
    async fn insert(&self, order: &NewOrder) -> Result<Order, RepositoryError>;

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// All orders inside `scope`, newest first.
    async fn find_all(&self, scope: OwnerScope) -> Result<Vec<Order>, RepositoryError>;

    /// Update an order unless it is terminal, as one conditional write.
    ///
    /// Returns `None` when nothing matched: the order is missing or terminal.
    async fn update(
        &self,
        id: OrderId,
        changes: &OrderUpdate,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Delete an order inside `scope`, or return `NotFound`.
    async fn delete(&self, id: OrderId, scope: OwnerScope) -> Result<(), RepositoryError>;
}

/// The set of stores the application runs against.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub customers: Arc<dyn CustomerStore>,
    pub products: Arc<dyn ProductStore>,
    pub orders: Arc<dyn OrderStore>,
    pool: Option<PgPool>,
}

impl Stores {
    /// Stores backed by a `PostgreSQL` pool.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            customers: Arc::new(PgCustomerRepository::new(pool.clone())),
            products: Arc::new(PgProductRepository::new(pool.clone())),
            orders: Arc::new(PgOrderRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Stores sharing one in-memory dataset.
    #[must_use]
    pub fn memory(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            customers: store.clone(),
            products: store.clone(),
            orders: store,
            pool: None,
        }
    }

    /// Check that the backing database answers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the database is unreachable.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply pending migrations from `crates/server/migrations`.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
