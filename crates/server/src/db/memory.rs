//! In-memory store implementing every store trait.
//!
//! Backs the test suite and `SHOPKEEP_STORE=memory` development runs. Each
//! operation takes the lock once, so the uniqueness rules and conditional
//! writes of the `PostgreSQL` schema hold here too. Data is lost on restart.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use shopkeep_core::{CustomerId, Email, OrderId, ProductId, Role, UserId};

use super::{CustomerStore, OrderStore, OwnerScope, ProductStore, RepositoryError, UserStore};
use crate::models::{
    Customer, CustomerProfile, MAX_COUNT, NewOrder, NewProduct, NewUser, Order, OrderUpdate,
    Product, ProductUpdate, User,
};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    customers: BTreeMap<CustomerId, Customer>,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    debits: BTreeMap<(OrderId, ProductId), u32>,
    last_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn sku_taken(&self, sku: &str, except: Option<ProductId>) -> bool {
        self.products
            .values()
            .any(|p| p.sku == sku && Some(p.id) != except)
    }

    fn tracking_taken(&self, order: &NewOrder) -> bool {
        order.tracking_number.as_ref().is_some_and(|tn| {
            self.orders
                .values()
                .any(|o| o.tracking_number.as_ref() == Some(tn))
        })
    }
}

/// Thread-safe in-memory store. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a product regardless of its active flag.
    #[must_use]
    pub fn product(&self, id: ProductId) -> Option<Product> {
        self.read().products.get(&id).cloned()
    }

    /// Number of stored orders.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.read().orders.len()
    }
}

fn newest_first<T>(mut rows: Vec<T>, key: impl Fn(&T) -> (chrono::DateTime<Utc>, i32)) -> Vec<T> {
    rows.sort_by_key(|row| std::cmp::Reverse(key(row)));
    rows
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.write();
        if tables
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(RepositoryError::Conflict(
                "username or email already exists".to_string(),
            ));
        }

        let created = User {
            id: UserId::new(tables.next_id()),
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self.read().users.values().find(|u| &u.email == email).cloned())
    }

    async fn admin_exists(&self) -> Result<bool, RepositoryError> {
        Ok(self.read().users.values().any(|u| u.role == Role::Admin))
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn find_by_email(&self, email: &Email) -> Result<Option<Customer>, RepositoryError> {
        Ok(self
            .read()
            .customers
            .values()
            .find(|c| &c.email == email)
            .cloned())
    }

    async fn insert(&self, profile: &CustomerProfile) -> Result<Customer, RepositoryError> {
        let mut tables = self.write();
        if tables.customers.values().any(|c| c.email == profile.email) {
            return Err(RepositoryError::Conflict(
                "customer email already exists".to_string(),
            ));
        }

        let customer = Customer {
            id: CustomerId::new(tables.next_id()),
            full_name: profile.full_name.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            address: profile.address.clone(),
            created_at: Utc::now(),
        };
        tables.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn list_all(&self) -> Result<Vec<Customer>, RepositoryError> {
        let rows = self.read().customers.values().cloned().collect();
        Ok(newest_first(rows, |c| (c.created_at, c.id.as_i32())))
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = self.read().products.values().cloned().collect();
        Ok(newest_first(rows, |p| (p.created_at, p.id.as_i32())))
    }

    async fn find_active(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self
            .read()
            .products
            .get(&id)
            .filter(|p| p.is_active)
            .cloned())
    }

    async fn exists_by_sku(&self, sku: &str) -> Result<bool, RepositoryError> {
        Ok(self.read().sku_taken(sku, None))
    }

    async fn insert(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let mut tables = self.write();
        if tables.sku_taken(&product.sku, None) {
            return Err(RepositoryError::Conflict("SKU already exists".to_string()));
        }

        let created = Product {
            id: ProductId::new(tables.next_id()),
            created_by: product.created_by,
            name: product.name.clone(),
            sku: product.sku.clone(),
            price: product.price,
            stock: product.stock,
            is_active: product.is_active,
            created_at: Utc::now(),
        };
        tables.products.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        id: ProductId,
        changes: &ProductUpdate,
        scope: OwnerScope,
    ) -> Result<Product, RepositoryError> {
        let mut tables = self.write();
        let in_scope = tables
            .products
            .get(&id)
            .is_some_and(|p| scope.admits(Some(p.created_by)));
        if !in_scope {
            return Err(RepositoryError::NotFound);
        }
        if let Some(sku) = &changes.sku
            && tables.sku_taken(sku, Some(id))
        {
            return Err(RepositoryError::Conflict("SKU already exists".to_string()));
        }

        let product = tables
            .products
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        changes.apply_to(product);
        Ok(product.clone())
    }

    async fn delete(&self, id: ProductId, scope: OwnerScope) -> Result<(), RepositoryError> {
        let mut tables = self.write();
        match tables.products.get(&id) {
            Some(p) if scope.admits(Some(p.created_by)) => {
                tables.products.remove(&id);
                tables.debits.retain(|(_, product), _| *product != id);
                Ok(())
            }
            _ => Err(RepositoryError::NotFound),
        }
    }

    async fn adjust_stock(&self, id: ProductId, delta: i64) -> Result<(), RepositoryError> {
        let mut tables = self.write();
        let product = tables
            .products
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        let stock = i64::from(product.stock) + delta;
        if stock < 0 {
            return Err(RepositoryError::Conflict(
                "stock cannot go below zero".to_string(),
            ));
        }
        product.stock = u32::try_from(stock)
            .ok()
            .filter(|s| *s <= MAX_COUNT)
            .ok_or_else(|| RepositoryError::Conflict("stock out of range".to_string()))?;
        Ok(())
    }

    async fn debit_if_available(
        &self,
        order: OrderId,
        id: ProductId,
        quantity: u32,
    ) -> Result<bool, RepositoryError> {
        let mut guard = self.write();
        let tables = &mut *guard;
        if tables.debits.contains_key(&(order, id)) {
            return Err(RepositoryError::Conflict(
                "stock already debited for this order line".to_string(),
            ));
        }
        match tables.products.get_mut(&id) {
            Some(p) if p.is_active && p.stock >= quantity => {
                p.stock -= quantity;
                tables.debits.insert((order, id), quantity);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn debit_recorded(&self, order: OrderId, id: ProductId) -> Result<bool, RepositoryError> {
        Ok(self.read().debits.contains_key(&(order, id)))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tables = self.write();
        if tables.tracking_taken(order) {
            return Err(RepositoryError::Conflict(
                "tracking number already in use".to_string(),
            ));
        }

        let created = Order {
            id: OrderId::new(tables.next_id()),
            customer_id: order.customer_id,
            created_by: order.created_by,
            status: order.status,
            total_amount: order.total_amount,
            items: order.items.clone(),
            tracking_number: order.tracking_number.clone(),
            note: order.note.clone(),
            created_at: Utc::now(),
        };
        tables.orders.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.read().orders.get(&id).cloned())
    }

    async fn find_all(&self, scope: OwnerScope) -> Result<Vec<Order>, RepositoryError> {
        let rows = self
            .read()
            .orders
            .values()
            .filter(|o| scope.admits(o.created_by))
            .cloned()
            .collect();
        Ok(newest_first(rows, |o| (o.created_at, o.id.as_i32())))
    }

    async fn update(
        &self,
        id: OrderId,
        changes: &OrderUpdate,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut tables = self.write();
        if !tables
            .orders
            .get(&id)
            .is_some_and(|o| !o.status.is_terminal())
        {
            return Ok(None);
        }
        if let Some(tn) = &changes.tracking_number
            && tables
                .orders
                .values()
                .any(|o| o.id != id && o.tracking_number.as_ref() == Some(tn))
        {
            return Err(RepositoryError::Conflict(
                "tracking number already in use".to_string(),
            ));
        }

        let order = tables.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        changes.apply_to(order);
        Ok(Some(order.clone()))
    }

    async fn delete(&self, id: OrderId, scope: OwnerScope) -> Result<(), RepositoryError> {
        let mut tables = self.write();
        match tables.orders.get(&id) {
            Some(o) if scope.admits(o.created_by) => {
                tables.orders.remove(&id);
                tables.debits.retain(|(order, _), _| *order != id);
                Ok(())
            }
            _ => Err(RepositoryError::NotFound),
        }
    }
}
