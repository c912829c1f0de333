//! Product catalog management.

use std::time::Duration;

use thiserror::Error;

use shopkeep_core::{Principal, ProductId};

use super::deadline::with_deadline;
use crate::db::{OwnerScope, ProductStore, RepositoryError};
use crate::error::AppError;
use crate::models::{Product, ProductDraft, ProductUpdate};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("staff or admin role required")]
    Forbidden,

    #[error("SKU already exists")]
    SkuTaken,

    #[error("Product not found")]
    NotFound,

    #[error("no product fields to update")]
    EmptyUpdate,

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CatalogError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(_) => Self::SkuTaken,
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Forbidden => Self::Forbidden(err.to_string()),
            CatalogError::SkuTaken => Self::Conflict(err.to_string()),
            CatalogError::NotFound => Self::NotFound(err.to_string()),
            CatalogError::EmptyUpdate => Self::Validation(err.to_string()),
            CatalogError::Repository(e) => e.into(),
        }
    }
}

/// Product operations on behalf of a principal.
pub struct CatalogService<'a> {
    products: &'a dyn ProductStore,
    timeout: Duration,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(products: &'a dyn ProductStore, timeout: Duration) -> Self {
        Self { products, timeout }
    }

    /// The whole catalog, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(with_deadline(self.timeout, "list products", self.products.list_all()).await?)
    }

    /// Add a product owned by `principal`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::SkuTaken` if the SKU exists, including when a
    /// concurrent insert wins the race.
    #[tracing::instrument(skip(self, draft), fields(sku = %draft.sku))]
    pub async fn create(
        &self,
        principal: &Principal,
        draft: ProductDraft,
    ) -> Result<Product, CatalogError> {
        let owner = principal.owner().ok_or(CatalogError::Forbidden)?;
        let product = draft.owned_by(owner);

        if with_deadline(
            self.timeout,
            "check sku",
            self.products.exists_by_sku(&product.sku),
        )
        .await?
        {
            return Err(CatalogError::SkuTaken);
        }

        let created =
            with_deadline(self.timeout, "insert product", self.products.insert(&product)).await?;
        tracing::info!(product_id = %created.id, "product created");
        Ok(created)
    }

    /// Apply a partial update. Staff may only change products they created.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyUpdate` when `changes` sets no field,
    /// `CatalogError::NotFound` when the product is missing or not the
    /// caller's, and `CatalogError::SkuTaken` for a duplicate SKU.
    #[tracing::instrument(skip(self, changes))]
    pub async fn update(
        &self,
        id: ProductId,
        changes: &ProductUpdate,
        principal: &Principal,
    ) -> Result<Product, CatalogError> {
        let scope = OwnerScope::for_mutation(principal).ok_or(CatalogError::Forbidden)?;
        if changes.is_empty() {
            return Err(CatalogError::EmptyUpdate);
        }
        let product = with_deadline(
            self.timeout,
            "update product",
            self.products.update(id, changes, scope),
        )
        .await?;
        tracing::info!(product_id = %product.id, "product updated");
        Ok(product)
    }

    /// Delete a product. Staff may only delete products they created.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` when the product is missing or not
    /// the caller's.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: ProductId, principal: &Principal) -> Result<(), CatalogError> {
        let scope = OwnerScope::for_mutation(principal).ok_or(CatalogError::Forbidden)?;
        with_deadline(self.timeout, "delete product", self.products.delete(id, scope)).await?;
        tracing::info!(product_id = %id, "product deleted");
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

    const ADMIN: Principal = Principal::Admin(UserId::new(1));
    const S1: Principal = Principal::Staff(UserId::new(2));
    const S2: Principal = Principal::Staff(UserId::new(3));

    fn new_product(sku: &str) -> ProductDraft {
        ProductDraft {
            name: "Mango jam".to_string(),
            sku: sku.to_string(),
            price: Money::new(Decimal::new(999, 2)).unwrap(),
            stock: 10,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_create_sets_owner_and_rejects_duplicate_sku() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store, Duration::from_secs(5));

        let product = catalog.create(&S1, new_product("SKU1")).await.unwrap();
        assert_eq!(product.created_by, UserId::new(2));

        let again = catalog.create(&S2, new_product("SKU1")).await;
        assert!(matches!(again, Err(CatalogError::SkuTaken)));

        let public = catalog.create(&Principal::Public, new_product("SKU2")).await;
        assert!(matches!(public, Err(CatalogError::Forbidden)));
    }

    #[tokio::test]
    async fn test_owner_scoped_delete() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store, Duration::from_secs(5));
        let product = catalog.create(&S1, new_product("SKU1")).await.unwrap();

        let denied = catalog.delete(product.id, &S2).await;
        assert!(matches!(denied, Err(CatalogError::NotFound)));
        assert!(store.product(product.id).is_some());

        catalog.delete(product.id, &ADMIN).await.unwrap();
        assert!(store.product(product.id).is_none());
    }

    #[tokio::test]
    async fn test_partial_update() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store, Duration::from_secs(5));
        let product = catalog.create(&S1, new_product("SKU1")).await.unwrap();
        catalog.create(&S1, new_product("SKU2")).await.unwrap();

        let changes = ProductUpdate {
            stock: Some(3),
            ..ProductUpdate::default()
        };
        let updated = catalog.update(product.id, &changes, &S1).await.unwrap();
        assert_eq!(updated.stock, 3);
        assert_eq!(updated.sku, "SKU1");
        assert_eq!(updated.price, product.price);

        let clash = ProductUpdate {
            sku: Some("SKU2".to_string()),
            ..ProductUpdate::default()
        };
        assert!(matches!(
            catalog.update(product.id, &clash, &S1).await,
            Err(CatalogError::SkuTaken)
        ));
        assert!(matches!(
            catalog.update(product.id, &changes, &S2).await,
            Err(CatalogError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_empty_update_is_rejected() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store, Duration::from_secs(5));
        let product = catalog.create(&S1, new_product("SKU1")).await.unwrap();

        let result = catalog.update(product.id, &ProductUpdate::default(), &S1).await;
        assert!(matches!(result, Err(CatalogError::EmptyUpdate)));
        assert_eq!(AppError::from(CatalogError::EmptyUpdate).kind(), "ValidationError");
        assert_eq!(store.product(product.id).unwrap().stock, 10);
    }
}
