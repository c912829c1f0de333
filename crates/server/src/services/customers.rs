//! Find-or-create of customers by email.

use std::time::Duration;

use shopkeep_core::CustomerId;

use super::deadline::with_deadline;
use crate::db::{CustomerStore, RepositoryError};
use crate::models::CustomerProfile;

/// Resolves the customer an order belongs to.
pub struct CustomerResolver<'a> {
    customers: &'a dyn CustomerStore,
    timeout: Duration,
}

impl<'a> CustomerResolver<'a> {
    #[must_use]
    pub const fn new(customers: &'a dyn CustomerStore, timeout: Duration) -> Self {
        Self { customers, timeout }
    }

    /// Return the id of the customer with `profile.email`, creating it if needed.
    ///
    /// An existing customer is returned unchanged; the rest of `profile` only
    /// applies to a new record. When a concurrent request creates the same
    /// email first, the insert reports `Conflict` and the winner is re-read.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or times out.
    #[tracing::instrument(skip_all, fields(email = %profile.email))]
    pub async fn resolve_or_create(
        &self,
        profile: &CustomerProfile,
    ) -> Result<CustomerId, RepositoryError> {
        if let Some(existing) = self.find(profile).await? {
            return Ok(existing);
        }

        match with_deadline(
            self.timeout,
            "insert customer",
            self.customers.insert(profile),
        )
        .await
        {
            Ok(customer) => {
                tracing::info!(customer_id = %customer.id, "customer created");
                Ok(customer.id)
            }
            Err(RepositoryError::Conflict(_)) => {
                tracing::debug!("lost customer insert race, re-reading");
                self.find(profile).await?.ok_or(RepositoryError::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    async fn find(&self, profile: &CustomerProfile) -> Result<Option<CustomerId>, RepositoryError> {
        let customer = with_deadline(
            self.timeout,
            "find customer",
            self.customers.find_by_email(&profile.email),
        )
        .await?;
        Ok(customer.map(|c| c.id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use shopkeep_core::Email;

    use super::*;
    use crate::db::MemoryStore;

    fn profile(name: &str, email: &str) -> CustomerProfile {
        CustomerProfile {
            full_name: name.to_string(),
            email: Email::parse(email).unwrap(),
            phone: "0812345678".to_string(),
            address: "12 Soi Ari".to_string(),
        }
    }

    #[tokio::test]
    async fn test_same_email_same_customer() {
        let store = MemoryStore::new();
        let resolver = CustomerResolver::new(&store, Duration::from_secs(5));

        let first = resolver
            .resolve_or_create(&profile("Nok", "nok@mail.test"))
            .await
            .unwrap();
        let second = resolver
            .resolve_or_create(&profile("Someone Else", "NOK@mail.test"))
            .await
            .unwrap();
        assert_eq!(first, second);

        let customers = CustomerStore::list_all(&store).await.unwrap();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].full_name, "Nok");
    }

    #[tokio::test]
    async fn test_concurrent_creation_converges() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                CustomerResolver::new(store.as_ref(), Duration::from_secs(5))
                    .resolve_or_create(&profile("Nok", "nok@mail.test"))
                    .await
                    .unwrap()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(CustomerStore::list_all(store.as_ref()).await.unwrap().len(), 1);
    }
}
