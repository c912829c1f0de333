//! Application state shared across handlers.

use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::{OrderConfig, ServerConfig};
use crate::db::Stores;
use crate::services::{RandomTrackingCodes, TrackingCodeGenerator};

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    orders: OrderConfig,
    stores: Stores,
    tokens: TokenService,
    tracking: Arc<dyn TrackingCodeGenerator>,
}

impl AppState {
    /// Build state from configuration, with an OS-seeded tracking generator.
    #[must_use]
    pub fn new(config: &ServerConfig, stores: Stores) -> Self {
        let tokens = TokenService::new(&config.jwt.secret, config.jwt.ttl);
        let tracking = Arc::new(RandomTrackingCodes::new(
            config.orders.tracking_prefix.clone(),
        ));
        Self::from_parts(config.orders.clone(), stores, tokens, tracking)
    }

    /// Build state from already constructed collaborators.
    #[must_use]
    pub fn from_parts(
        orders: OrderConfig,
        stores: Stores,
        tokens: TokenService,
        tracking: Arc<dyn TrackingCodeGenerator>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                orders,
                stores,
                tokens,
                tracking,
            }),
        }
    }

    #[must_use]
    pub fn orders_config(&self) -> &OrderConfig {
        &self.inner.orders
    }

    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.inner.stores
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    #[must_use]
    pub fn tracking(&self) -> &dyn TrackingCodeGenerator {
        self.inner.tracking.as_ref()
    }

    /// Deadline for each storage call.
    #[must_use]
    pub fn store_timeout(&self) -> std::time::Duration {
        self.inner.orders.store_timeout
    }
}
