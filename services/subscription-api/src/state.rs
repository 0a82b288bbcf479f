//! Application state for the Subscription API service.

use std::sync::Arc;

use orchard_core::SubscriptionService;
use orchard_db::pg::{PgAdminPauseRepository, PgDeliveryRepository, PgSubscriptionRepository};
use orchard_db::DbPool;

use crate::config::Config;

/// The service wired to PostgreSQL storage
pub type Service =
    SubscriptionService<PgSubscriptionRepository, PgDeliveryRepository, PgAdminPauseRepository>;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Subscription service (lifecycle, admin pauses, maintenance)
    pub subscriptions: Arc<Service>,
    /// Database pool (readiness checks)
    pub pool: DbPool,
    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state
    pub fn new(subscriptions: Service, pool: DbPool, config: Config) -> Self {
        Self {
            subscriptions: Arc::new(subscriptions),
            pool,
            config: Arc::new(config),
        }
    }

    /// Get request timeout from config
    pub fn request_timeout(&self) -> std::time::Duration {
        self.config.request_timeout
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
