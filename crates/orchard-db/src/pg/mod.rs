//! PostgreSQL repository implementations

mod admin_pause;
mod delivery;
mod subscription;

pub use admin_pause::PgAdminPauseRepository;
pub use delivery::PgDeliveryRepository;
pub use subscription::PgSubscriptionRepository;

use crate::DbPool;

/// All repositories bundled together
#[derive(Clone)]
pub struct Repositories {
    pub subscriptions: PgSubscriptionRepository,
    pub deliveries: PgDeliveryRepository,
    pub admin_pauses: PgAdminPauseRepository,
}

impl Repositories {
    /// Create all repositories from a database pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            subscriptions: PgSubscriptionRepository::new(pool.clone()),
            deliveries: PgDeliveryRepository::new(pool.clone()),
            admin_pauses: PgAdminPauseRepository::new(pool),
        }
    }
}
