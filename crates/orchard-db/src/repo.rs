//! Repository traits
//!
//! Define async repository interfaces for the scheduling core. The core
//! only ever talks to storage through these traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use orchard_types::SubscriptionItem;

use crate::error::DbResult;
use crate::models::*;

/// Which subscriptions a bulk query should return
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionScope {
    /// Every user
    All,
    /// Only the listed users
    Users(Vec<Uuid>),
}

/// Subscription repository trait
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Find a subscription by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<SubscriptionRow>>;

    /// Find all subscriptions for a user, newest first
    async fn find_by_user_id(&self, user_id: Uuid) -> DbResult<Vec<SubscriptionRow>>;

    /// Insert a new subscription
    async fn create(&self, sub: &SubscriptionRow) -> DbResult<SubscriptionRow>;

    /// Overwrite a subscription if its stored version still equals `sub.version`.
    ///
    /// Returns the stored row with the bumped version, or
    /// [`DbError::VersionConflict`](crate::DbError::VersionConflict) when another
    /// writer got there first.
    async fn update(&self, sub: &SubscriptionRow) -> DbResult<SubscriptionRow>;

    /// List `active` subscriptions within a scope
    async fn list_active(&self, scope: &SubscriptionScope) -> DbResult<Vec<SubscriptionRow>>;

    /// List subscriptions linked to an admin pause, plus `admin_paused` rows
    /// that lost their link
    async fn list_for_admin_pause(&self, admin_pause_id: Uuid) -> DbResult<Vec<SubscriptionRow>>;

    /// List `paused` subscriptions whose reactivation deadline is before `now`
    async fn list_paused_past_deadline(&self, now: DateTime<Utc>)
        -> DbResult<Vec<SubscriptionRow>>;

    /// List `active` subscriptions ending before `before` that have not had
    /// a renewal reminder
    async fn list_due_for_renewal_notice(
        &self,
        before: DateTime<Utc>,
    ) -> DbResult<Vec<SubscriptionRow>>;
}

/// New delivery input
#[derive(Debug, Clone)]
pub struct CreateDelivery {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub delivery_date: DateTime<Utc>,
    pub items: Vec<SubscriptionItem>,
}

/// Delivery repository trait
#[async_trait]
pub trait DeliveryRepository: Send + Sync {
    /// Deliveries for a subscription on or after `from`, ordered by date
    async fn find_by_subscription(
        &self,
        subscription_id: Uuid,
        from: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<DeliveryRow>>;

    /// Delete `scheduled` rows dated on or after `from` and insert the new batch.
    ///
    /// Returns the number of rows inserted.
    async fn replace_scheduled(
        &self,
        subscription_id: Uuid,
        from: DateTime<Utc>,
        deliveries: Vec<CreateDelivery>,
    ) -> DbResult<u64>;

    /// Mark `scheduled` rows dated on or after `from` as `skipped`.
    ///
    /// Returns the number of rows changed.
    async fn skip_scheduled(&self, subscription_id: Uuid, from: DateTime<Utc>) -> DbResult<u64>;
}

/// Create admin pause input
#[derive(Debug, Clone)]
pub struct CreateAdminPause {
    pub id: Uuid,
    pub pause_type: String,
    pub affected_user_ids: Vec<Uuid>,
    pub reason: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
}

/// Admin pause repository trait
#[async_trait]
pub trait AdminPauseRepository: Send + Sync {
    /// Find an admin pause by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<AdminPauseRow>>;

    /// Create a new admin pause in `active` status
    async fn create(&self, pause: CreateAdminPause) -> DbResult<AdminPauseRow>;

    /// The admin pause in effect at `now` for a user.
    ///
    /// A fleet-wide pause wins over a selected-users pause. With no user,
    /// only fleet-wide pauses are considered.
    async fn find_active_for_user(
        &self,
        user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> DbResult<Option<AdminPauseRow>>;

    /// Most recent admin pauses first
    async fn list_recent(&self, limit: i64) -> DbResult<Vec<AdminPauseRow>>;

    /// Record how many subscriptions the pause moved
    async fn set_affected_count(&self, id: Uuid, count: i32) -> DbResult<()>;

    /// Mark the pause as reactivated
    async fn mark_reactivated(
        &self,
        id: Uuid,
        reactivated_at: DateTime<Utc>,
        reactivated_by: Option<Uuid>,
    ) -> DbResult<()>;
}
