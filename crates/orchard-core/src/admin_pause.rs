//! Admin pause coordination
//!
//! An admin pause moves every matching `active` subscription to
//! `admin_paused` and lifting it moves them back. Both directions run one
//! subscription at a time, commit each independently and report partial
//! success through [`BulkOutcome`]. Re-running a lift is safe: subscriptions
//! already back to `active` are skipped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use orchard_db::{
    AdminPauseRepository, CreateAdminPause, DeliveryRepository, SubscriptionRepository,
    SubscriptionRow, SubscriptionScope,
};
use orchard_types::{
    AdminPause, AdminPauseId, AdminPauseStatus, PauseType, Subscription, SubscriptionId, UserId,
};

use crate::bulk::{BulkOutcome, ItemOutcome};
use crate::clock::Clock;
use crate::error::{SubscriptionError, SubscriptionResult};
use crate::lifecycle::{AdminReactivation, SubscriptionLifecycle};
use crate::notify::{NotificationDispatcher, NotificationKind, SubscriptionEvent};
use crate::planner::DeliveryPlanner;
use crate::store;

/// Input for a new admin pause
#[derive(Debug, Clone)]
pub struct CreateAdminPauseRequest {
    pub pause_type: PauseType,
    /// Users covered; required for `Selected`, ignored for `All`
    pub user_ids: Vec<UserId>,
    /// Defaults to now
    pub start_date: Option<DateTime<Utc>>,
    /// `None` for an indefinite pause
    pub end_date: Option<DateTime<Utc>>,
    pub reason: String,
    pub admin_user_id: Option<UserId>,
}

impl CreateAdminPauseRequest {
    pub fn validate(&self, now: DateTime<Utc>) -> SubscriptionResult<()> {
        if self.reason.trim().is_empty() {
            return Err(SubscriptionError::Validation("reason is required".to_string()));
        }
        if self.pause_type == PauseType::Selected && self.user_ids.is_empty() {
            return Err(SubscriptionError::Validation(
                "a selected-users pause needs at least one user".to_string(),
            ));
        }
        let start = self.start_date.unwrap_or(now);
        if let Some(end) = self.end_date {
            if end < start {
                return Err(SubscriptionError::Validation(
                    "end date must not precede start date".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Result of applying an admin pause
#[derive(Debug, Clone, Serialize)]
pub struct AdminPauseApplied {
    pub admin_pause: AdminPause,
    pub outcome: BulkOutcome,
}

/// Result of lifting an admin pause
#[derive(Debug, Clone, Serialize)]
pub struct AdminPauseLifted {
    pub admin_pause_id: AdminPauseId,
    pub outcome: BulkOutcome,
}

/// Applies and lifts admin pauses across many subscriptions
pub struct AdminPauseCoordinator<S, D, A>
where
    S: SubscriptionRepository,
    D: DeliveryRepository,
    A: AdminPauseRepository,
{
    subscriptions: Arc<S>,
    admin_pauses: Arc<A>,
    planner: DeliveryPlanner<D>,
    lifecycle: SubscriptionLifecycle,
    dispatcher: NotificationDispatcher,
    clock: Arc<dyn Clock>,
}

impl<S, D, A> AdminPauseCoordinator<S, D, A>
where
    S: SubscriptionRepository,
    D: DeliveryRepository,
    A: AdminPauseRepository,
{
    pub fn new(
        subscriptions: Arc<S>,
        admin_pauses: Arc<A>,
        planner: DeliveryPlanner<D>,
        lifecycle: SubscriptionLifecycle,
        dispatcher: NotificationDispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            subscriptions,
            admin_pauses,
            planner,
            lifecycle,
            dispatcher,
            clock,
        }
    }

    /// Persist the directive, then hold every matching active subscription
    #[instrument(skip(self, request), fields(pause_type = %request.pause_type))]
    pub async fn create_admin_pause(
        &self,
        request: CreateAdminPauseRequest,
    ) -> SubscriptionResult<AdminPauseApplied> {
        let now = self.clock.utc_now();
        request.validate(now)?;

        let user_ids: Vec<Uuid> = match request.pause_type {
            PauseType::All => Vec::new(),
            PauseType::Selected => request.user_ids.iter().map(|u| u.0).collect(),
        };
        let scope = match request.pause_type {
            PauseType::All => SubscriptionScope::All,
            PauseType::Selected => SubscriptionScope::Users(user_ids.clone()),
        };

        let row = self
            .admin_pauses
            .create(CreateAdminPause {
                id: Uuid::new_v4(),
                pause_type: request.pause_type.as_str().to_string(),
                affected_user_ids: user_ids,
                reason: request.reason.trim().to_string(),
                start_date: request.start_date.unwrap_or(now),
                end_date: request.end_date,
                created_by: request.admin_user_id.map(|u| u.0),
            })
            .await?;
        let mut admin_pause = AdminPause::try_from(row)?;

        let rows = self.subscriptions.list_active(&scope).await?;
        let mut outcome = BulkOutcome::default();
        for row in rows {
            let id = SubscriptionId(row.id);
            let result = self.hold(row, &admin_pause, now).await;
            if let Err(e) = &result {
                warn!(subscription_id = %id, error = %e, "Admin pause failed for subscription");
            }
            outcome.record(id, result);
        }

        let affected = i32::try_from(outcome.processed_count).unwrap_or(i32::MAX);
        if let Err(e) = self
            .admin_pauses
            .set_affected_count(admin_pause.id.0, affected)
            .await
        {
            error!(admin_pause_id = %admin_pause.id, error = %e, "Failed to record affected count");
        }
        admin_pause.affected_subscription_count = outcome.processed_count;

        info!(
            admin_pause_id = %admin_pause.id,
            processed = outcome.processed_count,
            failed = outcome.failed_count(),
            "Admin pause applied"
        );

        Ok(AdminPauseApplied {
            admin_pause,
            outcome,
        })
    }

    async fn hold(
        &self,
        row: SubscriptionRow,
        admin_pause: &AdminPause,
        now: DateTime<Utc>,
    ) -> SubscriptionResult<ItemOutcome> {
        let sub = Subscription::try_from(row)?;
        let held = self.lifecycle.admin_pause(&sub, admin_pause, now)?;
        let saved = store::save_subscription(self.subscriptions.as_ref(), &held).await?;

        self.planner.skip_future_best_effort(saved.id, now).await;
        self.dispatcher.dispatch(
            SubscriptionEvent::for_subscription(NotificationKind::AdminPause, &saved, now)
                .with_details(serde_json::json!({
                    "admin_pause_id": admin_pause.id,
                    "reason": admin_pause.reason,
                    "end_date": admin_pause.end_date,
                })),
        );
        Ok(ItemOutcome::Processed)
    }

    /// Mark the directive lifted, then resume every subscription it holds.
    ///
    /// Also picks up rows left half-applied by an earlier failure.
    #[instrument(skip(self))]
    pub async fn reactivate_admin_pause(
        &self,
        admin_pause_id: AdminPauseId,
        admin_user_id: Option<UserId>,
    ) -> SubscriptionResult<AdminPauseLifted> {
        let now = self.clock.utc_now();
        let admin_pause =
            store::load_admin_pause(self.admin_pauses.as_ref(), admin_pause_id).await?;

        if admin_pause.status == AdminPauseStatus::Active {
            self.admin_pauses
                .mark_reactivated(admin_pause_id.0, now, admin_user_id.map(|u| u.0))
                .await
                .map_err(|e| match e {
                    orchard_db::DbError::NotFound => SubscriptionError::AdminPauseNotFound,
                    other => other.into(),
                })?;
        }

        let rows = self.subscriptions.list_for_admin_pause(admin_pause_id.0).await?;
        let mut outcome = BulkOutcome::default();
        for row in rows {
            let id = SubscriptionId(row.id);
            let result = self.release(row, now, admin_user_id).await;
            if let Err(e) = &result {
                warn!(
                    subscription_id = %id,
                    error = %e,
                    "Admin reactivation failed for subscription"
                );
            }
            outcome.record(id, result);
        }

        info!(
            admin_pause_id = %admin_pause_id,
            processed = outcome.processed_count,
            skipped = outcome.skipped_count,
            failed = outcome.failed_count(),
            "Admin pause lifted"
        );

        Ok(AdminPauseLifted {
            admin_pause_id,
            outcome,
        })
    }

    async fn release(
        &self,
        row: SubscriptionRow,
        now: DateTime<Utc>,
        admin_user_id: Option<UserId>,
    ) -> SubscriptionResult<ItemOutcome> {
        let sub = Subscription::try_from(row)?;
        let (updated, resumed) = match self.lifecycle.admin_reactivate(&sub, now, admin_user_id)? {
            AdminReactivation::AlreadyActive => return Ok(ItemOutcome::Skipped),
            AdminReactivation::Resumed { subscription, .. } => (subscription, true),
            AdminReactivation::Reconciled(subscription) => (subscription, false),
        };

        let saved = store::save_subscription(self.subscriptions.as_ref(), &updated).await?;
        let dates = self.planner.schedule_for(&saved, now);
        self.planner.replace_best_effort(&saved, &dates, now).await;

        if resumed {
            self.dispatcher.dispatch(
                SubscriptionEvent::for_subscription(NotificationKind::AdminReactivate, &saved, now)
                    .with_details(serde_json::json!({
                        "next_delivery_date": saved.next_delivery_date,
                        "subscription_end_date": saved.subscription_end_date,
                    })),
            );
        }
        Ok(ItemOutcome::Processed)
    }

    /// Most recent directives first
    pub async fn list_admin_pauses(&self, limit: i64) -> SubscriptionResult<Vec<AdminPause>> {
        let rows = self.admin_pauses.list_recent(limit.clamp(1, 500)).await?;
        store::decode_all(rows)
    }

    /// The directive holding deliveries for `user_id` right now
    pub async fn active_admin_pause(
        &self,
        user_id: Option<UserId>,
    ) -> SubscriptionResult<Option<AdminPause>> {
        store::active_admin_pause(self.admin_pauses.as_ref(), user_id, self.clock.utc_now()).await
    }
}
