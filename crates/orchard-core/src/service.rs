//! Subscription service - ties together lifecycle rules, scheduling,
//! storage and notifications

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument, warn};

use orchard_db::{
    AdminPauseRepository, DeliveryRepository, SubscriptionRepository, SubscriptionScope,
};
use orchard_types::{
    AdminPause, AdminPauseId, Delivery, DeliveryAddress, DeliveryFrequency, PauseState, PlanId,
    Subscription, SubscriptionId, SubscriptionItem, SubscriptionStatus, UserId,
};

use crate::admin_pause::{
    AdminPauseApplied, AdminPauseCoordinator, AdminPauseLifted, CreateAdminPauseRequest,
};
use crate::bulk::{BulkOutcome, ItemOutcome};
use crate::calendar::add_months;
use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::error::{SubscriptionError, SubscriptionResult};
use crate::lifecycle::{ReactivationOutcome, SubscriptionLifecycle};
use crate::notify::{NotificationDispatcher, NotificationKind, SubscriptionEvent};
use crate::planner::DeliveryPlanner;
use crate::pricing::{calculate_subscription_pricing, PricingBreakdown};
use crate::store;

/// Input for a new subscription
#[derive(Debug, Clone)]
pub struct CreateSubscriptionRequest {
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub customer_email: Option<String>,
    pub delivery_frequency: DeliveryFrequency,
    pub duration_months: u32,
    /// Price per month before discount
    pub base_price: Decimal,
    pub items: Vec<SubscriptionItem>,
    pub delivery_address: DeliveryAddress,
}

impl CreateSubscriptionRequest {
    /// Shape checks; duration and price ranges are checked by pricing
    pub fn validate(&self) -> SubscriptionResult<()> {
        if self.items.is_empty() {
            return Err(SubscriptionError::Validation(
                "at least one item is required".to_string(),
            ));
        }
        if let Some(item) = self.items.iter().find(|i| i.quantity == 0) {
            return Err(SubscriptionError::Validation(format!(
                "quantity for '{}' must be at least 1",
                item.name
            )));
        }
        let address = &self.delivery_address;
        for (field, value) in [
            ("address line", &address.line1),
            ("city", &address.city),
            ("postal code", &address.postal_code),
        ] {
            if value.trim().is_empty() {
                return Err(SubscriptionError::Validation(format!("{field} is required")));
            }
        }
        Ok(())
    }
}

/// A newly created subscription
#[derive(Debug, Clone, Serialize)]
pub struct CreatedSubscription {
    pub subscription: Subscription,
    pub pricing: PricingBreakdown,
    pub first_delivery_date: DateTime<Utc>,
    /// Set when an admin pause moved the first delivery
    pub advisory_message: Option<String>,
}

/// A paused subscription
#[derive(Debug, Clone, Serialize)]
pub struct PausedSubscription {
    pub subscription: Subscription,
    pub reactivation_deadline: DateTime<Utc>,
}

/// A reactivated subscription
#[derive(Debug, Clone, Serialize)]
pub struct ReactivatedSubscription {
    pub subscription: Subscription,
    pub next_delivery_date: DateTime<Utc>,
    pub extended_end_date: DateTime<Utc>,
    pub advisory_message: Option<String>,
}

/// Repositories the service works against
pub struct ServiceRepos<S, D, A> {
    pub subscriptions: Arc<S>,
    pub deliveries: Arc<D>,
    pub admin_pauses: Arc<A>,
}

/// Subscription service
///
/// Provides the request surface for:
/// - Subscription creation, pause and reactivation
/// - Admin pauses across many subscriptions
/// - Periodic maintenance (expiry, schedule regeneration, renewal reminders)
pub struct SubscriptionService<S, D, A>
where
    S: SubscriptionRepository,
    D: DeliveryRepository,
    A: AdminPauseRepository,
{
    config: SchedulerConfig,
    subscriptions: Arc<S>,
    deliveries: Arc<D>,
    admin_pauses: Arc<A>,
    lifecycle: SubscriptionLifecycle,
    planner: DeliveryPlanner<D>,
    coordinator: AdminPauseCoordinator<S, D, A>,
    dispatcher: NotificationDispatcher,
    clock: Arc<dyn Clock>,
}

impl<S, D, A> SubscriptionService<S, D, A>
where
    S: SubscriptionRepository,
    D: DeliveryRepository,
    A: AdminPauseRepository,
{
    /// Create a new subscription service
    pub fn new(
        repos: ServiceRepos<S, D, A>,
        config: SchedulerConfig,
        clock: Arc<dyn Clock>,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        let lifecycle = config.lifecycle();
        let planner = DeliveryPlanner::new(Arc::clone(&repos.deliveries), config.generator());
        let coordinator = AdminPauseCoordinator::new(
            Arc::clone(&repos.subscriptions),
            Arc::clone(&repos.admin_pauses),
            planner.clone(),
            lifecycle.clone(),
            dispatcher.clone(),
            Arc::clone(&clock),
        );

        Self {
            config,
            subscriptions: repos.subscriptions,
            deliveries: repos.deliveries,
            admin_pauses: repos.admin_pauses,
            lifecycle,
            planner,
            coordinator,
            dispatcher,
            clock,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    // =========================================================================
    // Subscription lifecycle
    // =========================================================================

    /// Create a subscription.
    ///
    /// An admin pause covering the user never blocks creation; it only moves
    /// the first delivery past the pause and adds an advisory message.
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> SubscriptionResult<CreatedSubscription> {
        request.validate()?;
        let pricing = calculate_subscription_pricing(request.base_price, request.duration_months)?;

        let now = self.clock.utc_now();
        let admin_pause =
            store::active_admin_pause(self.admin_pauses.as_ref(), Some(request.user_id), now)
                .await?;
        let first = self.lifecycle.generator().first_delivery(
            now,
            request.delivery_frequency,
            admin_pause.as_ref(),
        );

        let end_date =
            add_months(now, request.duration_months) + Duration::days(first.delayed_days);
        let sub = Subscription {
            id: SubscriptionId::new(),
            user_id: request.user_id,
            plan_id: request.plan_id,
            customer_email: request.customer_email,
            status: SubscriptionStatus::Active,
            delivery_frequency: request.delivery_frequency,
            items: request.items,
            delivery_address: request.delivery_address,
            subscription_start_date: now,
            subscription_end_date: end_date,
            next_delivery_date: first.date,
            schedule_anchor: first.date,
            pricing: pricing.snapshot(request.duration_months),
            pause: PauseState::None,
            admin_reactivated_at: None,
            admin_reactivated_by: None,
            renewal_notification_sent: false,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        let sub = store::insert_subscription(self.subscriptions.as_ref(), &sub).await?;

        let dates = self.planner.schedule_for(&sub, now);
        self.planner.replace_best_effort(&sub, &dates, now).await;

        if let Some(advisory) = &first.advisory {
            info!(subscription_id = %sub.id, %advisory, "First delivery moved by admin pause");
        }
        self.dispatcher.dispatch(
            SubscriptionEvent::for_subscription(NotificationKind::Created, &sub, now).with_details(
                serde_json::json!({
                    "first_delivery_date": first.date,
                    "final_price": pricing.final_price,
                    "advisory": first.advisory,
                }),
            ),
        );
        info!(subscription_id = %sub.id, deliveries = dates.len(), "Subscription created");

        Ok(CreatedSubscription {
            subscription: sub,
            pricing,
            first_delivery_date: first.date,
            advisory_message: first.advisory,
        })
    }

    /// active → paused; future deliveries are skipped
    #[instrument(skip(self))]
    pub async fn pause_subscription(
        &self,
        id: SubscriptionId,
        reason: Option<String>,
    ) -> SubscriptionResult<PausedSubscription> {
        let now = self.clock.utc_now();
        let sub = store::load_subscription(self.subscriptions.as_ref(), id).await?;
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());

        let paused = self.lifecycle.pause(&sub, reason, now)?;
        let saved = store::save_subscription(self.subscriptions.as_ref(), &paused).await?;
        let reactivation_deadline = saved
            .user_pause()
            .map(|p| p.reactivation_deadline)
            .ok_or_else(|| SubscriptionError::Internal("pause details lost on save".to_string()))?;

        self.planner.skip_future_best_effort(saved.id, now).await;
        self.dispatcher.dispatch(
            SubscriptionEvent::for_subscription(NotificationKind::Pause, &saved, now).with_details(
                serde_json::json!({
                    "reason": saved.user_pause().and_then(|p| p.pause_reason.clone()),
                    "reactivation_deadline": reactivation_deadline,
                }),
            ),
        );
        info!(subscription_id = %saved.id, %reactivation_deadline, "Subscription paused");

        Ok(PausedSubscription {
            subscription: saved,
            reactivation_deadline,
        })
    }

    /// paused → active.
    ///
    /// Past the deadline the subscription is expired and persisted, and the
    /// call fails with [`SubscriptionError::ReactivationWindowExpired`].
    #[instrument(skip(self))]
    pub async fn reactivate_subscription(
        &self,
        id: SubscriptionId,
        explicit_date: Option<NaiveDate>,
    ) -> SubscriptionResult<ReactivatedSubscription> {
        let now = self.clock.utc_now();
        let sub = store::load_subscription(self.subscriptions.as_ref(), id).await?;
        let admin_pause =
            store::active_admin_pause(self.admin_pauses.as_ref(), Some(sub.user_id), now).await?;

        match self
            .lifecycle
            .reactivate(&sub, now, explicit_date, admin_pause.as_ref())?
        {
            ReactivationOutcome::Expired(expired) => {
                let deadline = sub
                    .user_pause()
                    .map(|p| p.reactivation_deadline)
                    .unwrap_or(now);
                self.persist_expiry(&expired, now).await?;
                Err(SubscriptionError::ReactivationWindowExpired { deadline })
            }
            ReactivationOutcome::Reactivated {
                subscription,
                pause_days,
                advisory,
            } => {
                let saved =
                    store::save_subscription(self.subscriptions.as_ref(), &subscription).await?;
                let dates = self.planner.schedule_for(&saved, now);
                self.planner.replace_best_effort(&saved, &dates, now).await;

                self.dispatcher.dispatch(
                    SubscriptionEvent::for_subscription(NotificationKind::Reactivate, &saved, now)
                        .with_details(serde_json::json!({
                            "next_delivery_date": saved.next_delivery_date,
                            "subscription_end_date": saved.subscription_end_date,
                            "pause_days": pause_days,
                        })),
                );
                info!(subscription_id = %saved.id, pause_days, "Subscription reactivated");

                Ok(ReactivatedSubscription {
                    next_delivery_date: saved.next_delivery_date,
                    extended_end_date: saved.subscription_end_date,
                    subscription: saved,
                    advisory_message: advisory,
                })
            }
        }
    }

    async fn persist_expiry(
        &self,
        expired: &Subscription,
        now: DateTime<Utc>,
    ) -> SubscriptionResult<Subscription> {
        let saved = store::save_subscription(self.subscriptions.as_ref(), expired).await?;
        self.planner.skip_future_best_effort(saved.id, now).await;
        self.dispatcher.dispatch(SubscriptionEvent::for_subscription(
            NotificationKind::Expired,
            &saved,
            now,
        ));
        info!(subscription_id = %saved.id, "Subscription expired");
        Ok(saved)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Price a plan without creating anything
    pub fn quote_pricing(
        &self,
        base_price: Decimal,
        duration_months: u32,
    ) -> SubscriptionResult<PricingBreakdown> {
        Ok(calculate_subscription_pricing(base_price, duration_months)?)
    }

    pub async fn get_subscription(&self, id: SubscriptionId) -> SubscriptionResult<Subscription> {
        store::load_subscription(self.subscriptions.as_ref(), id).await
    }

    /// Every delivery row for a subscription, oldest first
    pub async fn list_deliveries(&self, id: SubscriptionId) -> SubscriptionResult<Vec<Delivery>> {
        // 404 for unknown subscriptions rather than an empty list
        store::load_subscription(self.subscriptions.as_ref(), id).await?;
        let rows = self.deliveries.find_by_subscription(id.0, None).await?;
        store::decode_all(rows)
    }

    pub async fn list_user_subscriptions(
        &self,
        user_id: UserId,
    ) -> SubscriptionResult<Vec<Subscription>> {
        let rows = self.subscriptions.find_by_user_id(user_id.0).await?;
        store::decode_all(rows)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Rebuild the future calendar of one active subscription.
    ///
    /// Returns the number of deliveries written.
    #[instrument(skip(self))]
    pub async fn regenerate_schedule(&self, id: SubscriptionId) -> SubscriptionResult<u64> {
        let now = self.clock.utc_now();
        let sub = store::load_subscription(self.subscriptions.as_ref(), id).await?;
        if sub.status != SubscriptionStatus::Active {
            return Err(SubscriptionError::invalid_transition(sub.status, "regenerate"));
        }
        self.regenerate(sub, now).await
    }

    async fn regenerate(&self, sub: Subscription, now: DateTime<Utc>) -> SubscriptionResult<u64> {
        let dates = self.planner.schedule_for(&sub, now);

        let sub = match dates.first() {
            Some(first) if *first != sub.next_delivery_date => {
                let mut rolled = sub.clone();
                rolled.next_delivery_date = *first;
                rolled.updated_at = now;
                store::save_subscription(self.subscriptions.as_ref(), &rolled).await?
            }
            _ => sub,
        };

        self.planner.replace(&sub, &dates, now).await
    }

    /// Rebuild the calendar of every active subscription
    #[instrument(skip(self))]
    pub async fn regenerate_schedules(&self) -> SubscriptionResult<BulkOutcome> {
        let now = self.clock.utc_now();
        let rows = self.subscriptions.list_active(&SubscriptionScope::All).await?;

        let mut outcome = BulkOutcome::default();
        for row in rows {
            let id = SubscriptionId(row.id);
            let result = match Subscription::try_from(row) {
                Ok(sub) => self.regenerate(sub, now).await.map(|_| ItemOutcome::Processed),
                Err(e) => Err(e.into()),
            };
            if let Err(e) = &result {
                warn!(subscription_id = %id, error = %e, "Schedule regeneration failed");
            }
            outcome.record(id, result);
        }

        info!(
            processed = outcome.processed_count,
            failed = outcome.failed_count(),
            "Schedules regenerated"
        );
        Ok(outcome)
    }

    /// Expire every paused subscription whose reactivation deadline has passed
    #[instrument(skip(self))]
    pub async fn expire_overdue_pauses(&self) -> SubscriptionResult<BulkOutcome> {
        let now = self.clock.utc_now();
        let rows = self.subscriptions.list_paused_past_deadline(now).await?;

        let mut outcome = BulkOutcome::default();
        for row in rows {
            let id = SubscriptionId(row.id);
            let result = match Subscription::try_from(row) {
                Ok(sub) => match self.lifecycle.expire(&sub, now) {
                    Ok(expired) => self
                        .persist_expiry(&expired, now)
                        .await
                        .map(|_| ItemOutcome::Processed),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e.into()),
            };
            if let Err(e) = &result {
                warn!(subscription_id = %id, error = %e, "Expiry failed");
            }
            outcome.record(id, result);
        }

        info!(
            processed = outcome.processed_count,
            failed = outcome.failed_count(),
            "Overdue pauses expired"
        );
        Ok(outcome)
    }

    /// Remind owners of active subscriptions ending soon, once each
    #[instrument(skip(self))]
    pub async fn send_renewal_reminders(&self) -> SubscriptionResult<BulkOutcome> {
        let now = self.clock.utc_now();
        let horizon = now + Duration::days(i64::from(self.config.renewal_notice_days));
        let rows = self.subscriptions.list_due_for_renewal_notice(horizon).await?;

        let mut outcome = BulkOutcome::default();
        for row in rows {
            let id = SubscriptionId(row.id);
            let result = match Subscription::try_from(row) {
                Ok(sub) => self.remind(sub, now).await,
                Err(e) => Err(e.into()),
            };
            if let Err(e) = &result {
                warn!(subscription_id = %id, error = %e, "Renewal reminder failed");
            }
            outcome.record(id, result);
        }

        info!(processed = outcome.processed_count, "Renewal reminders sent");
        Ok(outcome)
    }

    async fn remind(
        &self,
        sub: Subscription,
        now: DateTime<Utc>,
    ) -> SubscriptionResult<ItemOutcome> {
        if sub.renewal_notification_sent || sub.status != SubscriptionStatus::Active {
            return Ok(ItemOutcome::Skipped);
        }
        let mut flagged = sub;
        flagged.renewal_notification_sent = true;
        flagged.updated_at = now;
        // Flag first so a conflict cannot produce a second reminder
        let saved = store::save_subscription(self.subscriptions.as_ref(), &flagged).await?;

        self.dispatcher.dispatch(
            SubscriptionEvent::for_subscription(NotificationKind::RenewalReminder, &saved, now)
                .with_details(serde_json::json!({
                    "subscription_end_date": saved.subscription_end_date,
                })),
        );
        Ok(ItemOutcome::Processed)
    }

    // =========================================================================
    // Admin pauses
    // =========================================================================

    pub async fn create_admin_pause(
        &self,
        request: CreateAdminPauseRequest,
    ) -> SubscriptionResult<AdminPauseApplied> {
        self.coordinator.create_admin_pause(request).await
    }

    pub async fn reactivate_admin_pause(
        &self,
        admin_pause_id: AdminPauseId,
        admin_user_id: Option<UserId>,
    ) -> SubscriptionResult<AdminPauseLifted> {
        self.coordinator
            .reactivate_admin_pause(admin_pause_id, admin_user_id)
            .await
    }

    pub async fn list_admin_pauses(&self, limit: i64) -> SubscriptionResult<Vec<AdminPause>> {
        self.coordinator.list_admin_pauses(limit).await
    }

    pub async fn active_admin_pause(
        &self,
        user_id: Option<UserId>,
    ) -> SubscriptionResult<Option<AdminPause>> {
        self.coordinator.active_admin_pause(user_id).await
    }
}
