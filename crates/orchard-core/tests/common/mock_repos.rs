//! Mock repositories for testing

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use sqlx::types::Json;
use uuid::Uuid;

use orchard_db::{
    AdminPauseRepository, AdminPauseRow, CreateAdminPause, CreateDelivery, DbError, DbResult,
    DeliveryRepository, DeliveryRow, SqlxError, SubscriptionRepository, SubscriptionRow,
    SubscriptionScope,
};
use orchard_types::{DeliveryStatus, Subscription, SubscriptionId};

fn unavailable() -> DbError {
    DbError::Sqlx(SqlxError::PoolClosed)
}

/// In-memory subscription repository with version checks
#[derive(Default, Clone)]
pub struct MockSubscriptionRepository {
    rows: Arc<DashMap<Uuid, SubscriptionRow>>,
    failing_updates: Arc<DashSet<Uuid>>,
    racing_reads: Arc<DashSet<Uuid>>,
    down: Arc<AtomicBool>,
}

impl MockSubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a test subscription directly
    pub fn insert_subscription(&self, sub: &Subscription) {
        self.rows.insert(sub.id.0, SubscriptionRow::from(sub));
    }

    pub fn get(&self, id: SubscriptionId) -> Option<Subscription> {
        self.rows
            .get(&id.0)
            .and_then(|r| Subscription::try_from(r.value().clone()).ok())
    }

    /// Make every update of `id` fail as if the database were unreachable
    #[allow(dead_code)]
    pub fn fail_updates_for(&self, id: SubscriptionId) {
        self.failing_updates.insert(id.0);
    }

    /// Bump the stored version right after the next read of `id`, as if
    /// another writer got in between
    #[allow(dead_code)]
    pub fn race_next_read_of(&self, id: SubscriptionId) {
        self.racing_reads.insert(id.0);
    }

    /// Make every call fail
    #[allow(dead_code)]
    pub fn set_unavailable(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> DbResult<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }

    fn collect<F>(&self, predicate: F) -> Vec<SubscriptionRow>
    where
        F: Fn(&SubscriptionRow) -> bool,
    {
        let mut rows: Vec<SubscriptionRow> = self
            .rows
            .iter()
            .filter(|r| predicate(r.value()))
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by_key(|r| (r.created_at, r.id));
        rows
    }
}

#[async_trait]
impl SubscriptionRepository for MockSubscriptionRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<SubscriptionRow>> {
        self.check()?;
        let row = self.rows.get(&id).map(|r| r.value().clone());
        if self.racing_reads.remove(&id).is_some() {
            if let Some(mut stored) = self.rows.get_mut(&id) {
                stored.version += 1;
            }
        }
        Ok(row)
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> DbResult<Vec<SubscriptionRow>> {
        self.check()?;
        let mut rows = self.collect(|r| r.user_id == user_id);
        rows.reverse();
        Ok(rows)
    }

    async fn create(&self, sub: &SubscriptionRow) -> DbResult<SubscriptionRow> {
        self.check()?;
        let mut row = sub.clone();
        row.version = 0;
        self.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(&self, sub: &SubscriptionRow) -> DbResult<SubscriptionRow> {
        self.check()?;
        if self.failing_updates.contains(&sub.id) {
            return Err(unavailable());
        }
        let mut stored = self.rows.get_mut(&sub.id).ok_or(DbError::NotFound)?;
        if stored.version != sub.version {
            return Err(DbError::VersionConflict {
                id: sub.id,
                expected: sub.version,
            });
        }
        let mut row = sub.clone();
        row.version = sub.version + 1;
        *stored = row.clone();
        Ok(row)
    }

    async fn list_active(&self, scope: &SubscriptionScope) -> DbResult<Vec<SubscriptionRow>> {
        self.check()?;
        Ok(self.collect(|r| {
            r.status == "active"
                && match scope {
                    SubscriptionScope::All => true,
                    SubscriptionScope::Users(users) => users.contains(&r.user_id),
                }
        }))
    }

    async fn list_for_admin_pause(&self, admin_pause_id: Uuid) -> DbResult<Vec<SubscriptionRow>> {
        self.check()?;
        Ok(self.collect(|r| {
            r.admin_pause_id == Some(admin_pause_id)
                || (r.status == "admin_paused" && r.admin_pause_id.is_none())
        }))
    }

    async fn list_paused_past_deadline(
        &self,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<SubscriptionRow>> {
        self.check()?;
        Ok(self.collect(|r| {
            r.status == "paused" && r.reactivation_deadline.is_some_and(|d| d < now)
        }))
    }

    async fn list_due_for_renewal_notice(
        &self,
        before: DateTime<Utc>,
    ) -> DbResult<Vec<SubscriptionRow>> {
        self.check()?;
        Ok(self.collect(|r| {
            r.status == "active"
                && !r.renewal_notification_sent
                && r.subscription_end_date <= before
        }))
    }
}

/// In-memory delivery repository
#[derive(Default, Clone)]
pub struct MockDeliveryRepository {
    rows: Arc<DashMap<Uuid, DeliveryRow>>,
    fail_writes: Arc<AtomicBool>,
}

impl MockDeliveryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make replace and skip calls fail
    #[allow(dead_code)]
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Rows for a subscription, oldest first
    pub fn for_subscription(&self, id: SubscriptionId) -> Vec<DeliveryRow> {
        let mut rows: Vec<DeliveryRow> = self
            .rows
            .iter()
            .filter(|r| r.subscription_id == id.0)
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by_key(|r| r.delivery_date);
        rows
    }

    /// Dates of rows in `status`, oldest first
    #[allow(dead_code)]
    pub fn dates_with_status(
        &self,
        id: SubscriptionId,
        status: DeliveryStatus,
    ) -> Vec<DateTime<Utc>> {
        self.for_subscription(id)
            .into_iter()
            .filter(|r| r.status == status.as_str())
            .map(|r| r.delivery_date)
            .collect()
    }

    fn check_writes(&self) -> DbResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }
}

#[async_trait]
impl DeliveryRepository for MockDeliveryRepository {
    async fn find_by_subscription(
        &self,
        subscription_id: Uuid,
        from: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<DeliveryRow>> {
        Ok(self
            .for_subscription(SubscriptionId(subscription_id))
            .into_iter()
            .filter(|r| from.map_or(true, |from| r.delivery_date >= from))
            .collect())
    }

    async fn replace_scheduled(
        &self,
        subscription_id: Uuid,
        from: DateTime<Utc>,
        deliveries: Vec<CreateDelivery>,
    ) -> DbResult<u64> {
        self.check_writes()?;
        self.rows.retain(|_, r| {
            !(r.subscription_id == subscription_id
                && r.status == "scheduled"
                && r.delivery_date >= from)
        });

        let mut inserted = 0;
        for delivery in deliveries {
            self.rows.insert(
                delivery.id,
                DeliveryRow {
                    id: delivery.id,
                    subscription_id: delivery.subscription_id,
                    delivery_date: delivery.delivery_date,
                    status: "scheduled".to_string(),
                    items: Json(delivery.items),
                    created_at: Utc::now(),
                },
            );
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn skip_scheduled(&self, subscription_id: Uuid, from: DateTime<Utc>) -> DbResult<u64> {
        self.check_writes()?;
        let mut skipped = 0;
        for mut row in self.rows.iter_mut() {
            if row.subscription_id == subscription_id
                && row.status == "scheduled"
                && row.delivery_date >= from
            {
                row.status = "skipped".to_string();
                skipped += 1;
            }
        }
        Ok(skipped)
    }
}

/// In-memory admin pause repository
#[derive(Default, Clone)]
pub struct MockAdminPauseRepository {
    rows: Arc<DashMap<Uuid, AdminPauseRow>>,
    fail_count_updates: Arc<AtomicBool>,
}

impl MockAdminPauseRepository {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn get(&self, id: Uuid) -> Option<AdminPauseRow> {
        self.rows.get(&id).map(|r| r.value().clone())
    }

    /// Make `set_affected_count` fail
    #[allow(dead_code)]
    pub fn set_fail_count_updates(&self, fail: bool) {
        self.fail_count_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl AdminPauseRepository for MockAdminPauseRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<AdminPauseRow>> {
        Ok(self.get(id))
    }

    async fn create(&self, pause: CreateAdminPause) -> DbResult<AdminPauseRow> {
        let row = AdminPauseRow {
            id: pause.id,
            pause_type: pause.pause_type,
            affected_user_ids: pause.affected_user_ids,
            reason: pause.reason,
            start_date: pause.start_date,
            end_date: pause.end_date,
            status: "active".to_string(),
            affected_subscription_count: 0,
            created_by: pause.created_by,
            reactivated_at: None,
            reactivated_by: None,
            created_at: Utc::now(),
        };
        self.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_active_for_user(
        &self,
        user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> DbResult<Option<AdminPauseRow>> {
        let mut candidates: Vec<AdminPauseRow> = self
            .rows
            .iter()
            .map(|r| r.value().clone())
            .filter(|r| {
                r.status == "active"
                    && r.start_date <= now
                    && r.end_date.map_or(true, |end| end >= now)
            })
            .filter(|r| {
                r.pause_type == "all"
                    || user_id.is_some_and(|u| r.affected_user_ids.contains(&u))
            })
            .collect();
        candidates.sort_by_key(|r| (r.pause_type != "all", std::cmp::Reverse(r.created_at)));
        Ok(candidates.into_iter().next())
    }

    async fn list_recent(&self, limit: i64) -> DbResult<Vec<AdminPauseRow>> {
        let mut rows: Vec<AdminPauseRow> = self.rows.iter().map(|r| r.value().clone()).collect();
        rows.sort_by_key(|r| std::cmp::Reverse(r.created_at));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn set_affected_count(&self, id: Uuid, count: i32) -> DbResult<()> {
        if self.fail_count_updates.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        if let Some(mut row) = self.rows.get_mut(&id) {
            row.affected_subscription_count = count;
        }
        Ok(())
    }

    async fn mark_reactivated(
        &self,
        id: Uuid,
        reactivated_at: DateTime<Utc>,
        reactivated_by: Option<Uuid>,
    ) -> DbResult<()> {
        let mut row = self.rows.get_mut(&id).ok_or(DbError::NotFound)?;
        row.status = "reactivated".to_string();
        row.reactivated_at = Some(reactivated_at);
        row.reactivated_by = reactivated_by;
        Ok(())
    }
}
