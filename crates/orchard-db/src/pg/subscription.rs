//! PostgreSQL subscription repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::SubscriptionRow;
use crate::repo::{SubscriptionRepository, SubscriptionScope};

const COLUMNS: &str = r#"
    id, user_id, plan_id, customer_email, status, delivery_frequency, items,
    delivery_address, subscription_start_date, subscription_end_date, next_delivery_date,
    schedule_anchor, original_price, discount_percentage, discount_amount, final_price,
    total_amount, subscription_duration, pause_date, pause_reason, reactivation_deadline,
    admin_pause_id, admin_pause_start, admin_pause_end, admin_reactivated_at,
    admin_reactivated_by, renewal_notification_sent, version, created_at, updated_at
"#;

/// PostgreSQL subscription repository
#[derive(Clone)]
pub struct PgSubscriptionRepository {
    pool: PgPool,
}

impl PgSubscriptionRepository {
    /// Create a new subscription repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn select(predicate: &str) -> String {
    format!("SELECT {COLUMNS} FROM subscriptions WHERE {predicate}")
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<SubscriptionRow>> {
        let sub = sqlx::query_as::<_, SubscriptionRow>(&select("id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sub)
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> DbResult<Vec<SubscriptionRow>> {
        let subs = sqlx::query_as::<_, SubscriptionRow>(&select(
            "user_id = $1 ORDER BY created_at DESC",
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(subs)
    }

    async fn create(&self, sub: &SubscriptionRow) -> DbResult<SubscriptionRow> {
        let sql = format!(
            r#"
            INSERT INTO subscriptions (
                id, user_id, plan_id, customer_email, status, delivery_frequency, items,
                delivery_address, subscription_start_date, subscription_end_date,
                next_delivery_date, schedule_anchor, original_price, discount_percentage,
                discount_amount, final_price, total_amount, subscription_duration,
                pause_date, pause_reason, reactivation_deadline, admin_pause_id,
                admin_pause_start, admin_pause_end, admin_reactivated_at,
                admin_reactivated_by, renewal_notification_sent, version, created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, 0, $28, $28)
            RETURNING {COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, SubscriptionRow>(&sql)
            .bind(sub.id)
            .bind(sub.user_id)
            .bind(sub.plan_id)
            .bind(&sub.customer_email)
            .bind(&sub.status)
            .bind(&sub.delivery_frequency)
            .bind(&sub.items)
            .bind(&sub.delivery_address)
            .bind(sub.subscription_start_date)
            .bind(sub.subscription_end_date)
            .bind(sub.next_delivery_date)
            .bind(sub.schedule_anchor)
            .bind(sub.original_price)
            .bind(sub.discount_percentage)
            .bind(sub.discount_amount)
            .bind(sub.final_price)
            .bind(sub.total_amount)
            .bind(sub.subscription_duration)
            .bind(sub.pause_date)
            .bind(&sub.pause_reason)
            .bind(sub.reactivation_deadline)
            .bind(sub.admin_pause_id)
            .bind(sub.admin_pause_start)
            .bind(sub.admin_pause_end)
            .bind(sub.admin_reactivated_at)
            .bind(sub.admin_reactivated_by)
            .bind(sub.renewal_notification_sent)
            .bind(sub.created_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    async fn update(&self, sub: &SubscriptionRow) -> DbResult<SubscriptionRow> {
        let sql = format!(
            r#"
            UPDATE subscriptions SET
                customer_email = $3, status = $4, delivery_frequency = $5, items = $6,
                delivery_address = $7, subscription_start_date = $8,
                subscription_end_date = $9, next_delivery_date = $10, pause_date = $11,
                pause_reason = $12, reactivation_deadline = $13, admin_pause_id = $14,
                admin_pause_start = $15, admin_pause_end = $16, admin_reactivated_at = $17,
                admin_reactivated_by = $18, renewal_notification_sent = $19,
                schedule_anchor = $20, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING {COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, SubscriptionRow>(&sql)
            .bind(sub.id)
            .bind(sub.version)
            .bind(&sub.customer_email)
            .bind(&sub.status)
            .bind(&sub.delivery_frequency)
            .bind(&sub.items)
            .bind(&sub.delivery_address)
            .bind(sub.subscription_start_date)
            .bind(sub.subscription_end_date)
            .bind(sub.next_delivery_date)
            .bind(sub.pause_date)
            .bind(&sub.pause_reason)
            .bind(sub.reactivation_deadline)
            .bind(sub.admin_pause_id)
            .bind(sub.admin_pause_start)
            .bind(sub.admin_pause_end)
            .bind(sub.admin_reactivated_at)
            .bind(sub.admin_reactivated_by)
            .bind(sub.renewal_notification_sent)
            .bind(sub.schedule_anchor)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(row) => Ok(row),
            None => {
                let exists: Option<(i64,)> =
                    sqlx::query_as("SELECT version FROM subscriptions WHERE id = $1")
                        .bind(sub.id)
                        .fetch_optional(&self.pool)
                        .await?;
                match exists {
                    Some(_) => Err(DbError::VersionConflict {
                        id: sub.id,
                        expected: sub.version,
                    }),
                    None => Err(DbError::NotFound),
                }
            }
        }
    }

    async fn list_active(&self, scope: &SubscriptionScope) -> DbResult<Vec<SubscriptionRow>> {
        let subs = match scope {
            SubscriptionScope::All => {
                sqlx::query_as::<_, SubscriptionRow>(&select(
                    "status = 'active' ORDER BY created_at",
                ))
                .fetch_all(&self.pool)
                .await?
            }
            SubscriptionScope::Users(user_ids) => {
                sqlx::query_as::<_, SubscriptionRow>(&select(
                    "status = 'active' AND user_id = ANY($1) ORDER BY created_at",
                ))
                .bind(user_ids)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(subs)
    }

    async fn list_for_admin_pause(&self, admin_pause_id: Uuid) -> DbResult<Vec<SubscriptionRow>> {
        let subs = sqlx::query_as::<_, SubscriptionRow>(&select(
            "admin_pause_id = $1 OR (status = 'admin_paused' AND admin_pause_id IS NULL) \
             ORDER BY created_at",
        ))
        .bind(admin_pause_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(subs)
    }

    async fn list_paused_past_deadline(
        &self,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<SubscriptionRow>> {
        let subs = sqlx::query_as::<_, SubscriptionRow>(&select(
            "status = 'paused' AND reactivation_deadline < $1 ORDER BY reactivation_deadline",
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(subs)
    }

    async fn list_due_for_renewal_notice(
        &self,
        before: DateTime<Utc>,
    ) -> DbResult<Vec<SubscriptionRow>> {
        let subs = sqlx::query_as::<_, SubscriptionRow>(&select(
            "status = 'active' AND renewal_notification_sent = FALSE \
             AND subscription_end_date <= $1 ORDER BY subscription_end_date",
        ))
        .bind(before)
        .fetch_all(&self.pool)
        .await?;

        Ok(subs)
    }
}
