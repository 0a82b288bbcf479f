//! PostgreSQL admin pause repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::AdminPauseRow;
use crate::repo::{AdminPauseRepository, CreateAdminPause};

/// PostgreSQL admin pause repository
#[derive(Clone)]
pub struct PgAdminPauseRepository {
    pool: PgPool,
}

impl PgAdminPauseRepository {
    /// Create a new admin pause repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdminPauseRepository for PgAdminPauseRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<AdminPauseRow>> {
        let pause = sqlx::query_as::<_, AdminPauseRow>(
            r#"
            SELECT id, pause_type, affected_user_ids, reason, start_date, end_date, status,
                   affected_subscription_count, created_by, reactivated_at, reactivated_by,
                   created_at
            FROM admin_pauses
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(pause)
    }

    async fn create(&self, pause: CreateAdminPause) -> DbResult<AdminPauseRow> {
        let row = sqlx::query_as::<_, AdminPauseRow>(
            r#"
            INSERT INTO admin_pauses (id, pause_type, affected_user_ids, reason, start_date,
                                      end_date, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, pause_type, affected_user_ids, reason, start_date, end_date, status,
                      affected_subscription_count, created_by, reactivated_at, reactivated_by,
                      created_at
            "#,
        )
        .bind(pause.id)
        .bind(&pause.pause_type)
        .bind(&pause.affected_user_ids)
        .bind(&pause.reason)
        .bind(pause.start_date)
        .bind(pause.end_date)
        .bind(pause.created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_active_for_user(
        &self,
        user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> DbResult<Option<AdminPauseRow>> {
        // Fleet-wide pauses sort first, then the most recent selected pause.
        let pause = sqlx::query_as::<_, AdminPauseRow>(
            r#"
            SELECT id, pause_type, affected_user_ids, reason, start_date, end_date, status,
                   affected_subscription_count, created_by, reactivated_at, reactivated_by,
                   created_at
            FROM admin_pauses
            WHERE status = 'active'
              AND start_date <= $2
              AND (end_date IS NULL OR end_date >= $2)
              AND (pause_type = 'all' OR ($1::uuid IS NOT NULL AND $1 = ANY(affected_user_ids)))
            ORDER BY (pause_type = 'all') DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(pause)
    }

    async fn list_recent(&self, limit: i64) -> DbResult<Vec<AdminPauseRow>> {
        let pauses = sqlx::query_as::<_, AdminPauseRow>(
            r#"
            SELECT id, pause_type, affected_user_ids, reason, start_date, end_date, status,
                   affected_subscription_count, created_by, reactivated_at, reactivated_by,
                   created_at
            FROM admin_pauses
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(pauses)
    }

    async fn set_affected_count(&self, id: Uuid, count: i32) -> DbResult<()> {
        sqlx::query("UPDATE admin_pauses SET affected_subscription_count = $1 WHERE id = $2")
            .bind(count)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn mark_reactivated(
        &self,
        id: Uuid,
        reactivated_at: DateTime<Utc>,
        reactivated_by: Option<Uuid>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE admin_pauses
            SET status = 'reactivated', reactivated_at = $1, reactivated_by = $2
            WHERE id = $3
            "#,
        )
        .bind(reactivated_at)
        .bind(reactivated_by)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
