//! PostgreSQL delivery repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::DeliveryRow;
use crate::repo::{CreateDelivery, DeliveryRepository};

/// PostgreSQL delivery repository
#[derive(Clone)]
pub struct PgDeliveryRepository {
    pool: PgPool,
}

impl PgDeliveryRepository {
    /// Create a new delivery repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryRepository for PgDeliveryRepository {
    async fn find_by_subscription(
        &self,
        subscription_id: Uuid,
        from: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<DeliveryRow>> {
        let deliveries = sqlx::query_as::<_, DeliveryRow>(
            r#"
            SELECT id, subscription_id, delivery_date, status, items, created_at
            FROM deliveries
            WHERE subscription_id = $1 AND ($2::timestamptz IS NULL OR delivery_date >= $2)
            ORDER BY delivery_date
            "#,
        )
        .bind(subscription_id)
        .bind(from)
        .fetch_all(&self.pool)
        .await?;

        Ok(deliveries)
    }

    async fn replace_scheduled(
        &self,
        subscription_id: Uuid,
        from: DateTime<Utc>,
        deliveries: Vec<CreateDelivery>,
    ) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query(
            r#"
            DELETE FROM deliveries
            WHERE subscription_id = $1 AND status = 'scheduled' AND delivery_date >= $2
            "#,
        )
        .bind(subscription_id)
        .bind(from)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let mut inserted = 0;
        for delivery in deliveries {
            inserted += sqlx::query(
                r#"
                INSERT INTO deliveries (id, subscription_id, delivery_date, status, items)
                VALUES ($1, $2, $3, 'scheduled', $4)
                "#,
            )
            .bind(delivery.id)
            .bind(delivery.subscription_id)
            .bind(delivery.delivery_date)
            .bind(Json(delivery.items))
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;

        tracing::debug!(
            subscription_id = %subscription_id,
            deleted,
            inserted,
            "Replaced scheduled deliveries"
        );

        Ok(inserted)
    }

    async fn skip_scheduled(&self, subscription_id: Uuid, from: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE deliveries SET status = 'skipped'
            WHERE subscription_id = $1 AND status = 'scheduled' AND delivery_date >= $2
            "#,
        )
        .bind(subscription_id)
        .bind(from)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
