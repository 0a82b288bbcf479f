//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.
//! Status columns are plain strings here; conversion to the closed domain
//! enums happens in the `TryFrom` impls at the bottom of this file.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use orchard_types::{
    AdminPause, AdminPauseId, AdminPauseLink, Delivery, DeliveryAddress, DeliveryId,
    PauseState, PlanId, PricingSnapshot, Subscription, SubscriptionId, SubscriptionItem,
    UserId, UserPause,
};

use crate::error::DbError;

/// Subscription row from the database
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub customer_email: Option<String>,
    pub status: String,
    pub delivery_frequency: String,
    pub items: Json<Vec<SubscriptionItem>>,
    pub delivery_address: Json<DeliveryAddress>,
    pub subscription_start_date: DateTime<Utc>,
    pub subscription_end_date: DateTime<Utc>,
    pub next_delivery_date: DateTime<Utc>,
    pub schedule_anchor: DateTime<Utc>,
    pub original_price: Decimal,
    pub discount_percentage: i32,
    pub discount_amount: Decimal,
    pub final_price: Decimal,
    pub total_amount: Decimal,
    pub subscription_duration: i32,
    pub pause_date: Option<DateTime<Utc>>,
    pub pause_reason: Option<String>,
    pub reactivation_deadline: Option<DateTime<Utc>>,
    pub admin_pause_id: Option<Uuid>,
    pub admin_pause_start: Option<DateTime<Utc>>,
    pub admin_pause_end: Option<DateTime<Utc>>,
    pub admin_reactivated_at: Option<DateTime<Utc>>,
    pub admin_reactivated_by: Option<Uuid>,
    pub renewal_notification_sent: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Delivery row from the database
#[derive(Debug, Clone, FromRow)]
pub struct DeliveryRow {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub delivery_date: DateTime<Utc>,
    pub status: String,
    pub items: Json<Vec<SubscriptionItem>>,
    pub created_at: DateTime<Utc>,
}

/// Admin pause row from the database
#[derive(Debug, Clone, FromRow)]
pub struct AdminPauseRow {
    pub id: Uuid,
    pub pause_type: String,
    pub affected_user_ids: Vec<Uuid>,
    pub reason: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: String,
    pub affected_subscription_count: i32,
    pub created_by: Option<Uuid>,
    pub reactivated_at: Option<DateTime<Utc>>,
    pub reactivated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl SubscriptionRow {
    /// Convert to domain SubscriptionId
    pub fn subscription_id(&self) -> SubscriptionId {
        SubscriptionId(self.id)
    }

    /// Convert to domain UserId
    pub fn user_id(&self) -> UserId {
        UserId(self.user_id)
    }
}

fn decode<T: std::str::FromStr>(value: &str) -> Result<T, DbError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| DbError::Decode(e.to_string()))
}

fn non_negative(column: &'static str, value: i32) -> Result<u32, DbError> {
    u32::try_from(value).map_err(|_| DbError::Decode(format!("negative {column}: {value}")))
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DbError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let pause = match (
            row.pause_date,
            row.reactivation_deadline,
            row.admin_pause_id,
            row.admin_pause_start,
        ) {
            (Some(_), _, Some(_), _) => {
                return Err(DbError::Decode(format!(
                    "subscription {} is both user-paused and admin-paused",
                    row.id
                )))
            }
            (Some(pause_date), Some(reactivation_deadline), None, _) => {
                PauseState::User(UserPause {
                    pause_date,
                    pause_reason: row.pause_reason,
                    reactivation_deadline,
                })
            }
            (Some(_), None, None, _) => {
                return Err(DbError::Decode(format!(
                    "subscription {} is paused without a reactivation deadline",
                    row.id
                )))
            }
            (None, _, Some(admin_pause_id), start) => PauseState::Admin(AdminPauseLink {
                admin_pause_id: AdminPauseId(admin_pause_id),
                admin_pause_start: start.unwrap_or(row.updated_at),
                admin_pause_end: row.admin_pause_end,
            }),
            (None, _, None, _) => PauseState::None,
        };

        Ok(Subscription {
            id: SubscriptionId(row.id),
            user_id: UserId(row.user_id),
            plan_id: PlanId(row.plan_id),
            customer_email: row.customer_email,
            status: decode(&row.status)?,
            delivery_frequency: decode(&row.delivery_frequency)?,
            items: row.items.0,
            delivery_address: row.delivery_address.0,
            subscription_start_date: row.subscription_start_date,
            subscription_end_date: row.subscription_end_date,
            next_delivery_date: row.next_delivery_date,
            schedule_anchor: row.schedule_anchor,
            pricing: PricingSnapshot {
                original_price: row.original_price,
                discount_percentage: non_negative(
                    "discount_percentage",
                    row.discount_percentage,
                )?,
                discount_amount: row.discount_amount,
                final_price: row.final_price,
                total_amount: row.total_amount,
                subscription_duration: non_negative(
                    "subscription_duration",
                    row.subscription_duration,
                )?,
            },
            pause,
            admin_reactivated_at: row.admin_reactivated_at,
            admin_reactivated_by: row.admin_reactivated_by.map(UserId),
            renewal_notification_sent: row.renewal_notification_sent,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<&Subscription> for SubscriptionRow {
    fn from(sub: &Subscription) -> Self {
        let user_pause = sub.user_pause();
        let admin_pause = sub.admin_pause();

        Self {
            id: sub.id.0,
            user_id: sub.user_id.0,
            plan_id: sub.plan_id.0,
            customer_email: sub.customer_email.clone(),
            status: sub.status.as_str().to_string(),
            delivery_frequency: sub.delivery_frequency.as_str().to_string(),
            items: Json(sub.items.clone()),
            delivery_address: Json(sub.delivery_address.clone()),
            subscription_start_date: sub.subscription_start_date,
            subscription_end_date: sub.subscription_end_date,
            next_delivery_date: sub.next_delivery_date,
            schedule_anchor: sub.schedule_anchor,
            original_price: sub.pricing.original_price,
            discount_percentage: i32::try_from(sub.pricing.discount_percentage)
                .unwrap_or(i32::MAX),
            discount_amount: sub.pricing.discount_amount,
            final_price: sub.pricing.final_price,
            total_amount: sub.pricing.total_amount,
            subscription_duration: i32::try_from(sub.pricing.subscription_duration)
                .unwrap_or(i32::MAX),
            pause_date: user_pause.map(|p| p.pause_date),
            pause_reason: user_pause.and_then(|p| p.pause_reason.clone()),
            reactivation_deadline: user_pause.map(|p| p.reactivation_deadline),
            admin_pause_id: admin_pause.map(|l| l.admin_pause_id.0),
            admin_pause_start: admin_pause.map(|l| l.admin_pause_start),
            admin_pause_end: admin_pause.and_then(|l| l.admin_pause_end),
            admin_reactivated_at: sub.admin_reactivated_at,
            admin_reactivated_by: sub.admin_reactivated_by.map(|u| u.0),
            renewal_notification_sent: sub.renewal_notification_sent,
            version: sub.version,
            created_at: sub.created_at,
            updated_at: sub.updated_at,
        }
    }
}

impl TryFrom<DeliveryRow> for Delivery {
    type Error = DbError;

    fn try_from(row: DeliveryRow) -> Result<Self, Self::Error> {
        Ok(Delivery {
            id: DeliveryId(row.id),
            subscription_id: SubscriptionId(row.subscription_id),
            delivery_date: row.delivery_date,
            status: decode(&row.status)?,
            items: row.items.0,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<AdminPauseRow> for AdminPause {
    type Error = DbError;

    fn try_from(row: AdminPauseRow) -> Result<Self, Self::Error> {
        Ok(AdminPause {
            id: AdminPauseId(row.id),
            pause_type: decode(&row.pause_type)?,
            affected_user_ids: row.affected_user_ids.into_iter().map(UserId).collect(),
            reason: row.reason,
            start_date: row.start_date,
            end_date: row.end_date,
            status: decode(&row.status)?,
            affected_subscription_count: non_negative(
                "affected_subscription_count",
                row.affected_subscription_count,
            )?,
            created_by: row.created_by.map(UserId),
            reactivated_at: row.reactivated_at,
            reactivated_by: row.reactivated_by.map(UserId),
            created_at: row.created_at,
        })
    }
}
