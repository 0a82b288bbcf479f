//! Domain-level access to the repositories
//!
//! Rows come out of `orchard_db` with string statuses; these helpers decode
//! them into domain values and map missing rows to the right not-found error.

use chrono::{DateTime, Utc};

use orchard_db::{AdminPauseRepository, DbError, SubscriptionRepository, SubscriptionRow};
use orchard_types::{AdminPause, AdminPauseId, Subscription, SubscriptionId, UserId};

use crate::error::{SubscriptionError, SubscriptionResult};

pub(crate) fn decode_all<R, T>(rows: Vec<R>) -> SubscriptionResult<Vec<T>>
where
    T: TryFrom<R, Error = DbError>,
{
    rows.into_iter()
        .map(|row| T::try_from(row).map_err(SubscriptionError::from))
        .collect()
}

pub(crate) async fn load_subscription<S>(
    repo: &S,
    id: SubscriptionId,
) -> SubscriptionResult<Subscription>
where
    S: SubscriptionRepository + ?Sized,
{
    let row = repo
        .find_by_id(id.0)
        .await?
        .ok_or(SubscriptionError::SubscriptionNotFound)?;
    Ok(Subscription::try_from(row)?)
}

pub(crate) async fn insert_subscription<S>(
    repo: &S,
    sub: &Subscription,
) -> SubscriptionResult<Subscription>
where
    S: SubscriptionRepository + ?Sized,
{
    let row = repo.create(&SubscriptionRow::from(sub)).await?;
    Ok(Subscription::try_from(row)?)
}

/// Write `sub` back if nobody else has since it was read
pub(crate) async fn save_subscription<S>(
    repo: &S,
    sub: &Subscription,
) -> SubscriptionResult<Subscription>
where
    S: SubscriptionRepository + ?Sized,
{
    let row = repo.update(&SubscriptionRow::from(sub)).await?;
    Ok(Subscription::try_from(row)?)
}

pub(crate) async fn load_admin_pause<A>(
    repo: &A,
    id: AdminPauseId,
) -> SubscriptionResult<AdminPause>
where
    A: AdminPauseRepository + ?Sized,
{
    let row = repo
        .find_by_id(id.0)
        .await?
        .ok_or(SubscriptionError::AdminPauseNotFound)?;
    Ok(AdminPause::try_from(row)?)
}

/// The pause holding deliveries for `user_id` at `now`, fleet-wide first
pub(crate) async fn active_admin_pause<A>(
    repo: &A,
    user_id: Option<UserId>,
    now: DateTime<Utc>,
) -> SubscriptionResult<Option<AdminPause>>
where
    A: AdminPauseRepository + ?Sized,
{
    repo.find_active_for_user(user_id.map(|u| u.0), now)
        .await?
        .map(AdminPause::try_from)
        .transpose()
        .map_err(SubscriptionError::from)
}
